//! Replay a request against a capture file from the command line.
//!
//! Usage:
//!   rift-replay --capture capture.json [--config replay.yaml] [-X POST] [-H 'Name: value'] <url>

use anyhow::Context;
use clap::Parser;
use rift_replay::entry::load_capture;
use rift_replay::model::{HttpMethod, NormalizedRequest, ReplayResponse};
use rift_replay::{ReplayConfig, ReplayEngine};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Answer a request from a captured corpus
#[derive(Parser, Debug)]
#[command(name = "rift-replay")]
#[command(author, version, about = "Answer a request from a captured corpus")]
struct Args {
    /// Capture file: a JSON array of entries or `{ "entries": [...] }`
    #[arg(short, long)]
    capture: PathBuf,

    /// Replay configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header, `Name: value`; may be repeated
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Send the same request this many times within one session
    #[arg(short = 'n', long, default_value_t = 1)]
    repeat: usize,

    /// Absolute request URL
    url: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ReplayConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReplayConfig::default(),
    };
    let entries = load_capture(&args.capture)?;
    let engine = ReplayEngine::from_capture(entries, &config)?;
    let request = build_request(&args)?;

    let session = engine.new_session();
    for attempt in 1..=args.repeat {
        let response = engine.respond(session.as_ref(), &request);
        print_response(attempt, &response)?;
    }
    Ok(())
}

fn build_request(args: &Args) -> anyhow::Result<NormalizedRequest> {
    let method: HttpMethod = args.method.parse()?;
    let mut request = NormalizedRequest::parse(method, &args.url)?;
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            anyhow::bail!("Invalid header '{header}'. Expected 'Name: value'");
        };
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = &args.data {
        request = request.with_body(data.clone().into_bytes());
    }
    Ok(request)
}

fn print_response(attempt: usize, response: &ReplayResponse) -> anyhow::Result<()> {
    println!("#{attempt} {}", response.status);
    for (name, value) in response.data.headers() {
        println!("{name}: {value}");
    }
    println!();
    let body = response.data.read_body()?;
    println!("{}", String::from_utf8_lossy(&body));
    Ok(())
}
