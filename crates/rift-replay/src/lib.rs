//! Rift replay core.
//!
//! Matches live HTTP requests against a previously captured corpus and
//! synthesizes the recorded responses. Corpus formats plug in through
//! [`entry::EntryBridge`]; [`ReplayEngine`] ties parsing, matching and
//! response rewriting together for a serving layer.

// ===== Value model and codecs =====
pub mod codec;
pub mod model;
pub mod multipart;
pub mod transform;

// ===== Corpus and matching =====
pub mod entry;
pub mod heuristic;
pub mod matcher;

// ===== Serving facade =====
pub mod config;
pub mod engine;
pub mod error;

pub use config::ReplayConfig;
pub use engine::ReplayEngine;
pub use error::{ParseError, ReplayError};
