//! Error types shared across the replay core.

use crate::codec::CodecError;
use crate::model::UnsupportedMethod;
use crate::multipart::MultipartError;

/// Failure turning a corpus entry (or a live request) into the normalized model.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Method(#[from] UnsupportedMethod),
    #[error("malformed URL {url:?}: {reason}")]
    Url { url: String, reason: String },
    #[error("corpus entry rejected: {0}")]
    Bridge(String),
}

impl ParseError {
    pub fn url(url: &str, reason: impl ToString) -> Self {
        ParseError::Url {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure materialising a response for a selected entry.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Multipart(#[from] MultipartError),
    #[error("failed to read body: {0}")]
    Io(#[from] std::io::Error),
}
