//! Byte sources and typed content.

use super::media_type::MediaType;
use bytes::Bytes;
use std::fmt;
use std::io;
use std::sync::Arc;

type Opener = Arc<dyn Fn() -> io::Result<Bytes> + Send + Sync>;

/// A fully-buffered body, either already in memory or behind a deferred opener.
///
/// Cloning is cheap in both cases.
#[derive(Clone)]
pub enum ByteSource {
    Memory(Bytes),
    Deferred(Opener),
}

impl ByteSource {
    pub fn empty() -> Self {
        ByteSource::Memory(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        ByteSource::Memory(bytes.into())
    }

    /// Defer producing the bytes until the source is opened.
    pub fn deferred<F>(open: F) -> Self
    where
        F: Fn() -> io::Result<Bytes> + Send + Sync + 'static,
    {
        ByteSource::Deferred(Arc::new(open))
    }

    pub fn open(&self) -> io::Result<Bytes> {
        match self {
            ByteSource::Memory(bytes) => Ok(bytes.clone()),
            ByteSource::Deferred(open) => open(),
        }
    }

    /// Size when known without opening the source.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            ByteSource::Memory(bytes) => Some(bytes.len()),
            ByteSource::Deferred(_) => None,
        }
    }
}

impl Default for ByteSource {
    fn default() -> Self {
        ByteSource::empty()
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteSource::Memory(bytes) => f.debug_tuple("Memory").field(&bytes.len()).finish(),
            ByteSource::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<Bytes> for ByteSource {
    fn from(bytes: Bytes) -> Self {
        ByteSource::Memory(bytes)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        ByteSource::Memory(Bytes::from(bytes))
    }
}

impl From<&'static str> for ByteSource {
    fn from(text: &'static str) -> Self {
        ByteSource::Memory(Bytes::from_static(text.as_bytes()))
    }
}

/// A byte payload paired with its resolved media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedContent {
    pub media_type: MediaType,
    pub data: Bytes,
}

impl TypedContent {
    pub fn new(media_type: MediaType, data: impl Into<Bytes>) -> Self {
        Self {
            media_type,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
