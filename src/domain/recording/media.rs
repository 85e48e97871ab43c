//! Media value objects: codecs, containers, chunks and blobs

use std::fmt;
use std::str::FromStr;

use crate::domain::error::{InvalidCodecError, InvalidContainerError};

/// Default bitrate ceiling handed to the recorder (100 Mbps)
pub const DEFAULT_BITS_PER_SECOND: u64 = 100_000_000;

/// Video codecs the recorder can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    #[default]
    Vp9,
    H264,
}

impl Codec {
    /// Get the string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vp9 => "vp9",
            Self::H264 => "h264",
        }
    }

    /// Recorder mime type, e.g. `video/webm;codecs=vp9`
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Vp9 => "video/webm;codecs=vp9",
            Self::H264 => "video/webm;codecs=h264",
        }
    }
}

impl FromStr for Codec {
    type Err = InvalidCodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vp9" => Ok(Self::Vp9),
            "h264" => Ok(Self::H264),
            _ => Err(InvalidCodecError { input: s.to_string() }),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output containers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Container {
    #[default]
    Webm,
    Mp4,
}

impl Container {
    /// Get the MIME type string
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::Webm => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
        }
    }
}

impl FromStr for Container {
    type Err = InvalidContainerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webm" => Ok(Self::Webm),
            "mp4" => Ok(Self::Mp4),
            _ => Err(InvalidContainerError { input: s.to_string() }),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// One fragment of encoded media emitted by the recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunk(Vec<u8>);

impl MediaChunk {
    /// Get the raw bytes
    pub fn data(&self) -> &[u8] {
        &self.0
    }

    /// Size in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the chunk carries no data
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for MediaChunk {
    fn from(data: Vec<u8>) -> Self {
        Self(data)
    }
}

impl From<&[u8]> for MediaChunk {
    fn from(data: &[u8]) -> Self {
        Self(data.to_vec())
    }
}

/// Value object for a complete media file in memory.
/// Contains the bytes and the container they are tagged with.
#[derive(Debug, Clone)]
pub struct MediaBlob {
    data: Vec<u8>,
    container: Container,
}

impl MediaBlob {
    /// Create a blob from raw bytes
    pub fn new(data: Vec<u8>, container: Container) -> Self {
        Self { data, container }
    }

    /// Concatenate chunks, in order, into a single blob
    pub fn concat(chunks: &[MediaChunk], container: Container) -> Self {
        let total = chunks.iter().map(MediaChunk::len).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(chunk.data());
        }
        Self { data, container }
    }

    /// Get the raw bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume and return the raw bytes
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Get the container tag
    pub fn container(&self) -> Container {
        self.container
    }

    /// Get the MIME type
    pub fn mime_type(&self) -> &'static str {
        self.container.mime_type()
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if the blob is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get human-readable size
    pub fn human_readable_size(&self) -> String {
        human_readable_size(self.size_bytes())
    }
}

/// Format a byte count as B / KB / MB
pub fn human_readable_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
