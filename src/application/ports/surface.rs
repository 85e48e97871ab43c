//! Capture surface port interfaces

use async_trait::async_trait;
use thiserror::Error;

/// Capture errors
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("Capture surface is gone: {0}")]
    SurfaceLost(String),

    #[error("Failed to open capture stream: {0}")]
    StreamFailed(String),
}

/// A continuous capture stream description, handed to the recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    /// Demuxer that reads the surface (e.g. `x11grab`)
    pub input_format: String,
    /// Surface address for that demuxer (e.g. `:0.0`)
    pub input: String,
    /// Frames per second
    pub frame_rate: u32,
}

/// Port for something that can be captured
pub trait CaptureSurface: Send + Sync {
    /// Obtain a continuous capture stream
    fn capture_stream(&self) -> Result<MediaStream, CaptureError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Port for finding a capture surface
#[async_trait]
pub trait SurfaceLocator: Send + Sync {
    type Surface: CaptureSurface;

    /// Look for the surface once.
    ///
    /// # Returns
    /// The surface if it is available now, `None` otherwise
    async fn probe(&self) -> Option<Self::Surface>;
}
