//! Capture surfaces that ffmpeg can read: displays and devices

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::application::ports::{CaptureError, CaptureSurface, MediaStream, SurfaceLocator};

/// Where X11 keeps its display sockets
const X11_SOCKET_DIR: &str = "/tmp/.X11-unix";

/// What to capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceTarget {
    /// A display, e.g. `:0.0`
    Display(String),
    /// A capture device or file, e.g. `/dev/video0`
    Device(PathBuf),
}

impl SurfaceTarget {
    /// Parse a target: anything containing `:` before any `/` is a display
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        match (trimmed.find(':'), trimmed.find('/')) {
            (Some(colon), Some(slash)) if colon < slash => Self::Display(trimmed.to_string()),
            (Some(_), None) => Self::Display(trimmed.to_string()),
            _ => Self::Device(PathBuf::from(trimmed)),
        }
    }

    /// Demuxer ffmpeg uses for this target
    pub fn input_format(&self) -> &'static str {
        match self {
            #[cfg(target_os = "macos")]
            Self::Display(_) => "avfoundation",
            #[cfg(not(target_os = "macos"))]
            Self::Display(_) => "x11grab",
            Self::Device(_) => "v4l2",
        }
    }

    /// Input address ffmpeg uses for this target
    pub fn input(&self) -> String {
        match self {
            // avfoundation addresses screens by index: ":1" -> "1:none"
            #[cfg(target_os = "macos")]
            Self::Display(name) => format!("{}:none", name.trim_start_matches(':')),
            #[cfg(not(target_os = "macos"))]
            Self::Display(name) => name.clone(),
            Self::Device(path) => path.to_string_lossy().to_string(),
        }
    }
}

/// Socket path for a local X11 display (`:0.0` -> `<dir>/X0`).
/// Remote displays (`host:0`) have no local socket.
pub fn x11_socket_path(socket_dir: &Path, display: &str) -> Option<PathBuf> {
    let number = display.strip_prefix(':')?;
    let number = number.split('.').next()?;
    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(socket_dir.join(format!("X{}", number)))
}

/// A surface that has been found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegSurface {
    target: SurfaceTarget,
    frame_rate: u32,
}

impl FfmpegSurface {
    /// Create a surface without probing
    pub fn new(target: SurfaceTarget, frame_rate: u32) -> Self {
        Self { target, frame_rate }
    }

    /// The captured target
    pub fn target(&self) -> &SurfaceTarget {
        &self.target
    }
}

impl CaptureSurface for FfmpegSurface {
    fn capture_stream(&self) -> Result<MediaStream, CaptureError> {
        if let SurfaceTarget::Device(path) = &self.target {
            if !path.exists() {
                return Err(CaptureError::SurfaceLost(path.display().to_string()));
            }
        }
        Ok(MediaStream {
            input_format: self.target.input_format().to_string(),
            input: self.target.input(),
            frame_rate: self.frame_rate,
        })
    }

    fn describe(&self) -> String {
        format!("{} {}", self.target.input_format(), self.target.input())
    }
}

/// Locator that checks whether the target exists yet
pub struct FfmpegSurfaceLocator {
    target: SurfaceTarget,
    frame_rate: u32,
    socket_dir: PathBuf,
}

impl FfmpegSurfaceLocator {
    /// Create a locator for a target string such as `:0.0` or `/dev/video0`
    pub fn new(target: &str, frame_rate: u32) -> Self {
        Self {
            target: SurfaceTarget::parse(target),
            frame_rate,
            socket_dir: PathBuf::from(X11_SOCKET_DIR),
        }
    }

    /// Look for X11 sockets somewhere else
    pub fn with_socket_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.socket_dir = dir.into();
        self
    }

    async fn target_exists(&self) -> bool {
        match &self.target {
            SurfaceTarget::Device(path) => fs::metadata(path).await.is_ok(),
            #[cfg(target_os = "linux")]
            SurfaceTarget::Display(name) => match x11_socket_path(&self.socket_dir, name) {
                Some(socket) => fs::metadata(socket).await.is_ok(),
                None => true,
            },
            #[cfg(not(target_os = "linux"))]
            SurfaceTarget::Display(_) => true,
        }
    }
}

#[async_trait]
impl SurfaceLocator for FfmpegSurfaceLocator {
    type Surface = FfmpegSurface;

    async fn probe(&self) -> Option<FfmpegSurface> {
        if self.target_exists().await {
            Some(FfmpegSurface::new(self.target.clone(), self.frame_rate))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_targets() {
        assert_eq!(
            SurfaceTarget::parse(":0.0"),
            SurfaceTarget::Display(":0.0".to_string())
        );
        assert_eq!(
            SurfaceTarget::parse("remote:1"),
            SurfaceTarget::Display("remote:1".to_string())
        );
        assert_eq!(
            SurfaceTarget::parse("/dev/video0"),
            SurfaceTarget::Device(PathBuf::from("/dev/video0"))
        );
        assert_eq!(
            SurfaceTarget::parse("/tmp/a:b"),
            SurfaceTarget::Device(PathBuf::from("/tmp/a:b"))
        );
    }

    #[test]
    fn socket_path_for_local_display() {
        let dir = Path::new("/tmp/.X11-unix");
        assert_eq!(x11_socket_path(dir, ":0.0"), Some(dir.join("X0")));
        assert_eq!(x11_socket_path(dir, ":12"), Some(dir.join("X12")));
        assert_eq!(x11_socket_path(dir, "remote:0"), None);
        assert_eq!(x11_socket_path(dir, ":x"), None);
    }

    #[tokio::test]
    async fn device_probe_waits_for_path() {
        let dir = TempDir::new().unwrap();
        let device = dir.path().join("canvas");
        let locator = FfmpegSurfaceLocator::new(&device.to_string_lossy(), 30);

        assert!(locator.probe().await.is_none());
        std::fs::write(&device, b"").unwrap();
        let surface = locator.probe().await.unwrap();

        let stream = surface.capture_stream().unwrap();
        assert_eq!(stream.input_format, "v4l2");
        assert_eq!(stream.input, device.to_string_lossy());
        assert_eq!(stream.frame_rate, 30);
    }

    #[tokio::test]
    async fn lost_device_fails_capture() {
        let dir = TempDir::new().unwrap();
        let device = dir.path().join("gone");
        let surface = FfmpegSurface::new(SurfaceTarget::Device(device), 30);
        assert!(matches!(
            surface.capture_stream(),
            Err(CaptureError::SurfaceLost(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn display_probe_checks_socket() {
        let dir = TempDir::new().unwrap();
        let locator = FfmpegSurfaceLocator::new(":7.0", 60).with_socket_dir(dir.path());

        assert!(locator.probe().await.is_none());
        std::fs::write(dir.path().join("X7"), b"").unwrap();
        let surface = locator.probe().await.unwrap();
        assert_eq!(surface.describe(), "x11grab :7.0");
    }
}
