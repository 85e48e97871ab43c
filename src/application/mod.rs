//! Application layer - Use cases and port interfaces
//!
//! Contains the recording controller, surface discovery, file export,
//! and trait definitions for external system interactions.

pub mod controller;
pub mod discovery;
pub mod exporter;
pub mod ports;

// Re-export use cases
pub use controller::{ControllerError, KeyDispatch, RecordingController};
pub use discovery::{discover_surface, DiscoveryError};
pub use exporter::{ExportError, ExportedFile, FileExporter, REMUX_INPUT, REMUX_OUTPUT};
