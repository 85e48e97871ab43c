//! Domain layer - Core business logic
//!
//! Contains value objects, the recording session state machine, and domain errors.
//! This layer has no dependencies on external systems.

pub mod config;
pub mod error;
pub mod keys;
pub mod recording;

// Re-export common types
pub use config::AppConfig;
pub use error::*;
pub use keys::{KeyAction, KeyBindings};
pub use recording::{
    Codec, Container, MediaBlob, MediaChunk, RecorderState, RecordingSession,
};
