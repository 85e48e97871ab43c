//! Recording session state machine

use std::fmt;
use thiserror::Error;

use super::media::{Container, MediaChunk};

/// Recorder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Inactive,
    Recording,
}

impl RecorderState {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Recording => "recording",
        }
    }
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error when an invalid state transition is attempted
#[derive(Debug, Clone, Error)]
#[error("Invalid state transition: cannot {action} while {current_state}")]
pub struct InvalidStateTransition {
    pub current_state: RecorderState,
    pub action: String,
}

/// A single recording session.
///
/// State machine:
///   INACTIVE -> RECORDING (begin)
///   RECORDING -> INACTIVE (end, export pending until the recorder reports stop)
///
/// Chunks are appended while recording and while the export is pending, since
/// the recorder flushes its last data between the stop request and the stop
/// event. Once `finish` seals the session the chunk list is stable until the
/// next `begin`.
#[derive(Debug, Default)]
pub struct RecordingSession {
    state: RecorderState,
    chunks: Vec<MediaChunk>,
    pending_export: Option<Container>,
}

impl RecordingSession {
    /// Create a new inactive session
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current state
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Check if a stop was requested and the stop event has not arrived yet
    pub fn is_finalizing(&self) -> bool {
        self.pending_export.is_some()
    }

    /// Container the pending stop will export to
    pub fn pending_export(&self) -> Option<Container> {
        self.pending_export
    }

    /// Check whether `begin` would succeed
    pub fn can_begin(&self) -> bool {
        self.state == RecorderState::Inactive && self.pending_export.is_none()
    }

    /// Chunks collected so far
    pub fn chunks(&self) -> &[MediaChunk] {
        &self.chunks
    }

    /// Total collected bytes
    pub fn size_bytes(&self) -> usize {
        self.chunks.iter().map(MediaChunk::len).sum()
    }

    /// Transition from INACTIVE to RECORDING, discarding stale chunks
    pub fn begin(&mut self) -> Result<(), InvalidStateTransition> {
        if !self.can_begin() {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: if self.is_finalizing() {
                    "start recording before the previous one is saved".to_string()
                } else {
                    "start recording".to_string()
                },
            });
        }
        self.chunks.clear();
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Transition from RECORDING to INACTIVE, remembering the export container
    pub fn end(&mut self, container: Container) -> Result<(), InvalidStateTransition> {
        if self.state != RecorderState::Recording {
            return Err(InvalidStateTransition {
                current_state: self.state,
                action: "stop recording".to_string(),
            });
        }
        self.state = RecorderState::Inactive;
        self.pending_export = Some(container);
        Ok(())
    }

    /// Append a chunk. Empty chunks and chunks outside a session are dropped.
    pub fn append(&mut self, chunk: MediaChunk) -> bool {
        if chunk.is_empty() {
            return false;
        }
        if !self.is_recording() && !self.is_finalizing() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    /// Seal the session when the recorder reports it has stopped.
    ///
    /// Returns the container to export to. A recorder that stops on its own
    /// while still recording is treated as a stop with `fallback`. Returns
    /// `None` for a stop event that belongs to no session.
    pub fn finish(&mut self, fallback: Container) -> Option<Container> {
        if let Some(container) = self.pending_export.take() {
            return Some(container);
        }
        if self.state == RecorderState::Recording {
            self.state = RecorderState::Inactive;
            return Some(fallback);
        }
        None
    }
}
