//! canvas-rec - record a display or capture device to webm/mp4
//!
//! Key presses start and stop a chunked FFmpeg recording; each stop saves a
//! timestamped webm file, or an mp4 remuxed from it.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recording session state machine, media values, key bindings, config
//! - **Application**: Recording controller, surface discovery, file export, port traits
//! - **Infrastructure**: Adapter implementations (FFmpeg capture and remux, download directory, XDG config)
//! - **CLI**: Argument parsing, key input, control socket, and the host loop

// Stopping ffmpeg relies on SIGINT, control goes over a Unix socket
#[cfg(not(unix))]
compile_error!("canvas-rec supports Unix platforms only");

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
