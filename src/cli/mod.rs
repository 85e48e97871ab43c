//! CLI layer - Command-line interface
//!
//! Contains argument parsing, output formatting, signal handling,
//! key input, the control socket and the recorder runner.

pub mod app;
pub mod args;
pub mod config_cmd;
pub mod control_cmd;
pub mod keyboard;
pub mod pid_file;
pub mod presenter;
pub mod signals;
pub mod socket;

// Re-export commonly used types
pub use app::{load_merged_config, run_recorder, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE_ERROR};
pub use args::{Cli, Commands, ConfigAction, ControlAction, RecordOptions};
pub use control_cmd::handle_control_command;
pub use presenter::Presenter;
