//! CLI presenter for output formatting

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use super::socket::StatusReport;
use crate::application::ExportedFile;
use crate::domain::recording::human_readable_size;

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
    is_spinner_active: Arc<AtomicBool>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self {
            spinner: None,
            is_spinner_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        self.spinner = Some(spinner);
        self.is_spinner_active.store(true, Ordering::SeqCst);
    }

    /// Check if a spinner is running
    pub fn is_spinner_active(&self) -> bool {
        self.is_spinner_active.load(Ordering::SeqCst)
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    /// Stop spinner without status
    pub fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.is_spinner_active.store(false, Ordering::SeqCst);
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Print recorder status
    pub fn recorder_status(&self, state: &str) {
        eprintln!("{} Recorder: {}", "●".red(), state);
    }

    /// Print the path of a saved file to stdout, details to stderr
    pub fn saved(&self, file: &ExportedFile) {
        self.success(&format_saved(file));
        self.output(&file.path.to_string_lossy());
    }

    /// Print a status report from a running recorder
    pub fn status(&self, report: &StatusReport) {
        self.key_value("state", &report.state);
        self.key_value("finalizing", &report.finalizing.to_string());
        self.key_value("container", &report.container);
        self.key_value(
            "buffered",
            &format!(
                "{} chunks, {}",
                report.chunks,
                human_readable_size(report.bytes)
            ),
        );
        self.key_value("surface", report.surface.as_deref().unwrap_or("(none)"));
        self.key_value("last_file", report.last_file.as_deref().unwrap_or("(none)"));
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line summary of a saved file
pub fn format_saved(file: &ExportedFile) -> String {
    format!(
        "Saved {} ({}, {})",
        file.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        file.container,
        human_readable_size(file.size_bytes)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::recording::Container;
    use std::path::PathBuf;

    #[test]
    fn saved_summary() {
        let file = ExportedFile {
            path: PathBuf::from("/home/me/Downloads/20240305090702.mp4"),
            container: Container::Mp4,
            size_bytes: 2048,
        };
        assert_eq!(format_saved(&file), "Saved 20240305090702.mp4 (mp4, 2.0 KB)");
    }

    #[test]
    fn spinner_lifecycle() {
        let mut presenter = Presenter::new();
        assert!(!presenter.is_spinner_active());
        presenter.start_spinner("Waiting");
        assert!(presenter.is_spinner_active());
        presenter.stop_spinner();
        assert!(!presenter.is_spinner_active());
    }
}
