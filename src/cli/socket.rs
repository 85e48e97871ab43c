//! Unix Domain Socket control channel for a running recorder

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use super::signals::ControlSignal;
use crate::domain::keys::{parse_key_code, KeyAction};

/// Socket file name inside the runtime directory
const SOCKET_NAME: &str = "canvas-rec.sock";

/// Per-user runtime directory: XDG_RUNTIME_DIR, else the temp dir
pub fn runtime_dir() -> PathBuf {
    std::env::var("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir())
}

/// Socket path resolver
#[derive(Debug, Clone)]
pub struct SocketPath {
    path: PathBuf,
}

impl SocketPath {
    /// Socket path inside the runtime directory
    pub fn new() -> Self {
        Self {
            path: runtime_dir().join(SOCKET_NAME),
        }
    }

    /// Create with custom path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if socket file exists
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Remove socket file if it exists
    pub fn cleanup(&self) -> io::Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl Default for SocketPath {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot answered to `status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// `inactive` or `recording`
    pub state: String,
    /// A stop is waiting for the recorder to finish
    pub finalizing: bool,
    /// Container the pending or next stop exports to
    pub container: String,
    /// Chunks held in the session
    pub chunks: usize,
    /// Bytes held in the session
    pub bytes: usize,
    /// Captured surface, once found
    pub surface: Option<String>,
    /// Last saved file
    pub last_file: Option<String>,
}

/// Status shared between the recording loop and the socket server
pub type SharedStatus = Arc<Mutex<StatusReport>>;

/// A parsed socket command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCommand {
    /// Forward to the recording loop
    Signal(ControlSignal),
    /// Answer with the current status
    Status,
}

/// Parse one command line
pub fn parse_command(line: &str) -> Result<SocketCommand, String> {
    let line = line.trim();
    let (cmd, arg) = match line.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, Some(arg.trim())),
        None => (line, None),
    };

    match (cmd, arg) {
        ("status", None) => Ok(SocketCommand::Status),
        ("key", Some(key)) => parse_key_code(key)
            .map(|code| SocketCommand::Signal(ControlSignal::Key(code)))
            .map_err(|e| e.to_string()),
        ("key", None) => Err("key needs an argument".to_string()),
        (action, None) => action
            .parse::<KeyAction>()
            .map(|a| SocketCommand::Signal(ControlSignal::Action(a)))
            .map_err(|_| "unknown command".to_string()),
        _ => Err("unknown command".to_string()),
    }
}

/// Control socket server - listens for commands and sends them to the loop
pub struct ControlSocketServer {
    socket_path: SocketPath,
    listener: Option<UnixListener>,
}

impl ControlSocketServer {
    /// Create a new socket server
    pub fn new(socket_path: SocketPath) -> Self {
        Self {
            socket_path,
            listener: None,
        }
    }

    /// Bind to the socket
    pub fn bind(&mut self) -> io::Result<()> {
        // Remove stale socket file if it exists
        self.socket_path.cleanup()?;

        let listener = UnixListener::bind(self.socket_path.path())?;
        self.listener = Some(listener);
        Ok(())
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        self.socket_path.path()
    }

    /// Accept connections, one command per connection, until the task is dropped
    pub async fn run(&self, tx: mpsc::Sender<ControlSignal>, status: SharedStatus) -> io::Result<()> {
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "Socket not bound"))?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let tx = tx.clone();
                    let status = Arc::clone(&status);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, tx, status).await {
                            tracing::warn!(error = %e, "control connection failed");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "control socket accept failed");
                }
            }
        }
    }

    /// Cleanup socket file
    pub fn cleanup(&self) {
        let _ = self.socket_path.cleanup();
    }
}

impl Drop for ControlSocketServer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Handle a single client connection
async fn handle_connection(
    stream: UnixStream,
    tx: mpsc::Sender<ControlSignal>,
    status: SharedStatus,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    reader.read_line(&mut line).await?;
    tracing::debug!(command = line.trim(), "control command");

    let response = match parse_command(&line) {
        Ok(SocketCommand::Signal(signal)) => match tx.send(signal).await {
            Ok(()) => "ok".to_string(),
            Err(_) => "error: recorder is shutting down".to_string(),
        },
        Ok(SocketCommand::Status) => {
            let report = status.lock().unwrap_or_else(|e| e.into_inner()).clone();
            serde_json::to_string(&report)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        }
        Err(message) => format!("error: {}", message),
    };

    writer.write_all(format!("{}\n", response).as_bytes()).await?;
    writer.flush().await?;

    Ok(())
}

/// Control socket client - connects and sends commands
pub struct ControlSocketClient {
    socket_path: SocketPath,
}

impl ControlSocketClient {
    /// Create a new socket client
    pub fn new(socket_path: SocketPath) -> Self {
        Self { socket_path }
    }

    /// Check if a recorder appears to be running (socket exists)
    pub fn is_recorder_running(&self) -> bool {
        self.socket_path.exists()
    }

    /// Send a command and receive the response line
    pub async fn send_command(&self, cmd: &str) -> io::Result<String> {
        let stream = UnixStream::connect(self.socket_path.path()).await?;
        let (reader, mut writer) = stream.into_split();

        writer.write_all(format!("{}\n", cmd).as_bytes()).await?;
        writer.flush().await?;

        let mut reader = BufReader::new(reader);
        let mut response = String::new();
        reader.read_line(&mut response).await?;

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_commands() {
        assert_eq!(parse_command("status\n"), Ok(SocketCommand::Status));
        assert_eq!(
            parse_command("toggle"),
            Ok(SocketCommand::Signal(ControlSignal::Action(KeyAction::Toggle)))
        );
        assert_eq!(
            parse_command("stop-mp4"),
            Ok(SocketCommand::Signal(ControlSignal::Action(KeyAction::StopMp4)))
        );
        assert_eq!(
            parse_command("key r"),
            Ok(SocketCommand::Signal(ControlSignal::Key(82)))
        );
        assert_eq!(
            parse_command("key 77"),
            Ok(SocketCommand::Signal(ControlSignal::Key(77)))
        );
        assert!(parse_command("key").is_err());
        assert!(parse_command("key ctrl").is_err());
        assert!(parse_command("cancel").is_err());
        assert!(parse_command("toggle now").is_err());
    }

    #[test]
    fn socket_path_in_runtime_dir() {
        let socket_path = SocketPath::new();
        assert_eq!(socket_path.path(), runtime_dir().join(SOCKET_NAME));
    }

    #[tokio::test]
    async fn server_forwards_commands_and_reports_status() {
        let dir = TempDir::new().unwrap();
        let socket_path = SocketPath::with_path(dir.path().join("control.sock"));
        let mut server = ControlSocketServer::new(socket_path.clone());
        server.bind().unwrap();

        let status: SharedStatus = Arc::new(Mutex::new(StatusReport {
            state: "recording".to_string(),
            container: "webm".to_string(),
            chunks: 3,
            bytes: 42,
            ..Default::default()
        }));
        let (tx, mut rx) = mpsc::channel(4);
        let status_for_server = Arc::clone(&status);
        let task = tokio::spawn(async move {
            let _ = server.run(tx, status_for_server).await;
        });

        let client = ControlSocketClient::new(socket_path);
        assert!(client.is_recorder_running());

        let response = client.send_command("stop-webm").await.unwrap();
        assert_eq!(response.trim(), "ok");
        assert_eq!(
            rx.recv().await,
            Some(ControlSignal::Action(KeyAction::StopWebm))
        );

        let response = client.send_command("status").await.unwrap();
        let report: StatusReport = serde_json::from_str(response.trim()).unwrap();
        assert_eq!(report.state, "recording");
        assert_eq!(report.chunks, 3);
        assert_eq!(report.bytes, 42);

        let response = client.send_command("bogus").await.unwrap();
        assert!(response.starts_with("error:"));

        task.abort();
    }
}
