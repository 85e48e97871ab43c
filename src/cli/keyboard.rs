//! Key presses typed on stdin

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::signals::ControlSignal;
use crate::domain::keys::key_code_for_char;

/// Key codes for the characters of one input line
pub fn key_codes_in_line(line: &str) -> Vec<u32> {
    line.chars().filter_map(key_code_for_char).collect()
}

/// Forward every typed character as a key press until EOF
pub fn spawn_key_reader<I>(input: I, tx: mpsc::Sender<ControlSignal>) -> JoinHandle<()>
where
    I: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(input).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    for code in key_codes_in_line(&line) {
                        if tx.send(ControlSignal::Key(code)).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!("stdin closed, key input stopped");
                    return;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reading stdin failed");
                    return;
                }
            }
        }
    })
}
