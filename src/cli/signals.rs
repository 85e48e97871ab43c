//! Control signals for the recording loop

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

use crate::domain::keys::KeyAction;

/// Something the recording loop must react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// A key press, by key code
    Key(u32),
    /// A named action (from the control socket)
    Action(KeyAction),
    /// Stop, save what was recorded, and exit (SIGINT/SIGTERM)
    Shutdown,
}

/// Control signal handler
///
/// Turns SIGINT/SIGTERM into `Shutdown` and hands out a sender for the other
/// sources (stdin keys, control socket).
pub struct ControlSignalHandler {
    receiver: mpsc::Receiver<ControlSignal>,
}

impl ControlSignalHandler {
    /// Create the handler and start listening for OS signals.
    pub async fn new() -> Result<(Self, mpsc::Sender<ControlSignal>), std::io::Error> {
        let (tx, rx) = mpsc::channel(32);

        let tx_int = tx.clone();
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::spawn(async move {
            sigint.recv().await;
            tracing::info!("received SIGINT");
            let _ = tx_int.send(ControlSignal::Shutdown).await;
        });

        let tx_term = tx.clone();
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::spawn(async move {
            sigterm.recv().await;
            tracing::info!("received SIGTERM");
            let _ = tx_term.send(ControlSignal::Shutdown).await;
        });

        Ok((Self { receiver: rx }, tx))
    }

    /// Wrap an existing receiver, without OS signal handling
    pub fn from_receiver(receiver: mpsc::Receiver<ControlSignal>) -> Self {
        Self { receiver }
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> Option<ControlSignal> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signals_arrive_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let mut handler = ControlSignalHandler::from_receiver(rx);

        tx.send(ControlSignal::Key(82)).await.unwrap();
        tx.send(ControlSignal::Action(KeyAction::StopMp4)).await.unwrap();
        drop(tx);

        assert_eq!(handler.recv().await, Some(ControlSignal::Key(82)));
        assert_eq!(
            handler.recv().await,
            Some(ControlSignal::Action(KeyAction::StopMp4))
        );
        assert_eq!(handler.recv().await, None);
    }
}
