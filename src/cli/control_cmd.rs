//! Control command handler - sends commands to a running recorder

use super::args::ControlAction;
use super::presenter::Presenter;
use super::socket::{ControlSocketClient, SocketPath, StatusReport};
use crate::domain::keys::parse_key_code;

/// Socket command line for an action
pub fn command_line(action: &ControlAction) -> Result<String, String> {
    Ok(match action {
        ControlAction::Key { key } => {
            let code = parse_key_code(key).map_err(|e| e.to_string())?;
            format!("key {}", code)
        }
        ControlAction::Toggle => "toggle".to_string(),
        ControlAction::Start => "start".to_string(),
        ControlAction::StopWebm => "stop-webm".to_string(),
        ControlAction::StopMp4 => "stop-mp4".to_string(),
        ControlAction::Status => "status".to_string(),
    })
}

/// Handle control subcommand
pub async fn handle_control_command(
    action: ControlAction,
    presenter: &Presenter,
) -> Result<(), String> {
    let cmd = command_line(&action)?;
    let client = ControlSocketClient::new(SocketPath::new());

    if !client.is_recorder_running() {
        return Err("No recorder running. Start one with: canvas-rec".to_string());
    }

    let response = client
        .send_command(&cmd)
        .await
        .map_err(|e| format!("Failed to communicate with recorder: {}", e))?;
    let response = response.trim();

    if let Some(stripped) = response.strip_prefix("error:") {
        return Err(stripped.trim().to_string());
    }

    match action {
        ControlAction::Status => {
            let report: StatusReport = serde_json::from_str(response)
                .map_err(|e| format!("Unexpected status reply: {}", e))?;
            presenter.status(&report);
        }
        _ => presenter.info(&format!("Command sent: {}", cmd)),
    }

    Ok(())
}
