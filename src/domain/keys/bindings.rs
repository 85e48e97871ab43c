//! Key codes and the actions bound to them

use std::fmt;
use std::str::FromStr;

use crate::domain::error::InvalidKeyError;

/// All actions, in lookup priority order
pub const ALL_ACTIONS: &[KeyAction] = &[
    KeyAction::Toggle,
    KeyAction::Start,
    KeyAction::StopWebm,
    KeyAction::StopMp4,
];

/// Actions a key press can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Start if inactive, stop (webm) if recording
    Toggle,
    /// Start immediately
    Start,
    /// Stop and save as webm
    StopWebm,
    /// Stop and save as mp4
    StopMp4,
}

impl KeyAction {
    /// Get the string identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Toggle => "toggle",
            Self::Start => "start",
            Self::StopWebm => "stop-webm",
            Self::StopMp4 => "stop-mp4",
        }
    }

    /// Get the human-readable label
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Toggle => "Start/Stop Recording",
            Self::Start => "Start Recording",
            Self::StopWebm => "Stop and save webm",
            Self::StopMp4 => "Stop and save mp4",
        }
    }
}

impl FromStr for KeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "toggle" => Ok(Self::Toggle),
            "start" => Ok(Self::Start),
            "stop-webm" => Ok(Self::StopWebm),
            "stop-mp4" => Ok(Self::StopMp4),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Key code for a typed character.
///
/// Letters map to their uppercase ASCII code (`r` and `R` are both 82),
/// digits and space to their ASCII code.
pub fn key_code_for_char(ch: char) -> Option<u32> {
    if ch.is_ascii_alphanumeric() || ch == ' ' {
        Some(ch.to_ascii_uppercase() as u32)
    } else {
        None
    }
}

/// Parse a key written as a single character (`r`) or a numeric code (`82`)
pub fn parse_key_code(input: &str) -> Result<u32, InvalidKeyError> {
    let trimmed = input.trim();
    let err = || InvalidKeyError {
        input: input.to_string(),
    };

    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => key_code_for_char(ch).ok_or_else(err),
        (Some(_), Some(_)) => match trimmed.parse::<u32>() {
            Ok(code) if (1..=255).contains(&code) => Ok(code),
            _ => Err(err()),
        },
        (None, _) => Err(err()),
    }
}

/// Mapping from key codes to actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    pub toggle: u32,
    pub start: u32,
    pub stop_webm: u32,
    pub stop_mp4: u32,
}

impl KeyBindings {
    /// Code bound to an action
    pub const fn code_for(&self, action: KeyAction) -> u32 {
        match action {
            KeyAction::Toggle => self.toggle,
            KeyAction::Start => self.start,
            KeyAction::StopWebm => self.stop_webm,
            KeyAction::StopMp4 => self.stop_mp4,
        }
    }

    /// Action bound to a code, if any
    pub fn action_for(&self, code: u32) -> Option<KeyAction> {
        ALL_ACTIONS
            .iter()
            .copied()
            .find(|action| self.code_for(*action) == code)
    }

    /// One help line per binding, e.g. `R key: Start/Stop Recording`
    pub fn help_lines(&self) -> Vec<String> {
        ALL_ACTIONS
            .iter()
            .map(|action| format!("{} key: {}", key_label(self.code_for(*action)), action.label()))
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle: 82,    // R
            start: 83,     // S
            stop_webm: 87, // W
            stop_mp4: 77,  // M
        }
    }
}

fn key_label(code: u32) -> String {
    match char::from_u32(code) {
        Some(ch) if ch.is_ascii_alphanumeric() => ch.to_string(),
        _ => format!("#{}", code),
    }
}
