//! Key binding module

mod bindings;

pub use bindings::{key_code_for_char, parse_key_code, KeyAction, KeyBindings, ALL_ACTIONS};
