//! Configuration domain module

mod app_config;

pub use app_config::{
    AppConfig, KeysConfig, DEFAULT_FRAME_RATE, DEFAULT_POLL_INTERVAL_MS, DEFAULT_SURFACE,
};
