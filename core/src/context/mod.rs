//! Configuration context
//!
//! Persistence of [`AppConfig`](holeylight_types::AppConfig) and change
//! notification for the config file.

mod config;
mod error;
mod watcher;

pub use config::{APP_NAME, AppConfigExt, CONFIG_NAME};
pub use error::ConfigError;
pub use watcher::{ConfigChange, ConfigWatcher};
