//! Application configuration persistence
//!
//! Wraps `confy` so the rest of the engine only sees [`AppConfig`].

use std::path::{Path, PathBuf};

use holeylight_types::AppConfig;

use super::ConfigError;

/// confy application name (config directory)
pub const APP_NAME: &str = "holeylight";
/// confy configuration name (file stem)
pub const CONFIG_NAME: &str = "config";

/// Extension trait for AppConfig persistence
pub trait AppConfigExt: Sized {
    /// Load from the default location, falling back to defaults on error
    fn load() -> Self;
    /// Load from an explicit file
    fn load_from(path: &Path) -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    fn to_toml(&self) -> Result<String, ConfigError>;
    /// Clamp values the engine cannot work with
    fn sanitize(&mut self);
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        let mut config = match confy::load::<AppConfig>(APP_NAME, CONFIG_NAME) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load configuration, using defaults");
                AppConfig::default()
            }
        };
        config.sanitize();
        config
    }

    fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config: AppConfig = confy::load_path(path)?;
        config.sanitize();
        Ok(config)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, CONFIG_NAME, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)?)
    }

    fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn sanitize(&mut self) {
        let speed = self.lights.speed;
        if !speed.is_finite() || speed <= 0.0 {
            tracing::warn!(speed, "Invalid animation speed, resetting to 1.0");
            self.lights.speed = 1.0;
        }
        if self.render.refresh_hz == 0 {
            self.render.refresh_hz = 60;
        }
        if self.cutout.density <= 0.0 {
            self.cutout.density = 1.0;
        }
    }
}
