//! Configuration System using Figment
//!
//! This module provides strongly-typed configuration loading for the camera tool.
//! Configuration is merged from (lowest to highest precedence):
//! 1. Built-in defaults
//! 2. A TOML file (`--config PATH`, otherwise `andor.toml` when present)
//! 3. Environment variables prefixed with `ANDOR_`
//! 4. Command-line options (see [`Settings::apply_cli`])
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore, so that multi-word keys
//! survive:
//!
//! ```text
//! ANDOR_APPLICATION__LOG_LEVEL=debug
//! ANDOR_CAMERA__TEMPERATURE=-60
//! ANDOR_ACQUISITION__OUTPUT_DIR=/data/run42
//! ```
//!
//! # Example
//!
//! ```toml
//! [camera]
//! temperature = -70
//! emccd_gain = 200
//! trigger_mode = 7
//!
//! [acquisition]
//! output_stem = "dark"
//! frame_limit = 100
//! ```

use crate::camera::{ImageRotation, TriggerMode};
use crate::cli::Cli;
use crate::menu::MenuStyle;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "andor.toml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A provider failed or a value had the wrong type.
    #[error("Configuration load error: {0}")]
    LoadError(#[from] Box<figment::Error>),
    /// Values parsed but are out of range.
    #[error("Configuration validation error: {0}")]
    ValidationError(String),
    /// The effective configuration could not be rendered.
    #[error("Configuration serialisation error: {0}")]
    SerializeError(#[from] toml::ser::Error),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Application name and logging
    pub application: ApplicationConfig,
    /// Camera start-up parameters
    pub camera: CameraConfig,
    /// Output files and acquisition limits
    pub acquisition: AcquisitionConfig,
    /// Main menu decoration
    pub menu: MenuConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Name reported in the start-up log line
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Camera start-up configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Driver backend; only `simulated` ships with this build
    pub driver: String,
    /// Set-point temperature in °C
    pub temperature: i32,
    /// EMCCD gain
    pub emccd_gain: u32,
    /// Pre-amplifier gain index
    pub preamp_gain: u32,
    /// Exposure time in seconds
    pub exposure_time: f64,
    /// 0 internal, 1 external, 7 bulb, 10 software
    pub trigger_mode: i32,
    /// Turn the cooler on at start-up
    pub cooler_on: bool,
    /// Leave the cooler running after shutdown
    pub cooler_mode: bool,
    /// Wait for the temperature to stabilise before acquiring
    pub stabilise: bool,
    /// Seconds between temperature readings while stabilising
    pub stabilise_poll_secs: u64,
    /// 0 none, 1 clockwise, 2 anticlockwise
    pub rotate: u8,
    /// Sensor columns of the simulated camera
    pub detector_width: u32,
    /// Sensor rows of the simulated camera
    pub detector_height: u32,
}

/// Where and how acquired frames are saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// File stem; frames are named `<stem>000`, `<stem>001`, ...
    pub output_stem: String,
    /// Directory receiving captured frames
    pub output_dir: PathBuf,
    /// Start continuous acquisition before showing the menu
    pub start_on_launch: bool,
    /// Stop continuous acquisition after this many frames (0 = until interrupted)
    pub frame_limit: u32,
    /// Write a BMP per frame
    pub save_bmp: bool,
    /// Write a text dump per frame
    pub save_txt: bool,
    /// Stretch BMP contrast between frame min and max
    pub normalise_bmp: bool,
}

/// Main menu decoration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    /// Printed above the entries
    pub title: String,
    /// Printed before reading a selection
    pub prompt: String,
    /// Printed before each entry
    pub prefix: String,
    /// Printed between key and label
    pub postfix: String,
    /// Text of separator rows
    pub separator: String,
    /// Terminal width entries must fit in
    pub width: usize,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "andor-camera".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            driver: "simulated".to_string(),
            temperature: -70,
            emccd_gain: 200,
            preamp_gain: 0,
            exposure_time: 0.1,
            trigger_mode: 7,
            cooler_on: false,
            cooler_mode: false,
            stabilise: false,
            stabilise_poll_secs: 10,
            rotate: 0,
            detector_width: 512,
            detector_height: 512,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            output_stem: "image".to_string(),
            output_dir: PathBuf::from("."),
            start_on_launch: false,
            frame_limit: 0,
            save_bmp: true,
            save_txt: true,
            normalise_bmp: true,
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            title: "\nmain menu\n---------\n".to_string(),
            prompt: "\n$ ".to_string(),
            prefix: "   ".to_string(),
            postfix: ") ".to_string(),
            separator: String::new(),
            width: crate::menu::DEFAULT_WIDTH,
        }
    }
}

impl MenuConfig {
    /// The decoration as a [`MenuStyle`].
    pub fn style(&self) -> MenuStyle {
        MenuStyle::default()
            .with_prefix(self.prefix.clone())
            .with_postfix(self.postfix.clone())
            .with_separator(self.separator.clone())
            .with_width(self.width)
    }
}

impl CameraConfig {
    /// The configured trigger mode, if it is one the driver knows.
    pub fn trigger(&self) -> Result<TriggerMode, ConfigError> {
        TriggerMode::try_from(self.trigger_mode).map_err(|_| {
            ConfigError::ValidationError(format!(
                "Invalid trigger_mode {}. Must be one of: 0, 1, 7, 10",
                self.trigger_mode
            ))
        })
    }

    /// The configured rotation, if valid.
    pub fn rotation(&self) -> Result<ImageRotation, ConfigError> {
        ImageRotation::try_from(self.rotate).map_err(|_| {
            ConfigError::ValidationError(format!(
                "Invalid rotate {}. Must be 0, 1 or 2",
                self.rotate
            ))
        })
    }
}

// ============================================================================
// Configuration Loading and Validation
// ============================================================================

impl Settings {
    /// Load defaults, the config file and `ANDOR_` environment overrides.
    ///
    /// With `path == None`, `andor.toml` in the working directory is used if it
    /// exists. An explicitly named file must exist.
    ///
    /// The result is not validated yet; apply command-line overrides first,
    /// then call [`Settings::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::ValidationError(format!(
                        "Config file '{}' not found",
                        path.display()
                    )));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => figment = figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        }
        Self::extract(figment.merge(Env::prefixed("ANDOR_").split("__")))
    }

    /// Parse settings from a TOML string on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::extract(
            Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| ConfigError::LoadError(Box::new(e)))
    }

    /// Command-line options take precedence over every other source.
    pub fn apply_cli(&mut self, cli: &Cli) {
        let camera = &mut self.camera;
        if let Some(t) = cli.temperature {
            camera.temperature = t;
        }
        if let Some(gain) = cli.gain {
            camera.emccd_gain = gain;
        }
        if let Some(index) = cli.preamp_gain {
            camera.preamp_gain = index;
        }
        if let Some(exposure) = cli.exposure_time {
            camera.exposure_time = exposure;
        }
        if let Some(mode) = cli.trigger_mode {
            camera.trigger_mode = mode;
        }
        if let Some(rotate) = cli.rotate {
            camera.rotate = rotate;
        }
        camera.cooler_on |= cli.cooler_on;
        camera.cooler_mode |= cli.cooler_mode;
        camera.stabilise |= cli.stabilise;

        self.acquisition.start_on_launch |= cli.start_acquisition;
        if let Some(stem) = &cli.filename {
            self.acquisition.output_stem = stem.clone();
        }
        if cli.verbose {
            self.application.log_level = "debug".to_string();
        }
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Log level is valid (trace, debug, info, warn, error)
    /// - Camera parameters are within the driver's documented ranges
    /// - Output stem is usable as a file name
    /// - The menu width fits the longest main menu label
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let camera = &self.camera;
        if !(-95..=25).contains(&camera.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid temperature {}. Must be -95 to 25",
                camera.temperature
            )));
        }
        if !(2..=300).contains(&camera.emccd_gain) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid emccd_gain {}. Must be 2 to 300",
                camera.emccd_gain
            )));
        }
        if camera.preamp_gain > 2 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid preamp_gain {}. Must be 0 to 2",
                camera.preamp_gain
            )));
        }
        if !camera.exposure_time.is_finite() || camera.exposure_time <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "Invalid exposure_time {}. Must be positive",
                camera.exposure_time
            )));
        }
        camera.trigger()?;
        camera.rotation()?;
        if camera.detector_width == 0 || camera.detector_height == 0 {
            return Err(ConfigError::ValidationError(
                "Detector dimensions must be non-zero".to_string(),
            ));
        }

        let stem = &self.acquisition.output_stem;
        if stem.is_empty() || stem.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid output_stem '{stem}'. Must be a non-empty file name"
            )));
        }

        let room = self.menu.style().max_label_len();
        let needed = crate::session::longest_menu_label();
        if room < needed {
            return Err(ConfigError::ValidationError(format!(
                "Menu width {} leaves room for {room} label chars, the main menu needs {needed}",
                self.menu.width
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.camera.trigger().unwrap(), TriggerMode::Bulb);
        assert_eq!(settings.menu.style().max_label_len(), 73);
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [camera]
            temperature = -40
            trigger_mode = 1

            [acquisition]
            output_stem = "dark"
            "#,
        )
        .unwrap();

        assert_eq!(settings.camera.temperature, -40);
        assert_eq!(settings.camera.trigger().unwrap(), TriggerMode::External);
        assert_eq!(settings.camera.emccd_gain, 200);
        assert_eq!(settings.acquisition.output_stem, "dark");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("andor.toml");
        std::fs::write(&path, "[camera]\nemccd_gain = 50\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.camera.emccd_gain, 50);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_cli_takes_precedence() {
        let mut settings = Settings::from_toml_str("[camera]\ntemperature = -40\n").unwrap();
        let cli = Cli::parse_from([
            "andor-camera",
            "-T",
            "-60",
            "--cooler-on",
            "-v",
            "--start-acquisition",
            "flat",
        ]);
        settings.apply_cli(&cli);

        assert_eq!(settings.camera.temperature, -60);
        assert!(settings.camera.cooler_on);
        assert!(settings.acquisition.start_on_launch);
        assert_eq!(settings.acquisition.output_stem, "flat");
        assert_eq!(settings.application.log_level, "debug");
        settings.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let mut settings = Settings::default();
        settings.camera.temperature = -100;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.camera.trigger_mode = 3;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("trigger_mode"));

        let mut settings = Settings::default();
        settings.application.log_level = "loud".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.acquisition.output_stem = "a/b".to_string();
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.menu.width = 6;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_menu_width_must_fit_every_main_menu_label() {
        // "   " + key + ") " + newline leaves 33 label chars at width 40.
        let mut settings = Settings::default();
        settings.menu.width = 40;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("the main menu needs 37"));

        settings.menu.width = 44;
        settings.validate().unwrap();
    }

    #[test]
    fn test_effective_config_renders_as_toml() {
        let text = Settings::default().to_toml_string().unwrap();
        let parsed = Settings::from_toml_str(&text).unwrap();
        assert_eq!(parsed, Settings::default());
    }
}
