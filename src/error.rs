//! Custom error types for the application.
//!
//! This module defines the error taxonomy shared by the menu core, the camera
//! abstraction and the surrounding command-line tool. Using the `thiserror`
//! crate, every failure mode has a concrete variant with a human-readable
//! message.
//!
//! ## Error Hierarchy
//!
//! - **`MenuError`**: Raised synchronously while registering menu entries
//!   (malformed key, overlong label, duplicate key). Registration happens at
//!   start-up, so callers usually treat these as fatal.
//! - **`InvalidSelection`**: A recoverable problem with one line of user input
//!   (wrong length, unknown key). The menu loop absorbs these itself; they are
//!   only exposed so the two conditions can be told apart in logs and tests.
//! - **`InputError`**: The only failures that escape `MenuSystem::run`: the input
//!   stream ran dry, the user interrupted, or the stream itself broke.
//! - **`CameraError`**: Anything reported by a camera driver, including driver
//!   status codes other than `DRV_SUCCESS`.
//! - **`ExportError`**: Failures while writing acquired images to disk.
//! - **`AppError`**: Aggregates all of the above (plus configuration errors) so
//!   the binary can use `?` throughout.

use crate::camera::DriverStatus;
use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Convenience alias for camera driver results.
pub type CameraResult<T> = std::result::Result<T, CameraError>;

/// Every failure the binary can report.
#[derive(Error, Debug)]
pub enum AppError {
    /// Loading or validating settings failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// The main menu could not be built.
    #[error("Menu registration error: {0}")]
    Menu(#[from] MenuError),

    /// A driver call failed.
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Writing a frame to disk failed.
    #[error("Image export error: {0}")]
    Export(#[from] ExportError),

    /// Reading user input failed.
    #[error("Console input error: {0}")]
    Input(#[from] InputError),

    /// File system or terminal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracing subscriber could not be installed.
    #[error("Logging initialisation failed: {0}")]
    Logging(String),

    /// The configured driver is not compiled in.
    #[error("Camera driver '{0}' is not available in this build")]
    DriverNotAvailable(String),
}

/// Rejection of a `MenuSystem::add_entry` call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MenuError {
    /// The key is not exactly one character.
    #[error("key must be one char, got {0:?}")]
    KeyLength(String),

    /// The label exceeds the width budget.
    #[error("text must be max {max} chars, got {len}")]
    LabelTooLong { len: usize, max: usize },

    /// The key is not an ASCII letter or digit.
    #[error("bad key for menu entry: {0:?}")]
    BadKey(char),

    /// Another entry already uses the key.
    #[error("key must be unique to this menu: {0:?}")]
    DuplicateKey(char),
}

/// A line of input the menu loop could not dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidSelection {
    /// The line was not a single character; carries its length.
    #[error("expected a single character, got {0} characters")]
    WrongLength(usize),

    /// No entry is bound to this key.
    #[error("no menu entry for key {0:?}")]
    UnknownKey(char),
}

/// Why a prompt produced no line.
#[derive(Error, Debug)]
pub enum InputError {
    /// No more input (^D or end of script).
    #[error("end of input")]
    Exhausted,

    /// The user pressed ^C.
    #[error("interrupted by user")]
    Interrupted,

    /// The input stream itself failed.
    #[error("input stream failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by a camera driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CameraError {
    /// The driver returned a status other than `DRV_SUCCESS`.
    #[error("{operation} failed: {status}")]
    Driver {
        operation: &'static str,
        status: DriverStatus,
    },

    /// A parameter lies outside the range the device supports.
    #[error("{parameter} out of range: {value} (allowed {min} to {max})")]
    OutOfRange {
        parameter: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Data was requested before any acquisition.
    #[error("no acquired data available")]
    NoData,
}

/// Failures while writing a frame.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Creating or writing the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// BMP encoding failed.
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// The pixel count does not match the frame size.
    #[error("frame of {width}x{height} does not match {pixels} pixels")]
    Dimensions { width: u32, height: u32, pixels: usize },

    /// The frame has no pixels.
    #[error("frame contains no pixels")]
    EmptyFrame,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MenuError::LabelTooLong { len: 77, max: 76 };
        assert_eq!(err.to_string(), "text must be max 76 chars, got 77");
    }

    #[test]
    fn test_camera_driver_error_names_status() {
        let err = CameraError::Driver {
            operation: "SetTemperature",
            status: DriverStatus::P1Invalid,
        };
        assert_eq!(err.to_string(), "SetTemperature failed: DRV_P1INVALID");
    }

    #[test]
    fn test_app_error_wraps_menu_error() {
        let err: AppError = MenuError::DuplicateKey('x').into();
        assert!(err.to_string().contains("unique"));
    }
}
