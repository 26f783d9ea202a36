//! Camera device abstraction.
//!
//! The menu tool talks to hardware only through the [`Camera`] trait. Each method
//! corresponds to one call into the Andor driver; implementations translate the
//! driver's integer status code into a [`DriverStatus`] and return
//! [`CameraError::Driver`] for anything other than `DRV_SUCCESS`.
//!
//! ## Configuration
//!
//! ```toml
//! [camera]
//! driver = "simulated"
//! temperature = -70
//! emccd_gain = 200
//! preamp_gain = 0
//! exposure_time = 0.1
//! trigger_mode = 7
//! detector_width = 512
//! detector_height = 512
//! ```

/// Driver stand-in used when no vendor SDK is linked.
pub mod simulated;

pub use simulated::SimulatedCamera;

use crate::config::CameraConfig;
use crate::error::{AppError, AppResult, CameraError, CameraResult};
use std::fmt;

/// Status codes returned by the Andor driver.
///
/// Variants mirror the driver's `DRV_*` constants; see [`DriverStatus::as_str`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverStatus {
    Success,
    VxdNotInstalled,
    ErrorFileLoad,
    ErrorVxdInit,
    ErrorPageLock,
    ErrorPageUnlock,
    ErrorAck,
    NoNewData,
    SpoolError,
    TempOff,
    TempNotStabilized,
    TempStabilized,
    TempNotReached,
    TempOutRange,
    TempNotSupported,
    TempDrift,
    CofNotLoaded,
    FlexError,
    P1Invalid,
    P2Invalid,
    P3Invalid,
    P4Invalid,
    IniError,
    CoError,
    Acquiring,
    Idle,
    TempCycle,
    NotInitialized,
    P5Invalid,
    P6Invalid,
    P7Invalid,
    UsbError,
    NotSupported,
    BinningError,
    NoCamera,
    NotAvailable,
    /// A code this crate does not know about.
    Unknown(u32),
}

const STATUS_CODES: &[(u32, DriverStatus)] = &[
    (20002, DriverStatus::Success),
    (20003, DriverStatus::VxdNotInstalled),
    (20006, DriverStatus::ErrorFileLoad),
    (20007, DriverStatus::ErrorVxdInit),
    (20010, DriverStatus::ErrorPageLock),
    (20011, DriverStatus::ErrorPageUnlock),
    (20013, DriverStatus::ErrorAck),
    (20024, DriverStatus::NoNewData),
    (20026, DriverStatus::SpoolError),
    (20034, DriverStatus::TempOff),
    (20035, DriverStatus::TempNotStabilized),
    (20036, DriverStatus::TempStabilized),
    (20037, DriverStatus::TempNotReached),
    (20038, DriverStatus::TempOutRange),
    (20039, DriverStatus::TempNotSupported),
    (20040, DriverStatus::TempDrift),
    (20050, DriverStatus::CofNotLoaded),
    (20053, DriverStatus::FlexError),
    (20066, DriverStatus::P1Invalid),
    (20067, DriverStatus::P2Invalid),
    (20068, DriverStatus::P3Invalid),
    (20069, DriverStatus::P4Invalid),
    (20070, DriverStatus::IniError),
    (20071, DriverStatus::CoError),
    (20072, DriverStatus::Acquiring),
    (20073, DriverStatus::Idle),
    (20074, DriverStatus::TempCycle),
    (20075, DriverStatus::NotInitialized),
    (20076, DriverStatus::P5Invalid),
    (20077, DriverStatus::P6Invalid),
    (20083, DriverStatus::P7Invalid),
    (20089, DriverStatus::UsbError),
    (20091, DriverStatus::NotSupported),
    (20099, DriverStatus::BinningError),
    (20990, DriverStatus::NoCamera),
    (20992, DriverStatus::NotAvailable),
];

impl DriverStatus {
    /// Translate a raw driver return code.
    pub fn from_code(code: u32) -> Self {
        // 20991 is a second spelling of DRV_NOT_SUPPORTED in the driver headers.
        if code == 20991 {
            return DriverStatus::NotSupported;
        }
        STATUS_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, status)| *status)
            .unwrap_or(DriverStatus::Unknown(code))
    }

    /// Numeric driver code; `Unknown` keeps the code it was built from.
    pub fn code(&self) -> u32 {
        if let DriverStatus::Unknown(code) = self {
            return *code;
        }
        STATUS_CODES
            .iter()
            .find(|(_, s)| s == self)
            .map(|(c, _)| *c)
            .unwrap_or(0)
    }

    /// The driver's `DRV_*` constant name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Success => "DRV_SUCCESS",
            DriverStatus::VxdNotInstalled => "DRV_VXNOTINSTALLED",
            DriverStatus::ErrorFileLoad => "DRV_ERROR_FILELOAD",
            DriverStatus::ErrorVxdInit => "DRV_ERROR_VXD_INIT",
            DriverStatus::ErrorPageLock => "DRV_ERROR_PAGELOCK",
            DriverStatus::ErrorPageUnlock => "DRV_ERROR_PAGE_UNLOCK",
            DriverStatus::ErrorAck => "DRV_ERROR_ACK",
            DriverStatus::NoNewData => "DRV_NO_NEW_DATA",
            DriverStatus::SpoolError => "DRV_SPOOLERROR",
            DriverStatus::TempOff => "DRV_TEMP_OFF",
            DriverStatus::TempNotStabilized => "DRV_TEMP_NOT_STABILIZED",
            DriverStatus::TempStabilized => "DRV_TEMP_STABILIZED",
            DriverStatus::TempNotReached => "DRV_TEMP_NOT_REACHED",
            DriverStatus::TempOutRange => "DRV_TEMP_OUT_RANGE",
            DriverStatus::TempNotSupported => "DRV_TEMP_NOT_SUPPORTED",
            DriverStatus::TempDrift => "DRV_TEMP_DRIFT",
            DriverStatus::CofNotLoaded => "DRV_COF_NOTLOADED",
            DriverStatus::FlexError => "DRV_FLEXERROR",
            DriverStatus::P1Invalid => "DRV_P1INVALID",
            DriverStatus::P2Invalid => "DRV_P2INVALID",
            DriverStatus::P3Invalid => "DRV_P3INVALID",
            DriverStatus::P4Invalid => "DRV_P4INVALID",
            DriverStatus::IniError => "DRV_INIERROR",
            DriverStatus::CoError => "DRV_COERROR",
            DriverStatus::Acquiring => "DRV_ACQUIRING",
            DriverStatus::Idle => "DRV_IDLE",
            DriverStatus::TempCycle => "DRV_TEMPCYCLE",
            DriverStatus::NotInitialized => "DRV_NOT_INITIALIZED",
            DriverStatus::P5Invalid => "DRV_P5INVALID",
            DriverStatus::P6Invalid => "DRV_P6INVALID",
            DriverStatus::P7Invalid => "P7_INVALID",
            DriverStatus::UsbError => "DRV_USBERROR",
            DriverStatus::NotSupported => "DRV_NOT_SUPPORTED",
            DriverStatus::BinningError => "DRV_BINNING_ERROR",
            DriverStatus::NoCamera => "DRV_NOCAMERA",
            DriverStatus::NotAvailable => "DRV_NOT_AVAILABLE",
            DriverStatus::Unknown(_) => "DRV_UNKNOWN",
        }
    }

    /// Turn a status into a `Result`, naming the driver call that produced it.
    pub fn check(self, operation: &'static str) -> CameraResult<()> {
        match self {
            DriverStatus::Success => Ok(()),
            status => Err(CameraError::Driver { operation, status }),
        }
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverStatus::Unknown(code) => write!(f, "DRV_UNKNOWN({code})"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Trigger source for an acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Free-running internal clock.
    Internal,
    /// External TTL trigger.
    External,
    /// External exposure: the trigger pulse width sets the exposure.
    Bulb,
    /// Triggered by a driver call.
    Software,
}

impl TriggerMode {
    /// Code passed to `SetTriggerMode`.
    pub fn code(self) -> i32 {
        match self {
            TriggerMode::Internal => 0,
            TriggerMode::External => 1,
            TriggerMode::Bulb => 7,
            TriggerMode::Software => 10,
        }
    }
}

impl TryFrom<i32> for TriggerMode {
    type Error = CameraError;

    fn try_from(code: i32) -> CameraResult<Self> {
        match code {
            0 => Ok(TriggerMode::Internal),
            1 => Ok(TriggerMode::External),
            7 => Ok(TriggerMode::Bulb),
            10 => Ok(TriggerMode::Software),
            other => {
                tracing::debug!(trigger_mode = other, "rejected trigger mode");
                Err(CameraError::Driver {
                    operation: "SetTriggerMode",
                    status: DriverStatus::P1Invalid,
                })
            }
        }
    }
}

/// On-chip image rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRotation {
    /// No rotation.
    None,
    /// 90 degrees clockwise.
    Clockwise,
    /// 90 degrees anticlockwise.
    Anticlockwise,
}

impl ImageRotation {
    /// Code passed to `SetImageRotate`.
    pub fn code(self) -> u8 {
        match self {
            ImageRotation::None => 0,
            ImageRotation::Clockwise => 1,
            ImageRotation::Anticlockwise => 2,
        }
    }
}

impl TryFrom<u8> for ImageRotation {
    type Error = CameraError;

    fn try_from(code: u8) -> CameraResult<Self> {
        match code {
            0 => Ok(ImageRotation::None),
            1 => Ok(ImageRotation::Clockwise),
            2 => Ok(ImageRotation::Anticlockwise),
            other => Err(CameraError::OutOfRange {
                parameter: "rotation",
                value: f64::from(other),
                min: 0.0,
                max: 2.0,
            }),
        }
    }
}

/// Shutter configuration as passed to `SetShutter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutterSettings {
    /// TTL signal polarity (0 low, 1 high)
    pub kind: i32,
    /// 0 auto, 1 open, 2 closed
    pub mode: i32,
    /// Closing time in milliseconds
    pub closing_ms: i32,
    /// Opening time in milliseconds
    pub opening_ms: i32,
}

impl ShutterSettings {
    /// High TTL, shutter held open, no extra delays.
    pub fn open() -> Self {
        Self {
            kind: 1,
            mode: 1,
            closing_ms: 0,
            opening_ms: 0,
        }
    }
}

/// A temperature reading together with the cooling status the driver reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemperatureReading {
    /// Sensor temperature in °C
    pub celsius: i32,
    /// Cooling status returned with the reading
    pub status: DriverStatus,
}

impl TemperatureReading {
    /// Whether the driver reports `DRV_TEMP_STABILIZED`.
    pub fn is_stabilised(&self) -> bool {
        self.status == DriverStatus::TempStabilized
    }
}

/// One acquired image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Columns
    pub width: u32,
    /// Rows
    pub height: u32,
    /// Pixel counts, `width * height` of them
    pub pixels: Vec<i32>,
}

impl Frame {
    /// Smallest pixel value, `None` for an empty frame.
    pub fn min(&self) -> Option<i32> {
        self.pixels.iter().copied().min()
    }

    /// Largest pixel value, `None` for an empty frame.
    pub fn max(&self) -> Option<i32> {
        self.pixels.iter().copied().max()
    }
}

/// Hardware-agnostic interface to one Andor camera.
///
/// Methods take `&mut self` because every driver call may change device state,
/// including the getters (the driver caches the last reading).
pub trait Camera: Send {
    /// Detector size in pixels as `(width, height)`.
    fn detector_size(&self) -> (u32, u32);

    /// Release the driver; later calls fail with `DRV_NOT_INITIALIZED`.
    fn shut_down(&mut self) -> CameraResult<()>;

    /// Image read mode, single-scan acquisition mode, full unbinned frame.
    fn set_single_scan(&mut self) -> CameraResult<()>;

    /// Select the trigger source for following acquisitions.
    fn set_trigger_mode(&mut self, mode: TriggerMode) -> CameraResult<()>;

    /// Configure the shutter.
    fn set_shutter(&mut self, shutter: ShutterSettings) -> CameraResult<()>;

    /// Select a pre-amplifier gain by index.
    fn set_preamp_gain(&mut self, index: u32) -> CameraResult<()>;

    /// The selected pre-amplifier gain index.
    fn preamp_gain(&self) -> u32;

    /// Set the EMCCD gain; must lie within [`Camera::emccd_gain_range`].
    fn set_emccd_gain(&mut self, gain: u32) -> CameraResult<()>;

    /// Current EMCCD gain.
    fn emccd_gain(&mut self) -> CameraResult<u32>;

    /// Inclusive `(min, max)` EMCCD gain.
    fn emccd_gain_range(&mut self) -> CameraResult<(u32, u32)>;

    /// Exposure time in seconds.
    fn set_exposure_time(&mut self, seconds: f64) -> CameraResult<()>;

    /// Rotate frames on readout.
    fn set_image_rotate(&mut self, rotation: ImageRotation) -> CameraResult<()>;

    /// Whether the cooler keeps running after `shut_down`.
    fn set_cooler_mode(&mut self, keep_on_shutdown: bool) -> CameraResult<()>;

    /// Cooler set point in °C.
    fn set_temperature(&mut self, celsius: i32) -> CameraResult<()>;

    /// Read the sensor temperature and cooling status.
    fn temperature(&mut self) -> CameraResult<TemperatureReading>;

    /// Start cooling toward the set point.
    fn cooler_on(&mut self) -> CameraResult<()>;

    /// Stop cooling.
    fn cooler_off(&mut self) -> CameraResult<()>;

    /// Whether the cooler is running.
    fn is_cooler_on(&mut self) -> CameraResult<bool>;

    /// Start an acquisition and block until the exposure has completed.
    fn start_acquisition(&mut self) -> CameraResult<()>;

    /// The frame from the last completed acquisition.
    fn acquired_data(&mut self) -> CameraResult<Frame>;

    /// Acquisition status (`DRV_IDLE`, `DRV_ACQUIRING`, ...).
    fn status(&mut self) -> CameraResult<DriverStatus>;
}

/// Open the camera driver named in the configuration.
pub fn open(config: &CameraConfig) -> AppResult<Box<dyn Camera>> {
    match config.driver.as_str() {
        "simulated" => {
            tracing::info!(
                width = config.detector_width,
                height = config.detector_height,
                "Opening simulated camera"
            );
            Ok(Box::new(SimulatedCamera::new(
                config.detector_width,
                config.detector_height,
            )))
        }
        other => Err(AppError::DriverNotAvailable(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_table() {
        assert_eq!(DriverStatus::from_code(20036), DriverStatus::TempStabilized);
        assert_eq!(DriverStatus::TempStabilized.code(), 20036);
        assert_eq!(DriverStatus::from_code(20991), DriverStatus::NotSupported);
        assert_eq!(DriverStatus::from_code(12345), DriverStatus::Unknown(12345));
        assert_eq!(DriverStatus::Unknown(12345).code(), 12345);
    }

    #[test]
    fn test_check_maps_failure_to_error() {
        assert!(DriverStatus::Success.check("CoolerON").is_ok());
        let err = DriverStatus::NotInitialized.check("CoolerON").unwrap_err();
        assert_eq!(err.to_string(), "CoolerON failed: DRV_NOT_INITIALIZED");
    }

    #[test]
    fn test_trigger_mode_codes() {
        assert_eq!(TriggerMode::try_from(7).unwrap(), TriggerMode::Bulb);
        assert_eq!(TriggerMode::Software.code(), 10);
        assert!(TriggerMode::try_from(3).is_err());
    }

    #[test]
    fn test_open_rejects_unknown_driver() {
        let config = CameraConfig {
            driver: "andor-sdk".to_string(),
            ..CameraConfig::default()
        };
        assert!(matches!(
            open(&config),
            Err(AppError::DriverNotAvailable(name)) if name == "andor-sdk"
        ));
    }
}
