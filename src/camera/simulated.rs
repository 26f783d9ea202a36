//! A simulated Andor camera that generates synthetic data.
//!
//! Used when no vendor driver is linked. The cooler model and status codes follow
//! what the real driver reports so the menu and session code paths behave the
//! same way against it.

use super::{
    Camera, DriverStatus, Frame, ImageRotation, ShutterSettings, TemperatureReading, TriggerMode,
};
use crate::error::{CameraError, CameraResult};
use tracing::{debug, info};

const AMBIENT_C: i32 = 20;
const COOLING_STEP_C: i32 = 5;
/// Consecutive on-target readings before the driver reports stabilisation.
const STABLE_READINGS: u32 = 2;
const TEMPERATURE_RANGE: (i32, i32) = (-95, 25);
const EMCCD_GAIN_RANGE: (u32, u32) = (2, 300);
const PREAMP_GAINS: u32 = 3;
/// Exposure at which the synthetic gradient reaches full scale.
const FULL_SCALE_EXPOSURE_S: f64 = 0.1;

/// Deterministic camera model with a stepwise cooler and gradient frames.
pub struct SimulatedCamera {
    width: u32,
    height: u32,
    initialized: bool,
    temperature: i32,
    set_point: i32,
    cooler_on: bool,
    keep_cooler_on_shutdown: bool,
    stable_readings: u32,
    emccd_gain: u32,
    preamp_gain: u32,
    exposure_s: f64,
    trigger: TriggerMode,
    rotation: ImageRotation,
    shutter: Option<ShutterSettings>,
    single_scan: bool,
    last_frame: Option<Frame>,
    frames_acquired: u64,
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::new(512, 512)
    }
}

impl SimulatedCamera {
    /// An initialised camera at ambient temperature with a `width` x `height` sensor.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            initialized: true,
            temperature: AMBIENT_C,
            set_point: AMBIENT_C,
            cooler_on: false,
            keep_cooler_on_shutdown: false,
            stable_readings: 0,
            emccd_gain: EMCCD_GAIN_RANGE.0,
            preamp_gain: 0,
            exposure_s: FULL_SCALE_EXPOSURE_S,
            trigger: TriggerMode::Internal,
            rotation: ImageRotation::None,
            shutter: None,
            single_scan: false,
            last_frame: None,
            frames_acquired: 0,
        }
    }

    /// Trigger mode set by the last `set_trigger_mode`.
    pub fn trigger_mode(&self) -> TriggerMode {
        self.trigger
    }

    /// Exposure time in seconds.
    pub fn exposure_time(&self) -> f64 {
        self.exposure_s
    }

    /// Shutter settings, `None` until `set_shutter` succeeds.
    pub fn shutter(&self) -> Option<ShutterSettings> {
        self.shutter
    }

    /// Whether single-scan acquisition mode was selected.
    pub fn is_single_scan(&self) -> bool {
        self.single_scan
    }

    /// Number of acquisitions started so far.
    pub fn frames_acquired(&self) -> u64 {
        self.frames_acquired
    }

    fn ensure_initialized(&self, operation: &'static str) -> CameraResult<()> {
        if self.initialized {
            Ok(())
        } else {
            DriverStatus::NotInitialized.check(operation)
        }
    }

    fn step_temperature(&mut self) {
        let target = if self.cooler_on {
            self.set_point
        } else {
            AMBIENT_C
        };
        let delta = (target - self.temperature).clamp(-COOLING_STEP_C, COOLING_STEP_C);
        if delta == 0 {
            self.stable_readings = self.stable_readings.saturating_add(1);
        } else {
            self.temperature += delta;
            self.stable_readings = 0;
        }
    }

    fn cooling_status(&self) -> DriverStatus {
        if !self.cooler_on {
            DriverStatus::TempOff
        } else if self.temperature != self.set_point {
            DriverStatus::TempNotReached
        } else if self.stable_readings >= STABLE_READINGS {
            DriverStatus::TempStabilized
        } else {
            DriverStatus::TempNotStabilized
        }
    }

    fn simulate_frame_data(&self) -> Frame {
        let (width, height) = match self.rotation {
            ImageRotation::None => (self.width, self.height),
            ImageRotation::Clockwise | ImageRotation::Anticlockwise => (self.height, self.width),
        };
        let scale = (self.exposure_s / FULL_SCALE_EXPOSURE_S).min(1.0);
        let offset = self.frames_acquired as usize;

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            for x in 0..width as usize {
                let level = ((x + y + offset) % 256) as f64 * 256.0 * scale;
                pixels.push(level.round() as i32);
            }
        }

        Frame {
            width,
            height,
            pixels,
        }
    }
}

impl Camera for SimulatedCamera {
    fn detector_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn shut_down(&mut self) -> CameraResult<()> {
        self.ensure_initialized("ShutDown")?;
        if !self.keep_cooler_on_shutdown {
            self.cooler_on = false;
        }
        self.initialized = false;
        info!(cooler_on = self.cooler_on, "Simulated camera shut down");
        Ok(())
    }

    fn set_single_scan(&mut self) -> CameraResult<()> {
        self.ensure_initialized("SetReadMode")?;
        self.single_scan = true;
        Ok(())
    }

    fn set_trigger_mode(&mut self, mode: TriggerMode) -> CameraResult<()> {
        self.ensure_initialized("SetTriggerMode")?;
        self.trigger = mode;
        Ok(())
    }

    fn set_shutter(&mut self, shutter: ShutterSettings) -> CameraResult<()> {
        self.ensure_initialized("SetShutter")?;
        if !(0..=2).contains(&shutter.mode) {
            return DriverStatus::P2Invalid.check("SetShutter");
        }
        self.shutter = Some(shutter);
        Ok(())
    }

    fn set_preamp_gain(&mut self, index: u32) -> CameraResult<()> {
        self.ensure_initialized("SetPreAmpGain")?;
        if index >= PREAMP_GAINS {
            return DriverStatus::P1Invalid.check("SetPreAmpGain");
        }
        self.preamp_gain = index;
        Ok(())
    }

    fn preamp_gain(&self) -> u32 {
        self.preamp_gain
    }

    fn set_emccd_gain(&mut self, gain: u32) -> CameraResult<()> {
        self.ensure_initialized("SetEMCCDGain")?;
        if !(EMCCD_GAIN_RANGE.0..=EMCCD_GAIN_RANGE.1).contains(&gain) {
            return DriverStatus::P1Invalid.check("SetEMCCDGain");
        }
        self.emccd_gain = gain;
        Ok(())
    }

    fn emccd_gain(&mut self) -> CameraResult<u32> {
        self.ensure_initialized("GetEMCCDGain")?;
        Ok(self.emccd_gain)
    }

    fn emccd_gain_range(&mut self) -> CameraResult<(u32, u32)> {
        self.ensure_initialized("GetEMGainRange")?;
        Ok(EMCCD_GAIN_RANGE)
    }

    fn set_exposure_time(&mut self, seconds: f64) -> CameraResult<()> {
        self.ensure_initialized("SetExposureTime")?;
        if !seconds.is_finite() || seconds < 0.0 {
            return DriverStatus::P1Invalid.check("SetExposureTime");
        }
        self.exposure_s = seconds;
        Ok(())
    }

    fn set_image_rotate(&mut self, rotation: ImageRotation) -> CameraResult<()> {
        self.ensure_initialized("SetImageRotate")?;
        self.rotation = rotation;
        Ok(())
    }

    fn set_cooler_mode(&mut self, keep_on_shutdown: bool) -> CameraResult<()> {
        self.ensure_initialized("SetCoolerMode")?;
        self.keep_cooler_on_shutdown = keep_on_shutdown;
        Ok(())
    }

    fn set_temperature(&mut self, celsius: i32) -> CameraResult<()> {
        self.ensure_initialized("SetTemperature")?;
        if !(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1).contains(&celsius) {
            return DriverStatus::P1Invalid.check("SetTemperature");
        }
        self.set_point = celsius;
        self.stable_readings = 0;
        Ok(())
    }

    fn temperature(&mut self) -> CameraResult<TemperatureReading> {
        self.ensure_initialized("GetTemperature")?;
        self.step_temperature();
        let reading = TemperatureReading {
            celsius: self.temperature,
            status: self.cooling_status(),
        };
        debug!(celsius = reading.celsius, status = %reading.status, "Temperature read");
        Ok(reading)
    }

    fn cooler_on(&mut self) -> CameraResult<()> {
        self.ensure_initialized("CoolerON")?;
        self.cooler_on = true;
        Ok(())
    }

    fn cooler_off(&mut self) -> CameraResult<()> {
        self.ensure_initialized("CoolerOFF")?;
        self.cooler_on = false;
        self.stable_readings = 0;
        Ok(())
    }

    fn is_cooler_on(&mut self) -> CameraResult<bool> {
        self.ensure_initialized("IsCoolerOn")?;
        Ok(self.cooler_on)
    }

    fn start_acquisition(&mut self) -> CameraResult<()> {
        self.ensure_initialized("StartAcquisition")?;
        // External and bulb triggers fire immediately; there is no trigger line to wait on.
        let frame = self.simulate_frame_data();
        self.frames_acquired += 1;
        debug!(
            frame = self.frames_acquired,
            trigger = ?self.trigger,
            "Simulated acquisition complete"
        );
        self.last_frame = Some(frame);
        Ok(())
    }

    fn acquired_data(&mut self) -> CameraResult<Frame> {
        self.ensure_initialized("GetAcquiredData")?;
        self.last_frame.clone().ok_or(CameraError::NoData)
    }

    fn status(&mut self) -> CameraResult<DriverStatus> {
        self.ensure_initialized("GetStatus")?;
        Ok(DriverStatus::Idle)
    }
}
