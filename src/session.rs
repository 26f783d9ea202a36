//! Camera session and the main menu.
//!
//! A [`Session`] owns everything the interactive tool needs while it runs: the
//! camera, the console, the interruption handle, the effective settings and the
//! acquisition counters. All of it lives in one [`SessionContext`] behind an
//! `Arc`; every menu callback holds a clone of that `Arc`, and the Ctrl-C
//! watcher only ever touches the [`Interrupt`] inside it. Nothing is global.
//!
//! ## Lifecycle
//!
//! 1. [`Session::run`] applies the start-up settings to the camera.
//! 2. Optionally waits for the cooler to stabilise.
//! 3. Optionally starts continuous acquisition right away; Ctrl-C stops it.
//! 4. Runs the main menu, showing the status entry first, until `quit` or until
//!    input is exhausted or interrupted at the menu prompt. The camera is shut
//!    down on every exit path.

use crate::camera::{Camera, ShutterSettings, TriggerMode};
use crate::config::{CameraConfig, Settings};
use crate::console::{Console, Interrupt};
use crate::error::{AppResult, CameraError, CameraResult, InputError, MenuError};
use crate::export;
use crate::menu::{MenuAction, MenuSystem};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key of the main menu's quit entry.
pub const QUIT_KEY: &str = "8";
/// Key shown first when the menu opens.
pub const STATUS_KEY: &str = "1";

const LABEL_STATUS: &str = "view the current status";
const LABEL_SET_TEMPERATURE: &str = "set the temperature";
const LABEL_COOLER_ON: &str = "turn on the cooler";
const LABEL_ACQUIRE: &str = "start acquisition [EXT Trig]";
const LABEL_EXPOSURE: &str = "set the exposure time";
const LABEL_SNAPSHOT: &str = "capture a single snapshot [Soft Trig]";
const LABEL_COOLER_OFF: &str = "turn off the cooler";
const LABEL_QUIT: &str = "quit";

/// Labels of the main menu, in display order.
pub const MENU_LABELS: [&str; 8] = [
    LABEL_STATUS,
    LABEL_SET_TEMPERATURE,
    LABEL_COOLER_ON,
    LABEL_ACQUIRE,
    LABEL_EXPOSURE,
    LABEL_SNAPSHOT,
    LABEL_COOLER_OFF,
    LABEL_QUIT,
];

/// Character count of the longest main menu label.
pub fn longest_menu_label() -> usize {
    MENU_LABELS
        .iter()
        .map(|label| label.chars().count())
        .max()
        .unwrap_or(0)
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The quit entry was selected.
    Quit,
    /// Ctrl-C at the menu prompt, or during start-up stabilisation.
    Interrupted,
    /// Standard input was closed.
    InputClosed,
}

#[derive(Debug)]
struct SessionState {
    next_index: u32,
    set_point: i32,
    last_capture: Option<(DateTime<Local>, String)>,
    shut_down: bool,
}

/// State shared between the session, its menu callbacks and the interrupt handler.
pub struct SessionContext {
    camera: Mutex<Box<dyn Camera>>,
    console: Console,
    interrupt: Interrupt,
    settings: Settings,
    state: Mutex<SessionState>,
}

/// An interactive camera session; see the module docs for its lifecycle.
pub struct Session {
    ctx: Arc<SessionContext>,
}

impl Session {
    /// Wrap an opened camera and console with the effective settings.
    pub fn new(
        camera: Box<dyn Camera>,
        console: Console,
        interrupt: Interrupt,
        settings: Settings,
    ) -> Self {
        let state = SessionState {
            next_index: 0,
            set_point: settings.camera.temperature,
            last_capture: None,
            shut_down: false,
        };
        Self {
            ctx: Arc::new(SessionContext {
                camera: Mutex::new(camera),
                console,
                interrupt,
                settings,
                state: Mutex::new(state),
            }),
        }
    }

    /// The shared state the menu callbacks hold.
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Run `f` against the camera while holding its lock.
    pub fn with_camera<R>(&self, f: impl FnOnce(&mut dyn Camera) -> R) -> R {
        let mut camera = self.ctx.camera.lock();
        f(&mut **camera)
    }

    /// Build the main menu; each callback closes over this session's context.
    pub fn build_menu(&self) -> Result<MenuSystem, MenuError> {
        let config = &self.ctx.settings.menu;
        let mut menu = MenuSystem::with_style(config.title.clone(), config.prompt.clone(), config.style());

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            STATUS_KEY,
            LABEL_STATUS,
            MenuAction::callback(move || {
                ctx.show_status();
                false
            }),
        )?;
        menu.add_separator();

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "2",
            LABEL_SET_TEMPERATURE,
            MenuAction::callback(move || {
                ctx.prompt_set_temperature();
                false
            }),
        )?;

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "3",
            LABEL_COOLER_ON,
            MenuAction::callback(move || {
                let result = ctx.camera.lock().cooler_on();
                ctx.report_result("turn on the cooler", result);
                false
            }),
        )?;

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "4",
            LABEL_ACQUIRE,
            MenuAction::callback(move || {
                let result = ctx.continuous_acquisition().map(|_| ());
                ctx.report_result("continuous acquisition", result);
                false
            }),
        )?;

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "5",
            LABEL_EXPOSURE,
            MenuAction::callback(move || {
                ctx.prompt_exposure_time();
                false
            }),
        )?;

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "6",
            LABEL_SNAPSHOT,
            MenuAction::callback(move || {
                let result = ctx.capture_snapshot().map(|_| ());
                ctx.report_result("snapshot", result);
                false
            }),
        )?;

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            "7",
            LABEL_COOLER_OFF,
            MenuAction::callback(move || {
                let result = ctx.camera.lock().cooler_off();
                ctx.report_result("turn off the cooler", result);
                false
            }),
        )?;
        menu.add_separator();

        let ctx = Arc::clone(&self.ctx);
        menu.add_entry(
            QUIT_KEY,
            LABEL_QUIT,
            MenuAction::callback(move || {
                ctx.say("Shutting down the camera...");
                let result = ctx.shut_down();
                ctx.report_result("shutdown", result);
                true
            }),
        )?;

        Ok(menu)
    }

    /// Start the camera and drive the main menu until the user leaves.
    ///
    /// The camera is shut down before returning, errors included.
    pub fn run(&self) -> AppResult<SessionEnd> {
        let result = self.start_and_drive();
        if let Err(err) = &result {
            error!("Session failed: {}", err);
            self.ctx.shut_down_quietly();
        }
        result
    }

    fn start_and_drive(&self) -> AppResult<SessionEnd> {
        let ctx = &self.ctx;
        let mut menu = self.build_menu()?;
        ctx.initialise()?;

        if ctx.settings.camera.stabilise {
            let poll = Duration::from_secs(ctx.settings.camera.stabilise_poll_secs);
            if !ctx.stabilise(poll)? {
                ctx.say("shutting down the camera ...");
                ctx.shut_down_quietly();
                return Ok(SessionEnd::Interrupted);
            }
        }

        if ctx.settings.acquisition.start_on_launch {
            let result = ctx.continuous_acquisition().map(|_| ());
            ctx.report_result("continuous acquisition", result);
        }

        let mut preset = Some(STATUS_KEY);
        loop {
            match menu.run(&ctx.console, preset.take()) {
                Ok(key) if key == QUIT_KEY => {
                    info!("Session ended by user");
                    return Ok(SessionEnd::Quit);
                }
                Ok(key) => debug!(%key, "Menu returned without quitting"),
                Err(err) => {
                    info!(%err, "Menu input ended, shutting down");
                    ctx.shut_down_quietly();
                    return Ok(match err {
                        InputError::Interrupted => SessionEnd::Interrupted,
                        InputError::Exhausted | InputError::Io(_) => SessionEnd::InputClosed,
                    });
                }
            }
        }
    }
}

/// Push start-up parameters to `camera`: read mode, trigger, shutter, gains,
/// exposure, rotation and cooling.
pub fn apply_camera_settings(camera: &mut dyn Camera, config: &CameraConfig) -> AppResult<()> {
    let trigger = config.trigger()?;
    let rotation = config.rotation()?;

    let (min_gain, max_gain) = camera.emccd_gain_range()?;
    if !(min_gain..=max_gain).contains(&config.emccd_gain) {
        return Err(CameraError::OutOfRange {
            parameter: "emccd_gain",
            value: f64::from(config.emccd_gain),
            min: f64::from(min_gain),
            max: f64::from(max_gain),
        }
        .into());
    }
    camera.set_single_scan()?;
    camera.set_trigger_mode(trigger)?;
    camera.set_shutter(ShutterSettings::open())?;
    camera.set_preamp_gain(config.preamp_gain)?;
    camera.set_emccd_gain(config.emccd_gain)?;
    camera.set_exposure_time(config.exposure_time)?;
    camera.set_image_rotate(rotation)?;
    if config.cooler_mode {
        camera.set_cooler_mode(true)?;
    }
    camera.set_temperature(config.temperature)?;
    if config.cooler_on {
        camera.cooler_on()?;
    }

    let (width, height) = camera.detector_size();
    info!(
        width,
        height,
        temperature = config.temperature,
        gain = config.emccd_gain,
        exposure = config.exposure_time,
        trigger = ?trigger,
        "Camera initialised"
    );
    Ok(())
}

impl SessionContext {
    /// The effective settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// The handle Ctrl-C raises.
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// Apply the configured start-up parameters to the camera.
    pub fn initialise(&self) -> AppResult<()> {
        let mut camera = self.camera.lock();
        apply_camera_settings(&mut **camera, &self.settings.camera)
    }

    /// Poll until the driver reports a stabilised temperature.
    ///
    /// Returns `false` if interrupted first.
    pub fn stabilise(&self, poll: Duration) -> AppResult<bool> {
        self.say("Stabilising the temperature...");
        {
            let mut camera = self.camera.lock();
            if !camera.is_cooler_on()? {
                camera.cooler_on()?;
            }
        }
        let set_point = self.state.lock().set_point;

        loop {
            if self.interrupt.take() {
                info!("Temperature stabilisation interrupted");
                return Ok(false);
            }
            let reading = self.camera.lock().temperature()?;
            if reading.is_stabilised() {
                info!(celsius = reading.celsius, "Temperature stabilised");
                return Ok(true);
            }
            self.say(&format!(
                "Temperature is: {} [Set T: {}, {}]",
                reading.celsius, set_point, reading.status
            ));
            if !poll.is_zero() {
                std::thread::sleep(poll);
            }
        }
    }

    /// Acquire one frame and write the configured exports.
    pub fn snap(&self) -> AppResult<Vec<PathBuf>> {
        let acquisition = &self.settings.acquisition;
        let index = self.state.lock().next_index;
        let name = export::snapshot_name(&acquisition.output_stem, index);

        self.say("Ready for Acquisition...");
        let frame = {
            let mut camera = self.camera.lock();
            camera.start_acquisition()?;
            camera.acquired_data()?
        };

        std::fs::create_dir_all(&acquisition.output_dir)?;
        let mut written = Vec::new();
        if acquisition.save_bmp {
            let path = export::snapshot_path(&acquisition.output_dir, &name, "bmp");
            if acquisition.normalise_bmp {
                export::save_as_bmp_normalised(&frame, &path)?;
            } else {
                export::save_as_bmp(&frame, &path)?;
            }
            written.push(path);
        }
        if acquisition.save_txt {
            let path = export::snapshot_path(&acquisition.output_dir, &name, "txt");
            export::save_as_txt(&frame, &path)?;
            written.push(path);
        }

        {
            let mut state = self.state.lock();
            state.next_index += 1;
            state.last_capture = Some((Local::now(), name.clone()));
        }
        info!(name = %name, files = written.len(), "Captured frame");
        self.say(&format!("captured {name}"));
        Ok(written)
    }

    /// One frame with the internal trigger.
    pub fn capture_snapshot(&self) -> AppResult<Vec<PathBuf>> {
        self.camera.lock().set_trigger_mode(TriggerMode::Internal)?;
        self.snap()
    }

    /// Acquire frames with the configured trigger until interrupted or the
    /// frame limit is reached. Returns the number of frames captured.
    pub fn continuous_acquisition(&self) -> AppResult<u32> {
        let trigger = self.settings.camera.trigger()?;
        let limit = self.settings.acquisition.frame_limit;
        self.camera.lock().set_trigger_mode(trigger)?;
        info!(?trigger, limit, "Continuous acquisition started");

        let mut captured = 0;
        loop {
            if self.interrupt.take() {
                info!(captured, "Continuous acquisition interrupted");
                break;
            }
            if limit > 0 && captured >= limit {
                break;
            }
            self.snap()?;
            captured += 1;
        }
        self.say(&format!("acquisition stopped after {captured} frames"));
        Ok(captured)
    }

    /// Temperature, set point, gains and the most recent capture.
    pub fn status_report(&self) -> CameraResult<Vec<String>> {
        let (set_point, last_capture) = {
            let state = self.state.lock();
            (state.set_point, state.last_capture.clone())
        };
        let (reading, gain, preamp) = {
            let mut camera = self.camera.lock();
            (camera.temperature()?, camera.emccd_gain()?, camera.preamp_gain())
        };

        let mut lines = vec![
            format!(
                "Temperature is {} [Set T: {}, {}]",
                reading.celsius, set_point, reading.status
            ),
            format!("Gain is {gain}, preAmp gain is {preamp}"),
        ];
        if let Some((at, name)) = last_capture {
            lines.push(format!("Last capture {name} at {}", at.format("%H:%M:%S")));
        }
        Ok(lines)
    }

    /// Shut the camera down once; later calls are no-ops.
    pub fn shut_down(&self) -> CameraResult<()> {
        let mut state = self.state.lock();
        if state.shut_down {
            return Ok(());
        }
        self.camera.lock().shut_down()?;
        state.shut_down = true;
        info!("Camera shut down");
        Ok(())
    }

    fn shut_down_quietly(&self) {
        if let Err(err) = self.shut_down() {
            error!("Camera shutdown failed: {}", err);
        }
    }

    fn show_status(&self) {
        match self.status_report() {
            Ok(lines) => {
                self.say(&self.settings.menu.separator);
                let prefix = &self.settings.menu.prefix;
                for line in lines {
                    self.say(&format!("{prefix}{line}"));
                }
            }
            Err(err) => self.complain(&format!("status unavailable: {err}")),
        }
    }

    fn prompt_set_temperature(&self) {
        let Some(celsius) = self.prompt_value::<i32>("Enter the set temperature [-95 .. +25]: ")
        else {
            return;
        };
        let result = self.camera.lock().set_temperature(celsius);
        if result.is_ok() {
            self.state.lock().set_point = celsius;
        }
        self.report_result("set temperature", result);
    }

    fn prompt_exposure_time(&self) {
        let Some(seconds) = self.prompt_value::<f64>("Enter the exposure time is seconds: ") else {
            return;
        };
        let result = self.camera.lock().set_exposure_time(seconds);
        self.report_result("set exposure time", result);
    }

    fn prompt_value<T>(&self, question: &str) -> Option<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.say(&self.settings.menu.separator);
        let prompt = format!("{}{}", self.settings.menu.prefix, question);
        let line = match self.console.prompt(&prompt) {
            Ok(line) => line,
            Err(err) => {
                self.complain(&format!("no value entered: {err}"));
                return None;
            }
        };
        match line.trim().parse() {
            Ok(value) => Some(value),
            Err(err) => {
                self.complain(&format!("invalid value {line:?}: {err}"));
                None
            }
        }
    }

    fn report_result<E: Display>(&self, what: &str, result: Result<(), E>) {
        if let Err(err) = result {
            self.complain(&format!("{what} failed: {err}"));
        }
    }

    fn say(&self, line: &str) {
        if let Err(err) = self.console.write_out(&format!("{line}\n")) {
            warn!("Console write failed: {}", err);
        }
    }

    fn complain(&self, message: &str) {
        warn!("{}", message);
        if let Err(err) = self.console.write_err(&format!("{message}\n")) {
            warn!("Console write failed: {}", err);
        }
    }
}
