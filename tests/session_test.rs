//! End-to-end sessions against the simulated camera.

use andor_menu::camera::{Camera, SimulatedCamera};
use andor_menu::config::Settings;
use andor_menu::console::{Console, Interrupt, ScriptedInput, SharedBuffer};
use andor_menu::session::{Session, SessionEnd};
use std::path::Path;
use tempfile::tempdir;

struct Harness {
    session: Session,
    out: SharedBuffer,
    err: SharedBuffer,
}

fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.camera.detector_width = 8;
    settings.camera.detector_height = 6;
    settings.acquisition.output_dir = dir.to_path_buf();
    settings
}

fn harness(settings: Settings, input: ScriptedInput) -> Harness {
    let (console, out, err) = Console::scripted(input);
    let camera = SimulatedCamera::new(
        settings.camera.detector_width,
        settings.camera.detector_height,
    );
    Harness {
        session: Session::new(Box::new(camera), console, Interrupt::new(), settings),
        out,
        err,
    }
}

fn camera_is_shut_down(session: &Session) -> bool {
    session.with_camera(|camera: &mut dyn Camera| camera.status().is_err())
}

#[test]
fn test_status_is_shown_first_and_quit_shuts_down() {
    let dir = tempdir().unwrap();
    let h = harness(settings_in(dir.path()), ScriptedInput::new(["8"]));

    assert_eq!(h.session.run().unwrap(), SessionEnd::Quit);

    let out = h.out.contents();
    let status = out.find("Temperature is").unwrap();
    let menu = out.find("main menu").unwrap();
    assert!(status < menu, "status report should precede the first menu");
    assert!(out.contains("[Set T: -70, DRV_TEMP_OFF]"));
    assert!(out.contains("Gain is 200, preAmp gain is 0"));
    assert!(out.contains("Shutting down the camera..."));
    assert!(camera_is_shut_down(&h.session));
}

#[test]
fn test_snapshot_writes_numbered_files() {
    let dir = tempdir().unwrap();
    let h = harness(settings_in(dir.path()), ScriptedInput::new(["6", "6", "8"]));

    h.session.run().unwrap();

    for name in ["image000", "image001"] {
        assert!(dir.path().join(format!("{name}.bmp")).exists());
        let txt = std::fs::read_to_string(dir.path().join(format!("{name}.txt"))).unwrap();
        assert_eq!(txt.lines().count(), 8 * 6);
    }
    assert!(!dir.path().join("image002.txt").exists());
    assert!(h.out.contents().contains("captured image001"));
}

#[test]
fn test_set_temperature_updates_status() {
    let dir = tempdir().unwrap();
    let h = harness(
        settings_in(dir.path()),
        ScriptedInput::new(["2", "-40", "1", "8"]),
    );

    h.session.run().unwrap();

    let out = h.out.contents();
    assert!(out.contains("Enter the set temperature"));
    assert!(out.contains("[Set T: -40,"));
    assert!(h.err.contents().is_empty());
}

#[test]
fn test_bad_values_are_reported_and_menu_continues() {
    let dir = tempdir().unwrap();
    let h = harness(
        settings_in(dir.path()),
        ScriptedInput::new(["2", "cold", "2", "-200", "5", "-1", "8"]),
    );

    assert_eq!(h.session.run().unwrap(), SessionEnd::Quit);

    let err = h.err.contents();
    assert!(err.contains("invalid value \"cold\""));
    assert!(err.contains("set temperature failed: SetTemperature failed: DRV_P1INVALID"));
    assert!(err.contains("set exposure time failed"));
}

#[test]
fn test_cooler_entries_toggle_cooler() {
    let dir = tempdir().unwrap();
    let h = harness(settings_in(dir.path()), ScriptedInput::new(["3"]));

    assert_eq!(h.session.run().unwrap(), SessionEnd::InputClosed);
    // Input ran out after turning the cooler on, so the session shut down.
    assert!(camera_is_shut_down(&h.session));

    let dir = tempdir().unwrap();
    let h = harness(settings_in(dir.path()), ScriptedInput::new(["3", "1", "7", "1", "8"]));
    h.session.run().unwrap();
    let out = h.out.contents();
    assert!(out.contains("DRV_TEMP_NOT_REACHED"));
    assert_eq!(out.matches("DRV_TEMP_OFF").count(), 2);
}

#[test]
fn test_end_of_input_shuts_down() {
    let dir = tempdir().unwrap();
    let h = harness(settings_in(dir.path()), ScriptedInput::default());

    assert_eq!(h.session.run().unwrap(), SessionEnd::InputClosed);
    assert!(h.err.contents().contains("you pressed ^D"));
    assert!(camera_is_shut_down(&h.session));
}

#[test]
fn test_interrupt_at_menu_shuts_down() {
    let dir = tempdir().unwrap();
    let h = harness(
        settings_in(dir.path()),
        ScriptedInput::new(["1"]).then_interrupt(),
    );

    assert_eq!(h.session.run().unwrap(), SessionEnd::Interrupted);
    assert!(h.err.contents().contains("you pressed ^C"));
    assert!(camera_is_shut_down(&h.session));
}

#[test]
fn test_acquisition_on_launch_honours_frame_limit() {
    let dir = tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.acquisition.start_on_launch = true;
    settings.acquisition.frame_limit = 2;
    settings.acquisition.save_bmp = false;
    let h = harness(settings, ScriptedInput::new(["4", "8"]));

    h.session.run().unwrap();

    // Two frames at launch, two more from the menu entry.
    for index in 0..4 {
        assert!(dir.path().join(format!("image{index:03}.txt")).exists());
    }
    assert!(!dir.path().join("image004.txt").exists());
    assert!(!dir.path().join("image000.bmp").exists());
    assert_eq!(
        h.out.contents().matches("acquisition stopped after 2 frames").count(),
        2
    );
}

#[test]
fn test_stabilise_on_launch_reaches_set_point() {
    let dir = tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.camera.temperature = 10;
    settings.camera.stabilise = true;
    settings.camera.stabilise_poll_secs = 0;
    let h = harness(settings, ScriptedInput::new(["8"]));

    assert_eq!(h.session.run().unwrap(), SessionEnd::Quit);
    let out = h.out.contents();
    assert!(out.contains("Stabilising the temperature..."));
    assert!(out.contains("DRV_TEMP_STABILIZED"));
}

#[test]
fn test_pending_interrupt_aborts_stabilisation() {
    let dir = tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.camera.stabilise = true;
    settings.camera.stabilise_poll_secs = 0;
    let h = harness(settings, ScriptedInput::new(["8"]));
    h.session.context().interrupt().trigger();

    assert_eq!(h.session.run().unwrap(), SessionEnd::Interrupted);
    assert!(camera_is_shut_down(&h.session));
}

#[test]
fn test_interrupted_value_prompt_returns_to_menu() {
    let dir = tempdir().unwrap();
    let h = harness(
        settings_in(dir.path()),
        ScriptedInput::new(["2"])
            .then_interrupt()
            .then_line("1")
            .then_line("8"),
    );

    assert_eq!(h.session.run().unwrap(), SessionEnd::Quit);

    let err = h.err.contents();
    assert!(err.contains("no value entered: interrupted by user"));
    assert!(!err.contains("you pressed ^C"));
    // Both status reports still show the configured set point.
    assert_eq!(h.out.contents().matches("[Set T: -70,").count(), 2);
}

#[test]
fn test_menu_that_cannot_be_built_leaves_camera_shut_down() {
    let dir = tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.menu.width = 40;
    settings.camera.cooler_on = true;
    let h = harness(settings, ScriptedInput::new(["8"]));

    let err = h.session.run().unwrap_err();
    assert!(err.to_string().contains("text must be max 33 chars, got 37"));
    assert!(camera_is_shut_down(&h.session));
}

#[test]
fn test_start_up_failure_leaves_camera_shut_down() {
    let dir = tempdir().unwrap();
    let mut settings = settings_in(dir.path());
    settings.camera.temperature = -120;
    let h = harness(settings, ScriptedInput::new(["8"]));

    assert!(h.session.run().is_err());
    assert!(camera_is_shut_down(&h.session));
    assert!(h.out.contents().is_empty());
}
