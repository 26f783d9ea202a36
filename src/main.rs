//! andor-camera: interactive control for Andor cameras.

use andor_menu::cli::Cli;
use andor_menu::config::Settings;
use andor_menu::console::Console;
use andor_menu::session::{Session, SessionEnd};
use andor_menu::{camera, logging};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    settings.apply_cli(&cli);

    if cli.print_config {
        print!("{}", settings.to_toml_string()?);
        return Ok(());
    }
    settings.validate().context("Invalid configuration")?;

    logging::init(&settings.application.log_level)?;
    info!(
        name = %settings.application.name,
        driver = %settings.camera.driver,
        "Starting"
    );

    let (console, interrupt) = Console::stdio().context("Failed to attach to the terminal")?;
    let camera = camera::open(&settings.camera)
        .with_context(|| format!("Failed to open camera '{}'", settings.camera.driver))?;

    let session = Session::new(camera, console, interrupt, settings);
    let end = session.run()?;
    match end {
        SessionEnd::Quit => info!("Bye"),
        SessionEnd::Interrupted => info!("Interrupted, camera shut down"),
        SessionEnd::InputClosed => info!("Input closed, camera shut down"),
    }
    Ok(())
}
