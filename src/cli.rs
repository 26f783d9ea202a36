//! Command-line options.
//!
//! Every camera option is optional here: when absent, the value from the config
//! file, the environment or the built-in default is used instead.

use clap::Parser;
use std::path::PathBuf;

/// Command-line options of `andor-camera`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "andor-camera", version, about = "Interactive control for Andor cameras")]
pub struct Cli {
    /// Set-point temperature in C [-95 to +25]
    #[arg(short = 'T', long, allow_negative_numbers = true)]
    pub temperature: Option<i32>,

    /// EMCCD gain [2 to 300]
    #[arg(short = 'G', long)]
    pub gain: Option<u32>,

    /// Pre-amp gain index [0 to 2]
    #[arg(short = 'p', long)]
    pub preamp_gain: Option<u32>,

    /// Exposure time in seconds
    #[arg(short = 't', long)]
    pub exposure_time: Option<f64>,

    /// Trigger mode (0: int, 1: ext, 7: bulb, 10: soft)
    #[arg(long)]
    pub trigger_mode: Option<i32>,

    /// Turn on the cooler
    #[arg(long)]
    pub cooler_on: bool,

    /// Leave the cooler on after shutdown
    #[arg(long)]
    pub cooler_mode: bool,

    /// Stabilise the temperature before acquisition
    #[arg(long)]
    pub stabilise: bool,

    /// Rotate the image (0: no rotation, 1: 90deg clockwise, 2: 90deg anti clockwise)
    #[arg(long)]
    pub rotate: Option<u8>,

    /// Start acquisition right away
    #[arg(long)]
    pub start_acquisition: bool,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file (defaults to ./andor.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    pub print_config: bool,

    /// Output file stem for captured frames
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_short_flags_are_case_sensitive() {
        let cli = Cli::parse_from(["andor-camera", "-T", "-20", "-t", "0.5", "-G", "100"]);
        assert_eq!(cli.temperature, Some(-20));
        assert_eq!(cli.exposure_time, Some(0.5));
        assert_eq!(cli.gain, Some(100));
        assert_eq!(cli.filename, None);
    }
}
