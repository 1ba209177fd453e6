use clap::{Args, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod detach;
pub mod doctor;
pub mod extent;
pub mod fetch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query the pixel extent of the selected layer set.
    Extent(ExtentArgs),
    /// Fetch staged images and print their geometry.
    Fetch(FetchArgs),
    /// Tell the host to release its staged segments.
    Detach(DetachArgs),
    /// Run local environment health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Extent(args) => extent::run(args, format),
        Command::Fetch(args) => fetch::run(args, format),
        Command::Detach(args) => detach::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct ExtentArgs {
    /// Host socket path to connect to.
    pub path: PathBuf,
    /// Input mode (0=none, 1=active, 2=all, 3=active+below, 4=active+above,
    /// 5=all visible, 6=all invisible).
    #[arg(long, short = 'm', default_value = "1")]
    pub mode: i32,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Host socket path to connect to.
    pub path: PathBuf,
    /// Input mode (see extent).
    #[arg(long, short = 'm', default_value = "1")]
    pub mode: i32,
    /// Crop rectangle as x,y,w,h in normalized [0,1] coordinates.
    /// Defaults to the whole image.
    #[arg(long, value_name = "RECT")]
    pub crop: Option<String>,
    /// Write each image's raw sample bytes to DIR/<name>.f32.
    #[arg(long, value_name = "DIR")]
    pub dump: Option<PathBuf>,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct DetachArgs {
    /// Host socket path to connect to.
    pub path: PathBuf,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
