use pxbridge::{ExchangeConfig, HostBridge, InputMode};

use crate::cmd::{parse_duration, ExtentArgs};
use crate::exit::{bridge_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_extent, OutputFormat};

pub fn run(args: ExtentArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mode = InputMode::from_int(args.mode)
        .map_err(|err| CliError::new(USAGE, err.to_string()))?;

    let config = ExchangeConfig {
        connect_timeout: timeout,
        ..ExchangeConfig::default()
    };
    let mut bridge = HostBridge::connect_with_config(&args.path, config);

    let (width, height) = bridge
        .layers_extent(mode)
        .map_err(|err| bridge_error("extent query failed", err))?;

    print_extent(width, height, format);
    Ok(SUCCESS)
}
