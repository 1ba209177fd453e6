use pxbridge::proto::Request;
use pxbridge::{Exchange, ExchangeConfig, SocketExchange};

use crate::cmd::{parse_duration, DetachArgs};
use crate::exit::{bridge_error, CliResult, SUCCESS};

pub fn run(args: DetachArgs) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let config = ExchangeConfig {
        connect_timeout: timeout,
        ..ExchangeConfig::default()
    };

    let mut exchange = SocketExchange::with_config(&args.path, config);
    exchange
        .exchange(&Request::Detach.encode())
        .map_err(|err| bridge_error("detach failed", err))?;

    Ok(SUCCESS)
}
