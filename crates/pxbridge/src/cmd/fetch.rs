use std::fs;

use pxbridge::{CropRect, ExchangeConfig, HostBridge, InputMode};

use crate::cmd::{parse_duration, FetchArgs};
use crate::exit::{bridge_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_images, OutputFormat};

pub fn run(args: FetchArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mode = InputMode::from_int(args.mode)
        .map_err(|err| CliError::new(USAGE, err.to_string()))?;
    let rect = match &args.crop {
        Some(text) => CropRect::parse(text)
            .map_err(|err| CliError::new(USAGE, format!("--crop: {err}")))?,
        None => CropRect::full_image(),
    };

    let config = ExchangeConfig {
        connect_timeout: timeout,
        ..ExchangeConfig::default()
    };
    let mut bridge = HostBridge::connect_with_config(&args.path, config);

    let images = bridge
        .cropped_images(rect, mode)
        .map_err(|err| bridge_error("fetch failed", err))?;

    if let Some(dir) = &args.dump {
        fs::create_dir_all(dir)
            .map_err(|err| io_error(&format!("failed creating {}", dir.display()), err))?;
        for image in &images {
            let path = dir.join(format!("{}.f32", sanitize_name(image.name())));
            fs::write(&path, image.as_bytes())
                .map_err(|err| io_error(&format!("failed writing {}", path.display()), err))?;
        }
    }

    print_images(&images, format);
    Ok(SUCCESS)
}

/// Layer names come from the host; keep only filename-safe characters.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "layer".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_name("bg/layer 1"), "bg_layer_1");
        assert_eq!(sanitize_name(""), "layer");
        assert_eq!(sanitize_name("plain-name_2"), "plain-name_2");
    }
}
