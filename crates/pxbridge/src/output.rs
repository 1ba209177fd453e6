use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use pxbridge::ImageBuffer;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ExtentOutput {
    width: u32,
    height: u32,
}

pub fn print_extent(width: u32, height: u32, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ExtentOutput { width, height };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["WIDTH", "HEIGHT"])
                .add_row(vec![width.to_string(), height.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("extent: {width}x{height}");
        }
        OutputFormat::Raw => {
            println!("{width},{height}");
        }
    }
}

#[derive(Serialize)]
struct LayerOutput<'a> {
    name: &'a str,
    width: u32,
    height: u32,
    channels: u32,
    bytes: usize,
}

pub fn print_images(images: &[ImageBuffer], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<LayerOutput<'_>> = images
                .iter()
                .map(|img| LayerOutput {
                    name: img.name(),
                    width: img.width(),
                    height: img.height(),
                    channels: img.channels(),
                    bytes: img.byte_len(),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "WIDTH", "HEIGHT", "CHANNELS", "BYTES"]);
            for img in images {
                table.add_row(vec![
                    img.name().to_string(),
                    img.width().to_string(),
                    img.height().to_string(),
                    img.channels().to_string(),
                    img.byte_len().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for img in images {
                println!(
                    "{}: {}x{}x{} ({} bytes)",
                    img.name(),
                    img.width(),
                    img.height(),
                    img.channels(),
                    img.byte_len()
                );
            }
        }
        OutputFormat::Raw => {
            for img in images {
                println!(
                    "{},{},{},{}",
                    img.name(),
                    img.width(),
                    img.height(),
                    img.channels()
                );
            }
        }
    }
}
