use crate::crop::CropRect;
use crate::hex;
use crate::mode::{InputMode, OutputMode};

/// Command names understood by the host.
pub const CMD_GET_IMAGE_SIZE: &str = "get_image_size";
pub const CMD_GET_CROPPED_IMAGES: &str = "get_cropped_images";
pub const CMD_OUTPUT_IMAGES: &str = "output_images";
pub const CMD_DETACH: &str = "detach";

/// One `layer=` line of an output command: the shared-segment key plus the
/// geometry the host needs to consume it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSpec {
    pub key: String,
    pub name: Vec<u8>,
    pub channels: u32,
    pub width: u32,
    pub height: u32,
}

/// A command message to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Query the extent of the selected layer set.
    LayersExtent { mode: InputMode },
    /// Ask the host to stage cropped images in shared segments.
    CroppedImages { rect: CropRect, mode: InputMode },
    /// Announce output segments the plugin has populated.
    OutputImages {
        mode: OutputMode,
        layers: Vec<LayerSpec>,
    },
    /// Tell the host the plugin is done with its staged input segments.
    Detach,
}

impl Request {
    /// Encode to the newline-separated `key=value` wire text.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Request::LayersExtent { mode } => {
                format!("command={CMD_GET_IMAGE_SIZE}\nmode={}", mode.as_int()).into_bytes()
            }
            Request::CroppedImages { rect, mode } => {
                let rect = rect.normalized();
                format!(
                    "command={CMD_GET_CROPPED_IMAGES}\nmode={}\ncroprect={}",
                    mode.as_int(),
                    rect.encode()
                )
                .into_bytes()
            }
            Request::OutputImages { mode, layers } => {
                let mut message =
                    format!("command={CMD_OUTPUT_IMAGES}\nmode={}\n", mode.as_int());
                for layer in layers {
                    message.push_str(&format!(
                        "layer={},{},{},{},{}\n",
                        layer.key,
                        hex::encode(&layer.name),
                        layer.channels,
                        layer.width,
                        layer.height
                    ));
                }
                message.into_bytes()
            }
            Request::Detach => format!("command={CMD_DETACH}").into_bytes(),
        }
    }
}
