//! Shared-memory image bridge between an editor host and its plugin process.
//!
//! The host application and the filter plugin are separate OS processes with
//! no shared address space except what is explicitly mapped. Small control
//! messages travel over a Unix domain socket (one blocking request/response
//! exchange at a time); large image pixel buffers travel through named
//! shared-memory segments referenced by keys embedded in the messages.
//!
//! [`HostBridge`] is the plugin-side client: it queries the selected layer
//! extent, fetches cropped images the host has staged in shared memory, and
//! publishes output images back through segments it creates and tracks.
//!
//! # Crate Structure
//!
//! - [`transport`] — Unix domain socket transport with bounded connects
//! - [`frame`] — 4-byte length-prefixed message framing plus the `ack` token
//! - [`shm`] — named shared segments and the output-segment registry
//! - [`proto`] — textual command/response model
//!
//! # Example
//!
//! ```no_run
//! use pxbridge::{CropRect, HostBridge, InputMode};
//!
//! let mut bridge = HostBridge::connect("/run/user/1000/editor-host.sock");
//! let (width, height) = bridge.layers_extent(InputMode::Active)?;
//! let images = bridge.cropped_images(CropRect::full_image(), InputMode::Active)?;
//! assert!(images.iter().all(|img| img.channels() == 4));
//! # Ok::<(), pxbridge::BridgeError>(())
//! ```

pub mod bridge;
pub mod error;
pub mod exchange;
pub mod image;

/// Re-export transport types.
pub mod transport {
    pub use pxbridge_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pxbridge_frame::*;
}

/// Re-export shared-memory types.
pub mod shm {
    pub use pxbridge_shm::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use pxbridge_proto::*;
}

pub use bridge::HostBridge;
pub use error::{BridgeError, Result};
pub use exchange::{Exchange, ExchangeConfig, SocketExchange};
pub use image::ImageBuffer;
pub use pxbridge_proto::{CropRect, InputMode, OutputMode};
