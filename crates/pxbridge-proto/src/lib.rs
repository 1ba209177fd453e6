//! Textual command/response model for the pxbridge host protocol.
//!
//! Commands are newline-separated `key=value` ASCII lines; responses are
//! comma-separated fields, one line per image for layer lists. Layer names
//! may contain arbitrary bytes and travel hex-encoded wherever they are
//! embedded in a field.
//!
//! Request wire shapes:
//! ```text
//! command=get_image_size\nmode=<int>
//! command=get_cropped_images\nmode=<int>\ncroprect=<x>,<y>,<w>,<h>
//! command=output_images\nmode=<int>\n(layer=<key>,<hex>,<ch>,<w>,<h>\n)*
//! command=detach
//! ```
//!
//! Response shapes:
//! ```text
//! <width>,<height>                       (extent query)
//! <key>,<hexName>,<channels>,<w>,<h>     (one line per image)
//! ```

pub mod crop;
pub mod error;
pub mod hex;
pub mod mode;
pub mod request;
pub mod response;

pub use crop::CropRect;
pub use error::{ProtoError, Result};
pub use mode::{InputMode, OutputMode};
pub use request::{LayerSpec, Request};
pub use response::{parse_extent, parse_layer_line, LayerEntry, SAMPLE_SIZE};
