use crate::error::{ProtoError, Result};
use crate::hex;

/// Bytes per sample; all image data crosses the bridge as 32-bit floats.
pub const SAMPLE_SIZE: usize = std::mem::size_of::<f32>();

/// One parsed line of a layer-list response: the shared-segment key plus
/// the geometry needed to size the copy out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    pub key: String,
    pub name: String,
    pub channels: u32,
    pub width: u32,
    pub height: u32,
}

impl LayerEntry {
    /// The exact number of bytes the segment holds for this entry.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize * SAMPLE_SIZE
    }
}

/// Parse an extent response of the form `width,height`.
pub fn parse_extent(text: &str) -> Result<(u32, u32)> {
    let malformed = || ProtoError::MalformedExtent(text.to_string());
    let fields: Vec<&str> = text
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() != 2 {
        return Err(malformed());
    }
    let width = fields[0].parse().map_err(|_| malformed())?;
    let height = fields[1].parse().map_err(|_| malformed())?;
    Ok((width, height))
}

/// Parse one layer-list line of the form `key,hexName,channels,width,height`.
pub fn parse_layer_line(line: &str) -> Result<LayerEntry> {
    let malformed = |reason: &'static str| ProtoError::MalformedLayerLine {
        line: line.to_string(),
        reason,
    };

    let fields: Vec<&str> = line
        .split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() != 5 {
        return Err(malformed("expected 5 comma-separated fields"));
    }

    let name_bytes = hex::decode(fields[1])?;
    let name = String::from_utf8_lossy(&name_bytes).into_owned();

    let channels: u32 = fields[2].parse().map_err(|_| malformed("bad channel count"))?;
    let width: u32 = fields[3].parse().map_err(|_| malformed("bad width"))?;
    let height: u32 = fields[4].parse().map_err(|_| malformed("bad height"))?;
    if channels == 0 || width == 0 || height == 0 {
        return Err(malformed("zero geometry"));
    }

    Ok(LayerEntry {
        key: fields[0].to_string(),
        name,
        channels,
        width,
        height,
    })
}
