use pxbridge_proto::SAMPLE_SIZE;

use crate::error::{BridgeError, Result};

/// An in-memory image tensor of `width × height × channels` 32-bit float
/// samples plus its layer name.
///
/// Owned exclusively by the caller that constructed it; decoding from a
/// shared segment always allocates a fresh buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    name: String,
    width: u32,
    height: u32,
    channels: u32,
    data: Vec<f32>,
}

impl ImageBuffer {
    /// A zero-filled image of the given geometry.
    pub fn zeroed(name: impl Into<String>, width: u32, height: u32, channels: u32) -> Self {
        let count = width as usize * height as usize * channels as usize;
        Self {
            name: name.into(),
            width,
            height,
            channels,
            data: vec![0.0; count],
        }
    }

    /// Build an image from owned samples, checking the count against the
    /// geometry.
    pub fn from_samples(
        name: impl Into<String>,
        width: u32,
        height: u32,
        channels: u32,
        data: Vec<f32>,
    ) -> Result<Self> {
        let name = name.into();
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(BridgeError::ImageGeometry {
                name,
                width,
                height,
                channels,
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            name,
            width,
            height,
            channels,
            data,
        })
    }

    /// Decode an image from raw native-endian sample bytes.
    pub fn from_bytes(
        name: impl Into<String>,
        width: u32,
        height: u32,
        channels: u32,
        bytes: &[u8],
    ) -> Result<Self> {
        let data: Vec<f32> = bytes
            .chunks_exact(SAMPLE_SIZE)
            .map(|chunk| f32::from_ne_bytes(chunk.try_into().unwrap_or([0; SAMPLE_SIZE])))
            .collect();
        Self::from_samples(name, width, height, channels, data)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Number of samples.
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }

    /// Size of the raw sample data in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len() * SAMPLE_SIZE
    }

    /// The samples, row-major, channel-interleaved as staged by the host.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// The raw sample bytes, for bulk copies into shared segments.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: any f32 slice is valid to view as bytes; length and
        // alignment are trivially satisfied.
        unsafe {
            std::slice::from_raw_parts(self.data.as_ptr().cast::<u8>(), self.byte_len())
        }
    }
}
