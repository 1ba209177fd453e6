use crate::error::{ProtoError, Result};

/// Fractional crop rectangle selecting a subset of the host's image.
///
/// Coordinates are host-side scaled fractions of the full extent. An
/// all-negative rectangle is the sentinel for "entire image" and normalizes
/// to the unit rectangle before encoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl CropRect {
    /// Construct a rectangle from fractional coordinates.
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// The "entire image" sentinel.
    pub fn full_image() -> Self {
        Self::new(-1.0, -1.0, -1.0, -1.0)
    }

    /// Whether this rectangle is the all-negative sentinel.
    pub fn is_full_image_sentinel(&self) -> bool {
        self.x < 0.0 && self.y < 0.0 && self.w < 0.0 && self.h < 0.0
    }

    /// Resolve the sentinel to the unit rectangle; other rectangles pass
    /// through unchanged.
    pub fn normalized(&self) -> Self {
        if self.is_full_image_sentinel() {
            Self::new(0.0, 0.0, 1.0, 1.0)
        } else {
            *self
        }
    }

    /// Encode as the `x,y,w,h` wire field.
    pub fn encode(&self) -> String {
        format!("{},{},{},{}", self.x, self.y, self.w, self.h)
    }

    /// Parse the `x,y,w,h` wire field.
    pub fn parse(text: &str) -> Result<Self> {
        let malformed = || ProtoError::MalformedCropRect(text.to_string());
        let fields: Vec<&str> = text.split(',').collect();
        if fields.len() != 4 {
            return Err(malformed());
        }
        let mut values = [0.0f64; 4];
        for (slot, field) in values.iter_mut().zip(&fields) {
            *slot = field.trim().parse().map_err(|_| malformed())?;
        }
        Ok(Self::new(values[0], values[1], values[2], values[3]))
    }
}
