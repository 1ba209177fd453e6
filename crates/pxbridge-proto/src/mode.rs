use crate::error::{ProtoError, Result};

/// Selector for which host layers feed a query.
///
/// Carried on the wire as an integer `mode=` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    None,
    Active,
    All,
    ActiveAndBelow,
    ActiveAndAbove,
    AllVisible,
    AllInvisible,
}

impl InputMode {
    /// Wire representation.
    pub fn as_int(self) -> i32 {
        match self {
            InputMode::None => 0,
            InputMode::Active => 1,
            InputMode::All => 2,
            InputMode::ActiveAndBelow => 3,
            InputMode::ActiveAndAbove => 4,
            InputMode::AllVisible => 5,
            InputMode::AllInvisible => 6,
        }
    }

    pub fn from_int(value: i32) -> Result<Self> {
        match value {
            0 => Ok(InputMode::None),
            1 => Ok(InputMode::Active),
            2 => Ok(InputMode::All),
            3 => Ok(InputMode::ActiveAndBelow),
            4 => Ok(InputMode::ActiveAndAbove),
            5 => Ok(InputMode::AllVisible),
            6 => Ok(InputMode::AllInvisible),
            other => Err(ProtoError::UnknownMode(other)),
        }
    }
}

/// Selector for how the host integrates returned images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    InPlace,
    NewLayers,
    NewActiveLayers,
    NewImage,
}

impl OutputMode {
    /// Wire representation.
    pub fn as_int(self) -> i32 {
        match self {
            OutputMode::InPlace => 0,
            OutputMode::NewLayers => 1,
            OutputMode::NewActiveLayers => 2,
            OutputMode::NewImage => 3,
        }
    }

    pub fn from_int(value: i32) -> Result<Self> {
        match value {
            0 => Ok(OutputMode::InPlace),
            1 => Ok(OutputMode::NewLayers),
            2 => Ok(OutputMode::NewActiveLayers),
            3 => Ok(OutputMode::NewImage),
            other => Err(ProtoError::UnknownMode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_mode_integer_roundtrip() {
        for value in 0..=6 {
            let mode = InputMode::from_int(value).unwrap();
            assert_eq!(mode.as_int(), value);
        }
        assert!(matches!(
            InputMode::from_int(7),
            Err(ProtoError::UnknownMode(7))
        ));
    }

    #[test]
    fn output_mode_integer_roundtrip() {
        for value in 0..=3 {
            let mode = OutputMode::from_int(value).unwrap();
            assert_eq!(mode.as_int(), value);
        }
        assert!(matches!(
            OutputMode::from_int(-1),
            Err(ProtoError::UnknownMode(-1))
        ));
    }
}
