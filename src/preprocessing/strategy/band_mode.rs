use std::fmt;
use std::str::FromStr;

use crate::preprocessing::common::error::{PreProcessError, Result};

/// How source bands are composed into the output raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BandMode {
    /// Three byte bands
    #[default]
    Rgb,
    /// Four byte bands
    Rgba,
    /// Source bands pass through unchanged
    Original,
}

impl BandMode {
    /// Number of output bands a band selection must produce.
    pub fn band_count(&self) -> Option<usize> {
        match self {
            BandMode::Rgb => Some(3),
            BandMode::Rgba => Some(4),
            BandMode::Original => None,
        }
    }
}

/// Numeric codes as exchanged with callers: RGB=0, RGBA=1, ORIGINAL=2.
impl TryFrom<i32> for BandMode {
    type Error = PreProcessError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(BandMode::Rgb),
            1 => Ok(BandMode::Rgba),
            2 => Ok(BandMode::Original),
            other => Err(PreProcessError::InvalidConfigError(format!(
                "illegal band mode {other}"
            ))),
        }
    }
}

impl From<BandMode> for i32 {
    fn from(mode: BandMode) -> Self {
        match mode {
            BandMode::Rgb => 0,
            BandMode::Rgba => 1,
            BandMode::Original => 2,
        }
    }
}

impl FromStr for BandMode {
    type Err = PreProcessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rgb" => Ok(BandMode::Rgb),
            "rgba" => Ok(BandMode::Rgba),
            "original" | "orig" => Ok(BandMode::Original),
            other => match other.parse::<i32>() {
                Ok(code) => BandMode::try_from(code),
                Err(_) => Err(PreProcessError::InvalidConfigError(format!(
                    "illegal band mode '{s}'"
                ))),
            },
        }
    }
}

impl fmt::Display for BandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandMode::Rgb => f.write_str("rgb"),
            BandMode::Rgba => f.write_str("rgba"),
            BandMode::Original => f.write_str("original"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_codes() {
        assert_eq!(BandMode::try_from(0).unwrap(), BandMode::Rgb);
        assert_eq!(BandMode::try_from(2).unwrap(), BandMode::Original);
        assert_eq!(i32::from(BandMode::Rgba), 1);
        assert!(matches!(
            BandMode::try_from(3),
            Err(PreProcessError::InvalidConfigError(_))
        ));
        assert!(BandMode::try_from(-1).is_err());
    }

    #[test]
    fn test_parse() {
        assert_eq!("RGBA".parse::<BandMode>().unwrap(), BandMode::Rgba);
        assert_eq!("original".parse::<BandMode>().unwrap(), BandMode::Original);
        assert_eq!("1".parse::<BandMode>().unwrap(), BandMode::Rgba);
        assert!(matches!(
            "cmyk".parse::<BandMode>(),
            Err(PreProcessError::InvalidConfigError(_))
        ));
    }
}
