//! Output format selection and encoder options

use tracing::warn;

use crate::preprocessing::common::error::{PreProcessError, Result};

/// Driver identifier of the GeoTIFF encoder.
pub const GTIFF_DRIVER: &str = "GTiff";

/// Target encoding of a pipeline run: driver, file extension and the
/// driver's `KEY=VALUE` creation options, in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSelection {
    driver: String,
    extension: String,
    creation_options: Vec<String>,
}

impl FormatSelection {
    pub fn new(
        driver: impl Into<String>,
        extension: impl Into<String>,
        creation_options: Vec<String>,
    ) -> Self {
        let extension = extension.into();
        let extension = if extension.is_empty() || extension.starts_with('.') {
            extension
        } else {
            format!(".{extension}")
        };
        Self {
            driver: driver.into(),
            extension,
            creation_options,
        }
    }

    /// Plain GeoTIFF with a `.tif` extension and no creation options.
    pub fn geotiff() -> Self {
        Self::new(GTIFF_DRIVER, ".tif", Vec::new())
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    /// Extension including the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn creation_options(&self) -> &[String] {
        &self.creation_options
    }
}

impl Default for FormatSelection {
    fn default() -> Self {
        Self::geotiff()
    }
}

/// TIFF compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffCompression {
    /// No compression (fastest, largest file)
    None,
    /// LZW compression
    Lzw,
    /// PackBits run-length compression
    PackBits,
    /// Deflate compression - fast level
    DeflateFast,
    /// Deflate compression - balanced (default deflate level)
    DeflateBalanced,
    /// Deflate compression - best compression (slower)
    DeflateBest,
}

/// Creation options understood by the GeoTIFF encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingOptions {
    pub compression: TiffCompression,
    /// Predictor value (2 = horizontal differencing), integer samples only
    pub predictor: Option<u16>,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            compression: TiffCompression::None,
            predictor: None,
        }
    }
}

impl EncodingOptions {
    /// Parses `KEY=VALUE` creation options. Keys are case-insensitive;
    /// unknown keys are logged and skipped.
    pub fn from_creation_options(options: &[String]) -> Result<Self> {
        let mut compress: Option<String> = None;
        let mut zlevel: Option<u8> = None;
        let mut predictor = None;

        for option in options {
            let (key, value) = option.split_once('=').ok_or_else(|| {
                PreProcessError::EncodingError(format!(
                    "creation option '{option}' is not of the form KEY=VALUE"
                ))
            })?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "COMPRESS" => compress = Some(value.to_ascii_uppercase()),
                "ZLEVEL" => {
                    let level = value
                        .parse::<u8>()
                        .ok()
                        .filter(|l| (1..=9).contains(l))
                        .ok_or_else(|| {
                            PreProcessError::EncodingError(format!("invalid ZLEVEL '{value}'"))
                        })?;
                    zlevel = Some(level);
                }
                "PREDICTOR" => {
                    predictor = match value {
                        "1" => None,
                        "2" => Some(2),
                        other => {
                            return Err(PreProcessError::EncodingError(format!(
                                "unsupported PREDICTOR '{other}'"
                            )));
                        }
                    }
                }
                _ => warn!("Ignoring unsupported creation option '{}'", option),
            }
        }

        let compression = match compress.as_deref() {
            None | Some("NONE") => TiffCompression::None,
            Some("LZW") => TiffCompression::Lzw,
            Some("PACKBITS") => TiffCompression::PackBits,
            Some("DEFLATE") => match zlevel {
                Some(1..=3) => TiffCompression::DeflateFast,
                Some(7..=9) => TiffCompression::DeflateBest,
                _ => TiffCompression::DeflateBalanced,
            },
            Some(other) => {
                return Err(PreProcessError::EncodingError(format!(
                    "unsupported COMPRESS '{other}'"
                )));
            }
        };

        Ok(Self {
            compression,
            predictor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(options: &[&str]) -> Vec<String> {
        options.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extension_is_normalized() {
        assert_eq!(FormatSelection::new("GTiff", "tif", vec![]).extension(), ".tif");
        assert_eq!(FormatSelection::new("GTiff", ".tiff", vec![]).extension(), ".tiff");
        assert_eq!(FormatSelection::default().driver(), GTIFF_DRIVER);
    }

    #[test]
    fn test_parse_creation_options() {
        let options =
            EncodingOptions::from_creation_options(&opts(&["compress=deflate", "ZLEVEL=9", "PREDICTOR=2"]))
                .unwrap();
        assert_eq!(options.compression, TiffCompression::DeflateBest);
        assert_eq!(options.predictor, Some(2));

        let options = EncodingOptions::from_creation_options(&opts(&["COMPRESS=LZW", "TILED=YES"])).unwrap();
        assert_eq!(options.compression, TiffCompression::Lzw);
        assert_eq!(options.predictor, None);

        assert_eq!(
            EncodingOptions::from_creation_options(&[]).unwrap(),
            EncodingOptions::default()
        );
    }

    #[test]
    fn test_reject_bad_creation_options() {
        for bad in ["COMPRESS", "COMPRESS=JPEG2000", "ZLEVEL=12", "PREDICTOR=3"] {
            assert!(
                matches!(
                    EncodingOptions::from_creation_options(&opts(&[bad])),
                    Err(PreProcessError::EncodingError(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
