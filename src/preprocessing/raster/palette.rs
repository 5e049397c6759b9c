//! Color tables for paletted rasters.

use std::path::Path;

use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};

/// Maximum number of entries addressable by a byte band.
pub const MAX_PALETTE_ENTRIES: usize = 256;

/// Ordered list of RGBA colors; the entry index is the pixel value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<[u8; 4]>,
}

impl Palette {
    pub fn new(entries: Vec<[u8; 4]>) -> Result<Self> {
        if entries.is_empty() || entries.len() > MAX_PALETTE_ENTRIES {
            return Err(PreProcessError::PaletteError(format!(
                "palette must hold 1..={} entries, got {}",
                MAX_PALETTE_ENTRIES,
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    /// 6x6x6 color cube used when no palette file is configured.
    pub fn color_cube() -> Self {
        const LEVELS: [u8; 6] = [0, 51, 102, 153, 204, 255];
        let mut entries = Vec::with_capacity(216);
        for r in LEVELS {
            for g in LEVELS {
                for b in LEVELS {
                    entries.push([r, g, b, 255]);
                }
            }
        }
        Self { entries }
    }

    /// Loads a palette file with one `R G B [A]` entry per line.
    ///
    /// Components may be separated by whitespace or commas; blank lines and
    /// lines starting with `#` are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            PreProcessError::PaletteError(format!("{}: {}", path.display(), e))
        })?;
        let palette = Self::parse(&text)?;
        debug!("Loaded {} palette entries from {}", palette.len(), path.display());
        Ok(palette)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let components = line
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<u8>())
                .collect::<std::result::Result<Vec<u8>, _>>()
                .map_err(|e| {
                    PreProcessError::PaletteError(format!("line {}: {}", lineno + 1, e))
                })?;

            let entry = match components.as_slice() {
                [r, g, b] => [*r, *g, *b, 255],
                [r, g, b, a] => [*r, *g, *b, *a],
                other => {
                    return Err(PreProcessError::PaletteError(format!(
                        "line {}: expected 3 or 4 components, got {}",
                        lineno + 1,
                        other.len()
                    )));
                }
            };
            entries.push(entry);
        }
        Self::new(entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[[u8; 4]] {
        &self.entries
    }

    /// Index of the entry closest to `rgb` by squared euclidean distance.
    /// Ties resolve to the lowest index.
    pub fn nearest(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (idx, entry) in self.entries.iter().enumerate() {
            let dist: u32 = (0..3)
                .map(|c| {
                    let d = entry[c] as i32 - rgb[c] as i32;
                    (d * d) as u32
                })
                .sum();
            if dist < best_dist {
                best = idx;
                best_dist = dist;
                if dist == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_palette_text() {
        let palette = Palette::parse("# water\n0 0 255\n\n255,255,255,128\n").unwrap();
        assert_eq!(palette.entries(), &[[0, 0, 255, 255], [255, 255, 255, 128]]);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(
            Palette::parse("1 2\n"),
            Err(PreProcessError::PaletteError(_))
        ));
        assert!(Palette::parse("1 2 300\n").is_err());
        assert!(Palette::parse("# only comments\n").is_err());
    }

    #[test]
    fn test_nearest_color() {
        let palette = Palette::parse("0 0 0\n255 0 0\n0 255 0\n").unwrap();
        assert_eq!(palette.nearest([10, 5, 5]), 0);
        assert_eq!(palette.nearest([200, 30, 10]), 1);
        assert_eq!(palette.nearest([20, 240, 40]), 2);
    }

    #[test]
    fn test_color_cube() {
        let cube = Palette::color_cube();
        assert_eq!(cube.len(), 216);
        assert_eq!(cube.entries()[cube.nearest([250, 250, 250]) as usize], [255, 255, 255, 255]);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.txt");
        std::fs::write(&path, "10 20 30\n").unwrap();
        assert_eq!(Palette::from_file(&path).unwrap().len(), 1);
        assert!(Palette::from_file(dir.path().join("missing.txt")).is_err());
    }
}
