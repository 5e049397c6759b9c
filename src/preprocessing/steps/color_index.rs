//! Conversion of RGB(A) rasters into a single paletted band.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::palette::Palette;
use crate::preprocessing::raster::types::{Band, PixelType, RasterHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorIndex {
    /// Palette file; the built-in color cube is used when absent
    pub palette_file: Option<PathBuf>,
}

impl ColorIndex {
    pub fn new(palette_file: Option<PathBuf>) -> Self {
        Self { palette_file }
    }

    fn load_palette(&self) -> Result<Palette> {
        match &self.palette_file {
            Some(path) => Palette::from_file(path),
            None => Ok(Palette::color_cube()),
        }
    }

    pub fn apply(&self, raster: RasterHandle) -> Result<RasterHandle> {
        if !matches!(raster.band_count(), 3 | 4) {
            return Err(PreProcessError::InvalidBandConfigError(format!(
                "color indexing needs 3 or 4 bands, raster has {}",
                raster.band_count()
            )));
        }
        let palette = self.load_palette()?;

        let (r, g, b) = (&raster.bands[0], &raster.bands[1], &raster.bands[2]);
        let mut cache: HashMap<[u8; 3], u8> = HashMap::new();
        let data = (0..raster.width * raster.height)
            .map(|i| {
                let rgb = [
                    PixelType::Byte.clamp(r.data[i]) as u8,
                    PixelType::Byte.clamp(g.data[i]) as u8,
                    PixelType::Byte.clamp(b.data[i]) as u8,
                ];
                *cache.entry(rgb).or_insert_with(|| palette.nearest(rgb)) as f64
            })
            .collect();

        debug!(
            "Indexed {} distinct colors against {} palette entries",
            cache.len(),
            palette.len()
        );

        Ok(
            RasterHandle::new(raster.width, raster.height, vec![Band::new(data, PixelType::Byte)])?
                .with_geo_transform(raster.geo_transform)
                .with_spatial_ref(raster.spatial_ref)
                .with_palette(Some(palette)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(pixels: &[[f64; 3]]) -> RasterHandle {
        let bands = (0..3)
            .map(|c| Band::new(pixels.iter().map(|p| p[c]).collect(), PixelType::Byte))
            .collect();
        RasterHandle::new(pixels.len(), 1, bands).unwrap()
    }

    #[test]
    fn test_indexes_against_palette_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palette.txt");
        std::fs::write(&path, "0 0 0\n250 250 250\n0 128 0\n").unwrap();

        let step = ColorIndex::new(Some(path));
        let out = step
            .apply(rgb(&[[3.0, 3.0, 3.0], [240.0, 255.0, 251.0], [10.0, 120.0, 20.0]]))
            .unwrap();

        assert_eq!(out.band_count(), 1);
        assert_eq!(out.bands[0].data, vec![0.0, 1.0, 2.0]);
        assert_eq!(out.palette.unwrap().len(), 3);
    }

    #[test]
    fn test_default_cube() {
        let out = ColorIndex::new(None).apply(rgb(&[[255.0, 0.0, 0.0]])).unwrap();
        let palette = out.palette.as_ref().unwrap();
        assert_eq!(palette.entries()[out.bands[0].data[0] as usize], [255, 0, 0, 255]);
    }

    #[test]
    fn test_requires_color_bands() {
        let single = RasterHandle::new(1, 1, vec![Band::new(vec![1.0], PixelType::Byte)]).unwrap();
        assert!(matches!(
            ColorIndex::new(None).apply(single),
            Err(PreProcessError::InvalidBandConfigError(_))
        ));
    }

    #[test]
    fn test_missing_palette_file() {
        let step = ColorIndex::new(Some(PathBuf::from("/nonexistent/palette.txt")));
        assert!(matches!(
            step.apply(rgb(&[[0.0, 0.0, 0.0]])),
            Err(PreProcessError::PaletteError(_))
        ));
    }
}
