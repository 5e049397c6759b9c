use crate::preprocessing::raster::types::RasterHandle;

/// Byte grid of valid (1) and background (0) cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidityMask {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<u8>,
}

impl ValidityMask {
    /// A cell is valid when any band differs from its background, which is
    /// the declared nodata value or 0.
    pub fn fuse(raster: &RasterHandle) -> Self {
        let mut cells = vec![0u8; raster.width * raster.height];
        for band in &raster.bands {
            let background = band.nodata.unwrap_or(0.0);
            for (cell, &value) in cells.iter_mut().zip(&band.data) {
                let is_background =
                    value == background || (value.is_nan() && background.is_nan());
                if !is_background {
                    *cell = 1;
                }
            }
        }
        Self {
            width: raster.width,
            height: raster.height,
            cells,
        }
    }

    /// Out-of-range coordinates are background.
    pub fn is_valid(&self, col: isize, row: isize) -> bool {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return false;
        }
        self.cells[row as usize * self.width + col as usize] != 0
    }

    pub fn valid_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::{Band, PixelType};
    use proptest::prelude::*;

    #[test]
    fn test_nodata_is_background() {
        let raster = RasterHandle::new(
            3,
            1,
            vec![
                Band::new(vec![9.0, 0.0, 1.0], PixelType::Int16).with_nodata(Some(9.0)),
                Band::new(vec![f64::NAN, f64::NAN, 0.0], PixelType::Float32)
                    .with_nodata(Some(f64::NAN)),
            ],
        )
        .unwrap();

        let mask = ValidityMask::fuse(&raster);
        assert_eq!(mask.cells, vec![0, 1, 1]);
        assert!(!mask.is_valid(-1, 0));
        assert!(!mask.is_valid(3, 0));
        assert_eq!(mask.valid_count(), 2);
    }

    proptest! {
        #[test]
        fn test_any_nonzero_band_marks_cell(
            bands in proptest::collection::vec(
                proptest::collection::vec(0u8..3, 16),
                1..5,
            )
        ) {
            let raster = RasterHandle::new(
                4,
                4,
                bands
                    .iter()
                    .map(|b| Band::new(b.iter().map(|v| *v as f64).collect(), PixelType::Byte))
                    .collect(),
            )
            .unwrap();

            let mask = ValidityMask::fuse(&raster);
            for i in 0..16 {
                let expected = bands.iter().any(|b| b[i] != 0);
                prop_assert_eq!(mask.cells[i] == 1, expected);
            }
        }
    }
}
