use tracing::debug;

use crate::preprocessing::common::error::Result;
use crate::preprocessing::raster::types::RasterHandle;

/// Declares a fixed nodata value on every band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoDataAssignment {
    pub value: f64,
}

impl NoDataAssignment {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn apply(&self, mut raster: RasterHandle) -> Result<RasterHandle> {
        for band in &mut raster.bands {
            band.nodata = Some(self.value);
        }
        debug!("Nodata value {} set on {} band(s)", self.value, raster.band_count());
        Ok(raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::{Band, PixelType};

    #[test]
    fn test_sets_every_band() {
        let raster = RasterHandle::new(
            1,
            1,
            vec![
                Band::new(vec![1.0], PixelType::Byte).with_nodata(Some(9.0)),
                Band::new(vec![1.0], PixelType::Byte),
            ],
        )
        .unwrap();

        let out = NoDataAssignment::new(255.0).apply(raster).unwrap();
        assert!(out.bands.iter().all(|b| b.nodata == Some(255.0)));
        assert_eq!(out.bands[0].data, vec![1.0]);
    }
}
