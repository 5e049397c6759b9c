//! Pyramid (overview) generation.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::types::{Band, GeoTransform, RasterHandle};

/// Overviews stop once the longest side would fall below this many pixels.
pub const MIN_OVERVIEW_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverviewResampling {
    #[default]
    Nearest,
    /// Mean of the valid samples in each block
    Average,
}

impl FromStr for OverviewResampling {
    type Err = PreProcessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "average" => Ok(Self::Average),
            other => Err(PreProcessError::InvalidConfigError(format!(
                "unknown overview resampling '{other}'"
            ))),
        }
    }
}

impl fmt::Display for OverviewResampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("nearest"),
            Self::Average => f.write_str("average"),
        }
    }
}

/// Attaches reduced-resolution levels to a raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewGeneration {
    /// Decimation factors; computed from the raster size when `None`
    pub levels: Option<Vec<usize>>,
    pub resampling: OverviewResampling,
}

impl OverviewGeneration {
    pub fn new(levels: Option<Vec<usize>>, resampling: OverviewResampling) -> Self {
        Self { levels, resampling }
    }

    /// Powers of two until the longest side would drop below
    /// [`MIN_OVERVIEW_SIZE`].
    pub fn auto_levels(width: usize, height: usize) -> Vec<usize> {
        let longest = width.max(height);
        let mut levels = Vec::new();
        let mut factor = 2;
        while longest / factor >= MIN_OVERVIEW_SIZE {
            levels.push(factor);
            factor *= 2;
        }
        levels
    }

    pub fn apply(&self, mut raster: RasterHandle) -> Result<RasterHandle> {
        let mut levels = match &self.levels {
            Some(levels) => levels.clone(),
            None => Self::auto_levels(raster.width, raster.height),
        };
        if levels.iter().any(|f| *f < 2) {
            return Err(PreProcessError::InvalidConfigError(
                "overview factors must be at least 2".to_string(),
            ));
        }
        levels.sort_unstable();
        levels.dedup();

        raster.overviews = levels
            .iter()
            .map(|&factor| self.decimate(&raster, factor))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Built {} overview level(s) {:?} using {} resampling",
            raster.overviews.len(),
            levels,
            self.resampling
        );
        Ok(raster)
    }

    fn decimate(&self, raster: &RasterHandle, factor: usize) -> Result<RasterHandle> {
        let width = raster.width.div_ceil(factor);
        let height = raster.height.div_ceil(factor);

        let bands = raster
            .bands
            .iter()
            .map(|band| {
                let mut data = Vec::with_capacity(width * height);
                for row in 0..height {
                    for col in 0..width {
                        data.push(self.sample_block(band, raster, col * factor, row * factor, factor));
                    }
                }
                Band::new(data, band.pixel_type).with_nodata(band.nodata)
            })
            .collect();

        let gt = &raster.geo_transform.0;
        let f = factor as f64;
        Ok(RasterHandle::new(width, height, bands)?
            .with_geo_transform(GeoTransform([
                gt[0],
                gt[1] * f,
                gt[2] * f,
                gt[3],
                gt[4] * f,
                gt[5] * f,
            ]))
            .with_spatial_ref(raster.spatial_ref)
            .with_palette(raster.palette.clone()))
    }

    fn sample_block(&self, band: &Band, raster: &RasterHandle, x0: usize, y0: usize, factor: usize) -> f64 {
        let first = band.data[y0 * raster.width + x0];
        match self.resampling {
            OverviewResampling::Nearest => first,
            OverviewResampling::Average => {
                let (mut sum, mut count) = (0.0, 0usize);
                for y in y0..(y0 + factor).min(raster.height) {
                    for x in x0..(x0 + factor).min(raster.width) {
                        let v = band.data[y * raster.width + x];
                        if !band.is_nodata(v) && !v.is_nan() {
                            sum += v;
                            count += 1;
                        }
                    }
                }
                if count == 0 {
                    band.nodata.unwrap_or(first)
                } else {
                    band.pixel_type.clamp(sum / count as f64)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::PixelType;

    fn gradient(width: usize, height: usize) -> RasterHandle {
        let data = (0..width * height).map(|i| (i % width) as f64).collect();
        RasterHandle::new(width, height, vec![Band::new(data, PixelType::UInt16)]).unwrap()
    }

    #[test]
    fn test_auto_levels() {
        assert_eq!(OverviewGeneration::auto_levels(100, 100), Vec::<usize>::new());
        assert_eq!(OverviewGeneration::auto_levels(512, 300), vec![2]);
        assert_eq!(OverviewGeneration::auto_levels(2048, 1024), vec![2, 4, 8]);
    }

    #[test]
    fn test_nearest_levels() {
        let step = OverviewGeneration::new(Some(vec![4, 2]), OverviewResampling::Nearest);
        let out = step.apply(gradient(5, 3)).unwrap();

        assert_eq!(out.overviews.len(), 2);
        let half = &out.overviews[0];
        assert_eq!((half.width, half.height), (3, 2));
        assert_eq!(half.bands[0].data, vec![0.0, 2.0, 4.0, 0.0, 2.0, 4.0]);
        assert_eq!(half.geo_transform.0[1], 2.0);
        assert_eq!((out.overviews[1].width, out.overviews[1].height), (2, 1));
    }

    #[test]
    fn test_average_skips_nodata() {
        let band = Band::new(vec![0.0, 4.0, 8.0, 0.0], PixelType::Byte).with_nodata(Some(0.0));
        let raster = RasterHandle::new(2, 2, vec![band]).unwrap();
        let out = OverviewGeneration::new(Some(vec![2]), OverviewResampling::Average)
            .apply(raster)
            .unwrap();
        assert_eq!(out.overviews[0].bands[0].data, vec![6.0]);
    }

    #[test]
    fn test_rejects_factor_one() {
        let step = OverviewGeneration::new(Some(vec![1]), OverviewResampling::Nearest);
        assert!(matches!(
            step.apply(gradient(4, 4)),
            Err(PreProcessError::InvalidConfigError(_))
        ));
    }
}
