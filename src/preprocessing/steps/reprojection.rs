//! Warping of a raster into another spatial reference.

use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::projection::{CoordinateTransform, SpatialReference};
use crate::preprocessing::raster::types::{Band, GeoTransform, RasterHandle};

/// Sample points per raster edge when estimating the target extent.
const EDGE_SAMPLES: usize = 20;

/// Nearest-neighbour warp into `target`.
///
/// The output extent is the envelope of the densified source boundary in the
/// target reference; the pixel size keeps the diagonal pixel count of the
/// source grid. Cells that map outside the source are filled with the band's
/// nodata value, or 0 when none is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reprojection {
    pub target: SpatialReference,
}

impl Reprojection {
    pub fn new(target: SpatialReference) -> Self {
        Self { target }
    }

    pub fn apply(&self, raster: RasterHandle) -> Result<RasterHandle> {
        let source = raster.spatial_ref.ok_or_else(|| {
            PreProcessError::ProjectionError("raster has no spatial reference".to_string())
        })?;
        if source == self.target {
            debug!("Raster already in {}, skipping warp", self.target);
            return Ok(raster);
        }

        let to_source_pixel = raster.geo_transform.invert().ok_or_else(|| {
            PreProcessError::ProjectionError("degenerate geotransform".to_string())
        })?;
        let forward = CoordinateTransform::new(&source, &self.target)?;
        let inverse = CoordinateTransform::new(&self.target, &source)?;

        let (min_x, min_y, max_x, max_y) = target_envelope(&raster, &forward)?;
        let source_diagonal = ((raster.width.pow(2) + raster.height.pow(2)) as f64).sqrt();
        let target_diagonal = ((max_x - min_x).powi(2) + (max_y - min_y).powi(2)).sqrt();
        let resolution = target_diagonal / source_diagonal;
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(PreProcessError::ProjectionError(
                "raster collapses to a point in the target reference".to_string(),
            ));
        }

        let width = (((max_x - min_x) / resolution).ceil() as usize).max(1);
        let height = (((max_y - min_y) / resolution).ceil() as usize).max(1);
        let geo_transform = GeoTransform([min_x, resolution, 0.0, max_y, 0.0, -resolution]);

        let mut bands: Vec<Band> = raster
            .bands
            .iter()
            .map(|b| {
                Band::new(vec![b.nodata.unwrap_or(0.0); width * height], b.pixel_type)
                    .with_nodata(b.nodata)
            })
            .collect();

        for row in 0..height {
            for col in 0..width {
                let (x, y) = geo_transform.apply(col as f64 + 0.5, row as f64 + 0.5);
                let Ok((sx, sy)) = inverse.transform(x, y) else {
                    continue;
                };
                let (src_col, src_row) = to_source_pixel.apply(sx, sy);
                if src_col < 0.0 || src_row < 0.0 {
                    continue;
                }
                let (src_col, src_row) = (src_col as usize, src_row as usize);
                if src_col >= raster.width || src_row >= raster.height {
                    continue;
                }
                let src_idx = src_row * raster.width + src_col;
                let dst_idx = row * width + col;
                for (dst, src) in bands.iter_mut().zip(&raster.bands) {
                    dst.data[dst_idx] = src.data[src_idx];
                }
            }
        }

        debug!(
            "Warped {}x{} {} -> {}x{} {}",
            raster.width, raster.height, source, width, height, self.target
        );

        Ok(RasterHandle::new(width, height, bands)?
            .with_geo_transform(geo_transform)
            .with_spatial_ref(Some(self.target))
            .with_palette(raster.palette))
    }
}

fn target_envelope(
    raster: &RasterHandle,
    forward: &CoordinateTransform,
) -> Result<(f64, f64, f64, f64)> {
    let (w, h) = (raster.width as f64, raster.height as f64);
    let mut boundary = Vec::with_capacity(4 * (EDGE_SAMPLES + 1));
    for i in 0..=EDGE_SAMPLES {
        let t = i as f64 / EDGE_SAMPLES as f64;
        boundary.push((t * w, 0.0));
        boundary.push((t * w, h));
        boundary.push((0.0, t * h));
        boundary.push((w, t * h));
    }

    let mut envelope: Option<(f64, f64, f64, f64)> = None;
    for (col, row) in boundary {
        let (x, y) = raster.geo_transform.apply(col, row);
        let Ok((tx, ty)) = forward.transform(x, y) else {
            continue;
        };
        envelope = Some(match envelope {
            None => (tx, ty, tx, ty),
            Some((a, b, c, d)) => (a.min(tx), b.min(ty), c.max(tx), d.max(ty)),
        });
    }

    envelope.ok_or_else(|| {
        PreProcessError::ProjectionError("raster extent cannot be transformed".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::PixelType;

    fn geographic_raster() -> RasterHandle {
        RasterHandle::new(10, 10, vec![Band::new(vec![7.0; 100], PixelType::Byte)])
            .unwrap()
            .with_geo_transform(GeoTransform([10.0, 0.1, 0.0, 50.0, 0.0, -0.1]))
            .with_spatial_ref(Some(SpatialReference::wgs84()))
    }

    #[test]
    fn test_warp_to_web_mercator() {
        let mercator = SpatialReference::from_epsg(3857).unwrap();
        let out = Reprojection::new(mercator).apply(geographic_raster()).unwrap();

        assert_eq!(out.spatial_ref, Some(mercator));
        // lon 10 in web mercator
        assert!((out.geo_transform.0[0] - 1_113_194.9).abs() < 1.0);
        assert!(out.geo_transform.0[5] < 0.0);

        let center = (out.height / 2) * out.width + out.width / 2;
        assert_eq!(out.bands[0].data[center], 7.0);
    }

    #[test]
    fn test_same_reference_is_untouched() {
        let out = Reprojection::new(SpatialReference::wgs84())
            .apply(geographic_raster())
            .unwrap();
        assert_eq!((out.width, out.height), (10, 10));
        assert_eq!(out.geo_transform.0[0], 10.0);
    }

    #[test]
    fn test_requires_spatial_reference() {
        let raster = geographic_raster().with_spatial_ref(None);
        let result = Reprojection::new(SpatialReference::wgs84()).apply(raster);
        assert!(matches!(result, Err(PreProcessError::ProjectionError(_))));
    }
}
