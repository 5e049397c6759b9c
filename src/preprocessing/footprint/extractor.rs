use geo::SimplifyVwPreserve;
use tracing::{debug, warn};

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::projection::{CoordinateTransform, SpatialReference};
use crate::preprocessing::raster::types::RasterHandle;

use super::mask::ValidityMask;
use super::trace::trace_regions;
use super::types::Footprint;

/// Derives the geographic outline of a raster's valid data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootprintExtractor {
    /// Visvalingam-Whyatt threshold: vertices spanning a triangle smaller
    /// than this area, in square pixels, are dropped
    pub tolerance: f64,
}

impl Default for FootprintExtractor {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

impl FootprintExtractor {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn extract(&self, raster: &RasterHandle) -> Result<Footprint> {
        let mask = ValidityMask::fuse(raster);
        let mut polygons = trace_regions(&mask);
        if polygons.len() != 1 {
            return Err(PreProcessError::FootprintExtractionError(format!(
                "ambiguous or disjoint valid-data region, traced {} polygons",
                polygons.len()
            )));
        }
        let traced = polygons.remove(0);
        let simplified = traced.simplify_vw_preserve(&self.tolerance);

        let exterior = simplified.exterior();
        if exterior.0.len() < 4 {
            return Err(PreProcessError::FootprintExtractionError(
                "traced region collapsed during simplification".to_string(),
            ));
        }
        debug!(
            "Traced {} vertices, {} after simplification, {} hole(s) dropped",
            traced.exterior().0.len(),
            exterior.0.len(),
            simplified.interiors().len()
        );

        let gt = &raster.geo_transform.0;
        let to_geographic = match raster.spatial_ref {
            Some(srs) if !srs.is_geographic() => {
                Some(CoordinateTransform::new(&srs, &SpatialReference::wgs84())?)
            }
            Some(_) => None,
            None => {
                warn!("Raster has no spatial reference, footprint left in raster coordinates");
                None
            }
        };

        let ring = exterior
            .coords()
            .map(|c| {
                let (col, row) = (c.x.abs(), c.y.abs());
                let x = gt[0] + col * gt[1] + row * gt[2];
                let y = gt[3] + col * gt[4] + row * gt[5];
                let (lon, lat) = match &to_geographic {
                    Some(transform) => transform.transform(x, y)?,
                    None => (x, y),
                };
                Ok((lat, lon))
            })
            .collect::<Result<Vec<_>>>()?;

        Footprint::new(ring)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::{Band, GeoTransform, PixelType};
    use proptest::prelude::*;

    fn raster(width: usize, height: usize, valid: impl Fn(usize, usize) -> bool) -> RasterHandle {
        let data = (0..width * height)
            .map(|i| if valid(i % width, i / width) { 5.0 } else { 0.0 })
            .collect();
        RasterHandle::new(
            width,
            height,
            vec![Band::new(data, PixelType::Byte).with_nodata(Some(0.0))],
        )
        .unwrap()
        .with_geo_transform(GeoTransform([10.0, 0.01, 0.0, 50.0, 0.0, -0.01]))
        .with_spatial_ref(Some(SpatialReference::wgs84()))
    }

    fn contains(footprint: &Footprint, lat: f64, lon: f64) -> bool {
        footprint
            .exterior()
            .iter()
            .any(|p| (p.0 - lat).abs() < 1e-9 && (p.1 - lon).abs() < 1e-9)
    }

    #[test]
    fn test_corner_block_excluded() {
        let raster = raster(100, 100, |x, y| x >= 10 || y >= 10);
        let footprint = FootprintExtractor::default().extract(&raster).unwrap();

        assert_eq!(footprint.exterior().len(), 7);
        assert!(contains(&footprint, 49.9, 10.1));
        assert!(contains(&footprint, 49.0, 11.0));
        assert!(!contains(&footprint, 50.0, 10.0));
        assert_eq!(footprint.exterior().first(), footprint.exterior().last());
    }

    #[test]
    fn test_tolerance_is_an_area() {
        // one pixel notch in the top edge, its triangles span 0.5 square pixels
        let notched = raster(10, 10, |x, y| !(x == 5 && y == 0));

        let exact = FootprintExtractor::new(0.0).extract(&notched).unwrap();
        let coarse = FootprintExtractor::new(1.0).extract(&notched).unwrap();

        assert_eq!(exact.exterior().len(), 9);
        assert!(coarse.exterior().len() < exact.exterior().len());
    }

    #[test]
    fn test_holes_are_not_propagated() {
        let raster = raster(9, 9, |x, y| !(3..6).contains(&x) || !(3..6).contains(&y));
        let footprint = FootprintExtractor::default().extract(&raster).unwrap();
        assert!(footprint.interiors().is_empty());
        assert_eq!(footprint.exterior().len(), 5);
    }

    #[test]
    fn test_disjoint_regions() {
        let raster = raster(10, 10, |x, _| x < 3 || x > 6);
        assert!(matches!(
            FootprintExtractor::default().extract(&raster),
            Err(PreProcessError::FootprintExtractionError(_))
        ));
    }

    #[test]
    fn test_diagonal_touch_is_disjoint() {
        let raster = raster(4, 4, |x, y| (x < 2 && y < 2) || (x >= 2 && y >= 2));
        assert!(FootprintExtractor::default().extract(&raster).is_err());
    }

    #[test]
    fn test_all_background() {
        let raster = raster(4, 4, |_, _| false);
        assert!(matches!(
            FootprintExtractor::default().extract(&raster),
            Err(PreProcessError::FootprintExtractionError(_))
        ));
    }

    #[test]
    fn test_projected_raster_is_reprojected() {
        let raster = RasterHandle::new(4, 4, vec![Band::new(vec![1.0; 16], PixelType::Byte)])
            .unwrap()
            .with_geo_transform(GeoTransform([500_000.0, 10.0, 0.0, 5_000_000.0, 0.0, -10.0]))
            .with_spatial_ref(Some(SpatialReference::from_epsg(32633).unwrap()));

        let footprint = FootprintExtractor::default().extract(&raster).unwrap();
        assert!(
            footprint
                .exterior()
                .iter()
                .any(|(lat, lon)| (lat - 45.149).abs() < 0.01 && (lon - 15.0).abs() < 1e-6)
        );
    }

    proptest! {
        #[test]
        fn test_exterior_ring_is_closed(
            x0 in 0usize..10, y0 in 0usize..10, w in 2usize..10, h in 2usize..10,
        ) {
            let raster = raster(20, 20, |x, y| x >= x0 && x < x0 + w && y >= y0 && y < y0 + h);
            let footprint = FootprintExtractor::default().extract(&raster).unwrap();
            let ring = footprint.exterior();
            prop_assert!(ring.len() >= 4);
            prop_assert_eq!(ring.first(), ring.last());
        }
    }
}
