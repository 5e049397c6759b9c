//! Geo-referencing of rasters that carry no usable geotransform.

use geo::{Coord, LineString, Polygon};
use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::projection::{CoordinateTransform, SpatialReference};
use crate::preprocessing::raster::types::{GeoTransform, RasterHandle};

/// Raster with georeferencing applied, plus an optional ready-made footprint
/// in (longitude, latitude).
#[derive(Debug)]
pub struct GeoReferenced {
    pub raster: RasterHandle,
    pub footprint: Option<Polygon<f64>>,
}

pub trait GeoReferenceApplier {
    fn apply(&self, raster: RasterHandle) -> Result<GeoReferenced>;
}

/// Assigns a known geotransform and spatial reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineGeoReference {
    pub geo_transform: GeoTransform,
    pub spatial_ref: SpatialReference,
}

impl AffineGeoReference {
    pub fn new(geo_transform: GeoTransform, spatial_ref: SpatialReference) -> Self {
        Self {
            geo_transform,
            spatial_ref,
        }
    }
}

impl GeoReferenceApplier for AffineGeoReference {
    fn apply(&self, raster: RasterHandle) -> Result<GeoReferenced> {
        if self.geo_transform.invert().is_none() {
            return Err(PreProcessError::InvalidConfigError(
                "geotransform is not invertible".to_string(),
            ));
        }
        debug!("Applying geotransform {:?} in {}", self.geo_transform.0, self.spatial_ref);
        Ok(GeoReferenced {
            raster: raster
                .with_geo_transform(self.geo_transform)
                .with_spatial_ref(Some(self.spatial_ref)),
            footprint: None,
        })
    }
}

/// Stretches the raster over a north-up bounding box.
///
/// The box corners also serve as the footprint, so no tracing takes place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtentGeoReference {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub spatial_ref: SpatialReference,
}

impl ExtentGeoReference {
    pub fn new(extent: [f64; 4], spatial_ref: SpatialReference) -> Result<Self> {
        let [min_x, min_y, max_x, max_y] = extent;
        if !(min_x < max_x && min_y < max_y) {
            return Err(PreProcessError::InvalidConfigError(format!(
                "empty extent {extent:?}"
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
            spatial_ref,
        })
    }

    fn footprint(&self) -> Result<Polygon<f64>> {
        let corners = [
            (self.min_x, self.max_y),
            (self.max_x, self.max_y),
            (self.max_x, self.min_y),
            (self.min_x, self.min_y),
        ];
        let transform = if self.spatial_ref.is_geographic() {
            None
        } else {
            Some(CoordinateTransform::new(&self.spatial_ref, &SpatialReference::wgs84())?)
        };
        let coords = corners
            .iter()
            .map(|&(x, y)| {
                let (x, y) = match &transform {
                    Some(t) => t.transform(x, y)?,
                    None => (x, y),
                };
                Ok(Coord { x, y })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(LineString::new(coords), Vec::new()))
    }
}

impl GeoReferenceApplier for ExtentGeoReference {
    fn apply(&self, raster: RasterHandle) -> Result<GeoReferenced> {
        let geo_transform = GeoTransform([
            self.min_x,
            (self.max_x - self.min_x) / raster.width as f64,
            0.0,
            self.max_y,
            0.0,
            -(self.max_y - self.min_y) / raster.height as f64,
        ]);
        let footprint = self.footprint()?;
        Ok(GeoReferenced {
            raster: raster
                .with_geo_transform(geo_transform)
                .with_spatial_ref(Some(self.spatial_ref)),
            footprint: Some(footprint),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::{Band, PixelType};

    fn plain(width: usize, height: usize) -> RasterHandle {
        RasterHandle::new(width, height, vec![Band::new(vec![1.0; width * height], PixelType::Byte)])
            .unwrap()
    }

    #[test]
    fn test_affine() {
        let gt = GeoTransform([100.0, 2.0, 0.0, 200.0, 0.0, -2.0]);
        let applied = AffineGeoReference::new(gt, SpatialReference::wgs84())
            .apply(plain(2, 2))
            .unwrap();
        assert_eq!(applied.raster.geo_transform, gt);
        assert!(applied.raster.is_georeferenced());
        assert!(applied.footprint.is_none());
    }

    #[test]
    fn test_affine_rejects_singular() {
        let gt = GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let result = AffineGeoReference::new(gt, SpatialReference::wgs84()).apply(plain(1, 1));
        assert!(matches!(result, Err(PreProcessError::InvalidConfigError(_))));
    }

    #[test]
    fn test_extent() {
        let reference =
            ExtentGeoReference::new([10.0, 40.0, 14.0, 42.0], SpatialReference::wgs84()).unwrap();
        let applied = reference.apply(plain(4, 2)).unwrap();

        assert_eq!(
            applied.raster.geo_transform,
            GeoTransform([10.0, 1.0, 0.0, 42.0, 0.0, -1.0])
        );
        let footprint = applied.footprint.unwrap();
        assert_eq!(footprint.exterior().0[0], Coord { x: 10.0, y: 42.0 });
        assert_eq!(footprint.exterior().0.len(), 5);
    }

    #[test]
    fn test_empty_extent() {
        assert!(ExtentGeoReference::new([1.0, 1.0, 1.0, 2.0], SpatialReference::wgs84()).is_err());
    }
}
