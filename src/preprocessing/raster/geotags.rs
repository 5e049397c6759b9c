//! GeoTIFF tag and GeoKey identifiers shared by the reader and writer.

use crate::preprocessing::raster::projection::SpatialReference;
use crate::preprocessing::raster::types::GeoTransform;

pub const NEW_SUBFILE_TYPE: u16 = 254;
pub const GEOTIFF_MODELPIXELSCALE: u16 = 33550;
pub const GEOTIFF_MODELTIEPOINT: u16 = 33922;
pub const GEOTIFF_MODELTRANSFORMATION: u16 = 34264;
pub const GEOTIFF_GEOKEYDIRECTORY: u16 = 34735;
pub const GDAL_NODATA: u16 = 42113;

pub const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;

/// Builds a geotransform from ModelPixelScale + ModelTiepoint values.
pub fn transform_from_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<GeoTransform> {
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Some(GeoTransform([
        x - i * scale[0],
        scale[0],
        0.0,
        y + j * scale[1],
        0.0,
        -scale[1],
    ]))
}

/// Builds a geotransform from the 4x4 ModelTransformation matrix.
pub fn transform_from_matrix(matrix: &[f64]) -> Option<GeoTransform> {
    if matrix.len() < 16 {
        return None;
    }
    Some(GeoTransform([
        matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
    ]))
}

/// Row-major 4x4 ModelTransformation matrix for a (possibly rotated) transform.
pub fn matrix_from_transform(gt: &GeoTransform) -> [f64; 16] {
    let g = &gt.0;
    [
        g[1], g[2], 0.0, g[0], //
        g[4], g[5], 0.0, g[3], //
        0.0, 0.0, 0.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

/// Extracts the EPSG code from a GeoKeyDirectory.
pub fn epsg_from_geokeys(keys: &[u16]) -> Option<u16> {
    if keys.len() < 4 {
        return None;
    }
    let count = keys[3] as usize;
    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        // location != 0 points into another tag; codes are always inline
        if location != 0 {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_GEO_KEY => return Some(value),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(value),
            _ => {}
        }
    }
    geographic
}

/// GeoKeyDirectory describing `srs` with pixel-is-area raster space.
pub fn geokeys_for(srs: &SpatialReference) -> Vec<u16> {
    let geographic = srs.is_geographic();
    let mut keys = vec![1, 1, 0, 3];
    keys.extend_from_slice(&[
        GT_MODEL_TYPE_GEO_KEY,
        0,
        1,
        if geographic {
            MODEL_TYPE_GEOGRAPHIC
        } else {
            MODEL_TYPE_PROJECTED
        },
    ]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
    if geographic {
        keys.extend_from_slice(&[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, srs.epsg()]);
    } else {
        keys.extend_from_slice(&[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, srs.epsg()]);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiepoint_transform() {
        let gt = transform_from_tiepoint(&[30.0, 30.0, 0.0], &[0.0, 0.0, 0.0, 500000.0, 4200000.0, 0.0])
            .unwrap();
        assert_eq!(gt.0, [500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0]);
    }

    #[test]
    fn test_matrix_roundtrip() {
        let gt = GeoTransform([10.0, 0.5, 0.1, 50.0, 0.2, -0.5]);
        assert_eq!(transform_from_matrix(&matrix_from_transform(&gt)), Some(gt));
    }

    #[test]
    fn test_geokeys_roundtrip() {
        let utm = SpatialReference::from_epsg(32633).unwrap();
        assert_eq!(epsg_from_geokeys(&geokeys_for(&utm)), Some(32633));
        assert_eq!(epsg_from_geokeys(&geokeys_for(&SpatialReference::wgs84())), Some(4326));
        assert_eq!(epsg_from_geokeys(&[1, 1, 0, 0]), None);
    }
}
