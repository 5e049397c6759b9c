//! In-memory raster types

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::palette::Palette;
use crate::preprocessing::raster::projection::SpatialReference;

/// Sample type of a single band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Byte,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl PixelType {
    pub fn bits(&self) -> u16 {
        match self {
            PixelType::Byte => 8,
            PixelType::UInt16 | PixelType::Int16 => 16,
            PixelType::UInt32 | PixelType::Int32 | PixelType::Float32 => 32,
            PixelType::Float64 => 64,
        }
    }

    /// TIFF SampleFormat value: 1 = unsigned, 2 = signed, 3 = IEEE float.
    pub fn sample_format(&self) -> u16 {
        match self {
            PixelType::Byte | PixelType::UInt16 | PixelType::UInt32 => 1,
            PixelType::Int16 | PixelType::Int32 => 2,
            PixelType::Float32 | PixelType::Float64 => 3,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.sample_format() != 3
    }

    /// Rounds and saturates a value into the representable range of this type.
    pub fn clamp(&self, value: f64) -> f64 {
        let (lo, hi) = match self {
            PixelType::Byte => (u8::MIN as f64, u8::MAX as f64),
            PixelType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
            PixelType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            PixelType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
            PixelType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            PixelType::Float32 => return value as f32 as f64,
            PixelType::Float64 => return value,
        };
        if value.is_nan() {
            return lo;
        }
        value.round().clamp(lo, hi)
    }
}

/// Affine transform mapping pixel (col, row) to world (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// The "unset" transform GDAL reports for rasters without georeferencing.
    pub const IDENTITY: GeoTransform = GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }

    /// Returns the inverse transform (world -> pixel), or `None` when the
    /// transform is degenerate.
    pub fn invert(&self) -> Option<GeoTransform> {
        let gt = &self.0;
        let det = gt[1] * gt[5] - gt[2] * gt[4];
        if det.abs() < f64::EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = gt[5] * inv_det;
        let b = -gt[2] * inv_det;
        let d = -gt[4] * inv_det;
        let e = gt[1] * inv_det;
        Some(GeoTransform([
            -gt[0] * a - gt[3] * b,
            a,
            b,
            -gt[0] * d - gt[3] * e,
            d,
            e,
        ]))
    }

    pub fn has_rotation(&self) -> bool {
        self.0[2] != 0.0 || self.0[4] != 0.0
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single band: row-major samples widened to f64 plus its declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    pub data: Vec<f64>,
    pub pixel_type: PixelType,
    pub nodata: Option<f64>,
}

impl Band {
    pub fn new(data: Vec<f64>, pixel_type: PixelType) -> Self {
        Self {
            data,
            pixel_type,
            nodata: None,
        }
    }

    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = nodata;
        self
    }

    /// True when `value` equals the declared nodata value (NaN matches NaN).
    pub fn is_nodata(&self, value: f64) -> bool {
        match self.nodata {
            Some(nd) if nd.is_nan() => value.is_nan(),
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// Minimum and maximum over all finite, non-nodata samples.
    pub fn valid_range(&self) -> Option<(f64, f64)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite() && !self.is_nodata(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// In-memory raster: grid, bands, georeferencing and optional overview levels.
///
/// Handles are deliberately not `Clone`: every transform consumes the handle it
/// is given, so only one generation of a raster is alive at a time.
#[derive(Debug)]
pub struct RasterHandle {
    pub width: usize,
    pub height: usize,
    pub bands: Vec<Band>,
    pub geo_transform: GeoTransform,
    pub spatial_ref: Option<SpatialReference>,
    /// Color table for single-band paletted rasters
    pub palette: Option<Palette>,
    /// Reduced-resolution copies, finest first
    pub overviews: Vec<RasterHandle>,
}

impl RasterHandle {
    pub fn new(width: usize, height: usize, bands: Vec<Band>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(PreProcessError::InvalidDimensions(width, height));
        }
        if bands.is_empty() {
            return Err(PreProcessError::UnsupportedFormat(
                "raster must have at least one band".to_string(),
            ));
        }
        if let Some((idx, band)) = bands
            .iter()
            .enumerate()
            .find(|(_, b)| b.data.len() != width * height)
        {
            return Err(PreProcessError::UnsupportedFormat(format!(
                "band {} holds {} samples, expected {}x{}",
                idx + 1,
                band.data.len(),
                width,
                height
            )));
        }

        Ok(Self {
            width,
            height,
            bands,
            geo_transform: GeoTransform::IDENTITY,
            spatial_ref: None,
            palette: None,
            overviews: Vec::new(),
        })
    }

    pub fn with_geo_transform(mut self, geo_transform: GeoTransform) -> Self {
        self.geo_transform = geo_transform;
        self
    }

    pub fn with_spatial_ref(mut self, spatial_ref: Option<SpatialReference>) -> Self {
        self.spatial_ref = spatial_ref;
        self
    }

    pub fn with_palette(mut self, palette: Option<Palette>) -> Self {
        self.palette = palette;
        self
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Returns band `index` using GDAL's 1-based numbering.
    pub fn band(&self, index: usize) -> Result<&Band> {
        index
            .checked_sub(1)
            .and_then(|i| self.bands.get(i))
            .ok_or_else(|| {
                PreProcessError::InvalidBandConfigError(format!(
                    "band {} requested, raster has {} band(s)",
                    index,
                    self.bands.len()
                ))
            })
    }

    /// True when the raster carries usable georeferencing.
    pub fn is_georeferenced(&self) -> bool {
        !self.geo_transform.is_identity()
    }

    /// Common pixel type of all bands, `None` when bands disagree.
    pub fn pixel_type(&self) -> Option<PixelType> {
        let first = self.bands.first()?.pixel_type;
        self.bands
            .iter()
            .all(|b| b.pixel_type == first)
            .then_some(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_sentinel() {
        assert!(GeoTransform::IDENTITY.is_identity());
        assert!(GeoTransform::default().is_identity());
        assert!(!GeoTransform([10.0, 0.5, 0.0, 50.0, 0.0, -0.5]).is_identity());
    }

    #[test]
    fn test_geo_transform_inverse() {
        let gt = GeoTransform([500000.0, 30.0, 0.0, 4200000.0, 0.0, -30.0]);
        let inv = gt.invert().unwrap();
        let (x, y) = gt.apply(12.0, 7.0);
        let (col, row) = inv.apply(x, y);
        assert!((col - 12.0).abs() < 1e-9);
        assert!((row - 7.0).abs() < 1e-9);

        assert!(GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]).invert().is_none());
    }

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(matches!(
            RasterHandle::new(0, 10, vec![Band::new(vec![], PixelType::Byte)]),
            Err(PreProcessError::InvalidDimensions(0, 10))
        ));
        assert!(RasterHandle::new(2, 2, vec![]).is_err());
        assert!(RasterHandle::new(2, 2, vec![Band::new(vec![0.0; 3], PixelType::Byte)]).is_err());
    }

    #[test]
    fn test_band_lookup_is_one_based() {
        let raster = RasterHandle::new(
            1,
            1,
            vec![
                Band::new(vec![1.0], PixelType::Byte),
                Band::new(vec![2.0], PixelType::Byte),
            ],
        )
        .unwrap();

        assert_eq!(raster.band(2).unwrap().data[0], 2.0);
        assert!(matches!(
            raster.band(0),
            Err(PreProcessError::InvalidBandConfigError(_))
        ));
        assert!(raster.band(3).is_err());
    }

    #[test]
    fn test_valid_range_skips_nodata() {
        let band = Band::new(vec![0.0, 4.0, 9.0, f64::NAN], PixelType::Float32)
            .with_nodata(Some(0.0));
        assert_eq!(band.valid_range(), Some((4.0, 9.0)));

        let all_nodata = Band::new(vec![0.0, 0.0], PixelType::Byte).with_nodata(Some(0.0));
        assert_eq!(all_nodata.valid_range(), None);
    }

    #[test]
    fn test_pixel_type_clamp() {
        assert_eq!(PixelType::Byte.clamp(300.0), 255.0);
        assert_eq!(PixelType::Byte.clamp(-4.0), 0.0);
        assert_eq!(PixelType::Int16.clamp(-40000.0), i16::MIN as f64);
        assert_eq!(PixelType::UInt16.clamp(12.6), 13.0);
        assert_eq!(PixelType::Float64.clamp(12.6), 12.6);
    }
}
