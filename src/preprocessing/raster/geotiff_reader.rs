//! GeoTIFF reader implementation using the tiff library.
//!
//! Decodes the first image directory of a (Geo)TIFF file into a [`RasterHandle`]:
//! chunky samples are split into bands, GeoTIFF model tags become the affine
//! transform, the GeoKeyDirectory provides the EPSG code and the GDAL nodata tag
//! is applied to every band. Files without model tags get the identity
//! transform, marking them as not georeferenced.
//!
//! The decoder rejects RGBPalette images outright, so paletted files are
//! decoded from an in-memory copy whose first directory is relabelled as
//! grayscale; the indices come out unchanged and the ColorMap is read
//! separately.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::geotags::{
    self, GDAL_NODATA, GEOTIFF_GEOKEYDIRECTORY, GEOTIFF_MODELPIXELSCALE, GEOTIFF_MODELTIEPOINT,
    GEOTIFF_MODELTRANSFORMATION,
};
use crate::preprocessing::raster::palette::Palette;
use crate::preprocessing::raster::projection::SpatialReference;
use crate::preprocessing::raster::reader::RasterReader;
use crate::preprocessing::raster::types::{Band, GeoTransform, PixelType, RasterHandle};

pub struct GeoTiffReader;

impl RasterReader for GeoTiffReader {
    fn read_raster(&self, path: &Path) -> Result<RasterHandle> {
        debug!("Opening raster {}", path.display());

        let mut bytes = std::fs::read(path).map_err(|e| {
            PreProcessError::InputReadError(format!("{}: {}", path.display(), e))
        })?;
        let paletted = relabel_palette_photometric(&mut bytes);
        let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| decode_error(path, e))?;

        let (width, height) = decoder.dimensions().map_err(|e| decode_error(path, e))?;
        let colortype = decoder.colortype().map_err(|e| decode_error(path, e))?;
        let samples = samples_per_pixel(colortype)?;

        let palette = if paletted {
            read_palette(&mut decoder, path)?
        } else {
            None
        };
        let geo_transform = read_geo_transform(&mut decoder, path)?;
        let spatial_ref = read_spatial_ref(&mut decoder, path)?;
        let nodata = read_nodata(&mut decoder, path)?;

        let image = decoder.read_image().map_err(|e| decode_error(path, e))?;
        let (interleaved, pixel_type) = widen(image)?;

        let (width, height) = (width as usize, height as usize);
        if interleaved.len() != width * height * samples {
            return Err(PreProcessError::InputReadError(format!(
                "{}: expected {} samples, decoded {}",
                path.display(),
                width * height * samples,
                interleaved.len()
            )));
        }

        let bands = (0..samples)
            .map(|b| {
                let data = interleaved.iter().skip(b).step_by(samples).copied().collect();
                Band::new(data, pixel_type).with_nodata(nodata)
            })
            .collect();

        debug!(
            width,
            height,
            bands = samples,
            ?pixel_type,
            crs = ?spatial_ref,
            "Decoded raster"
        );

        Ok(RasterHandle::new(width, height, bands)?
            .with_geo_transform(geo_transform)
            .with_spatial_ref(spatial_ref)
            .with_palette(palette))
    }
}

const TAG_PHOTOMETRIC: u64 = 262;
const TYPE_SHORT: u64 = 3;
const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_PALETTE: u64 = 3;

/// Rewrites an RGBPalette photometric in the first directory to BlackIsZero.
/// Returns whether the image was paletted.
fn relabel_palette_photometric(bytes: &mut [u8]) -> bool {
    let Some(value_at) = palette_photometric_offset(bytes) else {
        return false;
    };
    let relabelled = if bytes[0] == b'I' {
        PHOTOMETRIC_BLACK_IS_ZERO.to_le_bytes()
    } else {
        PHOTOMETRIC_BLACK_IS_ZERO.to_be_bytes()
    };
    bytes[value_at..value_at + 2].copy_from_slice(&relabelled);
    true
}

/// Offset of the inline PhotometricInterpretation value when it says RGBPalette.
fn palette_photometric_offset(bytes: &[u8]) -> Option<usize> {
    let little_endian = match bytes.get(0..2)? {
        b"II" => true,
        b"MM" => false,
        _ => return None,
    };
    let read = |at: usize, len: usize| -> Option<u64> {
        let raw = bytes.get(at..at.checked_add(len)?)?;
        let fold = |acc: u64, b: &u8| (acc << 8) | u64::from(*b);
        Some(if little_endian {
            raw.iter().rev().fold(0, fold)
        } else {
            raw.iter().fold(0, fold)
        })
    };

    // (first IFD offset, entry count width, entry size, value field offset)
    let (ifd, count_len, entry_len, value_field) = match read(2, 2)? {
        42 => (read(4, 4)?, 2, 12, 8),
        43 => (read(8, 8)?, 8, 20, 12),
        _ => return None,
    };
    let ifd = usize::try_from(ifd).ok()?;
    let entries = usize::try_from(read(ifd, count_len)?).ok()?;

    (0..entries)
        .map(|i| ifd + count_len + i * entry_len)
        .find(|&entry| read(entry, 2) == Some(TAG_PHOTOMETRIC))
        .filter(|&entry| read(entry + 2, 2) == Some(TYPE_SHORT))
        .map(|entry| entry + value_field)
        .filter(|&value_at| read(value_at, 2) == Some(PHOTOMETRIC_PALETTE))
}

fn decode_error(path: &Path, e: tiff::TiffError) -> PreProcessError {
    PreProcessError::InputReadError(format!("{}: {}", path.display(), e))
}

fn samples_per_pixel(colortype: ColorType) -> Result<usize> {
    match colortype {
        ColorType::Gray(_) | ColorType::Palette(_) => Ok(1),
        ColorType::GrayA(_) => Ok(2),
        ColorType::RGB(_) => Ok(3),
        ColorType::RGBA(_) | ColorType::CMYK(_) => Ok(4),
        ColorType::Multiband { num_samples, .. } => Ok(num_samples as usize),
        other => Err(PreProcessError::UnsupportedFormat(format!(
            "color type {other:?}"
        ))),
    }
}

/// Widens decoded samples to f64, remembering the original sample type.
fn widen(image: DecodingResult) -> Result<(Vec<f64>, PixelType)> {
    Ok(match image {
        DecodingResult::U8(v) => (v.into_iter().map(f64::from).collect(), PixelType::Byte),
        DecodingResult::U16(v) => (v.into_iter().map(f64::from).collect(), PixelType::UInt16),
        DecodingResult::U32(v) => (v.into_iter().map(f64::from).collect(), PixelType::UInt32),
        DecodingResult::I8(v) => (v.into_iter().map(f64::from).collect(), PixelType::Int16),
        DecodingResult::I16(v) => (v.into_iter().map(f64::from).collect(), PixelType::Int16),
        DecodingResult::I32(v) => (v.into_iter().map(f64::from).collect(), PixelType::Int32),
        DecodingResult::F32(v) => (v.into_iter().map(f64::from).collect(), PixelType::Float32),
        DecodingResult::F64(v) => (v, PixelType::Float64),
        _ => {
            return Err(PreProcessError::UnsupportedFormat(
                "64-bit integer samples".to_string(),
            ));
        }
    })
}

fn find_tag<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    code: u16,
    path: &Path,
) -> Result<Option<tiff::decoder::ifd::Value>> {
    decoder
        .find_tag(Tag::from_u16_exhaustive(code))
        .map_err(|e| decode_error(path, e))
}

fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<GeoTransform> {
    if let Some(matrix) = find_tag(decoder, GEOTIFF_MODELTRANSFORMATION, path)? {
        let matrix = matrix.into_f64_vec().map_err(|e| decode_error(path, e))?;
        if let Some(gt) = geotags::transform_from_matrix(&matrix) {
            return Ok(gt);
        }
    }

    let scale = find_tag(decoder, GEOTIFF_MODELPIXELSCALE, path)?;
    let tiepoint = find_tag(decoder, GEOTIFF_MODELTIEPOINT, path)?;
    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        let scale = scale.into_f64_vec().map_err(|e| decode_error(path, e))?;
        let tiepoint = tiepoint.into_f64_vec().map_err(|e| decode_error(path, e))?;
        if let Some(gt) = geotags::transform_from_tiepoint(&scale, &tiepoint) {
            return Ok(gt);
        }
    }

    Ok(GeoTransform::IDENTITY)
}

fn read_spatial_ref<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    path: &Path,
) -> Result<Option<SpatialReference>> {
    let Some(keys) = find_tag(decoder, GEOTIFF_GEOKEYDIRECTORY, path)? else {
        return Ok(None);
    };
    let keys = keys.into_u16_vec().map_err(|e| decode_error(path, e))?;
    let Some(epsg) = geotags::epsg_from_geokeys(&keys) else {
        return Ok(None);
    };
    match SpatialReference::from_epsg(epsg) {
        Ok(srs) => Ok(Some(srs)),
        Err(e) => {
            warn!("{}: ignoring spatial reference: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Option<f64>> {
    let Some(value) = find_tag(decoder, GDAL_NODATA, path)? else {
        return Ok(None);
    };
    let text = value.into_string().map_err(|e| decode_error(path, e))?;
    let text = text.trim_matches(char::from(0)).trim();
    match text.parse::<f64>() {
        Ok(v) => Ok(Some(v)),
        Err(_) if text.eq_ignore_ascii_case("nan") => Ok(Some(f64::NAN)),
        Err(_) => {
            warn!("{}: unparseable nodata value '{}'", path.display(), text);
            Ok(None)
        }
    }
}

fn read_palette<R: Read + Seek>(decoder: &mut Decoder<R>, path: &Path) -> Result<Option<Palette>> {
    let Some(map) = decoder
        .find_tag(Tag::ColorMap)
        .map_err(|e| decode_error(path, e))?
    else {
        return Ok(None);
    };
    let map = map.into_u16_vec().map_err(|e| decode_error(path, e))?;
    let n = map.len() / 3;
    let entries = (0..n)
        .map(|i| {
            [
                (map[i] >> 8) as u8,
                (map[n + i] >> 8) as u8,
                (map[2 * n + i] >> 8) as u8,
                255,
            ]
        })
        .collect();
    Palette::new(entries).map(Some)
}
