use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tiff::encoder::colortype::{
    self, Gray8, Gray16, Gray32, Gray32Float, Gray64Float, GrayI16, GrayI32, RGB8, RGB16, RGB32,
    RGB32Float, RGB64Float, RGBA8, RGBA16, RGBA32, RGBA32Float, RGBA64Float,
};
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::encoding::types::{
    EncodingOptions, FormatSelection, GTIFF_DRIVER, TiffCompression,
};
use crate::preprocessing::encoding::writer::RasterWriter;
use crate::preprocessing::raster::geotags::{
    self, GDAL_NODATA, GEOTIFF_GEOKEYDIRECTORY, GEOTIFF_MODELPIXELSCALE, GEOTIFF_MODELTIEPOINT,
    GEOTIFF_MODELTRANSFORMATION, NEW_SUBFILE_TYPE,
};
use crate::preprocessing::raster::types::{PixelType, RasterHandle};

const PHOTOMETRIC_BLACK_IS_ZERO: u16 = 1;
const PHOTOMETRIC_PALETTE: u16 = 3;
const SUBFILE_REDUCED_IMAGE: u32 = 1;

pub struct GeoTiffWriter;

impl RasterWriter for GeoTiffWriter {
    fn write_raster(&self, raster: &RasterHandle, output: &Path, format: &FormatSelection) -> Result<()> {
        if !format.driver().eq_ignore_ascii_case(GTIFF_DRIVER) {
            return Err(PreProcessError::EncodingError(format!(
                "unsupported driver '{}'",
                format.driver()
            )));
        }
        let options = EncodingOptions::from_creation_options(format.creation_options())?;
        let pixel_type = raster.pixel_type().ok_or_else(|| {
            PreProcessError::EncodingError("bands have mixed pixel types".to_string())
        })?;
        for overview in &raster.overviews {
            if overview.band_count() != raster.band_count() || overview.pixel_type() != Some(pixel_type) {
                return Err(PreProcessError::EncodingError(
                    "overview layout differs from base image".to_string(),
                ));
            }
        }

        debug!(
            "Encoding GeoTIFF image: {}x{}x{} {:?}, {} overview(s), {:?}",
            raster.width,
            raster.height,
            raster.band_count(),
            pixel_type,
            raster.overviews.len(),
            options
        );

        let mut buffer = Vec::new();
        {
            let mut encoder = TiffEncoder::new(Cursor::new(&mut buffer))
                .map_err(encode_error)?
                .with_compression(compression_for(options.compression));

            if options.predictor == Some(2) {
                if pixel_type.is_integer() {
                    encoder = encoder.with_predictor(tiff::tags::Predictor::Horizontal);
                } else {
                    warn!("Horizontal predictor ignored for floating point samples");
                }
            }

            write_level(&mut encoder, raster, pixel_type, &options, false)?;
            for overview in &raster.overviews {
                write_level(&mut encoder, overview, pixel_type, &options, true)?;
            }
        }

        replace_file(output, &buffer)?;

        debug!("GeoTIFF encoding complete: {} bytes", buffer.len());
        Ok(())
    }
}

/// Writes into a sibling temporary file and renames it over `output`, so an
/// existing file is either left intact or fully replaced.
fn replace_file(output: &Path, contents: &[u8]) -> Result<()> {
    let write_error =
        |e: std::io::Error| PreProcessError::OutputWriteError(format!("{}: {}", output.display(), e));
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = NamedTempFile::new_in(dir).map_err(write_error)?;
    staged.write_all(contents).map_err(write_error)?;
    // temp files are created owner-only
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_error)?;
    }
    staged.as_file().sync_all().map_err(write_error)?;
    staged.persist(output).map_err(|e| write_error(e.error))?;
    Ok(())
}

fn encode_error(e: tiff::TiffError) -> PreProcessError {
    PreProcessError::EncodingError(e.to_string())
}

fn compression_for(compression: TiffCompression) -> tiff::encoder::Compression {
    use tiff::encoder::compression::DeflateLevel;
    match compression {
        TiffCompression::None => tiff::encoder::Compression::Uncompressed,
        TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
        TiffCompression::PackBits => tiff::encoder::Compression::Packbits,
        TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(DeflateLevel::Fast),
        TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(DeflateLevel::Balanced),
        TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(DeflateLevel::Best),
    }
}

/// Writes one image directory. 1, 3 and 4 band layouts go through the typed
/// encoder (compression and predictor apply); anything else is written as a
/// raw uncompressed strip.
fn write_level<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    level: &RasterHandle,
    pixel_type: PixelType,
    options: &EncodingOptions,
    overview: bool,
) -> Result<()> {
    match (pixel_type, level.band_count()) {
        (PixelType::Byte, 1) => write_typed::<_, Gray8>(encoder, level, overview, &interleave(level, |v| v as u8)),
        (PixelType::Byte, 3) => write_typed::<_, RGB8>(encoder, level, overview, &interleave(level, |v| v as u8)),
        (PixelType::Byte, 4) => write_typed::<_, RGBA8>(encoder, level, overview, &interleave(level, |v| v as u8)),
        (PixelType::UInt16, 1) => write_typed::<_, Gray16>(encoder, level, overview, &interleave(level, |v| v as u16)),
        (PixelType::UInt16, 3) => write_typed::<_, RGB16>(encoder, level, overview, &interleave(level, |v| v as u16)),
        (PixelType::UInt16, 4) => write_typed::<_, RGBA16>(encoder, level, overview, &interleave(level, |v| v as u16)),
        (PixelType::Int16, 1) => write_typed::<_, GrayI16>(encoder, level, overview, &interleave(level, |v| v as i16)),
        (PixelType::UInt32, 1) => write_typed::<_, Gray32>(encoder, level, overview, &interleave(level, |v| v as u32)),
        (PixelType::UInt32, 3) => write_typed::<_, RGB32>(encoder, level, overview, &interleave(level, |v| v as u32)),
        (PixelType::UInt32, 4) => write_typed::<_, RGBA32>(encoder, level, overview, &interleave(level, |v| v as u32)),
        (PixelType::Int32, 1) => write_typed::<_, GrayI32>(encoder, level, overview, &interleave(level, |v| v as i32)),
        (PixelType::Float32, 1) => write_typed::<_, Gray32Float>(encoder, level, overview, &interleave(level, |v| v as f32)),
        (PixelType::Float32, 3) => write_typed::<_, RGB32Float>(encoder, level, overview, &interleave(level, |v| v as f32)),
        (PixelType::Float32, 4) => write_typed::<_, RGBA32Float>(encoder, level, overview, &interleave(level, |v| v as f32)),
        (PixelType::Float64, 1) => write_typed::<_, Gray64Float>(encoder, level, overview, &interleave(level, |v| v)),
        (PixelType::Float64, 3) => write_typed::<_, RGB64Float>(encoder, level, overview, &interleave(level, |v| v)),
        (PixelType::Float64, 4) => write_typed::<_, RGBA64Float>(encoder, level, overview, &interleave(level, |v| v)),
        _ => write_multiband(encoder, level, pixel_type, options, overview),
    }
}

/// Pixel-interleaved samples, saturated into each band's declared type.
fn interleave<T>(level: &RasterHandle, cast: impl Fn(f64) -> T) -> Vec<T> {
    let pixels = level.width * level.height;
    let mut out = Vec::with_capacity(pixels * level.band_count());
    for i in 0..pixels {
        for band in &level.bands {
            out.push(cast(band.pixel_type.clamp(band.data[i])));
        }
    }
    out
}

fn write_typed<W: Write + Seek, C: colortype::ColorType>(
    encoder: &mut TiffEncoder<W>,
    level: &RasterHandle,
    overview: bool,
    data: &[C::Inner],
) -> Result<()>
where
    [C::Inner]: TiffValue,
{
    let mut image = encoder
        .new_image::<C>(level.width as u32, level.height as u32)
        .map_err(encode_error)?;
    write_metadata_tags(image.encoder(), level, overview)?;
    image.write_data(data).map_err(encode_error)?;
    Ok(())
}

/// Writes an arbitrary band count as one chunky, uncompressed strip.
fn write_multiband<W: Write + Seek>(
    encoder: &mut TiffEncoder<W>,
    level: &RasterHandle,
    pixel_type: PixelType,
    options: &EncodingOptions,
    overview: bool,
) -> Result<()> {
    if options.compression != TiffCompression::None {
        warn!(
            "{} band {:?} layout is written uncompressed",
            level.band_count(),
            pixel_type
        );
    }

    let bands = level.band_count();
    let width = level.width as u32;
    let height = level.height as u32;

    let mut dir = encoder.image_directory().map_err(encode_error)?;
    dir.write_tag(Tag::ImageWidth, width).map_err(encode_error)?;
    dir.write_tag(Tag::ImageLength, height).map_err(encode_error)?;
    dir.write_tag(Tag::BitsPerSample, vec![pixel_type.bits(); bands].as_slice())
        .map_err(encode_error)?;
    dir.write_tag(Tag::Compression, 1u16).map_err(encode_error)?;
    dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_BLACK_IS_ZERO)
        .map_err(encode_error)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16).map_err(encode_error)?;
    dir.write_tag(Tag::SampleFormat, vec![pixel_type.sample_format(); bands].as_slice())
        .map_err(encode_error)?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16).map_err(encode_error)?;
    dir.write_tag(Tag::RowsPerStrip, height).map_err(encode_error)?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())
            .map_err(encode_error)?;
    }

    write_metadata_tags(&mut dir, level, overview)?;

    let bytes = sample_bytes(level, pixel_type);
    let offset = dir.write_data(bytes.as_slice()).map_err(encode_error)?;
    let offset = u32::try_from(offset).map_err(|_| {
        PreProcessError::EncodingError("image exceeds classic TIFF size".to_string())
    })?;
    dir.write_tag(Tag::StripOffsets, offset).map_err(encode_error)?;
    dir.write_tag(Tag::StripByteCounts, bytes.len() as u32)
        .map_err(encode_error)?;
    dir.finish().map_err(encode_error)?;
    Ok(())
}

/// Native-endian sample bytes, matching the byte order the encoder declares.
fn sample_bytes(level: &RasterHandle, pixel_type: PixelType) -> Vec<u8> {
    let bytes_per_sample = (pixel_type.bits() / 8) as usize;
    let mut out =
        Vec::with_capacity(level.width * level.height * level.band_count() * bytes_per_sample);
    for i in 0..level.width * level.height {
        for band in &level.bands {
            let v = pixel_type.clamp(band.data[i]);
            match pixel_type {
                PixelType::Byte => out.push(v as u8),
                PixelType::UInt16 => out.extend_from_slice(&(v as u16).to_ne_bytes()),
                PixelType::Int16 => out.extend_from_slice(&(v as i16).to_ne_bytes()),
                PixelType::UInt32 => out.extend_from_slice(&(v as u32).to_ne_bytes()),
                PixelType::Int32 => out.extend_from_slice(&(v as i32).to_ne_bytes()),
                PixelType::Float32 => out.extend_from_slice(&(v as f32).to_ne_bytes()),
                PixelType::Float64 => out.extend_from_slice(&v.to_ne_bytes()),
            }
        }
    }
    out
}

fn write_metadata_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    level: &RasterHandle,
    overview: bool,
) -> Result<()> {
    if let Some(palette) = level.palette.as_ref().filter(|_| level.band_count() == 1) {
        // ColorMap holds 2^BitsPerSample entries per channel, all reds first
        let mut map = vec![0u16; 3 * 256];
        for (i, entry) in palette.entries().iter().enumerate() {
            for c in 0..3 {
                map[c * 256 + i] = entry[c] as u16 * 257;
            }
        }
        dir.write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_PALETTE)
            .map_err(encode_error)?;
        dir.write_tag(Tag::ColorMap, map.as_slice()).map_err(encode_error)?;
    }

    if let Some(nodata) = level.bands.first().and_then(|b| b.nodata) {
        let text = nodata.to_string();
        dir.write_tag(Tag::from_u16_exhaustive(GDAL_NODATA), text.as_str())
            .map_err(encode_error)?;
    }

    if overview {
        dir.write_tag(Tag::from_u16_exhaustive(NEW_SUBFILE_TYPE), SUBFILE_REDUCED_IMAGE)
            .map_err(encode_error)?;
        return Ok(());
    }

    let gt = &level.geo_transform;
    if !gt.is_identity() {
        if gt.has_rotation() || gt.0[5] > 0.0 {
            let matrix = geotags::matrix_from_transform(gt);
            dir.write_tag(Tag::from_u16_exhaustive(GEOTIFF_MODELTRANSFORMATION), matrix.as_slice())
                .map_err(encode_error)?;
        } else {
            let pixel_scale = [gt.0[1], -gt.0[5], 0.0];
            let tiepoint = [0.0, 0.0, 0.0, gt.0[0], gt.0[3], 0.0];
            dir.write_tag(Tag::from_u16_exhaustive(GEOTIFF_MODELPIXELSCALE), pixel_scale.as_slice())
                .map_err(encode_error)?;
            dir.write_tag(Tag::from_u16_exhaustive(GEOTIFF_MODELTIEPOINT), tiepoint.as_slice())
                .map_err(encode_error)?;
        }
    }

    if let Some(srs) = &level.spatial_ref {
        let keys = geotags::geokeys_for(srs);
        dir.write_tag(Tag::from_u16_exhaustive(GEOTIFF_GEOKEYDIRECTORY), keys.as_slice())
            .map_err(encode_error)?;
    }

    Ok(())
}
