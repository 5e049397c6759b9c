//! Raster encoding module
//!
//! This module provides GeoTIFF writing with driver selection and creation options.

mod writer;
mod geotiff_writer;
pub mod types;

pub use writer::RasterWriter;
pub use geotiff_writer::GeoTiffWriter;
pub use types::{EncodingOptions, FormatSelection, TiffCompression, GTIFF_DRIVER};
