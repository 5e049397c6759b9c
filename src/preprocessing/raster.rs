//! Raster model and reading module
//!
//! This module holds the in-memory raster handle, spatial references and the
//! readers that materialize raster files into handles.

mod reader;
mod geotiff_reader;
pub mod geotags;
pub mod palette;
pub mod projection;
pub mod types;

pub use reader::RasterReader;
pub use geotiff_reader::GeoTiffReader;
pub use palette::Palette;
pub use projection::{CoordinateTransform, SpatialReference};
pub use types::{Band, GeoTransform, PixelType, RasterHandle};
