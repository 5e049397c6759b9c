use std::path::Path;

use crate::preprocessing::common::error::Result;
use crate::preprocessing::raster::types::RasterHandle;

/// Opens a raster dataset read-only and returns a fully materialized
/// in-memory copy; the source file is never modified.
pub trait RasterReader {
    fn read_raster(&self, path: &Path) -> Result<RasterHandle>;
}
