use std::path::Path;

use crate::preprocessing::common::error::Result;
use crate::preprocessing::encoding::types::FormatSelection;
use crate::preprocessing::raster::types::RasterHandle;

/// Encodes a raster, including any attached overview levels, into a
/// persistent artifact at `output`.
pub trait RasterWriter {
    fn write_raster(&self, raster: &RasterHandle, output: &Path, format: &FormatSelection) -> Result<()>;
}
