//! Transform planning
//!
//! Planning only inspects the raster and the configuration; it never touches
//! pixel data or the filesystem.

mod band_mode;
mod wms;

pub use band_mode::BandMode;
pub use wms::WmsStrategy;

use crate::preprocessing::common::error::Result;
use crate::preprocessing::pipeline::PreProcessConfig;
use crate::preprocessing::raster::types::RasterHandle;
use crate::preprocessing::steps::TransformStep;

pub trait PlanningStrategy {
    /// Steps applied to the in-memory working copy before encoding.
    fn plan(&self, raster: &RasterHandle, config: &PreProcessConfig) -> Result<Vec<TransformStep>>;

    /// Steps applied to the encoded artifact.
    fn plan_post(
        &self,
        raster: &RasterHandle,
        config: &PreProcessConfig,
    ) -> Result<Vec<TransformStep>>;
}
