//! Transform steps
//!
//! Every step consumes the raster it is given and returns its successor, so
//! only one generation of pixel data is alive at a time.

mod band_selection;
mod color_index;
mod nodata;
mod overviews;
mod reprojection;

pub use band_selection::{BandMapping, BandSelection, ScaleBound};
pub use color_index::ColorIndex;
pub use nodata::NoDataAssignment;
pub use overviews::{MIN_OVERVIEW_SIZE, OverviewGeneration, OverviewResampling};
pub use reprojection::Reprojection;

use crate::preprocessing::common::error::Result;
use crate::preprocessing::raster::types::RasterHandle;

#[derive(Debug, Clone, PartialEq)]
pub enum TransformStep {
    BandSelection(BandSelection),
    ColorIndex(ColorIndex),
    NoDataAssignment(NoDataAssignment),
    Reprojection(Reprojection),
    OverviewGeneration(OverviewGeneration),
}

impl TransformStep {
    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::BandSelection(_) => "band_selection",
            TransformStep::ColorIndex(_) => "color_index",
            TransformStep::NoDataAssignment(_) => "nodata_assignment",
            TransformStep::Reprojection(_) => "reprojection",
            TransformStep::OverviewGeneration(_) => "overview_generation",
        }
    }

    /// Whether the step operates on the encoded artifact rather than the
    /// in-memory working copy.
    pub fn is_post_write(&self) -> bool {
        matches!(self, TransformStep::OverviewGeneration(_))
    }

    pub fn apply(&self, raster: RasterHandle) -> Result<RasterHandle> {
        match self {
            TransformStep::BandSelection(step) => step.apply(raster),
            TransformStep::ColorIndex(step) => step.apply(raster),
            TransformStep::NoDataAssignment(step) => step.apply(raster),
            TransformStep::Reprojection(step) => step.apply(raster),
            TransformStep::OverviewGeneration(step) => step.apply(raster),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::raster::types::{Band, PixelType};

    #[test]
    fn test_dispatch_chains_ownership() {
        let raster = RasterHandle::new(
            2,
            1,
            vec![Band::new(vec![10.0, 20.0], PixelType::UInt16)],
        )
        .unwrap();

        let steps = [
            TransformStep::BandSelection(BandSelection::new(vec![BandMapping::auto(1)])),
            TransformStep::NoDataAssignment(NoDataAssignment::new(0.0)),
        ];
        let out = steps
            .iter()
            .try_fold(raster, |current, step| step.apply(current))
            .unwrap();

        assert_eq!(out.bands[0].data, vec![0.0, 255.0]);
        assert_eq!(out.bands[0].nodata, Some(0.0));
    }

    #[test]
    fn test_only_overviews_run_after_write() {
        let overviews = TransformStep::OverviewGeneration(OverviewGeneration::new(
            None,
            OverviewResampling::Nearest,
        ));
        assert!(overviews.is_post_write());
        assert!(!TransformStep::NoDataAssignment(NoDataAssignment::new(0.0)).is_post_write());
        assert_eq!(overviews.name(), "overview_generation");
    }
}
