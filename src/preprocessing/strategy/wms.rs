use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::pipeline::PreProcessConfig;
use crate::preprocessing::raster::types::RasterHandle;
use crate::preprocessing::steps::{
    BandMapping, BandSelection, ColorIndex, NoDataAssignment, OverviewGeneration, Reprojection,
    TransformStep,
};
use crate::preprocessing::strategy::PlanningStrategy;

/// Prepares rasters for fast map rendering: byte RGB(A) composition,
/// optional palette indexing and overview pyramids.
#[derive(Debug, Clone, Copy, Default)]
pub struct WmsStrategy;

impl WmsStrategy {
    fn band_selection(
        &self,
        raster: &RasterHandle,
        config: &PreProcessConfig,
    ) -> Result<Option<BandSelection>> {
        let Some(expected) = config.band_mode.band_count() else {
            if config.explicit_bands().is_some() {
                return Err(PreProcessError::InvalidBandConfigError(
                    "band mode is 'original', but bands are given".to_string(),
                ));
            }
            return Ok(None);
        };

        let mappings = match config.explicit_bands() {
            Some(bands) if bands.len() != expected => {
                return Err(PreProcessError::InvalidBandConfigError(format!(
                    "wrong number of bands given for {} mode, expected {}, got {}",
                    config.band_mode,
                    expected,
                    bands.len()
                )));
            }
            Some(bands) => bands.to_vec(),
            None if raster.band_count() == 1 => vec![BandMapping::auto(1); expected],
            None => (1..=expected).map(BandMapping::auto).collect(),
        };

        let selection = BandSelection::new(mappings);
        selection.validate(raster.band_count())?;
        Ok(Some(selection))
    }
}

impl PlanningStrategy for WmsStrategy {
    fn plan(&self, raster: &RasterHandle, config: &PreProcessConfig) -> Result<Vec<TransformStep>> {
        let mut steps = Vec::new();

        if let Some(crs) = config.crs {
            steps.push(TransformStep::Reprojection(Reprojection::new(crs)));
        }

        let selection = self.band_selection(raster, config)?;
        let output_bands = selection
            .as_ref()
            .map_or(raster.band_count(), |s| s.mappings.len());
        if let Some(selection) = selection {
            steps.push(TransformStep::BandSelection(selection));
        }

        if config.color_index {
            if !matches!(output_bands, 3 | 4) {
                return Err(PreProcessError::InvalidBandConfigError(format!(
                    "color indexing needs 3 or 4 bands, {output_bands} would be produced"
                )));
            }
            steps.push(TransformStep::ColorIndex(ColorIndex::new(
                config.palette_file.clone(),
            )));
        }

        if let Some(value) = config.nodata {
            steps.push(TransformStep::NoDataAssignment(NoDataAssignment::new(value)));
        }

        debug!(
            "Planned steps: [{}]",
            steps.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(steps)
    }

    fn plan_post(
        &self,
        _raster: &RasterHandle,
        config: &PreProcessConfig,
    ) -> Result<Vec<TransformStep>> {
        if !config.overviews {
            return Ok(Vec::new());
        }
        Ok(vec![TransformStep::OverviewGeneration(OverviewGeneration::new(
            config.overview_levels.clone(),
            config.overview_resampling,
        ))])
    }
}
