use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, instrument, warn};

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::encoding::{GeoTiffWriter, RasterWriter};
use crate::preprocessing::footprint::{Footprint, FootprintExtractor};
use crate::preprocessing::georeference::GeoReferenceApplier;
use crate::preprocessing::raster::{GeoTiffReader, RasterHandle, RasterReader};
use crate::preprocessing::steps::TransformStep;
use crate::preprocessing::strategy::{PlanningStrategy, WmsStrategy};

use super::config::PreProcessConfig;
use super::result::PreProcessResult;
use super::timing::{Phase, PipelineTimings, Timer};

/// Reads a raster, transforms it according to the configured strategy,
/// encodes it and derives its footprint.
pub struct PreProcessor<R: RasterReader, W: RasterWriter, S: PlanningStrategy> {
    reader: R,
    writer: W,
    strategy: S,
    config: PreProcessConfig,
}

/// GeoTIFF in, GeoTIFF out, prepared for map rendering.
pub type WmsPreProcessor = PreProcessor<GeoTiffReader, GeoTiffWriter, WmsStrategy>;

impl PreProcessor<GeoTiffReader, GeoTiffWriter, WmsStrategy> {
    pub fn new(config: PreProcessConfig) -> Self {
        Self {
            reader: GeoTiffReader,
            writer: GeoTiffWriter,
            strategy: WmsStrategy,
            config,
        }
    }
}

impl<R: RasterReader, W: RasterWriter, S: PlanningStrategy> PreProcessor<R, W, S> {
    pub fn with_custom(reader: R, writer: W, strategy: S, config: PreProcessConfig) -> Self {
        Self {
            reader,
            writer,
            strategy,
            config,
        }
    }

    pub fn process<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        geo_reference: Option<&dyn GeoReferenceApplier>,
        generate_footprint: bool,
    ) -> Result<PreProcessResult> {
        self.process_with_timings(input_path, output_path, geo_reference, generate_footprint)
            .map(|(result, _)| result)
    }

    #[instrument(skip_all, fields(input = %input_path.as_ref().display()))]
    pub fn process_with_timings<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
        geo_reference: Option<&dyn GeoReferenceApplier>,
        generate_footprint: bool,
    ) -> Result<(PreProcessResult, PipelineTimings)> {
        let input_path = input_path.as_ref();
        let mut timings = PipelineTimings::new();

        let timer = Timer::start(Phase::ReadInput);
        let raster = {
            let _span = info_span!("read_input").entered();
            self.reader.read_raster(input_path)?
        };
        timings.record(timer);
        info!(
            width = raster.width,
            height = raster.height,
            bands = raster.band_count(),
            "Opened input raster"
        );

        let timer = Timer::start(Phase::Georeference);
        let (raster, footprint_override) = match geo_reference {
            None if raster.geo_transform.is_identity() => {
                return Err(PreProcessError::MissingGeoreferenceError);
            }
            None => (raster, None),
            Some(applier) => {
                let _span = info_span!("apply_georeference").entered();
                let applied = applier.apply(raster)?;
                (applied.raster, applied.footprint)
            }
        };
        timings.record(timer);

        let (steps, post_steps) = {
            let _span = info_span!("plan").entered();
            (
                self.strategy.plan(&raster, &self.config)?,
                self.strategy.plan_post(&raster, &self.config)?,
            )
        };

        let raster = self.run_steps(raster, &steps, &mut timings)?;

        let output_path = self.output_path(output_path);
        let timer = Timer::start(Phase::Encode);
        {
            let _span = info_span!("encode", output = %output_path.display()).entered();
            debug!(
                "Writing with driver {} and options [{}]",
                self.config.format.driver(),
                self.config.format.creation_options().join(", ")
            );
            self.writer.write_raster(&raster, &output_path, &self.config.format)?;
        }
        timings.record(timer);

        let footprint = match (generate_footprint, footprint_override) {
            (false, _) => Ok(None),
            (true, Some(polygon)) => {
                debug!("Using footprint supplied by the geo reference");
                Footprint::from_polygon(&polygon).map(Some)
            }
            (true, None) => {
                let timer = Timer::start(Phase::Footprint);
                let _span = info_span!("extract_footprint").entered();
                let footprint = FootprintExtractor::new(self.config.footprint_tolerance)
                    .extract(&raster)
                    .map(Some);
                timings.record(timer);
                footprint
            }
        };
        drop(raster);

        if !post_steps.is_empty() {
            let timer = Timer::start(Phase::PostWrite);
            let _span = info_span!("post_write").entered();
            let artifact = self.reader.read_raster(&output_path)?;
            let artifact = self.run_steps(artifact, &post_steps, &mut timings)?;
            self.writer.write_raster(&artifact, &output_path, &self.config.format)?;
            timings.record(timer);
        }

        let footprint = footprint.inspect_err(|e| {
            warn!("Footprint failed, {} was written regardless: {}", output_path.display(), e)
        })?;

        info!(output = %output_path.display(), "Pre-processing complete");
        Ok((PreProcessResult::new(output_path, footprint), timings))
    }

    fn run_steps(
        &self,
        raster: RasterHandle,
        steps: &[TransformStep],
        timings: &mut PipelineTimings,
    ) -> Result<RasterHandle> {
        steps.iter().try_fold(raster, |current, step| {
            let _span = info_span!("step", name = step.name()).entered();
            debug!("Applying step '{}'", step.name());
            let timer = Timer::start(Phase::step(step));
            let next = step.apply(current)?;
            timings.record(timer);
            Ok(next)
        })
    }

    /// `output_path` with its extension replaced by the configured one.
    pub fn output_path<Q: AsRef<Path>>(&self, output_path: Q) -> PathBuf {
        let extension = self.config.format.extension().trim_start_matches('.');
        output_path.as_ref().with_extension(extension)
    }

    pub fn config(&self) -> &PreProcessConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: PreProcessConfig) {
        self.config = config;
    }
}
