//! Pre-processing configuration types

use std::path::PathBuf;

use crate::preprocessing::encoding::types::FormatSelection;
use crate::preprocessing::raster::projection::SpatialReference;
use crate::preprocessing::steps::{BandMapping, OverviewResampling};
use crate::preprocessing::strategy::BandMode;

/// Configuration of a pre-processing run
#[derive(Debug, Clone, PartialEq)]
pub struct PreProcessConfig {
    /// Output driver, extension and creation options
    pub format: FormatSelection,
    /// Whether to build overviews on the written artifact
    pub overviews: bool,
    /// Explicit overview factors; derived from the raster size when `None`
    pub overview_levels: Option<Vec<usize>>,
    pub overview_resampling: OverviewResampling,
    /// Target spatial reference, reprojects first when set
    pub crs: Option<SpatialReference>,
    pub band_mode: BandMode,
    /// Explicit band mappings; an empty list counts as not given
    pub bands: Option<Vec<BandMapping>>,
    pub color_index: bool,
    pub palette_file: Option<PathBuf>,
    /// Fixed nodata value assigned to every output band
    pub nodata: Option<f64>,
    /// Footprint simplification threshold in square pixels
    pub footprint_tolerance: f64,
}

impl Default for PreProcessConfig {
    fn default() -> Self {
        Self {
            format: FormatSelection::default(),
            overviews: true,
            overview_levels: None,
            overview_resampling: OverviewResampling::Nearest,
            crs: None,
            band_mode: BandMode::Rgb,
            bands: None,
            color_index: false,
            palette_file: None,
            nodata: None,
            footprint_tolerance: 1.0,
        }
    }
}

impl PreProcessConfig {
    pub fn builder() -> PreProcessConfigBuilder {
        PreProcessConfigBuilder::default()
    }

    /// Explicit band mappings, if any were given.
    pub fn explicit_bands(&self) -> Option<&[BandMapping]> {
        self.bands.as_deref().filter(|b| !b.is_empty())
    }
}

/// Builder for PreProcessConfig
#[derive(Default)]
pub struct PreProcessConfigBuilder {
    format: Option<FormatSelection>,
    overviews: Option<bool>,
    overview_levels: Option<Option<Vec<usize>>>,
    overview_resampling: Option<OverviewResampling>,
    crs: Option<Option<SpatialReference>>,
    band_mode: Option<BandMode>,
    bands: Option<Option<Vec<BandMapping>>>,
    color_index: Option<bool>,
    palette_file: Option<Option<PathBuf>>,
    nodata: Option<Option<f64>>,
    footprint_tolerance: Option<f64>,
}

impl PreProcessConfigBuilder {
    pub fn format(mut self, format: FormatSelection) -> Self {
        self.format = Some(format);
        self
    }

    pub fn overviews(mut self, enable: bool) -> Self {
        self.overviews = Some(enable);
        self
    }

    pub fn overview_levels(mut self, levels: Option<Vec<usize>>) -> Self {
        self.overview_levels = Some(levels);
        self
    }

    pub fn overview_resampling(mut self, resampling: OverviewResampling) -> Self {
        self.overview_resampling = Some(resampling);
        self
    }

    pub fn crs(mut self, crs: Option<SpatialReference>) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn band_mode(mut self, mode: BandMode) -> Self {
        self.band_mode = Some(mode);
        self
    }

    pub fn bands(mut self, bands: Option<Vec<BandMapping>>) -> Self {
        self.bands = Some(bands);
        self
    }

    pub fn color_index(mut self, enable: bool) -> Self {
        self.color_index = Some(enable);
        self
    }

    pub fn palette_file(mut self, path: Option<PathBuf>) -> Self {
        self.palette_file = Some(path);
        self
    }

    pub fn nodata(mut self, value: Option<f64>) -> Self {
        self.nodata = Some(value);
        self
    }

    pub fn footprint_tolerance(mut self, tolerance: f64) -> Self {
        self.footprint_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> PreProcessConfig {
        let default = PreProcessConfig::default();
        PreProcessConfig {
            format: self.format.unwrap_or(default.format),
            overviews: self.overviews.unwrap_or(default.overviews),
            overview_levels: self.overview_levels.unwrap_or(default.overview_levels),
            overview_resampling: self.overview_resampling.unwrap_or(default.overview_resampling),
            crs: self.crs.unwrap_or(default.crs),
            band_mode: self.band_mode.unwrap_or(default.band_mode),
            bands: self.bands.unwrap_or(default.bands),
            color_index: self.color_index.unwrap_or(default.color_index),
            palette_file: self.palette_file.unwrap_or(default.palette_file),
            nodata: self.nodata.unwrap_or(default.nodata),
            footprint_tolerance: self.footprint_tolerance.unwrap_or(default.footprint_tolerance),
        }
    }
}
