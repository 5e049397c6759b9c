use std::path::{Path, PathBuf};

use geo::Polygon;

use crate::preprocessing::footprint::Footprint;

/// Outcome of a pre-processing run.
#[derive(Debug, Clone, PartialEq)]
pub struct PreProcessResult {
    output_path: PathBuf,
    footprint: Option<Footprint>,
}

impl PreProcessResult {
    pub fn new(output_path: PathBuf, footprint: Option<Footprint>) -> Self {
        Self {
            output_path,
            footprint,
        }
    }

    /// Path of the written raster, carrying the configured extension.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// `None` when no footprint was requested.
    pub fn footprint(&self) -> Option<&Footprint> {
        self.footprint.as_ref()
    }

    /// Footprint with (longitude, latitude) coordinates.
    pub fn footprint_polygon(&self) -> Option<Polygon<f64>> {
        self.footprint.as_ref().map(Footprint::to_polygon)
    }

    pub fn footprint_wkt(&self) -> Option<String> {
        self.footprint.as_ref().map(Footprint::to_wkt)
    }
}
