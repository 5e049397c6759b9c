//! Band selection with linear stretch to 8 bit.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::preprocessing::common::error::{PreProcessError, Result};
use crate::preprocessing::raster::types::{Band, PixelType, RasterHandle};

/// Lower or upper rescale bound of a band mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleBound {
    Value(f64),
    /// Minimum of the valid samples of the source band
    ActualMin,
    /// Maximum of the valid samples of the source band
    ActualMax,
}

impl ScaleBound {
    fn resolve(&self, range: Option<(f64, f64)>) -> Option<f64> {
        match self {
            ScaleBound::Value(v) => Some(*v),
            ScaleBound::ActualMin => range.map(|r| r.0),
            ScaleBound::ActualMax => range.map(|r| r.1),
        }
    }
}

impl FromStr for ScaleBound {
    type Err = PreProcessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(ScaleBound::ActualMin),
            "max" => Ok(ScaleBound::ActualMax),
            other => other.parse::<f64>().map(ScaleBound::Value).map_err(|_| {
                PreProcessError::InvalidBandConfigError(format!("invalid scale bound '{s}'"))
            }),
        }
    }
}

impl fmt::Display for ScaleBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleBound::Value(v) => write!(f, "{v}"),
            ScaleBound::ActualMin => f.write_str("min"),
            ScaleBound::ActualMax => f.write_str("max"),
        }
    }
}

/// One output band: 1-based source band index plus rescale bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandMapping {
    pub source: usize,
    pub min: ScaleBound,
    pub max: ScaleBound,
}

impl BandMapping {
    pub fn new(source: usize, min: ScaleBound, max: ScaleBound) -> Self {
        Self { source, min, max }
    }

    /// Maps `source` over its full observed data range.
    pub fn auto(source: usize) -> Self {
        Self::new(source, ScaleBound::ActualMin, ScaleBound::ActualMax)
    }
}

/// Parses `index[,min,max]`, e.g. `2`, `1,min,max` or `3,0,4000`.
impl FromStr for BandMapping {
    type Err = PreProcessError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let source = parts[0].parse::<usize>().ok().filter(|i| *i >= 1).ok_or_else(|| {
            PreProcessError::InvalidBandConfigError(format!("invalid band index in '{s}'"))
        })?;
        match parts.as_slice() {
            [_] => Ok(Self::auto(source)),
            [_, min, max] => Ok(Self::new(source, min.parse()?, max.parse()?)),
            _ => Err(PreProcessError::InvalidBandConfigError(format!(
                "expected 'index' or 'index,min,max', got '{s}'"
            ))),
        }
    }
}

impl fmt::Display for BandMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.source, self.min, self.max)
    }
}

/// Selects and reorders bands, stretching each into the 0..=255 byte range.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSelection {
    pub mappings: Vec<BandMapping>,
}

impl BandSelection {
    pub fn new(mappings: Vec<BandMapping>) -> Self {
        Self { mappings }
    }

    /// Checks every mapping against the source band count.
    pub fn validate(&self, band_count: usize) -> Result<()> {
        match self.mappings.iter().find(|m| m.source == 0 || m.source > band_count) {
            Some(m) => Err(PreProcessError::InvalidBandConfigError(format!(
                "band {} requested, raster has {} band(s)",
                m.source, band_count
            ))),
            None => Ok(()),
        }
    }

    pub fn apply(&self, raster: RasterHandle) -> Result<RasterHandle> {
        self.validate(raster.band_count())?;

        let bands = self
            .mappings
            .iter()
            .map(|mapping| {
                let source = raster.band(mapping.source)?;
                Ok(stretch(source, mapping))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Selected bands [{}]",
            self.mappings
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        );

        Ok(RasterHandle::new(raster.width, raster.height, bands)?
            .with_geo_transform(raster.geo_transform)
            .with_spatial_ref(raster.spatial_ref))
    }
}

fn stretch(source: &Band, mapping: &BandMapping) -> Band {
    let range = source.valid_range();
    let lo = mapping.min.resolve(range);
    let hi = mapping.max.resolve(range);
    let nodata = source.nodata.map(|nd| PixelType::Byte.clamp(nd));

    let data = source
        .data
        .iter()
        .map(|&v| {
            if source.is_nodata(v) {
                return nodata.unwrap_or(0.0);
            }
            let scaled = match (lo, hi) {
                (Some(lo), Some(hi)) if hi > lo => (v - lo) * 255.0 / (hi - lo),
                _ => v,
            };
            let scaled = PixelType::Byte.clamp(scaled);
            // a valid pixel must never turn into the nodata value
            match nodata {
                Some(nd) if scaled == nd => {
                    if nd < 255.0 {
                        nd + 1.0
                    } else {
                        nd - 1.0
                    }
                }
                _ => scaled,
            }
        })
        .collect();

    Band::new(data, PixelType::Byte).with_nodata(nodata)
}
