//! Spatial references and point reprojection.
//!
//! CRS definitions come from the `crs-definitions` EPSG database and points are
//! transformed with `proj4rs`, so no native PROJ installation is required.

use std::fmt;
use std::str::FromStr;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::preprocessing::common::error::{PreProcessError, Result};

/// EPSG code of geographic WGS84, the footprint target reference.
pub const WGS84_EPSG: u16 = 4326;

/// A coordinate reference system identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpatialReference {
    epsg: u16,
}

impl SpatialReference {
    /// Creates a reference, failing when the code is not in the EPSG database.
    pub fn from_epsg(epsg: u16) -> Result<Self> {
        if crs_definitions::from_code(epsg).is_none() {
            return Err(PreProcessError::ProjectionError(format!(
                "EPSG:{epsg} is not in the crs-definitions database"
            )));
        }
        Ok(Self { epsg })
    }

    pub fn wgs84() -> Self {
        Self { epsg: WGS84_EPSG }
    }

    pub fn epsg(&self) -> u16 {
        self.epsg
    }

    pub fn proj_string(&self) -> Option<&'static str> {
        crs_definitions::from_code(self.epsg).map(|def| def.proj4)
    }

    pub fn is_geographic(&self) -> bool {
        match self.proj_string() {
            Some(proj) => proj.contains("+proj=longlat"),
            None => self.epsg == WGS84_EPSG,
        }
    }
}

impl fmt::Display for SpatialReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Accepts `EPSG:<code>` (case-insensitive) or a bare code.
impl FromStr for SpatialReference {
    type Err = PreProcessError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let code = match s.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &s[5..],
            _ => s,
        };
        let epsg = code.parse::<u16>().map_err(|_| {
            PreProcessError::InvalidConfigError(format!("invalid CRS identifier '{s}'"))
        })?;
        Self::from_epsg(epsg)
    }
}

/// Point transformer between two spatial references.
pub struct CoordinateTransform {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
    identity: bool,
}

impl CoordinateTransform {
    pub fn new(source: &SpatialReference, target: &SpatialReference) -> Result<Self> {
        let source_proj = build_proj(source)?;
        let target_proj = build_proj(target)?;
        Ok(Self {
            source: source_proj,
            target: target_proj,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
            identity: source == target,
        })
    }

    /// Transforms one point; geographic coordinates are in degrees (x = lon).
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.identity {
            return Ok((x, y));
        }

        // proj4rs works in radians for geographic systems
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source, &self.target, &mut point)
            .map_err(|e| PreProcessError::ProjectionError(format!("{e:?}")))?;

        let out = if self.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };

        if !out.0.is_finite() || !out.1.is_finite() {
            return Err(PreProcessError::ProjectionError(format!(
                "point ({x}, {y}) has no finite image in the target reference"
            )));
        }
        Ok(out)
    }
}

fn build_proj(srs: &SpatialReference) -> Result<Proj> {
    let proj_string = srs.proj_string().ok_or_else(|| {
        PreProcessError::ProjectionError(format!("{srs} is not in the crs-definitions database"))
    })?;
    Proj::from_proj_string(proj_string)
        .map_err(|e| PreProcessError::ProjectionError(format!("invalid projection {srs}: {e:?}")))
}
