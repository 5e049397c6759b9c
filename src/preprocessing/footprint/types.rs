//! Footprint data model

use std::fmt::Write as _;

use geo::{Coord, LineString, Polygon};

use crate::preprocessing::common::error::{PreProcessError, Result};

/// A (latitude, longitude) pair in degrees.
pub type LatLon = (f64, f64);

/// Polygon outline of the valid data region in geographic coordinates.
///
/// Ring 0 is the exterior, every following ring a hole. Each ring is closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    rings: Vec<Vec<LatLon>>,
}

impl Footprint {
    /// Builds a footprint from an exterior ring, closing it when needed.
    pub fn new(exterior: Vec<LatLon>) -> Result<Self> {
        Ok(Self {
            rings: vec![close_ring(exterior)?],
        })
    }

    pub fn with_interiors(mut self, interiors: Vec<Vec<LatLon>>) -> Result<Self> {
        for ring in interiors {
            self.rings.push(close_ring(ring)?);
        }
        Ok(self)
    }

    /// Converts a polygon whose coordinates are (longitude, latitude).
    pub fn from_polygon(polygon: &Polygon<f64>) -> Result<Self> {
        let swap = |ring: &LineString<f64>| ring.coords().map(|c| (c.y, c.x)).collect::<Vec<_>>();
        Self::new(swap(polygon.exterior()))?
            .with_interiors(polygon.interiors().iter().map(swap).collect())
    }

    pub fn exterior(&self) -> &[LatLon] {
        &self.rings[0]
    }

    pub fn interiors(&self) -> &[Vec<LatLon>] {
        &self.rings[1..]
    }

    /// The footprint as a polygon with (longitude, latitude) coordinates.
    pub fn to_polygon(&self) -> Polygon<f64> {
        let line = |ring: &Vec<LatLon>| {
            LineString::new(ring.iter().map(|&(lat, lon)| Coord { x: lon, y: lat }).collect())
        };
        Polygon::new(line(&self.rings[0]), self.interiors().iter().map(line).collect())
    }

    /// Well-known text, axis order longitude latitude.
    pub fn to_wkt(&self) -> String {
        let rings: Vec<String> = self
            .rings
            .iter()
            .map(|ring| {
                let coords: Vec<String> =
                    ring.iter().map(|(lat, lon)| format!("{lon} {lat}")).collect();
                format!("({})", coords.join(", "))
            })
            .collect();
        format!("POLYGON({})", rings.join(", "))
    }

    /// Exterior ring as whitespace separated latitude/longitude values.
    pub fn exterior_pos_list(&self) -> String {
        pos_list(self.exterior())
    }

    pub fn interior_pos_lists(&self) -> Vec<String> {
        self.interiors().iter().map(|r| pos_list(r)).collect()
    }

    /// Tagged pos lists, one `Exterior` line followed by one `Interior` line
    /// per hole.
    pub fn to_pos_lists(&self) -> String {
        let mut out = format!("Exterior: {}", self.exterior_pos_list());
        for interior in self.interior_pos_lists() {
            let _ = write!(out, "\nInterior: {interior}");
        }
        out
    }
}

fn close_ring(mut ring: Vec<LatLon>) -> Result<Vec<LatLon>> {
    if let (Some(&first), Some(&last)) = (ring.first(), ring.last()) {
        if first != last {
            ring.push(first);
        }
    }
    if ring.len() < 4 {
        return Err(PreProcessError::FootprintExtractionError(format!(
            "ring needs at least 3 distinct points, got {}",
            ring.len().saturating_sub(1)
        )));
    }
    Ok(ring)
}

fn pos_list(ring: &[LatLon]) -> String {
    ring.iter()
        .flat_map(|&(lat, lon)| [lat, lon])
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_ring_is_closed() {
        let fp = Footprint::new(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]).unwrap();
        assert_eq!(fp.exterior().len(), 4);
        assert_eq!(fp.exterior().first(), fp.exterior().last());

        let closed = Footprint::new(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (0.0, 0.0)]).unwrap();
        assert_eq!(closed.exterior().len(), 4);
    }

    #[test]
    fn test_degenerate_ring() {
        assert!(matches!(
            Footprint::new(vec![(0.0, 0.0), (1.0, 1.0)]),
            Err(PreProcessError::FootprintExtractionError(_))
        ));
    }

    #[test]
    fn test_polygon_axis_order() {
        let poly = polygon![(x: 10.0, y: 50.0), (x: 11.0, y: 50.0), (x: 11.0, y: 51.0)];
        let fp = Footprint::from_polygon(&poly).unwrap();
        assert_eq!(fp.exterior()[1], (50.0, 11.0));
        assert_eq!(fp.to_polygon(), poly);
    }

    #[test]
    fn test_serialization() {
        let fp = Footprint::new(vec![(1.5, 2.0), (1.5, 3.0), (2.5, 3.0)])
            .unwrap()
            .with_interiors(vec![vec![(1.6, 2.1), (1.6, 2.2), (1.7, 2.2)]])
            .unwrap();

        assert_eq!(fp.exterior_pos_list(), "1.5 2 1.5 3 2.5 3 1.5 2");
        assert_eq!(
            fp.to_pos_lists(),
            "Exterior: 1.5 2 1.5 3 2.5 3 1.5 2\nInterior: 1.6 2.1 1.6 2.2 1.7 2.2 1.6 2.1"
        );
        assert!(fp.to_wkt().starts_with("POLYGON((2 1.5, 3 1.5, 3 2.5, 2 1.5), (2.1 1.6"));
    }
}
