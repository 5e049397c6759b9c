//! Footprint derivation module
//!
//! Fuses band validity into a mask, traces the valid region into a polygon
//! and maps it to geographic coordinates.

mod extractor;
mod mask;
mod trace;
pub mod types;

pub use extractor::FootprintExtractor;
pub use mask::ValidityMask;
pub use trace::trace_regions;
pub use types::{Footprint, LatLon};
