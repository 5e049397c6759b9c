//! Raster pre-processing module
//!
//! This module turns arbitrary rasters into rendering-ready GeoTIFFs: reading,
//! planned band and projection transforms, encoding, and derivation of the
//! footprint of the valid data.

pub mod common;
pub mod encoding;
pub mod footprint;
pub mod georeference;
pub mod pipeline;
pub mod raster;
pub mod steps;
pub mod strategy;

pub use common::{
    PreProcessError,
    Result,
};

pub use raster::{
    Band,
    GeoTiffReader,
    GeoTransform,
    PixelType,
    RasterHandle,
    RasterReader,
    SpatialReference,
};

pub use encoding::{
    FormatSelection,
    GeoTiffWriter,
    RasterWriter,
};

pub use footprint::{
    Footprint,
    FootprintExtractor,
};

pub use georeference::{
    AffineGeoReference,
    ExtentGeoReference,
    GeoReferenceApplier,
    GeoReferenced,
};

pub use steps::{
    BandMapping,
    ScaleBound,
    TransformStep,
};

pub use strategy::{
    BandMode,
    PlanningStrategy,
    WmsStrategy,
};

pub use pipeline::{
    PreProcessConfig,
    PreProcessConfigBuilder,
    PreProcessResult,
    PreProcessor,
    WmsPreProcessor,
};
