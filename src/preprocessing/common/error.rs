use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreProcessError {
    #[error("Failed to read input raster: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("No geospatial reference for unreferenced dataset given")]
    MissingGeoreferenceError,

    #[error("Invalid band configuration: {0}")]
    InvalidBandConfigError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),

    #[error("Footprint extraction failed: {0}")]
    FootprintExtractionError(String),

    #[error("Failed to encode raster: {0}")]
    EncodingError(String),

    #[error("Invalid raster dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Projection error: {0}")]
    ProjectionError(String),

    #[error("Invalid palette: {0}")]
    PaletteError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PreProcessError>;
