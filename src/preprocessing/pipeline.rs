//! Pre-processing orchestration module

pub mod config;
mod preprocessor;
mod result;
pub mod timing;


pub use config::{PreProcessConfig, PreProcessConfigBuilder};
pub use preprocessor::{PreProcessor, WmsPreProcessor};
pub use result::PreProcessResult;
pub use timing::{Phase, PipelineTimings, Timer};
