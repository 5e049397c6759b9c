use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;

use coverage_preprocess::logger;
use coverage_preprocess::preprocessing::steps::OverviewResampling;
use coverage_preprocess::preprocessing::{
    BandMapping, BandMode, ExtentGeoReference, FormatSelection, GeoReferenceApplier,
    PreProcessConfig, SpatialReference, WmsPreProcessor,
};

/// Prepares a raster for map rendering and derives its footprint.
#[derive(Debug, Parser)]
#[command(name = "coverage_preprocess", version, about)]
struct Cli {
    /// Raster to read
    input: PathBuf,

    /// Output path; the extension is replaced by the format's extension
    output: PathBuf,

    /// Output driver
    #[arg(long, default_value = "GTiff")]
    driver: String,

    /// Output file extension
    #[arg(long, default_value = ".tif")]
    extension: String,

    /// Driver creation option as KEY=VALUE, repeatable
    #[arg(long = "co", value_name = "KEY=VALUE")]
    creation_options: Vec<String>,

    /// rgb, rgba or original (or 0, 1, 2)
    #[arg(long, default_value = "rgb")]
    band_mode: BandMode,

    /// Band mapping as INDEX or INDEX,MIN,MAX where bounds may be min/max, repeatable
    #[arg(long = "band", value_name = "MAPPING")]
    bands: Vec<BandMapping>,

    /// Reproject into this reference first, e.g. EPSG:3857
    #[arg(long)]
    crs: Option<SpatialReference>,

    /// Convert to a single paletted band
    #[arg(long)]
    color_index: bool,

    /// Palette file with one "R G B [A]" entry per line
    #[arg(long, requires = "color_index")]
    palette: Option<PathBuf>,

    /// Nodata value assigned to every output band
    #[arg(long, allow_hyphen_values = true)]
    nodata: Option<f64>,

    /// Skip overview generation
    #[arg(long)]
    no_overviews: bool,

    /// Overview factors, e.g. 2,4,8; derived from the raster size by default
    #[arg(long, value_delimiter = ',')]
    overview_levels: Option<Vec<usize>>,

    /// nearest or average
    #[arg(long, default_value = "nearest")]
    resampling: OverviewResampling,

    /// Skip footprint generation
    #[arg(long)]
    no_footprint: bool,

    /// Footprint simplification threshold, a triangle area in square pixels
    #[arg(long, default_value_t = 1.0)]
    tolerance: f64,

    /// Georeference the input over MINX,MINY,MAXX,MAXY
    #[arg(long, allow_hyphen_values = true)]
    extent: Option<String>,

    /// Spatial reference of --extent
    #[arg(long, default_value = "EPSG:4326", requires = "extent")]
    extent_crs: SpatialReference,

    /// Log per-phase timings
    #[arg(long)]
    timings: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_extent(value: &str) -> anyhow::Result<[f64; 4]> {
    let values = value
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid extent '{value}'"))?;
    match values.as_slice() {
        &[min_x, min_y, max_x, max_y] => Ok([min_x, min_y, max_x, max_y]),
        _ => bail!("extent needs 4 values, got {}", values.len()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logger::init(if cli.verbose { "debug" } else { "info" });

    let config = PreProcessConfig::builder()
        .format(FormatSelection::new(
            cli.driver,
            cli.extension,
            cli.creation_options,
        ))
        .band_mode(cli.band_mode)
        .bands(Some(cli.bands))
        .crs(cli.crs)
        .color_index(cli.color_index)
        .palette_file(cli.palette)
        .nodata(cli.nodata)
        .overviews(!cli.no_overviews)
        .overview_levels(cli.overview_levels)
        .overview_resampling(cli.resampling)
        .footprint_tolerance(cli.tolerance)
        .build();

    let geo_reference = match cli.extent.as_deref() {
        Some(extent) => Some(ExtentGeoReference::new(parse_extent(extent)?, cli.extent_crs)?),
        None => None,
    };

    let preprocessor = WmsPreProcessor::new(config);
    info!(
        "Band mode: {}, overviews: {}",
        preprocessor.config().band_mode,
        if preprocessor.config().overviews { "enabled" } else { "disabled" }
    );

    let (result, timings) = preprocessor
        .process_with_timings(
            &cli.input,
            &cli.output,
            geo_reference.as_ref().map(|g| g as &dyn GeoReferenceApplier),
            !cli.no_footprint,
        )
        .with_context(|| format!("pre-processing {} failed", cli.input.display()))?;

    if cli.timings {
        timings.log_summary();
    }

    println!("{}", result.output_path().display());
    if let Some(footprint) = result.footprint() {
        println!("{}", footprint.to_pos_lists());
    }

    Ok(())
}
