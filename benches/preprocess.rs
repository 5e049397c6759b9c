use coverage_preprocess::preprocessing::steps::{BandMapping, BandSelection};
use coverage_preprocess::preprocessing::{
    Band, FootprintExtractor, GeoTransform, PixelType, PlanningStrategy, PreProcessConfig,
    RasterHandle, SpatialReference, WmsStrategy,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// Single band raster with a nodata border and a notched interior.
fn generate_raster(width: usize, height: usize) -> RasterHandle {
    let data = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            let border = x < 8 || y < 8 || x >= width - 8 || y >= height - 8;
            let notch = x < width / 3 && y < height / 4;
            if border || notch {
                0.0
            } else {
                ((x + y) % 4000) as f64 + 1.0
            }
        })
        .collect();
    RasterHandle::new(
        width,
        height,
        vec![Band::new(data, PixelType::UInt16).with_nodata(Some(0.0))],
    )
    .unwrap()
    .with_geo_transform(GeoTransform([500_000.0, 10.0, 0.0, 5_000_000.0, 0.0, -10.0]))
    .with_spatial_ref(Some(SpatialReference::from_epsg(32633).unwrap()))
}

fn benchmark_footprint_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("footprint_by_size");

    let sizes = vec![(100, 100, "100x100"), (500, 500, "500x500"), (1000, 1000, "1000x1000")];

    for (width, height, label) in sizes {
        let raster = generate_raster(width, height);
        let extractor = FootprintExtractor::default();

        group.bench_with_input(BenchmarkId::from_parameter(label), &raster, |b, raster| {
            b.iter(|| {
                let _ = extractor.extract(black_box(raster));
            });
        });
    }

    group.finish();
}

fn benchmark_band_selection(c: &mut Criterion) {
    let selection = BandSelection::new(vec![BandMapping::auto(1); 3]);

    c.bench_function("band_selection_500x500", |b| {
        b.iter_with_setup(
            || generate_raster(500, 500),
            |raster| {
                let _ = selection.apply(black_box(raster));
            },
        );
    });
}

fn benchmark_planning(c: &mut Criterion) {
    let raster = generate_raster(100, 100);
    let config = PreProcessConfig::builder()
        .crs(Some(SpatialReference::wgs84()))
        .nodata(Some(0.0))
        .build();

    c.bench_function("plan_wms", |b| {
        b.iter(|| {
            let _ = WmsStrategy.plan(black_box(&raster), black_box(&config));
        });
    });
}

criterion_group!(
    benches,
    benchmark_footprint_sizes,
    benchmark_band_selection,
    benchmark_planning
);
criterion_main!(benches);
