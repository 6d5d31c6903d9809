use chrono::NaiveDate;
use cml_temperature_map::app::models::{Dataset, EnrichedRecord, PredictedRecord};
use cml_temperature_map::app::services::anomaly_filter::AnomalyFilter;
use cml_temperature_map::app::services::enrichment::ElevationGrid;
use cml_temperature_map::app::services::interpolation::{RegionBoundary, SpatialInterpolator};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ndarray::Array2;

/// Sites on a jittered lattice over lon 12..19, lat 48.5..51
fn site(i: usize, n: usize) -> (f64, f64, f64) {
    let side = (n as f64).sqrt().ceil() as usize;
    let (row, col) = (i / side, i % side);
    let jitter = ((i * 7919) % 97) as f64 / 97.0 * 0.01;
    let lon = 12.0 + 7.0 * (col as f64 + 0.5) / side as f64 + jitter;
    let lat = 48.5 + 2.5 * (row as f64 + 0.5) / side as f64 - jitter;
    let temperature = 18.0 - 0.5 * (lat - 48.5) + ((i * 31) % 17) as f64 * 0.1;
    (lon, lat, temperature)
}

fn create_dataset(n: usize) -> Dataset {
    let time = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(13, 10, 0)
        .unwrap();
    let records = (0..n)
        .map(|i| {
            let (lon, lat, temperature) = site(i, n);
            EnrichedRecord {
                sensor_id: format!("10.{}.{}.1", i / 256, i % 256),
                time,
                temperature,
                signal: -50.0,
                uptime: Some(1000.0 + i as f64),
                daylight: true,
                link_id: (i / 2) as i64,
                azimuth: 0.0,
                latitude: lat,
                longitude: lon,
                hour: 13,
                day: 183,
                elevation: Some(200.0 + (i % 50) as f64 * 10.0),
            }
        })
        .collect();
    Dataset::new(records, true, true)
}

fn create_predictions(n: usize) -> Vec<PredictedRecord> {
    (0..n)
        .map(|i| {
            let (lon, lat, temperature) = site(i, n);
            PredictedRecord {
                hour: 13,
                sensor_id: format!("s{}", i),
                latitude: lat,
                longitude: lon,
                predicted_temperature: temperature,
            }
        })
        .collect()
}

fn create_elevation() -> ElevationGrid {
    let lons: Vec<f64> = (0..=28).map(|i| 12.0 + i as f64 * 0.25).collect();
    let lats: Vec<f64> = (0..=10).map(|j| 48.5 + j as f64 * 0.25).collect();
    let values = Array2::from_shape_fn((lons.len(), lats.len()), |(i, j)| {
        200.0 + 15.0 * i as f64 + 40.0 * j as f64
    });
    ElevationGrid::new(lons, lats, values).unwrap()
}

fn bench_anomaly_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("anomaly_filter");
    let filter = AnomalyFilter::default();

    for n in [500, 2000] {
        let dataset = create_dataset(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &dataset, |b, dataset| {
            b.iter(|| filter.filter(black_box(dataset.clone())).unwrap())
        });
    }
    group.finish();
}

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation");
    group.sample_size(10);

    let boundary = RegionBoundary::rectangle(12.0, 48.5, 19.0, 51.0).unwrap();
    let elevation = create_elevation();
    let predictions = create_predictions(300);

    for resolution in [50, 100] {
        let interpolator = SpatialInterpolator::default().with_grid_resolution(resolution);
        group.bench_with_input(
            BenchmarkId::from_parameter(resolution),
            &predictions,
            |b, predictions| {
                b.iter(|| {
                    interpolator
                        .interpolate(black_box(predictions), &boundary, &elevation)
                        .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_anomaly_filter, bench_interpolation);
criterion_main!(benches);
