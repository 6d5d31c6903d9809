//! Tests for one round end to end

use super::*;
use crate::app::adapters::{ParquetGridExporter, PngGridRenderer};
use crate::app::services::round::{RoundOutcome, Stage};
use chrono::NaiveDate;
use tempfile::TempDir;

#[test]
fn test_round_completes_and_writes_every_artifact() {
    let dir = TempDir::new().unwrap();
    let store = RecordingStore::default();
    let mut services = create_test_services(Box::new(EchoModel));
    services.results = Some(Box::new(store.clone()));
    services.renderer = Some(Box::new(PngGridRenderer::new(dir.path().join("images"))));
    services.exporter = Some(Box::new(ParquetGridExporter::new(dir.path().join("grids"))));

    let outcome = create_test_orchestrator(services).run(&create_test_context());

    let RoundOutcome::Completed(report) = outcome else {
        panic!("expected a completed round, got {:?}", outcome);
    };
    assert_eq!(report.summary.link_ids, vec![1, 2, 3]);
    assert_eq!(report.summary.image_name, "2024-07-01_1400.png");
    assert_eq!(report.enrichment.enriched, 10);
    assert_eq!(report.anomaly.total_output, 10);
    assert_eq!(report.sites, 5);
    assert!(report.grid_cells > 0);
    assert!(report.persisted);
    assert!(report.image.as_ref().unwrap().exists());
    assert!(report.export.as_ref().unwrap().ends_with("2024-07-01_1400.parquet"));

    let grids = store.grids.lock().unwrap();
    assert_eq!(grids.len(), 1);
    let expected_hour = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(14, 0, 0)
        .unwrap();
    assert_eq!(grids[0].time, expected_hour);
    assert_eq!(grids[0].links, vec![1, 2, 3]);
    assert!(grids[0].temp_min <= grids[0].temp_max);

    let parameters = store.parameters.lock().unwrap();
    assert_eq!(parameters.len(), 1);
    let expected_start = NaiveDate::from_ymd_opt(2024, 7, 1)
        .unwrap()
        .and_hms_opt(14, 5, 0)
        .unwrap();
    assert_eq!(parameters[0].started, expected_start);
    assert_eq!((parameters[0].x_count, parameters[0].y_count), (20, 20));
}

#[test]
fn test_empty_acquisition_is_no_data() {
    let mut services = create_test_services(Box::new(EchoModel));
    services.source = Box::new(FixedSource(Vec::new()));

    let outcome = create_test_orchestrator(services).run(&create_test_context());
    assert!(matches!(
        outcome,
        RoundOutcome::NoData {
            stage: Stage::Acquisition
        }
    ));
}

#[test]
fn test_unknown_sensors_end_round_without_failure() {
    let mut services = create_test_services(Box::new(EchoModel));
    services.metadata = Box::new(MapMetadata(HashMap::new()));

    let outcome = create_test_orchestrator(services).run(&create_test_context());
    assert!(matches!(
        outcome,
        RoundOutcome::NoData {
            stage: Stage::Enrichment
        }
    ));
}

#[test]
fn test_metadata_failure_degrades_to_missing_geolocation() {
    let mut services = create_test_services(Box::new(EchoModel));
    services.metadata = Box::new(FailingMetadata);

    let outcome = create_test_orchestrator(services).run(&create_test_context());
    assert!(matches!(
        outcome,
        RoundOutcome::NoData {
            stage: Stage::Enrichment
        }
    ));
}

#[test]
fn test_stage_failure_is_contained() {
    let store = RecordingStore::default();
    let mut services = create_test_services(Box::new(NanModel));
    services.results = Some(Box::new(store.clone()));

    let outcome = create_test_orchestrator(services).run(&create_test_context());

    match outcome {
        RoundOutcome::Failed { stage, message } => {
            assert_eq!(stage, Stage::Inference);
            assert!(message.contains("Inference"));
        }
        other => panic!("expected a failed round, got {:?}", other),
    }
    assert!(store.grids.lock().unwrap().is_empty());
}

#[test]
fn test_panic_is_contained() {
    let services = create_test_services(Box::new(PanickingModel));

    let outcome = create_test_orchestrator(services).run(&create_test_context());
    match outcome {
        RoundOutcome::Panicked { message } => assert_eq!(message, "model weights corrupted"),
        other => panic!("expected a panicked round, got {:?}", other),
    }
}

#[test]
fn test_side_effects_are_independent() {
    let dir = TempDir::new().unwrap();
    let store = RecordingStore {
        fail_grids: true,
        ..Default::default()
    };
    let mut services = create_test_services(Box::new(EchoModel));
    services.results = Some(Box::new(store.clone()));
    services.renderer = Some(Box::new(PngGridRenderer::new(dir.path())));

    let outcome = create_test_orchestrator(services).run(&create_test_context());

    let RoundOutcome::Completed(report) = outcome else {
        panic!("expected a completed round, got {:?}", outcome);
    };
    assert!(!report.persisted);
    assert!(report.image.is_some());
    assert!(report.export.is_none());
    assert!(store.grids.lock().unwrap().is_empty());
    assert_eq!(store.parameters.lock().unwrap().len(), 1);
}

#[test]
fn test_unknown_selector_rejected_at_construction() {
    let config = create_test_config().with_regression_model("magic");
    let result = RoundOrchestrator::new(
        &config,
        create_test_services(Box::new(EchoModel)),
        create_test_elevation(),
        create_test_boundary(),
    );
    assert!(matches!(result, Err(Error::Configuration { .. })));
}
