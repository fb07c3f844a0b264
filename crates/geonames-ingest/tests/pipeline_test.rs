//! End-to-end pipeline tests: mock dump server, recording or in-process
//! workers, in-memory tables

mod common;

use common::{mount_alternate_names, mount_dump, test_config, RecordingWorker};
use geonames_ingest::dataset::DatasetLoader;
use geonames_ingest::error::IngestError;
use geonames_ingest::models::FileState;
use geonames_ingest::pipeline::{PipelineOrchestrator, RunOptions, Stage};
use geonames_ingest::seeder::Seeder;
use geonames_ingest::storage::MemoryStore;
use geonames_ingest::worker::InProcessLoadWorker;
use tempfile::TempDir;
use wiremock::MockServer;

fn options(names: &[&str]) -> RunOptions {
    RunOptions {
        names: names.iter().map(|n| n.to_string()).collect(),
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_countries_load_before_dependent_datasets() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let worker = RecordingWorker::default();

    let orchestrator =
        PipelineOrchestrator::new(test_config(&server, dir.path()), worker.clone()).unwrap();
    let report = orchestrator.run(&options(&["AD"])).await.unwrap();

    let loaders = worker.loaders();
    let position = |loader| loaders.iter().position(|l| *l == loader).unwrap();
    let countries = position(DatasetLoader::Countries);

    assert!(countries < position(DatasetLoader::AdminDivisions));
    assert!(countries < position(DatasetLoader::Hierarchies));
    assert!(countries < position(DatasetLoader::Names));
    assert_eq!(loaders.first(), Some(&DatasetLoader::Continents));
    assert_eq!(loaders.last(), Some(&DatasetLoader::Names));
    assert_eq!(report.stages.last(), Some(&Stage::Done));

    let names = worker.requests().pop().unwrap();
    assert_eq!(names.file.as_deref(), Some("AD"));
    assert_eq!(names.path, dir.path());
}

#[tokio::test]
async fn test_fetch_only_performs_no_loads() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let worker = RecordingWorker::default();

    let orchestrator =
        PipelineOrchestrator::new(test_config(&server, dir.path()), worker.clone()).unwrap();
    let report = orchestrator
        .run(&RunOptions {
            fetch_only: true,
            ..options(&["AD"])
        })
        .await
        .unwrap();

    assert!(worker.loaders().is_empty());
    assert_eq!(report.stages, vec![Stage::Resolve, Stage::Fetch]);
    assert_eq!(report.transferred(), 8);

    // Archives are extracted and removed
    assert!(dir.path().join("AD.txt").exists());
    assert!(dir.path().join("hierarchy.txt").exists());
    assert!(!dir.path().join("AD.zip").exists());
    assert!(report
        .files
        .iter()
        .any(|f| f.state == FileState::Extracted && f.local_path == dir.path().join("AD.txt")));
}

#[tokio::test]
async fn test_second_run_transfers_nothing() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let config = test_config(&server, dir.path());
    let fetch_only = RunOptions {
        fetch_only: true,
        ..options(&["AD"])
    };

    let orchestrator = PipelineOrchestrator::new(config, RecordingWorker::default()).unwrap();
    orchestrator.run(&fetch_only).await.unwrap();
    let requests_after_first = server.received_requests().await.unwrap().len();

    let report = orchestrator.run(&fetch_only).await.unwrap();

    assert_eq!(requests_after_first, 8);
    assert_eq!(server.received_requests().await.unwrap().len(), 8);
    assert_eq!(report.transferred(), 0);
    assert_eq!(report.skipped(), 8);
}

#[tokio::test]
async fn test_wipe_files_downloads_everything_again() {
    let server = MockServer::start().await;
    mount_dump(&server, 2).await;
    let dir = TempDir::new().unwrap();
    let working_dir = dir.path().join("geonames");
    let orchestrator = PipelineOrchestrator::new(
        test_config(&server, &working_dir),
        RecordingWorker::default(),
    )
    .unwrap();

    orchestrator
        .run(&RunOptions {
            fetch_only: true,
            ..options(&["AD"])
        })
        .await
        .unwrap();
    std::fs::write(working_dir.join("stale.txt"), "left over").unwrap();

    let report = orchestrator
        .run(&RunOptions {
            fetch_only: true,
            wipe_files: true,
            ..options(&["AD"])
        })
        .await
        .unwrap();

    assert_eq!(report.transferred(), 8);
    assert!(!working_dir.join("stale.txt").exists());
}

#[tokio::test]
async fn test_failing_stage_aborts_the_rest() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let worker = RecordingWorker::failing_on(DatasetLoader::Hierarchies);

    let orchestrator =
        PipelineOrchestrator::new(test_config(&server, dir.path()), worker.clone()).unwrap();
    let err = orchestrator.run(&options(&["AD"])).await.unwrap_err();

    match err {
        IngestError::Stage { class, output } => {
            assert_eq!(class, "HierarchiesTableSeeder");
            assert_eq!(output, "worker exploded\n");
        }
        other => panic!("expected stage error, got {other:?}"),
    }

    assert_eq!(worker.loaders().last(), Some(&DatasetLoader::Hierarchies));
    assert!(!worker.loaders().contains(&DatasetLoader::Features));
    assert!(!worker.loaders().contains(&DatasetLoader::Names));
}

#[tokio::test]
async fn test_fetch_failure_stops_before_loading() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let worker = RecordingWorker::default();

    let orchestrator =
        PipelineOrchestrator::new(test_config(&server, dir.path()), worker.clone()).unwrap();
    // ZZ.zip is not served
    let err = orchestrator.run(&options(&["AD", "ZZ"])).await;

    assert!(matches!(err, Err(IngestError::Fetch { .. })));
    assert!(worker.loaders().is_empty());
}

#[tokio::test]
async fn test_in_process_import_loads_every_table() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let worker = InProcessLoadWorker::new(Seeder::new(store.clone()));

    let orchestrator = PipelineOrchestrator::new(test_config(&server, dir.path()), worker).unwrap();
    orchestrator.run(&options(&["AD"])).await.unwrap();

    assert_eq!(store.row_count("geonames_continents"), 7);
    assert_eq!(store.row_count("geonames_countries"), 1);
    assert_eq!(store.row_count("geonames_admin_divisions"), 1);
    assert_eq!(store.row_count("geonames_admin_subdivisions"), 1);
    assert_eq!(store.row_count("geonames_hierarchies"), 1);
    assert_eq!(store.row_count("geonames_features"), 1);
    assert_eq!(store.row_count("geonames_timezones"), 1);
    assert_eq!(store.row_count("geonames_language_codes"), 1);
    assert_eq!(store.row_count("geonames_names"), 1);

    let timezone = &store.rows("geonames_timezones")[0];
    assert_eq!(timezone.get("dst_offset").unwrap().as_f64(), Some(1.0));

    let andorra = &store.rows("geonames_names")[0];
    assert_eq!(andorra.text("country_id"), Some("AD"));
    assert_eq!(store.rows("geonames_language_codes")[0].text("language_name"), Some("Catalan"));
}

#[tokio::test]
async fn test_in_process_import_with_alternate_names() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    mount_alternate_names(&server).await;
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let worker = InProcessLoadWorker::new(Seeder::new(store.clone()));

    let orchestrator = PipelineOrchestrator::new(test_config(&server, dir.path()), worker).unwrap();
    let report = orchestrator
        .run(&RunOptions {
            alternate_names: true,
            ..options(&["AD"])
        })
        .await
        .unwrap();

    assert_eq!(report.stages.last(), Some(&Stage::Done));
    assert_eq!(store.row_count("geonames_timezones"), 1);
    assert_eq!(store.row_count("geonames_alternate_names"), 2);
    assert_eq!(store.row_count("geonames_names"), 1);

    let alternate = &store.rows("geonames_alternate_names")[0];
    assert_eq!(alternate.integer("id"), Some(3041565));
    assert!(alternate.get("name_id").unwrap().is_null());
}

#[tokio::test]
async fn test_repeated_import_trips_the_guard() {
    let server = MockServer::start().await;
    mount_dump(&server, 1).await;
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let worker = InProcessLoadWorker::new(Seeder::new(store.clone()));

    let orchestrator = PipelineOrchestrator::new(test_config(&server, dir.path()), worker).unwrap();
    orchestrator.run(&options(&["AD"])).await.unwrap();

    let err = orchestrator.run(&options(&["AD"])).await.unwrap_err();

    assert_eq!(err.to_string(), "The table [geonames_continents] is not empty.");
    assert_eq!(store.row_count("geonames_continents"), 7);
    assert_eq!(store.row_count("geonames_names"), 1);
}
