//! Shared fixtures for the geonames-ingest integration tests
//!
//! - a miniature geonames dump served by `wiremock`
//! - zip archive builders
//! - a [`LoadWorker`] that records the stages it was asked to run

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use geonames_ingest::error::{IngestError, Result};
use geonames_ingest::worker::{LoadWorker, SeedRequest};
use geonames_ingest::{DatasetLoader, IngestConfig};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const ANDORRA_LINE: &str = "3041565\tAndorra la Vella\tAndorra la Vella\t\t42.5\t1.51667\tP\tPPLC\tAD\t\t07\t\t\t\t20430\t\t1385\tEurope/Andorra\t2008-10-15\n";

pub const COUNTRY_INFO: &str = "\
# GeoNames country info
#ISO\tISO3\tISO-Numeric\tfips\tCountry
AD\tAND\t020\tAN\tAndorra\tAndorra la Vella\t468\t77006\tEU\t.ad\tEUR\tEuro\t376\tAD###\t^(?:AD)*(\\d{3})$\t3041565\tca\tES,FR\t
";

pub const ADMIN1_CODES: &str = "AD.07\tAndorra la Vella\tAndorra la Vella\t3041566\n";

pub const ADMIN2_CODES: &str = "AF.01.1125426\tKhanabad\tKhanabad\t1125426\n";

pub const HIERARCHY: &str = "6255148\t3041565\tADM\n";

pub const FEATURE_CODES: &str =
    "A.ADM1\tfirst-order administrative division\ta primary administrative division of a country\n";

pub const TIME_ZONES: &str = "\
CountryCode\tTimeZoneId\tGMT offset 1. Jan 2024\tDST offset 1. Jul 2024\trawOffset (independant of DST)
AD\tEurope/Andorra\t1.0\t2.0\t1.0
";

pub const LANGUAGE_CODES: &str = "ISO 639-3\tISO 639-2\tISO 639-1\tLanguage Name\ncat\tcat\tca\tCatalan\n";

pub const ALTERNATE_NAMES: &str = "\
1284820\t3041565\ten\tAndorra la Vella\t1\t\t\t\t\t
1284821\t3041565\tca\tAndorra la Vella\t\t\t\t\t\t
";

/// A zip archive holding one member
pub fn zip_bytes(member: &str, content: &str) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = zip::ZipWriter::new(&mut cursor);
        writer
            .start_file(member, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    cursor.into_inner()
}

pub fn write_zip(path: &Path, member: &str, content: &str) {
    std::fs::write(path, zip_bytes(member, content)).unwrap();
}

/// Files of the miniature dump, as (name, body)
pub fn dump_files() -> Vec<(&'static str, Vec<u8>)> {
    vec![
        ("countryInfo.txt", COUNTRY_INFO.as_bytes().to_vec()),
        ("admin1CodesASCII.txt", ADMIN1_CODES.as_bytes().to_vec()),
        ("admin2Codes.txt", ADMIN2_CODES.as_bytes().to_vec()),
        ("hierarchy.zip", zip_bytes("hierarchy.txt", HIERARCHY)),
        ("featureCodes_en.txt", FEATURE_CODES.as_bytes().to_vec()),
        ("timeZones.txt", TIME_ZONES.as_bytes().to_vec()),
        ("iso-languagecodes.txt", LANGUAGE_CODES.as_bytes().to_vec()),
        ("AD.zip", zip_bytes("AD.txt", ANDORRA_LINE)),
    ]
}

/// Serve the dump under `/dump/`, expecting each file to be requested
/// exactly `times` times
pub async fn mount_dump(server: &MockServer, times: u64) {
    for (name, body) in dump_files() {
        Mock::given(method("GET"))
            .and(path(format!("/dump/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .expect(times)
            .mount(server)
            .await;
    }
}

/// Serve `alternateNames.zip` next to the rest of the dump
pub async fn mount_alternate_names(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/dump/alternateNames.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(zip_bytes("alternateNames.txt", ALTERNATE_NAMES)),
        )
        .expect(1)
        .mount(server)
        .await;
}

pub fn test_config(server: &MockServer, working_dir: &Path) -> IngestConfig {
    IngestConfig::default()
        .with_base_url(format!("{}/dump", server.uri()))
        .with_working_dir(working_dir)
        .with_progress(false)
}

/// Records every stage it runs; optionally fails on one dataset
#[derive(Clone, Default)]
pub struct RecordingWorker {
    pub runs: Arc<Mutex<Vec<SeedRequest>>>,
    pub fail_on: Option<DatasetLoader>,
}

impl RecordingWorker {
    pub fn failing_on(loader: DatasetLoader) -> Self {
        Self {
            fail_on: Some(loader),
            ..Self::default()
        }
    }

    pub fn loaders(&self) -> Vec<DatasetLoader> {
        self.runs.lock().unwrap().iter().map(|r| r.loader).collect()
    }

    pub fn requests(&self) -> Vec<SeedRequest> {
        self.runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl LoadWorker for RecordingWorker {
    async fn run(&self, request: &SeedRequest) -> Result<()> {
        self.runs.lock().unwrap().push(request.clone());

        if self.fail_on == Some(request.loader) {
            return Err(IngestError::Stage {
                class: request.loader.class_name().to_string(),
                output: "worker exploded\n".to_string(),
            });
        }

        Ok(())
    }
}
