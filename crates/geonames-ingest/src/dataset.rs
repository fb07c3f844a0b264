//! Dataset loaders
//!
//! A [`DatasetLoader`] names one load stage: the seeder class the `seed`
//! command accepts, the table it fills, the shape of its records and the file
//! it reads from the working directory.

use crate::error::IngestError;
use crate::models::{FieldValue, Record};
use crate::schema::{self, RecordShape};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetLoader {
    Continents,
    Countries,
    AdminDivisions,
    AdminSubdivisions,
    Hierarchies,
    Features,
    Timezones,
    LanguageCodes,
    AlternateNames,
    Names,
}

/// Load order of the datasets that every import runs, before the names files
pub const BASE_LOAD_ORDER: &[DatasetLoader] = &[
    DatasetLoader::Continents,
    DatasetLoader::Countries,
    DatasetLoader::AdminDivisions,
    DatasetLoader::AdminSubdivisions,
    DatasetLoader::Hierarchies,
    DatasetLoader::Features,
    DatasetLoader::Timezones,
    DatasetLoader::LanguageCodes,
];

pub const ALL_LOADERS: &[DatasetLoader] = &[
    DatasetLoader::Continents,
    DatasetLoader::Countries,
    DatasetLoader::AdminDivisions,
    DatasetLoader::AdminSubdivisions,
    DatasetLoader::Hierarchies,
    DatasetLoader::Features,
    DatasetLoader::Timezones,
    DatasetLoader::LanguageCodes,
    DatasetLoader::AlternateNames,
    DatasetLoader::Names,
];

/// (code, name, geonames id)
const CONTINENTS: &[(&str, &str, i64)] = &[
    ("AF", "Africa", 6255146),
    ("AS", "Asia", 6255147),
    ("EU", "Europe", 6255148),
    ("NA", "North America", 6255149),
    ("OC", "Oceania", 6255151),
    ("SA", "South America", 6255150),
    ("AN", "Antarctica", 6255152),
];

impl DatasetLoader {
    pub fn class_name(self) -> &'static str {
        match self {
            DatasetLoader::Continents => "ContinentsTableSeeder",
            DatasetLoader::Countries => "CountriesTableSeeder",
            DatasetLoader::AdminDivisions => "AdminDivisionsTableSeeder",
            DatasetLoader::AdminSubdivisions => "AdminSubdivisionsTableSeeder",
            DatasetLoader::Hierarchies => "HierarchiesTableSeeder",
            DatasetLoader::Features => "FeaturesTableSeeder",
            DatasetLoader::Timezones => "TimezonesTableSeeder",
            DatasetLoader::LanguageCodes => "LanguageCodesTableSeeder",
            DatasetLoader::AlternateNames => "AlternateNamesTableSeeder",
            DatasetLoader::Names => "NamesTableSeeder",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            DatasetLoader::Continents => "geonames_continents",
            DatasetLoader::Countries => "geonames_countries",
            DatasetLoader::AdminDivisions => "geonames_admin_divisions",
            DatasetLoader::AdminSubdivisions => "geonames_admin_subdivisions",
            DatasetLoader::Hierarchies => "geonames_hierarchies",
            DatasetLoader::Features => "geonames_features",
            DatasetLoader::Timezones => "geonames_timezones",
            DatasetLoader::LanguageCodes => "geonames_language_codes",
            DatasetLoader::AlternateNames => "geonames_alternate_names",
            DatasetLoader::Names => "geonames_names",
        }
    }

    pub fn shape(self) -> &'static RecordShape {
        match self {
            DatasetLoader::Continents => &schema::CONTINENT,
            DatasetLoader::Countries => &schema::COUNTRY,
            DatasetLoader::AdminDivisions | DatasetLoader::AdminSubdivisions => {
                &schema::ADMIN_DIVISION
            }
            DatasetLoader::Hierarchies => &schema::HIERARCHY,
            DatasetLoader::Features => &schema::FEATURE,
            DatasetLoader::Timezones => &schema::TIMEZONE,
            DatasetLoader::LanguageCodes => &schema::LANGUAGE_CODE,
            DatasetLoader::AlternateNames => &schema::ALTERNATE_NAME,
            DatasetLoader::Names => &schema::NAME,
        }
    }

    /// Plain-text file this loader reads, when it is not picked per run
    ///
    /// `None` for continents (built in) and names (chosen with `--file`).
    pub fn default_file(self) -> Option<&'static str> {
        match self {
            DatasetLoader::Continents | DatasetLoader::Names => None,
            DatasetLoader::Countries => Some("countryInfo.txt"),
            DatasetLoader::AdminDivisions => Some("admin1CodesASCII.txt"),
            DatasetLoader::AdminSubdivisions => Some("admin2Codes.txt"),
            DatasetLoader::Hierarchies => Some("hierarchy.txt"),
            DatasetLoader::Features => Some("featureCodes_en.txt"),
            DatasetLoader::Timezones => Some("timeZones.txt"),
            DatasetLoader::LanguageCodes => Some("iso-languagecodes.txt"),
            DatasetLoader::AlternateNames => Some("alternateNames.txt"),
        }
    }

    pub fn takes_file(self) -> bool {
        matches!(self, DatasetLoader::Names)
    }

    /// Local source file for this loader inside `dir`
    ///
    /// Names read `<file><plain_suffix>`; a `file` that already carries the
    /// suffix is used as is. Returns `Ok(None)` for the built-in continents.
    pub fn source_path(
        self,
        dir: &Path,
        file: Option<&str>,
        plain_suffix: &str,
    ) -> Result<Option<PathBuf>, IngestError> {
        if self.takes_file() {
            let file = file.ok_or_else(|| {
                IngestError::config(format!("{} requires --file", self.class_name()))
            })?;
            let file_name = if file.ends_with(plain_suffix) {
                file.to_string()
            } else {
                format!("{file}{plain_suffix}")
            };
            return Ok(Some(dir.join(file_name)));
        }

        Ok(self.default_file().map(|f| dir.join(f)))
    }

    /// Records of a dataset that ships with the binary instead of a file
    pub fn builtin_records(self) -> Option<Vec<Record>> {
        match self {
            DatasetLoader::Continents => Some(
                CONTINENTS
                    .iter()
                    .map(|(code, name, id)| {
                        Record::new(
                            &schema::CONTINENT,
                            vec![
                                FieldValue::Text(Some(code.to_string())),
                                FieldValue::Text(Some(name.to_string())),
                                FieldValue::Integer(Some(*id)),
                            ],
                        )
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class_name())
    }
}

impl FromStr for DatasetLoader {
    type Err = IngestError;

    /// Accepts `CountriesTableSeeder`, `countries`, or a namespaced
    /// `Vendor\Seeders\CountriesTableSeeder`, in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.rsplit('\\').next().unwrap_or(s).trim();
        let lower = name.to_ascii_lowercase();
        let bare = lower.strip_suffix("tableseeder").unwrap_or(&lower);

        ALL_LOADERS
            .iter()
            .copied()
            .find(|loader| {
                let class = loader.class_name().to_ascii_lowercase();
                class == lower || class.strip_suffix("tableseeder") == Some(bare)
            })
            .ok_or_else(|| IngestError::config(format!("Unknown dataset loader: {s}")))
    }
}
