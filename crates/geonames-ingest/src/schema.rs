//! Record shapes
//!
//! One static [`RecordShape`] per dataset lists the columns a source line is
//! mapped into: target column name, position in the tab-split line, and the
//! value type. The parser and the stores both read from these tables, so a
//! shape is the single place a dataset's layout is written down.

/// Value type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Float,
    /// `1`/`0` or `true`/`false`
    Boolean,
    /// `YYYY-MM-DD`
    Date,
}

/// One target column and where it comes from in a source line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub position: usize,
    pub kind: ColumnType,
}

impl Column {
    pub const fn text(name: &'static str, position: usize) -> Self {
        Self { name, position, kind: ColumnType::Text }
    }

    pub const fn integer(name: &'static str, position: usize) -> Self {
        Self { name, position, kind: ColumnType::Integer }
    }

    pub const fn float(name: &'static str, position: usize) -> Self {
        Self { name, position, kind: ColumnType::Float }
    }

    pub const fn boolean(name: &'static str, position: usize) -> Self {
        Self { name, position, kind: ColumnType::Boolean }
    }

    pub const fn date(name: &'static str, position: usize) -> Self {
        Self { name, position, kind: ColumnType::Date }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct RecordShape {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// The first data line is a column-title row
    pub has_header: bool,
}

impl RecordShape {
    /// Fields a line must split into, i.e. one past the highest mapped position
    pub fn required_fields(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.position + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Index of a column within a record's values
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

// ============================================================================
// Shapes
// ============================================================================

pub static CONTINENT: RecordShape = RecordShape {
    name: "Continent",
    columns: &[
        Column::text("code", 0),
        Column::text("name", 1),
        Column::integer("name_id", 2),
    ],
    has_header: false,
};

pub static COUNTRY: RecordShape = RecordShape {
    name: "Country",
    columns: &[
        Column::text("iso_alpha2", 0),
        Column::text("iso_alpha3", 1),
        Column::integer("iso_numeric", 2),
        Column::text("fips_code", 3),
        Column::text("name", 4),
        Column::text("capital", 5),
        Column::float("area", 6),
        Column::integer("population", 7),
        Column::text("continent", 8),
        Column::text("tld", 9),
        Column::text("currency", 10),
        Column::text("currency_name", 11),
        Column::text("phone", 12),
        Column::text("postal_code_format", 13),
        Column::text("postal_code_regex", 14),
        Column::integer("name_id", 15),
        Column::text("languages", 16),
        Column::text("neighbours", 17),
        Column::text("equivalent_fips_code", 18),
    ],
    has_header: false,
};

pub static LANGUAGE_CODE: RecordShape = RecordShape {
    name: "LanguageCode",
    columns: &[
        Column::text("iso_639_3", 0),
        Column::text("iso_639_2", 1),
        Column::text("iso_639_1", 2),
        Column::text("language_name", 3),
    ],
    has_header: true,
};

pub static ADMIN_DIVISION: RecordShape = RecordShape {
    name: "AdminDivision",
    columns: &[
        Column::text("code", 0),
        Column::text("name", 1),
        Column::text("name_ascii", 2),
        Column::integer("name_id", 3),
    ],
    has_header: false,
};

pub static HIERARCHY: RecordShape = RecordShape {
    name: "Hierarchy",
    columns: &[
        Column::integer("parent_id", 0),
        Column::integer("child_id", 1),
        Column::text("type", 2),
    ],
    has_header: false,
};

pub static FEATURE: RecordShape = RecordShape {
    name: "Feature",
    columns: &[
        Column::text("code", 0),
        Column::text("name", 1),
        Column::text("description", 2),
    ],
    has_header: false,
};

pub static TIMEZONE: RecordShape = RecordShape {
    name: "Timezone",
    columns: &[
        Column::text("id", 0),
        Column::float("gmt_offset", 1),
        Column::float("dst_offset", 2),
    ],
    has_header: true,
};

pub static NAME: RecordShape = RecordShape {
    name: "Name",
    columns: &[
        Column::integer("id", 0),
        Column::text("name", 1),
        Column::text("ascii_name", 2),
        Column::text("alternate_names", 3),
        Column::float("latitude", 4),
        Column::float("longitude", 5),
        Column::text("f_class", 6),
        Column::text("f_code", 7),
        Column::text("country_id", 8),
        Column::text("cc2", 9),
        Column::text("admin1", 10),
        Column::text("admin2", 11),
        Column::text("admin3", 12),
        Column::text("admin4", 13),
        Column::integer("population", 14),
        Column::integer("elevation", 15),
        Column::integer("gtopo30", 16),
        Column::text("timezone_id", 17),
        Column::date("modification_at", 18),
    ],
    has_header: false,
};

// Position 0 of the alternate names dump is skipped.
pub static ALTERNATE_NAME: RecordShape = RecordShape {
    name: "AlternateName",
    columns: &[
        Column::integer("id", 1),
        Column::integer("name_id", 2),
        Column::text("iso_language", 3),
        Column::text("alternate_name", 4),
        Column::boolean("is_preferred", 5),
        Column::boolean("is_short", 6),
        Column::boolean("is_colloquial", 7),
        Column::boolean("is_historic", 8),
    ],
    has_header: false,
};

/// Every shape, for start-up checks
pub static ALL_SHAPES: &[&RecordShape] = &[
    &CONTINENT,
    &COUNTRY,
    &LANGUAGE_CODE,
    &ADMIN_DIVISION,
    &HIERARCHY,
    &FEATURE,
    &TIMEZONE,
    &NAME,
    &ALTERNATE_NAME,
];
