//! Data structures shared by the pipeline stages

use crate::schema::{ColumnType, RecordShape};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;

// ============================================================================
// Working files
// ============================================================================

/// Lifecycle of a file in the working directory
///
/// States only move forward: `Pending -> Downloaded -> Extracted`, or straight
/// to `SkippedExisting` when the cache already holds the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileState {
    Pending,
    Downloaded,
    Extracted,
    SkippedExisting,
}

impl FileState {
    pub fn can_transition_to(self, next: FileState) -> bool {
        matches!(
            (self, next),
            (FileState::Pending, FileState::Downloaded)
                | (FileState::Pending, FileState::SkippedExisting)
                | (FileState::Downloaded, FileState::Extracted)
        )
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileState::Pending => "pending",
            FileState::Downloaded => "downloaded",
            FileState::Extracted => "extracted",
            FileState::SkippedExisting => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingFile {
    pub local_path: PathBuf,
    pub remote_url: String,
    pub state: FileState,
}

impl WorkingFile {
    pub fn pending(local_path: impl Into<PathBuf>, remote_url: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            remote_url: remote_url.into(),
            state: FileState::Pending,
        }
    }

    /// Move to `next`, ignoring backwards or sideways transitions
    pub fn advance(&mut self, next: FileState) -> bool {
        if self.state.can_transition_to(next) {
            self.state = next;
            true
        } else {
            false
        }
    }

    pub fn was_transferred(&self) -> bool {
        matches!(self.state, FileState::Downloaded | FileState::Extracted)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A typed field value; `None` stands for an empty source field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(Option<i64>),
    Float(Option<f64>),
    Boolean(Option<bool>),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    /// Convert a raw field to `kind`
    ///
    /// Empty fields and values that do not fit `kind` become NULL. Only the
    /// field count of a line decides whether it is malformed.
    pub fn parse(raw: &str, kind: ColumnType) -> Self {
        Self::convert(raw, kind).unwrap_or_else(|| Self::null(kind))
    }

    fn convert(raw: &str, kind: ColumnType) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let value = match kind {
            ColumnType::Text => FieldValue::Text(Some(raw.to_string())),
            ColumnType::Integer => FieldValue::Integer(Some(raw.trim().parse().ok()?)),
            ColumnType::Float => FieldValue::Float(Some(raw.trim().parse().ok()?)),
            ColumnType::Boolean => FieldValue::Boolean(Some(match raw.trim() {
                "1" | "true" => true,
                "0" | "false" => false,
                _ => return None,
            })),
            ColumnType::Date => FieldValue::Date(Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()?,
            )),
        };

        Some(value)
    }

    pub fn null(kind: ColumnType) -> Self {
        match kind {
            ColumnType::Text => FieldValue::Text(None),
            ColumnType::Integer => FieldValue::Integer(None),
            ColumnType::Float => FieldValue::Float(None),
            ColumnType::Boolean => FieldValue::Boolean(None),
            ColumnType::Date => FieldValue::Date(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            FieldValue::Text(v) => v.is_none(),
            FieldValue::Integer(v) => v.is_none(),
            FieldValue::Float(v) => v.is_none(),
            FieldValue::Boolean(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(v) => v.as_deref(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => *v,
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => *v,
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(v) => *v,
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(v) => *v,
            _ => None,
        }
    }
}

/// One parsed line, with values in the order of its shape's columns
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub shape: &'static RecordShape,
    pub values: Vec<FieldValue>,
}

impl Record {
    pub fn new(shape: &'static RecordShape, values: Vec<FieldValue>) -> Self {
        Self { shape, values }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.shape.index_of(field).and_then(|i| self.values.get(i))
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_str)
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_i64)
    }
}
