//! Error types for IFC metrics extraction.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when opening an IFC model. Always fatal for a walk.
#[derive(Debug, Error)]
pub enum ModelOpenError {
    /// Failed to read the IFC file from disk.
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The STEP format is invalid or malformed.
    #[error("invalid STEP format: {message}")]
    InvalidStep { message: String },
}

/// Errors raised while loading a material or price catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog file from disk.
    #[error("failed to read catalog '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The delimited text could not be read.
    #[error("catalog is not valid delimited text: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// A row has fewer columns than the catalog layout requires.
    #[error("catalog row '{key}' has {found} columns, expected at least {expected}")]
    ShortRow {
        key: String,
        expected: usize,
        found: usize,
    },

    /// A numeric column holds something that is not a number.
    #[error("catalog row '{key}': column '{column}' is not a number: '{value}'")]
    InvalidNumber {
        key: String,
        column: &'static str,
        value: String,
    },

    /// The measurement basis of a price row is not one of area/mass/length/volume.
    #[error("catalog row '{key}': unknown measurement basis '{value}'")]
    InvalidBasis { key: String, value: String },

    /// A user catalog header does not name enough columns.
    #[error("user catalog header has {found} columns, expected at least {expected}")]
    ShortHeader { expected: usize, found: usize },

    /// A user catalog file is not a valid header + data table.
    #[error("user catalog '{path}' is not a valid table: {source}")]
    UserTable {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A user catalog row lacks a column named in the header.
    #[error("user catalog row '{key}' has no value for column '{column}'")]
    MissingColumn { key: String, column: String },
}

/// Per-element geometry failure. Recoverable: the element is skipped.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// The element has no product representation.
    #[error("element #{id} has no representation")]
    NoRepresentation { id: u64 },

    /// A referenced entity does not exist in the file.
    #[error("entity #{id} references missing entity #{target}")]
    DanglingReference { id: u64, target: u64 },

    /// A required attribute is absent or of the wrong kind.
    #[error("{entity_type} #{id} has no usable attribute '{attribute}'")]
    MissingAttribute {
        id: u64,
        entity_type: String,
        attribute: &'static str,
    },

    /// The representation item kind is not handled by the engine.
    #[error("unsupported geometry {entity_type} #{id}")]
    Unsupported { id: u64, entity_type: String },

    /// The geometry exists but has no measurable extent.
    #[error("degenerate geometry in #{id}: {reason}")]
    Degenerate { id: u64, reason: String },
}

/// Per-element material failure. Recoverable: only the material contribution
/// of that element is dropped.
#[derive(Debug, Error)]
pub enum MaterialResolutionError {
    /// A material association points at an entity that does not exist.
    #[error("material reference #{target} from #{id} does not exist")]
    DanglingReference { id: u64, target: u64 },
}

/// A derived ratio whose denominator is zero.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("ratio {numerator}/{denominator} is undefined: denominator is zero")]
pub struct DivisionUndefined {
    pub numerator: &'static str,
    pub denominator: &'static str,
}

/// An accumulator was used outside of its accumulating phase.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("spatial accumulator is {state}, expected accumulating")]
pub struct AccumulatorStateError {
    pub state: &'static str,
}

/// Errors that abort a walk. No partial result is returned.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    ModelOpen(#[from] ModelOpenError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The walk was cancelled by its caller.
    #[error("walk cancelled after {processed} of {total} elements")]
    Cancelled { processed: usize, total: usize },

    /// The configured time limit elapsed.
    #[error("walk timed out after {elapsed:?}")]
    TimedOut { elapsed: Duration },

    /// The worker pool could not be built.
    #[error("failed to build worker pool: {source}")]
    ThreadPool {
        #[from]
        source: rayon::ThreadPoolBuildError,
    },

    #[error(transparent)]
    State(#[from] AccumulatorStateError),
}

/// Errors that can occur when exporting results.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    FileCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write data to the file.
    #[error("failed to write data: {message}")]
    WriteError { message: String },

    /// Failed to serialize data to JSON.
    #[error("JSON serialization failed: {source}")]
    JsonSerialize {
        #[from]
        source: serde_json::Error,
    },

    /// Failed to write CSV data.
    #[error("CSV write failed: {source}")]
    CsvWrite {
        #[from]
        source: csv::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_messages_name_the_row() {
        let e = CatalogError::InvalidNumber {
            key: "Stahlbeton".into(),
            column: "density",
            value: "heavy".into(),
        };
        assert_eq!(
            e.to_string(),
            "catalog row 'Stahlbeton': column 'density' is not a number: 'heavy'"
        );
    }

    #[test]
    fn walk_error_wraps_fatal_errors() {
        let e: WalkError = ModelOpenError::InvalidStep {
            message: "no DATA section".into(),
        }
        .into();
        assert!(matches!(e, WalkError::ModelOpen(_)));
        assert_eq!(e.to_string(), "invalid STEP format: no DATA section");
    }

    #[test]
    fn division_undefined_display() {
        let e = DivisionUndefined {
            numerator: "BGF",
            denominator: "BF",
        };
        assert_eq!(
            e.to_string(),
            "ratio BGF/BF is undefined: denominator is zero"
        );
    }
}
