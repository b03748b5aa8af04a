//! Dataset access for bellwether search
//!
//! This module handles:
//! - The project / community registry ([`Project`], [`Community`])
//! - Loading release files as labelled tables ([`TableSource`])
//! - Discovering communities on disk ([`DirectoryProvider`])
//! - Drawing fractional random samples of a project ([`DataSampler`])

mod csv_source;
mod provider;
mod sampler;
mod table;

pub use csv_source::{parse_csv, CsvTableSource, MemoryTableSource, TableSource};
pub use provider::{
    Community, DatasetProvider, DirectoryProvider, KnownCommunity, Project, KNOWN_COMMUNITIES,
};
pub use sampler::{DataSampler, Sample};
pub use table::{Column, Table, TableError};

use std::path::PathBuf;
use thiserror::Error;

/// A referenced dataset cannot be read, parsed or resolved.
///
/// Every variant names the failing file or project so the search can
/// surface it to the user before aborting.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as CSV: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no label column")]
    NoLabelColumn { path: PathBuf },

    #[error("malformed table in {path}: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: TableError,
    },

    #[error("dataset file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("project '{project}' has no dataset files")]
    NoFiles { project: String },

    #[error("unknown community '{name}'. Known communities: {known}")]
    UnknownCommunity { name: String, known: String },
}

pub type DataResult<T> = Result<T, DataError>;

/// Map a raw label cell to a numeric label.
///
/// Numbers are kept as-is (bug counts stay bug counts, positivity is `> 0`).
/// Textual markers used by defect datasets map to 1.0, anything else to 0.0.
pub fn parse_label(cell: &str) -> f64 {
    let cell = cell.trim();
    if let Ok(v) = cell.parse::<f64>() {
        return if v.is_finite() { v } else { 0.0 };
    }
    match cell.to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "buggy" | "defective" => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_label_numeric() {
        assert_eq!(parse_label("0"), 0.0);
        assert_eq!(parse_label("3"), 3.0);
        assert_eq!(parse_label(" 1.0 "), 1.0);
        assert_eq!(parse_label("NaN"), 0.0);
    }

    #[test]
    fn test_parse_label_markers() {
        assert_eq!(parse_label("T"), 1.0);
        assert_eq!(parse_label("true"), 1.0);
        assert_eq!(parse_label("Yes"), 1.0);
        assert_eq!(parse_label("buggy"), 1.0);
        assert_eq!(parse_label("F"), 0.0);
        assert_eq!(parse_label("clean"), 0.0);
        assert_eq!(parse_label(""), 0.0);
    }
}
