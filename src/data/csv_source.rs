//! CSV release files as labelled tables
//!
//! The last column of every file is the label. Feature columns that are not
//! numeric in every row (class names, version strings) are dropped at load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::table::{Column, Table};
use super::{parse_label, DataError, DataResult};

/// Source of parsed tables, keyed by file reference.
pub trait TableSource: Send + Sync {
    /// Load one referenced file as a table.
    fn load(&self, path: &Path) -> DataResult<Arc<Table>>;
}

/// Parse a CSV file into a [`Table`].
///
/// A file without a header yields an empty table; a header-only file yields
/// a table with zero rows. Neither is an error.
pub fn parse_csv(path: &Path) -> DataResult<Table> {
    if !path.exists() {
        return Err(DataError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        warn!("{} has no header, treating as empty", path.display());
        return Ok(Table::empty("label"));
    }

    let label_idx = headers.len() - 1;
    let mut feature_values: Vec<Vec<f64>> = vec![Vec::new(); label_idx];
    let mut numeric = vec![true; label_idx];
    let mut labels = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|source| DataError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let Some(label_cell) = record.get(label_idx) else {
            return Err(DataError::NoLabelColumn {
                path: path.to_path_buf(),
            });
        };
        labels.push(parse_label(label_cell));

        for (i, values) in feature_values.iter_mut().enumerate() {
            match record.get(i).map(|c| c.parse::<f64>()) {
                Some(Ok(v)) => values.push(v),
                _ => {
                    numeric[i] = false;
                    values.push(f64::NAN);
                }
            }
        }
    }

    let mut features = Vec::with_capacity(label_idx);
    for (i, values) in feature_values.into_iter().enumerate() {
        if numeric[i] {
            features.push(Column::new(headers[i].clone(), values));
        } else {
            debug!(
                "Dropping non-numeric column '{}' from {}",
                headers[i],
                path.display()
            );
        }
    }

    let label = Column::new(headers[label_idx].clone(), labels);
    Table::new(features, label).map_err(|source| DataError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads CSV files from disk, parsing each file at most once.
#[derive(Default)]
pub struct CsvTableSource {
    cache: DashMap<PathBuf, Arc<Table>>,
}

impl CsvTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of parsed files held in memory
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl TableSource for CsvTableSource {
    fn load(&self, path: &Path) -> DataResult<Arc<Table>> {
        if let Some(hit) = self.cache.get(path) {
            return Ok(Arc::clone(hit.value()));
        }
        let table = Arc::new(parse_csv(path)?);
        debug!(
            "Loaded {} ({} rows, {} features)",
            path.display(),
            table.len(),
            table.feature_count()
        );
        self.cache.insert(path.to_path_buf(), Arc::clone(&table));
        Ok(table)
    }
}

/// Tables registered in memory under synthetic file references.
#[derive(Default, Clone)]
pub struct MemoryTableSource {
    tables: HashMap<PathBuf, Arc<Table>>,
}

impl MemoryTableSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, table: Table) {
        self.tables.insert(path.into(), Arc::new(table));
    }

    pub fn with(mut self, path: impl Into<PathBuf>, table: Table) -> Self {
        self.insert(path, table);
        self
    }
}

impl TableSource for MemoryTableSource {
    fn load(&self, path: &Path) -> DataResult<Arc<Table>> {
        self.tables
            .get(path)
            .cloned()
            .ok_or_else(|| DataError::MissingFile {
                path: path.to_path_buf(),
            })
    }
}
