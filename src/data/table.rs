//! Column-oriented feature tables with a trailing label column

use thiserror::Error;

/// Shape violations when assembling a table
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("column '{column}' has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// A named column of numeric values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Feature columns plus one label column.
///
/// The label column is always treated as the last column of the table.
/// Label values are stored after label mapping (see [`super::parse_label`]),
/// so a row is defective when its label is greater than zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    features: Vec<Column>,
    label: Column,
}

impl Table {
    /// Build a table, checking that every column has as many values as the label.
    pub fn new(features: Vec<Column>, label: Column) -> Result<Self, TableError> {
        let expected = label.values.len();
        if let Some(bad) = features.iter().find(|c| c.values.len() != expected) {
            return Err(TableError::LengthMismatch {
                column: bad.name.clone(),
                expected,
                found: bad.values.len(),
            });
        }
        Ok(Self { features, label })
    }

    /// A table with no feature columns and no rows.
    pub fn empty(label_name: impl Into<String>) -> Self {
        Self {
            features: Vec::new(),
            label: Column::new(label_name, Vec::new()),
        }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.label.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label.values.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn features(&self) -> &[Column] {
        &self.features
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|c| c.name.as_str())
    }

    pub fn feature(&self, name: &str) -> Option<&Column> {
        self.features.iter().find(|c| c.name == name)
    }

    pub fn label(&self) -> &Column {
        &self.label
    }

    pub fn labels(&self) -> &[f64] {
        &self.label.values
    }

    /// Labels binarized at `> 0`.
    pub fn binary_labels(&self) -> Vec<u8> {
        self.label
            .values
            .iter()
            .map(|&v| u8::from(v > 0.0))
            .collect()
    }

    /// Feature values of one row, in column order.
    pub fn row(&self, index: usize) -> Vec<f64> {
        self.features.iter().map(|c| c.values[index]).collect()
    }

    /// Row-major copy of the feature matrix.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|i| self.row(i)).collect()
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let pick = |values: &[f64]| indices.iter().map(|&i| values[i]).collect::<Vec<_>>();
        Table {
            features: self
                .features
                .iter()
                .map(|c| Column::new(c.name.clone(), pick(&c.values)))
                .collect(),
            label: Column::new(self.label.name.clone(), pick(&self.label.values)),
        }
    }

    /// Concatenate tables row-wise with a fresh row index.
    ///
    /// Columns are aligned by name. Only feature columns present in every
    /// non-degenerate input survive, in the order of the first input.
    /// Tables without any columns (e.g. from a headerless empty file)
    /// contribute nothing and do not constrain the schema.
    pub fn concat(tables: &[&Table]) -> Table {
        let shaped: Vec<&Table> = tables
            .iter()
            .copied()
            .filter(|t| t.feature_count() > 0 || !t.is_empty())
            .collect();

        let Some(first) = shaped.first() else {
            let label = tables
                .first()
                .map(|t| t.label.name.clone())
                .unwrap_or_default();
            return Table::empty(label);
        };

        let shared: Vec<&str> = first
            .feature_names()
            .filter(|name| shaped.iter().all(|t| t.feature(name).is_some()))
            .collect();

        let total: usize = shaped.iter().map(|t| t.len()).sum();
        let features = shared
            .iter()
            .map(|name| {
                let mut values = Vec::with_capacity(total);
                for t in &shaped {
                    if let Some(col) = t.feature(name) {
                        values.extend_from_slice(&col.values);
                    }
                }
                Column::new(*name, values)
            })
            .collect();

        let mut labels = Vec::with_capacity(total);
        for t in &shaped {
            labels.extend_from_slice(&t.label.values);
        }

        Table {
            features,
            label: Column::new(first.label.name.clone(), labels),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cols: &[(&str, Vec<f64>)], labels: Vec<f64>) -> Table {
        Table::new(
            cols.iter()
                .map(|(n, v)| Column::new(*n, v.clone()))
                .collect(),
            Column::new("bug", labels),
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_ragged_columns() {
        let err = Table::new(
            vec![Column::new("loc", vec![1.0, 2.0])],
            Column::new("bug", vec![0.0]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableError::LengthMismatch {
                column: "loc".into(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_rows_and_binary_labels() {
        let t = table(
            &[("loc", vec![1.0, 2.0]), ("wmc", vec![3.0, 4.0])],
            vec![0.0, 3.0],
        );
        assert_eq!(t.len(), 2);
        assert_eq!(t.row(1), vec![2.0, 4.0]);
        assert_eq!(t.binary_labels(), vec![0, 1]);
    }

    #[test]
    fn test_select_rows_keeps_order() {
        let t = table(&[("loc", vec![10.0, 20.0, 30.0])], vec![0.0, 1.0, 0.0]);
        let s = t.select_rows(&[2, 0]);
        assert_eq!(s.feature("loc").unwrap().values, vec![30.0, 10.0]);
        assert_eq!(s.labels(), &[0.0, 0.0]);
    }

    #[test]
    fn test_concat_keeps_shared_columns() {
        let a = table(
            &[("loc", vec![1.0]), ("wmc", vec![2.0]), ("cbo", vec![3.0])],
            vec![1.0],
        );
        let b = table(&[("cbo", vec![4.0]), ("loc", vec![5.0])], vec![0.0]);
        let c = Table::concat(&[&a, &b]);
        let names: Vec<&str> = c.feature_names().collect();
        assert_eq!(names, vec!["loc", "cbo"]);
        assert_eq!(c.feature("loc").unwrap().values, vec![1.0, 5.0]);
        assert_eq!(c.labels(), &[1.0, 0.0]);
    }

    #[test]
    fn test_concat_ignores_columnless_tables() {
        let a = table(&[("loc", vec![1.0])], vec![1.0]);
        let empty = Table::empty("bug");
        let c = Table::concat(&[&empty, &a]);
        assert_eq!(c.len(), 1);
        assert_eq!(c.feature_count(), 1);
    }
}
