//! Fractional random sampling of a project's releases

use rand::Rng;

use super::csv_source::TableSource;
use super::provider::Project;
use super::table::Table;
use super::DataResult;

/// One sampled table plus the number of rows it consumed.
#[derive(Debug, Clone)]
pub struct Sample {
    pub table: Table,
    pub rows_drawn: usize,
}

/// Draws a random fraction of every release file of a project.
pub struct DataSampler<'a> {
    source: &'a dyn TableSource,
}

impl<'a> DataSampler<'a> {
    pub fn new(source: &'a dyn TableSource) -> Self {
        Self { source }
    }

    /// Sample `fraction` of the rows of each file independently (without
    /// replacement) and concatenate the draws.
    ///
    /// The row count per file is `round(fraction * rows)`. An empty file
    /// contributes zero rows.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        project: &Project,
        fraction: f64,
        rng: &mut R,
    ) -> DataResult<Sample> {
        let fraction = fraction.clamp(0.0, 1.0);
        let mut draws = Vec::with_capacity(project.files.len());

        for file in &project.files {
            let table = self.source.load(file)?;
            let amount = ((table.len() as f64) * fraction).round() as usize;
            let amount = amount.min(table.len());
            let indices = rand::seq::index::sample(rng, table.len(), amount).into_vec();
            draws.push(table.select_rows(&indices));
        }

        let table = Table::concat(&draws.iter().collect::<Vec<_>>());
        let rows_drawn = table.len();
        Ok(Sample { table, rows_drawn })
    }
}
