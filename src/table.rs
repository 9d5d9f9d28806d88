use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::{GeneId, JoinStrategy};
use crate::error::CountMatrixError;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub gene_id: GeneId,
    pub values: Vec<Option<f64>>,
}

impl Row {
    pub fn is_complete(&self) -> bool {
        self.values.iter().all(Option::is_some)
    }
}

/// Gene-keyed table of counts. A `None` cell is a missing value, produced by
/// outer joins when a gene is absent from one side.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExpressionTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl ExpressionTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, gene_id: GeneId, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(Row { gene_id, values });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn gene_ids(&self) -> impl Iterator<Item = &GeneId> {
        self.rows.iter().map(|row| &row.gene_id)
    }

    pub fn gene_set(&self) -> BTreeSet<GeneId> {
        self.gene_ids().cloned().collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Value of the first row with `gene_id` in column `name`.
    pub fn value(&self, gene_id: &str, name: &str) -> Option<Option<f64>> {
        let column = self.column_index(name)?;
        self.rows
            .iter()
            .find(|row| row.gene_id.as_str() == gene_id)
            .map(|row| row.values[column])
    }

    /// Keeps the first row of every gene id. Returns the number of rows removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::with_capacity(before);
        self.rows.retain(|row| seen.insert(row.gene_id.clone()));
        before - self.rows.len()
    }

    /// Removes every row holding at least one missing value. Returns the number
    /// of rows removed.
    pub fn drop_incomplete(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.retain(Row::is_complete);
        before - self.rows.len()
    }

    pub fn join(self, other: Self, strategy: JoinStrategy) -> Result<Self, CountMatrixError> {
        match strategy {
            JoinStrategy::Inner => self.inner_join(other),
            JoinStrategy::Outer => self.outer_join(other),
        }
    }

    /// Rows whose gene id is on both sides, in left order. A key repeated on
    /// both sides yields every pairing.
    pub fn inner_join(self, other: Self) -> Result<Self, CountMatrixError> {
        let columns = joined_columns(&self.columns, &other.columns)?;
        let index = key_index(&other.rows);
        let mut rows = Vec::with_capacity(self.rows.len().min(other.rows.len()));
        for left in &self.rows {
            let Some(matches) = index.get(&left.gene_id) else {
                continue;
            };
            for &right in matches {
                rows.push(concat_row(
                    &left.gene_id,
                    &left.values,
                    &other.rows[right].values,
                ));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Union of gene ids from both sides sorted by gene id; cells of the side
    /// lacking a gene are `None`.
    pub fn outer_join(self, other: Self) -> Result<Self, CountMatrixError> {
        let columns = joined_columns(&self.columns, &other.columns)?;
        let index = key_index(&other.rows);
        let left_missing = vec![None; self.columns.len()];
        let right_missing = vec![None; other.columns.len()];

        let mut rows = Vec::with_capacity(self.rows.len().max(other.rows.len()));
        let mut matched = HashSet::new();
        for left in &self.rows {
            match index.get(&left.gene_id) {
                Some(matches) => {
                    matched.insert(&left.gene_id);
                    for &right in matches {
                        rows.push(concat_row(
                            &left.gene_id,
                            &left.values,
                            &other.rows[right].values,
                        ));
                    }
                }
                None => rows.push(concat_row(&left.gene_id, &left.values, &right_missing)),
            }
        }
        for right in &other.rows {
            if !matched.contains(&right.gene_id) {
                rows.push(concat_row(&right.gene_id, &left_missing, &right.values));
            }
        }
        rows.sort_by(|a, b| a.gene_id.cmp(&b.gene_id));
        Ok(Self { columns, rows })
    }
}

fn joined_columns(left: &[String], right: &[String]) -> Result<Vec<String>, CountMatrixError> {
    let mut columns = Vec::with_capacity(left.len() + right.len());
    let mut seen = HashSet::new();
    for column in left.iter().chain(right) {
        if !seen.insert(column.as_str()) {
            return Err(CountMatrixError::DuplicateColumn(column.clone()));
        }
        columns.push(column.clone());
    }
    Ok(columns)
}

fn key_index(rows: &[Row]) -> HashMap<&GeneId, Vec<usize>> {
    let mut index: HashMap<&GeneId, Vec<usize>> = HashMap::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        index.entry(&row.gene_id).or_default().push(position);
    }
    index
}

fn concat_row(gene_id: &GeneId, left: &[Option<f64>], right: &[Option<f64>]) -> Row {
    let mut values = Vec::with_capacity(left.len() + right.len());
    values.extend_from_slice(left);
    values.extend_from_slice(right);
    Row {
        gene_id: gene_id.clone(),
        values,
    }
}
