use crate::coldata::Coldata;
use crate::error::CountMatrixError;
use crate::table::ExpressionTable;

pub const GENE_ID_HEADER: &str = "gene_id";

/// Genes x samples table with no missing cells, keyed by gene id.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    table: ExpressionTable,
}

impl CountMatrix {
    pub(crate) fn new(table: ExpressionTable) -> Self {
        debug_assert!(table.rows().iter().all(|row| row.is_complete()));
        Self { table }
    }

    pub fn table(&self) -> &ExpressionTable {
        &self.table
    }

    pub fn samples(&self) -> &[String] {
        self.table.columns()
    }

    pub fn gene_count(&self) -> usize {
        self.table.len()
    }

    /// Fails unless the coldata `idx` values are the matrix columns, one to
    /// one and in the same order.
    pub fn verify_coldata(&self, coldata: &Coldata) -> Result<(), CountMatrixError> {
        let idx = coldata
            .rows()
            .iter()
            .map(|row| row.idx.as_str())
            .collect::<Vec<_>>();
        verify_columns(self.samples(), &idx)
    }

    pub fn to_tsv(&self) -> String {
        let mut out = String::with_capacity(self.table.len() * (self.samples().len() + 1) * 8);
        out.push_str(GENE_ID_HEADER);
        for sample in self.samples() {
            out.push('\t');
            out.push_str(sample);
        }
        out.push('\n');
        for row in self.table.rows() {
            out.push_str(row.gene_id.as_str());
            for value in &row.values {
                out.push('\t');
                if let Some(value) = value {
                    out.push_str(&format_count(*value));
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Integral counts print without a fractional part.
pub fn format_count(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub fn verify_columns(columns: &[String], idx: &[&str]) -> Result<(), CountMatrixError> {
    if columns.len() != idx.len() {
        return Err(CountMatrixError::ColdataMismatch(format!(
            "{} matrix columns but {} coldata rows",
            columns.len(),
            idx.len()
        )));
    }
    for (position, (column, idx)) in columns.iter().zip(idx).enumerate() {
        if column != idx {
            return Err(CountMatrixError::ColdataMismatch(format!(
                "column {position} is `{column}` but coldata idx is `{idx}`"
            )));
        }
    }
    Ok(())
}
