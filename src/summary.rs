//! Per-group median expression of every gene in a count matrix.

use serde::Serialize;

use crate::domain::GeneId;
use crate::matrix::{CountMatrix, GENE_ID_HEADER, format_count};

#[derive(Debug, Clone, Serialize)]
pub struct GroupMedians {
    pub groups: Vec<String>,
    pub rows: Vec<(GeneId, Vec<f64>)>,
}

impl GroupMedians {
    pub fn to_tsv(&self) -> String {
        let mut out = String::from(GENE_ID_HEADER);
        for group in &self.groups {
            out.push('\t');
            out.push_str(group);
        }
        out.push('\n');
        for (gene_id, medians) in &self.rows {
            out.push_str(gene_id.as_str());
            for median in medians {
                out.push('\t');
                out.push_str(&format_count(*median));
            }
            out.push('\n');
        }
        out
    }
}

/// `groups` pairs a group name with the matrix column indices of its samples.
pub fn group_medians(matrix: &CountMatrix, groups: &[(String, Vec<usize>)]) -> GroupMedians {
    let mut scratch = Vec::new();
    let rows = matrix
        .table()
        .rows()
        .iter()
        .map(|row| {
            let medians = groups
                .iter()
                .map(|(_, columns)| {
                    scratch.clear();
                    scratch.extend(columns.iter().filter_map(|&idx| row.values[idx]));
                    median(&mut scratch)
                })
                .collect();
            (row.gene_id.clone(), medians)
        })
        .collect();
    GroupMedians {
        groups: groups.iter().map(|(name, _)| name.clone()).collect(),
        rows,
    }
}

/// Reorders `values`. Empty input gives 0.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}
