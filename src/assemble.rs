use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{GroupLabel, JoinStrategy};
use crate::error::CountMatrixError;
use crate::matrix::CountMatrix;
use crate::table::ExpressionTable;

#[derive(Debug, Clone)]
pub struct GroupTable {
    pub label: GroupLabel,
    pub table: ExpressionTable,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub label: String,
    pub samples: usize,
    pub genes: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyStats {
    pub join: JoinStrategy,
    pub genes_after_join: usize,
    pub incomplete_rows_dropped: usize,
    pub genes: usize,
    pub samples: usize,
}

/// Outer-joins the sample tables of one group in order, then keeps the first
/// row of each gene id.
pub fn merge_group(
    label: GroupLabel,
    samples: Vec<ExpressionTable>,
) -> Result<(GroupTable, GroupStats), CountMatrixError> {
    let sample_count = samples.len();
    let mut samples = samples.into_iter();
    let first = samples
        .next()
        .ok_or_else(|| CountMatrixError::EmptyGroup(label.to_string()))?;
    let mut merged = samples.try_fold(first, |acc, next| acc.outer_join(next))?;
    let duplicates_dropped = merged.drop_duplicates();
    debug!(group = %label, genes = merged.len(), duplicates_dropped, "merged group");

    let stats = GroupStats {
        label: label.to_string(),
        samples: sample_count,
        genes: merged.len(),
        duplicates_dropped,
    };
    Ok((
        GroupTable {
            label,
            table: merged,
        },
        stats,
    ))
}

/// Joins group tables in order with `join`, then drops every row holding a
/// missing value.
pub fn assemble_matrix(
    groups: Vec<GroupTable>,
    join: JoinStrategy,
) -> Result<(CountMatrix, AssemblyStats), CountMatrixError> {
    let mut groups = groups.into_iter();
    let first = groups
        .next()
        .ok_or_else(|| CountMatrixError::InvalidConfig("no groups to assemble".to_string()))?;
    let mut table = groups.try_fold(first.table, |acc, group| acc.join(group.table, join))?;
    let genes_after_join = table.len();
    let incomplete_rows_dropped = table.drop_incomplete();
    info!(
        join = %join,
        genes_after_join,
        incomplete_rows_dropped,
        genes = table.len(),
        "assembled count matrix"
    );
    if table.is_empty() {
        return Err(CountMatrixError::EmptyMatrix);
    }

    let stats = AssemblyStats {
        join,
        genes_after_join,
        incomplete_rows_dropped,
        genes: table.len(),
        samples: table.columns().len(),
    };
    Ok((CountMatrix::new(table), stats))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::GeneId;

    fn sample(column: &str, rows: &[(&str, f64)]) -> ExpressionTable {
        let mut table = ExpressionTable::new(vec![column.to_string()]);
        for (id, value) in rows {
            table.push_row(GeneId::from_versioned(id).unwrap(), vec![Some(*value)]);
        }
        table
    }

    #[test]
    fn group_gene_set_is_union_of_samples() {
        let a = sample("asc_0", &[("G1", 1.0), ("G2", 2.0)]);
        let b = sample("asc_1", &[("G2", 3.0), ("G3", 4.0)]);
        let c = sample("asc_2", &[("G4", 5.0)]);
        let mut union = a.gene_set();
        union.extend(b.gene_set());
        union.extend(c.gene_set());

        let (group, stats) = merge_group("asc".parse().unwrap(), vec![a, b, c]).unwrap();
        assert_eq!(group.table.gene_set(), union);
        assert_eq!(stats.samples, 3);
        assert_eq!(group.table.columns().len(), 3);
    }

    #[test]
    fn empty_group_is_an_error() {
        let err = merge_group("asc".parse().unwrap(), Vec::new()).unwrap_err();
        assert_matches!(err, CountMatrixError::EmptyGroup(_));
    }

    #[test]
    fn inner_and_outer_give_same_genes() {
        let build = || {
            vec![
                GroupTable {
                    label: "asc".parse().unwrap(),
                    table: sample("asc_0", &[("G2", 1.0), ("G1", 2.0), ("G3", 3.0)]),
                },
                GroupTable {
                    label: "idc".parse().unwrap(),
                    table: sample("idc_0", &[("G1", 4.0), ("G2", 5.0)]),
                },
            ]
        };
        let (inner, _) = assemble_matrix(build(), JoinStrategy::Inner).unwrap();
        let (outer, stats) = assemble_matrix(build(), JoinStrategy::Outer).unwrap();

        assert_eq!(inner.table().gene_set(), outer.table().gene_set());
        assert_eq!(stats.incomplete_rows_dropped, 1);
        let inner_order = inner.table().gene_ids().map(GeneId::as_str).collect::<Vec<_>>();
        assert_eq!(inner_order, vec!["G2", "G1"]);
    }

    #[test]
    fn disjoint_groups_give_empty_matrix() {
        let groups = vec![
            GroupTable {
                label: "asc".parse().unwrap(),
                table: sample("asc_0", &[("G1", 1.0)]),
            },
            GroupTable {
                label: "idc".parse().unwrap(),
                table: sample("idc_0", &[("G2", 1.0)]),
            },
        ];
        let err = assemble_matrix(groups, JoinStrategy::Inner).unwrap_err();
        assert_matches!(err, CountMatrixError::EmptyMatrix);
    }
}
