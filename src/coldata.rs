use serde::Serialize;

use crate::domain::{GroupLabel, SampleName};

pub const IDX_HEADER: &str = "idx";
pub const CONDITION_HEADER: &str = "condition";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColdataRow {
    pub idx: SampleName,
    pub condition: GroupLabel,
}

/// Sample to condition table consumed next to the count matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Coldata {
    rows: Vec<ColdataRow>,
}

impl Coldata {
    pub fn rows(&self) -> &[ColdataRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_tsv(&self) -> String {
        let mut out = format!("{IDX_HEADER}\t{CONDITION_HEADER}\n");
        for row in &self.rows {
            out.push_str(row.idx.as_str());
            out.push('\t');
            out.push_str(row.condition.as_str());
            out.push('\n');
        }
        out
    }
}

/// One row per sample, groups in order: `{group}_0 .. {group}_{n-1}`.
pub fn build_coldata<'a, I>(layout: I) -> Coldata
where
    I: IntoIterator<Item = (&'a GroupLabel, usize)>,
{
    let rows = layout
        .into_iter()
        .flat_map(|(label, samples)| {
            (0..samples).map(move |i| ColdataRow {
                idx: label.sample_name(i),
                condition: label.clone(),
            })
        })
        .collect();
    Coldata { rows }
}
