use std::path::PathBuf;

use camino::Utf8Path;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::{CountColumn, GeneId, GroupLabel, InputFormat, PROTEIN_CODING, SampleName};
use crate::error::CountMatrixError;
use crate::fs_util::open_input;
use crate::table::ExpressionTable;

/// Lines before the header of a STAR gene counts file (`# gene-model: ...`).
pub const STAR_PREAMBLE_LINES: usize = 1;
/// Lines before the header of a GCT file (`#1.2` and the dimensions line).
pub const GCT_PREAMBLE_LINES: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct LoadStats {
    pub path: String,
    pub format: String,
    pub samples: Vec<String>,
    pub rows_read: usize,
    pub rows_kept: usize,
    pub duplicates_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub table: ExpressionTable,
    pub stats: LoadStats,
}

/// Loads one STAR gene counts file as a single-column table named `sample`,
/// keeping protein-coding genes only.
pub fn load_sample(
    path: &Utf8Path,
    sample: &SampleName,
    count_column: CountColumn,
) -> Result<LoadedTable, CountMatrixError> {
    debug!(path = %path, sample = %sample, "loading sample");
    let mut records = TsvRecords::open(path, STAR_PREAMBLE_LINES)?;
    let header = records.header()?;

    let gene_idx = require_column(path, &header, "gene_id")?;
    let type_idx = require_column(path, &header, "gene_type")?;
    let count_idx = require_column(path, &header, count_column.header())?;
    let width = gene_idx.max(type_idx).max(count_idx) + 1;

    let mut table = ExpressionTable::new(vec![sample.to_string()]);
    let mut rows_read = 0;
    while let Some((line, record)) = records.next_record()? {
        rows_read += 1;
        if record.len() < width {
            return Err(malformed(
                path,
                line,
                format!("expected at least {width} fields, found {}", record.len()),
            ));
        }
        if &record[type_idx] != PROTEIN_CODING {
            continue;
        }
        let gene_id = parse_gene_id(path, line, &record[gene_idx])?;
        let count = parse_count(path, line, &record[count_idx])?;
        table.push_row(gene_id, vec![count]);
    }
    let rows_kept = table.len();
    let duplicates_dropped = table.drop_duplicates();
    if duplicates_dropped > 0 {
        warn!(path = %path, duplicates_dropped, "dropped duplicate gene ids after trimming");
    }

    Ok(LoadedTable {
        table,
        stats: LoadStats {
            path: path.to_string(),
            format: InputFormat::StarCounts.to_string(),
            samples: vec![sample.to_string()],
            rows_read,
            rows_kept,
            duplicates_dropped,
        },
    })
}

/// Loads the first `sample_limit` samples of a GTEx GCT file, naming them
/// `{label}_0`, `{label}_1`, ...
pub fn load_gct(
    path: &Utf8Path,
    label: &GroupLabel,
    sample_limit: usize,
) -> Result<LoadedTable, CountMatrixError> {
    debug!(path = %path, group = %label, sample_limit, "loading gct");
    let mut records = TsvRecords::open(path, GCT_PREAMBLE_LINES)?;
    let header = records.header()?;

    let (name_idx, sample_idx) = gct_columns(path, &header, sample_limit)?;
    if sample_idx.len() < sample_limit {
        warn!(
            path = %path,
            found = sample_idx.len(),
            sample_limit,
            "gct file has fewer samples than requested"
        );
    }
    let samples = (0..sample_idx.len())
        .map(|i| label.sample_name(i).to_string())
        .collect::<Vec<_>>();
    let width = sample_idx.last().copied().unwrap_or(name_idx) + 1;

    let mut table = ExpressionTable::new(samples.clone());
    let mut rows_read = 0;
    while let Some((line, record)) = records.next_record()? {
        rows_read += 1;
        if record.len() < width {
            return Err(malformed(
                path,
                line,
                format!("expected at least {width} fields, found {}", record.len()),
            ));
        }
        let gene_id = parse_gene_id(path, line, &record[name_idx])?;
        let values = sample_idx
            .iter()
            .map(|&idx| parse_count(path, line, &record[idx]))
            .collect::<Result<Vec<_>, _>>()?;
        table.push_row(gene_id, values);
    }
    let rows_kept = table.len();
    let duplicates_dropped = table.drop_duplicates();
    if duplicates_dropped > 0 {
        warn!(path = %path, duplicates_dropped, "dropped duplicate gene ids after trimming");
    }

    Ok(LoadedTable {
        table,
        stats: LoadStats {
            path: path.to_string(),
            format: InputFormat::Gct.to_string(),
            samples,
            rows_read,
            rows_kept,
            duplicates_dropped,
        },
    })
}

/// Number of samples `load_gct` takes from `path`, read from the header only.
pub fn gct_sample_count(path: &Utf8Path, sample_limit: usize) -> Result<usize, CountMatrixError> {
    let mut records = TsvRecords::open(path, GCT_PREAMBLE_LINES)?;
    let header = records.header()?;
    let (_, sample_idx) = gct_columns(path, &header, sample_limit)?;
    Ok(sample_idx.len())
}

/// `Name` index and the first `sample_limit` sample columns. Samples start
/// after `Description` (after `Name` when the file has no `Description`);
/// anything in front of them, such as a row index, is not a sample.
fn gct_columns(
    path: &Utf8Path,
    header: &StringRecord,
    sample_limit: usize,
) -> Result<(usize, Vec<usize>), CountMatrixError> {
    let name_idx = require_column(path, header, "Name")?;
    let first_sample = header
        .iter()
        .position(|column| column.trim() == "Description")
        .map_or(name_idx, |description_idx| description_idx.max(name_idx))
        + 1;
    let sample_idx = (first_sample..header.len())
        .take(sample_limit)
        .collect::<Vec<_>>();
    if sample_idx.is_empty() {
        return Err(CountMatrixError::MalformedHeader {
            path: path.as_std_path().to_path_buf(),
            message: "no sample columns after Description".to_string(),
        });
    }
    Ok((name_idx, sample_idx))
}

/// Reads the header line of a TSV file after `preamble` skipped lines.
pub fn read_header(path: &Utf8Path, preamble: usize) -> Result<Vec<String>, CountMatrixError> {
    let mut records = TsvRecords::open(path, preamble)?;
    Ok(records.header()?.iter().map(str::to_string).collect())
}

/// Values of `column` in every data row of a TSV file.
pub fn read_column(
    path: &Utf8Path,
    preamble: usize,
    column: &str,
) -> Result<Vec<String>, CountMatrixError> {
    let mut records = TsvRecords::open(path, preamble)?;
    let header = records.header()?;
    let idx = require_column(path, &header, column)?;
    let mut values = Vec::new();
    while let Some((line, record)) = records.next_record()? {
        let value = record
            .get(idx)
            .ok_or_else(|| malformed(path, line, format!("missing `{column}` field")))?;
        values.push(value.trim().to_string());
    }
    Ok(values)
}

struct TsvRecords {
    path: PathBuf,
    reader: csv::Reader<Box<dyn std::io::Read>>,
    preamble: usize,
    record: StringRecord,
}

impl TsvRecords {
    fn open(path: &Utf8Path, preamble: usize) -> Result<Self, CountMatrixError> {
        let reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(open_input(path)?);
        Ok(Self {
            path: path.as_std_path().to_path_buf(),
            reader,
            preamble,
            record: StringRecord::new(),
        })
    }

    fn header(&mut self) -> Result<StringRecord, CountMatrixError> {
        for _ in 0..self.preamble {
            if !self.read()? {
                return Err(self.truncated());
            }
        }
        if !self.read()? {
            return Err(self.truncated());
        }
        Ok(self.record.clone())
    }

    fn next_record(&mut self) -> Result<Option<(u64, &StringRecord)>, CountMatrixError> {
        loop {
            if !self.read()? {
                return Ok(None);
            }
            if self.record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let line = self.record.position().map(|pos| pos.line()).unwrap_or(0);
            return Ok(Some((line, &self.record)));
        }
    }

    fn read(&mut self) -> Result<bool, CountMatrixError> {
        self.reader
            .read_record(&mut self.record)
            .map_err(|err| CountMatrixError::MalformedRow {
                path: self.path.clone(),
                line: err.position().map(|pos| pos.line()).unwrap_or(0),
                message: err.to_string(),
            })
    }

    fn truncated(&self) -> CountMatrixError {
        CountMatrixError::MalformedHeader {
            path: self.path.clone(),
            message: format!("file ends before the header (expected {} preamble lines)", self.preamble),
        }
    }
}

fn require_column(
    path: &Utf8Path,
    header: &StringRecord,
    column: &str,
) -> Result<usize, CountMatrixError> {
    header
        .iter()
        .position(|name| name.trim() == column)
        .ok_or_else(|| CountMatrixError::MissingColumn {
            path: path.as_std_path().to_path_buf(),
            column: column.to_string(),
        })
}

fn parse_gene_id(path: &Utf8Path, line: u64, value: &str) -> Result<GeneId, CountMatrixError> {
    GeneId::from_versioned(value).ok_or_else(|| CountMatrixError::InvalidGeneId {
        path: path.as_std_path().to_path_buf(),
        line,
        value: value.to_string(),
    })
}

/// An empty cell is a missing count.
fn parse_count(path: &Utf8Path, line: u64, value: &str) -> Result<Option<f64>, CountMatrixError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    let count = value
        .parse::<f64>()
        .map_err(|_| malformed(path, line, format!("invalid count `{value}`")))?;
    if !count.is_finite() || count < 0.0 {
        return Err(malformed(path, line, format!("invalid count `{value}`")));
    }
    Ok(Some(count))
}

fn malformed(path: &Utf8Path, line: u64, message: String) -> CountMatrixError {
    CountMatrixError::MalformedRow {
        path: path.as_std_path().to_path_buf(),
        line,
        message,
    }
}
