use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CountMatrixError;

pub const PROTEIN_CODING: &str = "protein_coding";

/// Gene identifier with the version suffix removed (`ENSG00000123.4` -> `ENSG00000123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneId(String);

impl GeneId {
    /// Keeps the text before the first `.`; identifiers without a version are
    /// kept as they are, so trimming twice gives the same id. Returns `None`
    /// when nothing is left.
    pub fn from_versioned(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        let base = match trimmed.split_once('.') {
            Some((base, _version)) => base,
            None => trimmed,
        };
        if base.is_empty() {
            return None;
        }
        Some(Self(base.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GeneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Condition label of a sample group, e.g. `asc`, `idc`, `healthy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupLabel(String);

impl GroupLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn sample_name(&self, index: usize) -> SampleName {
        SampleName(format!("{}_{index}", self.0))
    }
}

impl fmt::Display for GroupLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for GroupLabel {
    type Err = CountMatrixError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let is_valid = !normalized.is_empty()
            && normalized
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-');
        if !is_valid {
            return Err(CountMatrixError::InvalidGroupLabel(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// Column name of one sample in the count matrix; doubles as the coldata `idx`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleName(String);

impl SampleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    /// One file per sample with `gene_id`, `gene_type` and count columns.
    #[default]
    StarCounts,
    /// One wide GTEx file holding every sample of the group.
    Gct,
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputFormat::StarCounts => write!(f, "star-counts"),
            InputFormat::Gct => write!(f, "gct"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountColumn {
    #[default]
    Unstranded,
    StrandedFirst,
    StrandedSecond,
}

impl CountColumn {
    pub fn header(&self) -> &'static str {
        match self {
            CountColumn::Unstranded => "unstranded",
            CountColumn::StrandedFirst => "stranded_first",
            CountColumn::StrandedSecond => "stranded_second",
        }
    }
}

impl fmt::Display for CountColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// How group tables are combined into the count matrix. Samples inside a
/// group are always outer-joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum JoinStrategy {
    #[default]
    Inner,
    Outer,
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinStrategy::Inner => write!(f, "inner"),
            JoinStrategy::Outer => write!(f, "outer"),
        }
    }
}

/// Shorthand group entry: `label:path[,path...]`, or `label@gct:path` for a
/// GTEx file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpecifier {
    pub label: GroupLabel,
    pub format: InputFormat,
    pub files: Vec<Utf8PathBuf>,
}

impl FromStr for GroupSpecifier {
    type Err = CountMatrixError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (head, rest) = trimmed
            .split_once(':')
            .ok_or_else(|| CountMatrixError::InvalidGroupSpecifier(value.to_string()))?;
        let (label, format) = match head.split_once('@') {
            Some((label, "gct")) => (label, InputFormat::Gct),
            Some((label, "star-counts")) => (label, InputFormat::StarCounts),
            Some(_) => return Err(CountMatrixError::InvalidGroupSpecifier(value.to_string())),
            None => (head, InputFormat::StarCounts),
        };
        let files = rest
            .split(',')
            .map(str::trim)
            .filter(|path| !path.is_empty())
            .map(Utf8PathBuf::from)
            .collect::<Vec<_>>();
        if files.is_empty() {
            return Err(CountMatrixError::InvalidGroupSpecifier(value.to_string()));
        }
        Ok(Self {
            label: label.parse()?,
            format,
            files,
        })
    }
}
