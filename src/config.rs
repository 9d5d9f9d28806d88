use std::collections::HashSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{CountColumn, GroupLabel, GroupSpecifier, InputFormat, JoinStrategy};
use crate::error::CountMatrixError;

pub const DEFAULT_CONFIG_FILE: &str = "kira-cm.json";
pub const DEFAULT_OUTPUT_DIR: &str = "deseq_inputs";
pub const DEFAULT_COUNT_MATRIX: &str = "count_matrix.csv";
pub const DEFAULT_COLDATA: &str = "coldata.csv";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const GROUP_MEDIANS_FILE: &str = "group_medians.tsv";
pub const DEFAULT_SAMPLE_LIMIT: usize = 7;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_matrix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coldata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_join: Option<JoinStrategy>,
    #[serde(default)]
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GroupEntry {
    Shorthand(String),
    Detailed(GroupEntryObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GroupEntryObject {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<InputFormat>,
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_column: Option<CountColumn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRequest {
    pub label: GroupLabel,
    pub format: InputFormat,
    pub files: Vec<Utf8PathBuf>,
    pub count_column: CountColumn,
    pub sample_limit: usize,
}

impl GroupRequest {
    /// Samples the group is expected to contribute before any file is read.
    pub fn planned_samples(&self) -> usize {
        match self.format {
            InputFormat::StarCounts => self.files.len(),
            InputFormat::Gct => self.sample_limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub output_dir: Utf8PathBuf,
    pub count_matrix: String,
    pub coldata: String,
    pub cross_join: JoinStrategy,
    pub groups: Vec<GroupRequest>,
}

impl ResolvedConfig {
    pub fn count_matrix_path(&self) -> Utf8PathBuf {
        self.output_dir.join(&self.count_matrix)
    }

    pub fn coldata_path(&self) -> Utf8PathBuf {
        self.output_dir.join(&self.coldata)
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.output_dir.join(MANIFEST_FILE)
    }

    pub fn group_medians_path(&self) -> Utf8PathBuf {
        self.output_dir.join(GROUP_MEDIANS_FILE)
    }

    pub fn with_overrides(
        mut self,
        output_dir: Option<Utf8PathBuf>,
        cross_join: Option<JoinStrategy>,
    ) -> Self {
        if let Some(output_dir) = output_dir {
            self.output_dir = output_dir;
        }
        if let Some(cross_join) = cross_join {
            self.cross_join = cross_join;
        }
        self
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CountMatrixError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.as_std_path().exists() {
            return Err(CountMatrixError::MissingConfig);
        }

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| CountMatrixError::ConfigRead(config_path.clone().into_std_path_buf()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CountMatrixError::ConfigParse(err.to_string()))?;

        let base_dir = config_path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        Self::resolve_config(config, base_dir)
    }

    /// Relative paths in `config` are taken relative to `base_dir`.
    pub fn resolve_config(
        config: Config,
        base_dir: &Utf8Path,
    ) -> Result<ResolvedConfig, CountMatrixError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(CountMatrixError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }
        if config.groups.is_empty() {
            return Err(CountMatrixError::InvalidConfig(
                "at least one group is required".to_string(),
            ));
        }

        let groups = config
            .groups
            .into_iter()
            .map(|entry| resolve_group(entry, base_dir))
            .collect::<Result<Vec<_>, CountMatrixError>>()?;

        let mut labels = HashSet::new();
        for group in &groups {
            if !labels.insert(group.label.as_str()) {
                return Err(CountMatrixError::InvalidConfig(format!(
                    "duplicate group label {}",
                    group.label
                )));
            }
        }

        let output_dir = config
            .output_dir
            .as_deref()
            .unwrap_or(DEFAULT_OUTPUT_DIR);
        Ok(ResolvedConfig {
            schema_version,
            output_dir: rebase(base_dir, output_dir),
            count_matrix: config
                .count_matrix
                .unwrap_or_else(|| DEFAULT_COUNT_MATRIX.to_string()),
            coldata: config
                .coldata
                .unwrap_or_else(|| DEFAULT_COLDATA.to_string()),
            cross_join: config.cross_join.unwrap_or_default(),
            groups,
        })
    }
}

fn resolve_group(entry: GroupEntry, base_dir: &Utf8Path) -> Result<GroupRequest, CountMatrixError> {
    let request = match entry {
        GroupEntry::Shorthand(value) => {
            let spec: GroupSpecifier = value.parse()?;
            GroupRequest {
                label: spec.label,
                format: spec.format,
                files: spec
                    .files
                    .iter()
                    .map(|file| rebase(base_dir, file.as_str()))
                    .collect(),
                count_column: CountColumn::default(),
                sample_limit: DEFAULT_SAMPLE_LIMIT,
            }
        }
        GroupEntry::Detailed(obj) => {
            let format = obj.format.unwrap_or_default();
            if format == InputFormat::Gct && obj.count_column.is_some() {
                return Err(CountMatrixError::InvalidConfig(format!(
                    "group {}: count_column applies to star-counts inputs only",
                    obj.label
                )));
            }
            GroupRequest {
                label: obj.label.parse()?,
                format,
                files: obj
                    .files
                    .iter()
                    .map(|file| rebase(base_dir, file))
                    .collect(),
                count_column: obj.count_column.unwrap_or_default(),
                sample_limit: obj.sample_limit.unwrap_or(DEFAULT_SAMPLE_LIMIT),
            }
        }
    };

    if request.files.is_empty() {
        return Err(CountMatrixError::InvalidConfig(format!(
            "group {} lists no files",
            request.label
        )));
    }
    if request.format == InputFormat::Gct && request.files.len() != 1 {
        return Err(CountMatrixError::InvalidConfig(format!(
            "group {}: a gct group takes exactly one file",
            request.label
        )));
    }
    if request.sample_limit == 0 {
        return Err(CountMatrixError::InvalidConfig(format!(
            "group {}: sample_limit must be at least 1",
            request.label
        )));
    }
    Ok(request)
}

fn rebase(base_dir: &Utf8Path, path: &str) -> Utf8PathBuf {
    let path = Utf8Path::new(path);
    if path.is_absolute() || base_dir == Utf8Path::new(".") {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Template reproducing the angiosarcoma / IDC / GTEx breast tissue layout.
pub fn default_config() -> Config {
    let star_group = |label: &str| {
        GroupEntry::Detailed(GroupEntryObject {
            label: label.to_string(),
            format: Some(InputFormat::StarCounts),
            files: (1..=DEFAULT_SAMPLE_LIMIT)
                .map(|i| format!("{label}_dat/{label}{i}.tsv"))
                .collect(),
            count_column: Some(CountColumn::Unstranded),
            sample_limit: None,
        })
    };
    Config {
        schema_version: Some(1),
        output_dir: Some(DEFAULT_OUTPUT_DIR.to_string()),
        count_matrix: Some(DEFAULT_COUNT_MATRIX.to_string()),
        coldata: Some(DEFAULT_COLDATA.to_string()),
        cross_join: Some(JoinStrategy::Inner),
        groups: vec![
            star_group("asc"),
            star_group("idc"),
            GroupEntry::Detailed(GroupEntryObject {
                label: "healthy".to_string(),
                format: Some(InputFormat::Gct),
                files: vec![
                    "gene_reads_2017-06-05_v8_breast_mammary_tissue.gct/healthy.gct".to_string(),
                ],
                count_column: None,
                sample_limit: Some(DEFAULT_SAMPLE_LIMIT),
            }),
        ],
    }
}
