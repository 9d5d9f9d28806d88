use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::assemble::{AssemblyStats, GroupStats, GroupTable, assemble_matrix, merge_group};
use crate::coldata::{Coldata, IDX_HEADER, build_coldata};
use crate::config::{GroupRequest, ResolvedConfig, default_config};
use crate::domain::InputFormat;
use crate::error::CountMatrixError;
use crate::fs_util::write_atomic;
use crate::loader::{
    LoadStats, gct_sample_count, load_gct, load_sample, read_column, read_header,
};
use crate::matrix::{GENE_ID_HEADER, verify_columns};
use crate::summary::group_medians;

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub summary: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub count_matrix: String,
    pub coldata: String,
    pub manifest: String,
    pub group_medians: Option<String>,
}

/// Result of a build; also the content of `manifest.json`.
#[derive(Debug, Clone, Serialize)]
pub struct BuildResult {
    pub tool: String,
    pub created_at: String,
    pub dry_run: bool,
    pub inputs: Vec<LoadStats>,
    pub groups: Vec<GroupStats>,
    pub assembly: AssemblyStats,
    pub samples: Vec<String>,
    pub outputs: OutputPaths,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColdataResult {
    pub path: String,
    pub rows: usize,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub count_matrix: String,
    pub coldata: String,
    pub samples: usize,
    pub consistent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct InitResult {
    pub path: String,
    pub groups: usize,
}

#[derive(Debug, Clone, Copy)]
pub enum ProgressSinkKind {
    Build,
    Coldata,
    Check,
    Init,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App {
    config: ResolvedConfig,
}

impl App {
    pub fn new(config: ResolvedConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn build(
        &self,
        options: BuildOptions,
        sink: &dyn ProgressSink,
    ) -> Result<BuildResult, CountMatrixError> {
        let mut inputs = Vec::new();
        let mut group_stats = Vec::new();
        let mut group_tables = Vec::with_capacity(self.config.groups.len());

        for request in &self.config.groups {
            let started = Instant::now();
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Load; group {} ({} file(s), {})",
                    request.label,
                    request.files.len(),
                    request.format
                ),
                elapsed: None,
            });
            let (group, stats) = self.load_group(request, &mut inputs)?;
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Merge; group {}: {} genes across {} samples",
                    stats.label, stats.genes, stats.samples
                ),
                elapsed: Some(started.elapsed()),
            });
            group_tables.push(group);
            group_stats.push(stats);
        }

        let layout = group_tables
            .iter()
            .map(|group| (group.label.clone(), group.table.columns().len()))
            .collect::<Vec<_>>();

        let started = Instant::now();
        let (matrix, assembly) = assemble_matrix(group_tables, self.config.cross_join)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Assemble; {} join kept {} genes x {} samples ({} incomplete rows dropped)",
                assembly.join, assembly.genes, assembly.samples, assembly.incomplete_rows_dropped
            ),
            elapsed: Some(started.elapsed()),
        });

        let coldata = build_coldata(layout.iter().map(|(label, samples)| (label, *samples)));
        matrix.verify_coldata(&coldata)?;

        let medians = options.summary.then(|| {
            let mut offset = 0;
            let groups = layout
                .iter()
                .map(|(label, samples)| {
                    let columns = (offset..offset + samples).collect::<Vec<_>>();
                    offset += samples;
                    (label.to_string(), columns)
                })
                .collect::<Vec<_>>();
            group_medians(&matrix, &groups)
        });

        let outputs = OutputPaths {
            count_matrix: self.config.count_matrix_path().to_string(),
            coldata: self.config.coldata_path().to_string(),
            manifest: self.config.manifest_path().to_string(),
            group_medians: medians
                .as_ref()
                .map(|_| self.config.group_medians_path().to_string()),
        };
        let result = BuildResult {
            tool: format!("kira-cm/{}", env!("CARGO_PKG_VERSION")),
            created_at: chrono::Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            inputs,
            groups: group_stats,
            assembly,
            samples: matrix.samples().to_vec(),
            outputs,
        };

        if options.dry_run {
            sink.event(ProgressEvent {
                message: "phase=Write; dry run, nothing written".to_string(),
                elapsed: None,
            });
            return Ok(result);
        }

        sink.event(ProgressEvent {
            message: format!("phase=Write; {}", self.config.output_dir),
            elapsed: None,
        });
        write_atomic(&self.config.count_matrix_path(), matrix.to_tsv().as_bytes())?;
        write_atomic(&self.config.coldata_path(), coldata.to_tsv().as_bytes())?;
        if let Some(medians) = &medians {
            write_atomic(&self.config.group_medians_path(), medians.to_tsv().as_bytes())?;
        }
        let manifest = serde_json::to_vec_pretty(&result)
            .map_err(|err| CountMatrixError::Filesystem(err.to_string()))?;
        write_atomic(&self.config.manifest_path(), &manifest)?;
        info!(
            genes = result.assembly.genes,
            samples = result.assembly.samples,
            output_dir = %self.config.output_dir,
            "wrote count matrix and coldata"
        );

        Ok(result)
    }

    /// Writes the coldata for the configured groups. Only GCT headers are
    /// read, so a short GCT file gives the same rows `build` would write.
    pub fn coldata(
        &self,
        dry_run: bool,
        sink: &dyn ProgressSink,
    ) -> Result<ColdataResult, CountMatrixError> {
        let mut layout = Vec::with_capacity(self.config.groups.len());
        for group in &self.config.groups {
            let samples = match group.format {
                InputFormat::StarCounts => group.files.len(),
                InputFormat::Gct => group
                    .files
                    .iter()
                    .map(|path| gct_sample_count(path, group.sample_limit))
                    .sum::<Result<usize, _>>()?,
            };
            layout.push((&group.label, samples));
        }
        let coldata = build_coldata(layout);
        let path = self.config.coldata_path();
        sink.event(ProgressEvent {
            message: format!("phase=Write; coldata with {} rows", coldata.len()),
            elapsed: None,
        });
        if !dry_run {
            write_atomic(&path, coldata.to_tsv().as_bytes())?;
        }
        Ok(ColdataResult {
            path: path.to_string(),
            rows: coldata.len(),
            dry_run,
        })
    }

    /// Coldata for the configured layout without reading any input; GCT groups
    /// are assumed to hold `sample_limit` samples.
    pub fn planned_coldata(&self) -> Coldata {
        build_coldata(
            self.config
                .groups
                .iter()
                .map(|group| (&group.label, group.planned_samples())),
        )
    }

    fn load_group(
        &self,
        request: &GroupRequest,
        inputs: &mut Vec<LoadStats>,
    ) -> Result<(GroupTable, GroupStats), CountMatrixError> {
        let tables = match request.format {
            InputFormat::StarCounts => {
                let mut tables = Vec::with_capacity(request.files.len());
                for (i, path) in request.files.iter().enumerate() {
                    let loaded =
                        load_sample(path, &request.label.sample_name(i), request.count_column)?;
                    inputs.push(loaded.stats);
                    tables.push(loaded.table);
                }
                tables
            }
            InputFormat::Gct => {
                let mut tables = Vec::with_capacity(1);
                for path in &request.files {
                    let loaded = load_gct(path, &request.label, request.sample_limit)?;
                    inputs.push(loaded.stats);
                    tables.push(loaded.table);
                }
                tables
            }
        };
        merge_group(request.label.clone(), tables)
    }
}

/// Checks that the coldata `idx` column names the count matrix columns one to
/// one and in order.
pub fn check(
    count_matrix: &Utf8Path,
    coldata: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<CheckResult, CountMatrixError> {
    sink.event(ProgressEvent {
        message: format!("phase=Check; {count_matrix} against {coldata}"),
        elapsed: None,
    });
    let header = read_header(count_matrix, 0)?;
    let columns = match header.split_first() {
        Some((first, rest)) if first == GENE_ID_HEADER => rest.to_vec(),
        _ => {
            return Err(CountMatrixError::MalformedHeader {
                path: count_matrix.as_std_path().to_path_buf(),
                message: format!("first column must be {GENE_ID_HEADER}"),
            });
        }
    };
    let idx = read_column(coldata, 0, IDX_HEADER)?;
    let idx = idx.iter().map(String::as_str).collect::<Vec<_>>();
    verify_columns(&columns, &idx)?;
    Ok(CheckResult {
        count_matrix: count_matrix.to_string(),
        coldata: coldata.to_string(),
        samples: columns.len(),
        consistent: true,
    })
}

/// Writes the default configuration template to `path`.
pub fn init_config(
    path: &Utf8Path,
    force: bool,
    sink: &dyn ProgressSink,
) -> Result<InitResult, CountMatrixError> {
    if path.as_std_path().exists() && !force {
        return Err(CountMatrixError::ConfigExists(
            path.as_std_path().to_path_buf(),
        ));
    }
    let config = default_config();
    let groups = config.groups.len();
    let content = serde_json::to_vec_pretty(&config)
        .map_err(|err| CountMatrixError::Filesystem(err.to_string()))?;
    sink.event(ProgressEvent {
        message: format!("phase=Write; {path}"),
        elapsed: None,
    });
    write_atomic(path, &content)?;
    Ok(InitResult {
        path: path.to_string(),
        groups,
    })
}
