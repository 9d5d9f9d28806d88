use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CountMatrixError {
    #[error("missing config file kira-cm.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid group label: {0}")]
    InvalidGroupLabel(String),

    #[error("invalid group specifier: {0}")]
    InvalidGroupSpecifier(String),

    #[error("config file already exists: {0}")]
    ConfigExists(PathBuf),

    #[error("failed to open input {path}: {message}")]
    InputOpen { path: PathBuf, message: String },

    #[error("{path}: missing column `{column}` in header")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: {message}")]
    MalformedHeader { path: PathBuf, message: String },

    #[error("{path}:{line} {message}")]
    MalformedRow {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("{path}:{line} invalid gene id `{value}`")]
    InvalidGeneId {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("group {0} has no samples")]
    EmptyGroup(String),

    #[error("duplicate column name {0} in merged table")]
    DuplicateColumn(String),

    #[error("count matrix is empty after dropping incomplete rows")]
    EmptyMatrix,

    #[error("coldata does not match count matrix columns: {0}")]
    ColdataMismatch(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
