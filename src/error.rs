use camino::Utf8PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CdmError {
    #[error("failed to read {path}: {message}")]
    Io { path: Utf8PathBuf, message: String },

    #[error("failed to decompress {path}: {message}")]
    Decompression { path: Utf8PathBuf, message: String },

    #[error("invalid UTF-8 in {path} at line {line}")]
    Decode { path: Utf8PathBuf, line: usize },

    #[error("protein id {protein_id} in {path} does not match any CDS protein_id in the GFF3 file")]
    UnknownProtein {
        protein_id: String,
        path: Utf8PathBuf,
    },

    #[error("missing config file cdm-features.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid manifest {path}: {message}")]
    Manifest { path: Utf8PathBuf, message: String },

    #[error("invalid input selection: {0}")]
    InvalidInput(String),

    #[error("failed to write output: {0}")]
    Output(String),
}

impl CdmError {
    pub fn io(path: &camino::Utf8Path, err: impl std::fmt::Display) -> Self {
        CdmError::Io {
            path: path.to_owned(),
            message: err.to_string(),
        }
    }
}
