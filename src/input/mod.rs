use thiserror::Error;

pub mod tsv;

pub use tsv::{align_labels, read_clusters, read_gene_list, read_labels, read_matrix};

/// Errors from the on-disk adapters used by the CLI. File parsing lives
/// here, outside the classification pipeline, which only ever sees in-memory
/// structures.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error in {path} at line {line}: {msg}")]
    Parse {
        path: String,
        line: usize,
        msg: String,
    },
    #[error("reference sample {0} has no label entry")]
    MissingLabel(String),
    #[error("main labels must be present for all samples or none")]
    MixedMainLabels,
    #[error("invalid matrix: {0}")]
    InvalidMatrix(#[from] crate::error::ReferenceError),
}
