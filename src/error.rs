use serde::Serialize;
use thiserror::Error;

/// Reference-side validation errors. Any of these abort the whole
/// classification call before worker dispatch.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference matrix has no genes or no samples")]
    EmptyMatrix,
    #[error("duplicate gene identifier: {0}")]
    DuplicateGene(String),
    #[error("matrix value count {values} does not match {genes} genes x {samples} samples")]
    ShapeMismatch {
        values: usize,
        genes: usize,
        samples: usize,
    },
    #[error("{labels} labels supplied for {samples} reference samples")]
    LabelArity { labels: usize, samples: usize },
    #[error("fine label {fine} maps to both main labels {first} and {second}")]
    InvalidLabelMapping {
        fine: String,
        first: String,
        second: String,
    },
    #[error("main-type granularity requested but the reference carries no main labels")]
    MissingMainLabels,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("quantile must lie in (0, 1], got {0}")]
    InvalidQuantile(f64),
    #[error("fine-tune threshold must be non-negative, got {0}")]
    InvalidThreshold(f64),
    #[error("sd threshold must be non-negative, got {0}")]
    InvalidSdThreshold(f64),
    #[error("explicit gene list is empty")]
    EmptyGeneList,
    #[error("worker count must be at least 1")]
    NoWorkers,
    #[error("cluster mode requires a cluster assignment")]
    MissingClusterMap,
    #[error("query sample {0} has no cluster assignment")]
    MissingClusterAssignment(String),
    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Per-sample failures. Isolated: one sample failing never aborts its
/// siblings, the failure is recorded as an error entry in the batch result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleError {
    #[error("no usable genes shared between reference and query for the current candidate set")]
    InsufficientGeneOverlap,
    #[error("fine-tuning candidate set became empty")]
    EmptyCandidateSet,
}

/// Top-level error for a classification call.
#[derive(Debug, Error)]
pub enum AnnotError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
