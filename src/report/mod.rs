use std::collections::BTreeMap;

use crate::model::result::BatchResult;

pub mod json;
pub mod text;

/// Batch-level summary for the CLI report.
#[derive(Debug, Clone)]
pub struct Summary {
    pub n_samples: usize,
    pub n_classified: usize,
    pub n_failed: usize,
    pub label_counts: BTreeMap<String, usize>,
}

impl Summary {
    pub fn from_batch(batch: &BatchResult) -> Self {
        Self {
            n_samples: batch.outcomes.len(),
            n_classified: batch.n_classified,
            n_failed: batch.n_failed,
            label_counts: batch.label_counts(),
        }
    }
}
