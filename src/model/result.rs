use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::SampleError;

/// One label's aggregated score in a coarse score row.
#[derive(Debug, Clone, Serialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

/// One fine-tuning round, retained for diagnostics when tracing is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct FineTuneRound {
    pub candidates: Vec<String>,
    pub n_genes: usize,
    /// Aggregated scores aligned with `candidates`.
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub sample: String,
    /// Final label after fine-tuning (or the coarse argmax when fine-tuning
    /// is disabled).
    pub label: String,
    /// Coarse argmax before fine-tuning.
    pub first_label: String,
    /// Margin between the top and runner-up coarse scores; 0.0 for a
    /// single-label universe.
    pub delta: f64,
    /// Full coarse score row over the label universe.
    pub scores: Vec<LabelScore>,
    pub iteration_cap_hit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<FineTuneRound>>,
}

/// Per-sample outcome: a sample either fully classifies or fails, never a
/// partial result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SampleOutcome {
    Classified(ClassificationResult),
    Failed { sample: String, error: SampleError },
}

impl SampleOutcome {
    pub fn sample(&self) -> &str {
        match self {
            SampleOutcome::Classified(result) => &result.sample,
            SampleOutcome::Failed { sample, .. } => sample,
        }
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            SampleOutcome::Classified(result) => Some(result),
            SampleOutcome::Failed { .. } => None,
        }
    }
}

/// Batch output, one outcome per query sample in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<SampleOutcome>,
    pub n_classified: usize,
    pub n_failed: usize,
}

impl BatchResult {
    pub fn new(outcomes: Vec<SampleOutcome>) -> Self {
        let n_classified = outcomes.iter().filter(|o| o.result().is_some()).count();
        let n_failed = outcomes.len() - n_classified;
        Self {
            outcomes,
            n_classified,
            n_failed,
        }
    }

    /// Assignment counts per final label.
    pub fn label_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            if let Some(result) = outcome.result() {
                *counts.entry(result.label.clone()).or_insert(0) += 1;
            }
        }
        counts
    }
}
