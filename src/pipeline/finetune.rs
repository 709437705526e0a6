use tracing::{debug, warn};

use crate::error::SampleError;
use crate::model::config::GeneSelection;
use crate::model::result::FineTuneRound;
use crate::pipeline::gene_select::{self, GeneSelectInputs};
use crate::pipeline::score::{self, ScoreInputs};

#[derive(Debug, Clone, Copy)]
pub struct FineTuneInputs<'a> {
    pub genes: &'a GeneSelectInputs<'a>,
    pub scorer: &'a ScoreInputs<'a>,
    pub quantile: f64,
    /// Margin below the round maximum within which labels survive.
    pub threshold: f64,
    pub keep_trace: bool,
}

#[derive(Debug, Clone)]
pub struct FineTuneOutcome {
    pub label: String,
    pub iteration_cap_hit: bool,
    pub trace: Vec<FineTuneRound>,
}

/// Iteratively narrow the candidate label set for one query sample.
///
/// Each round keeps every label scoring within `threshold` of the round
/// maximum; when that eliminates nothing, the single lowest scorer is forced
/// out so the set strictly shrinks. Survivors are re-scored on a fresh
/// differential gene set computed for the narrowed candidate set. The loop
/// terminates at one survivor, or at two by taking the higher final-round
/// score (ties resolved to the first label in the sorted universe).
pub fn finetune(
    inputs: &FineTuneInputs<'_>,
    query_sample: usize,
    initial: &[String],
    initial_scores: &[f64],
) -> Result<FineTuneOutcome, SampleError> {
    debug_assert_eq!(initial.len(), initial_scores.len());

    let mut candidates: Vec<String> = initial.to_vec();
    let mut scores: Vec<f64> = initial_scores.to_vec();
    let cap = candidates.len();
    let mut rounds = 0usize;
    let mut trace: Vec<FineTuneRound> = Vec::new();
    let mut iteration_cap_hit = false;

    if candidates.is_empty() {
        return Err(SampleError::EmptyCandidateSet);
    }

    let label = loop {
        if candidates.len() == 1 {
            break candidates.swap_remove(0);
        }

        // Forced removal makes every round strictly shrinking, so the cap is
        // a guard against invariant breakage, not an expected exit.
        if rounds >= cap {
            warn!(
                query_sample,
                rounds, "fine-tuning iteration cap reached, taking current argmax"
            );
            iteration_cap_hit = true;
            break argmax_label(&candidates, &scores);
        }

        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let cut = max - inputs.threshold;
        let retained = scores.iter().filter(|&&s| s >= cut).count();

        if retained == candidates.len() {
            let mut drop = 0usize;
            for (i, &s) in scores.iter().enumerate() {
                if s <= scores[drop] {
                    drop = i;
                }
            }
            debug!(
                query_sample,
                dropped = %candidates[drop],
                "no label eliminated at margin, forcing out lowest scorer"
            );
            candidates.remove(drop);
            scores.remove(drop);
        } else {
            let mut next_candidates = Vec::with_capacity(retained);
            let mut next_scores = Vec::with_capacity(retained);
            for (candidate, &s) in candidates.iter().zip(scores.iter()) {
                if s >= cut {
                    next_candidates.push(candidate.clone());
                    next_scores.push(s);
                }
            }
            candidates = next_candidates;
            scores = next_scores;
        }

        if candidates.is_empty() {
            warn!(query_sample, ?trace, "fine-tuning candidate set became empty");
            return Err(SampleError::EmptyCandidateSet);
        }
        if candidates.len() == 1 {
            break candidates.swap_remove(0);
        }

        let gene_set = gene_select::select(inputs.genes, &GeneSelection::De, &candidates)?;
        scores = score::score(
            inputs.scorer,
            query_sample,
            &gene_set,
            &candidates,
            inputs.quantile,
        )?;
        rounds += 1;

        if inputs.keep_trace {
            trace.push(FineTuneRound {
                candidates: candidates.clone(),
                n_genes: gene_set.len(),
                scores: scores.clone(),
            });
        }

        if candidates.len() == 2 {
            break argmax_label(&candidates, &scores);
        }
    };

    Ok(FineTuneOutcome {
        label,
        iteration_cap_hit,
        trace,
    })
}

/// First label with the maximal score; ties keep the earlier (sorted) label.
pub fn argmax_label(candidates: &[String], scores: &[f64]) -> String {
    let mut best = 0usize;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    candidates[best].clone()
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/finetune.rs"]
mod tests;
