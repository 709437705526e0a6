use std::collections::BTreeMap;

use crate::error::SampleError;
use crate::model::matrix::ExpressionMatrix;
use crate::pipeline::gene_select::GeneSet;
use crate::stats::{average_ranks, quantile, rank_correlation};

#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub reference: &'a ExpressionMatrix,
    pub query: &'a ExpressionMatrix,
    pub label_samples: &'a BTreeMap<String, Vec<usize>>,
}

/// Score one query sample against every candidate label.
///
/// For each reference sample carrying a candidate label, the Spearman
/// coefficient against the query vector is computed over the gene set; the
/// per-label coefficients are then reduced to the given quantile. Returns one
/// score per candidate, aligned with `candidates`, with no cross-label
/// renormalization.
pub fn score(
    inputs: &ScoreInputs<'_>,
    query_sample: usize,
    genes: &GeneSet,
    candidates: &[String],
    q: f64,
) -> Result<Vec<f64>, SampleError> {
    if genes.is_empty() {
        return Err(SampleError::InsufficientGeneOverlap);
    }

    let query_vec = inputs.query.gather(query_sample, &genes.query_rows);
    let query_ranks = average_ranks(&query_vec);

    let mut scores = Vec::with_capacity(candidates.len());
    for label in candidates {
        let samples = inputs
            .label_samples
            .get(label)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let coefficients: Vec<f64> = samples
            .iter()
            .map(|&s| {
                let ref_vec = inputs.reference.gather(s, &genes.ref_rows);
                spearman_pre_ranked(&query_ranks, &ref_vec)
            })
            .collect();

        scores.push(quantile(&coefficients, q));
    }

    Ok(scores)
}

/// Spearman where the query side is already rank-transformed; it is ranked
/// once per round instead of once per reference sample.
fn spearman_pre_ranked(query_ranks: &[f64], reference_vec: &[f64]) -> f64 {
    let ref_ranks = average_ranks(reference_vec);
    rank_correlation(query_ranks, &ref_ranks)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/score.rs"]
mod tests;
