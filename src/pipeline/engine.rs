use std::collections::HashMap;

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::{AnnotError, ConfigError, SampleError};
use crate::model::atlas::ReferenceAtlas;
use crate::model::config::{AnnotateConfig, DEFAULT_SD_THRESHOLD, GeneSelection, Mode};
use crate::model::matrix::ExpressionMatrix;
use crate::model::result::{BatchResult, ClassificationResult, LabelScore, SampleOutcome};
use crate::pipeline::finetune::{self, FineTuneInputs, argmax_label};
use crate::pipeline::gene_select::{self, CommonGenes, GeneSelectInputs, GeneSet};
use crate::pipeline::score::{self, ScoreInputs};

/// Classify every query sample against the reference atlas.
///
/// Reference and configuration validation failures abort the call before any
/// worker is dispatched; per-sample failures are isolated into `Failed`
/// entries. The outcome order matches the query sample order regardless of
/// worker completion order.
pub fn classify(
    query: &ExpressionMatrix,
    atlas: &ReferenceAtlas,
    clusters: Option<&HashMap<String, String>>,
    config: &AnnotateConfig,
) -> Result<BatchResult, AnnotError> {
    config.validate()?;

    let universe = atlas.label_universe(config.granularity)?;
    let label_samples = atlas.label_samples(config.granularity)?;

    let collapsed;
    let query = match config.mode {
        Mode::Cell => query,
        Mode::Cluster => {
            let map = clusters.ok_or(ConfigError::MissingClusterMap)?;
            collapsed = query.collapse_clusters(map)?;
            &collapsed
        }
    };

    let common = CommonGenes::build(atlas.data(), query);
    let sd_threshold = resolve_sd_threshold(atlas, &config.gene_selection);

    let gene_inputs = GeneSelectInputs {
        reference: atlas.data(),
        common: &common,
        label_samples: &label_samples,
        precomputed_de: atlas.precomputed_de(config.granularity),
        sd_threshold,
    };
    let score_inputs = ScoreInputs {
        reference: atlas.data(),
        query,
        label_samples: &label_samples,
    };

    // The coarse gene set is sample-independent ("sd" globally, "de" over the
    // full label universe), so it is materialized once before dispatch and
    // shared read-only across workers.
    let coarse = gene_select::select(&gene_inputs, &config.gene_selection, &universe);
    if let Err(error) = &coarse {
        warn!(%error, "coarse gene selection failed, every sample will be reported as failed");
    }

    info!(
        n_samples = query.n_samples(),
        n_labels = universe.len(),
        n_common_genes = common.len(),
        workers = config.workers,
        "classification started"
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| ConfigError::WorkerPool(e.to_string()))?;

    let outcomes: Vec<SampleOutcome> = pool.install(|| {
        (0..query.n_samples())
            .into_par_iter()
            .map(|sample| {
                classify_sample(
                    sample,
                    &query.samples()[sample],
                    &coarse,
                    &universe,
                    &gene_inputs,
                    &score_inputs,
                    config,
                )
            })
            .collect()
    });

    let batch = BatchResult::new(outcomes);
    info!(
        n_classified = batch.n_classified,
        n_failed = batch.n_failed,
        "classification finished"
    );
    Ok(batch)
}

fn resolve_sd_threshold(atlas: &ReferenceAtlas, selection: &GeneSelection) -> f64 {
    let configured = match selection {
        GeneSelection::Sd { threshold } => *threshold,
        _ => None,
    };
    configured
        .or(atlas.sd_threshold())
        .unwrap_or(DEFAULT_SD_THRESHOLD)
}

fn classify_sample(
    sample: usize,
    sample_name: &str,
    coarse: &Result<GeneSet, SampleError>,
    universe: &[String],
    gene_inputs: &GeneSelectInputs<'_>,
    score_inputs: &ScoreInputs<'_>,
    config: &AnnotateConfig,
) -> SampleOutcome {
    let failed = |error: SampleError| {
        warn!(sample = %sample_name, %error, "sample failed");
        SampleOutcome::Failed {
            sample: sample_name.to_string(),
            error,
        }
    };

    let genes = match coarse {
        Ok(genes) => genes,
        Err(error) => return failed(*error),
    };

    let coarse_scores =
        match score::score(score_inputs, sample, genes, universe, config.quantile) {
            Ok(scores) => scores,
            Err(error) => return failed(error),
        };

    let first_label = argmax_label(universe, &coarse_scores);
    let delta = score_delta(&coarse_scores);

    let (label, iteration_cap_hit, trace) = if config.fine_tune && universe.len() > 1 {
        let inputs = FineTuneInputs {
            genes: gene_inputs,
            scorer: score_inputs,
            quantile: config.quantile,
            threshold: config.fine_tune_threshold,
            keep_trace: config.keep_trace,
        };
        match finetune::finetune(&inputs, sample, universe, &coarse_scores) {
            Ok(outcome) => (outcome.label, outcome.iteration_cap_hit, outcome.trace),
            Err(error) => return failed(error),
        }
    } else {
        (first_label.clone(), false, Vec::new())
    };

    let scores = universe
        .iter()
        .zip(coarse_scores.iter())
        .map(|(label, &score)| LabelScore {
            label: label.clone(),
            score,
        })
        .collect();

    SampleOutcome::Classified(ClassificationResult {
        sample: sample_name.to_string(),
        label,
        first_label,
        delta,
        scores,
        iteration_cap_hit,
        trace: config.keep_trace.then_some(trace),
    })
}

/// Margin between the top and runner-up scores of a coarse row.
fn score_delta(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sorted[0] - sorted[1]
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/engine.rs"]
mod tests;
