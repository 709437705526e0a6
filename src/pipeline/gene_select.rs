use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::SampleError;
use crate::model::atlas::pair_key;
use crate::model::config::GeneSelection;
use crate::model::matrix::ExpressionMatrix;
use crate::stats::sample_sd;

/// Genes present in both reference and query, in reference row order. All
/// gene selection is restricted to this intersection.
#[derive(Debug, Clone)]
pub struct CommonGenes {
    names: Vec<String>,
    ref_rows: Vec<usize>,
    query_rows: Vec<usize>,
    positions: HashMap<String, usize>,
}

impl CommonGenes {
    pub fn build(reference: &ExpressionMatrix, query: &ExpressionMatrix) -> Self {
        let mut names = Vec::new();
        let mut ref_rows = Vec::new();
        let mut query_rows = Vec::new();
        let mut positions = HashMap::new();

        for (ref_row, gene) in reference.genes().iter().enumerate() {
            if let Some(query_row) = query.gene_row(gene) {
                positions.insert(gene.clone(), names.len());
                names.push(gene.clone());
                ref_rows.push(ref_row);
                query_rows.push(query_row);
            }
        }

        Self {
            names,
            ref_rows,
            query_rows,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, gene: &str) -> Option<usize> {
        self.positions.get(gene).copied()
    }
}

/// Resolved gene set: parallel row indices into the reference and query
/// matrices, in reference row order.
#[derive(Debug, Clone, Default)]
pub struct GeneSet {
    pub ref_rows: Vec<usize>,
    pub query_rows: Vec<usize>,
}

impl GeneSet {
    fn from_common<I: IntoIterator<Item = usize>>(common: &CommonGenes, picks: I) -> Self {
        let mut ref_rows = Vec::new();
        let mut query_rows = Vec::new();
        for k in picks {
            ref_rows.push(common.ref_rows[k]);
            query_rows.push(common.query_rows[k]);
        }
        Self {
            ref_rows,
            query_rows,
        }
    }

    pub fn len(&self) -> usize {
        self.ref_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_rows.is_empty()
    }
}

/// Tunables for the per-pair differential gene count; the count shrinks as
/// the candidate set grows so correlation over many labels is not diluted
/// by weakly discriminative genes.
pub const DE_BASE_GENES: f64 = 500.0;
pub const DE_MIN_GENES: usize = 10;

/// Top-N genes taken in each direction for one label pair:
/// `max(DE_MIN_GENES, round(DE_BASE_GENES * (2/3)^log2(n_labels)))`.
pub fn de_genes_per_pair(n_labels: usize) -> usize {
    if n_labels < 2 {
        return DE_MIN_GENES;
    }
    let scaled = DE_BASE_GENES * (2.0f64 / 3.0).powf((n_labels as f64).log2());
    (scaled.round() as usize).max(DE_MIN_GENES)
}

#[derive(Debug, Clone, Copy)]
pub struct GeneSelectInputs<'a> {
    pub reference: &'a ExpressionMatrix,
    pub common: &'a CommonGenes,
    pub label_samples: &'a BTreeMap<String, Vec<usize>>,
    pub precomputed_de: Option<&'a BTreeMap<(String, String), Vec<String>>>,
    /// Resolved "sd" threshold (config override, atlas value, or default).
    pub sd_threshold: f64,
}

/// Select the variable gene set for the given candidate labels.
pub fn select(
    inputs: &GeneSelectInputs<'_>,
    selection: &GeneSelection,
    candidates: &[String],
) -> Result<GeneSet, SampleError> {
    if inputs.common.is_empty() {
        return Err(SampleError::InsufficientGeneOverlap);
    }

    let set = match selection {
        GeneSelection::Sd { .. } => select_sd(inputs),
        GeneSelection::De => select_de(inputs, candidates),
        GeneSelection::List(genes) => select_list(inputs, genes),
    };

    if set.is_empty() {
        return Err(SampleError::InsufficientGeneOverlap);
    }
    Ok(set)
}

/// Genes whose standard deviation across all reference samples exceeds the
/// threshold. Independent of the candidate set.
fn select_sd(inputs: &GeneSelectInputs<'_>) -> GeneSet {
    let picks = (0..inputs.common.len()).filter(|&k| {
        let row = inputs.reference.row(inputs.common.ref_rows[k]);
        sample_sd(row) > inputs.sd_threshold
    });
    GeneSet::from_common(inputs.common, picks)
}

/// Union over all unordered candidate pairs of the top-N genes by per-label
/// mean difference, N in each direction. Precomputed pair sets take
/// precedence when the atlas carries them.
fn select_de(inputs: &GeneSelectInputs<'_>, candidates: &[String]) -> GeneSet {
    if candidates.len() < 2 {
        return GeneSet::from_common(inputs.common, 0..inputs.common.len());
    }

    let per_pair = de_genes_per_pair(candidates.len());
    let mut picks: BTreeSet<usize> = BTreeSet::new();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let a = &candidates[i];
            let b = &candidates[j];

            if let Some(precomputed) = inputs.precomputed_de {
                if let Some(genes) = precomputed.get(&pair_key(a, b)) {
                    picks.extend(genes.iter().filter_map(|g| inputs.common.position(g)));
                    continue;
                }
            }

            let (Some(samples_a), Some(samples_b)) =
                (inputs.label_samples.get(a), inputs.label_samples.get(b))
            else {
                continue;
            };

            let diffs: Vec<f64> = (0..inputs.common.len())
                .map(|k| {
                    let row = inputs.reference.row(inputs.common.ref_rows[k]);
                    mean_over(row, samples_a) - mean_over(row, samples_b)
                })
                .collect();

            let mut order: Vec<usize> = (0..diffs.len()).collect();
            order.sort_by(|&x, &y| {
                diffs[y]
                    .partial_cmp(&diffs[x])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(x.cmp(&y))
            });

            // top N favoring each direction
            picks.extend(order.iter().take(per_pair).copied());
            picks.extend(order.iter().rev().take(per_pair).copied());
        }
    }

    GeneSet::from_common(inputs.common, picks)
}

fn select_list(inputs: &GeneSelectInputs<'_>, genes: &[String]) -> GeneSet {
    let mut picks: BTreeSet<usize> = BTreeSet::new();
    picks.extend(genes.iter().filter_map(|g| inputs.common.position(g)));
    GeneSet::from_common(inputs.common, picks)
}

fn mean_over(row: &[f64], samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| row[s]).sum::<f64>() / samples.len() as f64
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/gene_select.rs"]
mod tests;
