use super::*;

use crate::stats::spearman;

fn matrix_from_columns(
    genes: &[&str],
    samples: &[&str],
    columns: &[Vec<f64>],
) -> ExpressionMatrix {
    let n_samples = samples.len();
    let mut values = vec![0.0f64; genes.len() * n_samples];
    for (s, column) in columns.iter().enumerate() {
        for (g, &v) in column.iter().enumerate() {
            values[g * n_samples + s] = v;
        }
    }
    ExpressionMatrix::new(
        genes.iter().map(|s| s.to_string()).collect(),
        samples.iter().map(|s| s.to_string()).collect(),
        values,
    )
    .unwrap()
}

const GENES: [&str; 10] = ["g0", "g1", "g2", "g3", "g4", "g5", "g6", "g7", "g8", "g9"];

fn ascending() -> Vec<f64> {
    (1..=10).map(|v| v as f64).collect()
}

fn descending() -> Vec<f64> {
    (1..=10).rev().map(|v| v as f64).collect()
}

fn scattered() -> Vec<f64> {
    vec![3.0, 1.0, 4.0, 1.5, 9.0, 2.6, 5.0, 3.5, 7.0, 0.5]
}

// Labels a (two rank-identical increasing profiles), b (two decreasing),
// c (one scattered profile).
fn reference() -> ExpressionMatrix {
    let a2: Vec<f64> = ascending().iter().map(|v| v * 2.0).collect();
    let b2: Vec<f64> = descending().iter().map(|v| v * 1.5).collect();
    matrix_from_columns(
        &GENES,
        &["a1", "a2", "b1", "b2", "c1"],
        &[ascending(), a2, descending(), b2, scattered()],
    )
}

// Order-preserving perturbation of the increasing profile.
fn query() -> ExpressionMatrix {
    matrix_from_columns(
        &GENES,
        &["q0"],
        &[vec![1.0, 2.1, 2.9, 4.2, 5.0, 6.1, 6.9, 8.05, 9.0, 10.2]],
    )
}

fn label_samples() -> BTreeMap<String, Vec<usize>> {
    let mut map = BTreeMap::new();
    map.insert("a".to_string(), vec![0, 1]);
    map.insert("b".to_string(), vec![2, 3]);
    map.insert("c".to_string(), vec![4]);
    map
}

fn all_genes() -> GeneSet {
    GeneSet {
        ref_rows: (0..10).collect(),
        query_rows: (0..10).collect(),
    }
}

fn candidates() -> Vec<String> {
    vec!["a".to_string(), "b".to_string(), "c".to_string()]
}

#[test]
fn test_one_score_per_candidate() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };

    let scores = score(&inputs, 0, &all_genes(), &candidates(), 0.8).unwrap();
    assert_eq!(scores.len(), 3);
}

#[test]
fn test_rank_identical_label_scores_one() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };

    let scores = score(&inputs, 0, &all_genes(), &candidates(), 0.8).unwrap();
    // Both "a" profiles are rank-identical to the query, so every coefficient
    // is 1 and any quantile of them is 1.
    assert!((scores[0] - 1.0).abs() < 1e-9);
    assert!((scores[1] + 1.0).abs() < 1e-9);
    assert!(scores[0] > scores[2] + 0.5);
}

#[test]
fn test_singleton_label_passes_coefficient_through() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };

    let scores = score(&inputs, 0, &all_genes(), &candidates(), 0.8).unwrap();
    let query_vec = query.gather(0, &(0..10).collect::<Vec<_>>());
    let direct = spearman(&query_vec, &scattered());
    assert_eq!(scores[2].to_bits(), direct.to_bits());
}

#[test]
fn test_quantile_aggregation_over_two_samples() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };
    let query_vec = query.gather(0, &(0..10).collect::<Vec<_>>());

    let scores = score(&inputs, 0, &all_genes(), &["b".to_string()], 0.8).unwrap();
    let c1 = spearman(&query_vec, &descending());
    let c2 = spearman(
        &query_vec,
        &descending().iter().map(|v| v * 1.5).collect::<Vec<_>>(),
    );
    let (lo, hi) = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
    let expected = lo + 0.8 * (hi - lo);
    assert!((scores[0] - expected).abs() < 1e-12);
}

#[test]
fn test_empty_gene_set_is_an_error() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };

    let err = score(&inputs, 0, &GeneSet::default(), &candidates(), 0.8).unwrap_err();
    assert_eq!(err, SampleError::InsufficientGeneOverlap);
}

#[test]
fn test_score_determinism_bits() {
    let reference = reference();
    let query = query();
    let labels = label_samples();
    let inputs = ScoreInputs {
        reference: &reference,
        query: &query,
        label_samples: &labels,
    };

    let first = score(&inputs, 0, &all_genes(), &candidates(), 0.8).unwrap();
    let second = score(&inputs, 0, &all_genes(), &candidates(), 0.8).unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
