use super::*;

use std::collections::BTreeMap;

use crate::model::matrix::ExpressionMatrix;
use crate::pipeline::gene_select::CommonGenes;

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

struct Fixture {
    reference: ExpressionMatrix,
    query: ExpressionMatrix,
    common: CommonGenes,
    labels: BTreeMap<String, Vec<usize>>,
}

impl Fixture {
    fn new() -> Self {
        let ascending: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let a2: Vec<f64> = ascending.iter().map(|v| v * 2.0).collect();
        let descending: Vec<f64> = (1..=10).rev().map(|v| v as f64).collect();
        let b2: Vec<f64> = descending.iter().map(|v| v * 1.5).collect();
        let scattered = vec![3.0, 1.0, 4.0, 1.5, 9.0, 2.6, 5.0, 3.5, 7.0, 0.5];

        let reference = matrix_from_columns(
            &GENES,
            &["a1", "a2", "b1", "b2", "c1"],
            &[ascending, a2, descending, b2, scattered],
        );
        let query = matrix_from_columns(
            &GENES,
            &["q0"],
            &[vec![1.0, 2.1, 2.9, 4.2, 5.0, 6.1, 6.9, 8.05, 9.0, 10.2]],
        );
        let common = CommonGenes::build(&reference, &query);

        let mut labels = BTreeMap::new();
        labels.insert("a".to_string(), vec![0, 1]);
        labels.insert("b".to_string(), vec![2, 3]);
        labels.insert("c".to_string(), vec![4]);

        Self {
            reference,
            query,
            common,
            labels,
        }
    }

    fn gene_inputs(&self) -> GeneSelectInputs<'_> {
        GeneSelectInputs {
            reference: &self.reference,
            common: &self.common,
            label_samples: &self.labels,
            precomputed_de: None,
            sd_threshold: 1.0,
        }
    }

    fn score_inputs(&self) -> ScoreInputs<'_> {
        ScoreInputs {
            reference: &self.reference,
            query: &self.query,
            label_samples: &self.labels,
        }
    }
}

fn strings(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_clear_winner_converges_without_rescoring() {
    let fixture = Fixture::new();
    let gene_inputs = fixture.gene_inputs();
    let score_inputs = fixture.score_inputs();
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: true,
    };

    let outcome = finetune(&inputs, 0, &strings(&["a", "b", "c"]), &[1.0, -1.0, 0.1]).unwrap();
    assert_eq!(outcome.label, "a");
    assert!(!outcome.iteration_cap_hit);
    assert!(outcome.trace.is_empty());
}

#[test]
fn test_close_race_rescored_on_narrowed_set() {
    let fixture = Fixture::new();
    let gene_inputs = fixture.gene_inputs();
    let score_inputs = fixture.score_inputs();
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: true,
    };

    // "c" misses the margin, "a" and "b" survive and get re-scored on a
    // fresh differential gene set.
    let outcome = finetune(&inputs, 0, &strings(&["a", "b", "c"]), &[1.0, 0.98, 0.2]).unwrap();
    assert_eq!(outcome.label, "a");
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace[0].candidates, strings(&["a", "b"]));
    assert_eq!(outcome.trace[0].scores.len(), 2);
    assert_eq!(outcome.trace[0].n_genes, 10);
}

#[test]
fn test_trace_candidate_sets_strictly_shrink() {
    let fixture = Fixture::new();
    let gene_inputs = fixture.gene_inputs();
    let score_inputs = fixture.score_inputs();
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: true,
    };

    let initial = strings(&["a", "b", "c"]);
    let outcome = finetune(&inputs, 0, &initial, &[0.5, 0.48, 0.47]).unwrap();
    let mut previous = initial.len();
    for round in &outcome.trace {
        assert!(round.candidates.len() < previous);
        previous = round.candidates.len();
    }
    assert!(initial.contains(&outcome.label));
}

#[test]
fn test_all_tied_forces_out_one_label() {
    let fixture = Fixture::new();
    let gene_inputs = fixture.gene_inputs();
    let score_inputs = fixture.score_inputs();
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: true,
    };

    // Equal scores eliminate nothing at the margin; the forced removal drops
    // exactly one label, then the real re-score decides between a and b.
    let outcome = finetune(&inputs, 0, &strings(&["a", "b", "c"]), &[0.5, 0.5, 0.5]).unwrap();
    assert_eq!(outcome.label, "a");
    assert_eq!(outcome.trace.len(), 1);
    assert_eq!(outcome.trace[0].candidates, strings(&["a", "b"]));
}

#[test]
fn test_indistinguishable_pair_keeps_first_sorted_label() {
    let fixture = Fixture::new();
    let mut labels = BTreeMap::new();
    // x and y point at the two rank-identical increasing profiles, so every
    // re-score ties and the earlier label must win.
    labels.insert("x".to_string(), vec![0]);
    labels.insert("y".to_string(), vec![1]);

    let gene_inputs = GeneSelectInputs {
        reference: &fixture.reference,
        common: &fixture.common,
        label_samples: &labels,
        precomputed_de: None,
        sd_threshold: 1.0,
    };
    let score_inputs = ScoreInputs {
        reference: &fixture.reference,
        query: &fixture.query,
        label_samples: &labels,
    };
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: false,
    };

    let outcome = finetune(&inputs, 0, &strings(&["x", "y"]), &[0.3, 0.3]).unwrap();
    assert_eq!(outcome.label, "x");
    assert!(!outcome.iteration_cap_hit);
}

#[test]
fn test_empty_initial_set_is_an_error() {
    let fixture = Fixture::new();
    let gene_inputs = fixture.gene_inputs();
    let score_inputs = fixture.score_inputs();
    let inputs = FineTuneInputs {
        genes: &gene_inputs,
        scorer: &score_inputs,
        quantile: 0.8,
        threshold: 0.05,
        keep_trace: false,
    };

    let err = finetune(&inputs, 0, &[], &[]).unwrap_err();
    assert_eq!(err, SampleError::EmptyCandidateSet);
}

#[test]
fn test_argmax_ties_keep_earlier_label() {
    assert_eq!(argmax_label(&strings(&["a", "b"]), &[0.5, 0.5]), "a");
    assert_eq!(argmax_label(&strings(&["a", "b"]), &[0.4, 0.5]), "b");
}
