use std::collections::BTreeMap;

use crate::error::ReferenceError;
use crate::model::config::Granularity;
use crate::model::matrix::ExpressionMatrix;

/// Unordered label pair, stored sorted so (a, b) and (b, a) collide.
pub fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Labeled reference of pure cell-type expression profiles.
///
/// Fine labels are mandatory, one per sample. Main labels are an optional
/// coarser taxonomy; the fine-to-main mapping must be many-to-one, which is
/// checked at construction so classification never starts against an
/// inconsistent reference.
#[derive(Debug, Clone)]
pub struct ReferenceAtlas {
    data: ExpressionMatrix,
    types: Vec<String>,
    main_types: Option<Vec<String>>,
    sd_threshold: Option<f64>,
    de_genes: Option<BTreeMap<(String, String), Vec<String>>>,
    de_genes_main: Option<BTreeMap<(String, String), Vec<String>>>,
}

impl ReferenceAtlas {
    pub fn new(
        data: ExpressionMatrix,
        types: Vec<String>,
        main_types: Option<Vec<String>>,
    ) -> Result<Self, ReferenceError> {
        if types.len() != data.n_samples() {
            return Err(ReferenceError::LabelArity {
                labels: types.len(),
                samples: data.n_samples(),
            });
        }
        if let Some(main) = &main_types {
            if main.len() != data.n_samples() {
                return Err(ReferenceError::LabelArity {
                    labels: main.len(),
                    samples: data.n_samples(),
                });
            }
            let mut fine_to_main: BTreeMap<&str, &str> = BTreeMap::new();
            for (fine, main) in types.iter().zip(main.iter()) {
                match fine_to_main.get(fine.as_str()) {
                    Some(&seen) if seen != main.as_str() => {
                        return Err(ReferenceError::InvalidLabelMapping {
                            fine: fine.clone(),
                            first: seen.to_string(),
                            second: main.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        fine_to_main.insert(fine, main);
                    }
                }
            }
        }

        Ok(Self {
            data,
            types,
            main_types,
            sd_threshold: None,
            de_genes: None,
            de_genes_main: None,
        })
    }

    /// Attach a precomputed variance threshold for "sd" gene selection.
    pub fn with_sd_threshold(mut self, threshold: f64) -> Self {
        self.sd_threshold = Some(threshold);
        self
    }

    /// Attach precomputed per-label-pair differential gene sets.
    pub fn with_de_genes(
        mut self,
        granularity: Granularity,
        genes: BTreeMap<(String, String), Vec<String>>,
    ) -> Self {
        match granularity {
            Granularity::AllTypes => self.de_genes = Some(genes),
            Granularity::MainTypes => self.de_genes_main = Some(genes),
        }
        self
    }

    pub fn data(&self) -> &ExpressionMatrix {
        &self.data
    }

    pub fn sd_threshold(&self) -> Option<f64> {
        self.sd_threshold
    }

    pub fn precomputed_de(
        &self,
        granularity: Granularity,
    ) -> Option<&BTreeMap<(String, String), Vec<String>>> {
        match granularity {
            Granularity::AllTypes => self.de_genes.as_ref(),
            Granularity::MainTypes => self.de_genes_main.as_ref(),
        }
    }

    /// Per-sample labels under the requested granularity.
    pub fn sample_labels(&self, granularity: Granularity) -> Result<&[String], ReferenceError> {
        match granularity {
            Granularity::AllTypes => Ok(&self.types),
            Granularity::MainTypes => self
                .main_types
                .as_deref()
                .ok_or(ReferenceError::MissingMainLabels),
        }
    }

    /// Sorted unique label universe under the requested granularity. All
    /// score rows share this axis, which also fixes the deterministic
    /// tie-break order.
    pub fn label_universe(&self, granularity: Granularity) -> Result<Vec<String>, ReferenceError> {
        let labels = self.sample_labels(granularity)?;
        let mut universe: Vec<String> = labels.to_vec();
        universe.sort();
        universe.dedup();
        Ok(universe)
    }

    /// Sample column indices per label under the requested granularity.
    pub fn label_samples(
        &self,
        granularity: Granularity,
    ) -> Result<BTreeMap<String, Vec<usize>>, ReferenceError> {
        let labels = self.sample_labels(granularity)?;
        let mut map: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (sample, label) in labels.iter().enumerate() {
            map.entry(label.clone()).or_default().push(sample);
        }
        Ok(map)
    }
}
