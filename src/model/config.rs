use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Cell,
    Cluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    AllTypes,
    MainTypes,
}

/// How the variable gene set is chosen for the coarse pass.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneSelection {
    /// Genes whose standard deviation across all reference samples exceeds
    /// the threshold (atlas-precomputed or [`DEFAULT_SD_THRESHOLD`] when
    /// `None`). Candidate-independent, computed once per reference.
    Sd { threshold: Option<f64> },
    /// Union of top-N differential genes over all candidate label pairs.
    De,
    /// Explicit gene list, intersected with both matrices.
    List(Vec<String>),
}

pub const DEFAULT_SD_THRESHOLD: f64 = 1.0;
pub const DEFAULT_QUANTILE: f64 = 0.8;
pub const DEFAULT_FINE_TUNE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    pub mode: Mode,
    pub gene_selection: GeneSelection,
    pub quantile: f64,
    pub fine_tune: bool,
    pub fine_tune_threshold: f64,
    pub granularity: Granularity,
    pub workers: usize,
    pub keep_trace: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Cell,
            gene_selection: GeneSelection::De,
            quantile: DEFAULT_QUANTILE,
            fine_tune: true,
            fine_tune_threshold: DEFAULT_FINE_TUNE_THRESHOLD,
            granularity: Granularity::AllTypes,
            workers: default_workers(),
            keep_trace: false,
        }
    }
}

impl AnnotateConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.quantile > 0.0 && self.quantile <= 1.0) {
            return Err(ConfigError::InvalidQuantile(self.quantile));
        }
        if !(self.fine_tune_threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(self.fine_tune_threshold));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        match &self.gene_selection {
            GeneSelection::Sd {
                threshold: Some(t),
            } if !(*t >= 0.0) => Err(ConfigError::InvalidSdThreshold(*t)),
            GeneSelection::List(genes) if genes.is_empty() => Err(ConfigError::EmptyGeneList),
            _ => Ok(()),
        }
    }
}

/// Available parallelism minus one, with a floor of one worker.
pub fn default_workers() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}
