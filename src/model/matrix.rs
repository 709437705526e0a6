use std::collections::HashMap;

use crate::error::{ConfigError, ReferenceError};

/// Dense expression matrix: genes on the row axis, samples on the column
/// axis, values stored gene-major. Gene identifiers are unique per matrix.
#[derive(Debug, Clone)]
pub struct ExpressionMatrix {
    genes: Vec<String>,
    samples: Vec<String>,
    values: Vec<f64>,
    gene_index: HashMap<String, usize>,
}

impl ExpressionMatrix {
    pub fn new(
        genes: Vec<String>,
        samples: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, ReferenceError> {
        if genes.is_empty() || samples.is_empty() {
            return Err(ReferenceError::EmptyMatrix);
        }
        if values.len() != genes.len() * samples.len() {
            return Err(ReferenceError::ShapeMismatch {
                values: values.len(),
                genes: genes.len(),
                samples: samples.len(),
            });
        }

        let mut gene_index = HashMap::with_capacity(genes.len());
        for (row, gene) in genes.iter().enumerate() {
            if gene_index.insert(gene.clone(), row).is_some() {
                return Err(ReferenceError::DuplicateGene(gene.clone()));
            }
        }

        Ok(Self {
            genes,
            samples,
            values,
            gene_index,
        })
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn gene_row(&self, gene: &str) -> Option<usize> {
        self.gene_index.get(gene).copied()
    }

    #[inline]
    pub fn value(&self, gene: usize, sample: usize) -> f64 {
        self.values[gene * self.samples.len() + sample]
    }

    /// Expression of one gene across all samples.
    pub fn row(&self, gene: usize) -> &[f64] {
        let n = self.samples.len();
        &self.values[gene * n..(gene + 1) * n]
    }

    /// Expression of one sample restricted to the given gene rows, in row
    /// order.
    pub fn gather(&self, sample: usize, gene_rows: &[usize]) -> Vec<f64> {
        gene_rows.iter().map(|&g| self.value(g, sample)).collect()
    }

    /// Collapse sample columns into per-cluster arithmetic means. Clusters
    /// are emitted in order of first appearance; every sample must carry an
    /// assignment.
    pub fn collapse_clusters(
        &self,
        assignment: &HashMap<String, String>,
    ) -> Result<ExpressionMatrix, ConfigError> {
        let mut cluster_order: Vec<String> = Vec::new();
        let mut cluster_of: Vec<usize> = Vec::with_capacity(self.samples.len());
        let mut cluster_ids: HashMap<String, usize> = HashMap::new();

        for sample in &self.samples {
            let cluster = assignment
                .get(sample)
                .ok_or_else(|| ConfigError::MissingClusterAssignment(sample.clone()))?;
            let id = match cluster_ids.get(cluster.as_str()) {
                Some(&id) => id,
                None => {
                    let id = cluster_order.len();
                    cluster_order.push(cluster.clone());
                    cluster_ids.insert(cluster.clone(), id);
                    id
                }
            };
            cluster_of.push(id);
        }

        let n_clusters = cluster_order.len();
        let mut sizes = vec![0usize; n_clusters];
        for &c in &cluster_of {
            sizes[c] += 1;
        }

        let mut values = vec![0.0f64; self.genes.len() * n_clusters];
        for gene in 0..self.genes.len() {
            let row = self.row(gene);
            let out = &mut values[gene * n_clusters..(gene + 1) * n_clusters];
            for (sample, &v) in row.iter().enumerate() {
                out[cluster_of[sample]] += v;
            }
            for (c, slot) in out.iter_mut().enumerate() {
                *slot /= sizes[c] as f64;
            }
        }

        // Gene axis is unchanged, so the index carries over as-is.
        Ok(ExpressionMatrix {
            genes: self.genes.clone(),
            samples: cluster_order,
            values,
            gene_index: self.gene_index.clone(),
        })
    }
}
