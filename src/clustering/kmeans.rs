// src/clustering/kmeans.rs

use linfa::prelude::*;
use linfa_clustering::KMeans;
use log::debug;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clustering::{group_into_themes, ClusteringError, ThemeClusterer};
use crate::models::{FeedbackRecord, Theme};

const KMEANS_MAX_ITERATIONS: u64 = 300;
const KMEANS_TOLERANCE: f64 = 1e-4;
const KMEANS_RUNS: usize = 10;

/// Seeded k-means over L2-normalised embeddings, so Euclidean distance ranks
/// points the way cosine similarity does.
#[derive(Debug, Clone)]
pub struct KMeansThemeClusterer {
    seed: u64,
}

impl KMeansThemeClusterer {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Cluster index for every vector, in input order.
    pub fn assign(&self, vectors: &[Vec<f32>], k: usize) -> Result<Vec<usize>, ClusteringError> {
        if k == 0 {
            return Err(ClusteringError::Algorithm("cluster count must be at least 1".to_string()));
        }
        if vectors.len() < k {
            return Err(ClusteringError::InsufficientData {
                found: vectors.len(),
                required: k,
            });
        }

        let n_samples = vectors.len();
        let n_features = vectors[0].len();
        let mut data = Array2::<f64>::zeros((n_samples, n_features));
        for (i, vector) in vectors.iter().enumerate() {
            if vector.len() != n_features {
                return Err(ClusteringError::DimensionMismatch {
                    expected: n_features,
                    actual: vector.len(),
                });
            }
            let norm = vector
                .iter()
                .map(|&v| (v as f64) * (v as f64))
                .sum::<f64>()
                .sqrt();
            for (j, &value) in vector.iter().enumerate() {
                data[[i, j]] = if norm > 0.0 { value as f64 / norm } else { 0.0 };
            }
        }

        // Dummy targets for unsupervised fitting
        let dataset = DatasetBase::new(data.clone(), Array1::<usize>::zeros(n_samples));
        let model = KMeans::params_with_rng(k, StdRng::seed_from_u64(self.seed))
            .n_runs(KMEANS_RUNS)
            .max_n_iterations(KMEANS_MAX_ITERATIONS)
            .tolerance(KMEANS_TOLERANCE)
            .fit(&dataset)
            .map_err(|e| {
                ClusteringError::Algorithm(format!(
                    "failed to cluster {} vectors into {} clusters: {}",
                    n_samples, k, e
                ))
            })?;

        let mut assignments = Array1::<usize>::zeros(n_samples);
        model.predict_inplace(&data, &mut assignments);
        debug!("k-means assigned {} vectors to {} clusters", n_samples, k);
        Ok(assignments.to_vec())
    }
}

impl ThemeClusterer for KMeansThemeClusterer {
    fn cluster(&self, records: &[FeedbackRecord], k: usize) -> Result<Vec<Theme>, ClusteringError> {
        let vectors: Vec<Vec<f32>> = records.iter().map(|r| r.vector.clone()).collect();
        let assignments = self.assign(&vectors, k)?;
        Ok(group_into_themes(records, &assignments, k))
    }
}
