//! Seeded k-means over sparse TF-IDF rows.
//!
//! 1. k-means++ seeding with `2 + ln k` local trials per center
//! 2. Lloyd iterations until labels settle or the centers move less than
//!    `tol` times the mean feature variance
//! 3. `n_init` restarts from one seeded generator, lowest inertia wins
//!
//! Everything is driven by the seed, so identical input yields identical labels.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::vectorizer::SparseVector;
use crate::analysis::error::{AnalysisError, EngineResult, Stage};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;
pub const DEFAULT_TOL: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    n_init: usize,
    max_iter: usize,
    tol: f64,
    seed: u64,
}

/// Outcome of the best restart.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            tol: DEFAULT_TOL,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn fit_predict(&self, rows: &[SparseVector], n_features: usize) -> EngineResult<KMeansFit> {
        if self.n_clusters == 0 {
            return Err(AnalysisError::computation(Stage::Clustering, "n_clusters must be > 0"));
        }
        if rows.len() < self.n_clusters {
            return Err(AnalysisError::computation(
                Stage::Clustering,
                format!("{} samples cannot form {} clusters", rows.len(), self.n_clusters),
            ));
        }
        if let Some(bad) = rows.iter().flat_map(|r| r.indices.iter()).find(|&&i| i >= n_features) {
            return Err(AnalysisError::computation(
                Stage::Clustering,
                format!("feature index {bad} out of range for {n_features} features"),
            ));
        }

        let points: Vec<Point<'_>> = rows
            .iter()
            .map(|row| Point {
                row,
                squared_norm: row.squared_norm(),
            })
            .collect();
        let tolerance = self.tol * mean_variance(rows, n_features);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<KMeansFit> = None;
        for _ in 0..self.n_init {
            let centers = init_plus_plus(&points, n_features, self.n_clusters, &mut rng);
            let fit = self.lloyd(&points, centers, tolerance);
            match &best {
                Some(current) if fit.inertia >= current.inertia => {}
                _ => best = Some(fit),
            }
        }

        best.ok_or_else(|| AnalysisError::computation(Stage::Clustering, "no restart completed"))
    }

    fn lloyd(&self, points: &[Point<'_>], mut centers: Vec<Center>, tolerance: f64) -> KMeansFit {
        let n_features = centers.first().map(|c| c.coords.len()).unwrap_or(0);
        let mut labels = assign(points, &centers).0;
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;

            let mut sums = vec![vec![0.0; n_features]; centers.len()];
            let mut members = vec![0usize; centers.len()];
            for (point, &label) in points.iter().zip(&labels) {
                members[label] += 1;
                for (idx, value) in point.row.iter() {
                    sums[label][idx] += value;
                }
            }

            let mut shift = 0.0;
            for (cluster, center) in centers.iter_mut().enumerate() {
                // Empty clusters keep their previous center.
                if members[cluster] == 0 {
                    continue;
                }
                let count = members[cluster] as f64;
                let updated: Vec<f64> = sums[cluster].iter().map(|s| s / count).collect();
                shift += center
                    .coords
                    .iter()
                    .zip(&updated)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>();
                *center = Center::new(updated);
            }

            let (next_labels, _) = assign(points, &centers);
            let settled = next_labels == labels;
            labels = next_labels;
            if settled || shift <= tolerance {
                break;
            }
        }

        let (labels, inertia) = assign(points, &centers);
        KMeansFit {
            labels,
            inertia,
            iterations,
        }
    }
}

struct Point<'a> {
    row: &'a SparseVector,
    squared_norm: f64,
}

#[derive(Clone)]
struct Center {
    coords: Vec<f64>,
    squared_norm: f64,
}

impl Center {
    fn new(coords: Vec<f64>) -> Self {
        let squared_norm = coords.iter().map(|c| c * c).sum();
        Self { coords, squared_norm }
    }

    fn from_point(point: &Point<'_>, n_features: usize) -> Self {
        let mut coords = vec![0.0; n_features];
        for (idx, value) in point.row.iter() {
            coords[idx] = value;
        }
        Self::new(coords)
    }
}

fn squared_distance(point: &Point<'_>, center: &Center) -> f64 {
    (point.squared_norm - 2.0 * point.row.dot_dense(&center.coords) + center.squared_norm).max(0.0)
}

/// Nearest center per point (lowest index on ties) and the summed squared distance.
fn assign(points: &[Point<'_>], centers: &[Center]) -> (Vec<usize>, f64) {
    let mut inertia = 0.0;
    let labels = points
        .iter()
        .map(|point| {
            let mut best = (0usize, f64::INFINITY);
            for (idx, center) in centers.iter().enumerate() {
                let distance = squared_distance(point, center);
                if distance < best.1 {
                    best = (idx, distance);
                }
            }
            inertia += best.1;
            best.0
        })
        .collect();
    (labels, inertia)
}

fn init_plus_plus(points: &[Point<'_>], n_features: usize, k: usize, rng: &mut StdRng) -> Vec<Center> {
    let n = points.len();
    let local_trials = 2 + (k as f64).ln().floor() as usize;

    let first = Center::from_point(&points[rng.gen_range(0..n)], n_features);
    let mut closest: Vec<f64> = points.iter().map(|p| squared_distance(p, &first)).collect();
    let mut potential: f64 = closest.iter().sum();
    let mut centers = vec![first];

    while centers.len() < k {
        let mut best: Option<(Center, Vec<f64>, f64)> = None;
        for _ in 0..local_trials {
            let target = rng.gen::<f64>() * potential;
            let candidate_idx = search_cumulative(&closest, target);
            let candidate = Center::from_point(&points[candidate_idx], n_features);
            let distances: Vec<f64> = points
                .iter()
                .zip(&closest)
                .map(|(p, &current)| current.min(squared_distance(p, &candidate)))
                .collect();
            let candidate_potential: f64 = distances.iter().sum();
            match &best {
                Some((_, _, best_potential)) if candidate_potential >= *best_potential => {}
                _ => best = Some((candidate, distances, candidate_potential)),
            }
        }
        if let Some((center, distances, candidate_potential)) = best {
            centers.push(center);
            closest = distances;
            potential = candidate_potential;
        }
    }

    centers
}

/// First index whose running sum reaches `target`, clamped to the last index.
fn search_cumulative(weights: &[f64], target: f64) -> usize {
    let mut running = 0.0;
    for (idx, weight) in weights.iter().enumerate() {
        running += weight;
        if running >= target && *weight > 0.0 {
            return idx;
        }
    }
    weights
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(weights.len().saturating_sub(1))
}

fn mean_variance(rows: &[SparseVector], n_features: usize) -> f64 {
    if rows.is_empty() || n_features == 0 {
        return 0.0;
    }
    let n = rows.len() as f64;
    let mut sums = vec![0.0; n_features];
    let mut squares = vec![0.0; n_features];
    for row in rows {
        for (idx, value) in row.iter() {
            sums[idx] += value;
            squares[idx] += value * value;
        }
    }
    let total: f64 = sums
        .iter()
        .zip(&squares)
        .map(|(s, sq)| (sq / n - (s / n) * (s / n)).max(0.0))
        .sum();
    total / n_features as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(values: &[f64]) -> SparseVector {
        let mut row = SparseVector::default();
        for (idx, value) in values.iter().enumerate() {
            if *value != 0.0 {
                row.indices.push(idx);
                row.values.push(*value);
            }
        }
        row
    }

    fn blobs() -> Vec<SparseVector> {
        vec![
            dense(&[1.0, 0.0, 0.0]),
            dense(&[0.9, 0.1, 0.0]),
            dense(&[0.0, 0.0, 1.0]),
            dense(&[0.0, 0.1, 0.9]),
            dense(&[0.95, 0.05, 0.0]),
        ]
    }

    #[test]
    fn test_separates_obvious_groups() {
        let fit = KMeans::new(2).fit_predict(&blobs(), 3).unwrap();
        let labels = fit.labels;
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[4]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_is_deterministic() {
        let rows = blobs();
        let a = KMeans::new(3).fit_predict(&rows, 3).unwrap();
        let b = KMeans::new(3).fit_predict(&rows, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_labels_stay_in_range() {
        let rows = blobs();
        for k in 1..=rows.len() {
            let fit = KMeans::new(k).fit_predict(&rows, 3).unwrap();
            assert_eq!(fit.labels.len(), rows.len());
            assert!(fit.labels.iter().all(|&l| l < k));
        }
    }

    #[test]
    fn test_one_cluster_per_point_has_zero_inertia() {
        let rows = blobs();
        let fit = KMeans::new(rows.len()).fit_predict(&rows, 3).unwrap();
        assert!(fit.inertia < 1e-12);
    }

    #[test]
    fn test_rejects_more_clusters_than_points() {
        let err = KMeans::new(6).fit_predict(&blobs(), 3).unwrap_err();
        assert!(err.is_computation_failure());
    }

    #[test]
    fn test_identical_points_collapse() {
        let rows = vec![dense(&[1.0, 0.0]); 4];
        let fit = KMeans::new(2).fit_predict(&rows, 2).unwrap();
        assert_eq!(fit.inertia, 0.0);
        assert!(fit.labels.iter().all(|&l| l < 2));
    }
}
