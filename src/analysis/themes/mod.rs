//! Theme clustering over fragment texts.
//!
//! Whether real clustering is available is decided once, when the clusterer is
//! built. The degraded path returns the same shape as a genuine single-cluster
//! result and never reports an error.

pub mod kmeans;
pub mod vectorizer;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use self::kmeans::KMeans;
use self::vectorizer::TfIdfVectorizer;
use super::config::AnalysisConfig;
use super::error::{AnalysisError, EngineResult};
use crate::log_info;

const ENABLE_LOGS: bool = true;

/// Per-text cluster labels plus the sorted theme names present among them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeAssignment {
    pub labels: Vec<usize>,
    pub themes: Vec<String>,
}

impl ThemeAssignment {
    fn from_labels(labels: Vec<usize>) -> Self {
        let present: BTreeSet<usize> = labels.iter().copied().collect();
        let themes = present.into_iter().map(theme_name).collect();
        Self { labels, themes }
    }
}

pub fn theme_name(label: usize) -> String {
    format!("cluster_{label}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusteringCapability {
    Available,
    Unavailable,
}

impl ClusteringCapability {
    /// Available when the crate is built with `clustering` and the setting allows it.
    pub fn detect(config: &AnalysisConfig) -> Self {
        if cfg!(feature = "clustering") && config.clustering_enabled {
            ClusteringCapability::Available
        } else {
            ClusteringCapability::Unavailable
        }
    }
}

/// Assigns a label in `[0, k)` to each text. `texts` is non-empty and `1 <= k <= texts.len()`.
pub trait ThemeStrategy: Send + Sync {
    fn assign(&self, texts: &[&str], k: usize) -> EngineResult<Vec<usize>>;
}

/// TF-IDF rows partitioned by seeded k-means.
#[derive(Debug, Clone, Default)]
pub struct KMeansThemes {
    vectorizer: TfIdfVectorizer,
}

impl KMeansThemes {
    pub fn new(vectorizer: TfIdfVectorizer) -> Self {
        Self { vectorizer }
    }
}

impl ThemeStrategy for KMeansThemes {
    fn assign(&self, texts: &[&str], k: usize) -> EngineResult<Vec<usize>> {
        let matrix = self.vectorizer.fit_transform(texts);
        if matrix.n_features() == 0 {
            return Ok(vec![0; texts.len()]);
        }
        let fit = KMeans::new(k).fit_predict(&matrix.rows, matrix.n_features())?;
        Ok(fit.labels)
    }
}

/// Everything lands in cluster 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleClusterThemes;

impl ThemeStrategy for SingleClusterThemes {
    fn assign(&self, texts: &[&str], _k: usize) -> EngineResult<Vec<usize>> {
        Ok(vec![0; texts.len()])
    }
}

#[derive(Clone)]
pub struct ThemeClusterer {
    strategy: Arc<dyn ThemeStrategy>,
    capability: ClusteringCapability,
}

impl ThemeClusterer {
    pub fn new(capability: ClusteringCapability) -> Self {
        let strategy: Arc<dyn ThemeStrategy> = match capability {
            ClusteringCapability::Available => Arc::new(KMeansThemes::default()),
            ClusteringCapability::Unavailable => {
                log_info!("clustering unavailable, every fragment will share cluster_0");
                Arc::new(SingleClusterThemes)
            }
        };
        Self {
            strategy,
            capability,
        }
    }

    pub fn with_strategy(strategy: Arc<dyn ThemeStrategy>, capability: ClusteringCapability) -> Self {
        Self {
            strategy,
            capability,
        }
    }

    pub fn capability(&self) -> ClusteringCapability {
        self.capability
    }

    pub fn cluster<S: AsRef<str>>(&self, texts: &[S], k: usize) -> EngineResult<ThemeAssignment> {
        if k == 0 {
            return Err(AnalysisError::InvalidClusterCount(k));
        }
        if texts.is_empty() {
            return Ok(ThemeAssignment::default());
        }

        let borrowed: Vec<&str> = texts.iter().map(AsRef::as_ref).collect();
        let effective_k = effective_cluster_count(k, borrowed.len());
        let labels = self.strategy.assign(&borrowed, effective_k)?;
        Ok(ThemeAssignment::from_labels(labels))
    }
}

pub fn effective_cluster_count(k: usize, n_texts: usize) -> usize {
    k.min(n_texts).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available() -> ThemeClusterer {
        ThemeClusterer::new(ClusteringCapability::Available)
    }

    #[test]
    fn test_empty_input_gives_empty_assignment() {
        let empty: [&str; 0] = [];
        for k in [1, 4, 50] {
            let result = available().cluster(&empty, k).unwrap();
            assert!(result.labels.is_empty());
            assert!(result.themes.is_empty());
        }
    }

    #[test]
    fn test_zero_clusters_is_rejected_before_work() {
        let empty: [&str; 0] = [];
        assert_eq!(
            available().cluster(&empty, 0),
            Err(AnalysisError::InvalidClusterCount(0))
        );
        assert_eq!(
            available().cluster(&["one text"], 0),
            Err(AnalysisError::InvalidClusterCount(0))
        );
    }

    #[test]
    fn test_label_count_is_bounded() {
        let texts = [
            "we went fishing at the lake every summer",
            "the lake cabin smelled of pine and smoke",
            "grandpa taught me to bake sourdough bread",
            "the bakery on main street sold rye bread",
            "my first day of school was terrifying",
        ];
        for k in 1..=8 {
            let result = available().cluster(&texts, k).unwrap();
            assert_eq!(result.labels.len(), texts.len());
            let distinct: BTreeSet<usize> = result.labels.iter().copied().collect();
            assert!(distinct.len() <= effective_cluster_count(k, texts.len()));
            assert!(result.labels.iter().all(|&l| l < effective_cluster_count(k, texts.len())));
            assert_eq!(result.themes.len(), distinct.len());
        }
    }

    #[test]
    fn test_themes_are_sorted_names_of_present_labels() {
        let result = ThemeAssignment::from_labels(vec![2, 0, 2, 11]);
        assert_eq!(result.themes, vec!["cluster_0", "cluster_2", "cluster_11"]);
    }

    #[test]
    fn test_unavailable_capability_falls_back() {
        let clusterer = ThemeClusterer::new(ClusteringCapability::Unavailable);
        let result = clusterer
            .cluster(&["apples and pears", "rockets to the moon", "jazz in paris"], 3)
            .unwrap();
        assert_eq!(result.labels, vec![0, 0, 0]);
        assert_eq!(result.themes, vec!["cluster_0"]);
    }

    #[test]
    fn test_detect_honours_setting() {
        let config = AnalysisConfig {
            clustering_enabled: false,
            ..AnalysisConfig::default()
        };
        assert_eq!(ClusteringCapability::detect(&config), ClusteringCapability::Unavailable);
    }

    #[test]
    fn test_texts_without_tokens_share_one_cluster() {
        let result = available().cluster(&["a", "!", "i"], 3).unwrap();
        assert_eq!(result.labels, vec![0, 0, 0]);
        assert_eq!(result.themes, vec!["cluster_0"]);
    }

    #[test]
    fn test_distinct_topics_separate() {
        let texts = [
            "fishing at the lake with dad",
            "fishing trips at the lake",
            "baking bread in grandma kitchen",
            "grandma kitchen smelled of bread",
        ];
        let result = available().cluster(&texts, 2).unwrap();
        assert_eq!(result.labels[0], result.labels[1]);
        assert_eq!(result.labels[2], result.labels[3]);
        assert_ne!(result.labels[0], result.labels[2]);
        assert_eq!(result.themes, vec!["cluster_0", "cluster_1"]);
    }

    #[test]
    fn test_clustering_is_reproducible() {
        let texts = ["red roses", "blue sky", "red wine", "blue ocean", "green grass"];
        let first = available().cluster(&texts, 3).unwrap();
        let second = available().cluster(&texts, 3).unwrap();
        assert_eq!(first, second);
    }
}
