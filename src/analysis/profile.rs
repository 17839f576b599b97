use serde::{Deserialize, Serialize};

use super::emotion::{Emotion, EmotionWeights};
use super::round4;

/// Capsule-level emotion distribution.
///
/// Fractions sum to one whenever the profile is non-empty; a capsule with no
/// emotional signal has an empty profile rather than eight zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionProfile(EmotionWeights);

impl EmotionProfile {
    pub fn get(&self, emotion: Emotion) -> Option<f64> {
        self.0.get(&emotion).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `(label, fraction)` pairs in label declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        self.0.iter().map(|(emotion, value)| (*emotion, *value))
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn as_weights(&self) -> &EmotionWeights {
        &self.0
    }
}

impl From<EmotionWeights> for EmotionProfile {
    fn from(weights: EmotionWeights) -> Self {
        Self(weights)
    }
}

/// Sums per-fragment weights and renormalizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileAggregator;

impl ProfileAggregator {
    pub fn aggregate<'a, I>(&self, scores: I) -> EmotionProfile
    where
        I: IntoIterator<Item = &'a EmotionWeights>,
    {
        let mut accumulated = EmotionWeights::new();
        for weights in scores {
            for (emotion, weight) in weights {
                *accumulated.entry(*emotion).or_insert(0.0) += *weight;
            }
        }

        let total: f64 = accumulated.values().sum();
        if total <= 0.0 {
            return EmotionProfile::default();
        }

        accumulated
            .into_iter()
            .map(|(emotion, value)| (emotion, round4(value / total)))
            .filter(|(_, value)| *value > 0.0)
            .collect::<EmotionWeights>()
            .into()
    }
}
