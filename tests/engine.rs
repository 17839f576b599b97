use std::sync::Arc;

use lifecache_lib::analysis::{
    AnalysisConfig, AnalysisEngine, ClusteringCapability, DominantEmotion, Emotion, EmotionScorer,
    EmotionWeights, EngineResult, ProfileAggregator, SentimentScorer, SentimentScores, Summarizer,
    SummaryOrder, ThemeClusterer,
};

struct FlatSentiment;

impl SentimentScorer for FlatSentiment {
    fn polarity_scores(&self, _text: &str) -> EngineResult<SentimentScores> {
        Ok(SentimentScores {
            compound: 0.0,
            pos: 0.0,
            neg: 0.0,
            neu: 1.0,
        })
    }
}

const HAPPY: &str = "I am so happy and grateful today";
const LONELY: &str = "I miss my mother so much, I feel alone";

fn scorer() -> EmotionScorer {
    EmotionScorer::with_default_sentiment().unwrap()
}

#[test]
fn test_weights_are_a_distribution() {
    let scorer = scorer();
    for text in [
        HAPPY,
        LONELY,
        "Thank you for every lesson, dear son.",
        "I was furious and scared, but I remember the good days.",
        "The bus was late.",
    ] {
        let score = scorer.score(text).unwrap();
        assert!(score.weights.values().all(|w| *w >= 0.0), "{text}");
        if !score.weights.is_empty() {
            let total: f64 = score.weights.values().sum();
            assert!((total - 1.0).abs() < 4e-4, "{text}: {total}");
        }
    }
}

#[test]
fn test_blank_text_is_neutral() {
    let scorer = scorer();
    for text in ["", "   "] {
        let score = scorer.score(text).unwrap();
        assert_eq!(score.dominant_emotion, DominantEmotion::Neutral);
        assert!(score.weights.is_empty());
        assert_eq!(score.sentiment, SentimentScores::default());
    }
}

#[test]
fn test_tie_goes_to_earlier_label() {
    let scorer = EmotionScorer::new(Arc::new(FlatSentiment)).unwrap();
    for _ in 0..3 {
        let score = scorer.score("so angry and sad").unwrap();
        assert_eq!(score.weights.get(&Emotion::Sorrow), Some(&0.5));
        assert_eq!(score.weights.get(&Emotion::Anger), Some(&0.5));
        assert_eq!(score.dominant_emotion, DominantEmotion::Label(Emotion::Sorrow));
    }
}

#[test]
fn test_aggregate_edge_cases() {
    let aggregator = ProfileAggregator;
    let none: Vec<EmotionWeights> = vec![];
    assert!(aggregator.aggregate(&none).is_empty());
    assert!(aggregator.aggregate(&[EmotionWeights::new()]).is_empty());

    let joy: EmotionWeights = [(Emotion::Joy, 1.0)].into_iter().collect();
    let sorrow: EmotionWeights = [(Emotion::Sorrow, 1.0)].into_iter().collect();
    let profile = aggregator.aggregate(&[joy, sorrow]);
    assert_eq!(profile.len(), 2);
    assert_eq!(profile.get(Emotion::Joy), Some(0.5));
    assert_eq!(profile.get(Emotion::Sorrow), Some(0.5));
}

#[test]
fn test_cluster_label_bounds() {
    let clusterer = ThemeClusterer::new(ClusteringCapability::Available);
    let empty: [&str; 0] = [];
    for k in 1..4 {
        let assignment = clusterer.cluster(&empty, k).unwrap();
        assert!(assignment.labels.is_empty());
        assert!(assignment.themes.is_empty());
    }

    let texts = [
        "the garden roses bloomed",
        "roses in the garden again",
        "tax forms and receipts",
        "receipts for the tax office",
        "a trip to the sea",
    ];
    for k in 1..8 {
        let assignment = clusterer.cluster(&texts, k).unwrap();
        assert_eq!(assignment.labels.len(), texts.len());
        let bound = k.min(texts.len()).max(1);
        let mut distinct = assignment.labels.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert!(distinct.len() <= bound, "k={k}");
        assert!(assignment.labels.iter().all(|l| *l < bound));
    }
}

#[test]
fn test_unavailable_clustering_is_single_cluster() {
    let clusterer = ThemeClusterer::new(ClusteringCapability::Unavailable);
    let assignment = clusterer.cluster(&["one", "two", "three"], 3).unwrap();
    assert_eq!(assignment.labels, vec![0, 0, 0]);
    assert_eq!(assignment.themes, vec!["cluster_0"]);
}

#[test]
fn test_short_text_is_not_summarized() {
    let summarizer = Summarizer::lexrank(SummaryOrder::Document);
    assert_eq!(summarizer.summarize("", 5).unwrap(), "");

    let hundred_words = vec!["word."; 100].join("  ");
    assert_eq!(summarizer.summarize(&hundred_words, 5).unwrap(), hundred_words);
}

#[test]
fn test_end_to_end_fragments() {
    let scorer = scorer();
    let first = scorer.score(HAPPY).unwrap();
    let second = scorer.score(LONELY).unwrap();

    assert!(matches!(
        first.dominant_emotion,
        DominantEmotion::Label(Emotion::Joy | Emotion::Gratitude)
    ));
    assert!(matches!(
        second.dominant_emotion,
        DominantEmotion::Label(Emotion::Sorrow | Emotion::Fear)
    ));

    let profile = ProfileAggregator.aggregate([&first.weights, &second.weights]);
    let weight = |e| profile.get(e).unwrap_or(0.0);
    let positive = weight(Emotion::Joy) + weight(Emotion::Gratitude);
    let negative = weight(Emotion::Sorrow) + weight(Emotion::Fear);
    assert!(positive > 0.0 && negative > 0.0);
    assert!(positive + negative > 0.5 * profile.total());
}

#[test]
fn test_engine_matches_components() {
    let engine = AnalysisEngine::new(AnalysisConfig::default()).unwrap();
    let result = engine.analyze([HAPPY, "", LONELY]).unwrap();

    assert_eq!(result.summary, format!("{HAPPY}\n\n{LONELY}"));
    assert_eq!(result.themes.len(), 2);
    let total: f64 = result.emotion_profile.iter().map(|(_, w)| w).sum();
    assert!((total - 1.0).abs() < 4e-4);
}
