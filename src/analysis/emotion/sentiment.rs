//! General-purpose sentiment scoring.
//!
//! The emotion scorer only needs a `(compound, pos, neg, neu)` vector, so the
//! capability sits behind [`SentimentScorer`]. [`LexiconSentiment`] is the
//! bundled valence-lexicon implementation: word valences on a -4..4 scale,
//! intensity boosters, negation within three tokens, a contrastive "but"
//! rule and emphasis from capitals and exclamation marks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::error::{AnalysisError, EngineResult, Stage};

const DEFAULT_LEXICON: &str = include_str!("sentiment_lexicon.tsv");

const BOOSTER_INCR: f64 = 0.293;
const BOOSTER_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;
const EXCLAMATION_INCR: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
const LOOKBACK: usize = 3;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "without", "rarely", "seldom", "despite", "aint", "cant", "dont", "doesnt", "didnt", "isnt",
    "wasnt", "arent", "werent", "wont", "wouldnt", "shouldnt", "couldnt", "hasnt", "havent",
    "hadnt",
];

const BOOSTERS_INCR: &[&str] = &[
    "absolutely", "amazingly", "completely", "deeply", "enormously", "entirely", "especially",
    "exceptionally", "extremely", "fully", "greatly", "highly", "hugely", "incredibly", "intensely",
    "more", "most", "much", "particularly", "purely", "really", "remarkably", "so", "such",
    "totally", "tremendously", "truly", "utterly", "very",
];

const BOOSTERS_DECR: &[&str] = &[
    "almost", "barely", "hardly", "kinda", "less", "little", "marginally", "occasionally", "partly",
    "scarcely", "slightly", "somewhat",
];

/// Sentiment vector for one text. `pos + neg + neu == 1` for any text with words.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub compound: f64,
    pub pos: f64,
    pub neg: f64,
    pub neu: f64,
}

/// Injected sentiment capability.
pub trait SentimentScorer: Send + Sync {
    /// Scores a non-empty text. A failure is fatal to the calling analysis.
    fn polarity_scores(&self, text: &str) -> EngineResult<SentimentScores>;
}

#[derive(Debug, Clone)]
pub struct LexiconSentiment {
    valences: HashMap<String, f64>,
}

impl LexiconSentiment {
    /// Builds the analyzer from the bundled lexicon.
    pub fn new() -> EngineResult<Self> {
        Self::from_lexicon(DEFAULT_LEXICON)
    }

    /// Parses `word<whitespace>valence` lines; `#` starts a comment line.
    pub fn from_lexicon(source: &str) -> EngineResult<Self> {
        let mut valences = HashMap::new();
        for (line_no, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(word), Some(raw)) = (parts.next(), parts.next()) else {
                return Err(AnalysisError::computation(
                    Stage::Sentiment,
                    format!("lexicon line {} is malformed", line_no + 1),
                ));
            };
            let valence: f64 = raw.parse().map_err(|_| {
                AnalysisError::computation(
                    Stage::Sentiment,
                    format!("lexicon line {} has invalid valence '{raw}'", line_no + 1),
                )
            })?;
            valences.insert(word.to_lowercase(), valence);
        }
        Ok(Self { valences })
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.valences.get(word).copied()
    }

    fn token_valence(&self, tokens: &[Token], i: usize, caps_differential: bool) -> f64 {
        let token = &tokens[i];
        if booster_scalar(&token.lowered).is_some() {
            return 0.0;
        }
        let Some(mut valence) = self.valence(&token.lowered) else {
            return 0.0;
        };

        if caps_differential && token.shouting {
            valence += CAPS_INCR.copysign(valence);
        }

        for distance in 0..LOOKBACK {
            if i <= distance {
                break;
            }
            let previous = &tokens[i - distance - 1];
            if self.valence(&previous.lowered).is_none() {
                if let Some(mut scalar) = booster_scalar(&previous.lowered) {
                    if valence < 0.0 {
                        scalar = -scalar;
                    }
                    if caps_differential && previous.shouting {
                        scalar += CAPS_INCR.copysign(valence);
                    }
                    valence += match distance {
                        0 => scalar,
                        1 => scalar * 0.95,
                        _ => scalar * 0.9,
                    };
                }
            }
            if is_negation(&previous.lowered) {
                valence *= NEGATION_SCALAR;
            }
        }

        valence
    }
}

impl SentimentScorer for LexiconSentiment {
    fn polarity_scores(&self, text: &str) -> EngineResult<SentimentScores> {
        if text.trim().is_empty() {
            return Ok(SentimentScores::default());
        }

        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(SentimentScores {
                neu: 1.0,
                ..SentimentScores::default()
            });
        }

        let shouting = tokens.iter().filter(|t| t.shouting).count();
        let caps_differential = shouting > 0 && shouting < tokens.len();

        let mut sentiments: Vec<f64> = (0..tokens.len())
            .map(|i| self.token_valence(&tokens, i, caps_differential))
            .collect();

        // Clauses after "but" dominate the ones before it.
        if let Some(pivot) = tokens.iter().position(|t| t.lowered == "but") {
            for (i, valence) in sentiments.iter_mut().enumerate() {
                if i < pivot {
                    *valence *= 0.5;
                } else if i > pivot {
                    *valence *= 1.5;
                }
            }
        }

        Ok(score_valence(&sentiments, text))
    }
}

struct Token {
    lowered: String,
    shouting: bool,
}

fn tokenize(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .filter_map(|raw| {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            if word.chars().count() <= 1 {
                return None;
            }
            let shouting = word.chars().any(char::is_alphabetic)
                && word.chars().all(|c| !c.is_alphabetic() || c.is_uppercase());
            Some(Token {
                lowered: word.to_lowercase().replace(|c: char| c == '\'' || c == '\u{2019}', ""),
                shouting,
            })
        })
        .collect()
}

fn booster_scalar(word: &str) -> Option<f64> {
    if BOOSTERS_INCR.contains(&word) {
        Some(BOOSTER_INCR)
    } else if BOOSTERS_DECR.contains(&word) {
        Some(BOOSTER_DECR)
    } else {
        None
    }
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word)
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(MAX_EXCLAMATIONS);
    let questions = text.matches('?').count();
    let question_emphasis = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * 0.18,
        _ => 0.96,
    };
    exclamations as f64 * EXCLAMATION_INCR + question_emphasis
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn score_valence(sentiments: &[f64], text: &str) -> SentimentScores {
    let emphasis = punctuation_emphasis(text);

    let mut total: f64 = sentiments.iter().sum();
    if total > 0.0 {
        total += emphasis;
    } else if total < 0.0 {
        total -= emphasis;
    }
    let compound = normalize(total);

    let mut pos_sum = 0.0;
    let mut neg_sum = 0.0;
    let mut neutral = 0.0;
    for &valence in sentiments {
        if valence > 0.0 {
            pos_sum += valence + 1.0;
        } else if valence < 0.0 {
            neg_sum += valence - 1.0;
        } else {
            neutral += 1.0;
        }
    }

    if pos_sum > neg_sum.abs() {
        pos_sum += emphasis;
    } else if pos_sum < neg_sum.abs() {
        neg_sum -= emphasis;
    }

    let denominator = pos_sum + neg_sum.abs() + neutral;
    SentimentScores {
        compound,
        pos: (pos_sum / denominator).abs(),
        neg: (neg_sum / denominator).abs(),
        neu: (neutral / denominator).abs(),
    }
}
