//! Per-topic display scores.
//!
//! The three scores are derived from a [`RelevanceScorer`]. No real scorer
//! ships with the crate: [`PlaceholderScorer`] returns configured constants
//! and says so through [`RelevanceScorer::is_placeholder`], which the report
//! prints next to the numbers. Scores never affect topic order.

use anyhow::{bail, Result};

use crate::config::ScoringConfig;
use crate::models::TopicRecord;

pub trait RelevanceScorer: Send + Sync {
    /// How well the retrieved context supports this topic, in [0, 1].
    fn context_relevance(&self, topic: &TopicRecord) -> f64;

    /// Similarity between an answer and the context it came from, in [0, 1].
    fn semantic_similarity(&self, answer: &str, context: &str) -> f64;

    /// Whether a cited source counts as relevant.
    fn is_relevant(&self, source: &str) -> bool;

    /// True when the numbers are stand-ins rather than measurements.
    fn is_placeholder(&self) -> bool {
        false
    }
}

/// Fixed-value scorer. Every source is relevant.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderScorer {
    pub context_relevance: f64,
    pub semantic_similarity: f64,
}

impl PlaceholderScorer {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            context_relevance: config.context_relevance,
            semantic_similarity: config.semantic_similarity,
        }
    }
}

impl RelevanceScorer for PlaceholderScorer {
    fn context_relevance(&self, _topic: &TopicRecord) -> f64 {
        self.context_relevance
    }

    fn semantic_similarity(&self, _answer: &str, _context: &str) -> f64 {
        self.semantic_similarity
    }

    fn is_relevant(&self, _source: &str) -> bool {
        true
    }

    fn is_placeholder(&self) -> bool {
        true
    }
}

/// Percentages in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicScores {
    pub confidence: f64,
    pub grounding: f64,
    pub knowledge_symmetry: f64,
}

pub fn score_topic(scorer: &dyn RelevanceScorer, topic: &TopicRecord) -> TopicScores {
    let signals = &topic.signals;

    let model_confidence = signals.model_confidence.unwrap_or(0.0);
    let confidence = (scorer.context_relevance(topic) + model_confidence) / 2.0 * 100.0;

    let grounding = scorer.semantic_similarity(&signals.answer, &signals.context) * 100.0;

    let total = signals.context_sources.len();
    let knowledge_symmetry = if total == 0 {
        0.0
    } else {
        let relevant = signals
            .context_sources
            .iter()
            .filter(|s| scorer.is_relevant(s))
            .count();
        relevant as f64 / total as f64 * 100.0
    };

    TopicScores {
        confidence,
        grounding,
        knowledge_symmetry,
    }
}

/// Scorer selected by `scoring.mode`; `off` means no scores are shown.
pub fn create_scorer(config: &ScoringConfig) -> Result<Option<Box<dyn RelevanceScorer>>> {
    match config.mode.as_str() {
        "off" => Ok(None),
        "placeholder" => Ok(Some(Box::new(PlaceholderScorer::from_config(config)))),
        other => bail!(
            "Unknown scoring.mode: '{}'. Must be off or placeholder.",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TopicSignals;

    const SCORER: PlaceholderScorer = PlaceholderScorer {
        context_relevance: 0.8,
        semantic_similarity: 0.75,
    };

    #[test]
    fn defaults_without_signals() {
        let scores = score_topic(&SCORER, &TopicRecord::default());
        assert!((scores.confidence - 40.0).abs() < 1e-9);
        assert!((scores.grounding - 75.0).abs() < 1e-9);
        assert_eq!(scores.knowledge_symmetry, 0.0);
    }

    #[test]
    fn model_confidence_and_sources_feed_scores() {
        let topic = TopicRecord {
            signals: TopicSignals {
                model_confidence: Some(0.6),
                context_sources: vec!["a".into(), "b".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let scores = score_topic(&SCORER, &topic);
        assert!((scores.confidence - 70.0).abs() < 1e-9);
        assert!((scores.knowledge_symmetry - 100.0).abs() < 1e-9);
    }

    struct PickyScorer;

    impl RelevanceScorer for PickyScorer {
        fn context_relevance(&self, _topic: &TopicRecord) -> f64 {
            1.0
        }
        fn semantic_similarity(&self, answer: &str, context: &str) -> f64 {
            if context.contains(answer) {
                1.0
            } else {
                0.0
            }
        }
        fn is_relevant(&self, source: &str) -> bool {
            source.ends_with(".md")
        }
    }

    #[test]
    fn custom_scorer_is_consulted() {
        let topic = TopicRecord {
            signals: TopicSignals {
                answer: "rockets".into(),
                context: "the company builds rockets".into(),
                context_sources: vec!["a.md".into(), "b.txt".into(), "c.md".into(), "d.pdf".into()],
                ..Default::default()
            },
            ..Default::default()
        };
        let scores = score_topic(&PickyScorer, &topic);
        assert_eq!(scores.grounding, 100.0);
        assert_eq!(scores.knowledge_symmetry, 50.0);
        assert!(!PickyScorer.is_placeholder());
    }

    #[test]
    fn mode_selects_scorer() {
        let mut config = ScoringConfig::default();
        assert!(create_scorer(&config).unwrap().is_none());

        config.mode = "placeholder".into();
        let scorer = create_scorer(&config).unwrap().unwrap();
        assert!(scorer.is_placeholder());

        config.mode = "magic".into();
        assert!(create_scorer(&config).is_err());
    }
}
