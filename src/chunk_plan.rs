//! Chunking plan selection.
//!
//! Plain-text corpora always get [`TEXT_DEFAULT`]. Other corpora answer four
//! yes/no questions, and the answers are matched against [`DECISION_TABLE`]
//! (first matching row wins; `None` matches either answer).

use crate::chunk::IngestionConfig;

/// Plain-text corpora.
pub const TEXT_DEFAULT: IngestionConfig = IngestionConfig::new(300, 50, 200);
/// Small chunks with heavy overlap for high-detail lookups.
pub const FINE_GRAINED: IngestionConfig = IngestionConfig::new(200, 100, 150);
/// Larger chunks for broad thematic analysis.
pub const BROAD: IngestionConfig = IngestionConfig::new(400, 50, 200);

/// The yes/no questions asked for non-text corpora, in answer order.
pub const QUESTIONS: [&str; 4] = [
    "Do you need precise details such as names, figures, or quotes?",
    "Are the documents dense or highly technical?",
    "Is the corpus small (fewer than about 50 documents)?",
    "Is a broad overview of themes your main goal?",
];

/// One row of the decision table.
pub struct PlanRule {
    pub answers: [Option<bool>; 4],
    pub plan: IngestionConfig,
    pub label: &'static str,
}

pub const DECISION_TABLE: &[PlanRule] = &[
    PlanRule {
        answers: [Some(true), None, None, Some(false)],
        plan: FINE_GRAINED,
        label: "fine-grained",
    },
    PlanRule {
        answers: [Some(true), Some(true), None, None],
        plan: FINE_GRAINED,
        label: "fine-grained",
    },
    PlanRule {
        answers: [None, Some(true), Some(true), Some(false)],
        plan: FINE_GRAINED,
        label: "fine-grained",
    },
    PlanRule {
        answers: [None, None, None, None],
        plan: BROAD,
        label: "broad analysis",
    },
];

/// Look up the plan for a set of answers to [`QUESTIONS`].
pub fn select_plan(answers: [bool; 4]) -> &'static PlanRule {
    DECISION_TABLE
        .iter()
        .find(|rule| {
            rule.answers
                .iter()
                .zip(answers.iter())
                .all(|(want, got)| want.map_or(true, |w| w == *got))
        })
        .unwrap_or(&DECISION_TABLE[DECISION_TABLE.len() - 1])
}
