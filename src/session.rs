//! Per-run conversation state.
//!
//! A [`SessionContext`] is created once per command and handed by reference
//! to every query. The store client reads it; only the driver appends to it.

use crate::models::ChatTurn;

/// Sentence the model is told to answer with when retrieval comes up empty.
pub const NOT_ENOUGH_INFORMATION: &str =
    "The data source doesn't have enough information to answer this.";

/// Instruction for corpus analysis runs (`topics analyze`).
pub const ANALYSIS_INSTRUCTION: &str = "As an expert in content analysis, your task is to examine \
the documents in this collection and provide the requested information based on the given query.

Focus your analysis solely on the content of the collection, without referring to any external sources.";

/// Instruction for single-page chat runs (`topics url`).
pub fn grounded_instruction() -> String {
    format!(
        "You are an AI assistant grounded in the data source provided.\n\
         When answering user queries, provide information only from the given data source.\n\
         If the data source does not contain enough information to answer a query, respond with:\n\
         \"{}\"",
        NOT_ENOUGH_INFORMATION
    )
}

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub system_instruction: String,
    history: Vec<ChatTurn>,
}

impl SessionContext {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            history: Vec::new(),
        }
    }

    /// Prior user/assistant turns, oldest first.
    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Record a completed question/answer pair.
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.history.push(ChatTurn::user(question));
        self.history.push(ChatTurn::assistant(answer));
    }
}

/// Whether an answer is the model's "cannot answer" sentence.
pub fn lacks_information(answer: &str) -> bool {
    answer.contains(NOT_ENOUGH_INFORMATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[test]
    fn exchanges_append_in_order() {
        let mut session = SessionContext::new(ANALYSIS_INSTRUCTION);
        assert!(session.history().is_empty());

        session.push_exchange("q1", "a1");
        session.push_exchange("q2", "a2");

        let roles: Vec<Role> = session.history().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant]
        );
        assert_eq!(session.history()[3].content, "a2");
    }

    #[test]
    fn grounded_instruction_names_fallback_sentence() {
        assert!(lacks_information(&grounded_instruction()));
        assert!(!lacks_information("Rust is a systems language."));
    }
}
