//! Store client: idempotent ingestion and grounded queries.
//!
//! Wraps a [`DocumentCollection`] and a [`ChatModel`]. Adds are skipped for
//! ids the collection already holds; queries retrieve context passages,
//! assemble the conversation, and call the model under a bounded timeout.
//!
//! The session is borrowed immutably: recording a successful exchange is
//! the caller's job.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use thiserror::Error;

use crate::config::{LlmConfig, RetrievalConfig};
use crate::llm::ChatModel;
use crate::models::{ChatTurn, DocumentMetadata, RetrievedChunk};
use crate::session::SessionContext;
use crate::stats::CorpusStats;
use crate::store::{DocumentCollection, StoreError};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("the model returned an empty response")]
    Empty,
    #[error("no response within {timeout:?} after {attempts} attempt(s)")]
    TimedOut { attempts: u32, timeout: Duration },
    #[error("context retrieval failed: {0}")]
    Store(#[from] StoreError),
    #[error("model request failed: {0:#}")]
    Model(anyhow::Error),
}

/// Result of [`StoreClient::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    /// Context passages retrieved per query.
    pub top_k: usize,
    /// Bound on one retrieve-and-answer round-trip.
    pub timeout: Duration,
    /// Extra attempts after a timeout.
    pub retries: u32,
}

impl QueryOptions {
    pub fn from_config(llm: &LlmConfig, retrieval: &RetrievalConfig) -> Self {
        Self {
            top_k: retrieval.top_k,
            timeout: Duration::from_secs(llm.timeout_secs),
            retries: llm.query_retries,
        }
    }
}

pub struct StoreClient {
    collection: Arc<dyn DocumentCollection>,
    model: Arc<dyn ChatModel>,
    options: QueryOptions,
}

impl StoreClient {
    pub fn new(
        collection: Arc<dyn DocumentCollection>,
        model: Arc<dyn ChatModel>,
        options: QueryOptions,
    ) -> Self {
        Self {
            collection,
            model,
            options,
        }
    }

    /// Whether `document_id` is stored. A backend that cannot answer is
    /// treated as "not stored".
    pub async fn exists(&self, document_id: &str) -> Result<bool> {
        match self.collection.exists(document_id).await {
            Ok(found) => Ok(found),
            Err(StoreError::Unsupported(op)) => {
                tracing::debug!(document_id, op, "exists unsupported by store, assuming absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Add a document unless its id is already stored.
    pub async fn add(&self, text: &str, metadata: &DocumentMetadata) -> Result<AddOutcome> {
        if self.exists(&metadata.document_id).await? {
            tracing::info!(
                document_id = %metadata.document_id,
                source = %metadata.source,
                "document already stored, skipping"
            );
            return Ok(AddOutcome::Skipped);
        }

        self.collection.add(text, metadata).await?;
        tracing::info!(
            document_id = %metadata.document_id,
            source = %metadata.source,
            "document added"
        );
        Ok(AddOutcome::Added)
    }

    /// Ask `query_text` against the collection, continuing `session`.
    pub async fn query(
        &self,
        query_text: &str,
        session: &SessionContext,
    ) -> Result<String, QueryError> {
        let attempts = self.options.retries + 1;

        for attempt in 1..=attempts {
            match tokio::time::timeout(self.options.timeout, self.round_trip(query_text, session))
                .await
            {
                Ok(result) => return result,
                Err(_) => {
                    tracing::warn!(
                        attempt,
                        attempts,
                        timeout_secs = self.options.timeout.as_secs_f64(),
                        "query timed out"
                    );
                }
            }
        }

        Err(QueryError::TimedOut {
            attempts,
            timeout: self.options.timeout,
        })
    }

    /// Corpus statistics, or `None` when the backend does not keep them.
    pub async fn stats(&self) -> Result<Option<CorpusStats>> {
        match self.collection.stats().await {
            Ok(stats) => Ok(Some(stats)),
            Err(StoreError::Unsupported(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn round_trip(
        &self,
        query_text: &str,
        session: &SessionContext,
    ) -> Result<String, QueryError> {
        let context = self
            .collection
            .retrieve(query_text, self.options.top_k)
            .await?;
        tracing::debug!(passages = context.len(), "context retrieved");

        let messages = build_messages(session, &context, query_text);
        let answer = self
            .model
            .chat(&messages)
            .await
            .map_err(QueryError::Model)?;
        tracing::debug!(model = self.model.model_name(), chars = answer.len(), "model answered");

        if answer.trim().is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(answer)
    }
}

/// System instruction with numbered context passages, then the session
/// history, then the new question.
pub fn build_messages(
    session: &SessionContext,
    context: &[RetrievedChunk],
    query_text: &str,
) -> Vec<ChatTurn> {
    let mut system = session.system_instruction.trim().to_string();
    if !context.is_empty() {
        system.push_str("\n\nContext:\n");
        for (i, passage) in context.iter().enumerate() {
            system.push_str(&format!(
                "\n[{}] (source: {})\n{}\n",
                i + 1,
                passage.source,
                passage.text.trim()
            ));
        }
    }

    let mut messages = Vec::with_capacity(session.history().len() + 2);
    messages.push(ChatTurn::system(system));
    messages.extend(session.history().iter().cloned());
    messages.push(ChatTurn::user(query_text));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_plan::TEXT_DEFAULT;
    use crate::models::Role;
    use crate::store::memory::InMemoryCollection;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Scripted {
        replies: Mutex<Vec<String>>,
        seen: Mutex<Vec<Vec<ChatTurn>>>,
        delay: Duration,
    }

    impl Scripted {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                seen: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn chat(&self, messages: &[ChatTurn]) -> anyhow::Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
        }
    }

    /// A store that can neither check ids nor report stats.
    struct BareStore {
        adds: Mutex<u32>,
    }

    #[async_trait]
    impl DocumentCollection for BareStore {
        async fn exists(&self, _document_id: &str) -> Result<bool, StoreError> {
            Err(StoreError::Unsupported("exists"))
        }

        async fn add(&self, _text: &str, _metadata: &DocumentMetadata) -> Result<(), StoreError> {
            *self.adds.lock().unwrap() += 1;
            Ok(())
        }

        async fn retrieve(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<RetrievedChunk>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn options() -> QueryOptions {
        QueryOptions {
            top_k: 4,
            timeout: Duration::from_secs(5),
            retries: 1,
        }
    }

    fn meta(id: &str) -> DocumentMetadata {
        DocumentMetadata {
            source: format!("{}.txt", id),
            document_id: id.to_string(),
            file_name: format!("{}.txt", id),
        }
    }

    #[tokio::test]
    async fn second_add_of_same_id_is_skipped() {
        let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
        let client = StoreClient::new(store.clone(), Arc::new(Scripted::new(&[])), options());

        assert_eq!(client.add("first", &meta("doc_0")).await.unwrap(), AddOutcome::Added);
        assert_eq!(client.add("second", &meta("doc_0")).await.unwrap(), AddOutcome::Skipped);
        assert_eq!(store.document_text("doc_0").unwrap(), "first");
        assert_eq!(store.document_count(), 1);
    }

    #[tokio::test]
    async fn unsupported_exists_counts_as_absent() {
        let store = Arc::new(BareStore { adds: Mutex::new(0) });
        let client = StoreClient::new(store.clone(), Arc::new(Scripted::new(&[])), options());

        assert!(!client.exists("doc_0").await.unwrap());
        assert_eq!(client.add("text", &meta("doc_0")).await.unwrap(), AddOutcome::Added);
        assert_eq!(*store.adds.lock().unwrap(), 1);
        assert!(client.stats().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_sends_context_history_and_question() {
        let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
        let model = Arc::new(Scripted::new(&["an answer"]));
        let client = StoreClient::new(store, model.clone(), options());
        client.add("Rust ownership rules", &meta("doc_0")).await.unwrap();

        let mut session = SessionContext::new("be helpful");
        session.push_exchange("earlier question", "earlier answer");

        let answer = client.query("ownership", &session).await.unwrap();
        assert_eq!(answer, "an answer");
        assert_eq!(session.history().len(), 2);

        let seen = model.seen.lock().unwrap();
        let messages = &seen[0];
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("be helpful"));
        assert!(messages[0].content.contains("Rust ownership rules"));
        assert!(messages[0].content.contains("doc_0.txt"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[3], ChatTurn::user("ownership"));
    }

    #[tokio::test]
    async fn blank_answer_is_an_error() {
        let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
        let client = StoreClient::new(store, Arc::new(Scripted::new(&["  \n"])), options());
        let session = SessionContext::new("x");

        let err = client.query("anything", &session).await.unwrap_err();
        assert!(matches!(err, QueryError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_retried_then_reported() {
        let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
        let mut slow = Scripted::new(&["late", "late"]);
        slow.delay = Duration::from_secs(60);
        let model = Arc::new(slow);
        let client = StoreClient::new(
            store,
            model.clone(),
            QueryOptions {
                top_k: 4,
                timeout: Duration::from_secs(1),
                retries: 1,
            },
        );

        let err = client
            .query("anything", &SessionContext::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::TimedOut { attempts: 2, .. }));
        assert_eq!(model.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn messages_without_context_keep_bare_instruction() {
        let session = SessionContext::new("  instruction  ");
        let messages = build_messages(&session, &[], "q");
        assert_eq!(messages[0].content, "instruction");
        assert_eq!(messages.len(), 2);
    }
}
