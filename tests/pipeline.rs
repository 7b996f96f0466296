//! End-to-end library flow with an in-memory collection and a scripted
//! chat model: ingest → topic query → parse → report → chat.

use std::collections::VecDeque;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use topic_harness::chunk_plan::TEXT_DEFAULT;
use topic_harness::client::{QueryOptions, StoreClient};
use topic_harness::config::Config;
use topic_harness::driver::{analyze_corpus, chat_loop, AnalyzeSettings, DriverError};
use topic_harness::llm::ChatModel;
use topic_harness::models::{ChatTurn, Role};
use topic_harness::parser::ParsedResponse;
use topic_harness::progress::NoProgress;
use topic_harness::prompt::Prompter;
use topic_harness::scoring::PlaceholderScorer;
use topic_harness::session::SessionContext;
use topic_harness::store::memory::InMemoryCollection;

/// Replies in order; an exhausted script answers with an empty string.
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, messages: &[ChatTurn]) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(messages.to_vec());
        Ok(self.replies.lock().unwrap().pop_front().unwrap_or_default())
    }
}

type TestPrompter = Prompter<Cursor<Vec<u8>>, Vec<u8>>;

fn prompter(input: &str) -> TestPrompter {
    Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

fn output(p: &TestPrompter) -> String {
    String::from_utf8(p.writer().clone()).unwrap()
}

fn options() -> QueryOptions {
    QueryOptions {
        top_k: 4,
        timeout: Duration::from_secs(5),
        retries: 1,
    }
}

fn corpus(root: &Path) {
    fs::create_dir_all(root.join("docs")).unwrap();
    fs::write(
        root.join("docs/onboarding.txt"),
        "Customers found onboarding slow. The welcome call was confusing.",
    )
    .unwrap();
    fs::write(
        root.join("docs/pricing.md"),
        "# Pricing\n\nAnnual billing is cheaper than monthly billing.",
    )
    .unwrap();
    fs::write(root.join("docs/logo.png"), [0u8, 1, 2, 3]).unwrap();
}

fn settings(root: &Path) -> AnalyzeSettings {
    AnalyzeSettings {
        database: "default_database".into(),
        collection: "default_collection".into(),
        source_dir: root.join("docs"),
        focus: None,
        plan: TEXT_DEFAULT,
        report_path: root.join("output/topic_analysis_report.md"),
    }
}

const JSON_ANSWER: &str = r#"{"top_topics": [
  {"topic_name": "Onboarding", "description": "First-week experience", "frequency": 3,
   "importance": 0.9, "example_mentions": ["The welcome call was confusing."],
   "related_topics": ["Support"], "source": "onboarding.txt"},
  {"topic_name": "Pricing", "description": "Plan costs", "frequency": 2,
   "importance": 0.6, "example_mentions": [], "source": "pricing.md"}
]}"#;

#[tokio::test]
async fn analysis_writes_report_with_topics_and_stats() {
    colored::control::set_override(false);
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let model = ScriptedModel::new(&[JSON_ANSWER]);
    let client = StoreClient::new(store.clone(), model.clone(), options());
    let settings = settings(tmp.path());
    let mut p = prompter("");

    let outcome = analyze_corpus(
        &mut p,
        &client,
        &settings,
        &Config::default(),
        None,
        &NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome.ingest.added, 2);
    assert_eq!(store.document_count(), 2);
    assert!(outcome.report_written);

    let ParsedResponse::Topics(topics) = &outcome.parsed else {
        panic!("expected topics");
    };
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].name, "Onboarding");

    let report = fs::read_to_string(&settings.report_path).unwrap();
    assert_eq!(report, outcome.report);
    assert!(report.contains("### 1. Onboarding"));
    assert!(report.contains("### 2. Pricing"));
    assert!(report.contains("1. The welcome call was confusing. (source: onboarding.txt)"));
    assert!(report.contains("No specific examples were found for this topic."));
    assert!(report.contains("| Documents | 2 |"));
    assert!(output(&p).contains("Report has been saved to"));

    // The topic exchange seeds the chat history.
    assert_eq!(outcome.session.history().len(), 2);
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn rerun_skips_documents_already_stored() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let model = ScriptedModel::new(&[JSON_ANSWER, JSON_ANSWER]);
    let client = StoreClient::new(store.clone(), model, options());
    let settings = settings(tmp.path());
    let config = Config::default();

    let first = analyze_corpus(&mut prompter(""), &client, &settings, &config, None, &NoProgress)
        .await
        .unwrap();
    let original = store.document_text("doc_0").unwrap();

    let second = analyze_corpus(&mut prompter(""), &client, &settings, &config, None, &NoProgress)
        .await
        .unwrap();

    assert_eq!(first.ingest.added, 2);
    assert_eq!(second.ingest.added, 0);
    assert_eq!(second.ingest.skipped, 2);
    assert_eq!(store.document_count(), 2);
    assert_eq!(store.document_text("doc_0").unwrap(), original);
}

#[tokio::test]
async fn empty_topic_answer_is_fatal() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let client = StoreClient::new(store, ScriptedModel::new(&["   "]), options());
    let settings = settings(tmp.path());

    let err = analyze_corpus(
        &mut prompter(""),
        &client,
        &settings,
        &Config::default(),
        None,
        &NoProgress,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DriverError>(),
        Some(DriverError::EmptyTopicResponse(_))
    ));
    assert!(!settings.report_path.exists());
}

#[tokio::test]
async fn unstructured_answer_is_reported_verbatim() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let answer = "The documents mostly discuss onboarding.\n\nAlso: pricing.";
    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let client = StoreClient::new(store, ScriptedModel::new(&[answer]), options());
    let settings = settings(tmp.path());

    let outcome = analyze_corpus(
        &mut prompter(""),
        &client,
        &settings,
        &Config::default(),
        None,
        &NoProgress,
    )
    .await
    .unwrap();

    assert_eq!(outcome.parsed, ParsedResponse::Raw(answer.to_string()));
    let report = fs::read_to_string(&settings.report_path).unwrap();
    assert!(report.contains(&format!("## Response\n\n{}\n", answer)));
}

#[tokio::test]
async fn unwritable_report_is_printed_instead() {
    colored::control::set_override(false);
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());
    fs::write(tmp.path().join("blocker"), "a file, not a directory").unwrap();

    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let client = StoreClient::new(store, ScriptedModel::new(&[JSON_ANSWER]), options());
    let mut settings = settings(tmp.path());
    settings.report_path = tmp.path().join("blocker/report.md");
    let mut p = prompter("");

    let outcome = analyze_corpus(
        &mut p,
        &client,
        &settings,
        &Config::default(),
        None,
        &NoProgress,
    )
    .await
    .unwrap();

    assert!(!outcome.report_written);
    let shown = output(&p);
    assert!(shown.contains("Could not write the report:"));
    assert!(shown.contains("### 1. Onboarding"));
}

#[tokio::test]
async fn placeholder_scores_are_labelled() {
    let tmp = TempDir::new().unwrap();
    corpus(tmp.path());

    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let client = StoreClient::new(store, ScriptedModel::new(&[JSON_ANSWER]), options());
    let scorer = PlaceholderScorer {
        context_relevance: 0.8,
        semantic_similarity: 0.75,
    };

    let outcome = analyze_corpus(
        &mut prompter(""),
        &client,
        &settings(tmp.path()),
        &Config::default(),
        Some(&scorer),
        &NoProgress,
    )
    .await
    .unwrap();

    assert!(outcome.report.contains("placeholder heuristics"));
    assert!(outcome.report.contains("Confidence 40.0%"));
}

#[tokio::test]
async fn chat_loop_records_only_answered_turns() {
    colored::control::set_override(false);
    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let model = ScriptedModel::new(&["Onboarding is slow.", ""]);
    let client = StoreClient::new(store, model.clone(), options());
    let mut session = SessionContext::new("be grounded");

    let mut p = prompter("What is slow?\n\nAnd pricing?\nEXIT\nnever asked\n");
    chat_loop(&mut p, &client, &mut session).await.unwrap();

    assert_eq!(model.call_count(), 2);
    let history = session.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], ChatTurn::user("What is slow?"));
    assert_eq!(history[1].role, Role::Assistant);

    // The second call carried the first exchange as history.
    let calls = model.calls.lock().unwrap();
    assert_eq!(calls[1].len(), 4);

    let shown = output(&p);
    assert!(shown.contains("Assistant: Onboarding is slow."));
    assert!(shown.contains("Error querying the collection:"));
    assert!(shown.contains("Goodbye!"));
}

#[tokio::test]
async fn chat_loop_ends_at_end_of_input() {
    let store = Arc::new(InMemoryCollection::new(TEXT_DEFAULT));
    let model = ScriptedModel::new(&["an answer"]);
    let client = StoreClient::new(store, model.clone(), options());
    let mut session = SessionContext::new("x");

    chat_loop(&mut prompter("one question\n"), &client, &mut session)
        .await
        .unwrap();
    assert_eq!(model.call_count(), 1);
    assert_eq!(session.history().len(), 2);
}
