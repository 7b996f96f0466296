//! Interactive session driver.
//!
//! `topics analyze` walks through these stages in order:
//!
//! ```text
//! CollectConfig → InitStore → ListKnownDatabases → WalkAndIngest →
//! QueryTopics → ParseAndFormat → WriteReport → [ChatLoop] → End
//! ```
//!
//! `topics url` is the single-page variant: fetch one URL, ask for five
//! topics, print them, then chat.
//!
//! Fatal cases are [`DriverError`]s; everything else degrades and carries on.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;
use thiserror::Error;

use crate::chunk::IngestionConfig;
use crate::chunk_plan::{select_plan, QUESTIONS, TEXT_DEFAULT};
use crate::client::{QueryError, QueryOptions, StoreClient};
use crate::config::Config;
use crate::connector_fs::scan_directory;
use crate::connector_url::fetch_url;
use crate::embedding::create_embedder;
use crate::ingest::{ingest_records, IngestSummary};
use crate::llm::create_chat_model;
use crate::parser::{parse_response, ParsedResponse};
use crate::progress::ProgressReporter;
use crate::prompt::Prompter;
use crate::registry::DatabaseRegistry;
use crate::report::{render_console, render_markdown, write_report};
use crate::scoring::{create_scorer, RelevanceScorer};
use crate::session::{
    grounded_instruction, lacks_information, SessionContext, ANALYSIS_INSTRUCTION,
};
use crate::store::sqlite::SqliteCollection;

pub const DEFAULT_DATABASE: &str = "default_database";
pub const DEFAULT_COLLECTION: &str = "default_collection";
pub const DEFAULT_SOURCE_DIR: &str = "./documents";
pub const DEFAULT_URL: &str = "https://www.rust-lang.org/learn";

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("database '{0}' already exists; choose a different name")]
    DuplicateDatabase(String),
    #[error("no usable response to the topic query: {0}")]
    EmptyTopicResponse(#[source] QueryError),
    #[error("source directory does not exist: {}", .0.display())]
    MissingSourceDirectory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CollectConfig,
    InitStore,
    ListKnownDatabases,
    WalkAndIngest,
    QueryTopics,
    ParseAndFormat,
    WriteReport,
    ChatLoop,
    End,
}

fn enter(stage: Stage) {
    tracing::debug!(?stage, "entering stage");
}

const TOP_TOPICS_QUERY: &str = "Analyze the documents in this collection and identify the top topics. \
For each topic, provide the following details:
- Topic Name
- Description
- Frequency (the number of times the topic appears)
- Importance (a score between 0 and 1 indicating the relevance or significance of the topic)
- Example Mentions (sentences or paragraphs where the topic is mentioned)
- Related Topics
- Source (the file name or URL of the example mentions)

Focus your analysis solely on the content of the collection, without referring to any external sources.

Respond with JSON only, in this form:
{\"top_topics\": [{\"topic_name\": \"...\", \"description\": \"...\", \"frequency\": 0, \
\"importance\": 0.0, \"example_mentions\": [\"...\"], \"related_topics\": [\"...\"], \"source\": \"...\"}]}";

const FIVE_TOPICS_QUERY: &str = "Analyze the data source and identify the top 5 topics based on frequency and relevance.
For each topic, provide a brief description and cited examples from the data source, if available.
Include the source URL for each example.
If no examples are found, mention that no specific examples were found for that topic.

Respond with JSON only, in this form:
{\"topics\": [{\"title\": \"...\", \"description\": \"...\", \
\"examples\": [{\"text\": \"...\", \"source_url\": \"...\"}]}]}";

/// The topic query for a corpus, narrowed to `focus` when given.
pub fn top_topics_query(focus: Option<&str>) -> String {
    match focus {
        Some(focus) => format!(
            "{}\n\nConcentrate on topics related to: {}.",
            TOP_TOPICS_QUERY, focus
        ),
        None => TOP_TOPICS_QUERY.to_string(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// CollectConfig
// ═══════════════════════════════════════════════════════════════════════

/// Everything `topics analyze` asks for before touching the store.
#[derive(Debug, Clone)]
pub struct AnalyzeSettings {
    pub database: String,
    pub collection: String,
    pub source_dir: PathBuf,
    pub focus: Option<String>,
    pub plan: IngestionConfig,
    pub report_path: PathBuf,
}

/// Ask for a database name that is not yet in the registry.
pub fn ask_database_name<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    registry: &DatabaseRegistry,
    default: &str,
) -> Result<String> {
    let name = prompter.ask("Enter database name", default)?;
    if registry.contains(&name) {
        return Err(DriverError::DuplicateDatabase(name).into());
    }
    Ok(name)
}

/// Pick chunking parameters from the corpus questions.
pub fn ask_chunk_plan<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> Result<IngestionConfig> {
    if prompter.confirm("Is the corpus plain text?", true)? {
        prompter.say(format_plan("text", &TEXT_DEFAULT))?;
        return Ok(TEXT_DEFAULT);
    }

    let mut answers = [false; 4];
    for (answer, question) in answers.iter_mut().zip(QUESTIONS) {
        *answer = prompter.confirm(question, false)?;
    }
    let rule = select_plan(answers);
    prompter.say(format_plan(rule.label, &rule.plan))?;
    Ok(rule.plan)
}

fn format_plan(label: &str, plan: &IngestionConfig) -> String {
    format!(
        "Using {} chunking: size {}, overlap {}, minimum {}",
        label, plan.chunk_size, plan.chunk_overlap, plan.min_chunk_size
    )
}

pub fn collect_settings<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    registry: &DatabaseRegistry,
    config: &Config,
) -> Result<AnalyzeSettings> {
    enter(Stage::CollectConfig);

    let database = ask_database_name(prompter, registry, DEFAULT_DATABASE)?;
    let collection = prompter.ask("Enter collection name", DEFAULT_COLLECTION)?;
    let source_dir = PathBuf::from(prompter.ask("Enter source directory", DEFAULT_SOURCE_DIR)?);
    if !source_dir.is_dir() {
        return Err(DriverError::MissingSourceDirectory(source_dir).into());
    }
    let focus = prompter.ask_optional("Enter a topic focus")?;
    let plan = ask_chunk_plan(prompter)?;
    let report_path = PathBuf::from(prompter.ask(
        "Enter report path",
        &config.report.output_path.display().to_string(),
    )?);

    Ok(AnalyzeSettings {
        database,
        collection,
        source_dir,
        focus,
        plan,
        report_path,
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Analysis
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct AnalysisOutcome {
    pub ingest: IngestSummary,
    pub parsed: ParsedResponse,
    pub report: String,
    pub report_written: bool,
    pub session: SessionContext,
}

/// WalkAndIngest through WriteReport for an open store.
pub async fn analyze_corpus<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    client: &StoreClient,
    settings: &AnalyzeSettings,
    config: &Config,
    scorer: Option<&dyn RelevanceScorer>,
    progress: &dyn ProgressReporter,
) -> Result<AnalysisOutcome> {
    enter(Stage::WalkAndIngest);
    let records = scan_directory(&settings.source_dir, config.ingest.strategy()?, progress)?;
    let ingest = ingest_records(client, &records, progress).await?;
    prompter.say(format!(
        "Ingested {} documents ({} added, {} already stored, {} failed)",
        ingest.total(),
        ingest.added,
        ingest.skipped,
        ingest.failed
    ))?;

    enter(Stage::QueryTopics);
    let mut session = SessionContext::new(ANALYSIS_INSTRUCTION);
    let query = top_topics_query(settings.focus.as_deref());
    let answer = client
        .query(&query, &session)
        .await
        .map_err(DriverError::EmptyTopicResponse)?;
    session.push_exchange(query, answer.clone());

    enter(Stage::ParseAndFormat);
    let parsed = parse_response(&answer);
    let stats = match client.stats().await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(error = %format!("{:#}", e), "corpus statistics unavailable");
            None
        }
    };
    let report = render_markdown(&parsed, scorer, stats.as_ref());

    enter(Stage::WriteReport);
    let report_written = match write_report(&settings.report_path, &report) {
        Ok(()) => {
            prompter.say(format!(
                "Report has been saved to {}",
                settings.report_path.display()
            ))?;
            true
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "report write failed");
            prompter.say(format!("{} {:#}", "Could not write the report:".red().bold(), e))?;
            prompter.say(&report)?;
            false
        }
    };

    Ok(AnalysisOutcome {
        ingest,
        parsed,
        report,
        report_written,
        session,
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Chat loop
// ═══════════════════════════════════════════════════════════════════════

/// Read questions until `exit` or end of input. Only answered questions are
/// recorded in the session.
pub async fn chat_loop<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    client: &StoreClient,
    session: &mut SessionContext,
) -> Result<()> {
    enter(Stage::ChatLoop);
    prompter.say(
        "You can start chatting. Type 'exit' to end the conversation."
            .green()
            .bold(),
    )?;

    loop {
        let Some(line) = prompter.read_line(&format!("{} ", "You:".blue()))? else {
            break;
        };
        let question = line.trim();
        if question.eq_ignore_ascii_case("exit") {
            break;
        }
        if question.is_empty() {
            continue;
        }

        match client.query(question, session).await {
            Ok(answer) => {
                let label = if lacks_information(&answer) {
                    "Assistant:".red().bold()
                } else {
                    "Assistant:".magenta().bold()
                };
                prompter.say(format!("{} {}", label, answer))?;
                session.push_exchange(question, answer);
            }
            Err(e) => {
                tracing::error!(error = %e, "chat query failed");
                prompter.say(format!("{} {}", "Error querying the collection:".red().bold(), e))?;
            }
        }
    }

    prompter.say("Goodbye!".green().bold())?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════

fn query_options(config: &Config) -> QueryOptions {
    QueryOptions::from_config(&config.llm, &config.retrieval)
}

async fn open_client(
    config: &Config,
    database: &str,
    collection: &str,
    plan: IngestionConfig,
) -> Result<(Arc<SqliteCollection>, StoreClient)> {
    enter(Stage::InitStore);
    plan.validate()?;
    let embedder = create_embedder(&config.embedding)?;
    let path = config.store.database_path(database);
    let store = Arc::new(SqliteCollection::open(&path, collection, plan, embedder).await?);
    let model = create_chat_model(&config.llm)?;
    let client = StoreClient::new(store.clone(), model, query_options(config));
    Ok((store, client))
}

fn list_known<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    registry: &DatabaseRegistry,
) -> Result<()> {
    enter(Stage::ListKnownDatabases);
    prompter.say(format!("Known databases: {}", registry.names().join(", ")))
}

/// `topics analyze`.
pub async fn run_analyze<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    config: &Config,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let mut registry = DatabaseRegistry::load(&config.store.registry_path)?;
    let scorer = create_scorer(&config.scoring)?;
    let settings = collect_settings(prompter, &registry, config)?;

    registry.register(&settings.database)?;
    tracing::info!(
        database = %settings.database,
        registry = %registry.path().display(),
        "database registered"
    );
    let (store, client) =
        open_client(config, &settings.database, &settings.collection, settings.plan).await?;
    list_known(prompter, &registry)?;

    let mut outcome = analyze_corpus(
        prompter,
        &client,
        &settings,
        config,
        scorer.as_deref(),
        progress,
    )
    .await?;

    if prompter.confirm("Start a chat session about these documents?", false)? {
        chat_loop(prompter, &client, &mut outcome.session).await?;
    }

    store.close().await;
    enter(Stage::End);
    Ok(())
}

/// `topics url`.
pub async fn run_url<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    config: &Config,
) -> Result<()> {
    let mut registry = DatabaseRegistry::load(&config.store.registry_path)?;
    let scorer = create_scorer(&config.scoring)?;

    let url = prompter.ask("Enter the URL to chat with", DEFAULT_URL)?;
    let database = ask_database_name(prompter, &registry, DEFAULT_DATABASE)?;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.llm.timeout_secs))
        .build()?;
    let record = fetch_url(&http, &url).await?;

    registry.register(&database)?;
    tracing::info!(database = %database, registry = %registry.path().display(), "database registered");
    let (store, client) = open_client(config, &database, DEFAULT_COLLECTION, TEXT_DEFAULT).await?;
    client
        .add(&record.text, &record.metadata)
        .await
        .with_context(|| format!("Failed to store {}", url))?;

    let mut session = SessionContext::new(grounded_instruction());
    let answer = client
        .query(FIVE_TOPICS_QUERY, &session)
        .await
        .map_err(DriverError::EmptyTopicResponse)?;
    session.push_exchange(FIVE_TOPICS_QUERY, answer.clone());

    let parsed = parse_response(&answer);
    prompter.say("Initial Message".yellow().bold())?;
    prompter.say(render_console(&parsed, scorer.as_deref()))?;

    chat_loop(prompter, &client, &mut session).await?;
    store.close().await;
    Ok(())
}

/// `topics databases`.
pub fn list_databases<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    config: &Config,
) -> Result<()> {
    let registry = DatabaseRegistry::load(&config.store.registry_path)?;
    if registry.names().is_empty() {
        return prompter.say("No databases have been created yet.");
    }
    for name in registry.names() {
        prompter.say(name)?;
    }
    Ok(())
}
