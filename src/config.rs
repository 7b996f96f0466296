use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::connector_fs::IdStrategy;

/// Path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config/topics.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub llm: LlmConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ingest: IngestConfig,
    pub report: ReportConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    /// One SQLite file per database lives under `<data_dir>/<name>/`.
    pub data_dir: PathBuf,
    /// JSON array of database names created so far.
    pub registry_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            registry_path: PathBuf::from("./data/databases.json"),
        }
    }
}

impl StoreConfig {
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.data_dir.join(database).join("store.sqlite")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub url: String,
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub timeout_secs: u64,
    /// HTTP-level retries for 429/5xx/network errors.
    pub max_retries: u32,
    /// Whole-query retries after a timeout.
    pub query_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            url: "http://localhost:11434".to_string(),
            model: "llama3:latest".to_string(),
            temperature: 0.2,
            top_p: 1.0,
            timeout_secs: 300,
            max_retries: 2,
            query_retries: 1,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: Option<String>,
    pub url: Option<String>,
    pub batch_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            url: None,
            batch_size: 32,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of context passages sent with each query.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 8 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct IngestConfig {
    /// `sequential` (`doc_<n>`) or `content-hash`.
    pub id_strategy: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            id_strategy: "sequential".to_string(),
        }
    }
}

impl IngestConfig {
    pub fn strategy(&self) -> Result<IdStrategy> {
        match self.id_strategy.as_str() {
            "sequential" => Ok(IdStrategy::Sequential),
            "content-hash" => Ok(IdStrategy::ContentHash),
            other => bail!(
                "Unknown ingest.id_strategy: '{}'. Must be sequential or content-hash.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./topic_analysis_report.md"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    /// `off` or `placeholder`.
    pub mode: String,
    pub context_relevance: f64,
    pub semantic_similarity: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode: "off".to_string(),
            context_relevance: 0.8,
            semantic_similarity: 0.75,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Load and validate the configuration file.
///
/// A missing file at [`DEFAULT_CONFIG_PATH`] falls back to defaults; any
/// other missing path is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG_PATH) {
        let config = Config::default();
        validate(&config)?;
        return Ok(config);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate llm
    match config.llm.provider.as_str() {
        "ollama" | "openai" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be ollama or openai.",
            other
        ),
    }
    if !(0.0..=2.0).contains(&config.llm.temperature) {
        bail!("llm.temperature must be in [0.0, 2.0]");
    }
    if !(config.llm.top_p > 0.0 && config.llm.top_p <= 1.0) {
        bail!("llm.top_p must be in (0.0, 1.0]");
    }
    if config.llm.timeout_secs == 0 {
        bail!("llm.timeout_secs must be > 0");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "ollama" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    config.ingest.strategy()?;

    // Validate scoring
    match config.scoring.mode.as_str() {
        "off" | "placeholder" => {}
        other => bail!(
            "Unknown scoring.mode: '{}'. Must be off or placeholder.",
            other
        ),
    }
    for (name, value) in [
        ("scoring.context_relevance", config.scoring.context_relevance),
        ("scoring.semantic_similarity", config.scoring.semantic_similarity),
    ] {
        if !(0.0..=1.0).contains(&value) {
            bail!("{} must be in [0.0, 1.0]", name);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.query_retries, 1);
        assert_eq!(config.retrieval.top_k, 8);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.ingest.strategy().unwrap(), IdStrategy::Sequential);
        assert_eq!(
            config.report.output_path,
            PathBuf::from("./topic_analysis_report.md")
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
[llm]
model = "mistral"

[store]
data_dir = "/tmp/topics"
"#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "mistral");
        assert_eq!(config.llm.url, "http://localhost:11434");
        assert_eq!(
            config.store.database_path("notes"),
            PathBuf::from("/tmp/topics/notes/store.sqlite")
        );
    }

    #[test]
    fn rejects_unknown_providers() {
        assert!(parse_config("[llm]\nprovider = \"bard\"").is_err());
        assert!(parse_config("[embedding]\nprovider = \"magic\"").is_err());
    }

    #[test]
    fn embedding_requires_model() {
        let err = parse_config("[embedding]\nprovider = \"ollama\"").unwrap_err();
        assert!(err.to_string().contains("embedding.model"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(parse_config("[llm]\ntemperature = 3.5").is_err());
        assert!(parse_config("[retrieval]\ntop_k = 0").is_err());
        assert!(parse_config("[scoring]\ncontext_relevance = 1.5").is_err());
        assert!(parse_config("[ingest]\nid_strategy = \"random\"").is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        assert!(load_config(Path::new("/definitely/not/here.toml")).is_err());
    }
}
