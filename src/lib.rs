//! # Topic Harness
//!
//! Ingest a directory of documents (or a single web page) into a local
//! document collection, ask a language model for the corpus's top topics,
//! and turn the answer into a Markdown report or a console summary. A
//! follow-up chat loop answers questions grounded in the same collection.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌───────────┐
//! │ Connectors  │──▶│ StoreClient  │──▶│  SQLite   │
//! │  FS / URL   │   │ add / exists │   │ FTS5+Vec  │
//! └─────────────┘   └──────┬───────┘   └───────────┘
//!                          │ query
//!                          ▼
//!                   ┌──────────────┐   ┌───────────┐   ┌──────────┐
//!                   │  ChatModel   │──▶│  Parser   │──▶│  Report  │
//!                   │ Ollama / OAI │   │ JSON/bullet│  │ MD / TTY │
//!                   └──────────────┘   └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! topics analyze       # prompt for a database, ingest ./documents, write the report
//! topics url           # chat with a single web page
//! topics databases     # list database names already used
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Text extraction per content kind |
//! | [`connector_fs`] | Directory walker |
//! | [`connector_url`] | Single web page fetcher |
//! | [`chunk`] | Text chunking |
//! | [`chunk_plan`] | Chunking decision table |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`llm`] | Chat model providers |
//! | [`store`] | Document collection trait and backends |
//! | [`client`] | Idempotent adds and grounded queries |
//! | [`ingest`] | Ingestion loop |
//! | [`parser`] | Topic extraction from model answers |
//! | [`scoring`] | Pluggable per-topic display scores |
//! | [`report`] | Markdown and console rendering |
//! | [`registry`] | Registry of used database names |
//! | [`session`] | Per-run conversation state |
//! | [`prompt`] | Console prompts with defaults |
//! | [`driver`] | Interactive command flows |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |

pub mod chunk;
pub mod chunk_plan;
pub mod client;
pub mod config;
pub mod connector_fs;
pub mod connector_url;
pub mod db;
pub mod driver;
pub mod embedding;
pub mod extract;
mod http;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod parser;
pub mod progress;
pub mod prompt;
pub mod registry;
pub mod report;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod store;
