//! Topic extraction from model answers.
//!
//! Models are asked for JSON but often answer in Markdown bullets, so
//! [`parse_response`] tries two shapes in order:
//!
//! 1. **JSON**: an object (bare, or inside a single fenced code block) with a
//!    `topics` or `top_topics` array. Each element becomes one
//!    [`TopicRecord`]; missing or mistyped fields fall back to empty values.
//! 2. **Bullets**: `**Topic …` lines open a record and the prefixes in
//!    [`FIELD_RULES`] fill it. Tab-indented bullets are example mentions.
//!
//! Anything else comes back as [`ParsedResponse::Raw`]. Parsing never fails;
//! it extracts what matches and ignores the rest.

use serde_json::{Map, Value};

use crate::models::{TopicRecord, TopicSignals};

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Topics(Vec<TopicRecord>),
    Raw(String),
}

pub fn parse_response(text: &str) -> ParsedResponse {
    if let Some(topics) = parse_structured(text) {
        tracing::debug!(topics = topics.len(), "parsed structured response");
        return ParsedResponse::Topics(topics);
    }

    let topics = parse_lines(text);
    if topics.is_empty() {
        tracing::debug!("no topic structure found, keeping raw response");
        ParsedResponse::Raw(text.to_string())
    } else {
        tracing::debug!(topics = topics.len(), "parsed line-oriented response");
        ParsedResponse::Topics(topics)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// JSON shape
// ═══════════════════════════════════════════════════════════════════════

const NAME_KEYS: &[&str] = &["title", "topic_name", "name", "topic"];
const EXAMPLE_KEYS: &[&str] = &["examples", "example_mentions"];
const EXAMPLE_SOURCE_KEYS: &[&str] = &["source_url", "source"];

/// Topics from a JSON answer, or `None` when the answer is not JSON or has
/// no topics array.
pub fn parse_structured(text: &str) -> Option<Vec<TopicRecord>> {
    let value = decode_json(text.trim()).or_else(|| fenced_body(text).and_then(decode_json))?;
    let obj = value.as_object()?;
    let items = obj
        .get("topics")
        .or_else(|| obj.get("top_topics"))?
        .as_array()?;

    Some(items.iter().map(topic_from_value).collect())
}

/// One record per array element: objects are read field by field, a bare
/// scalar is taken as the topic name.
fn topic_from_value(value: &Value) -> TopicRecord {
    match value {
        Value::Object(obj) => topic_from_object(obj),
        other => TopicRecord {
            name: scalar_string(other).unwrap_or_default(),
            ..TopicRecord::default()
        },
    }
}

fn decode_json(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// Body of the first ```` ``` ```` block, without the info string.
fn fenced_body(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    Some(body[..close].trim())
}

fn topic_from_object(obj: &Map<String, Value>) -> TopicRecord {
    let (example_mentions, example_sources) = examples(obj);

    let mut source = string_field(obj, &["source"]);
    if source.is_empty() && !example_sources.is_empty() {
        source = example_sources.join(", ");
    }

    TopicRecord {
        name: string_field(obj, NAME_KEYS),
        description: string_field(obj, &["description"]),
        frequency: obj.get("frequency").map(count_value).unwrap_or(0),
        importance: obj.get("importance").and_then(number_value).unwrap_or(0.0),
        example_mentions,
        related_topics: obj.get("related_topics").map(joined_value).unwrap_or_default(),
        source,
        signals: TopicSignals {
            model_confidence: obj.get("model_confidence").and_then(number_value),
            answer: string_field(obj, &["answer"]),
            context: string_field(obj, &["context"]),
            context_sources: obj
                .get("context_sources")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(scalar_string).collect())
                .unwrap_or_default(),
        },
    }
}

/// Mention texts, plus the distinct sources cited by object-shaped examples.
fn examples(obj: &Map<String, Value>) -> (Vec<String>, Vec<String>) {
    let mut mentions = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    let items = match EXAMPLE_KEYS.iter().find_map(|k| obj.get(*k)) {
        Some(Value::Array(items)) => items.as_slice(),
        Some(Value::String(s)) => {
            mentions.push(s.clone());
            return (mentions, sources);
        }
        _ => return (mentions, sources),
    };

    for item in items {
        match item {
            Value::String(s) => mentions.push(s.clone()),
            Value::Object(example) => {
                let text = string_field(example, &["text"]);
                if !text.is_empty() {
                    mentions.push(text);
                }
                let source = string_field(example, EXAMPLE_SOURCE_KEYS);
                if !source.is_empty() && !sources.contains(&source) {
                    sources.push(source);
                }
            }
            _ => {}
        }
    }
    (mentions, sources)
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(scalar_string))
        .unwrap_or_default()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn count_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => parse_count(s),
        _ => 0,
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn joined_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_string(other).unwrap_or_default(),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Line-oriented shape
// ═══════════════════════════════════════════════════════════════════════

/// One field line: if the left-trimmed line starts with `prefix`, `apply`
/// receives the trimmed text after the first colon.
pub struct FieldRule {
    pub prefix: &'static str,
    pub field: &'static str,
    pub apply: fn(&mut TopicRecord, &str),
}

pub const TOPIC_MARKER: &str = "**Topic";

pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        prefix: "* Description:",
        field: "description",
        apply: |t, v| t.description = v.to_string(),
    },
    FieldRule {
        prefix: "* Frequency:",
        field: "frequency",
        apply: |t, v| t.frequency = parse_count(v),
    },
    FieldRule {
        prefix: "* Importance:",
        field: "importance",
        apply: |t, v| t.importance = parse_score(v),
    },
    FieldRule {
        prefix: "* Related Topics:",
        field: "related_topics",
        apply: |t, v| t.related_topics = v.to_string(),
    },
    FieldRule {
        prefix: "* Source:",
        field: "source",
        apply: |t, v| t.source = v.to_string(),
    },
    FieldRule {
        prefix: "* Example Mentions:",
        field: "example_mentions",
        apply: |t, v| {
            if !v.is_empty() {
                t.example_mentions.push(v.to_string());
            }
        },
    },
];

/// Integer field; anything that is not a number is 0.
pub fn parse_count(value: &str) -> u64 {
    let value = value.trim();
    value
        .parse::<u64>()
        .ok()
        .or_else(|| {
            value
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        })
        .unwrap_or(0)
}

/// Float field; anything that is not a number is 0.0.
pub fn parse_score(value: &str) -> f64 {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .unwrap_or(0.0)
}

pub fn parse_lines(text: &str) -> Vec<TopicRecord> {
    let mut topics = Vec::new();
    let mut current: Option<TopicRecord> = None;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with(TOPIC_MARKER) {
            topics.extend(current.take());
            current = Some(TopicRecord {
                name: topic_name(trimmed),
                ..Default::default()
            });
            continue;
        }

        let Some(topic) = current.as_mut() else {
            continue;
        };

        if let Some(rule) = FIELD_RULES.iter().find(|r| trimmed.starts_with(r.prefix)) {
            (rule.apply)(topic, after_colon(trimmed));
        } else if let Some(mention) = tab_bullet(line) {
            topic.example_mentions.push(mention);
        }
    }

    topics.extend(current);
    topics
}

fn topic_name(line: &str) -> String {
    match line.split_once(':') {
        Some((_, rest)) => rest.trim().trim_matches('*').trim().to_string(),
        None => line.replace('*', "").trim().to_string(),
    }
}

fn after_colon(line: &str) -> &str {
    line.split_once(':').map(|(_, v)| v.trim()).unwrap_or("")
}

/// `\t+ text`, `\t\t- text`, `\t* label: text` → mention text.
fn tab_bullet(line: &str) -> Option<String> {
    if !line.starts_with('\t') {
        return None;
    }
    let rest = line.trim_start_matches('\t');
    let body = rest.strip_prefix(['+', '-', '*'])?.trim();
    let body = match body.split_once(':') {
        Some((_, after)) => after.trim(),
        None => body,
    };
    (!body.is_empty()).then(|| body.to_string())
}
