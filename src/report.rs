//! Report rendering.
//!
//! Two renderers over the same [`ParsedResponse`]:
//!
//! - [`render_markdown`] for the report file, optionally followed by a
//!   corpus statistics table.
//! - [`render_console`] for the terminal, styled with `colored`.
//!
//! Topics appear in the order the model gave them. A raw response is shown
//! verbatim under a `Response` heading in both renderers.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::models::TopicRecord;
use crate::parser::ParsedResponse;
use crate::scoring::{score_topic, RelevanceScorer, TopicScores};
use crate::stats::CorpusStats;

pub const NO_EXAMPLES: &str = "No specific examples were found for this topic.";
pub const NO_TOPICS: &str = "No topics were identified.";

const RULE_WIDTH: usize = 80;

fn display_name(topic: &TopicRecord, position: usize) -> String {
    if topic.name.trim().is_empty() {
        format!("Topic {}", position)
    } else {
        topic.name.clone()
    }
}

fn scores_line(scores: &TopicScores) -> String {
    format!(
        "Confidence {:.1}% | Grounding {:.1}% | K Sym {:.1}%",
        scores.confidence, scores.grounding, scores.knowledge_symmetry
    )
}

fn scores_label(scorer: &dyn RelevanceScorer) -> &'static str {
    if scorer.is_placeholder() {
        "Scores (placeholder heuristics, not quality measurements)"
    } else {
        "Scores"
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Markdown
// ═══════════════════════════════════════════════════════════════════════

pub fn render_markdown(
    parsed: &ParsedResponse,
    scorer: Option<&dyn RelevanceScorer>,
    stats: Option<&CorpusStats>,
) -> String {
    let mut out = String::from("# Topic Analysis Report\n\n");

    match parsed {
        ParsedResponse::Raw(text) => {
            out.push_str("## Response\n\n");
            out.push_str(text);
            out.push('\n');
        }
        ParsedResponse::Topics(topics) if topics.is_empty() => {
            out.push_str("## Top Topics\n\n");
            out.push_str(NO_TOPICS);
            out.push('\n');
        }
        ParsedResponse::Topics(topics) => {
            out.push_str("## Top Topics\n\n");
            for (i, topic) in topics.iter().enumerate() {
                out.push_str("---\n\n");
                markdown_topic(&mut out, i + 1, topic, scorer);
            }
            out.push_str("---\n");
        }
    }

    if let Some(stats) = stats {
        out.push('\n');
        out.push_str(&markdown_stats(stats));
    }

    out
}

fn markdown_topic(
    out: &mut String,
    position: usize,
    topic: &TopicRecord,
    scorer: Option<&dyn RelevanceScorer>,
) {
    out.push_str(&format!(
        "### {}. {}\n\n",
        position,
        display_name(topic, position)
    ));

    if !topic.description.is_empty() {
        out.push_str(&format!("{}\n\n", topic.description));
    }

    let mut facts = Vec::new();
    if topic.frequency > 0 {
        facts.push(format!("- **Frequency:** {}", topic.frequency));
    }
    if topic.importance != 0.0 {
        facts.push(format!("- **Importance:** {}", topic.importance));
    }
    if !topic.related_topics.is_empty() {
        facts.push(format!("- **Related topics:** {}", topic.related_topics));
    }
    if !facts.is_empty() {
        out.push_str(&format!("{}\n\n", facts.join("\n")));
    }

    if let Some(scorer) = scorer {
        let scores = score_topic(scorer, topic);
        out.push_str(&format!(
            "**{}:** {}\n\n",
            scores_label(scorer),
            scores_line(&scores)
        ));
    }

    out.push_str("**Example mentions:**\n\n");
    if topic.example_mentions.is_empty() {
        out.push_str(&format!("{}\n\n", NO_EXAMPLES));
        return;
    }
    for (n, mention) in topic.example_mentions.iter().enumerate() {
        if topic.source.is_empty() {
            out.push_str(&format!("{}. {}\n", n + 1, mention));
        } else {
            out.push_str(&format!(
                "{}. {} (source: {})\n",
                n + 1,
                mention,
                topic.source
            ));
        }
    }
    out.push('\n');
}

fn markdown_stats(stats: &CorpusStats) -> String {
    let mut out = String::from("## Corpus Statistics\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!("| Documents | {} |\n", stats.document_count));
    out.push_str(&format!(
        "| Average length | {:.1} characters |\n",
        stats.average_length
    ));
    out.push_str(&format!("| Minimum length | {} characters |\n", stats.min_length));
    out.push_str(&format!("| Maximum length | {} characters |\n", stats.max_length));
    out
}

// ═══════════════════════════════════════════════════════════════════════
// Console
// ═══════════════════════════════════════════════════════════════════════

pub fn render_console(parsed: &ParsedResponse, scorer: Option<&dyn RelevanceScorer>) -> String {
    let topics = match parsed {
        ParsedResponse::Raw(text) => {
            return format!("{}\n\n{}\n", "Response".yellow().bold(), text)
        }
        ParsedResponse::Topics(topics) if topics.is_empty() => {
            return format!("{}\n", NO_TOPICS.yellow())
        }
        ParsedResponse::Topics(topics) => topics,
    };

    let rule = "━".repeat(RULE_WIDTH).cyan().bold().to_string();
    let mut out = String::new();

    for (i, topic) in topics.iter().enumerate() {
        let position = i + 1;
        out.push_str(&format!("{}\n", rule));
        let heading = format!("Topic {}: {}", position, display_name(topic, position));
        out.push_str(&format!("{}\n", heading.yellow().bold()));
        if !topic.description.is_empty() {
            out.push_str(&format!("{}\n", topic.description.green()));
        }
        out.push('\n');

        if let Some(scorer) = scorer {
            let scores = score_topic(scorer, topic);
            let label = format!("{}:", scores_label(scorer));
            out.push_str(&format!("{} {}\n\n", label.bold(), scores_line(&scores)));
        }

        out.push_str(&format!("{}\n", "Sources:".bold()));
        if topic.example_mentions.is_empty() {
            out.push_str(&format!("    - {}\n", NO_EXAMPLES));
        }
        for (n, mention) in topic.example_mentions.iter().enumerate() {
            if topic.source.is_empty() {
                out.push_str(&format!("    {}. {}\n", n + 1, mention.italic()));
            } else {
                out.push_str(&format!(
                    "    {}. {} ({})\n",
                    n + 1,
                    mention.italic(),
                    topic.source.blue()
                ));
            }
        }
        out.push_str(&format!("{}\n\n", rule));
    }

    out
}

/// Write `content` to `path`, creating parent directories.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(())
}
