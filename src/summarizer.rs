//! Deterministic local summarization of older conversation spans.
//!
//! The engine is pure string processing — no model call, no I/O. Each
//! message in a span contributes a short descriptor depending on its role:
//! user messages their intent phrase, assistant tool calls the tool names,
//! plain assistant messages their response text, tool results an issue note
//! when they carry errors. The descriptors are folded into one paragraph
//! tagged with a sequence number and creation timestamp.
//!
//! When the span contains an earlier summary, its text is carried forward
//! under a `Previously:` prefix so no category of information (topics asked,
//! tools used, key responses) vanishes across repeated compaction rounds.

use crate::estimator::TokenEstimator;
use crate::message::{Message, Role, SummaryRecord};
use chrono::Utc;
use serde_json::Value;

/// Characters kept from each user intent phrase.
const USER_SNIPPET_CHARS: usize = 100;
/// Characters kept from each plain assistant response.
const RESPONSE_SNIPPET_CHARS: usize = 100;
/// Characters kept from each tool error note.
const ERROR_SNIPPET_CHARS: usize = 80;
/// Maximum length for a condensed tool result.
const TOOL_RESULT_MAX_CHARS: usize = 200;
/// How many items each category contributes to the summary paragraph.
const MAX_USER_REQUESTS: usize = 3;
const MAX_TOOLS: usize = 5;
const MAX_ERRORS: usize = 2;
const MAX_RESPONSES: usize = 2;
/// The shrink pass never cuts the summary below this many characters.
const MIN_SUMMARY_CHARS: usize = 24;
/// Last-resort content when even floor-length text costs as much as the
/// span it replaces. Cheaper than any two messages' combined overhead.
const SUMMARY_MARKER: &str = "[Summary]";

/// Produces synthetic summary messages for compaction spans.
///
/// Stateless; the summary sequence number is owned by the caller so that it
/// stays in step with the manager's summarization count.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryEngine;

impl SummaryEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Compress a non-empty span of messages into a single summary message.
    ///
    /// The caller guarantees the span excludes the protected system prompt
    /// and the retained recent window. `token_budget` bounds the summary's
    /// estimated size; the engine additionally guarantees the summary costs
    /// strictly fewer tokens than the span itself for spans of length >= 2.
    /// (A span of length 1 that is already minimal may not compress — the
    /// accepted edge case.)
    pub fn summarize_span(
        &self,
        span: &[Message],
        estimator: &TokenEstimator,
        sequence: u32,
        token_budget: usize,
    ) -> Message {
        debug_assert!(!span.is_empty(), "summarize_span requires a non-empty span");

        let mut previous: Option<String> = None;
        let mut user_requests: Vec<String> = Vec::new();
        let mut tool_actions: Vec<String> = Vec::new();
        let mut responses: Vec<String> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for msg in span {
            if msg.is_summary() {
                previous = Some(strip_summary_header(&msg.content).to_string());
                continue;
            }
            match msg.role {
                Role::User => {
                    if !msg.content.is_empty() {
                        user_requests.push(truncate_chars(&msg.content, USER_SNIPPET_CHARS));
                    }
                }
                Role::Assistant => {
                    if let Some(calls) = &msg.tool_calls {
                        for call in calls {
                            if !tool_actions.contains(&call.name) {
                                tool_actions.push(call.name.clone());
                            }
                        }
                    }
                    if !msg.has_tool_calls() && !msg.content.is_empty() {
                        responses.push(truncate_chars(&msg.content, RESPONSE_SNIPPET_CHARS));
                    }
                }
                Role::Tool => {
                    let condensed = compress_tool_result(&msg.content, TOOL_RESULT_MAX_CHARS);
                    let lower = condensed.to_lowercase();
                    if lower.contains("error") || lower.contains("fail") {
                        errors.push(format!(
                            "Tool error: {}",
                            truncate_chars(&condensed, ERROR_SNIPPET_CHARS)
                        ));
                    }
                }
                // Organic system messages never appear inside a span.
                Role::System => {}
            }
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(prev) = previous {
            parts.push(format!("Previously: {}", prev));
        }
        if !user_requests.is_empty() {
            parts.push(format!(
                "User asked about: {}",
                join_first(&user_requests, MAX_USER_REQUESTS, "; ")
            ));
        }
        if !tool_actions.is_empty() {
            parts.push(format!(
                "Tools used: {}",
                join_first(&tool_actions, MAX_TOOLS, ", ")
            ));
        }
        if !errors.is_empty() {
            parts.push(format!(
                "Issues encountered: {}",
                join_first(&errors, MAX_ERRORS, "; ")
            ));
        }
        if !responses.is_empty() {
            parts.push(format!(
                "Key responses: {}",
                join_first(&responses, MAX_RESPONSES, "; ")
            ));
        }

        let created_at = Utc::now();
        let body = if parts.is_empty() {
            "Previous conversation context".to_string()
        } else {
            parts.join(" | ")
        };
        let mut content = format!(
            "[Summary #{} at {}] {}",
            sequence,
            created_at.format("%H:%M:%S"),
            body
        );

        let record = SummaryRecord {
            sequence,
            covered_messages: span.len(),
            created_at,
        };
        let span_tokens: usize = span.iter().map(|m| estimator.estimate_message(m)).sum();

        // Shrink pass: cut the paragraph until it fits the budget and costs
        // strictly less than the span it replaces.
        loop {
            let candidate = Message::summary(&content, record.clone());
            let cost = estimator.estimate_message(&candidate);
            let over_budget = cost >= token_budget;
            let over_span = span.len() >= 2 && cost >= span_tokens;
            if !(over_budget || over_span) {
                return candidate;
            }
            if content.chars().count() <= MIN_SUMMARY_CHARS {
                break;
            }
            shrink_quarter(&mut content);
        }

        // Degenerate span (near-empty messages): even the floor-length text
        // costs as much as what it replaces. A bare marker stays under the
        // per-message overhead of any two messages.
        Message::summary(SUMMARY_MARKER, record)
    }
}

/// Condense a lengthy tool result while preserving key information.
///
/// Strategies, in order: short content passes through; error text passes
/// through verbatim; JSON objects are reduced to their important keys; JSON
/// arrays become a count plus the first few items; anything else is
/// truncated with an explicit marker.
pub fn compress_tool_result(content: &str, max_chars: usize) -> String {
    let total_chars = content.chars().count();
    if total_chars <= max_chars {
        return content.to_string();
    }

    // Errors are preserved completely so they survive summarization.
    let lower = content.to_lowercase();
    if lower.contains("error") || lower.contains("fail") {
        return content.to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(content) {
        match value {
            Value::Object(map) => {
                const IMPORTANT_KEYS: [&str; 7] = [
                    "success", "result", "output", "error", "status", "path", "name",
                ];
                let compressed: serde_json::Map<String, Value> = map
                    .into_iter()
                    .filter(|(k, _)| IMPORTANT_KEYS.contains(&k.as_str()))
                    .collect();
                let rendered = Value::Object(compressed).to_string();
                if rendered.chars().count() <= max_chars {
                    return rendered;
                }
            }
            Value::Array(items) => {
                let head: Vec<&Value> = items.iter().take(3).collect();
                let head_json = serde_json::to_string(&head).unwrap_or_default();
                return format!(
                    "[List with {} items, first few: {}...]",
                    items.len(),
                    head_json
                );
            }
            _ => {}
        }
    }

    let truncated: String = content.chars().take(max_chars).collect();
    format!(
        "{}... [truncated, original length: {}]",
        truncated, total_chars
    )
}

/// Take a char-bounded prefix, appending an ellipsis when text was cut.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{}...", head)
    }
}

fn join_first(items: &[String], n: usize, separator: &str) -> String {
    items
        .iter()
        .take(n)
        .cloned()
        .collect::<Vec<_>>()
        .join(separator)
}

/// Drop the `[Summary #N at HH:MM:SS] ` header from a prior summary so the
/// fold does not nest headers.
fn strip_summary_header(content: &str) -> &str {
    if content.starts_with("[Summary #") {
        if let Some(pos) = content.find("] ") {
            return &content[pos + 2..];
        }
    }
    content
}

/// Cut a quarter of the text at a char boundary.
fn shrink_quarter(content: &mut String) {
    let mut target = content.len() * 3 / 4;
    while target > 0 && !content.is_char_boundary(target) {
        target -= 1;
    }
    content.truncate(target);
}
