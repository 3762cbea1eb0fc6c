//! Multi-layer prompt assembly.
//!
//! [`ContextBuilder`] turns a system prompt, an optional task objective, an
//! output-format contract with a few-shot example, retrieved knowledge
//! snippets, and the running conversation history into the final message
//! sequence for a model call. Assembly is pure local string processing; the
//! only I/O is the explicit knowledge-file load.
//!
//! Knowledge retrieval is deterministic keyword overlap: the user input is
//! tokenized to lowercase words and each knowledge chunk is scored by how
//! many of those words it contains. Ties keep chunk order.

use crate::error::Result;
use crate::message::Message;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// How many knowledge chunks are injected per assembly.
const KNOWLEDGE_TOP_K: usize = 3;

/// Builder for the outgoing prompt sequence.
///
/// # Example
/// ```
/// use chatmem::{ContextBuilder, Message};
///
/// let builder = ContextBuilder::new()
///     .with_system_prompt("You are a concise assistant.")
///     .with_task("Answer geography questions.");
///
/// let messages = builder.assemble(&[], "What is the capital of France?");
/// assert_eq!(messages.len(), 2);
/// assert!(messages[0].content.contains("Current task"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    system_prompt: String,
    task: Option<String>,
    output_format: Option<String>,
    format_example: Option<String>,
    knowledge_chunks: Vec<String>,
}

impl ContextBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Set the current task objective, appended to the system prompt.
    pub fn with_task(mut self, task: &str) -> Self {
        self.task = Some(task.to_string());
        self
    }

    /// Declare the expected output format, optionally with a few-shot
    /// example that will be injected as a user/assistant exchange.
    pub fn with_output_format(mut self, format: &str, example: Option<&str>) -> Self {
        self.output_format = Some(format.to_string());
        self.format_example = example.map(|e| e.to_string());
        self
    }

    /// Add knowledge text, split into retrievable chunks on `separator`.
    /// Blank chunks are dropped.
    pub fn with_knowledge(mut self, text: &str, separator: &str) -> Self {
        self.knowledge_chunks.extend(
            text.split(separator)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Load knowledge chunks from a file, one chunk per blank-line-separated
    /// paragraph.
    pub fn load_knowledge_from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(self.with_knowledge(&text, "\n\n"))
    }

    /// Assemble the outgoing sequence.
    ///
    /// Layers, in order: system prompt (with task objective), the few-shot
    /// format exchange, retrieved knowledge as a fenced system message, the
    /// provided history, and finally the user input (with a format reminder
    /// suffix when a format is set).
    pub fn assemble(&self, history: &[Message], user_input: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 4);

        let mut system = self.system_prompt.clone();
        if let Some(task) = &self.task {
            if !system.is_empty() {
                system.push_str("\n\n");
            }
            system.push_str("Current task: ");
            system.push_str(task);
        }
        if !system.is_empty() {
            messages.push(Message::system(&system));
        }

        if let (Some(format), Some(example)) = (&self.output_format, &self.format_example) {
            messages.push(Message::user(&format!(
                "Show me an example of the expected {} output.",
                format
            )));
            messages.push(Message::assistant(example));
        }

        let snippets = self.retrieve_knowledge(user_input);
        if !snippets.is_empty() {
            debug!(count = snippets.len(), "knowledge snippets injected");
            messages.push(Message::system(&format!(
                "---BEGIN KNOWLEDGE---\n{}\n---END KNOWLEDGE---",
                snippets.join("\n\n")
            )));
        }

        messages.extend_from_slice(history);

        let input = match &self.output_format {
            Some(format) => format!(
                "{} (Remember to provide the final response in {} format.)",
                user_input, format
            ),
            None => user_input.to_string(),
        };
        messages.push(Message::user(&input));

        messages
    }

    /// Score every chunk by keyword overlap with the input and return the
    /// top matches. Zero-score chunks are never returned.
    fn retrieve_knowledge(&self, user_input: &str) -> Vec<String> {
        if self.knowledge_chunks.is_empty() {
            return Vec::new();
        }

        let query: HashSet<String> = user_input
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let mut scored: Vec<(usize, usize)> = self
            .knowledge_chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let lower = chunk.to_lowercase();
                let words: HashSet<&str> = lower.split_whitespace().collect();
                let score = query.iter().filter(|w| words.contains(w.as_str())).count();
                (i, score)
            })
            .filter(|(_, score)| *score > 0)
            .collect();

        // Stable sort keeps chunk order for equal scores.
        scored.sort_by(|a, b| b.1.cmp(&a.1));
        scored
            .into_iter()
            .take(KNOWLEDGE_TOP_K)
            .map(|(i, _)| self.knowledge_chunks[i].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_system_prompt_with_task() {
        let builder = ContextBuilder::new()
            .with_system_prompt("You are helpful.")
            .with_task("Summarize articles.");

        let messages = builder.assemble(&[], "Summarize this for me");
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.starts_with("You are helpful."));
        assert!(messages[0].content.contains("Current task: Summarize articles."));
    }

    #[test]
    fn test_format_example_pair() {
        let builder = ContextBuilder::new()
            .with_system_prompt("prompt")
            .with_output_format("JSON", Some(r#"{"answer": "..."}"#));

        let messages = builder.assemble(&[], "question");

        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("JSON"));
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].content, r#"{"answer": "..."}"#);

        // Reminder suffix on the final user message.
        let last = messages.last().unwrap();
        assert!(last.content.starts_with("question"));
        assert!(last.content.contains("in JSON format"));
    }

    #[test]
    fn test_format_without_example_skips_pair() {
        let builder = ContextBuilder::new()
            .with_system_prompt("prompt")
            .with_output_format("markdown", None);

        let messages = builder.assemble(&[], "question");
        // system + user input only
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("in markdown format"));
    }

    #[test]
    fn test_knowledge_retrieval_by_overlap() {
        let builder = ContextBuilder::new().with_system_prompt("prompt").with_knowledge(
            "Rust uses ownership for memory safety.\n\n\
             Python uses garbage collection.\n\n\
             The borrow checker enforces ownership rules in Rust.",
            "\n\n",
        );

        let messages = builder.assemble(&[], "How does ownership work in Rust?");
        let knowledge = &messages[1];
        assert_eq!(knowledge.role, Role::System);
        assert!(knowledge.content.starts_with("---BEGIN KNOWLEDGE---"));
        assert!(knowledge.content.ends_with("---END KNOWLEDGE---"));
        assert!(knowledge.content.contains("memory safety"));
        assert!(knowledge.content.contains("borrow checker"));
        // Zero-overlap chunk is excluded.
        assert!(!knowledge.content.contains("garbage collection"));
    }

    #[test]
    fn test_no_matching_knowledge_injects_nothing() {
        let builder = ContextBuilder::new()
            .with_system_prompt("prompt")
            .with_knowledge("completely unrelated text", "\n\n");

        let messages = builder.assemble(&[], "zzz qqq");
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_history_preserved_in_order() {
        let builder = ContextBuilder::new().with_system_prompt("prompt");
        let history = vec![Message::user("earlier"), Message::assistant("reply")];

        let messages = builder.assemble(&history, "now");
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["prompt", "earlier", "reply", "now"]);
    }

    #[test]
    fn test_top_k_limit() {
        let text = (0..6)
            .map(|i| format!("fact {} about oceans", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let builder = ContextBuilder::new()
            .with_system_prompt("prompt")
            .with_knowledge(&text, "\n\n");

        let messages = builder.assemble(&[], "tell me about oceans");
        let knowledge = &messages[1];
        let count = knowledge.content.matches("fact").count();
        assert_eq!(count, 3);
        // Ties broken by chunk order.
        assert!(knowledge.content.contains("fact 0"));
        assert!(knowledge.content.contains("fact 1"));
        assert!(knowledge.content.contains("fact 2"));
    }

    #[test]
    fn test_load_knowledge_missing_file_errors() {
        let result =
            ContextBuilder::new().load_knowledge_from_file("/nonexistent/knowledge.txt");
        assert!(result.is_err());
    }
}
