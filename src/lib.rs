//! # ChatMem
//!
//! Token-bounded conversation memory for LLM agents.
//!
//! ChatMem keeps a running chat transcript under a configurable token budget
//! so that downstream model calls never exceed their context window. When the
//! running token estimate crosses a trigger threshold, the oldest span of
//! messages is compacted into a single deterministic summary — the protected
//! system prompt and a recent-message window always survive verbatim.
//!
//! ## Quick start
//!
//! ```
//! use chatmem::{ContextManager, MemoryConfig, Message};
//!
//! let mut manager = ContextManager::new(MemoryConfig::default()).unwrap();
//! manager.add_message(Message::system("You are a helpful assistant."));
//! manager.add_message(Message::user("What's the weather like?"));
//! manager.add_message(Message::assistant("I don't have live weather data."));
//!
//! let context = manager.get_trimmed_messages();
//! assert_eq!(context.len(), 3);
//!
//! let stats = manager.get_stats();
//! assert_eq!(stats.total_messages, 3);
//! assert_eq!(stats.summarization_count, 0);
//! ```
//!
//! ## Components
//!
//! - [`ContextManager`] — the façade: token accounting, trigger-based
//!   compaction, retention policy
//! - [`TokenEstimator`] — exact cl100k_base counting with a deterministic
//!   heuristic fallback
//! - [`MessageStore`] — the ordered transcript with a protected system prompt
//! - [`SummaryEngine`] — deterministic local summarization, no model calls
//! - [`ContextBuilder`] — multi-layer prompt assembly (task, format example,
//!   retrieved knowledge, history)

pub mod builder;
pub mod config;
pub mod error;
pub mod estimator;
pub mod manager;
pub mod message;
pub mod store;
pub mod summarizer;

pub use builder::ContextBuilder;
pub use config::MemoryConfig;
pub use error::{MemoryError, Result};
pub use estimator::{EstimatorMode, TokenCounter, TokenEstimator};
pub use manager::{ContextManager, MemoryStats};
pub use message::{Message, Role, SummaryRecord, ToolCall};
pub use store::MessageStore;
pub use summarizer::{compress_tool_result, SummaryEngine};
