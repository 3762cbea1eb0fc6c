//! Token estimation for context accounting.
//!
//! The preferred path counts tokens exactly with the `cl100k_base` BPE from
//! `tiktoken-rs`; when the tokenizer cannot be initialized the estimator
//! falls back to a deterministic length heuristic
//! (`words * 1.3 + chars / 4`, rounded to nearest). The strategy is resolved
//! once at construction and recorded so callers can tell exact from
//! heuristic accounting.

use crate::message::Message;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

/// Tokens charged for the role field of every message.
pub const ROLE_OVERHEAD_TOKENS: usize = 1;
/// Tokens charged per message for structure and formatting.
pub const MESSAGE_OVERHEAD_TOKENS: usize = 4;
/// Tokens charged per tool call on top of its name and arguments.
pub const TOOL_CALL_OVERHEAD_TOKENS: usize = 10;
/// Tokens charged for a tool-result envelope (`tool_call_id` plumbing).
pub const TOOL_RESULT_OVERHEAD_TOKENS: usize = 5;

// The BPE embeds its rank tables and is expensive to build; initialize it
// once per process and share across sessions.
static CL100K: Lazy<Option<CoreBPE>> = Lazy::new(|| cl100k_base().ok());

/// Which counting strategy a [`TokenEstimator`] resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorMode {
    /// Exact sub-word tokenization via cl100k_base
    Exact,
    /// Length-based heuristic fallback
    Heuristic,
}

impl std::fmt::Display for EstimatorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimatorMode::Exact => write!(f, "exact"),
            EstimatorMode::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Counting strategy seam. Implement this to plug in a different tokenizer.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in the given text. Must never fail and must be
    /// non-decreasing as text grows.
    fn count(&self, text: &str) -> usize;
}

/// Exact counter backed by the shared cl100k_base BPE.
struct Cl100kCounter {
    bpe: &'static CoreBPE,
}

impl TokenCounter for Cl100kCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

/// Heuristic counter: `words * 1.3 + chars / 4`, rounded to nearest.
///
/// The constants come from empirical GPT-style tokenization ratios. Both
/// terms are non-decreasing in text length, so the estimate is monotonic.
struct HeuristicCounter;

impl TokenCounter for HeuristicCounter {
    fn count(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        let chars = text.chars().count();
        (words as f64 * 1.3 + chars as f64 / 4.0).round() as usize
    }
}

/// Token estimator with a strategy resolved once at construction.
///
/// # Example
/// ```
/// use chatmem::TokenEstimator;
///
/// let estimator = TokenEstimator::new();
/// assert_eq!(estimator.estimate(""), 0);
/// assert!(estimator.estimate("Hello, world!") > 0);
/// ```
pub struct TokenEstimator {
    counter: Box<dyn TokenCounter>,
    mode: EstimatorMode,
}

impl TokenEstimator {
    /// Create an estimator, preferring the exact cl100k_base tokenizer.
    ///
    /// Falls back to the heuristic when the tokenizer is unavailable; the
    /// degradation is logged once as a warning and visible via [`Self::mode`].
    pub fn new() -> Self {
        match CL100K.as_ref() {
            Some(bpe) => Self {
                counter: Box::new(Cl100kCounter { bpe }),
                mode: EstimatorMode::Exact,
            },
            None => {
                warn!("cl100k_base tokenizer unavailable, using heuristic token estimation");
                Self::heuristic()
            }
        }
    }

    /// Create an estimator that always uses the length heuristic.
    ///
    /// Useful for tests that need deterministic, tokenizer-independent counts.
    pub fn heuristic() -> Self {
        Self {
            counter: Box::new(HeuristicCounter),
            mode: EstimatorMode::Heuristic,
        }
    }

    /// Create an estimator with a custom counting strategy.
    pub fn with_counter(counter: Box<dyn TokenCounter>, mode: EstimatorMode) -> Self {
        Self { counter, mode }
    }

    /// The strategy this estimator resolved to.
    pub fn mode(&self) -> EstimatorMode {
        self.mode
    }

    /// Estimate the number of tokens in a text string.
    ///
    /// Never fails for any string input; the empty string is 0 tokens.
    pub fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.counter.count(text)
    }

    /// Estimate tokens for a complete message including metadata overhead.
    ///
    /// Accounts for the role, the content, tool-call structure, and the
    /// tool-result envelope, using the documented per-message constants.
    pub fn estimate_message(&self, message: &Message) -> usize {
        let mut total = ROLE_OVERHEAD_TOKENS + MESSAGE_OVERHEAD_TOKENS;

        total += self.estimate(&message.content);

        if let Some(tool_calls) = &message.tool_calls {
            for call in tool_calls {
                total += self.estimate(&call.name);
                total += self.estimate(&call.arguments);
                total += TOOL_CALL_OVERHEAD_TOKENS;
            }
        }

        if message.tool_call_id.is_some() {
            total += TOOL_RESULT_OVERHEAD_TOKENS;
        }

        total
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}
