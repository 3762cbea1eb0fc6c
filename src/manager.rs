//! The context manager façade.
//!
//! Tracks a running token estimate as messages are appended, and lazily
//! compacts the oldest eligible span into a summary when the estimate crosses
//! the trigger threshold. Trigger evaluation happens only inside
//! [`ContextManager::get_trimmed_messages`], never on append, so bursts of
//! `add_message` calls stay O(1).

use crate::config::MemoryConfig;
use crate::error::Result;
use crate::estimator::{EstimatorMode, TokenEstimator};
use crate::message::Message;
use crate::store::MessageStore;
use crate::summarizer::SummaryEngine;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Upper bound on compaction rounds per trim call.
const MAX_SUMMARIZATION_ROUNDS: u32 = 3;

/// Point-in-time memory statistics, suitable for serialization.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryStats {
    /// Messages currently in the store (summaries included)
    pub total_messages: usize,
    /// Running token estimate for the full store
    pub total_tokens: usize,
    /// Configured context window
    pub max_tokens: usize,
    /// `total_tokens / max_tokens` as a percentage, one decimal place
    pub utilization_percent: f64,
    /// How many summaries have been produced over the session
    pub summarization_count: u32,
    /// Configured recent-window size
    pub recent_messages_kept: usize,
    /// Whether token counting is exact or heuristic
    pub estimator_mode: EstimatorMode,
    /// True when the estimate meets or exceeds `max_tokens` even after
    /// trimming. Informational: the trimmed sequence is still usable.
    pub capacity_exceeded: bool,
}

/// Token-bounded conversation memory for a single agent session.
///
/// # Example
/// ```
/// use chatmem::{ContextManager, MemoryConfig, Message};
///
/// let mut manager = ContextManager::new(MemoryConfig::default()).unwrap();
/// manager.add_message(Message::system("You are a helpful assistant."));
/// manager.add_message(Message::user("Hello!"));
///
/// let context = manager.get_trimmed_messages();
/// assert_eq!(context.len(), 2);
/// assert_eq!(manager.get_stats().summarization_count, 0);
/// ```
pub struct ContextManager {
    config: MemoryConfig,
    store: MessageStore,
    estimator: TokenEstimator,
    engine: SummaryEngine,
    running_tokens: usize,
    summarization_count: u32,
}

impl ContextManager {
    /// Create a manager with the given configuration.
    ///
    /// Fails with [`crate::MemoryError::Config`] when the configuration is
    /// invalid. The token estimator resolves its strategy here, once.
    pub fn new(config: MemoryConfig) -> Result<Self> {
        Self::with_estimator(config, TokenEstimator::new())
    }

    /// Create a manager with an explicit estimator.
    ///
    /// Lets tests pin the deterministic heuristic regardless of whether the
    /// exact tokenizer is available.
    pub fn with_estimator(config: MemoryConfig, estimator: TokenEstimator) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store: MessageStore::new(),
            estimator,
            engine: SummaryEngine::new(),
            running_tokens: 0,
            summarization_count: 0,
        })
    }

    /// Append a message and update the running token estimate.
    ///
    /// Always succeeds; no trimming happens here.
    pub fn add_message(&mut self, message: Message) {
        let tokens = self.estimator.estimate_message(&message);
        self.running_tokens += tokens;
        debug!(
            role = %message.role,
            tokens,
            running_tokens = self.running_tokens,
            "message appended"
        );
        self.store.add(message);
    }

    /// Return the message sequence to send to the model, compacting older
    /// history first when the running estimate has crossed the trigger
    /// threshold.
    ///
    /// Idempotent: calling this again without an intervening `add_message`
    /// returns the identical sequence. When even trimming cannot bring the
    /// estimate under `max_tokens` (for example, an oversized message inside
    /// the protected recent window), the sequence is returned as-is and the
    /// overrun is reported through [`Self::get_stats`].
    pub fn get_trimmed_messages(&mut self) -> &[Message] {
        let trigger = self.config.trigger_tokens();
        let mut rounds = 0;
        while self.running_tokens >= trigger && rounds < MAX_SUMMARIZATION_ROUNDS {
            if !self.compact_once() {
                break;
            }
            rounds += 1;
        }

        if self.running_tokens >= self.config.max_tokens {
            warn!(
                total_tokens = self.running_tokens,
                max_tokens = self.config.max_tokens,
                "context exceeds capacity after trimming"
            );
        }

        self.store.all()
    }

    /// Current statistics. Pure read; never triggers summarization.
    pub fn get_stats(&self) -> MemoryStats {
        let utilization = self.running_tokens as f64 / self.config.max_tokens as f64 * 100.0;
        MemoryStats {
            total_messages: self.store.len(),
            total_tokens: self.running_tokens,
            max_tokens: self.config.max_tokens,
            utilization_percent: (utilization * 10.0).round() / 10.0,
            summarization_count: self.summarization_count,
            recent_messages_kept: self.config.keep_recent_messages,
            estimator_mode: self.estimator.mode(),
            capacity_exceeded: self.running_tokens >= self.config.max_tokens,
        }
    }

    /// Clear the conversation, preserving a protected system message, and
    /// reset token accounting and the summary sequence.
    pub fn reset(&mut self) {
        self.store.clear(true);
        self.running_tokens = self.recompute_tokens();
        self.summarization_count = 0;
        info!(remaining = self.store.len(), "conversation memory reset");
    }

    /// Read-only view of the full stored sequence, summaries included.
    pub fn messages(&self) -> &[Message] {
        self.store.all()
    }

    /// The active configuration.
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// The estimator used for token accounting.
    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Compact the oldest eligible span into one summary message.
    ///
    /// Returns false when there is nothing to compact: the span is empty
    /// (everything sits in the protected prefix or the recent window) or
    /// consists only of prior summaries. A leading summary that is part of a
    /// larger span is included in the replaced range so its content folds
    /// into the new summary.
    fn compact_once(&mut self) -> bool {
        let protected = if self.store.has_system_prefix() { 1 } else { 0 };
        let len = self.store.len();
        let end = len.saturating_sub(self.config.keep_recent_messages);
        if end <= protected {
            return false;
        }

        let messages = self.store.all();
        let span = &messages[protected..end];
        if span.iter().all(|m| m.is_summary()) {
            return false;
        }

        // The summary must fit in whatever the trigger threshold leaves after
        // the protected prefix and the recent window are accounted for.
        let reserved: usize = messages[..protected]
            .iter()
            .chain(&messages[end..])
            .map(|m| self.estimator.estimate_message(m))
            .sum();
        let budget = self.config.trigger_tokens().saturating_sub(reserved);

        let sequence = self.summarization_count + 1;
        let summary = self
            .engine
            .summarize_span(span, &self.estimator, sequence, budget);

        let before_tokens = self.running_tokens;
        let covered = end - protected;
        self.store.replace_span(protected, end, summary);
        self.summarization_count = sequence;
        self.running_tokens = self.recompute_tokens();

        let reduction = if before_tokens > 0 {
            (before_tokens.saturating_sub(self.running_tokens)) as f64 / before_tokens as f64
                * 100.0
        } else {
            0.0
        };
        info!(
            sequence,
            messages_compacted = covered,
            before_tokens,
            after_tokens = self.running_tokens,
            reduction_percent = reduction,
            "compacted conversation history"
        );
        true
    }

    /// Recompute the running estimate from the store. Called after every
    /// compaction so drift cannot accumulate across rounds.
    fn recompute_tokens(&self) -> usize {
        self.store
            .all()
            .iter()
            .map(|m| self.estimator.estimate_message(m))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    fn manager(max_tokens: usize, ratio: f64, keep: usize) -> ContextManager {
        ContextManager::with_estimator(
            MemoryConfig {
                max_tokens,
                summary_trigger_ratio: ratio,
                keep_recent_messages: keep,
            },
            TokenEstimator::heuristic(),
        )
        .unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ContextManager::new(MemoryConfig {
            max_tokens: 0,
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_track_store() {
        let mut mgr = manager(6000, 0.75, 6);
        assert_eq!(mgr.get_stats().total_messages, 0);
        assert_eq!(mgr.get_stats().total_tokens, 0);

        mgr.add_message(Message::system("prompt"));
        mgr.add_message(Message::user("hello there"));
        mgr.add_message(Message::assistant("hi"));

        let stats = mgr.get_stats();
        assert_eq!(stats.total_messages, mgr.messages().len());
        assert!(stats.total_tokens > 0);
        assert_eq!(stats.summarization_count, 0);
        assert!(!stats.capacity_exceeded);
        assert_eq!(stats.estimator_mode, EstimatorMode::Heuristic);
    }

    #[test]
    fn test_below_trigger_returns_everything() {
        let mut mgr = manager(6000, 0.75, 6);
        mgr.add_message(Message::system("prompt"));
        for i in 0..4 {
            mgr.add_message(Message::user(&format!("question {}", i)));
            mgr.add_message(Message::assistant(&format!("answer {}", i)));
        }

        let count = mgr.messages().len();
        assert_eq!(mgr.get_trimmed_messages().len(), count);
        assert_eq!(mgr.get_stats().summarization_count, 0);
    }

    #[test]
    fn test_trigger_compacts_and_keeps_recent() {
        let mut mgr = manager(100, 0.75, 2);
        mgr.add_message(Message::system("Be brief."));
        for i in 0..10 {
            mgr.add_message(Message::user(&format!("about topic {}?", i)));
            mgr.add_message(Message::assistant(&format!("topic {} answer", i)));
        }
        let last_two: Vec<String> = mgr.messages()[mgr.messages().len() - 2..]
            .iter()
            .map(|m| m.content.clone())
            .collect();

        let trimmed = mgr.get_trimmed_messages().to_vec();

        // system + summary + recent window
        assert!(trimmed.len() < 21);
        assert_eq!(trimmed[0].role, Role::System);
        assert_eq!(trimmed[0].content, "Be brief.");
        assert!(trimmed[1].is_summary());
        let tail: Vec<String> = trimmed[trimmed.len() - 2..]
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(tail, last_two);

        let stats = mgr.get_stats();
        assert!(stats.summarization_count >= 1);
        assert!(stats.utilization_percent < 75.0);
    }

    #[test]
    fn test_trim_is_idempotent() {
        let mut mgr = manager(100, 0.75, 2);
        for i in 0..12 {
            mgr.add_message(Message::user(&format!(
                "A moderately long request about subject {}",
                i
            )));
        }

        let first = mgr.get_trimmed_messages().to_vec();
        let count = mgr.get_stats().summarization_count;
        let second = mgr.get_trimmed_messages().to_vec();

        assert_eq!(first, second);
        assert_eq!(mgr.get_stats().summarization_count, count);
    }

    #[test]
    fn test_oversized_recent_window_reports_capacity() {
        let mut mgr = manager(50, 0.75, 6);
        mgr.add_message(Message::system("prompt"));
        mgr.add_message(Message::user(&"enormous payload ".repeat(40)));

        // Both messages sit in the protected prefix + recent window, so
        // nothing can be trimmed.
        assert_eq!(mgr.get_trimmed_messages().len(), 2);
        let stats = mgr.get_stats();
        assert!(stats.capacity_exceeded);
        assert!(stats.utilization_percent > 100.0);
        assert_eq!(stats.summarization_count, 0);
    }

    #[test]
    fn test_reset_preserves_system_message() {
        let mut mgr = manager(100, 0.75, 2);
        mgr.add_message(Message::system("prompt"));
        for i in 0..10 {
            mgr.add_message(Message::user(&format!("filler message number {}", i)));
        }
        mgr.get_trimmed_messages();

        mgr.reset();

        assert_eq!(mgr.messages().len(), 1);
        assert_eq!(mgr.messages()[0].content, "prompt");
        let stats = mgr.get_stats();
        assert_eq!(stats.summarization_count, 0);
        assert!(stats.total_tokens > 0);
        assert_eq!(
            stats.total_tokens,
            mgr.estimator().estimate_message(&mgr.messages()[0])
        );
    }

    #[test]
    fn test_summary_sequence_increments() {
        let mut mgr = manager(100, 0.75, 2);
        for round in 0..2 {
            for i in 0..10 {
                mgr.add_message(Message::user(&format!(
                    "Round {} request number {} with some padding words",
                    round, i
                )));
            }
            mgr.get_trimmed_messages();
        }
        assert!(mgr.get_stats().summarization_count >= 2);
    }
}
