//! Append-only message store with a protected system prompt.
//!
//! The store owns the authoritative conversation sequence. Messages are only
//! ever removed through [`MessageStore::replace_span`] during compaction, or
//! through an explicit [`MessageStore::clear`].

use crate::message::{Message, Role};

/// Ordered, append-only sequence of chat messages.
///
/// Invariant: if the store is non-empty and the first message is an organic
/// (non-summary) system message, that message is never removed or replaced by
/// compaction.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
}

impl MessageStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end. O(1) amortized, never fails.
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Read-only view of the full ordered sequence.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages in the store.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether index 0 holds a protected (organic) system message.
    ///
    /// Synthetic summaries also use the system role but are not protected.
    pub fn has_system_prefix(&self) -> bool {
        self.messages
            .first()
            .map(|m| m.role == Role::System && !m.is_summary())
            .unwrap_or(false)
    }

    /// Atomically remove the half-open range `[start, end)` and insert
    /// `summary` at `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range is empty or out of bounds, or if it would cover
    /// the protected system message at index 0. These are contract
    /// violations — bugs in the caller — and are never silently corrected.
    pub fn replace_span(&mut self, start: usize, end: usize, summary: Message) {
        assert!(
            start < end && end <= self.messages.len(),
            "replace_span range [{}, {}) invalid for store of length {}",
            start,
            end,
            self.messages.len()
        );
        assert!(
            !(self.has_system_prefix() && start == 0),
            "replace_span must not cover the protected system message at index 0"
        );

        self.messages.splice(start..end, std::iter::once(summary));
    }

    /// Empty the store.
    ///
    /// With `preserve_system`, a protected system message at index 0 is
    /// re-seeded as the sole remaining element.
    pub fn clear(&mut self, preserve_system: bool) {
        if preserve_system && self.has_system_prefix() {
            let system = self.messages.swap_remove(0);
            self.messages.clear();
            self.messages.push(system);
        } else {
            self.messages.clear();
        }
    }
}
