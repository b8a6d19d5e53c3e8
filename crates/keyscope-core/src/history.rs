// Keyscope Combination History
// Bounded sequence of reconstructed key combinations, newest last

use std::collections::VecDeque;

use crate::expression::SEQUENCE_SEPARATOR;
use crate::{EventType, KeyCombination};

/// History of key combinations shared by every scope of one engine instance.
///
/// Consecutive events are folded into one combination while keys are being
/// added; a repeated event for a key, or a keydown after any key has been
/// released, starts the next combination.
#[derive(Debug, Clone, Default)]
pub struct CombinationHistory {
    records: VecDeque<KeyCombination>,
    /// Whether the current combination has seen a keyup
    includes_keyup: bool,
}

impl CombinationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The newest combination
    pub fn current(&self) -> Option<&KeyCombination> {
        self.records.back()
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &KeyCombination> {
        self.records.iter()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.records.clear();
        self.includes_keyup = false;
    }

    /// Fold one normalized key event into the history.
    ///
    /// `capacity` is the longest registered sequence; after every call the
    /// history holds at most `max(1, capacity)` records.
    pub fn record(&mut self, key: &str, event_type: EventType, capacity: usize) {
        let starts_new = match self.records.back() {
            None => true,
            Some(current) => match event_type {
                EventType::KeyDown => {
                    current.has_event(key, EventType::KeyDown) || self.includes_keyup
                }
                EventType::KeyPress => {
                    current.has_event(key, EventType::KeyPress)
                        || current.has_event(key, EventType::KeyUp)
                }
                EventType::KeyUp => current.has_event(key, EventType::KeyUp),
            },
        };

        if starts_new {
            self.start_combination(key, event_type);
        } else if let Some(current) = self.records.back_mut() {
            current.merge(key, event_type);
            if event_type.is_release() {
                self.includes_keyup = true;
            }
        }
        self.shrink_to(capacity);

        log::trace!(
            "history after {} {}: {} record(s), current {:?}",
            event_type,
            key,
            self.records.len(),
            self.records.back().map(KeyCombination::id)
        );
    }

    /// Evict the oldest records until at most `max(1, capacity)` remain
    pub fn shrink_to(&mut self, capacity: usize) {
        let bound = capacity.max(1);
        while self.records.len() > bound {
            self.records.pop_front();
        }
    }

    /// Ids of the `window` records before the newest, oldest first, joined
    /// into a sequence prefix id
    pub fn prefix_id(&self, window: usize) -> String {
        let end = self.records.len().saturating_sub(1);
        let start = end.saturating_sub(window);
        self.records
            .range(start..end)
            .map(KeyCombination::id)
            .collect::<Vec<_>>()
            .join(SEQUENCE_SEPARATOR)
    }

    fn start_combination(&mut self, key: &str, event_type: EventType) {
        let next = match self.records.back() {
            Some(previous) => previous.successor(key, event_type),
            None => KeyCombination::seeded(key, event_type),
        };

        self.records.push_back(next);
        // A combination opened by a keyup already contains a release
        self.includes_keyup = event_type.is_release();
    }
}
