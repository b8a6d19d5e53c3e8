// Keyscope Key Combination
// Cumulative set of keys observed as one logical combination

use std::fmt;

use indexmap::IndexMap;

use crate::expression::combination_id;
use crate::{EventBitmap, EventType};

/// Event bits of one key before and after its latest update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    /// Bits as of the update before the latest one
    pub previous: EventBitmap,
    /// Bits immediately after the latest update
    pub current: EventBitmap,
}

impl Transition {
    /// Transition of a key first seen with `event_type`
    pub fn initial(event_type: EventType) -> Self {
        Self {
            previous: EventBitmap::new(),
            current: EventBitmap::with(event_type),
        }
    }

    /// Transition of a key whose bits did not change
    pub fn steady(bits: EventBitmap) -> Self {
        Self {
            previous: bits,
            current: bits,
        }
    }

    /// Next transition after `event_type` is observed
    #[must_use]
    pub fn advance(self, event_type: EventType) -> Self {
        Self {
            previous: self.current,
            current: self.current.set(event_type),
        }
    }

    pub fn is_asserted(&self, event_type: EventType) -> bool {
        self.current.is_set(event_type)
    }

    /// False before the latest update, true after it
    pub fn is_rising(&self, event_type: EventType) -> bool {
        !self.previous.is_set(event_type) && self.current.is_set(event_type)
    }
}

/// A key combination in the history.
///
/// The id is recomputed by every mutator, so it always matches the key set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyCombination {
    id: String,
    keys: IndexMap<String, Transition>,
}

impl KeyCombination {
    /// Create an empty combination
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a combination holding a single key
    pub fn seeded(key: &str, event_type: EventType) -> Self {
        let mut combination = Self::new();
        combination.insert(key, Transition::initial(event_type));
        combination
    }

    /// Canonical id of the key set
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Transition> {
        self.keys.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    /// Check whether `key` has the `event_type` bit in its current bitmap
    pub fn has_event(&self, key: &str, event_type: EventType) -> bool {
        self.keys
            .get(key)
            .map(|t| t.is_asserted(event_type))
            .unwrap_or(false)
    }

    /// Iterate over keys and their transitions in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Transition)> {
        self.keys.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// Record `event_type` for `key` within this combination
    pub fn merge(&mut self, key: &str, event_type: EventType) {
        let transition = match self.keys.get(key) {
            Some(existing) => existing.advance(event_type),
            None => Transition::initial(event_type),
        };
        self.insert(key, transition);
    }

    /// Start the combination that follows this one.
    ///
    /// Keys without a recorded keyup are still physically held and carry
    /// over with steady bits. `key` is then added with a fresh rising edge,
    /// unless it is itself still held: a held key cannot rise again until it
    /// is released.
    pub fn successor(&self, key: &str, event_type: EventType) -> Self {
        let mut next = Self::new();
        for (name, transition) in &self.keys {
            if !transition.is_asserted(EventType::KeyUp) {
                next.keys
                    .insert(name.clone(), Transition::steady(transition.current));
            }
        }

        let still_held = next
            .keys
            .get(key)
            .map(|t| t.is_asserted(event_type))
            .unwrap_or(false);
        if !still_held {
            next.keys.insert(key.to_string(), Transition::initial(event_type));
        }

        next.refresh_id();
        next
    }

    fn insert(&mut self, key: &str, transition: Transition) {
        self.keys.insert(key.to_string(), transition);
        self.refresh_id();
    }

    fn refresh_id(&mut self) {
        self.id = combination_id(self.keys.keys().map(String::as_str));
    }
}

impl fmt::Display for KeyCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}
