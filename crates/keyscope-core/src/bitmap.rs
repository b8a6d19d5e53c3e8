// Keyscope Event Bitmap
// Fixed-width boolean vector indexed by event type

use std::fmt;

use strum::{EnumCount, IntoEnumIterator};

use crate::EventType;

/// One flag per [`EventType`].
///
/// Bitmaps are plain values: `set` returns a new bitmap so a caller can keep
/// the old one around as the "previous" half of a [`Transition`](crate::Transition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventBitmap([bool; EventType::COUNT]);

impl EventBitmap {
    /// Allocate a bitmap with no bits set
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a bitmap with a single bit set
    pub fn with(event_type: EventType) -> Self {
        Self::new().set(event_type)
    }

    /// Copy of this bitmap with `event_type` set
    #[must_use]
    pub fn set(mut self, event_type: EventType) -> Self {
        self.0[event_type.index()] = true;
        self
    }

    pub fn is_set(&self, event_type: EventType) -> bool {
        self.0[event_type.index()]
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|bit| *bit)
    }

    /// Bitwise OR of two bitmaps
    #[must_use]
    pub fn union(mut self, other: EventBitmap) -> Self {
        for (bit, other_bit) in self.0.iter_mut().zip(other.0) {
            *bit |= other_bit;
        }
        self
    }

    /// Event types whose bit is set, in bit order
    pub fn iter(&self) -> impl Iterator<Item = EventType> + '_ {
        EventType::iter().filter(move |event_type| self.is_set(*event_type))
    }
}

impl fmt::Display for EventBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", names.join(","))
    }
}
