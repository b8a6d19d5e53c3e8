// Keyscope Event Types
// Keyboard event kinds and the host event handed to handlers

use serde::Deserialize;
use strum_macros::{Display, EnumCount, EnumIter, EnumString};

/// The kind of keyboard event a scope is notified about.
///
/// The discriminants double as bit positions in an [`EventBitmap`](crate::EventBitmap),
/// so the order keydown, keypress, keyup is significant.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[repr(usize)]
pub enum EventType {
    #[default]
    KeyDown = 0,
    KeyPress = 1,
    KeyUp = 2,
}

impl EventType {
    /// Bit position of this event type
    pub fn index(self) -> usize {
        self as usize
    }

    /// Returns true if this is a KEYUP event
    pub fn is_release(self) -> bool {
        matches!(self, EventType::KeyUp)
    }
}

/// The element a keyboard event was dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventTarget {
    /// Tag name of the target element (e.g. "input")
    pub tag: String,
    /// Whether the target accepts free text input
    pub content_editable: bool,
}

impl EventTarget {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content_editable: false,
        }
    }

    pub fn editable(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content_editable: true,
        }
    }
}

/// A raw keyboard event as delivered by the host UI.
///
/// The same value is reported once per active scope while it propagates
/// outward; handlers receive it untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Key name as reported by the host, before normalization
    pub key: String,
    /// Element the event was dispatched to, if known
    pub target: Option<EventTarget>,
    /// Set by the host for auto-repeated keydown events
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: None,
            repeat: false,
        }
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = Some(target);
        self
    }

    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }
}
