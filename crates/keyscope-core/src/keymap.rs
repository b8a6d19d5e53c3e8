// Keyscope Key Maps
// Action -> key expression declarations and action -> handler maps

use std::fmt;
use std::slice;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::{EventType, KeyEvent};

/// Callback run when an action fires
pub type Handler = Arc<dyn Fn(&KeyEvent) + Send + Sync>;

/// Action name (or hard-sequence expression) -> handler, in declaration order
pub type HandlerMap = IndexMap<String, Handler>;

/// Action name -> key expressions, in declaration order
pub type KeyMap = IndexMap<String, KeyMapValue>;

/// One key expression bound to an action
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyBinding {
    /// Bare expression, matched on keydown
    Expression(String),
    /// Expression matched on an explicit event type
    WithEventType {
        sequence: String,
        #[serde(default, rename = "event")]
        event_type: EventType,
    },
}

impl KeyBinding {
    pub fn new(sequence: impl Into<String>, event_type: EventType) -> Self {
        KeyBinding::WithEventType {
            sequence: sequence.into(),
            event_type,
        }
    }

    pub fn sequence(&self) -> &str {
        match self {
            KeyBinding::Expression(sequence) => sequence,
            KeyBinding::WithEventType { sequence, .. } => sequence,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            KeyBinding::Expression(_) => EventType::KeyDown,
            KeyBinding::WithEventType { event_type, .. } => *event_type,
        }
    }
}

impl From<&str> for KeyBinding {
    fn from(sequence: &str) -> Self {
        KeyBinding::Expression(sequence.to_string())
    }
}

impl From<String> for KeyBinding {
    fn from(sequence: String) -> Self {
        KeyBinding::Expression(sequence)
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyBinding::Expression(sequence) => write!(f, "{}", sequence),
            KeyBinding::WithEventType {
                sequence,
                event_type,
            } => write!(f, "{} ({})", sequence, event_type),
        }
    }
}

/// Value in a key map - one binding or a list of alternatives
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KeyMapValue {
    Single(KeyBinding),
    Alternatives(Vec<KeyBinding>),
}

impl KeyMapValue {
    /// All bindings, in declaration order
    pub fn bindings(&self) -> &[KeyBinding] {
        match self {
            KeyMapValue::Single(binding) => slice::from_ref(binding),
            KeyMapValue::Alternatives(bindings) => bindings,
        }
    }
}

impl From<KeyBinding> for KeyMapValue {
    fn from(binding: KeyBinding) -> Self {
        KeyMapValue::Single(binding)
    }
}

impl From<&str> for KeyMapValue {
    fn from(sequence: &str) -> Self {
        KeyMapValue::Single(sequence.into())
    }
}

impl<T: Into<KeyBinding>> From<Vec<T>> for KeyMapValue {
    fn from(bindings: Vec<T>) -> Self {
        KeyMapValue::Alternatives(bindings.into_iter().map(Into::into).collect())
    }
}

/// Wrap a closure as a [`Handler`]
pub fn handler(f: impl Fn(&KeyEvent) + Send + Sync + 'static) -> Handler {
    Arc::new(f)
}
