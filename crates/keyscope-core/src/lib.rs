// Keyscope Core Library
// Scoped keyboard shortcut matching for nested focus trees

pub mod bitmap;
pub mod combination;
pub mod event;
pub mod expression;
pub mod history;
pub mod ignore;
pub mod key;
pub mod keymap;
pub mod manager;
pub mod propagation;
pub mod registry;
pub mod scope;

#[cfg(feature = "scenario")]
pub mod config;

pub use bitmap::EventBitmap;
pub use combination::{KeyCombination, Transition};
pub use event::{EventTarget, EventType, KeyEvent};
pub use expression::{
    combination_id, is_valid_expression, parse_combinations, parse_expression, ExpressionError,
    ParsedSequence,
};
pub use history::CombinationHistory;
pub use ignore::{
    default_ignore_event, reset_ignore_event_predicate, set_ignore_event_predicate,
    should_ignore_event,
};
pub use key::normalize_key_name;
pub use keymap::{handler, Handler, HandlerMap, KeyBinding, KeyMap, KeyMapValue};
pub use manager::KeyEventManager;
pub use propagation::Propagation;
pub use registry::{InstanceId, InstanceOptions, InstanceRegistry};
pub use scope::ScopeIndex;

#[cfg(feature = "scenario")]
pub use config::{ConfigError, EventConfig, Scenario, ScenarioSettings, ScopeConfig};
