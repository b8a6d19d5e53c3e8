// Keyscope Scenario Config - TOML with Serde
// Nested scopes and a scripted event stream, loaded from a TOML file

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::expression::{is_valid_expression, parse_combinations, parse_expression, ExpressionError};
use crate::key::is_modifier_key;
use crate::keymap::KeyMap;
use crate::{EventTarget, EventType, KeyEvent};

/// Scenario config errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key expression: {0}")]
    InvalidExpression(#[from] ExpressionError),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}

/// Root TOML table
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Scopes, outermost first
    #[serde(default, rename = "scope")]
    pub scopes: Vec<ScopeConfig>,

    /// Events to replay, in order
    #[serde(default, rename = "event")]
    pub events: Vec<EventConfig>,

    #[serde(default)]
    pub settings: ScenarioSettings,
}

/// One focus scope
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScopeConfig {
    /// Label used when reporting which scope handled an action
    pub name: String,

    /// Action -> key expressions declared by this scope
    #[serde(default)]
    pub keymap: KeyMap,

    /// Actions (or hard-sequence expressions) this scope handles
    #[serde(default)]
    pub handlers: Vec<String>,
}

/// A scripted keyboard event
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EventConfig {
    /// Press and release every combination of an expression in turn
    Tap {
        tap: String,
        #[serde(default)]
        target: Option<String>,
    },
    /// A single raw event
    Key {
        key: String,
        #[serde(rename = "type")]
        event_type: EventType,
        #[serde(default)]
        target: Option<String>,
    },
}

/// Optional `[settings]` table
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSettings {
    /// Target tags whose events are ignored, replacing the default text-field
    /// list when non-empty
    #[serde(default)]
    pub ignore_targets: Vec<String>,
}

impl Scenario {
    /// Parse a TOML scenario file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a scenario from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check every expression up front, so that registration cannot fail
    /// halfway through the scope list
    pub fn validate(&self) -> Result<(), ConfigError> {
        for scope in &self.scopes {
            for (action, value) in &scope.keymap {
                for binding in value.bindings() {
                    parse_expression(binding.sequence(), binding.event_type())?;
                    log::trace!("scope '{}': {} -> {}", scope.name, action, binding);
                }
            }

            for name in &scope.handlers {
                let declared = self.scopes.iter().any(|s| s.keymap.contains_key(name));
                if !declared && !is_valid_expression(name) {
                    log::warn!(
                        "scope '{}' handles '{}', which no scope declares and is not a key expression",
                        scope.name,
                        name
                    );
                }
            }
        }

        for event in &self.events {
            event.expand()?;
        }

        log::debug!(
            "scenario has {} scope(s) and {} event(s)",
            self.scopes.len(),
            self.events.len()
        );
        Ok(())
    }
}

impl EventConfig {
    /// Raw events this entry stands for, in delivery order
    pub fn expand(&self) -> Result<Vec<(EventType, KeyEvent)>, ConfigError> {
        match self {
            EventConfig::Key {
                key,
                event_type,
                target,
            } => {
                if key.is_empty() {
                    return Err(ConfigError::InvalidEvent("event key cannot be empty".to_string()));
                }
                Ok(vec![(*event_type, make_event(key, target.as_deref()))])
            }
            EventConfig::Tap { tap, target } => {
                let mut events = Vec::new();
                for keys in parse_combinations(tap)? {
                    // Modifiers go down first and come up last
                    let mut ordered: Vec<&str> = keys
                        .iter()
                        .map(String::as_str)
                        .filter(|k| is_modifier_key(k))
                        .collect();
                    ordered.extend(keys.iter().map(String::as_str).filter(|k| !is_modifier_key(k)));

                    let suppresses_press = ordered.iter().any(|k| matches!(*k, "Control" | "Meta"));
                    for key in &ordered {
                        let event = make_event(key, target.as_deref());
                        events.push((EventType::KeyDown, event.clone()));
                        if !suppresses_press && key.chars().count() == 1 {
                            events.push((EventType::KeyPress, event));
                        }
                    }
                    for key in ordered.iter().rev() {
                        events.push((EventType::KeyUp, make_event(key, target.as_deref())));
                    }
                }
                Ok(events)
            }
        }
    }
}

fn make_event(key: &str, target: Option<&str>) -> KeyEvent {
    let event = KeyEvent::new(key);
    match target {
        Some(tag) => event.with_target(EventTarget::new(tag)),
        None => event,
    }
}
