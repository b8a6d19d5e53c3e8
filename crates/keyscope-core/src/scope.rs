// Keyscope Scopes
// Per-focus-scope matcher tables and the innermost-first scope stack

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::expression::{is_valid_expression, parse_expression, ExpressionError, KeySet};
use crate::keymap::{Handler, HandlerMap, KeyBinding, KeyMap};
use crate::{EventBitmap, EventType};

/// Position of a scope in the stack, counted from the innermost scope
pub type ScopeIndex = usize;

/// A registered combination and the action it triggers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatcherCombination {
    pub keys: KeySet,
    pub size: usize,
    pub event_type: EventType,
    pub action: String,
}

impl MatcherCombination {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }
}

/// Combinations that share one sequence prefix
#[derive(Debug, Clone, Default)]
pub struct MatcherBucket {
    combinations: IndexMap<String, MatcherCombination>,
    /// Combination ids, largest key set first
    order: Vec<String>,
}

impl MatcherBucket {
    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn get(&self, combination_id: &str) -> Option<&MatcherCombination> {
        self.combinations.get(combination_id)
    }

    /// Combinations in match priority order
    pub fn prioritized(&self) -> impl Iterator<Item = &MatcherCombination> {
        self.order
            .iter()
            .filter_map(move |id| self.combinations.get(id))
    }

    fn insert(&mut self, combination_id: String, combination: MatcherCombination) {
        // The first declaration of a combination under a prefix wins
        if let Some(existing) = self.combinations.get(&combination_id) {
            log::warn!(
                "'{}' ({}) for action '{}' is shadowed by the earlier binding for '{}' ({})",
                combination_id,
                combination.event_type,
                combination.action,
                existing.action,
                existing.event_type
            );
            return;
        }
        self.combinations.insert(combination_id, combination);
    }

    fn prioritize(&mut self) {
        let mut order: Vec<(usize, &String)> = self
            .combinations
            .iter()
            .map(|(id, combination)| (combination.size, id))
            .collect();
        // Stable: equal sizes keep declaration order
        order.sort_by(|a, b| b.0.cmp(&a.0));
        self.order = order.into_iter().map(|(_, id)| id.clone()).collect();
    }
}

/// Compiled key map and handlers of one focused UI component
#[derive(Default)]
pub struct Scope {
    matcher: HashMap<String, MatcherBucket>,
    event_types: EventBitmap,
    longest_sequence: usize,
    handlers: HandlerMap,
}

impl Scope {
    /// Whether the scope declares no key bindings at all
    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    pub fn bucket(&self, prefix_id: &str) -> Option<&MatcherBucket> {
        self.matcher.get(prefix_id)
    }

    /// Event types this scope has bindings for
    pub fn event_types(&self) -> EventBitmap {
        self.event_types
    }

    pub fn binds(&self, event_type: EventType) -> bool {
        self.event_types.is_set(event_type)
    }

    /// Combination count of the longest sequence this scope binds
    pub fn longest_sequence(&self) -> usize {
        self.longest_sequence
    }

    pub fn handler(&self, action: &str) -> Option<&Handler> {
        self.handlers.get(action)
    }

    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("prefixes", &self.matcher.keys().collect::<Vec<_>>())
            .field("event_types", &self.event_types)
            .field("longest_sequence", &self.longest_sequence)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Compiles a key map and handler map into a [`Scope`].
///
/// Handler keys that are not declared actions but are valid key expressions
/// ("hard sequences") are bound to synthesized action names
/// `__hard_sequence_{scope}_{n}`, counted per builder.
#[derive(Debug)]
pub struct ScopeBuilder {
    scope_index: ScopeIndex,
    synthesized: usize,
}

impl ScopeBuilder {
    /// Create a builder for the scope that will sit at `scope_index`
    pub fn new(scope_index: ScopeIndex) -> Self {
        Self {
            scope_index,
            synthesized: 0,
        }
    }

    pub fn build(mut self, key_map: &KeyMap, handlers: HandlerMap) -> Result<Scope, ExpressionError> {
        let mut bindings: Vec<(String, KeyBinding)> = key_map
            .iter()
            .flat_map(|(action, value)| {
                value
                    .bindings()
                    .iter()
                    .map(move |binding| (action.clone(), binding.clone()))
            })
            .collect();

        let mut resolved_handlers = HandlerMap::with_capacity(handlers.len());
        for (name, handler) in handlers {
            if !key_map.contains_key(&name) && is_valid_expression(&name) {
                let action = self.synthesize_action_name();
                log::trace!(
                    "scope {}: hard sequence '{}' bound as {}",
                    self.scope_index,
                    name,
                    action
                );
                bindings.push((action.clone(), KeyBinding::from(name)));
                resolved_handlers.insert(action, handler);
            } else {
                resolved_handlers.insert(name, handler);
            }
        }

        let mut scope = Scope {
            handlers: resolved_handlers,
            ..Scope::default()
        };

        for (action, binding) in bindings {
            let parsed = parse_expression(binding.sequence(), binding.event_type())?;
            let combination = parsed.combination;

            scope.longest_sequence = scope.longest_sequence.max(parsed.length);
            scope.event_types = scope.event_types.set(combination.event_type);
            scope
                .matcher
                .entry(parsed.prefix_id)
                .or_default()
                .insert(
                    combination.id,
                    MatcherCombination {
                        keys: combination.keys,
                        size: combination.size,
                        event_type: combination.event_type,
                        action,
                    },
                );
        }

        for bucket in scope.matcher.values_mut() {
            bucket.prioritize();
        }

        Ok(scope)
    }

    fn synthesize_action_name(&mut self) -> String {
        let name = format!("__hard_sequence_{}_{}", self.scope_index, self.synthesized);
        self.synthesized += 1;
        name
    }
}

/// Registered scopes, innermost first, with indices that stay stable while
/// the stack is alive
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    longest_sequence: usize,
    event_types: EventBitmap,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Append the next scope outward and return its index
    pub fn push(&mut self, scope: Scope) -> ScopeIndex {
        self.longest_sequence = self.longest_sequence.max(scope.longest_sequence);
        self.event_types = self.event_types.union(scope.event_types);
        self.scopes.push(scope);
        self.scopes.len() - 1
    }

    pub fn get(&self, index: ScopeIndex) -> Option<&Scope> {
        self.scopes.get(index)
    }

    /// Index of the outermost scope
    pub fn outermost(&self) -> Option<ScopeIndex> {
        self.scopes.len().checked_sub(1)
    }

    /// Longest sequence over every scope in the stack
    pub fn longest_sequence(&self) -> usize {
        self.longest_sequence
    }

    /// Whether any scope binds `event_type`
    pub fn binds(&self, event_type: EventType) -> bool {
        self.event_types.is_set(event_type)
    }

    /// Handler for `action` in the innermost scope that defines it, looking
    /// no further out than `through`
    pub fn resolve_handler(&self, action: &str, through: ScopeIndex) -> Option<(ScopeIndex, &Handler)> {
        self.scopes
            .iter()
            .enumerate()
            .take(through.saturating_add(1))
            .find_map(|(index, scope)| scope.handler(action).map(|h| (index, h)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn clear(&mut self) {
        self.scopes.clear();
        self.longest_sequence = 0;
        self.event_types = EventBitmap::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::{handler, KeyMapValue};

    fn key_map(entries: &[(&str, KeyMapValue)]) -> KeyMap {
        entries
            .iter()
            .map(|(action, value)| (action.to_string(), value.clone()))
            .collect()
    }

    fn noop_handlers(names: &[&str]) -> HandlerMap {
        names
            .iter()
            .map(|name| (name.to_string(), handler(|_| {})))
            .collect()
    }

    #[test]
    fn test_build_single_combinations() {
        let map = key_map(&[("save", "ctrl+s".into()), ("quit", "q".into())]);
        let scope = ScopeBuilder::new(0).build(&map, HandlerMap::new()).unwrap();

        let bucket = scope.bucket("").unwrap();
        assert_eq!(bucket.len(), 2);
        assert_eq!(bucket.get("Control+s").unwrap().action, "save");
        assert_eq!(scope.longest_sequence(), 1);
        assert!(scope.binds(EventType::KeyDown));
        assert!(!scope.binds(EventType::KeyUp));
    }

    #[test]
    fn test_build_sequences_and_event_types() {
        let map = key_map(&[
            ("top", "g g".into()),
            (
                "next",
                vec![KeyBinding::from("j"), KeyBinding::new("down", EventType::KeyUp)].into(),
            ),
        ]);
        let scope = ScopeBuilder::new(0).build(&map, HandlerMap::new()).unwrap();

        assert_eq!(scope.bucket("g").unwrap().get("g").unwrap().action, "top");
        assert_eq!(scope.bucket("").unwrap().len(), 2);
        assert_eq!(scope.longest_sequence(), 2);
        assert!(scope.binds(EventType::KeyUp));
        assert!(!scope.binds(EventType::KeyPress));
    }

    #[test]
    fn test_priority_order_largest_first_and_stable() {
        let map = key_map(&[
            ("plain", "a".into()),
            ("ctrl", "ctrl+a".into()),
            ("ctrl_shift", "ctrl+shift+a".into()),
            ("other_ctrl", "ctrl+b".into()),
        ]);
        let scope = ScopeBuilder::new(0).build(&map, HandlerMap::new()).unwrap();
        let actions: Vec<&str> = scope
            .bucket("")
            .unwrap()
            .prioritized()
            .map(|c| c.action.as_str())
            .collect();
        assert_eq!(actions, vec!["ctrl_shift", "ctrl", "other_ctrl", "plain"]);
    }

    #[test]
    fn test_hard_sequence_folding() {
        let map = key_map(&[("save", "ctrl+s".into())]);
        let handlers = noop_handlers(&["save", "shift+?", "not_a_key"]);
        let scope = ScopeBuilder::new(3).build(&map, handlers).unwrap();

        let synthesized = &scope.bucket("").unwrap().get("?+Shift").unwrap().action;
        assert_eq!(synthesized, "__hard_sequence_3_0");
        assert!(scope.handler("__hard_sequence_3_0").is_some());
        assert!(scope.handler("shift+?").is_none());
        assert!(scope.handler("save").is_some());
        // Not an expression and not declared: kept as-is for outer scopes' actions
        assert!(scope.handler("not_a_key").is_some());
    }

    #[test]
    fn test_duplicate_combination_keeps_first_declaration() {
        let map = key_map(&[
            (
                "next",
                vec![KeyBinding::from("a"), KeyBinding::new("a", EventType::KeyUp)].into(),
            ),
            ("other", "a".into()),
        ]);
        let scope = ScopeBuilder::new(0).build(&map, HandlerMap::new()).unwrap();

        let bucket = scope.bucket("").unwrap();
        assert_eq!(bucket.len(), 1);
        let kept = bucket.get("a").unwrap();
        assert_eq!(kept.action, "next");
        assert_eq!(kept.event_type, EventType::KeyDown);
        assert_eq!(bucket.prioritized().count(), 1);
    }

    #[test]
    fn test_declared_action_is_never_folded() {
        // "a" is both a declared action name and a valid expression
        let map = key_map(&[("a", "b".into())]);
        let scope = ScopeBuilder::new(0).build(&map, noop_handlers(&["a"])).unwrap();
        assert!(scope.handler("a").is_some());
        assert!(scope.bucket("").unwrap().get("a").is_none());
    }

    #[test]
    fn test_malformed_expression_is_rejected() {
        let map = key_map(&[("broken", "ctrl+".into())]);
        let result = ScopeBuilder::new(0).build(&map, HandlerMap::new());
        assert!(matches!(result, Err(ExpressionError::DanglingSeparator(_))));
    }

    #[test]
    fn test_stack_tracks_derived_state() {
        let mut stack = ScopeStack::new();
        let inner = ScopeBuilder::new(0)
            .build(&key_map(&[("x", "a".into())]), noop_handlers(&["x"]))
            .unwrap();
        let outer = ScopeBuilder::new(1)
            .build(
                &key_map(&[("y", KeyBinding::new("a b c", EventType::KeyUp).into())]),
                noop_handlers(&["x", "y"]),
            )
            .unwrap();

        assert_eq!(stack.push(inner), 0);
        assert_eq!(stack.push(outer), 1);
        assert_eq!(stack.outermost(), Some(1));
        assert_eq!(stack.longest_sequence(), 3);
        assert!(stack.binds(EventType::KeyDown));
        assert!(stack.binds(EventType::KeyUp));

        assert_eq!(stack.resolve_handler("x", 1).map(|(i, _)| i), Some(0));
        assert_eq!(stack.resolve_handler("y", 1).map(|(i, _)| i), Some(1));
        assert!(stack.resolve_handler("y", 0).is_none());

        stack.clear();
        assert!(stack.is_empty());
        assert_eq!(stack.longest_sequence(), 0);
        assert!(!stack.binds(EventType::KeyDown));
    }
}
