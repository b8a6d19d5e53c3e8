// Keyscope Key Event Manager
// Resolves keyboard events against the registered scope stack
//
// One manager owns the scope stack, the combination history and the state of
// the physical event currently propagating. The host reports each event once
// per scope, innermost (index 0) to outermost, and in strictly increasing
// index order. Handlers must not dispatch further key events to the same
// manager while they run.

use crate::expression::ExpressionError;
use crate::ignore::should_ignore_event;
use crate::key::normalize_key_name;
use crate::keymap::{Handler, HandlerMap, KeyMap};
use crate::registry::InstanceId;
use crate::scope::{ScopeBuilder, ScopeIndex, ScopeStack};
use crate::{CombinationHistory, EventType, KeyEvent, Propagation};

/// An action chosen for the current event and the handler that runs it
struct Resolved {
    action: String,
    scope: ScopeIndex,
    handler: Handler,
}

/// Keyboard matching engine for one focus tree
#[derive(Debug)]
pub struct KeyEventManager {
    id: InstanceId,
    scopes: ScopeStack,
    history: CombinationHistory,
    propagation: Propagation,
    /// Focus left while an event was propagating; drop the scopes once it
    /// reaches the outermost scope
    retiring: bool,
    /// Scopes of the next focus tree, registered while the current one is
    /// retiring; they take over once the in-flight event finishes
    pending: Option<ScopeStack>,
}

impl KeyEventManager {
    /// Create a manager with no scopes
    pub fn new(id: InstanceId) -> Self {
        Self {
            id,
            scopes: ScopeStack::new(),
            history: CombinationHistory::new(),
            propagation: Propagation::new(),
            retiring: false,
            pending: None,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Register the next scope outward.
    ///
    /// Scopes register as focus bubbles out of the focused component, so
    /// the first registration is the innermost scope. The returned index must be
    /// passed with every event reported for this scope.
    ///
    /// While the previous tree is still finishing an event, new scopes are
    /// held back and only become active once that event has reached the
    /// outermost old scope.
    pub fn register_scope(
        &mut self,
        key_map: &KeyMap,
        handlers: HandlerMap,
    ) -> Result<ScopeIndex, ExpressionError> {
        let stack = if self.retiring {
            self.pending.get_or_insert_with(ScopeStack::new)
        } else {
            &mut self.scopes
        };

        let scope = ScopeBuilder::new(stack.len()).build(key_map, handlers)?;
        let index = stack.push(scope);
        log::debug!(
            "instance {}: registered {}scope {} (longest sequence {})",
            self.id,
            if self.retiring { "pending " } else { "" },
            index,
            stack.longest_sequence()
        );
        Ok(index)
    }

    /// Drop the whole scope stack after focus is lost.
    ///
    /// Returns this manager's id when an event is still propagating through
    /// the stack: the remaining calls for that event must keep being routed
    /// here, and the stack is dropped once the outermost scope has seen it.
    pub fn unregister_scope(&mut self) -> Option<InstanceId> {
        if self.propagation.is_in_flight() {
            log::debug!(
                "instance {}: focus lost mid-propagation at scope {}",
                self.id,
                self.propagation.last_seen_scope()
            );
            self.retiring = true;
            // A tree that registered meanwhile has lost focus as well
            self.pending = None;
            return Some(self.id);
        }

        log::debug!("instance {}: unregistered {} scope(s)", self.id, self.scopes.len());
        self.scopes.clear();
        self.history.shrink_to(self.scopes.longest_sequence());
        None
    }

    /// Report a keydown event for the scope at `scope_index`
    pub fn on_key_down(&mut self, event: &KeyEvent, scope_index: ScopeIndex) -> usize {
        self.dispatch(EventType::KeyDown, event, scope_index)
    }

    /// Report a keypress event for the scope at `scope_index`
    pub fn on_key_press(&mut self, event: &KeyEvent, scope_index: ScopeIndex) -> usize {
        self.dispatch(EventType::KeyPress, event, scope_index)
    }

    /// Report a keyup event for the scope at `scope_index`.
    ///
    /// Returns the number of scopes currently registered.
    pub fn on_key_up(&mut self, event: &KeyEvent, scope_index: ScopeIndex) -> usize {
        self.dispatch(EventType::KeyUp, event, scope_index)
    }

    /// Report `event` to every registered scope, innermost first, the way a
    /// host's event bubbling would
    pub fn propagate(&mut self, event_type: EventType, event: &KeyEvent) {
        for scope_index in 0..self.scopes.len() {
            self.dispatch(event_type, event, scope_index);
        }
    }

    /// Report one call of a propagating event and return the stack length
    pub fn dispatch(&mut self, event_type: EventType, event: &KeyEvent, scope_index: ScopeIndex) -> usize {
        let mut propagation = std::mem::take(&mut self.propagation);
        self.process(&mut propagation, event_type, event, scope_index);
        propagation.finish(scope_index, self.scopes.len());
        self.propagation = propagation;

        if self.retiring && !self.propagation.is_in_flight() {
            log::debug!("instance {}: in-flight event finished, dropping scopes", self.id);
            self.retiring = false;
            self.scopes = self.pending.take().unwrap_or_default();
            self.history.shrink_to(self.scopes.longest_sequence());
        }

        self.scopes.len()
    }

    fn process(
        &mut self,
        propagation: &mut Propagation,
        event_type: EventType,
        event: &KeyEvent,
        scope_index: ScopeIndex,
    ) {
        let key = normalize_key_name(&event.key);

        if propagation.is_first_sighting(scope_index) {
            let ignored = should_ignore_event(event);
            propagation.begin(ignored);
            if ignored {
                log::trace!("instance {}: ignoring {} {}", self.id, event_type, key);
            } else {
                self.history
                    .record(&key, event_type, self.scopes.longest_sequence());
            }
        }

        if propagation.is_ignored() || propagation.is_handled() || !self.scopes.binds(event_type) {
            return;
        }

        if let Some(resolved) = self.find_handler(scope_index, event_type, &key) {
            log::debug!(
                "instance {}: {} {} fired '{}' (handled by scope {})",
                self.id,
                event_type,
                key,
                resolved.action,
                resolved.scope
            );
            propagation.mark_handled();
            (resolved.handler)(event);
        }
    }

    /// Find the action matched at `scope_index` and its nearest handler
    fn find_handler(&self, scope_index: ScopeIndex, event_type: EventType, key: &str) -> Option<Resolved> {
        let Some(scope) = self.scopes.get(scope_index) else {
            log::warn!(
                "instance {}: event reported for unregistered scope {}",
                self.id,
                scope_index
            );
            return None;
        };
        if scope.is_empty() || !scope.binds(event_type) {
            return None;
        }

        let newest = self.history.current()?;
        let max_window = scope
            .longest_sequence()
            .min(self.history.len().saturating_sub(1));

        for window in (0..=max_window).rev() {
            let prefix = self.history.prefix_id(window);
            let Some(bucket) = scope.bucket(&prefix) else {
                continue;
            };
            log::trace!("instance {}: scope {} prefix '{}' hit", self.id, scope_index, prefix);

            for combination in bucket.prioritized() {
                if combination.event_type != event_type || !combination.contains(key) {
                    continue;
                }
                let rising = newest
                    .get(key)
                    .map(|t| t.is_rising(event_type))
                    .unwrap_or(false);
                let all_asserted = combination
                    .keys
                    .iter()
                    .all(|k| newest.has_event(k, event_type));
                if !rising || !all_asserted {
                    continue;
                }

                if let Some((index, handler)) = self.scopes.resolve_handler(&combination.action, scope_index) {
                    return Some(Resolved {
                        action: combination.action.clone(),
                        scope: index,
                        handler: handler.clone(),
                    });
                }
            }
        }

        None
    }

    /// Number of registered scopes
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    /// Longest registered sequence over every scope
    pub fn longest_sequence(&self) -> usize {
        self.scopes.longest_sequence()
    }

    /// Whether any scope binds `event_type`
    pub fn binds_event_type(&self, event_type: EventType) -> bool {
        self.scopes.binds(event_type)
    }

    pub fn history(&self) -> &CombinationHistory {
        &self.history
    }

    /// Whether an event has reached some scopes but not the outermost one
    pub fn is_propagating(&self) -> bool {
        self.propagation.is_in_flight()
    }

    /// Forget key history and any half-delivered event
    pub fn reset(&mut self) {
        self.history.clear();
        self.propagation = Propagation::new();
    }
}
