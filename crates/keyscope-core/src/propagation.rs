// Keyscope Propagation Tracking
// Bookkeeping for one physical key event reported once per scope

use crate::ScopeIndex;

/// State shared by every scope call made for one physical key event.
///
/// The host reports an event to scope 0, then 1, and so on outward. A call
/// whose index is not greater than the last one seen must belong to a new
/// physical event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    last_seen_scope: ScopeIndex,
    handled: bool,
    ignored: bool,
    in_flight: bool,
}

impl Propagation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a call for `scope_index` starts a new physical event
    pub fn is_first_sighting(&self, scope_index: ScopeIndex) -> bool {
        self.last_seen_scope >= scope_index
    }

    /// Start tracking a new physical event
    pub fn begin(&mut self, ignored: bool) {
        self.handled = false;
        self.ignored = ignored;
        self.in_flight = true;
    }

    /// Whether the ignore predicate rejected this event
    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Whether a handler has already fired for this event
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    /// Whether an event has been seen by some scope but not yet by the
    /// outermost one
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn last_seen_scope(&self) -> ScopeIndex {
        self.last_seen_scope
    }

    /// Finish the call for `scope_index`, resetting once the outermost scope
    /// of a stack of `stack_len` scopes has seen the event
    pub fn finish(&mut self, scope_index: ScopeIndex, stack_len: usize) {
        if scope_index.saturating_add(1) >= stack_len {
            *self = Self::default();
        } else {
            self.last_seen_scope = scope_index;
        }
    }
}
