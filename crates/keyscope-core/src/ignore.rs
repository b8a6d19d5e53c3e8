// Keyscope Ignore Predicate
// Process-wide decision whether a key event should bypass matching entirely

use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use regex::Regex;

use crate::KeyEvent;

/// Predicate deciding whether an event is ignored
pub type IgnorePredicate = Arc<dyn Fn(&KeyEvent) -> bool + Send + Sync>;

/// Host-installed predicate; `None` means the default applies
static IGNORE_PREDICATE: LazyLock<RwLock<Option<IgnorePredicate>>> =
    LazyLock::new(|| RwLock::new(None));

static TEXT_INPUT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(input|select|textarea)$").expect("text input pattern is a valid regex")
});

/// Install a process-wide ignore predicate, replacing the current one
pub fn set_ignore_event_predicate(predicate: impl Fn(&KeyEvent) -> bool + Send + Sync + 'static) {
    *IGNORE_PREDICATE.write() = Some(Arc::new(predicate));
}

/// Restore the default ignore predicate
pub fn reset_ignore_event_predicate() {
    *IGNORE_PREDICATE.write() = None;
}

/// Whether `event` should skip history and matching
pub fn should_ignore_event(event: &KeyEvent) -> bool {
    // Clone out of the lock so a predicate may itself reconfigure it
    let predicate = IGNORE_PREDICATE.read().clone();
    match predicate {
        Some(predicate) => predicate(event),
        None => default_ignore_event(event),
    }
}

/// Ignore events typed into text fields
pub fn default_ignore_event(event: &KeyEvent) -> bool {
    let Some(target) = &event.target else {
        return false;
    };
    if target.content_editable {
        return true;
    }
    TEXT_INPUT_TAG.is_match(&target.tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EventTarget;

    #[test]
    fn test_default_ignores_text_fields() {
        assert!(default_ignore_event(
            &KeyEvent::new("a").with_target(EventTarget::new("INPUT"))
        ));
        assert!(default_ignore_event(
            &KeyEvent::new("a").with_target(EventTarget::new("textarea"))
        ));
        assert!(default_ignore_event(
            &KeyEvent::new("a").with_target(EventTarget::editable("div"))
        ));
        assert!(!default_ignore_event(
            &KeyEvent::new("a").with_target(EventTarget::new("div"))
        ));
        assert!(!default_ignore_event(&KeyEvent::new("a")));
    }

    #[test]
    fn test_custom_predicate_can_be_installed_and_reset() {
        // Only events aimed at this tag are affected, so concurrently running
        // tests keep seeing default behaviour.
        let marked = KeyEvent::new("a").with_target(EventTarget::new("ignore-marker"));
        let field = KeyEvent::new("a").with_target(EventTarget::new("input"));

        assert!(!should_ignore_event(&marked));

        set_ignore_event_predicate(|event| {
            event.target.as_ref().map(|t| t.tag.as_str()) == Some("ignore-marker")
                || default_ignore_event(event)
        });
        assert!(should_ignore_event(&marked));
        assert!(should_ignore_event(&field));

        reset_ignore_event_predicate();
        assert!(!should_ignore_event(&marked));
        assert!(should_ignore_event(&field));
    }
}
