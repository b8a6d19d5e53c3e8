// Keyscope Instance Registry
// Numbered key event managers that may overlap while an event finishes propagating

use std::fmt;

use indexmap::IndexMap;

use crate::KeyEventManager;

/// Identifier of a [`KeyEventManager`] within an [`InstanceRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for InstanceId {
    fn from(value: u64) -> Self {
        InstanceId(value)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Options for [`InstanceRegistry::instance`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstanceOptions {
    /// Create a fresh instance and make it current, even if one exists
    pub force_new: bool,
}

impl InstanceOptions {
    pub fn force_new() -> Self {
        Self { force_new: true }
    }
}

/// Owns every live [`KeyEventManager`].
///
/// Normally only the current instance is used. When focus moves while an
/// event is still propagating, the host asks for a new instance and keeps
/// routing the rest of the old event to the previous one by id; disposing of
/// the previous instance afterwards is up to the host (see
/// [`dispose_settled`](Self::dispose_settled)).
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    instances: IndexMap<InstanceId, KeyEventManager>,
    current: Option<InstanceId>,
    next_id: u64,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn current_id(&self) -> Option<InstanceId> {
        self.current
    }

    /// Look up an instance by id, or the current instance.
    ///
    /// An id that names a live instance always returns that instance. Without
    /// one, the current instance is returned, created lazily; `force_new`
    /// replaces the current instance with a fresh one, leaving the old one
    /// reachable by its id.
    pub fn instance(&mut self, id: Option<InstanceId>, options: InstanceOptions) -> &mut KeyEventManager {
        let id = match id {
            Some(id) if self.instances.contains_key(&id) => id,
            requested => {
                if let Some(missing) = requested {
                    log::warn!("instance {} is not registered, using current instance", missing);
                }
                let current = self.current;
                match current {
                    Some(current) if !options.force_new && self.instances.contains_key(&current) => current,
                    _ => self.allocate(),
                }
            }
        };

        self.instances
            .entry(id)
            .or_insert_with(|| KeyEventManager::new(id))
    }

    pub fn get(&self, id: InstanceId) -> Option<&KeyEventManager> {
        self.instances.get(&id)
    }

    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut KeyEventManager> {
        self.instances.get_mut(&id)
    }

    /// Remove an instance, or the current instance when `id` is `None`
    pub fn dispose(&mut self, id: Option<InstanceId>) -> Option<KeyEventManager> {
        let id = id.or(self.current)?;
        if self.current == Some(id) {
            self.current = None;
        }
        log::debug!("disposing instance {}", id);
        self.instances.shift_remove(&id)
    }

    /// Remove every non-current instance whose in-flight event has finished.
    ///
    /// Returns the number of instances removed.
    pub fn dispose_settled(&mut self) -> usize {
        let current = self.current;
        let before = self.instances.len();
        self.instances
            .retain(|id, manager| Some(*id) == current || manager.is_propagating());
        before - self.instances.len()
    }

    fn allocate(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(id, KeyEventManager::new(id));
        self.current = Some(id);
        log::debug!("created instance {}", id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyEvent, KeyMap};
    use crate::keymap::HandlerMap;

    #[test]
    fn test_current_instance_is_created_lazily() {
        let mut registry = InstanceRegistry::new();
        assert!(registry.is_empty());

        let first = registry.instance(None, InstanceOptions::default()).id();
        let again = registry.instance(None, InstanceOptions::default()).id();
        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.current_id(), Some(first));
    }

    #[test]
    fn test_force_new_keeps_previous_reachable() {
        let mut registry = InstanceRegistry::new();
        let old = registry.instance(None, InstanceOptions::default()).id();
        let new = registry.instance(None, InstanceOptions::force_new()).id();

        assert!(new > old);
        assert_eq!(registry.current_id(), Some(new));
        assert_eq!(registry.instance(Some(old), InstanceOptions::default()).id(), old);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_id_falls_back_to_current() {
        let mut registry = InstanceRegistry::new();
        let current = registry.instance(None, InstanceOptions::default()).id();
        let resolved = registry
            .instance(Some(InstanceId::from(99)), InstanceOptions::default())
            .id();
        assert_eq!(resolved, current);
    }

    #[test]
    fn test_dispose_current() {
        let mut registry = InstanceRegistry::new();
        let id = registry.instance(None, InstanceOptions::default()).id();
        let disposed = registry.dispose(None).map(|m| m.id());
        assert_eq!(disposed, Some(id));
        assert!(registry.current_id().is_none());
        assert!(registry.dispose(None).is_none());
    }

    #[test]
    fn test_dispose_settled_keeps_in_flight_instances() {
        let mut registry = InstanceRegistry::new();
        let old = registry.instance(None, InstanceOptions::default());
        old.register_scope(&KeyMap::new(), HandlerMap::new()).unwrap();
        old.register_scope(&KeyMap::new(), HandlerMap::new()).unwrap();
        old.on_key_down(&KeyEvent::new("a"), 0);
        let pending = old.unregister_scope();
        let old_id = old.id();
        assert_eq!(pending, Some(old_id));

        registry.instance(None, InstanceOptions::force_new());
        assert_eq!(registry.dispose_settled(), 0);

        if let Some(old) = registry.get_mut(old_id) {
            old.on_key_down(&KeyEvent::new("a"), 1);
        }
        assert_eq!(registry.dispose_settled(), 1);
        assert!(registry.get(old_id).is_none());
        assert_eq!(registry.len(), 1);
    }
}
