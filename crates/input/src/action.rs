use std::collections::BTreeMap;

/// A discrete action any host (desktop window, headless CLI) can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Drop a new box into the world.
    Spawn,
    /// Lift the primary entity straight up.
    Jump,
    /// Show or hide the debug panel.
    ToggleDebugPanel,
    /// The drawable surface changed size.
    Resize { width: u32, height: u32 },
    /// Unbound input.
    Noop,
}

/// Key-name to action bindings.
///
/// Key names are the host's own spelling (for winit, the `Debug` form of
/// `KeyCode`: `"Space"`, `"KeyJ"`, `"F1"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputMap {
    bindings: BTreeMap<String, Action>,
}

impl Default for InputMap {
    fn default() -> Self {
        let mut map = Self::empty();
        map.bind("Space", Action::Spawn);
        map.bind("KeyJ", Action::Jump);
        map.bind("F1", Action::ToggleDebugPanel);
        map
    }
}

impl InputMap {
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Bind `key` to `action`, replacing any previous binding for that key.
    pub fn bind(&mut self, key: &str, action: Action) {
        if let Some(old) = self.bindings.insert(key.to_string(), action) {
            if old != action {
                tracing::debug!(key, ?old, ?action, "rebound key");
            }
        }
    }

    pub fn action_for(&self, key: &str) -> Action {
        self.bindings.get(key).copied().unwrap_or(Action::Noop)
    }

    /// Keys currently bound to `action`, sorted.
    pub fn keys_for(&self, action: Action) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings() {
        let map = InputMap::default();
        assert_eq!(map.action_for("Space"), Action::Spawn);
        assert_eq!(map.action_for("KeyJ"), Action::Jump);
        assert_eq!(map.action_for("F1"), Action::ToggleDebugPanel);
    }

    #[test]
    fn unbound_key_is_noop() {
        assert_eq!(InputMap::default().action_for("KeyQ"), Action::Noop);
        assert_eq!(InputMap::empty().action_for("Space"), Action::Noop);
    }

    #[test]
    fn rebinding_replaces() {
        let mut map = InputMap::default();
        map.bind("Space", Action::Jump);
        assert_eq!(map.action_for("Space"), Action::Jump);
        assert_eq!(map.keys_for(Action::Jump), vec!["KeyJ", "Space"]);
        assert!(map.keys_for(Action::Spawn).is_empty());
    }

    #[test]
    fn resize_carries_dimensions() {
        let a = Action::Resize {
            width: 800,
            height: 600,
        };
        assert!(matches!(a, Action::Resize { width: 800, .. }));
    }
}
