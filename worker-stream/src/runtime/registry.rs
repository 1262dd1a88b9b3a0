//! In-process script registry

use super::{ResourceLocator, ResourceRegistry};
use crate::script::WorkerScript;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Locator scheme for registered scripts
pub const SCRIPT_SCHEME: &str = "worker-script";

/// Registry holding scripts in memory, keyed by `worker-script:<uuid>` locators
#[derive(Default)]
pub struct ScriptRegistry {
    scripts: RwLock<HashMap<ResourceLocator, WorkerScript>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unrevoked) locators
    pub fn len(&self) -> usize {
        self.scripts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.read().is_empty()
    }

    pub fn contains(&self, locator: &ResourceLocator) -> bool {
        self.scripts.read().contains_key(locator)
    }
}

impl ResourceRegistry for ScriptRegistry {
    fn make_loadable_resource(&self, script: WorkerScript) -> ResourceLocator {
        let locator = ResourceLocator::new(format!("{}:{}", SCRIPT_SCHEME, Uuid::new_v4()));
        self.scripts.write().insert(locator.clone(), script);
        tracing::debug!("Registered worker script at {}", locator);
        locator
    }

    fn resolve(&self, locator: &ResourceLocator) -> Option<WorkerScript> {
        self.scripts.read().get(locator).cloned()
    }

    fn revoke(&self, locator: &ResourceLocator) {
        if self.scripts.write().remove(locator).is_some() {
            tracing::debug!("Revoked worker script at {}", locator);
        } else {
            tracing::debug!("Worker script at {} was not registered", locator);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ReplyFraming;

    fn identity() -> WorkerScript {
        WorkerScript::new(|v: u8| async move { Ok::<_, ()>(v) }, ReplyFraming::Raw)
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ScriptRegistry::new();
        let locator = registry.make_loadable_resource(identity());

        assert!(locator.as_str().starts_with("worker-script:"));
        assert!(registry.contains(&locator));
        assert_eq!(
            registry.resolve(&locator).map(|s| s.framing()),
            Some(ReplyFraming::Raw)
        );
    }

    #[test]
    fn test_locators_are_unique() {
        let registry = ScriptRegistry::new();
        let a = registry.make_loadable_resource(identity());
        let b = registry.make_loadable_resource(identity());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_revoke() {
        let registry = ScriptRegistry::new();
        let locator = registry.make_loadable_resource(identity());

        registry.revoke(&locator);
        assert!(registry.is_empty());
        assert!(registry.resolve(&locator).is_none());

        // Revoking an unknown locator is harmless
        registry.revoke(&locator);
        registry.revoke(&ResourceLocator::new("somewhere/else.js"));
    }
}
