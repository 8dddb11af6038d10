//! Namespace (tenant/workspace) configuration store (spec.md §4.5).

use std::collections::HashMap;

use linkflow_types::{EngineError, Namespace};
use parking_lot::RwLock;

#[derive(Default)]
pub struct NamespaceStore {
    namespaces: RwLock<HashMap<String, Namespace>>,
}

impl NamespaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, namespace: Namespace) -> Result<(), EngineError> {
        let mut namespaces = self.namespaces.write();
        if namespaces.contains_key(&namespace.id) {
            return Err(EngineError::NamespaceExists(namespace.id));
        }
        namespaces.insert(namespace.id.clone(), namespace);
        Ok(())
    }

    pub fn get(&self, namespace_id: &str) -> Result<Namespace, EngineError> {
        self.namespaces
            .read()
            .get(namespace_id)
            .cloned()
            .ok_or_else(|| EngineError::NamespaceNotFound(namespace_id.to_string()))
    }

    pub fn update(&self, namespace: Namespace) -> Result<(), EngineError> {
        let mut namespaces = self.namespaces.write();
        if !namespaces.contains_key(&namespace.id) {
            return Err(EngineError::NamespaceNotFound(namespace.id));
        }
        namespaces.insert(namespace.id.clone(), namespace);
        Ok(())
    }

    pub fn list(&self) -> Vec<Namespace> {
        self.namespaces.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_rejects_duplicate_id() {
        let store = NamespaceStore::new();
        store.create(Namespace::new("ns1", "Production", "us-east")).unwrap();
        let err = store.create(Namespace::new("ns1", "Dup", "us-east")).unwrap_err();
        assert!(matches!(err, EngineError::NamespaceExists(_)));
    }

    #[test]
    fn update_requires_existing_namespace() {
        let store = NamespaceStore::new();
        let err = store.update(Namespace::new("ns1", "Production", "us-east")).unwrap_err();
        assert!(matches!(err, EngineError::NamespaceNotFound(_)));
    }
}
