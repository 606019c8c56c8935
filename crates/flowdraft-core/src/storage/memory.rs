//! In-memory storage implementation.

use super::{BoxFuture, DiagramStorage, StorageError, StorageResult, sort_newest_first, stamp};
use crate::model::Diagram;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    diagrams: RwLock<HashMap<String, Diagram>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl DiagramStorage for MemoryStorage {
    fn get(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let id = id.to_string();
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            diagrams.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn put(&self, diagram: &Diagram) -> BoxFuture<'_, StorageResult<Diagram>> {
        let stored = stamp(diagram);
        Box::pin(async move {
            let mut diagrams = self.diagrams.write().map_err(lock_error)?;
            diagrams.insert(stored.id.clone(), stored.clone());
            Ok(stored)
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Diagram>>> {
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            let mut all: Vec<Diagram> = diagrams.values().cloned().collect();
            sort_newest_first(&mut all);
            Ok(all)
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut diagrams = self.diagrams.write().map_err(lock_error)?;
            diagrams.remove(&id);
            Ok(())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let diagrams = self.diagrams.read().map_err(lock_error)?;
            Ok(diagrams.contains_key(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;

    #[test]
    fn test_put_get() {
        let storage = MemoryStorage::new();
        let diagram = Diagram::new("Test Diagram");

        let stored = block_on(storage.put(&diagram)).unwrap();
        assert_eq!(stored.revision, Some(1));

        let loaded = block_on(storage.get(&diagram.id)).unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.get("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_remove_and_exists() {
        let storage = MemoryStorage::new();
        let diagram = Diagram::new("Doc");
        block_on(storage.put(&diagram)).unwrap();
        assert!(block_on(storage.exists(&diagram.id)).unwrap());

        block_on(storage.remove(&diagram.id)).unwrap();
        assert!(!block_on(storage.exists(&diagram.id)).unwrap());
        // Removing twice is fine.
        block_on(storage.remove(&diagram.id)).unwrap();
    }

    #[test]
    fn test_list_newest_first() {
        let storage = MemoryStorage::new();
        let older = Diagram::new("Older");
        let newer = Diagram::new("Newer");
        block_on(storage.put(&older)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        block_on(storage.put(&newer)).unwrap();

        let list = block_on(storage.list()).unwrap();
        let names: Vec<_> = list.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["Newer", "Older"]);
    }
}
