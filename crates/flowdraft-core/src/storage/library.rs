//! Diagram catalogue operations on top of a storage backend.

use super::{DiagramStorage, StorageResult};
use crate::model::Diagram;
use std::sync::Arc;

/// Name given to diagrams created without one.
pub const DEFAULT_DIAGRAM_NAME: &str = "Diagram";

/// `name`, or `name (1)`, `name (2)`, ... whichever is not taken.
pub fn unique_name<'a>(name: &str, existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = existing.into_iter().collect();
    if !taken.contains(&name) {
        return name.to_string();
    }
    (1..)
        .map(|counter| format!("{name} ({counter})"))
        .find(|candidate| !taken.contains(&candidate.as_str()))
        .unwrap_or_else(|| name.to_string())
}

/// Create/list/delete diagrams through a shared storage backend.
pub struct DiagramLibrary<S: DiagramStorage + ?Sized> {
    storage: Arc<S>,
}

impl<S: DiagramStorage + ?Sized> Clone for DiagramLibrary<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: DiagramStorage + ?Sized> DiagramLibrary<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// All diagrams, most recently modified first.
    pub async fn list(&self) -> StorageResult<Vec<Diagram>> {
        self.storage.list().await
    }

    pub async fn get(&self, id: &str) -> StorageResult<Diagram> {
        self.storage.get(id).await
    }

    pub async fn remove(&self, id: &str) -> StorageResult<()> {
        self.storage.remove(id).await?;
        log::info!("Deleted diagram {id}");
        Ok(())
    }

    /// Names currently in use.
    pub async fn names(&self) -> StorageResult<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|d| d.name).collect())
    }

    /// Variant of `name` not used by any stored diagram.
    pub async fn unique_name(&self, name: &str) -> StorageResult<String> {
        let names = self.names().await?;
        Ok(unique_name(name, names.iter().map(String::as_str)))
    }

    /// Create and store an empty diagram, suffixing the name if taken.
    pub async fn create(&self, name: &str) -> StorageResult<Diagram> {
        let name = match name.trim() {
            "" => DEFAULT_DIAGRAM_NAME,
            trimmed => trimmed,
        };
        let diagram = Diagram::new(self.unique_name(name).await?);
        let stored = self.storage.put(&diagram).await?;
        log::info!("Created diagram {} ({})", stored.name, stored.id);
        Ok(stored)
    }

    /// Store a copy of diagram `id` under a new id and a `(copy)` name.
    ///
    /// Nodes, connections and viewport carry over unchanged.
    pub async fn duplicate(&self, id: &str) -> StorageResult<Diagram> {
        let source = self.storage.get(id).await?;
        let mut copy = Diagram::new(self.unique_name(&format!("{} (copy)", source.name)).await?);
        copy.nodes = source.nodes;
        copy.connections = source.connections;
        copy.viewport = source.viewport;
        let stored = self.storage.put(&copy).await?;
        log::info!("Duplicated diagram {id} as {} ({})", stored.name, stored.id);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Anchor, Connection, ConnectionId, Node, NodeId, NodeKind};
    use crate::storage::{MemoryStorage, StorageError, block_on};
    use crate::viewport::Viewport;
    use kurbo::{Point, Vec2};

    #[test]
    fn test_unique_name() {
        assert_eq!(unique_name("Flow", ["Other"]), "Flow");
        assert_eq!(unique_name("Flow", ["Flow"]), "Flow (1)");
        assert_eq!(unique_name("Flow", ["Flow", "Flow (1)", "Flow (3)"]), "Flow (2)");
    }

    #[test]
    fn test_create_suffixes_duplicates() {
        let library = DiagramLibrary::new(Arc::new(MemoryStorage::new()));
        let first = block_on(library.create("Payroll")).unwrap();
        let second = block_on(library.create("Payroll")).unwrap();
        let third = block_on(library.create("  ")).unwrap();

        assert_eq!(first.name, "Payroll");
        assert_eq!(second.name, "Payroll (1)");
        assert_eq!(third.name, DEFAULT_DIAGRAM_NAME);
        assert_ne!(first.id, second.id);
        assert_eq!(block_on(library.list()).unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_copies_content_under_new_id() {
        let library = DiagramLibrary::new(Arc::new(MemoryStorage::new()));
        let mut original = Diagram::new("Payroll");
        original.nodes = vec![
            Node::new(NodeId::new("n-1"), NodeKind::Start, Point::new(10.0, 20.0)),
            Node::new(NodeId::new("n-2"), NodeKind::End, Point::new(300.0, 20.0)),
        ];
        original.connections = vec![Connection {
            id: ConnectionId::new("c-1"),
            from: NodeId::new("n-1"),
            from_anchor: Anchor::Right,
            to: NodeId::new("n-2"),
            to_anchor: Anchor::Left,
        }];
        original.viewport = Viewport::new(1.5, Vec2::new(40.0, -10.0));
        let original = block_on(library.storage().put(&original)).unwrap();

        let copy = block_on(library.duplicate(&original.id)).unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Payroll (copy)");
        assert_eq!(copy.nodes, original.nodes);
        assert_eq!(copy.connections, original.connections);
        assert_eq!(copy.viewport, original.viewport);
        assert_eq!(copy.revision, Some(1));

        let again = block_on(library.duplicate(&original.id)).unwrap();
        assert_eq!(again.name, "Payroll (copy) (1)");
        assert_eq!(block_on(library.list()).unwrap().len(), 3);
    }

    #[test]
    fn test_duplicate_unknown_is_not_found() {
        let library = DiagramLibrary::new(Arc::new(MemoryStorage::new()));
        let result = block_on(library.duplicate("missing"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_remove() {
        let library = DiagramLibrary::new(Arc::new(MemoryStorage::new()));
        let diagram = block_on(library.create("Temp")).unwrap();
        block_on(library.remove(&diagram.id)).unwrap();
        assert!(block_on(library.get(&diagram.id)).is_err());
    }
}
