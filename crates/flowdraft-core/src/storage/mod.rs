//! Persistence gateway for diagram documents.

mod autosave;
mod library;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

#[cfg(target_arch = "wasm32")]
mod local;

pub use autosave::{AutoSaver, SaveTicket};
pub use library::{DiagramLibrary, DEFAULT_DIAGRAM_NAME, unique_name};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
pub use local::LocalStorage;

use crate::model::{Diagram, now_millis};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Diagram not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Key-value document store for diagrams.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait DiagramStorage: Send + Sync {
    /// Load a diagram; `NotFound` if absent.
    fn get(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// Create or overwrite a diagram. Returns the stored copy with its
    /// new revision and `updated_at`.
    fn put(&self, diagram: &Diagram) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// All diagrams, most recently modified first.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Diagram>>>;

    /// Delete a diagram. Removing a missing id is not an error.
    fn remove(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Check if a diagram exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Key-value document store for diagrams (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait DiagramStorage {
    /// Load a diagram; `NotFound` if absent.
    fn get(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// Create or overwrite a diagram. Returns the stored copy with its
    /// new revision and `updated_at`.
    fn put(&self, diagram: &Diagram) -> BoxFuture<'_, StorageResult<Diagram>>;

    /// All diagrams, most recently modified first.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Diagram>>>;

    /// Delete a diagram. Removing a missing id is not an error.
    fn remove(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Check if a diagram exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Copy of `diagram` as it will be written: revision bumped, `updated_at` now.
pub(crate) fn stamp(diagram: &Diagram) -> Diagram {
    let mut stored = diagram.clone();
    stored.updated_at = now_millis();
    stored.revision = Some(diagram.revision.unwrap_or(0) + 1);
    stored
}

/// Order diagrams most recently modified first.
pub(crate) fn sort_newest_first(diagrams: &mut [Diagram]) {
    diagrams.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
}

/// Convenience type alias for platform-specific storage.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStorage = FileStorage;

#[cfg(target_arch = "wasm32")]
pub type PlatformStorage = LocalStorage;

/// Create a platform-appropriate storage backend.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<PlatformStorage> {
    FileStorage::default_location()
}

#[cfg(target_arch = "wasm32")]
pub fn create_default_storage() -> StorageResult<PlatformStorage> {
    LocalStorage::new()
}

/// Minimal executor for driving storage futures in tests.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        if let Poll::Ready(result) = f.as_mut().poll(&mut cx) {
            return result;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_bumps_revision() {
        let mut diagram = Diagram::new("Flow");
        diagram.updated_at = 0;
        let first = stamp(&diagram);
        assert_eq!(first.revision, Some(1));
        assert!(first.updated_at > 0);
        assert_eq!(stamp(&first).revision, Some(2));
    }

    #[test]
    fn test_sort_newest_first() {
        let mut a = Diagram::new("A");
        a.updated_at = 10;
        let mut b = Diagram::new("B");
        b.updated_at = 30;
        let mut c = Diagram::new("C");
        c.updated_at = 20;
        let mut all = vec![a, b, c];
        sort_newest_first(&mut all);
        let names: Vec<_> = all.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "A"]);
    }
}
