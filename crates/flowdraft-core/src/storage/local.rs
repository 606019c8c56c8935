//! Browser localStorage implementation for WebAssembly.

use super::{BoxFuture, DiagramStorage, StorageError, StorageResult, sort_newest_first, stamp};
use crate::model::Diagram;

const KEY_PREFIX: &str = "flowdraft:diagram:";

/// Stores each diagram as a JSON string under `flowdraft:diagram:<id>`.
///
/// Not Send/Sync; WASM is single-threaded.
pub struct LocalStorage {
    storage: web_sys::Storage,
}

fn js_error(context: &str, e: wasm_bindgen::JsValue) -> StorageError {
    StorageError::Io(format!("{context}: {e:?}"))
}

impl LocalStorage {
    /// Open the window's localStorage.
    pub fn new() -> StorageResult<Self> {
        let window = web_sys::window().ok_or_else(|| StorageError::Other("No window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| js_error("localStorage error", e))?
            .ok_or_else(|| StorageError::Other("localStorage not available".to_string()))?;
        Ok(Self { storage })
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    fn read(&self, key: &str) -> StorageResult<Option<Diagram>> {
        let Some(json) = self.storage.get_item(key).map_err(|e| js_error("Failed to read", e))? else {
            return Ok(None);
        };
        Diagram::from_json(&json)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("Failed to parse {key}: {e}")))
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let len = self.storage.length().map_err(|e| js_error("Failed to enumerate", e))?;
        let mut keys = Vec::new();
        for index in 0..len {
            if let Ok(Some(key)) = self.storage.key(index) {
                if key.starts_with(KEY_PREFIX) {
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }
}

impl DiagramStorage for LocalStorage {
    fn get(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let id = id.to_string();
        Box::pin(async move { self.read(&Self::key(&id))?.ok_or(StorageError::NotFound(id)) })
    }

    fn put(&self, diagram: &Diagram) -> BoxFuture<'_, StorageResult<Diagram>> {
        let stored = stamp(diagram);
        Box::pin(async move {
            let json = stored
                .to_json()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.storage
                .set_item(&Self::key(&stored.id), &json)
                .map_err(|e| js_error("Failed to write", e))?;
            Ok(stored)
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Diagram>>> {
        Box::pin(async move {
            let mut diagrams = Vec::new();
            for key in self.keys()? {
                match self.read(&key) {
                    Ok(Some(diagram)) => diagrams.push(diagram),
                    Ok(None) => {}
                    Err(e) => log::warn!("Skipping unreadable diagram: {e}"),
                }
            }
            sort_newest_first(&mut diagrams);
            Ok(diagrams)
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let key = Self::key(id);
        Box::pin(async move {
            self.storage
                .remove_item(&key)
                .map_err(|e| js_error("Failed to delete", e))
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let key = Self::key(id);
        Box::pin(async move {
            let item = self.storage.get_item(&key).map_err(|e| js_error("Failed to read", e))?;
            Ok(item.is_some())
        })
    }
}
