//! One JSON file per diagram, for native targets.

use super::{BoxFuture, DiagramStorage, StorageError, StorageResult, sort_newest_first, stamp};
use crate::model::Diagram;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each diagram as a JSON file in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Open a storage directory, creating it if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {e}"))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Storage under the platform's local data directory.
    ///
    /// On Unix: `~/.local/share/flowdraft/diagrams/`
    /// On Windows: `%LOCALAPPDATA%\flowdraft\diagrams\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join("flowdraft").join("diagrams"))
    }

    fn diagram_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", file_stem(id)))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// File name for an id. ASCII letters, digits and `-` are kept; every
/// other byte, `_` included, becomes `_xx` so distinct ids never share a file.
fn file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{byte:02x}"));
        }
    }
    stem
}

fn read_diagram(path: &Path) -> StorageResult<Diagram> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {e}", path.display())))?;
    Diagram::from_json(&json)
        .map_err(|e| StorageError::Serialization(format!("Failed to parse {}: {e}", path.display())))
}

impl DiagramStorage for FileStorage {
    fn get(&self, id: &str) -> BoxFuture<'_, StorageResult<Diagram>> {
        let path = self.diagram_path(id);
        let id = id.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id));
            }
            let diagram = read_diagram(&path)?;
            if diagram.id != id {
                return Err(StorageError::Other(format!(
                    "{} holds diagram {}, expected {id}",
                    path.display(),
                    diagram.id
                )));
            }
            Ok(diagram)
        })
    }

    fn put(&self, diagram: &Diagram) -> BoxFuture<'_, StorageResult<Diagram>> {
        let path = self.diagram_path(&diagram.id);
        let stored = stamp(diagram);
        Box::pin(async move {
            let json = stored
                .to_json()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            fs::write(&path, json)
                .map_err(|e| StorageError::Io(format!("Failed to write {}: {e}", path.display())))?;
            log::debug!("Wrote {}", path.display());
            Ok(stored)
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<Diagram>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(Vec::new());
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {e}")))?;

            let mut diagrams = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_none_or(|e| e != "json") {
                    continue;
                }
                match read_diagram(&path) {
                    Ok(diagram) => diagrams.push(diagram),
                    Err(e) => log::warn!("Skipping unreadable diagram: {e}"),
                }
            }
            sort_newest_first(&mut diagrams);
            Ok(diagrams)
        })
    }

    fn remove(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.diagram_path(id);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {e}", path.display()))
                })?;
            }
            Ok(())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.diagram_path(id);
        Box::pin(async move { Ok(path.exists()) })
    }
}
