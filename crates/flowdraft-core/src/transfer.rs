//! JSON export and import of diagrams.

use crate::model::{Diagram, now_millis};
use crate::storage::{DiagramStorage, StorageError, unique_name};
use serde_json::Value;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Import errors.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid diagram file: {0}")]
    Invalid(String),
    #[error("Diagram already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What to do when an imported diagram's id is already stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportMode {
    /// Store as a new diagram: fresh id and timestamps, unique name.
    #[default]
    Create,
    /// Overwrite the stored diagram with the same id.
    Replace,
    /// Refuse with `AlreadyExists`.
    Cancel,
}

impl FromStr for ImportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(ImportMode::Create),
            "replace" => Ok(ImportMode::Replace),
            "cancel" => Ok(ImportMode::Cancel),
            other => Err(format!("Unknown import mode: {other}")),
        }
    }
}

/// Serialize a diagram for export, without storage revision markers.
pub fn export_json(diagram: &Diagram) -> Result<String, serde_json::Error> {
    let mut clean = diagram.clone();
    clean.revision = None;
    clean.to_json()
}

/// Suggested file name: lowercased name with non-alphanumerics replaced,
/// plus the UTC date of `timestamp_ms`.
pub fn export_filename(name: &str, timestamp_ms: u64) -> String {
    let safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    let (year, month, day) = civil_date(timestamp_ms / 86_400_000);
    format!("{safe}_{year:04}-{month:02}-{day:02}.json")
}

/// Gregorian date for a count of days since 1970-01-01.
fn civil_date(days: u64) -> (i64, u32, u32) {
    let z = days as i64 + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Check the document shape and decode it.
///
/// `name` must be a non-empty string; `nodes` and `connections` must be arrays.
pub fn parse_import(json: &str) -> Result<Diagram, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    let Some(object) = value.as_object() else {
        return Err(ImportError::Invalid("expected a JSON object".to_string()));
    };
    match object.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => {}
        _ => return Err(ImportError::Invalid("`name` must be a non-empty string".to_string())),
    }
    for field in ["nodes", "connections"] {
        if !object.get(field).is_some_and(Value::is_array) {
            return Err(ImportError::Invalid(format!("`{field}` must be an array")));
        }
    }
    let mut diagram: Diagram = serde_json::from_value(value)?;
    diagram.revision = None;
    Ok(diagram)
}

/// Import a diagram document into `storage`.
pub async fn import_diagram<S: DiagramStorage + ?Sized>(
    storage: &S,
    json: &str,
    mode: ImportMode,
) -> Result<Diagram, ImportError> {
    let mut diagram = parse_import(json)?;
    let exists = storage.exists(&diagram.id).await?;

    match (exists, mode) {
        (true, ImportMode::Cancel) => return Err(ImportError::AlreadyExists(diagram.id)),
        (true, ImportMode::Replace) => {
            let existing = storage.get(&diagram.id).await?;
            diagram.revision = existing.revision;
        }
        (_, ImportMode::Create) => {
            let now = now_millis();
            diagram.id = Uuid::new_v4().to_string();
            diagram.created_at = now;
            diagram.updated_at = now;
            let names: Vec<String> = storage.list().await?.into_iter().map(|d| d.name).collect();
            diagram.name = unique_name(&diagram.name, names.iter().map(String::as_str));
        }
        // Not stored yet: keep the id as given.
        (false, _) => {}
    }

    let stored = storage.put(&diagram).await?;
    log::info!("Imported diagram {} ({}) with {mode:?}", stored.name, stored.id);
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeId, NodeKind};
    use crate::storage::{MemoryStorage, block_on};
    use kurbo::Point;

    fn sample() -> Diagram {
        let mut diagram = Diagram::new("Sample");
        diagram.nodes.push(Node::new(NodeId::new("n-1"), NodeKind::Start, Point::new(1.0, 2.0)));
        diagram.revision = Some(4);
        diagram
    }

    #[test]
    fn test_export_strips_revision() {
        let json = export_json(&sample()).unwrap();
        assert!(!json.contains("_rev"));
        assert!(json.contains("\"panX\""));
    }

    #[test]
    fn test_export_filename() {
        // 2024-03-05T12:00:00Z
        assert_eq!(export_filename("My Flow!", 1_709_640_000_000), "my_flow__2024-03-05.json");
        assert_eq!(export_filename("x", 0), "x_1970-01-01.json");
    }

    #[test]
    fn test_parse_import_validation() {
        assert!(matches!(parse_import("[1, 2]"), Err(ImportError::Invalid(_))));
        assert!(matches!(
            parse_import(r#"{"name": " ", "nodes": [], "connections": []}"#),
            Err(ImportError::Invalid(_))
        ));
        assert!(matches!(
            parse_import(r#"{"name": "x", "nodes": {}, "connections": []}"#),
            Err(ImportError::Invalid(_))
        ));
        assert!(matches!(parse_import("{"), Err(ImportError::Json(_))));

        let minimal = parse_import(r#"{"name": "x", "nodes": [], "connections": []}"#).unwrap();
        assert_eq!(minimal.viewport.scale, 1.0);
        assert!(!minimal.id.is_empty());
    }

    #[test]
    fn test_import_modes() {
        let storage = MemoryStorage::new();
        let original = block_on(storage.put(&sample())).unwrap();
        let json = export_json(&original).unwrap();

        let cancelled = block_on(import_diagram(&storage, &json, ImportMode::Cancel));
        assert!(matches!(cancelled, Err(ImportError::AlreadyExists(_))));

        let copy = block_on(import_diagram(&storage, &json, ImportMode::Create)).unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.name, "Sample (1)");

        let replaced = block_on(import_diagram(&storage, &json, ImportMode::Replace)).unwrap();
        assert_eq!(replaced.id, original.id);
        assert_eq!(replaced.revision, Some(original.revision.unwrap() + 1));
        assert_eq!(replaced.nodes, original.nodes);
    }

    #[test]
    fn test_replace_of_unknown_id_keeps_id() {
        let storage = MemoryStorage::new();
        let json = export_json(&sample()).unwrap();
        let id = sample_id(&json);
        let stored = block_on(import_diagram(&storage, &json, ImportMode::Replace)).unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.name, "Sample");
    }

    fn sample_id(json: &str) -> String {
        parse_import(json).unwrap().id
    }
}
