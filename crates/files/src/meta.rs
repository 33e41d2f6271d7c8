use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Metadata for one stored file
///
/// Serialised with camelCase keys so a snapshot reads as:
///
/// ```json
/// {
///   "entityId": "uuid:8b0c…",
///   "contentPath": "/app/data/550e8400e29b41d4a716446655440000.txt",
///   "mimeType": "text/plain",
///   "encoding": "7bit",
///   "fileName": "notes.txt"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// External identifier. Records without one are never indexed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Where the bytes live. Always derived from a generated token, never from `file_name`.
    pub content_path: PathBuf,

    /// MIME type declared by the uploader
    pub mime_type: String,

    /// Transfer encoding declared by the uploader
    pub encoding: String,

    /// Original filename, for display and response headers only
    pub file_name: String,
}

impl Meta {
    /// Returns the entity ID if it is usable as an index key.
    pub fn index_key(&self) -> Option<&str> {
        self.entity_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn content_path(&self) -> &Path {
        &self.content_path
    }
}

/// Lookup table from entity ID to metadata.
///
/// Ordered so snapshots are stable between writes; callers must not rely on the order.
pub type MetaMap = BTreeMap<String, Meta>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(entity_id: Option<&str>) -> Meta {
        Meta {
            entity_id: entity_id.map(str::to_owned),
            content_path: PathBuf::from("/data/550e8400e29b41d4a716446655440000.txt"),
            mime_type: "text/plain".into(),
            encoding: "utf-8".into(),
            file_name: "test-file.txt".into(),
        }
    }

    #[test]
    fn test_index_key() {
        assert_eq!(sample(Some("uuid812")).index_key(), Some("uuid812"));
        assert_eq!(sample(Some("")).index_key(), None);
        assert_eq!(sample(None).index_key(), None);
    }

    #[test]
    fn test_serialises_camel_case() {
        let value = serde_json::to_value(sample(Some("uuid812"))).unwrap();

        assert_eq!(value["entityId"], "uuid812");
        assert_eq!(
            value["contentPath"],
            "/data/550e8400e29b41d4a716446655440000.txt"
        );
        assert_eq!(value["mimeType"], "text/plain");
        assert_eq!(value["encoding"], "utf-8");
        assert_eq!(value["fileName"], "test-file.txt");
    }

    #[test]
    fn test_missing_entity_id_is_omitted() {
        let value = serde_json::to_value(sample(None)).unwrap();

        assert!(value.get("entityId").is_none());
    }

    #[test]
    fn test_reads_snapshot_written_elsewhere() {
        let raw = r#"{
            "uuid812": {
                "entityId": "uuid812",
                "contentPath": "/tmp/uuid812.txt",
                "mimeType": "text/plain",
                "encoding": "utf-8",
                "fileName": "test-file.txt"
            }
        }"#;
        let map: MetaMap = serde_json::from_str(raw).unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map["uuid812"].file_name, "test-file.txt");
        assert_eq!(map["uuid812"].content_path(), Path::new("/tmp/uuid812.txt"));
    }
}
