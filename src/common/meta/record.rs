use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RecordMeta {
    pub index: i64,
    pub name: String,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub user_id: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub id: i64,
    pub stream_id: i64,
    pub index: i64,
    pub name: String,
    pub path: String,
    pub content: Vec<u8>,
    pub content_type: String,
    pub size: i64,
    pub content_hash: String,
    pub hash: String,
    pub previous_hash: Option<String>,
    pub user_id: String,
    pub storage: Option<String>,
    pub headers: HashMap<String, String>,
    pub created_at_iso: String,
}

impl From<infra::table::records::RecordRecord> for Record {
    fn from(r: infra::table::records::RecordRecord) -> Self {
        let headers = r
            .headers
            .as_deref()
            .and_then(|h| serde_json::from_str(h).ok())
            .unwrap_or_default();
        Self {
            id: r.id,
            stream_id: r.stream_id,
            index: r.index,
            name: r.name,
            path: r.path,
            content: r.content,
            content_type: r.content_type,
            size: r.size,
            content_hash: r.content_hash,
            hash: r.hash,
            previous_hash: r.previous_hash,
            user_id: r.user_id,
            storage: r.storage,
            headers,
            created_at_iso: r.created_at_iso,
        }
    }
}

impl Record {
    pub fn meta(&self) -> RecordMeta {
        RecordMeta {
            index: self.index,
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            size: self.size,
            content_hash: self.content_hash.clone(),
            hash: self.hash.clone(),
            previous_hash: self.previous_hash.clone(),
            user_id: self.user_id.clone(),
            created_at: self.created_at_iso.clone(),
            storage: self.storage.clone(),
        }
    }

    /// A tombstone is a record whose name marks a deletion
    /// (`<original>.deleted.<iso-timestamp>`, spec.md §3).
    pub fn is_tombstone(&self) -> bool {
        self.name.contains(".deleted.")
    }

    pub fn original_name_if_tombstone(&self) -> Option<String> {
        serde_json::from_slice::<serde_json::Value>(&self.content)
            .ok()
            .and_then(|v| v.get("originalName").and_then(|s| s.as_str()).map(String::from))
    }
}
