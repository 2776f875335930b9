use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Stream {
    pub id: i64,
    pub pod_name: String,
    pub name: String,
    pub parent_id: Option<i64>,
    pub path: String,
    pub user_id: String,
    pub access_permission: String,
    pub has_schema: bool,
    pub created_at: i64,
}

impl From<infra::table::streams::StreamRecord> for Stream {
    fn from(r: infra::table::streams::StreamRecord) -> Self {
        Self {
            id: r.id,
            pod_name: r.pod_name,
            name: r.name,
            parent_id: r.parent_id,
            path: r.path,
            user_id: r.user_id,
            access_permission: r.access_permission,
            has_schema: r.has_schema,
            created_at: r.created_at,
        }
    }
}

impl Stream {
    /// System streams (`.config`, `.permissions`, `.schema`, ...) may only
    /// be created or written by the pod owner (spec.md §4.2, §4.6).
    pub fn is_system_name(name: &str) -> bool {
        name.starts_with('.')
    }

    pub fn is_system_path(path: &str) -> bool {
        path.split('/')
            .filter(|s| !s.is_empty())
            .next()
            .map(Self::is_system_name)
            .unwrap_or(false)
    }
}
