use serde::{Deserialize, Serialize};

/// The JSON content body of a record inside a permission stream
/// (spec.md §3 "Permission record"). A grant carries `read`/`write`; a
/// revocation carries `revoke: true` and no access fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub user_id: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub revoke: bool,
    #[serde(default)]
    pub granted_by: Option<String>,
    #[serde(default)]
    pub granted_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub owner: String,
}
