//! Read/write authorization for a (stream, user) pair (spec.md §4.6).

use infra::table::streams::StreamRecord;

use crate::{
    common::meta::permission::PermissionGrant,
    errors::Result,
    service::{meta_stream, stream_store},
};

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// System paths (`/.config/...`, `/.permissions/...`) require pod
/// ownership for writes regardless of the stream's own
/// `access_permission` (spec.md §4.6).
pub fn requires_ownership_for_write(path: &str) -> bool {
    let trimmed = path.trim_start_matches('/');
    trimmed.starts_with(".config/") || trimmed.starts_with(".config") || trimmed.starts_with(".permissions")
}

pub async fn can_access(pod: &str, stream: &StreamRecord, user: Option<&str>, access: Access) -> Result<bool> {
    let owner = meta_stream::get_owner(pod).await?;
    if let Some(u) = user {
        if Some(u.to_string()) == owner || u == stream.user_id {
            return Ok(true);
        }
    }

    if access == Access::Write && requires_ownership_for_write(&stream.path) {
        return Ok(false);
    }

    match stream.access_permission.as_str() {
        "public" => Ok(match access {
            Access::Read => true,
            Access::Write => user.is_some(),
        }),
        "private" => Ok(false),
        perm_path if perm_path.starts_with('/') => {
            let Some(user) = user else { return Ok(false) };
            resolve_permission_stream(pod, perm_path, user, access).await
        }
        _ => Ok(false),
    }
}

async fn resolve_permission_stream(pod: &str, perm_path: &str, user: &str, access: Access) -> Result<bool> {
    let Some(perm_stream) = stream_store::get_by_path(pod, perm_path).await? else {
        return Ok(false);
    };
    let records = infra::table::records::list_all_ascending(perm_stream.id).await?;
    let mut allowed = false;
    for record in records {
        let Ok(grant) = serde_json::from_slice::<PermissionGrant>(&record.content) else {
            continue;
        };
        if grant.user_id != user {
            continue;
        }
        allowed = if grant.revoke {
            false
        } else {
            match access {
                Access::Read => grant.read,
                Access::Write => grant.write,
            }
        };
    }
    Ok(allowed)
}
