//! Pod lookup/creation with the `pods` cache pool kept coherent
//! (spec.md §3 "Lifecycle", §4.7).

use infra::cache::pools::PodCacheValue;

use crate::{
    common::meta::pod::{Pod, is_valid_pod_name},
    errors::{ApiError, Result},
    service::keys,
};

pub async fn get_or_create(name: &str, creator: &str) -> Result<Pod> {
    if !is_valid_pod_name(name) {
        return Err(ApiError::InvalidPodName(name.to_string()));
    }
    if let Some(existing) = get(name).await? {
        return Ok(existing);
    }
    let created = infra::table::pods::create(name).await?;
    crate::service::meta_stream::set_owner_initial(name, creator).await?;
    let pools = infra::cache::pools::get();
    pools.pods.invalidate(&keys::pod(name)).ok();
    Ok(Pod::from(created))
}

pub async fn get(name: &str) -> Result<Option<Pod>> {
    let pools = infra::cache::pools::get();
    let key = keys::pod(name);
    if let Some(cached) = pools.pods.get(&key) {
        return Ok(Some(Pod {
            name: name.to_string(),
            created_at: cached.created_at,
        }));
    }
    let found = infra::table::pods::get(name).await?;
    if let Some(p) = &found {
        pools.pods.set(
            &key,
            PodCacheValue {
                owner: None,
                metadata: p.metadata.clone(),
                created_at: p.created_at,
            },
        );
    }
    Ok(found.map(Pod::from))
}

pub async fn exists(name: &str) -> Result<bool> {
    Ok(infra::table::pods::exists(name).await?)
}
