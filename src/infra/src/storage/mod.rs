//! External blob storage adapter (spec.md §4.8). The locator returned by
//! `store_file` is opaque to every caller outside this module — per
//! spec.md §9's open question, the core must never parse it.

pub mod local;

use async_trait::async_trait;

use crate::errors::Result;

#[async_trait]
pub trait ExternalStorage: Send + Sync {
    async fn store_file(
        &self,
        pod: &str,
        stream_path: &str,
        name: &str,
        content_hash: &str,
        bytes: &[u8],
        ext: &str,
    ) -> Result<String>;

    fn get_file_url(&self, locator: &str) -> String;
}

static ADAPTER: once_cell::sync::OnceCell<Box<dyn ExternalStorage>> = once_cell::sync::OnceCell::new();

pub fn init() {
    let cfg = config::get_config();
    let _ = ADAPTER.set(Box::new(local::Local::new(
        cfg.storage.base_path.clone(),
        cfg.storage.base_url.clone(),
    )));
}

pub fn get() -> &'static dyn ExternalStorage {
    ADAPTER
        .get_or_init(|| {
            let cfg = config::get_config();
            Box::new(local::Local::new(
                cfg.storage.base_path.clone(),
                cfg.storage.base_url.clone(),
            ))
        })
        .as_ref()
}
