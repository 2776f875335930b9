use async_trait::async_trait;
use object_store::{ObjectStore, limit::LimitStore, local::LocalFileSystem, path::Path, PutPayload};

use super::ExternalStorage;
use crate::errors::{Error, Result};

/// Caps concurrent in-flight local writes, mirroring the teacher's
/// `LimitStore`-wrapped disk adapter.
const CONCURRENT_REQUESTS: usize = 256;

/// Writes blobs under `<base_path>/<pod>/<stream_path>/<content_hash><ext>`
/// via `object_store`'s local filesystem backend, and returns
/// `<base_url>/...` locators for redirects, matching the single default
/// adapter spec.md §4.8 describes.
pub struct Local {
    client: LimitStore<LocalFileSystem>,
    base_url: String,
}

impl Local {
    pub fn new(base_path: String, base_url: String) -> Self {
        std::fs::create_dir_all(&base_path).expect("create storage base_path");
        let fs = LocalFileSystem::new_with_prefix(&base_path).expect("init local object store");
        Self {
            client: LimitStore::new(fs, CONCURRENT_REQUESTS),
            base_url,
        }
    }

    fn relative_path(pod: &str, stream_path: &str, content_hash: &str, ext: &str) -> String {
        let stream_path = stream_path.trim_start_matches('/');
        format!("{pod}/{stream_path}/{content_hash}{ext}")
    }
}

#[async_trait]
impl ExternalStorage for Local {
    async fn store_file(
        &self,
        pod: &str,
        stream_path: &str,
        name: &str,
        content_hash: &str,
        bytes: &[u8],
        ext: &str,
    ) -> Result<String> {
        let _ = name; // the locator is keyed by content hash, not record name
        let rel = Self::relative_path(pod, stream_path, content_hash, ext);
        let path = Path::from(rel.as_str());
        self.client
            .put(&path, PutPayload::from(bytes.to_vec()))
            .await
            .map_err(|e| {
                log::error!("[STORAGE] put local file {rel}: {e:?}");
                Error::StorageError(format!("put {rel}: {e}"))
            })?;
        Ok(rel)
    }

    fn get_file_url(&self, locator: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_url_round_trips() {
        let dir = std::env::temp_dir().join(format!("webpods-test-{}", std::process::id()));
        let local = Local::new(dir.to_string_lossy().to_string(), "http://x/blobs".into());
        let locator = local
            .store_file("alice", "/docs", "a", "deadbeef", b"hello", ".bin")
            .await
            .unwrap();
        assert_eq!(locator, "alice/docs/deadbeef.bin");
        assert_eq!(local.get_file_url(&locator), "http://x/blobs/alice/docs/deadbeef.bin");
        let _ = std::fs::remove_dir_all(dir);
    }
}
