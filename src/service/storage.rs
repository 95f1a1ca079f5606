// service/storage.rs
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Signing failed: {0}")]
    Sign(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Opaque blob store the lifecycle engine binds files to. One bucket,
/// flat object names; callers never see raw storage paths, only the
/// signed URLs produced by `sign`.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under `name` and returns the canonical object URL
    /// persisted on the owning record.
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Returns a time-limited read URL for a stored object.
    async fn sign(&self, name: &str, ttl_secs: u64) -> Result<String, StorageError>;

    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// Supabase storage REST client; authenticates with the service key.
#[derive(Debug, Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    base_url: String,
    bucket: String,
    service_key: String,
}

#[derive(Deserialize)]
struct SignedUrlBody {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(base_url: String, bucket: String, service_key: String) -> Self {
        SupabaseStorage {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket,
            service_key,
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let url = self.object_url(name);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Upload(body));
        }

        Ok(url)
    }

    async fn sign(&self, name: &str, ttl_secs: u64) -> Result<String, StorageError> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url, self.bucket, name
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&json!({ "expiresIn": ttl_secs }))
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Sign(body));
        }

        let body: SignedUrlBody = response
            .json()
            .await
            .map_err(|e| StorageError::Sign(e.to_string()))?;

        Ok(format!("{}/storage/v1{}", self.base_url, body.signed_url))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let response = self
            .http
            .delete(self.object_url(name))
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Delete(body));
        }

        Ok(())
    }
}

/// Extracts the flat object name from a stored object URL.
pub fn object_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory stand-in for the blob store used by file-lifecycle tests.
    #[derive(Default)]
    pub struct MemoryStorage {
        pub objects: Mutex<HashMap<String, Vec<u8>>>,
        pub fail_sign: AtomicBool,
    }

    impl MemoryStorage {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn object_count(&self) -> usize {
            self.objects.lock().unwrap().len()
        }

        pub fn contains(&self, name: &str) -> bool {
            self.objects.lock().unwrap().contains_key(name)
        }

        pub fn set_fail_sign(&self, fail: bool) {
            self.fail_sign.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ObjectStorage for MemoryStorage {
        async fn upload(
            &self,
            name: &str,
            bytes: Vec<u8>,
            _content_type: &str,
        ) -> Result<String, StorageError> {
            self.objects
                .lock()
                .unwrap()
                .insert(name.to_string(), bytes);
            Ok(format!("memory://bucket/{}", name))
        }

        async fn sign(&self, name: &str, ttl_secs: u64) -> Result<String, StorageError> {
            if self.fail_sign.load(Ordering::SeqCst) {
                return Err(StorageError::Sign("signing disabled".to_string()));
            }
            if !self.contains(name) {
                return Err(StorageError::Sign(format!("no such object {}", name)));
            }
            Ok(format!("memory://bucket/{}?expires={}", name, ttl_secs))
        }

        async fn delete(&self, name: &str) -> Result<(), StorageError> {
            self.objects.lock().unwrap().remove(name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;

    #[test]
    fn object_name_takes_the_last_path_segment() {
        assert_eq!(
            object_name("https://x.supabase.co/storage/v1/object/job-files/123-essay.pdf"),
            "123-essay.pdf"
        );
        assert_eq!(object_name("plain-name.pdf"), "plain-name.pdf");
    }

    #[tokio::test]
    async fn memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        let url = storage
            .upload("a.pdf", vec![1, 2, 3], "application/pdf")
            .await
            .unwrap();
        assert_eq!(object_name(&url), "a.pdf");
        assert!(storage.sign("a.pdf", 3600).await.is_ok());

        storage.delete("a.pdf").await.unwrap();
        assert!(storage.sign("a.pdf", 3600).await.is_err());
    }
}
