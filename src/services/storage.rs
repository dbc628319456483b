use anyhow::Result;
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use uuid::Uuid;

/// What the upload collaborator hands back: a public URL for display and an
/// opaque key for later deletion.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[async_trait]
pub trait StorageService: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<StoredObject>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn exists(&self, key: &str) -> Result<bool>;
}

pub struct S3StorageService {
    client: Client,
    endpoint: String,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, endpoint: String, bucket: String) -> Self {
        Self {
            client,
            endpoint,
            bucket,
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.bucket,
            key
        )
    }
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<StoredObject> {
        let key = format!("{}/{}-{}", folder, Uuid::new_v4(), filename);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type.unwrap_or(mime::APPLICATION_OCTET_STREAM.as_ref()))
            .body(ByteStream::from(data))
            .send()
            .await?;

        let url = self.public_url(&key);
        Ok(StoredObject { key, url })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(anyhow::anyhow!(service_error))
                }
            }
        }
    }
}

/// In-memory storage used by tests and local development without MinIO.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: dashmap::DashMap<String, Bytes>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl StorageService for InMemoryStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        _content_type: Option<&str>,
        data: Bytes,
    ) -> Result<StoredObject> {
        let key = format!("{}/{}-{}", folder, Uuid::new_v4(), filename);
        self.objects.insert(key.clone(), data);
        Ok(StoredObject {
            url: format!("memory://{}", key),
            key,
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let storage = InMemoryStorage::new();
        let stored = storage
            .upload("works", "a.png", Some("image/png"), Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert!(stored.url.contains("a.png"));
        assert!(storage.exists(&stored.key).await.unwrap());

        storage.delete(&stored.key).await.unwrap();
        assert!(!storage.exists(&stored.key).await.unwrap());
    }
}
