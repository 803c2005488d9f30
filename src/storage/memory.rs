use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::listing::ports::{ImageStore, ImageUpload, StorageError};

use super::BucketLayout;

#[derive(Default)]
struct Objects {
    stored: HashMap<String, Vec<u8>>,
    deleted: Vec<String>,
    failing: HashSet<String>,
}

/// In-process image store. URLs follow the same public layout as the real
/// bucket so they pass the trusted-source check.
pub struct MemoryImageStore {
    layout: BucketLayout,
    objects: RwLock<Objects>,
}

impl MemoryImageStore {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            layout: BucketLayout::new(base_url, bucket),
            objects: RwLock::new(Objects::default()),
        }
    }

    /// Make deletes of `url` fail.
    pub async fn fail_on(&self, url: &str) {
        self.objects.write().await.failing.insert(url.to_string());
    }

    /// URLs successfully deleted so far, in order.
    pub async fn deleted(&self) -> Vec<String> {
        self.objects.read().await.deleted.clone()
    }

    pub async fn stored_paths(&self) -> Vec<String> {
        self.objects.read().await.stored.keys().cloned().collect()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store_image(&self, upload: ImageUpload) -> Result<String, StorageError> {
        let url = self.layout.public_url(&upload.path);
        self.objects.write().await.stored.insert(upload.path, upload.bytes);
        Ok(url)
    }

    async fn delete_stored_image(&self, url: &str, folder: &str) -> Result<(), StorageError> {
        let path = self.layout.object_path_in(url, folder)?;

        let mut objects = self.objects.write().await;
        if objects.failing.contains(url) {
            return Err(StorageError::Rejected { status: 500, message: "injected failure".to_string() });
        }

        objects.stored.remove(&path);
        objects.deleted.push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_deletes_by_public_url() {
        let store = MemoryImageStore::new("https://abc.supabase.co", "imagens");
        let url = store
            .store_image(ImageUpload {
                path: "produtos/owner/x.png".to_string(),
                content_type: "image/png".to_string(),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert_eq!(store.stored_paths().await, vec!["produtos/owner/x.png"]);

        assert_eq!(
            store.delete_stored_image(&url, "produtos/other").await,
            Err(StorageError::OutOfScope(url.clone()))
        );
        assert_eq!(store.stored_paths().await.len(), 1);

        store.delete_stored_image(&url, "produtos/owner").await.unwrap();
        assert!(store.stored_paths().await.is_empty());
        assert_eq!(store.deleted().await, vec![url]);
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let store = MemoryImageStore::new("https://abc.supabase.co", "imagens");
        let url = "https://abc.supabase.co/storage/v1/object/public/imagens/produtos/owner/a.jpg";
        store.fail_on(url).await;
        assert!(matches!(
            store.delete_stored_image(url, "produtos/owner").await,
            Err(StorageError::Rejected { status: 500, .. })
        ));
        assert!(store.deleted().await.is_empty());
    }
}
