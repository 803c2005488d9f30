//! Object storage adapters for listing images.

pub mod http;
pub mod memory;

pub use http::HttpImageStore;
pub use memory::MemoryImageStore;

use url::Url;

use crate::listing::ports::StorageError;

/// URL layout of a storage bucket: where public objects are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketLayout {
    base_url: String,
    bucket: String,
}

impl BucketLayout {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
        }
    }

    pub fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, path)
    }

    /// Object path for a public URL. URLs outside the public layout of this
    /// bucket are not objects.
    pub fn object_path(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url.trim()).ok()?;
        let marker = format!("/storage/v1/object/public/{}/", self.bucket);

        let (_, path) = parsed.path().split_once(&marker)?;
        (!path.is_empty()).then(|| path.to_string())
    }

    /// Object path for a public URL naming a single file directly inside
    /// `folder`.
    pub fn object_path_in(&self, url: &str, folder: &str) -> Result<String, StorageError> {
        let path = self
            .object_path(url)
            .ok_or_else(|| StorageError::UnknownObject(url.to_string()))?;

        match path.strip_prefix(folder).and_then(|rest| rest.strip_prefix('/')) {
            Some(file) if is_file_name(file) => Ok(path),
            _ => Err(StorageError::OutOfScope(url.to_string())),
        }
    }
}

fn is_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
