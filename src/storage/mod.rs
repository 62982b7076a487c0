use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;
use uuid::Uuid;

mod local;
mod s3;

pub use local::LocalBlobStore;
pub use s3::S3BlobStore;

/// Namespace every uploaded employee photo lives under.
pub const PHOTO_PREFIX: &str = "employees";

#[derive(Debug)]
pub enum StorageError {
    InvalidKey(String),
    Io(std::io::Error),
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::InvalidKey(key) => write!(f, "invalid blob key '{}'", key),
            StorageError::Io(err) => write!(f, "io: {}", err),
            StorageError::Backend(msg) => write!(f, "backend: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredBlob {
    pub key: String,
    pub modified: DateTime<Utc>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    async fn list(&self, prefix: &str) -> Result<Vec<StoredBlob>, StorageError>;
}

pub fn photo_key(extension: &str) -> String {
    format!("{}/{}.{}", PHOTO_PREFIX, Uuid::new_v4(), extension)
}

/// Relative keys made of plain path segments only.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// Turns stored keys into the URLs clients fetch photos from.
#[derive(Debug, Clone)]
pub struct PhotoUrls {
    base: Url,
}

impl PhotoUrls {
    pub fn new(base: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base })
    }

    pub fn url_for(&self, key: &str) -> Option<String> {
        self.base.join(key).ok().map(|url| url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn photo_keys_are_namespaced_and_unique() {
        let a = photo_key("png");
        let b = photo_key("png");
        assert!(a.starts_with("employees/"));
        assert!(a.ends_with(".png"));
        assert_ne!(a, b);
        assert!(is_safe_key(&a));
    }

    #[test]
    fn traversal_keys_are_unsafe() {
        assert!(!is_safe_key("../etc/passwd"));
        assert!(!is_safe_key("employees/../../secret"));
        assert!(!is_safe_key("/employees/a.png"));
        assert!(!is_safe_key("employees//a.png"));
        assert!(!is_safe_key("employees\\a.png"));
        assert!(!is_safe_key(""));
    }

    #[test]
    fn photo_urls_join_under_base() {
        let urls = PhotoUrls::new("http://localhost:8080/storage").unwrap();
        assert_eq!(
            urls.url_for("employees/a.png").as_deref(),
            Some("http://localhost:8080/storage/employees/a.png")
        );
    }
}
