//! Object storage capability.
//!
//! The pipeline only ever needs three operations from storage:
//!
//! - `presign`: turn `(bucket, key, expiry)` into a time-limited retrieval locator
//! - `fetch`: read the bytes behind a locator
//! - `store`: upload bytes to `(bucket, key)`
//!
//! Backends:
//! - `S3Store`: AWS S3 (or an S3-compatible endpoint) over presigned URLs
//! - `LocalStore`: a directory tree, buckets are sub-directories
//! - `MemoryStore`: in-process map, used by tests

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::ObjectRef;
use crate::error::PipelineError;

pub mod local;
pub mod memory;
pub mod s3;
pub mod sigv4;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::{S3Settings, S3Store};

/// Opaque handle to a retrievable object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub uri: String,
    /// `None` for locators that never expire (local/in-memory backends).
    pub expires_at: Option<DateTime<Utc>>,
}

/// Acknowledgement of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub object: ObjectRef,
    pub bytes: usize,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("request to {uri} failed: {message}")]
    Transport { uri: String, message: String },
    #[error("{uri} returned status {status}")]
    Status { uri: String, status: u16 },
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("locator not understood by this backend: {0}")]
    InvalidLocator(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage capability consumed by the ingestor and the publisher.
pub trait ObjectStore {
    fn presign(&self, object: &ObjectRef, expires_in_secs: u64) -> Result<Locator, StorageError>;
    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, StorageError>;
    fn store(&self, bytes: &[u8], object: &ObjectRef) -> Result<PublishAck, StorageError>;
}

/// Access key pair (plus optional session token) for the S3 backend.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl StorageCredentials {
    /// Validate a credential pair.
    ///
    /// Both halves must be present and non-blank; a lone access key or secret is
    /// reported as partial credentials.
    pub fn new(
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        session_token: Option<String>,
    ) -> Result<Self, PipelineError> {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match (clean(access_key_id), clean(secret_access_key)) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(Self {
                access_key_id,
                secret_access_key,
                session_token: clean(session_token),
            }),
            (None, None) => Err(PipelineError::Credential(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY are not set".to_string(),
            )),
            (Some(_), None) => Err(PipelineError::Credential(
                "partial credentials: AWS_SECRET_ACCESS_KEY is missing".to_string(),
            )),
            (None, Some(_)) => Err(PipelineError::Credential(
                "partial credentials: AWS_ACCESS_KEY_ID is missing".to_string(),
            )),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

impl std::fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
