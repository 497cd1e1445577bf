//! In-process backend.
//!
//! Objects live in a map keyed by `(bucket, key)`. Uploads to keys registered
//! with `fail_uploads_to` are rejected, which lets tests exercise partial
//! publishes without a network.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::{Locator, ObjectStore, PublishAck, StorageError};
use crate::domain::ObjectRef;

const SCHEME: &str = "mem://";

#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    failing_keys: Mutex<BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly (bypasses upload failure injection).
    pub fn insert(&self, object: &ObjectRef, bytes: impl Into<Vec<u8>>) {
        lock(&self.objects).insert(map_key(object), bytes.into());
    }

    pub fn get(&self, object: &ObjectRef) -> Option<Vec<u8>> {
        lock(&self.objects).get(&map_key(object)).cloned()
    }

    pub fn keys(&self) -> Vec<ObjectRef> {
        lock(&self.objects)
            .keys()
            .map(|(bucket, key)| ObjectRef::new(bucket.clone(), key.clone()))
            .collect()
    }

    /// Make every future upload to `key` (any bucket) fail.
    pub fn fail_uploads_to(&self, key: impl Into<String>) {
        lock(&self.failing_keys).insert(key.into());
    }
}

impl ObjectStore for MemoryStore {
    fn presign(&self, object: &ObjectRef, _expires_in_secs: u64) -> Result<Locator, StorageError> {
        Ok(Locator {
            uri: format!("{SCHEME}{}/{}", object.bucket, object.key),
            expires_at: None,
        })
    }

    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, StorageError> {
        let rest = locator
            .uri
            .strip_prefix(SCHEME)
            .ok_or_else(|| StorageError::InvalidLocator(locator.uri.clone()))?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidLocator(locator.uri.clone()))?;

        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(locator.uri.clone()))
    }

    fn store(&self, bytes: &[u8], object: &ObjectRef) -> Result<PublishAck, StorageError> {
        if lock(&self.failing_keys).contains(&object.key) {
            return Err(StorageError::Status {
                uri: format!("{SCHEME}{object}"),
                status: 503,
            });
        }
        lock(&self.objects).insert(map_key(object), bytes.to_vec());
        Ok(PublishAck {
            object: object.clone(),
            bytes: bytes.len(),
        })
    }
}

fn map_key(object: &ObjectRef) -> (String, String) {
    (object.bucket.clone(), object.key.clone())
}

// A panic while holding the lock leaves plain data behind; keep using it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
