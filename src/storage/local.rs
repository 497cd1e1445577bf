//! Filesystem backend: `{root}/{bucket}/{key}`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use super::{Locator, ObjectStore, PublishAck, StorageError};
use crate::domain::ObjectRef;

const SCHEME: &str = "file://";

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve an object to a path under the root.
    ///
    /// Keys containing `..` or absolute components are refused so an object
    /// can never escape the root directory.
    pub fn path_for(&self, object: &ObjectRef) -> Result<PathBuf, StorageError> {
        let mut path = self.root.clone();
        for part in [object.bucket.as_str(), object.key.as_str()] {
            for component in Path::new(part).components() {
                match component {
                    Component::Normal(c) => path.push(c),
                    Component::CurDir => {}
                    _ => return Err(StorageError::InvalidLocator(object.to_string())),
                }
            }
        }
        Ok(path)
    }
}

impl ObjectStore for LocalStore {
    fn presign(&self, object: &ObjectRef, _expires_in_secs: u64) -> Result<Locator, StorageError> {
        let path = self.path_for(object)?;
        Ok(Locator {
            uri: format!("{SCHEME}{}", path.display()),
            expires_at: None,
        })
    }

    fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, StorageError> {
        let path = locator
            .uri
            .strip_prefix(SCHEME)
            .ok_or_else(|| StorageError::InvalidLocator(locator.uri.clone()))?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, bytes: &[u8], object: &ObjectRef) -> Result<PublishAck, StorageError> {
        let path = self.path_for(object)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        Ok(PublishAck {
            object: object.clone(),
            bytes: bytes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_then_fetch_through_presigned_locator() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let object = ObjectRef::new("pimis-ml", "results/results.xlsx");

        let ack = store.store(b"abc", &object).unwrap();
        assert_eq!(ack.bytes, 3);
        assert!(dir.path().join("pimis-ml/results/results.xlsx").is_file());

        let locator = store.presign(&object, 1200).unwrap();
        assert!(locator.expires_at.is_none());
        assert_eq!(store.fetch(&locator).unwrap(), b"abc");
    }

    #[test]
    fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let locator = store.presign(&ObjectRef::new("b", "nope.csv"), 60).unwrap();
        assert!(matches!(store.fetch(&locator), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn parent_dir_keys_are_refused() {
        let store = LocalStore::new("/tmp/root");
        assert!(store.path_for(&ObjectRef::new("b", "../../etc/passwd")).is_err());
        assert!(store.path_for(&ObjectRef::new("b", "/abs")).is_err());
    }
}
