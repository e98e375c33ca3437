//! Unified object-store operations for all storage backends.
//!
//! Wraps an `Arc<dyn ObjectStore>` behind the small capability surface the
//! rest of drover needs: put/get/list-by-prefix/delete over opaque UTF-8
//! keys. Supports local filesystem, S3 and in-memory stores transparently.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use object_store::path::Path as StorePath;
use object_store::ObjectStore;

use crate::error::{Result, StoreError};

/// Shared handle to one backing store.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn ObjectStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Write an empty marker object. Heads carry all metadata in the key.
    pub async fn put_marker(&self, key: &str) -> Result<()> {
        self.put_object(key, Bytes::new()).await
    }

    /// Write an object body (replaces if the key exists).
    pub async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        self.store
            .put(&StorePath::from(key), data.into())
            .await
            .map_err(StoreError::from)?;
        Ok(())
    }

    /// Read an object body; `NotFound` if the key does not exist.
    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        let result = self.store.get(&StorePath::from(key)).await?;
        Ok(result.bytes().await?)
    }

    /// Read an object body, mapping a missing key to `None`.
    pub async fn get_object_opt(&self, key: &str) -> Result<Option<Bytes>> {
        match self.get_object(key).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Check key existence without fetching the body.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self.store.head(&StorePath::from(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Delete a key. Deleting a missing key is not an error (idempotent).
    pub async fn delete_object(&self, key: &str) -> Result<()> {
        match self.store.delete(&StorePath::from(key)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// List every key starting with the given raw string prefix, in
    /// lexicographic order.
    ///
    /// The underlying store evaluates prefixes per path segment, while head
    /// prefixes routinely end mid-segment (`jobs/u/r/l;run1;`), so listing
    /// starts at the parent segment and filters on the raw key string. The
    /// paginated listing stream is followed transparently.
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .list_objects(prefix)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Like [`list_keys`](Self::list_keys), but also returns object sizes.
    pub async fn list_objects(&self, prefix: &str) -> Result<Vec<(String, u64)>> {
        let parent = match prefix.rfind('/') {
            Some(idx) if idx > 0 => Some(StorePath::from(&prefix[..idx])),
            _ => None,
        };
        let mut stream = self.store.list(parent.as_ref());

        let mut entries = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta?;
            let key = meta.location.to_string();
            if key.starts_with(prefix) {
                entries.push((key, meta.size as u64));
            }
        }
        entries.sort();
        Ok(entries)
    }

    /// One-level listing under a directory prefix: `(folders, files)`, both
    /// as names relative to the prefix, folders stripped of the trailing
    /// separator.
    pub async fn list_shallow(&self, prefix: &str) -> Result<(Vec<String>, Vec<String>)> {
        let dir = StorePath::from(prefix.trim_end_matches('/'));
        let listing = self.store.list_with_delimiter(Some(&dir)).await?;

        let folders = listing
            .common_prefixes
            .iter()
            .filter_map(|p| p.parts().last().map(|part| part.as_ref().to_string()))
            .collect();
        let files = listing
            .objects
            .iter()
            .filter_map(|meta| {
                meta.location
                    .parts()
                    .last()
                    .map(|part| part.as_ref().to_string())
            })
            .collect();
        Ok((folders, files))
    }

    /// Replace-on-transition: write the new head first, then delete the old.
    ///
    /// The delete is retried once; a second failure only leaves a stale head
    /// behind (readers resolve the ambiguity, see `keys::dedup_job_heads`)
    /// and never blocks visibility of the new state.
    pub async fn replace_marker(&self, new_key: &str, old_key: &str) -> Result<()> {
        self.put_marker(new_key).await?;
        if new_key == old_key {
            return Ok(());
        }
        if let Err(first) = self.delete_object(old_key).await {
            log::warn!("retrying delete of stale head '{old_key}': {first}");
            if let Err(second) = self.delete_object(old_key).await {
                log::warn!("leaving stale head '{old_key}' behind: {second}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_storage() -> Storage {
        Storage::new(Arc::new(InMemory::new()))
    }

    #[tokio::test]
    async fn test_put_get_delete_round_trip() {
        let storage = memory_storage();
        storage
            .put_object("a/b/c.json", Bytes::from("payload"))
            .await
            .unwrap();
        assert_eq!(
            storage.get_object("a/b/c.json").await.unwrap(),
            Bytes::from("payload")
        );
        storage.delete_object("a/b/c.json").await.unwrap();
        assert!(matches!(
            storage.get_object("a/b/c.json").await,
            Err(StoreError::NotFound(_))
        ));
        // Idempotent delete
        storage.delete_object("a/b/c.json").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_keys_filters_mid_segment_prefixes() {
        let storage = memory_storage();
        for key in [
            "jobs/u/r/l;run1;j1;;;1;submitted;;;",
            "jobs/u/r/l;run1;j2;;;2;done;;;",
            "jobs/u/r/l;run2;j3;;;3;done;;;",
            "jobs/u/r/j1.json",
        ] {
            storage.put_marker(key).await.unwrap();
        }

        let all_heads = storage.list_keys("jobs/u/r/l;").await.unwrap();
        assert_eq!(all_heads.len(), 3);

        let run1 = storage.list_keys("jobs/u/r/l;run1;").await.unwrap();
        assert_eq!(run1.len(), 2);
        assert!(run1.iter().all(|k| k.contains("run1")));
    }

    #[tokio::test]
    async fn test_list_shallow_groups_folders() {
        let storage = memory_storage();
        for key in [
            "artifacts/u/r/run1,j1/model/weights/a.bin",
            "artifacts/u/r/run1,j1/model/weights/b.bin",
            "artifacts/u/r/run1,j1/model/config.json",
        ] {
            storage.put_object(key, Bytes::from("x")).await.unwrap();
        }

        let (folders, files) = storage
            .list_shallow("artifacts/u/r/run1,j1/model/")
            .await
            .unwrap();
        assert_eq!(folders, vec!["weights".to_string()]);
        assert_eq!(files, vec!["config.json".to_string()]);
    }

    #[tokio::test]
    async fn test_replace_marker_prefers_new_key() {
        let storage = memory_storage();
        storage.put_marker("heads/old").await.unwrap();
        storage.replace_marker("heads/new", "heads/old").await.unwrap();
        assert!(storage.exists("heads/new").await.unwrap());
        assert!(!storage.exists("heads/old").await.unwrap());
    }
}
