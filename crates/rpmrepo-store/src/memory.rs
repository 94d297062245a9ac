use std::collections::BTreeMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};

use crate::{paginate, validate_key, ListPage, Metadata, ObjectHead, ObjectStore};

#[derive(Clone, Debug, Default)]
struct StoredObject {
    body: Vec<u8>,
    metadata: Metadata,
}

/// Process-local store; each instance is an isolated, empty bucket.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every key currently stored, in order.
    pub fn keys(&self) -> Result<Vec<String>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(objects.keys().cloned().collect())
    }
}

impl ObjectStore for MemoryStore {
    fn describe(&self) -> String {
        "memory:".to_string()
    }

    fn put_object(&self, key: &str, body: &[u8], metadata: &Metadata) -> Result<()> {
        validate_key(key)?;
        let mut objects = self
            .objects
            .write()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    fn head(&self, key: &str) -> Result<Option<ObjectHead>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(objects.get(key).map(|object| ObjectHead {
            size: object.body.len() as u64,
            metadata: object.metadata.clone(),
        }))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        Ok(objects.get(key).map(|object| object.body.clone()))
    }

    fn list_page(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        let objects = self
            .objects
            .read()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        let keys = objects.range(prefix.to_string()..).map(|(key, _)| key.as_str());
        Ok(paginate(keys, prefix, start_after, page_size))
    }
}
