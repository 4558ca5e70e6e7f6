//! Minimal key-value storage used by the snapshot backend.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::RwLock;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::CatalogError;

/// String-valued key-value store.
///
/// Implementations must treat a missing key as `Ok(None)`; errors are reserved
/// for an unreachable or broken store.
pub trait KvStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CatalogError>>;

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), CatalogError>>;
}

/// In-process store, mainly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous insert, convenient when seeding fixtures.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryKv {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CatalogError>> {
        let value = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned();
        futures::future::ready(Ok(value)).boxed()
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), CatalogError>> {
        self.insert(key, value);
        futures::future::ready(Ok(())).boxed()
    }
}

/// Store backed by a directory: each key is one `{key}.json` file.
#[derive(Debug, Clone)]
pub struct DirectoryKv {
    root: PathBuf,
}

impl DirectoryKv {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, CatalogError> {
        let valid = !key.is_empty()
            && !key.contains("..")
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(CatalogError::InvalidKey {
                key: key.to_owned(),
            });
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KvStore for DirectoryKv {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, CatalogError>> {
        async move {
            let path = self.path_for(key)?;
            match tokio::fs::read_to_string(&path).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    if tokio::fs::metadata(&self.root).await.is_err() {
                        return Err(CatalogError::Store {
                            key: key.to_owned(),
                            reason: format!("store directory {} is missing", self.root.display()),
                        });
                    }
                    Ok(None)
                }
                Err(e) => Err(CatalogError::Store {
                    key: key.to_owned(),
                    reason: e.to_string(),
                }),
            }
        }
        .boxed()
    }

    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), CatalogError>> {
        async move {
            let path = self.path_for(key)?;
            let store_err = |e: std::io::Error| CatalogError::Store {
                key: key.to_owned(),
                reason: e.to_string(),
            };
            tokio::fs::create_dir_all(&self.root)
                .await
                .map_err(store_err)?;
            // Write-then-rename so readers never see a half-written chunk.
            let tmp = path.with_extension("json.tmp");
            tokio::fs::write(&tmp, value).await.map_err(store_err)?;
            tokio::fs::rename(&tmp, &path).await.map_err(store_err)?;
            Ok(())
        }
        .boxed()
    }
}
