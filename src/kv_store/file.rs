//! A JSON file-backed implementation of the [`KvStore`][super::KvStore] trait.
//!
//! Wraps a [`InMemoryKvStore`][super::memory::InMemoryKvStore] instance, persisting
//! updates to a JSON file on disk that can be reloaded across restarts.
use crate::error::Error;
use crate::kv_store::memory::InMemoryKvStore;
use crate::kv_store::KvStore;
use std::io::{self, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

/// A file-backed key-value store. After each mutation a JSON file on disk is replaced with the
/// full store contents. This file can be reloaded across restarts to avoid losing state.
///
/// A mutation only becomes visible once the new state is on disk, and the state file is
/// replaced by an atomic rename, so it always holds a complete snapshot. Each save runs in its
/// own task: a caller that stops waiting (e.g. on a [`StoreTimeout`][Error::StoreTimeout])
/// doesn't interrupt it, and the mutation may still land afterwards.
#[derive(Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileKvStore {
    kv_store: Arc<Mutex<InMemoryKvStore>>,
    path: PathBuf,
}

impl FileKvStore {
    /// Load a [`FileKvStore`] from the JSON state located at the given path, creating an empty
    /// state file if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the JSON state file is invalid.
    ///
    /// Returns [`Error::IO`] if the path can't be opened, read or created.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let path = PathBuf::from(p);
        let kv_store = match File::open(&path).await {
            Ok(mut f) => {
                let mut buf = vec![];
                f.read_to_end(&mut buf).await?;
                serde_json::from_slice::<InMemoryKvStore>(&buf)?
            }
            Err(err) => match err.kind() {
                ErrorKind::NotFound => save(path.clone(), InMemoryKvStore::default()).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        tracing::debug!("loaded {} keys from {p}", kv_store.len());
        Ok(Self {
            kv_store: Arc::new(Mutex::new(kv_store)),
            path,
        })
    }

    /// Apply `change` to a copy of the current state, write the copy to disk and only then make
    /// it current. Mutations are applied one at a time, in call order.
    async fn commit<F>(&self, change: F) -> Result<(), Error>
    where
        F: FnOnce(&mut InMemoryKvStore) + Send + 'static,
    {
        let kv_store = self.kv_store.clone();
        let path = self.path.clone();
        let task = tokio::spawn(async move {
            let mut current = kv_store.lock_owned().await;
            let mut next = current.clone();
            change(&mut next);
            *current = save(path, next).await?;
            Ok::<(), Error>(())
        });
        task.await.map_err(join_error)?
    }
}

/// Write `state` to `path` off the async runtime and hand it back once it's durable.
async fn save(path: PathBuf, state: InMemoryKvStore) -> Result<InMemoryKvStore, Error> {
    tokio::task::spawn_blocking(move || write_state(&path, &state).map(|()| state))
        .await
        .map_err(join_error)?
}

/// Serialize `state` to a temporary file next to `path` and rename it over `path`.
fn write_state(path: &Path, state: &InMemoryKvStore) -> Result<(), Error> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut writer = BufWriter::new(NamedTempFile::new_in(dir)?);
    serde_json::to_writer_pretty(&mut writer, state)?;
    let tmp = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn join_error(err: tokio::task::JoinError) -> Error {
    Error::IO(io::Error::new(ErrorKind::Other, err))
}

#[async_trait::async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.kv_store.lock().await.get(key).await
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, Error> {
        self.kv_store.lock().await.get_prefix(prefix).await
    }

    async fn put(&mut self, key: &str, value: String) -> Result<(), Error> {
        let key = key.to_string();
        self.commit(move |state| state.insert(key, value)).await
    }

    async fn delete(&mut self, key: &str) -> Result<(), Error> {
        let key = key.to_string();
        self.commit(move |state| state.remove(&key)).await
    }

    async fn delete_prefix(&mut self, prefix: &str) -> Result<(), Error> {
        let prefix = prefix.to_string();
        self.commit(move |state| state.remove_prefix(&prefix)).await
    }
}
