use async_trait::async_trait;
use atomic_write_file::AtomicWriteFile;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};

use super::{CategoryStore, MemberStore};
use crate::error::{Error, Result};
use crate::model::{Category, Member};

const COLLECTION_VERSION: u32 = 1;
const MEMBERS_FILE: &str = "members.json";
const CATEGORIES_FILE: &str = "categories.json";
const LOCK_FILE: &str = ".lock";
const LOCK_RETRY: Duration = Duration::from_millis(10);
/// A lock file older than this was left behind by a crashed writer
const STALE_LOCK_AGE: Duration = Duration::from_secs(30);

/// On-disk shape of one collection file
#[derive(Debug, Serialize, Deserialize)]
struct Collection<T> {
    version: u32,
    #[serde(default = "Vec::new")]
    documents: Vec<T>,
}

/// Document store keeping each collection in a JSON file under one directory.
///
/// Every call re-reads the file, so edits made by another process are picked
/// up. Each read-modify-write holds both the in-process mutex and a `.lock`
/// file in the store directory, so writers in other processes sharing the
/// directory wait their turn. Sequences of calls are not isolated from each
/// other.
pub struct JsonFileStore {
    dir: PathBuf,
    io_lock: Mutex<()>,
    lock_timeout: Duration,
}

/// Exclusive ownership of the store directory's lock file, removed on drop
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    async fn acquire(path: PathBuf, timeout: Duration) -> Result<Self> {
        let deadline = Instant::now() + timeout;
        loop {
            let attempt = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            match attempt {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if is_stale(&path).await {
                        tracing::warn!(path = %path.display(), "removing stale store lock");
                        let _ = tokio::fs::remove_file(&path).await;
                        continue;
                    }
                    if Instant::now() >= deadline {
                        return Err(Error::Storage(format!(
                            "Timed out after {} waiting for {}",
                            humantime::format_duration(timeout),
                            path.display()
                        )));
                    }
                    tokio::time::sleep(LOCK_RETRY).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for LockFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), "failed to release store lock: {}", e);
        }
    }
}

async fn is_stale(path: &Path) -> bool {
    match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
        Ok(modified) => modified
            .elapsed()
            .map(|age| age > STALE_LOCK_AGE)
            .unwrap_or(false),
        Err(_) => false,
    }
}

/// Held for the whole of one read-modify-write
struct WriteGuard<'a> {
    _file: LockFile,
    _local: MutexGuard<'a, ()>,
}

impl JsonFileStore {
    /// Open (creating if needed) the store directory and check that both
    /// collections are readable, giving up after `timeout`.
    pub async fn open(dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let store = Self {
            dir: dir.into(),
            io_lock: Mutex::new(()),
            lock_timeout: timeout,
        };

        let check = async {
            let dir = store.dir.clone();
            tokio::task::spawn_blocking(move || std::fs::create_dir_all(&dir)).await??;
            store.read::<Member>(MEMBERS_FILE).await?;
            store.read::<Category>(CATEGORIES_FILE).await?;
            Ok::<(), Error>(())
        };

        match tokio::time::timeout(timeout, check).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::Storage(format!(
                    "Timed out after {} opening store at {}",
                    humantime::format_duration(timeout),
                    store.dir.display()
                )))
            }
        }

        tracing::debug!(dir = %store.dir.display(), "opened JSON file store");
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn lock_for_write(&self) -> Result<WriteGuard<'_>> {
        let local = self.io_lock.lock().await;
        let file = LockFile::acquire(self.dir.join(LOCK_FILE), self.lock_timeout).await?;
        Ok(WriteGuard {
            _file: file,
            _local: local,
        })
    }

    async fn read<T>(&self, file_name: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.dir.join(file_name);
        tokio::task::spawn_blocking(move || load_collection(&path)).await?
    }

    async fn write<T>(&self, file_name: &str, documents: Vec<T>) -> Result<()>
    where
        T: Serialize + Send + 'static,
    {
        let path = self.dir.join(file_name);
        tokio::task::spawn_blocking(move || save_collection(&path, documents)).await?
    }
}

/// Load a collection file. A missing file is an empty collection.
fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(path)?;
    let collection: Collection<T> = serde_json::from_reader(file).map_err(|e| {
        Error::Storage(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    if collection.version != COLLECTION_VERSION {
        return Err(Error::Storage(format!(
            "Unsupported collection version {} in {}",
            collection.version,
            path.display()
        )));
    }

    Ok(collection.documents)
}

/// Save a collection atomically so the file is never left half-written
fn save_collection<T: Serialize>(path: &Path, documents: Vec<T>) -> Result<()> {
    let collection = Collection {
        version: COLLECTION_VERSION,
        documents,
    };

    let mut file = AtomicWriteFile::open(path)?;
    serde_json::to_writer_pretty(&mut file, &collection)?;
    file.commit()?;

    Ok(())
}

#[async_trait]
impl MemberStore for JsonFileStore {
    async fn list_members(&self) -> Result<Vec<Member>> {
        let _guard = self.io_lock.lock().await;
        self.read(MEMBERS_FILE).await
    }

    async fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let _guard = self.io_lock.lock().await;
        let members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        Ok(members.into_iter().find(|m| m.id == id))
    }

    async fn insert_member(&self, member: Member) -> Result<Member> {
        let _guard = self.lock_for_write().await?;
        let mut members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        members.push(member.clone());
        self.write(MEMBERS_FILE, members).await?;
        Ok(member)
    }

    async fn insert_members(&self, new_members: Vec<Member>) -> Result<Vec<Member>> {
        let _guard = self.lock_for_write().await?;
        let mut members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        members.extend(new_members.iter().cloned());
        self.write(MEMBERS_FILE, members).await?;
        Ok(new_members)
    }

    async fn replace_member(&self, member: Member) -> Result<Option<Member>> {
        let _guard = self.lock_for_write().await?;
        let mut members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        let Some(slot) = members.iter_mut().find(|m| m.id == member.id) else {
            return Ok(None);
        };
        *slot = member.clone();
        self.write(MEMBERS_FILE, members).await?;
        Ok(Some(member))
    }

    async fn delete_member(&self, id: &str) -> Result<bool> {
        let _guard = self.lock_for_write().await?;
        let mut members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        let before = members.len();
        members.retain(|m| m.id != id);
        if members.len() == before {
            return Ok(false);
        }
        self.write(MEMBERS_FILE, members).await?;
        Ok(true)
    }

    async fn clear_members(&self) -> Result<usize> {
        let _guard = self.lock_for_write().await?;
        let members: Vec<Member> = self.read(MEMBERS_FILE).await?;
        self.write(MEMBERS_FILE, Vec::<Member>::new()).await?;
        Ok(members.len())
    }
}

#[async_trait]
impl CategoryStore for JsonFileStore {
    async fn list_categories(&self) -> Result<Vec<Category>> {
        let _guard = self.io_lock.lock().await;
        self.read(CATEGORIES_FILE).await
    }

    async fn get_category(&self, id: &str) -> Result<Option<Category>> {
        let _guard = self.io_lock.lock().await;
        let categories: Vec<Category> = self.read(CATEGORIES_FILE).await?;
        Ok(categories.into_iter().find(|c| c.id == id))
    }

    async fn find_category_by_key(&self, key: &str) -> Result<Option<Category>> {
        let _guard = self.io_lock.lock().await;
        let categories: Vec<Category> = self.read(CATEGORIES_FILE).await?;
        Ok(categories.into_iter().find(|c| c.key == key))
    }

    async fn insert_categories(&self, new_categories: Vec<Category>) -> Result<Vec<Category>> {
        let _guard = self.lock_for_write().await?;
        let mut categories: Vec<Category> = self.read(CATEGORIES_FILE).await?;
        let inserted = super::merge_by_key(&mut categories, new_categories);
        if !inserted.is_empty() {
            self.write(CATEGORIES_FILE, categories).await?;
        }
        Ok(inserted)
    }

    async fn replace_category(&self, category: Category) -> Result<Option<Category>> {
        let _guard = self.lock_for_write().await?;
        let mut categories: Vec<Category> = self.read(CATEGORIES_FILE).await?;
        let Some(slot) = categories.iter_mut().find(|c| c.id == category.id) else {
            return Ok(None);
        };
        *slot = category.clone();
        self.write(CATEGORIES_FILE, categories).await?;
        Ok(Some(category))
    }
}
