use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Saved item '{id}' not found")]
    NotFound { id: String },
    #[error("Invalid saved item: {0}")]
    Invalid(String),
    #[error("Failed to access saved items: {0}")]
    Io(#[from] std::io::Error),
    #[error("Saved items file is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Saved items task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedKind {
    Prompts,
    Queries,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: String,
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a client supplies when creating or replacing an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    pub content: String,
}

impl ItemInput {
    fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::Invalid("name must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SavedFile {
    #[serde(default)]
    prompts: Vec<SavedItem>,
    #[serde(default)]
    queries: Vec<SavedItem>,
}

impl SavedFile {
    fn items_mut(&mut self, kind: SavedKind) -> &mut Vec<SavedItem> {
        match kind {
            SavedKind::Prompts => &mut self.prompts,
            SavedKind::Queries => &mut self.queries,
        }
    }
}

/// Saved prompts and queries, kept together in a single JSON file
pub struct SavedStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SavedStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SavedFile, StoreError> {
        if !self.path.exists() {
            return Ok(SavedFile::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SavedFile::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, file: &SavedFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Run `f` against the file contents under the store lock, writing back the result
    fn modify<T>(
        &self,
        f: impl FnOnce(&mut SavedFile) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read()?;
        let result = f(&mut file)?;
        self.write(&file)?;
        Ok(result)
    }

    pub fn list(&self, kind: SavedKind) -> Result<Vec<SavedItem>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read()?;
        Ok(std::mem::take(file.items_mut(kind)))
    }

    pub fn create(&self, kind: SavedKind, input: ItemInput) -> Result<SavedItem, StoreError> {
        input.validate()?;
        self.modify(|file| {
            let now = Utc::now();
            let item = SavedItem {
                id: Uuid::new_v4().to_string(),
                name: input.name,
                content: input.content,
                created_at: now,
                updated_at: now,
            };
            file.items_mut(kind).push(item.clone());
            Ok(item)
        })
    }

    pub fn update(
        &self,
        kind: SavedKind,
        id: &str,
        input: ItemInput,
    ) -> Result<SavedItem, StoreError> {
        input.validate()?;
        self.modify(|file| {
            let item = file
                .items_mut(kind)
                .iter_mut()
                .find(|item| item.id == id)
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
            item.name = input.name;
            item.content = input.content;
            item.updated_at = Utc::now();
            Ok(item.clone())
        })
    }

    pub fn delete(&self, kind: SavedKind, id: &str) -> Result<(), StoreError> {
        self.modify(|file| {
            let items = file.items_mut(kind);
            let before = items.len();
            items.retain(|item| item.id != id);
            if items.len() == before {
                return Err(StoreError::NotFound { id: id.to_string() });
            }
            Ok(())
        })
    }
}
