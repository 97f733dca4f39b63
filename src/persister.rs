//! Filter state remembered between requests.

use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::datagrid::DatagridValues;
use crate::error::{GridError, GridResult};

/// Key/value store scoped to one user session.
pub trait SessionStore {
    fn get(&self, key: &str) -> GridResult<Option<serde_json::Value>>;

    fn set(&self, key: &str, value: serde_json::Value) -> GridResult<()>;

    fn remove(&self, key: &str) -> GridResult<()>;
}

/// Stores and restores the datagrid values of an admin.
pub trait FilterPersister {
    /// Stored values, empty when nothing was stored.
    fn get(&self, admin_code: &str) -> GridResult<DatagridValues>;

    /// Overwrite the stored values.
    fn set(&self, admin_code: &str, values: &DatagridValues) -> GridResult<()>;

    fn reset(&self, admin_code: &str) -> GridResult<()>;
}

/// In-process session, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    entries: Arc<DashMap<String, serde_json::Value>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemorySession {
    fn get(&self, key: &str) -> GridResult<Option<serde_json::Value>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: serde_json::Value) -> GridResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> GridResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Session kept in a JSON object on disk, so state survives between
/// processes. Every call reads and rewrites the whole file.
#[derive(Debug, Clone)]
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> GridResult<serde_json::Map<String, serde_json::Value>> {
        if !self.path.exists() {
            return Ok(serde_json::Map::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(serde_json::Map::new());
        }
        match serde_json::from_str(&content)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(GridError::Session(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    fn store(&self, entries: serde_json::Map<String, serde_json::Value>) -> GridResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(&serde_json::Value::Object(entries))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStore for FileSession {
    fn get(&self, key: &str) -> GridResult<Option<serde_json::Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: serde_json::Value) -> GridResult<()> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.store(entries)
    }

    fn remove(&self, key: &str) -> GridResult<()> {
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.store(entries)?;
        }
        Ok(())
    }
}

/// Persists values under `"<admin_code>.filter.parameters"`.
#[derive(Debug, Clone)]
pub struct SessionFilterPersister<S> {
    session: S,
}

impl<S: SessionStore> SessionFilterPersister<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn storage_key(admin_code: &str) -> String {
        format!("{}.filter.parameters", admin_code)
    }
}

impl<S: SessionStore> FilterPersister for SessionFilterPersister<S> {
    fn get(&self, admin_code: &str) -> GridResult<DatagridValues> {
        match self.session.get(&Self::storage_key(admin_code))? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(DatagridValues::default()),
        }
    }

    fn set(&self, admin_code: &str, values: &DatagridValues) -> GridResult<()> {
        tracing::info!("Persisting filters for '{}'", admin_code);
        self.session
            .set(&Self::storage_key(admin_code), serde_json::to_value(values)?)
    }

    fn reset(&self, admin_code: &str) -> GridResult<()> {
        tracing::info!("Resetting filters for '{}'", admin_code);
        self.session.remove(&Self::storage_key(admin_code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterData;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn values() -> DatagridValues {
        DatagridValues {
            page: Some(2),
            ..Default::default()
        }
        .with("name", FilterData::with_type("contains", "foo"))
    }

    #[test]
    fn test_round_trip_and_reset() {
        let session = MemorySession::new();
        let persister = SessionFilterPersister::new(session.clone());

        assert!(persister.get("admin.user").unwrap().is_empty());
        persister.set("admin.user", &values()).unwrap();
        assert_eq!(persister.get("admin.user").unwrap(), values());
        assert!(session.get("admin.user.filter.parameters").unwrap().is_some());

        persister.reset("admin.user").unwrap();
        assert_eq!(persister.get("admin.user").unwrap(), DatagridValues::default());
        assert!(session.is_empty());
    }

    #[test]
    fn test_last_writer_wins() {
        let persister = SessionFilterPersister::new(MemorySession::new());
        persister.set("admin.user", &values()).unwrap();
        persister.set("admin.user", &DatagridValues::new().with("age", FilterData::new(3))).unwrap();
        let stored = persister.get("admin.user").unwrap();
        assert_eq!(stored.get("name"), None);
        assert_eq!(stored.get("age").map(|d| &d.value), Some(&json!(3)));
    }

    #[test]
    fn test_file_session_survives_reopen() {
        let path = std::env::temp_dir()
            .join(format!("admingrid-session-{}", std::process::id()))
            .join("filters.json");
        let _ = std::fs::remove_file(&path);

        SessionFilterPersister::new(FileSession::new(&path))
            .set("admin.post", &values())
            .unwrap();
        let reopened = SessionFilterPersister::new(FileSession::new(&path));
        assert_eq!(reopened.get("admin.post").unwrap(), values());
        assert!(reopened.get("admin.user").unwrap().is_empty());

        reopened.reset("admin.post").unwrap();
        assert!(reopened.get("admin.post").unwrap().is_empty());
        let _ = std::fs::remove_file(&path);
    }
}
