use crate::domain::model::LinkRecord;
use crate::domain::ports::LinkStore;
use crate::utils::error::{Result, UnitError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Both unique indices live under one lock so they never disagree.
#[derive(Debug, Default)]
struct LinkTable {
    by_path: HashMap<String, LinkRecord>,
    path_by_long_url: HashMap<String, String>,
}

impl LinkTable {
    fn from_records(records: Vec<LinkRecord>) -> Result<Self> {
        let mut table = Self::default();
        for record in records {
            table.insert(record)?;
        }
        Ok(table)
    }

    fn insert(&mut self, record: LinkRecord) -> Result<()> {
        self.check_unique(&record)?;
        self.commit(record);
        Ok(())
    }

    fn check_unique(&self, record: &LinkRecord) -> Result<()> {
        if self.by_path.contains_key(&record.short_url_path) {
            return Err(UnitError::DuplicateLinkError {
                key: "short_url_path".to_string(),
                value: record.short_url_path.clone(),
            });
        }
        if self.path_by_long_url.contains_key(&record.long_url) {
            return Err(UnitError::DuplicateLinkError {
                key: "long_url".to_string(),
                value: record.long_url.clone(),
            });
        }
        Ok(())
    }

    fn commit(&mut self, record: LinkRecord) {
        self.path_by_long_url
            .insert(record.long_url.clone(), record.short_url_path.clone());
        self.by_path.insert(record.short_url_path.clone(), record);
    }

    fn snapshot(&self) -> Vec<LinkRecord> {
        let mut records: Vec<LinkRecord> = self.by_path.values().cloned().collect();
        records.sort_by(|a, b| a.short_url_path.cmp(&b.short_url_path));
        records
    }
}

/// Link store kept in memory, optionally mirrored to a JSON file after every write.
#[derive(Debug)]
pub struct LocalLinkStore {
    table: RwLock<LinkTable>,
    file: Option<PathBuf>,
}

impl LocalLinkStore {
    pub fn in_memory() -> Self {
        Self {
            table: RwLock::new(LinkTable::default()),
            file: None,
        }
    }

    /// Opens (or starts) a file-backed store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records = if path.exists() {
            let data = fs::read(&path)?;
            serde_json::from_slice::<Vec<LinkRecord>>(&data)?
        } else {
            Vec::new()
        };

        tracing::info!("Loaded {} link(s) from {}", records.len(), path.display());
        Ok(Self {
            table: RwLock::new(LinkTable::from_records(records)?),
            file: Some(path),
        })
    }

    /// Writes `records` to the backing file, if any. Callers persist before
    /// touching the table so a failed write leaves memory unchanged.
    fn persist(&self, records: &[LinkRecord]) -> Result<()> {
        let Some(path) = &self.file else {
            return Ok(());
        };

        write_atomically(path, &serde_json::to_vec_pretty(records)?).map_err(|e| {
            UnitError::StoreError {
                message: format!("cannot write {}: {}", path.display(), e),
            }
        })
    }
}

fn write_atomically(path: &Path, data: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)
}

#[async_trait]
impl LinkStore for LocalLinkStore {
    async fn insert_mapping(&self, short_url_path: &str, long_url: &str) -> Result<LinkRecord> {
        let record = LinkRecord {
            short_url_path: short_url_path.to_string(),
            long_url: long_url.to_string(),
            visits: 0,
        };

        let mut table = self.table.write().await;
        table.check_unique(&record)?;
        if self.file.is_some() {
            let mut records = table.snapshot();
            records.push(record.clone());
            records.sort_by(|a, b| a.short_url_path.cmp(&b.short_url_path));
            self.persist(&records)?;
        }
        table.commit(record.clone());
        Ok(record)
    }

    async fn path_exists(&self, short_url_path: &str) -> Result<bool> {
        Ok(self.table.read().await.by_path.contains_key(short_url_path))
    }

    async fn find_path_by_long_url(&self, long_url: &str) -> Result<Option<String>> {
        Ok(self.table.read().await.path_by_long_url.get(long_url).cloned())
    }

    async fn find_long_url_by_path(&self, short_url_path: &str) -> Result<Option<String>> {
        Ok(self
            .table
            .read()
            .await
            .by_path
            .get(short_url_path)
            .map(|r| r.long_url.clone()))
    }

    async fn increment_visits(&self, short_url_path: &str) -> Result<()> {
        let mut table = self.table.write().await;
        if !table.by_path.contains_key(short_url_path) {
            return Ok(());
        }
        if self.file.is_some() {
            let mut records = table.snapshot();
            for record in records.iter_mut().filter(|r| r.short_url_path == short_url_path) {
                record.visits += 1;
            }
            self.persist(&records)?;
        }
        if let Some(record) = table.by_path.get_mut(short_url_path) {
            record.visits += 1;
        }
        Ok(())
    }

    async fn visits(&self, short_url_path: &str) -> Result<Option<u64>> {
        Ok(self
            .table
            .read()
            .await
            .by_path
            .get(short_url_path)
            .map(|r| r.visits))
    }
}
