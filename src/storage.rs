use async_trait::async_trait;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::errors::{AppError, ResultExt};
use crate::models::Lead;

/// Append/list storage for leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persist `lead` as the newest entry.
    async fn append(&self, lead: Lead) -> Result<(), AppError>;

    /// All leads, oldest first.
    async fn list(&self) -> Result<Vec<Lead>, AppError>;

    /// Stamp `submitted_at` with the current time, then append.
    async fn save(&self, mut lead: Lead) -> Result<Lead, AppError> {
        lead.stamp(Local::now());
        self.append(lead.clone()).await?;
        Ok(lead)
    }
}

/// Leads kept in a JSON array file, mirrored row-by-row to a CSV file.
///
/// Each append rewrites the whole JSON file. Appends inside this process are
/// serialized, but two processes sharing the files can still lose each
/// other's writes (last writer wins).
pub struct FileLeadStore {
    json_path: PathBuf,
    csv_path: PathBuf,
    /// Held by the blocking write itself, so it stays locked until the file
    /// is rewritten even if the caller stops waiting.
    write_lock: Arc<Mutex<()>>,
}

impl FileLeadStore {
    pub fn new(json_path: impl Into<PathBuf>, csv_path: impl Into<PathBuf>) -> Self {
        Self {
            json_path: json_path.into(),
            csv_path: csv_path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn json_path(&self) -> &Path {
        &self.json_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

#[async_trait]
impl LeadStore for FileLeadStore {
    async fn append(&self, lead: Lead) -> Result<(), AppError> {
        let guard = self.write_lock.clone().lock_owned().await;
        let json_path = self.json_path.clone();
        let csv_path = self.csv_path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), AppError> {
            let _guard = guard;
            let mut leads = read_leads(&json_path)?;
            leads.push(lead);
            write_leads(&json_path, &leads)
                .with_context(|| format!("writing {}", json_path.display()))?;

            let last = leads.last().ok_or_else(|| {
                AppError::InternalError("lead list empty after append".to_string())
            })?;
            append_csv_row(&csv_path, last)
                .with_context(|| format!("appending to {}", csv_path.display()))
        })
        .await
        .map_err(|e| AppError::InternalError(format!("storage task failed: {}", e)))??;

        tracing::debug!("Lead appended to {}", self.json_path.display());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        let json_path = self.json_path.clone();
        tokio::task::spawn_blocking(move || read_leads(&json_path))
            .await
            .map_err(|e| AppError::InternalError(format!("storage task failed: {}", e)))?
    }
}

/// Reads the lead array. A missing file is an empty list, and so is one whose
/// content does not parse as a JSON array of objects.
fn read_leads(path: &Path) -> Result<Vec<Lead>, AppError> {
    let raw = match fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };

    match serde_json::from_slice::<Vec<Lead>>(&raw) {
        Ok(leads) => Ok(leads),
        Err(e) => {
            tracing::warn!(
                "Ignoring unreadable lead file {}: {}",
                path.display(),
                e
            );
            Ok(Vec::new())
        }
    }
}

fn write_leads(path: &Path, leads: &[Lead]) -> Result<(), AppError> {
    let body = serde_json::to_vec_pretty(leads)?;
    fs::write(path, body)?;
    Ok(())
}

/// Appends one row. The header (this lead's keys) is written only when the
/// file is being created, so later leads with other fields are not realigned.
fn append_csv_row(path: &Path, lead: &Lead) -> Result<(), AppError> {
    let is_new = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(lead.keys())?;
    }
    writer.write_record(lead.csv_record())?;
    writer.flush()?;
    Ok(())
}

/// In-process store, for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<Vec<Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn append(&self, lead: Lead) -> Result<(), AppError> {
        self.leads.write().await.push(lead);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Lead>, AppError> {
        Ok(self.leads.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> FileLeadStore {
        FileLeadStore::new(dir.path().join("leads.json"), dir.path().join("leads.csv"))
    }

    fn lead(value: serde_json::Value) -> Lead {
        Lead::from_json(value).unwrap()
    }

    fn csv_lines(store: &FileLeadStore) -> Vec<String> {
        fs::read_to_string(store.csv_path())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_list_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_stamps_and_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let first = store.save(lead(json!({"name": "A"}))).await.unwrap();
        let second = store.save(lead(json!({"name": "B"}))).await.unwrap();
        assert!(first.submitted_at().is_some());
        assert!(second.submitted_at() >= first.submitted_at());

        let leads = store.list().await.unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].get("name"), Some(&json!("A")));
        assert_eq!(leads[1], second);
    }

    #[tokio::test]
    async fn test_json_file_is_pretty_array() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(lead(json!({"name": "A"}))).await.unwrap();

        let raw = fs::read_to_string(store.json_path()).unwrap();
        assert_eq!(raw, "[\n  {\n    \"name\": \"A\"\n  }\n]");
    }

    #[tokio::test]
    async fn test_corrupt_json_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.json_path(), "{ not json").unwrap();
        assert!(store.list().await.unwrap().is_empty());

        store.append(lead(json!({"name": "A"}))).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_array_json_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.json_path(), "{\"name\": \"A\"}").unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_csv_header_written_once() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .append(lead(json!({"name": "A", "amount": 5000})))
            .await
            .unwrap();
        store
            .append(lead(json!({"name": "B, Jr.", "amount": "7000"})))
            .await
            .unwrap();

        assert_eq!(
            csv_lines(&store),
            vec!["name,amount", "A,5000", "\"B, Jr.\",7000"]
        );
    }

    #[tokio::test]
    async fn test_csv_keeps_first_header_for_other_shapes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.append(lead(json!({"name": "A"}))).await.unwrap();
        store
            .append(lead(json!({"email": "b@example.com", "name": "B"})))
            .await
            .unwrap();

        assert_eq!(csv_lines(&store), vec!["name", "A", "b@example.com,B"]);
    }

    #[tokio::test]
    async fn test_existing_csv_gets_no_new_header() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.csv_path(), "name\nOld\n").unwrap();
        store.append(lead(json!({"name": "New"}))).await.unwrap();
        assert_eq!(csv_lines(&store), vec!["name", "Old", "New"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_in_process_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store_in(&dir));

        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.save(lead(json!({"name": format!("lead-{}", i)}))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 10);
        assert_eq!(csv_lines(&store).len(), 11);
    }

    #[tokio::test]
    async fn test_abandoned_append_still_blocks_next_writer() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // Poll the first append once, then drop it while its write may still
        // be running on the blocking pool.
        let abandoned = tokio::time::timeout(
            std::time::Duration::ZERO,
            store.append(lead(json!({"name": "A"}))),
        )
        .await;
        drop(abandoned);

        store.append(lead(json!({"name": "B"}))).await.unwrap();

        let names: Vec<_> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|l| l.get("name").cloned())
            .collect();
        assert_eq!(names, vec![Some(json!("A")), Some(json!("B"))]);
        assert_eq!(csv_lines(&store), vec!["name", "A", "B"]);
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryLeadStore::new();
        store.save(lead(json!({"name": "A"}))).await.unwrap();
        let leads = store.list().await.unwrap();
        assert_eq!(leads.len(), 1);
        assert!(leads[0].submitted_at().is_some());
    }
}
