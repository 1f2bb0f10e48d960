//! Journal reader - scan the JSONL files for audit views.

use crate::error::StoreResult;
use panelpay_core::{LedgerEvent, LedgerEventKind};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Reads ledger events back from the journal directory.
pub struct JournalReader {
    base_path: PathBuf,
}

impl JournalReader {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn read_file(&self, file_path: &Path) -> StoreResult<Vec<LedgerEvent>> {
        let file = File::open(file_path)?;
        let reader = BufReader::new(file);
        let mut events = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let event: LedgerEvent = serde_json::from_str(&line)?;
            events.push(event);
        }

        Ok(events)
    }

    /// Events for one day (`YYYY-MM-DD`); empty if no file exists
    pub fn read_date(&self, date: &str) -> StoreResult<Vec<LedgerEvent>> {
        let file_path = self.base_path.join(format!("{}.jsonl", date));
        if file_path.exists() {
            self.read_file(&file_path)
        } else {
            Ok(Vec::new())
        }
    }

    /// All events in day order
    pub fn read_all(&self) -> StoreResult<Vec<LedgerEvent>> {
        let mut all_events = Vec::new();

        if !self.base_path.exists() {
            return Ok(all_events);
        }

        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.base_path)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();
        files.sort();

        for file_path in files {
            all_events.extend(self.read_file(&file_path)?);
        }

        Ok(all_events)
    }

    /// All events touching one user aggregate
    pub fn read_for_user(&self, user_id: &str) -> StoreResult<Vec<LedgerEvent>> {
        let events = self.read_all()?;
        Ok(events.into_iter().filter(|e| e.user_id == user_id).collect())
    }

    /// All events of one kind
    pub fn read_by_kind(&self, kind: LedgerEventKind) -> StoreResult<Vec<LedgerEvent>> {
        let events = self.read_all()?;
        Ok(events.into_iter().filter(|e| e.kind == kind).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalStore;
    use panelpay_core::LedgerEvent;
    use tempfile::tempdir;

    #[test]
    fn test_read_back_filtered() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();

        store
            .append(&LedgerEvent::new(
                &store.next_event_id(),
                LedgerEventKind::UserRegistered,
                "USR-A1",
                "USR-A1",
            ))
            .unwrap();
        store
            .append(&LedgerEvent::new(
                &store.next_event_id(),
                LedgerEventKind::WithdrawalRequested,
                "USR-B2",
                "USR-B2",
            ))
            .unwrap();
        store.flush().unwrap();

        let reader = JournalReader::new(dir.path());
        assert_eq!(reader.read_all().unwrap().len(), 2);
        assert_eq!(reader.read_for_user("USR-A1").unwrap().len(), 1);
        assert_eq!(
            reader
                .read_by_kind(LedgerEventKind::WithdrawalRequested)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let reader = JournalReader::new("/nonexistent/journal");
        assert!(reader.read_all().unwrap().is_empty());
        assert!(reader.read_date("2026-01-01").unwrap().is_empty());
    }
}
