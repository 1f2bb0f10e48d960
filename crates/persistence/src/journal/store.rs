//! JSONL journal - append-only writer
//!
//! Records every committed ledger transition as one JSON line, partitioned
//! by day: `data/journal/2026-08-06.jsonl`. The journal is written after
//! the database transaction commits; it never participates in it.

use crate::error::StoreResult;
use chrono::Utc;
use panelpay_core::LedgerEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Append-only journal of ledger events.
pub struct JournalStore {
    /// Directory holding the day files
    base_path: PathBuf,
    /// Counter for event IDs
    event_counter: AtomicU64,
    /// Current day's writer (thread-safe)
    current_writer: Mutex<Option<DayWriter>>,
}

struct DayWriter {
    date: String,
    writer: BufWriter<File>,
}

impl JournalStore {
    /// Open (or create) the journal directory, recovering the event
    /// counter from existing files.
    pub fn new<P: AsRef<Path>>(base_path: P) -> StoreResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        let event_counter = Self::load_event_counter(&base_path)?;

        Ok(Self {
            base_path,
            event_counter: AtomicU64::new(event_counter),
            current_writer: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Scan existing files for the highest event id
    fn load_event_counter(base_path: &Path) -> StoreResult<u64> {
        let mut max_id: u64 = 0;

        if let Ok(entries) = fs::read_dir(base_path) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map_or(false, |ext| ext == "jsonl") {
                    if let Ok(content) = fs::read_to_string(&path) {
                        for line in content.lines() {
                            if let Ok(event) = serde_json::from_str::<LedgerEvent>(line) {
                                if let Some(num_str) = event.event_id.strip_prefix("EVT_") {
                                    if let Ok(num) = num_str.parse::<u64>() {
                                        max_id = max_id.max(num);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(max_id + 1)
    }

    fn file_path(&self, date: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", date))
    }

    fn current_date() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Generate the next event ID
    pub fn next_event_id(&self) -> String {
        let id = self.event_counter.fetch_add(1, Ordering::SeqCst);
        format!("EVT_{:06}", id)
    }

    /// Append one event
    pub fn append(&self, event: &LedgerEvent) -> StoreResult<()> {
        let date = Self::current_date();
        let json = serde_json::to_string(event)?;

        let mut guard = self.current_writer.lock().unwrap();

        let needs_new_file = guard.as_ref().map_or(true, |w| w.date != date);
        if needs_new_file {
            let path = self.file_path(&date);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            *guard = Some(DayWriter {
                date,
                writer: BufWriter::new(file),
            });
        }

        if let Some(ref mut w) = *guard {
            writeln!(w.writer, "{}", json)?;
            w.writer.flush()?;
        }

        Ok(())
    }

    /// All journal files, sorted by day
    pub fn list_files(&self) -> StoreResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "jsonl") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Flush pending writes
    pub fn flush(&self) -> StoreResult<()> {
        let mut guard = self.current_writer.lock().unwrap();
        if let Some(ref mut w) = *guard {
            w.writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for JournalStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelpay_core::{LedgerEventKind, Plan};
    use tempfile::tempdir;

    fn sample(store: &JournalStore) -> LedgerEvent {
        LedgerEvent::new(
            &store.next_event_id(),
            LedgerEventKind::PlanCompleted,
            "USR-AB12CD34",
            "USR-AB12CD34",
        )
        .with_plan(Plan::Regular)
    }

    #[test]
    fn test_journal_append() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();

        store.append(&sample(&store)).unwrap();
        store.flush().unwrap();

        let files = store.list_files().unwrap();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("EVT_000001"));
        assert!(content.contains("plan_completed"));
    }

    #[test]
    fn test_journal_counter() {
        let dir = tempdir().unwrap();
        let store = JournalStore::new(dir.path()).unwrap();

        assert_eq!(store.next_event_id(), "EVT_000001");
        assert_eq!(store.next_event_id(), "EVT_000002");
    }

    #[test]
    fn test_journal_reload_counter() {
        let dir = tempdir().unwrap();
        {
            let store = JournalStore::new(dir.path()).unwrap();
            store.append(&sample(&store)).unwrap();
            store.append(&sample(&store)).unwrap();
        }
        {
            let store = JournalStore::new(dir.path()).unwrap();
            assert_eq!(store.next_event_id(), "EVT_000003");
        }
    }
}
