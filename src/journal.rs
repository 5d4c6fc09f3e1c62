use std::fs::{self, OpenOptions};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use serde::{Deserialize, Serialize};

/// One synchronization round: the full ordered id list as published,
/// plus the ids that round added.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpdateRecord {
    pub page_ids: Vec<String>,
    pub new_ids: Vec<String>,
    pub at: i64, // Unix timestamp in seconds
}

/// Append-only journal of live updates, one JSON record per line.
/// The last record is the authoritative snapshot of the previous session,
/// used to keep freshness markers meaningful across restarts.
pub struct UpdateJournal {
    records: Mutex<Vec<UpdateRecord>>,
    log_path: PathBuf,
}

impl UpdateJournal {
    pub fn new(data_dir: PathBuf) -> Self {
        fs::create_dir_all(&data_dir).ok();
        let log_path = data_dir.join("updates.log");

        let mut journal = UpdateJournal {
            records: Mutex::new(Vec::new()),
            log_path,
        };

        // Load existing records on startup
        if let Err(e) = journal.load_from_log() {
            log::warn!("[Journal] Failed to load update log: {}", e);
        }

        journal
    }

    fn load_from_log(&mut self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let file = fs::File::open(&self.log_path)?;
        let reader = std::io::BufReader::new(file);
        let mut records = self.records.lock().unwrap();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Unparseable lines are skipped rather than poisoning the whole
            // log; the journal is advisory, not a source of truth.
            match serde_json::from_str::<UpdateRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("[Journal] Skipping bad record: {}", e),
            }
        }
        Ok(())
    }

    pub fn append(&self, page_ids: Vec<String>, new_ids: Vec<String>) {
        let record = UpdateRecord {
            page_ids,
            new_ids,
            at: chrono::Utc::now().timestamp(),
        };

        // Locked update first, file append outside the lock
        {
            let mut records = self.records.lock().unwrap();
            records.push(record.clone());
        }

        if let Ok(json) = serde_json::to_string(&record) {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path);
            match file {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", json) {
                        log::warn!("[Journal] Failed to write update log: {}", e);
                    }
                }
                Err(e) => log::warn!("[Journal] Failed to open update log: {}", e),
            }
        }
    }

    /// The page ids published by the most recent synchronization,
    /// empty if nothing was ever journaled.
    pub fn last_known_ids(&self) -> Vec<String> {
        let records = self.records.lock().unwrap();
        records
            .last()
            .map(|r| r.page_ids.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything but the latest record and rewrite the log.
    /// Atomic write: write to .tmp then rename.
    pub fn compact(&self) -> std::io::Result<()> {
        let mut records = self.records.lock().unwrap();
        if records.len() <= 1 {
            return Ok(());
        }

        let last = records.last().cloned();
        records.clear();
        if let Some(last) = last {
            records.push(last);
        }

        let tmp_path = self.log_path.with_extension("log.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            for record in records.iter() {
                let json = serde_json::to_string(record)
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
                writeln!(file, "{}", json)?;
            }
            file.sync_all()?;
        }

        fs::rename(tmp_path, &self.log_path)?;
        Ok(())
    }
}
