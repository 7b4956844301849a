use crate::downloader::{history_to_csv, records_to_csv};
use crate::error::StoreError;
use crate::loader::{history_from_csv, records_from_csv};
use crate::record::{upsert_history, BacklogRecord, HistoryPoint};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const RECORDS_FILE: &str = "backlog.csv";
pub const HISTORY_FILE: &str = "history.csv";

/// Persistence for backlog records and the daily history.
///
/// Every call fails with [`StoreError::Closed`] until [`open`](Self::open)
/// succeeds. Implementations never retry.
pub trait RecordStore {
    fn open(&mut self) -> Result<(), StoreError>;
    fn close(&mut self) -> Result<(), StoreError>;
    fn read_all(&self) -> Result<Vec<BacklogRecord>, StoreError>;
    fn write_all(&mut self, records: &[BacklogRecord]) -> Result<(), StoreError>;
    /// Appends `point`, replacing the last point instead when it has the same date.
    fn append_history_point(&mut self, point: &HistoryPoint) -> Result<(), StoreError>;
    /// History ordered by date ascending.
    fn read_history(&self) -> Result<Vec<HistoryPoint>, StoreError>;
}

/// Two flat CSV files in one directory, rewritten wholesale on every write.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    open: bool,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvStore {
            dir: dir.into(),
            open: false,
        }
    }

    pub fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open { Ok(()) } else { Err(StoreError::Closed) }
    }
}

// A missing file reads as empty.
fn read_file(path: &Path) -> Result<String, StoreError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

// Write to a sibling temp file, then rename over the target.
fn replace_file(path: &Path, content: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("csv.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl RecordStore for CsvStore {
    fn open(&mut self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        self.open = true;
        info!("opened csv store at {}", self.dir.display());
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<BacklogRecord>, StoreError> {
        self.ensure_open()?;
        let records = records_from_csv(&read_file(&self.records_path())?)?;
        debug!("read {} records", records.len());
        Ok(records)
    }

    fn write_all(&mut self, records: &[BacklogRecord]) -> Result<(), StoreError> {
        self.ensure_open()?;
        replace_file(&self.records_path(), &records_to_csv(records))?;
        debug!("wrote {} records", records.len());
        Ok(())
    }

    fn append_history_point(&mut self, point: &HistoryPoint) -> Result<(), StoreError> {
        let mut history = self.read_history()?;
        match history.last_mut() {
            Some(last) if last.date == point.date => *last = *point,
            _ => history.push(*point),
        }
        replace_file(&self.history_path(), &history_to_csv(&history))?;
        debug!("history {} -> {}", point.date, point.total_backlog);
        Ok(())
    }

    fn read_history(&self) -> Result<Vec<HistoryPoint>, StoreError> {
        self.ensure_open()?;
        let raw = history_from_csv(&read_file(&self.history_path())?)?;
        let mut history = Vec::with_capacity(raw.len());
        for point in raw {
            upsert_history(&mut history, point);
        }
        Ok(history)
    }
}

/// In-memory store. `set_available(false)` makes every call fail with
/// [`StoreError::Unavailable`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: Vec<BacklogRecord>,
    history: Vec<HistoryPoint>,
    open: bool,
    unavailable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn with_contents(records: Vec<BacklogRecord>, history: Vec<HistoryPoint>) -> Self {
        MemoryStore {
            records,
            history,
            ..MemoryStore::default()
        }
    }

    pub fn set_available(&mut self, available: bool) {
        self.unavailable = !available;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            Err(StoreError::Unavailable)
        } else if !self.open {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl RecordStore for MemoryStore {
    fn open(&mut self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err(StoreError::Unavailable);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<BacklogRecord>, StoreError> {
        self.check()?;
        Ok(self.records.clone())
    }

    fn write_all(&mut self, records: &[BacklogRecord]) -> Result<(), StoreError> {
        self.check()?;
        self.records = records.to_vec();
        Ok(())
    }

    fn append_history_point(&mut self, point: &HistoryPoint) -> Result<(), StoreError> {
        self.check()?;
        match self.history.last_mut() {
            Some(last) if last.date == point.date => *last = *point,
            _ => self.history.push(*point),
        }
        Ok(())
    }

    fn read_history(&self) -> Result<Vec<HistoryPoint>, StoreError> {
        self.check()?;
        Ok(self.history.clone())
    }
}
