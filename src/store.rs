//! Access to the externally owned task and schedule-entry records.
//!
//! The core only reads records and, when pruning, replaces them in bulk.
//! The single-record operations exist for the command line and are written
//! in terms of those two, the way a whole-document store works.

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{ScheduleEntry, Task};
use crate::utils::write_atomic;

pub trait Record {
    fn id(&self) -> &str;
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for ScheduleEntry {
    fn id(&self) -> &str {
        &self.id
    }
}

pub trait RecordStore<T: Record> {
    fn read_all(&self) -> Result<Vec<T>>;

    fn replace_all(&mut self, records: Vec<T>) -> Result<()>;

    /// Appends a record; ids must be unique.
    fn create(&mut self, record: T) -> Result<()> {
        let mut records = self.read_all()?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(Error::Store(format!("a record with id `{}` already exists", record.id())));
        }
        records.push(record);
        self.replace_all(records)
    }

    /// Returns whether a record was removed.
    fn delete_by_id(&mut self, id: &str) -> Result<bool> {
        let mut records = self.read_all()?;
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.replace_all(records)?;
        Ok(true)
    }

    /// Replaces the record carrying the same id. Returns whether one existed.
    fn update_by_id(&mut self, record: T) -> Result<bool> {
        let mut records = self.read_all()?;
        let Some(slot) = records.iter_mut().find(|existing| existing.id() == record.id()) else {
            return Ok(false);
        };
        *slot = record;
        self.replace_all(records)?;
        Ok(true)
    }
}

/// Records kept as a pretty-printed JSON array in a single file.
/// A missing file reads as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _records: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            _records: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> JsonFileStore<T> {
    fn read_values(&self) -> Result<Vec<Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|err| Error::Store(format!("{}: {err}", self.path.display())))
    }
}

impl<T: DeserializeOwned> JsonFileStore<T> {
    /// Splits the stored values into readable records and the raw values of
    /// those that are not.
    fn partition(&self) -> Result<(Vec<T>, Vec<Value>)> {
        let mut records = Vec::new();
        let mut unreadable = Vec::new();

        for value in self.read_values()? {
            match T::deserialize(&value) {
                Ok(record) => records.push(record),
                Err(err) => {
                    let err = Error::MembershipData {
                        id: value.get("id").and_then(Value::as_str).unwrap_or("?").to_string(),
                        reason: err.to_string(),
                    };
                    log::warn!("Skipping record in {}: {err}", self.path.display());
                    unreadable.push(value);
                }
            }
        }

        Ok((records, unreadable))
    }
}

/// Records that fail to deserialize are left out of reads and written back
/// untouched after the others on every bulk write.
impl<T: Record + Serialize + DeserializeOwned> RecordStore<T> for JsonFileStore<T> {
    fn read_all(&self) -> Result<Vec<T>> {
        Ok(self.partition()?.0)
    }

    fn replace_all(&mut self, records: Vec<T>) -> Result<()> {
        let (_, unreadable) = self.partition()?;

        let mut values = records.iter().map(serde_json::to_value).collect::<Result<Vec<_>, _>>()?;
        values.extend(unreadable);

        let json = serde_json::to_string_pretty(&values)?;
        write_atomic(&self.path, json.as_bytes())?;
        log::debug!("Wrote {} records to {}", values.len(), self.path.display());
        Ok(())
    }
}

/// In-process store, counting bulk writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore<T> {
    records: Vec<T>,
    writes: usize,
}

impl<T> MemoryStore<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self { records, writes: 0 }
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl<T: Record + Clone> RecordStore<T> for MemoryStore<T> {
    fn read_all(&self) -> Result<Vec<T>> {
        Ok(self.records.clone())
    }

    fn replace_all(&mut self, records: Vec<T>) -> Result<()> {
        self.records = records;
        self.writes += 1;
        Ok(())
    }
}
