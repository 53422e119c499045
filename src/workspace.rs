use std::path::{Path, PathBuf};

use crate::agenda::Sources;
use crate::cache::FileCache;
use crate::model::{ClassEvent, Fixture, ScheduleEntry, Task};
use crate::store::{JsonFileStore, Record, RecordStore};

/// Layout of the data directory holding caches and stores.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks(&self) -> JsonFileStore<Task> {
        JsonFileStore::new(self.root.join("tasks.json"))
    }

    pub fn entries(&self) -> JsonFileStore<ScheduleEntry> {
        JsonFileStore::new(self.root.join("entries.json"))
    }

    pub fn class_cache(&self) -> FileCache<ClassEvent> {
        FileCache::new(self.root.join("classes.json"))
    }

    pub fn fixture_cache(&self) -> FileCache<Fixture> {
        FileCache::new(self.root.join("fixtures.json"))
    }

    /// Reads every source for aggregation. Caches are used however old they
    /// are; an unreadable store reads as empty.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            classes: self.class_cache().load_any(),
            fixtures: self.fixture_cache().load_any(),
            entries: read_or_empty(&self.entries()),
            tasks: read_or_empty(&self.tasks()),
        }
    }
}

fn read_or_empty<T: Record, S: RecordStore<T>>(store: &S) -> Vec<T> {
    store.read_all().unwrap_or_else(|err| {
        log::error!("{err}");
        Vec::new()
    })
}

/// Owned copies of every source, read once per view.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub classes: Vec<ClassEvent>,
    pub fixtures: Vec<Fixture>,
    pub entries: Vec<ScheduleEntry>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    pub fn sources(&self) -> Sources<'_> {
        Sources {
            classes: &self.classes,
            fixtures: &self.fixtures,
            entries: &self.entries,
            tasks: &self.tasks,
        }
    }
}
