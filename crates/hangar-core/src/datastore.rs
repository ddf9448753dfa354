use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::task::{Category, Priority, Task};
use crate::view::Snapshot;

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
    pub categories_path: PathBuf,
    pub priorities_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        let categories_path = data_dir.join("categories.data");
        let priorities_path = data_dir.join("priorities.data");

        for path in [&tasks_path, &categories_path, &priorities_path] {
            if !path.exists() {
                fs::write(path, "")
                    .with_context(|| format!("failed to create {}", path.display()))?;
            }
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            categories = %categories_path.display(),
            priorities = %priorities_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
            categories_path,
            priorities_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_tasks(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_categories(&self) -> anyhow::Result<Vec<Category>> {
        load_jsonl(&self.categories_path).context("failed to load categories.data")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_priorities(&self) -> anyhow::Result<Vec<Priority>> {
        load_jsonl(&self.priorities_path).context("failed to load priorities.data")
    }

    /// Reads every record file into one point-in-time snapshot.
    #[tracing::instrument(skip(self))]
    pub fn load_snapshot(&self) -> anyhow::Result<Snapshot> {
        let snapshot = Snapshot {
            categories: self.load_categories()?,
            priorities: self.load_priorities()?,
            tasks: self.load_tasks()?,
        };
        warn_on_dangling_refs(&snapshot);
        Ok(snapshot)
    }

    #[tracing::instrument(skip(self, snapshot))]
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.categories_path, &snapshot.categories)
            .context("failed to save categories.data")?;
        save_jsonl_atomic(&self.priorities_path, &snapshot.priorities)
            .context("failed to save priorities.data")?;
        save_jsonl_atomic(&self.tasks_path, &snapshot.tasks).context("failed to save tasks.data")?;
        Ok(())
    }

    /// Replaces the stored snapshot with a JSON document of the form
    /// `{"categories": [...], "priorities": [...], "tasks": [...]}`.
    #[tracing::instrument(skip(self))]
    pub fn import_file(&self, path: &Path) -> anyhow::Result<Snapshot> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", path.display()))?;

        info!(
            categories = snapshot.categories.len(),
            priorities = snapshot.priorities.len(),
            tasks = snapshot.tasks.len(),
            "importing snapshot"
        );
        self.save_snapshot(&snapshot)?;
        Ok(snapshot)
    }
}

fn warn_on_dangling_refs(snapshot: &Snapshot) {
    for task in &snapshot.tasks {
        if !snapshot.categories.iter().any(|c| c.id == task.category.id) {
            warn!(task = task.id, category = task.category.id, "task references unknown category");
        }
        if !snapshot.priorities.iter().any(|p| p.id == task.priority.id) {
            warn!(task = task.id, priority = task.priority.id, "task references unknown priority");
        }
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let record: T = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(record);
    }

    debug!(count = out.len(), "loaded records from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, records))]
fn save_jsonl_atomic<T: Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = records.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for record in records {
        let serialized = serde_json::to_string(record)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
