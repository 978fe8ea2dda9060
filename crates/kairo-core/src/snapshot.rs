use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::calendar::DateRange;
use crate::datekey::{DateKeyed, date_key, index_by_date_key};
use crate::model::{CalendarEvent, Day, TimeBlockTemplate, Todo};

/// Read-only view over collections exported from the API.
///
/// Each file holds either a JSON array or one JSON record per line. A file
/// that does not exist reads as an empty collection.
#[derive(Debug)]
pub struct Snapshot {
    pub data_dir: PathBuf,
    pub days_path: PathBuf,
    pub todos_path: PathBuf,
    pub events_path: PathBuf,
    pub templates_path: PathBuf,
}

impl Snapshot {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        if data_dir.exists() && !data_dir.is_dir() {
            return Err(anyhow!("{} is not a directory", data_dir.display()));
        }

        let data_dir = data_dir.to_path_buf();
        let days_path = data_dir.join("days.json");
        let todos_path = data_dir.join("todos.json");
        let events_path = data_dir.join("events.json");
        let templates_path = data_dir.join("templates.json");

        info!(
            data_dir = %data_dir.display(),
            days = days_path.exists(),
            todos = todos_path.exists(),
            events = events_path.exists(),
            templates = templates_path.exists(),
            "opened snapshot"
        );

        Ok(Self {
            data_dir,
            days_path,
            todos_path,
            events_path,
            templates_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load_days(&self) -> anyhow::Result<Vec<Day>> {
        load_records(&self.days_path).context("failed to load days.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_todos(&self) -> anyhow::Result<Vec<Todo>> {
        load_records(&self.todos_path).context("failed to load todos.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_events(&self) -> anyhow::Result<Vec<CalendarEvent>> {
        load_records(&self.events_path).context("failed to load events.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn load_templates(&self) -> anyhow::Result<Vec<TimeBlockTemplate>> {
        load_records(&self.templates_path).context("failed to load templates.json")
    }

    /// Days inside `range`, keyed by `YYYY-MM-DD`.
    #[tracing::instrument(skip(self))]
    pub fn days_in(&self, range: DateRange) -> anyhow::Result<BTreeMap<String, Day>> {
        let start = date_key(range.start);
        let end = date_key(range.end);
        let days = self
            .load_days()?
            .into_iter()
            .filter(|day| {
                let key = day.date_key();
                key >= start.as_str() && key <= end.as_str()
            });
        Ok(index_by_date_key(days))
    }
}

#[tracing::instrument(skip(path))]
fn load_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        debug!(file = %path.display(), "no snapshot file; treating as empty");
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    let trimmed = raw.trim_start();
    if trimmed.starts_with('[') {
        let out: Vec<T> = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {}", path.display()))?;
        debug!(count = out.len(), "loaded records from json array");
        return Ok(out);
    }

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
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
