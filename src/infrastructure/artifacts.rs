//! Artifact persistence: publication and quarantine records on disk.
//!
//! Records land in the configured output directory as timestamped JSON
//! files. The directory doubles as the source of truth for the daily post
//! budget: published posts are counted by filename prefix.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::domain::models::{PublicationRecord, QuarantineRecord};

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads and writes run artifacts under one output directory.
pub struct ArtifactStore {
    output_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist a publication record; returns the file path written.
    pub fn save_publication(&self, record: &PublicationRecord) -> Result<PathBuf, ArtifactError> {
        let path = self.record_path("publication", record.published_at, record.workflow_id);
        self.write_json(&path, record)?;
        info!(path = %path.display(), "publication record saved");
        Ok(path)
    }

    /// Persist a quarantined run's full context; returns the file path.
    pub fn save_quarantine(&self, record: &QuarantineRecord) -> Result<PathBuf, ArtifactError> {
        let path = self.record_path("quarantine", record.quarantined_at, record.context.workflow_id);
        self.write_json(&path, record)?;
        info!(path = %path.display(), reason = %record.reason, "quarantine record saved");
        Ok(path)
    }

    /// Count publication records written on the given UTC day.
    pub fn published_on(&self, day: DateTime<Utc>) -> Result<u32, ArtifactError> {
        let prefix = format!("publication_{}", day.format("%Y%m%d"));
        if !self.output_dir.exists() {
            return Ok(0);
        }
        let mut count = 0;
        for entry in fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(&prefix) {
                count += 1;
            }
        }
        Ok(count)
    }

    fn record_path(&self, kind: &str, at: DateTime<Utc>, workflow_id: uuid::Uuid) -> PathBuf {
        let short_id = workflow_id.simple().to_string();
        self.output_dir.join(format!(
            "{kind}_{}_{}.json",
            at.format("%Y%m%d_%H%M%S"),
            &short_id[..8]
        ))
    }

    fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.output_dir)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)?;
        Ok(())
    }
}
