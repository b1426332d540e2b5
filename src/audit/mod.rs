//! Append-only audit trail for alerts and simulated actions.
//!
//! Sinks are injected where they are used; nothing here is process-global.
//! `append` never returns an error: a sink that cannot write reports it on
//! the log and carries on.

use crate::alert::Alert;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A simulated enforcement action as recorded in the trail.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionRecord {
    pub timestamp: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AuditEvent {
    Alert(Alert),
    Action(ActionRecord),
}

pub trait AuditSink: Send + Sync {
    fn append(&self, event: &AuditEvent);

    fn flush(&self) {}
}

#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            max_bytes: 5_000_000,
            backup_count: 3,
        }
    }
}

struct SinkState {
    writer: BufWriter<File>,
    written: u64,
}

/// One JSON object per line, rotated by size.
///
/// When a line would push the file past `max_bytes`, the file is renamed
/// to `<path>.1` (shifting older backups up to `backup_count`) and a new
/// one is started. With `backup_count == 0` the file grows unbounded.
pub struct JsonLineSink {
    path: PathBuf,
    rotation: Rotation,
    state: Mutex<SinkState>,
}

impl JsonLineSink {
    pub fn open<P: AsRef<Path>>(path: P, rotation: Rotation) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let (file, written) = Self::open_file(&path)?;
        log::debug!("Audit log opened at {}", path.display());

        Ok(Self {
            path,
            rotation,
            state: Mutex::new(SinkState {
                writer: BufWriter::new(file),
                written,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_file(path: &Path) -> std::io::Result<(File, u64)> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok((file, written))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn rotate(&self, state: &mut SinkState) -> std::io::Result<()> {
        state.writer.flush()?;

        let oldest = self.backup_path(self.rotation.backup_count);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for i in (1..self.rotation.backup_count).rev() {
            let from = self.backup_path(i);
            if from.exists() {
                fs::rename(&from, self.backup_path(i + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        let (file, written) = Self::open_file(&self.path)?;
        state.writer = BufWriter::new(file);
        state.written = written;
        Ok(())
    }

    fn write_line(&self, state: &mut SinkState, line: &str) -> std::io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.rotation.backup_count > 0
            && state.written > 0
            && state.written + len > self.rotation.max_bytes
        {
            self.rotate(state)?;
        }
        state.writer.write_all(line.as_bytes())?;
        state.writer.write_all(b"\n")?;
        state.writer.flush()?;
        state.written += len;
        Ok(())
    }
}

impl AuditSink for JsonLineSink {
    fn append(&self, event: &AuditEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                log::error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        match self.state.lock() {
            Ok(mut state) => {
                if let Err(e) = self.write_line(&mut state, &line) {
                    log::error!("Failed to write audit log {}: {}", self.path.display(), e);
                }
            }
            Err(e) => log::error!("Audit log lock poisoned: {}", e),
        }
    }

    fn flush(&self) {
        if let Ok(mut state) = self.state.lock() {
            if let Err(e) = state.writer.flush() {
                log::error!("Failed to flush audit log {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for JsonLineSink {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Keeps serialized events in memory.
#[derive(Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn events(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemorySink {
    fn append(&self, event: &AuditEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                if let Ok(mut lines) = self.lines.lock() {
                    lines.push(line);
                }
            }
            Err(e) => log::error!("Failed to serialize audit event: {}", e),
        }
    }
}
