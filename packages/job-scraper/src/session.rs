//! Durable storage for the authenticated session artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, ScrapeError};
use crate::types::Session;

const ENVELOPE_VERSION: u32 = 1;

/// On-disk wrapper around the driver's opaque state.
#[derive(Serialize, Deserialize)]
struct SessionEnvelope {
    version: u32,
    saved_at: DateTime<Utc>,
    state: serde_json::Value,
}

/// Reads and writes the session artifact at a fixed path.
///
/// Writes go to a sibling temp file that is synced and then renamed over the
/// target, so a crash mid-save leaves either the old artifact or the new one.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the stored session.
    ///
    /// Any read or parse failure is reported as `CorruptSession`; callers
    /// treat that as "no session" and log in again.
    pub fn load(&self) -> Result<Session> {
        let raw = fs::read_to_string(&self.path).map_err(|e| self.corrupt(e))?;
        let envelope: SessionEnvelope = serde_json::from_str(&raw).map_err(|e| self.corrupt(e))?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(self.corrupt(format!(
                "unsupported session version {}",
                envelope.version
            )));
        }
        if envelope.state.is_null() {
            return Err(self.corrupt("session state is empty"));
        }

        tracing::debug!(
            path = %self.path.display(),
            saved_at = %envelope.saved_at,
            "Loaded session artifact"
        );

        Ok(Session::new(envelope.state))
    }

    /// Persist `session`, replacing any existing artifact wholesale.
    pub fn save(&self, session: &Session) -> Result<()> {
        let envelope = SessionEnvelope {
            version: ENVELOPE_VERSION,
            saved_at: Utc::now(),
            state: session.state().clone(),
        };
        let encoded = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| self.write_failed(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.write_failed(e))?;
        }

        let tmp_path = self.tmp_path();
        let written = write_synced(&tmp_path, &encoded).and_then(|_| fs::rename(&tmp_path, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.write_failed(e));
        }

        tracing::info!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Remove the artifact. A missing file is not an error.
    pub fn discard(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_failed(e)),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupt(&self, reason: impl ToString) -> ScrapeError {
        ScrapeError::CorruptSession {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_failed(&self, source: io::Error) -> ScrapeError {
        ScrapeError::SessionWriteFailed {
            path: self.path.clone(),
            source,
        }
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
