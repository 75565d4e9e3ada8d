//! Append-only per-session transcript files.
//!
//! One flat text file per session under the transcripts directory. Appends to
//! the same session are serialized through a per-session async lock, and each
//! session's timestamps strictly increase.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use critter_core::session::SessionId;
use critter_core::types::LogEntry;

use crate::error::Result;

type SessionSlot = Arc<tokio::sync::Mutex<()>>;

#[derive(Debug)]
pub struct TranscriptLog {
    dir: PathBuf,
    // Write locks for sessions with an append in flight. Idle sessions hold
    // no entry.
    sessions: Mutex<HashMap<SessionId, SessionSlot>>,
    // Last timestamp handed out, across all sessions.
    last_issued: Mutex<Option<DateTime<Utc>>>,
}

impl TranscriptLog {
    /// Create the logger and its directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!("transcripts: writing under {}", dir.display());
        Ok(Self {
            dir,
            sessions: Mutex::new(HashMap::new()),
            last_issued: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, session: &SessionId) -> PathBuf {
        self.dir.join(session.file_name())
    }

    /// Recreate the directory if it has gone away. Idempotent.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Append `[<timestamp>] <text>` to the session's file.
    pub async fn append(&self, session: &SessionId, text: &str) -> Result<LogEntry> {
        let slot = self.slot(session);
        let guard = slot.lock().await;
        let written = self.write(session, text).await;
        drop(guard);
        self.release(session, &slot);
        written
    }

    async fn write(&self, session: &SessionId, text: &str) -> Result<LogEntry> {
        let entry = LogEntry {
            timestamp: self.next_timestamp(),
            text: text.to_string(),
        };

        self.ensure_dir().await?;
        let path = self.path_for(session);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(entry.to_line().as_bytes()).await?;
        file.flush().await?;

        debug!("transcripts: {} += {} chars", session, text.len());
        Ok(entry)
    }

    /// Millisecond timestamp strictly after every one issued before.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = self.last_issued.lock().unwrap_or_else(|e| e.into_inner());
        let mut timestamp = Utc::now().trunc_subsecs(3);
        if let Some(prev) = *last {
            if timestamp <= prev {
                timestamp = prev + TimeDelta::milliseconds(1);
            }
        }
        *last = Some(timestamp);
        timestamp
    }

    fn slot(&self, session: &SessionId) -> SessionSlot {
        self.sessions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(session.clone())
            .or_default()
            .clone()
    }

    /// Drop the session's lock entry once no other append holds or awaits it.
    fn release(&self, session: &SessionId, slot: &SessionSlot) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one held by the caller.
        if Arc::strong_count(slot) == 2 {
            sessions.remove(session);
        }
    }

    /// Sessions with an append in flight.
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
