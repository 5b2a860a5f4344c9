//! # Snapshot Lifecycle
//!
//! Archives the live snapshot directory at the start and end of every run.
//!
//! Archival moves every `*.json` snapshot into a new
//! `{archive_dir}/session_YYYYMMDD_HHMMSS/`, then deletes whatever is left in
//! the live directory. Every pass gets its own session directory; a pass that
//! lands in the same second as an earlier one uses `session_..._1` and so on.
//! Running it twice in a row is harmless: the second pass finds nothing to
//! move and creates an empty session directory.
//!
//! [`SessionGuard`] ties archival to the process lifetime. It archives once on
//! startup and once more when the run ends, whether through
//! [`SessionGuard::finish`], an early error return or a panic unwinding
//! through `main`.

use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::error::Result;

/// Lifecycle state of the snapshot directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No session in progress
    Idle,
    /// Snapshots are being written
    Running,
    /// Snapshots are being moved to the archive
    Archiving,
}

/// Outcome of one archival pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    pub session_dir: PathBuf,
    /// Snapshot files moved into the session directory
    pub archived: usize,
    /// Leftover files deleted from the live directory
    pub cleaned: usize,
}

/// Owner of the live and archive directories
#[derive(Debug)]
pub struct Lifecycle {
    live_dir: PathBuf,
    archive_dir: PathBuf,
    state: LifecycleState,
}

impl Lifecycle {
    pub fn new(live_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            live_dir: live_dir.into(),
            archive_dir: archive_dir.into(),
            state: LifecycleState::Idle,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Archive leftovers from a previous run and start a new session
    pub fn begin_session(&mut self) -> Result<ArchiveReport> {
        let report = self.archive()?;
        self.state = LifecycleState::Running;
        Ok(report)
    }

    /// Archive the live directory into a session named after the current time
    pub fn archive(&mut self) -> Result<ArchiveReport> {
        self.archive_at(Local::now())
    }

    /// Archive the live directory into a session named after `at`
    ///
    /// # Errors
    ///
    /// Returns error if the session directory cannot be created or the live
    /// directory cannot be listed. Individual files that fail to move are
    /// logged and then removed with the rest of the leftovers.
    pub fn archive_at(&mut self, at: DateTime<Local>) -> Result<ArchiveReport> {
        self.state = LifecycleState::Archiving;
        let result = self.archive_files(at);
        self.state = LifecycleState::Idle;

        let report = result?;
        info!(
            "Archived {} snapshot files to {}, cleaned up {} leftover files",
            report.archived,
            report.session_dir.display(),
            report.cleaned
        );
        Ok(report)
    }

    fn archive_files(&self, at: DateTime<Local>) -> Result<ArchiveReport> {
        let session_dir = create_session_dir(&self.archive_dir, at)?;
        fs::create_dir_all(&self.live_dir)?;

        let mut archived = 0;
        for path in live_files(&self.live_dir)? {
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };

            match move_file(&path, &session_dir.join(name)) {
                Ok(true) => archived += 1,
                Ok(false) => debug!("{} vanished before archival", path.display()),
                Err(e) => warn!("Failed to archive {}: {}", path.display(), e),
            }
        }

        let mut cleaned = 0;
        for path in live_files(&self.live_dir)? {
            match fs::remove_file(&path) {
                Ok(()) => cleaned += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        Ok(ArchiveReport {
            session_dir,
            archived,
            cleaned,
        })
    }
}

/// Create a fresh session directory named after `at`
///
/// An existing directory belongs to an earlier pass and is never reused; the
/// name gets a `_1`, `_2`, ... suffix until an unused one is found.
fn create_session_dir(archive_dir: &Path, at: DateTime<Local>) -> io::Result<PathBuf> {
    fs::create_dir_all(archive_dir)?;
    let base = format!("session_{}", at.format("%Y%m%d_%H%M%S"));

    for attempt in 0u32.. {
        let name = match attempt {
            0 => base.clone(),
            n => format!("{}_{}", base, n),
        };
        let session_dir = archive_dir.join(name);
        match fs::create_dir(&session_dir) {
            Ok(()) => return Ok(session_dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free session directory for {}", base),
    ))
}

/// Regular files directly inside `dir`, sorted by path
fn live_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Move `from` to `to`, returning `false` if the source no longer exists
///
/// Falls back to copy and delete when a rename is not possible, such as
/// across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<bool> {
    match fs::rename(from, to) {
        Ok(()) => return Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => debug!("Rename of {} failed ({}), copying instead", from.display(), e),
    }

    match fs::copy(from, to) {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    }
    fs::remove_file(from)?;
    Ok(true)
}

/// Runs archival when a session ends, however it ends
#[derive(Debug)]
pub struct SessionGuard {
    lifecycle: Lifecycle,
    finished: bool,
}

impl SessionGuard {
    /// Archive the previous run's leftovers and open a new session
    pub fn start(mut lifecycle: Lifecycle) -> Result<(Self, ArchiveReport)> {
        let report = lifecycle.begin_session()?;
        Ok((
            Self {
                lifecycle,
                finished: false,
            },
            report,
        ))
    }

    /// End the session and archive its snapshots
    pub fn finish(mut self) -> Result<ArchiveReport> {
        self.finished = true;
        self.lifecycle.archive()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        info!("Session ended without a clean stop, archiving snapshots");
        if let Err(e) = self.lifecycle.archive() {
            error!("Failed to archive snapshots: {}", e);
        }
    }
}
