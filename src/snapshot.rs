use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, error, info, warn};
use regex::Regex;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use crate::collection::AppLists;
use crate::error::{AppError, AppResult};

/// Result of a successful snapshot write.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub timestamp: DateTime<Utc>,
    /// Copy of the snapshot that was replaced, if there was one and copying worked.
    pub backup: Option<PathBuf>,
    /// Backups deleted by the retention policy.
    pub pruned: Vec<PathBuf>,
}

/// Owns the canonical JSON snapshot of the unified collection and its backups.
///
/// Backups live next to the snapshot as `<stem>-backup-<timestamp>.json`.
/// Writes are serialized through an internal lock; reads never take it and
/// only ever see a complete file because writes land via rename.
pub struct SnapshotStore {
    path: PathBuf,
    /// Number of backups kept after each write. 0 keeps all of them.
    retention: usize,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>, retention: usize) -> Self {
        Self {
            path: path.into(),
            retention,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn stem(&self) -> String {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("snapshot")
            .to_string()
    }

    /// Loads the current snapshot.
    ///
    /// # Returns
    /// * `Ok(AppLists)` - The last collection written
    /// * `Err(AppError::NotFound)` - No snapshot has been written yet
    /// * `Err(AppError::Serialization)` - The file exists but is not a collection
    pub fn read(&self) -> AppResult<AppLists> {
        let text = fs::read_to_string(&self.path).map_err(|e| AppError::io_at(&self.path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            AppError::Serialization(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Loads the current snapshot, or the built-in sample collection when no
    /// snapshot exists. Other failures are passed through.
    pub fn read_or_fallback(&self) -> AppResult<AppLists> {
        match self.read() {
            Err(AppError::NotFound(_)) => {
                debug!("no snapshot at {}; serving sample data", self.path.display());
                Ok(AppLists::fallback())
            }
            other => other,
        }
    }

    /// Validates a client-held collection and writes it.
    ///
    /// A body missing `Web`, `App` or `all` fails before anything on disk is touched.
    pub fn write_json(&self, value: serde_json::Value) -> AppResult<WriteOutcome> {
        let lists = AppLists::from_json(value)?;
        self.write(&lists)
    }

    /// Replaces the snapshot with `lists`.
    ///
    /// The previous snapshot is copied to a timestamped backup first; a failed
    /// backup is logged and does not stop the write. Records holding NaN or
    /// infinite figures are rejected with `Validation` before anything on disk
    /// is touched.
    ///
    /// # Arguments
    /// * `lists` - The collection to persist
    ///
    /// # Returns
    /// * `Ok(WriteOutcome)` - Write time, the backup taken and any backups pruned
    /// * `Err(AppError::Io)` - The snapshot directory or file could not be written
    ///
    /// # Examples
    /// ```no_run
    /// use rankings::{AppLists, SnapshotStore};
    ///
    /// let store = SnapshotStore::new("public/data/excel-data.json", 30);
    /// match store.write(&AppLists::fallback()) {
    ///     Ok(outcome) => println!("saved at {}, backup {:?}", outcome.timestamp, outcome.backup),
    ///     Err(e) => eprintln!("Error saving snapshot: {}", e),
    /// }
    /// ```
    pub fn write(&self, lists: &AppLists) -> AppResult<WriteOutcome> {
        if !lists.is_consistent() {
            warn!(
                "writing collection whose all list has {} entries for {} Web + {} App",
                lists.all.len(),
                lists.web.len(),
                lists.app.len()
            );
        }

        if let Some(bad) = lists
            .web
            .iter()
            .chain(&lists.app)
            .chain(&lists.all)
            .find(|r| !r.figures_are_finite())
        {
            return Err(AppError::Validation(format!(
                "{} record {:?} has a non-finite figure",
                bad.list_type, bad.product
            )));
        }

        let body = serde_json::to_vec_pretty(lists)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let timestamp = Utc::now();

        let dir = self.dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| AppError::write_failed(&dir, e))?;

        let backup = self.backup(&timestamp);
        self.replace(&dir, &body)?;
        info!(
            "snapshot written to {} ({} records)",
            self.path.display(),
            lists.all.len()
        );

        let pruned = match self.prune() {
            Ok(pruned) => pruned,
            Err(e) => {
                warn!("pruning backups failed: {}", e);
                Vec::new()
            }
        };

        Ok(WriteOutcome {
            timestamp,
            backup,
            pruned,
        })
    }

    fn backup(&self, timestamp: &DateTime<Utc>) -> Option<PathBuf> {
        if !self.path.exists() {
            debug!("no previous snapshot to back up");
            return None;
        }

        let target = self.backup_path(timestamp);
        match fs::copy(&self.path, &target) {
            Ok(_) => {
                info!("created backup {}", target.display());
                Some(target)
            }
            Err(e) => {
                error!(
                    "backup to {} failed, saving new data anyway: {}",
                    target.display(),
                    e
                );
                None
            }
        }
    }

    /// `<stem>-backup-2024-01-31T08-15-02.123Z.json`, with a `-N` suffix when
    /// two writes land in the same millisecond.
    fn backup_path(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        let stamp = timestamp
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace(':', "-");
        let base = format!("{}-backup-{}", self.stem(), stamp);

        let mut candidate = self.dir().join(format!("{}.json", base));
        let mut seq = 1;
        while candidate.exists() {
            candidate = self.dir().join(format!("{}-{}.json", base, seq));
            seq += 1;
        }
        candidate
    }

    fn replace(&self, dir: &Path, body: &[u8]) -> AppResult<()> {
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| AppError::write_failed(dir, e))?;
        tmp.write_all(body)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| AppError::write_failed(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| AppError::write_failed(&self.path, e.error))?;
        Ok(())
    }

    /// Existing backups, oldest first.
    pub fn backups(&self) -> AppResult<Vec<PathBuf>> {
        let pattern = format!(
            r"^{}-backup-(\d{{4}}-\d{{2}}-\d{{2}}T\d{{2}}-\d{{2}}-\d{{2}}\.\d{{3}}Z)(?:-(\d+))?\.json$",
            regex::escape(&self.stem())
        );
        let re = Regex::new(&pattern).map_err(|e| AppError::Io(e.to_string()))?;

        let dir = self.dir();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::io_at(dir, e)),
        };

        let mut found: Vec<(String, u32, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AppError::io_at(dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(caps) = re.captures(name) {
                let stamp = caps[1].to_string();
                let seq = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                found.push((stamp, seq, entry.path()));
            }
        }

        found.sort();
        Ok(found.into_iter().map(|(_, _, path)| path).collect())
    }

    fn prune(&self) -> AppResult<Vec<PathBuf>> {
        if self.retention == 0 {
            return Ok(Vec::new());
        }
        let backups = self.backups()?;
        let excess = backups.len().saturating_sub(self.retention);

        let mut pruned = Vec::new();
        for path in backups.into_iter().take(excess) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    info!("pruned backup {}", path.display());
                    pruned.push(path);
                }
                Err(e) => warn!("could not remove backup {}: {}", path.display(), e),
            }
        }
        Ok(pruned)
    }
}
