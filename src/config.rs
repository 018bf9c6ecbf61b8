use log::warn;
use std::path::PathBuf;

use crate::description::DescriptionStore;
use crate::snapshot::SnapshotStore;

// Defaults
const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_DATA_DIR: &str = "public/data";
const DEFAULT_SNAPSHOT_FILE: &str = "excel-data.json";
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_BACKUP_RETENTION: usize = 30;
const DESCRIPTIONS_SUBDIR: &str = "descriptions";

/// Runtime settings for the server and the conversion tool.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub addr: String,
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    pub static_dir: PathBuf,
    /// Backups kept after each snapshot write; 0 keeps every backup.
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            snapshot_file: DEFAULT_SNAPSHOT_FILE.to_string(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            backup_retention: DEFAULT_BACKUP_RETENTION,
        }
    }
}

impl Config {
    /// Reads `RANKINGS_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Config::default();

        if let Some(addr) = lookup("RANKINGS_ADDR") {
            config.addr = addr;
        }
        if let Some(dir) = lookup("RANKINGS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup("RANKINGS_SNAPSHOT_FILE") {
            config.snapshot_file = file;
        }
        if let Some(dir) = lookup("RANKINGS_STATIC_DIR") {
            config.static_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("RANKINGS_BACKUP_RETENTION") {
            match raw.trim().parse() {
                Ok(n) => config.backup_retention = n,
                Err(_) => warn!(
                    "RANKINGS_BACKUP_RETENTION={:?} is not a number; keeping {}",
                    raw, config.backup_retention
                ),
            }
        }

        config
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }

    pub fn snapshot_store(&self) -> SnapshotStore {
        SnapshotStore::new(self.snapshot_path(), self.backup_retention)
    }

    /// Product descriptions are cached under the data directory.
    pub fn descriptions_dir(&self) -> PathBuf {
        self.data_dir.join(DESCRIPTIONS_SUBDIR)
    }

    pub fn description_store(&self) -> DescriptionStore {
        DescriptionStore::new(self.descriptions_dir())
    }
}
