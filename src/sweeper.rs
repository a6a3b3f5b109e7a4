// Retention sweeper: deletes downloaded artifacts past their age.
//
// Runs once at startup with a short window, then on a fixed hourly timer.
// Deletion is idempotent and directory scans are cheap at expected volumes,
// so no overlap protection is needed.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::DownloaderConfig;

pub struct RetentionSweeper {
    dirs: Vec<PathBuf>,
}

impl RetentionSweeper {
    pub fn new(config: &DownloaderConfig) -> Self {
        Self {
            dirs: config.output_dirs(),
        }
    }

    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Delete everything older than `max_age`: plain files in each output
    /// directory, and whole request arenas (subdirectories) that went
    /// stale. Missing directories are skipped; individual deletion errors
    /// are logged and swallowed. Returns the number of removed entries.
    pub fn sweep(&self, max_age: Duration) -> usize {
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(UNIX_EPOCH);
        let mut removed = 0usize;

        for dir in &self.dirs {
            let entries = match fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };

            for entry in entries.flatten() {
                let path = entry.path();
                let meta = match entry.metadata() {
                    Ok(meta) => meta,
                    Err(e) => {
                        log::warn!("could not stat {}: {}", path.display(), e);
                        continue;
                    }
                };
                let mtime = match meta.modified() {
                    Ok(mtime) => mtime,
                    Err(e) => {
                        log::warn!("no mtime for {}: {}", path.display(), e);
                        continue;
                    }
                };
                if mtime >= cutoff {
                    continue;
                }

                let result = if meta.is_dir() {
                    fs::remove_dir_all(&path)
                } else if meta.is_file() {
                    fs::remove_file(&path)
                } else {
                    continue;
                };

                match result {
                    Ok(()) => {
                        log::debug!("deleted stale artifact {}", path.display());
                        removed += 1;
                    }
                    Err(e) => log::warn!("failed to delete {}: {}", path.display(), e),
                }
            }
        }

        removed
    }

    /// Run the sweeper for the lifetime of the process: one startup sweep
    /// with the short retention window, then one per interval. The task
    /// stops when the shutdown channel fires or its sender is dropped.
    pub fn spawn(
        self,
        config: &DownloaderConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let interval = config.sweep_interval;
        let retention = config.retention_age;
        let startup_retention = config.startup_retention_age;

        tokio::spawn(async move {
            let removed = self.sweep(startup_retention);
            log::info!("startup sweep removed {} stale artifact(s)", removed);

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        let removed = self.sweep(retention);
                        log::debug!("periodic sweep removed {} stale artifact(s)", removed);
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            log::debug!("retention sweeper stopped");
        })
    }
}
