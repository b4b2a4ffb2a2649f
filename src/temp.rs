use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// Owns a process-unique temp directory for captured media, hands out
/// unique file paths, and sweeps stale files. The directory is removed when
/// the manager is dropped.
pub struct TempManager {
    dir: TempDir,
    counter: AtomicU64,
}

impl TempManager {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("camgrab-").tempdir()?;
        tracing::info!("Temporary directory created at {}", dir.path().display());
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Hand out a fresh file path inside the managed directory.
    pub fn request_path(&self, suffix: &str) -> PathBuf {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        self.dir.path().join(format!("capture-{n:04}{suffix}"))
    }

    /// Remove files last modified more than `max_age` ago. Returns how many
    /// were removed.
    pub fn sweep(&self, max_age: Duration) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for entry in std::fs::read_dir(self.dir.path())? {
            let entry = entry?;
            let modified = entry.metadata()?.modified()?;
            let age = now.duration_since(modified).unwrap_or_default();
            if age >= max_age {
                std::fs::remove_file(entry.path())?;
                removed += 1;
                tracing::info!("Removed old file: {}", entry.path().display());
            }
        }

        Ok(removed)
    }

    /// Sweep on an interval. The task stops once the manager is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration, max_age: Duration) {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // the first tick fires immediately
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                if let Err(e) = manager.sweep(max_age) {
                    tracing::warn!("Temp sweep failed: {e}");
                }
            }
        });
    }
}

impl Drop for TempManager {
    fn drop(&mut self) {
        tracing::info!("Removing temporary directory {}", self.dir.path().display());
    }
}
