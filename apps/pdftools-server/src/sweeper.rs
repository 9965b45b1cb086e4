//! Background sweep of stale temp files
//!
//! Request guards delete their own files; the sweeper reclaims whatever a
//! crash or a killed worker left behind. It does not coordinate with
//! in-flight requests.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::tempfiles::remove_quietly;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    pub removed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct Sweeper {
    dirs: Vec<PathBuf>,
    max_age: Duration,
    interval: Duration,
}

impl Sweeper {
    pub fn new(dirs: Vec<PathBuf>, max_age: Duration, interval: Duration) -> Self {
        Self {
            dirs,
            max_age,
            interval,
        }
    }

    /// Delete every regular file whose mtime is older than `now - max_age`.
    /// Never fails; problems are counted and logged.
    pub fn sweep_at(&self, now: SystemTime) -> SweepStats {
        let mut stats = SweepStats::default();
        let Some(cutoff) = now.checked_sub(self.max_age) else {
            return stats;
        };

        for dir in &self.dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "Skipping sweep directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let Ok(metadata) = entry.metadata() else {
                    continue;
                };
                if !metadata.is_file() {
                    continue;
                }
                stats.scanned += 1;

                let stale = metadata.modified().map(|m| m < cutoff).unwrap_or(false);
                if !stale {
                    continue;
                }

                let path = entry.path();
                remove_quietly(&path);
                if path.exists() {
                    stats.failed += 1;
                } else {
                    stats.removed += 1;
                }
            }
        }

        stats
    }

    /// Spawn the sweep loop. The first sweep runs immediately.
    pub fn start(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let sweeper = self.clone();
                match tokio::task::spawn_blocking(move || sweeper.sweep_at(SystemTime::now())).await {
                    Ok(stats) if stats.removed > 0 || stats.failed > 0 => tracing::info!(
                        scanned = stats.scanned,
                        removed = stats.removed,
                        failed = stats.failed,
                        "Swept stale temp files"
                    ),
                    Ok(stats) => tracing::debug!(scanned = stats.scanned, "Sweep found nothing stale"),
                    Err(e) => tracing::error!(error = %e, "Sweep task failed"),
                }
            }

            tracing::debug!("Sweeper stopped");
        });

        SweeperHandle { cancel, task }
    }
}

pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_sweep_removes_only_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.pdf");
        let fresh = dir.path().join("fresh.pdf");
        std::fs::write(&old, b"old").unwrap();
        std::fs::write(&fresh, b"fresh").unwrap();

        let old_mtime = SystemTime::now() - 2 * HOUR;
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(old_mtime)
            .unwrap();

        let sweeper = Sweeper::new(vec![dir.path().to_path_buf()], HOUR, HOUR);
        let stats = sweeper.sweep_at(SystemTime::now());

        assert_eq!(
            stats,
            SweepStats {
                scanned: 2,
                removed: 1,
                failed: 0
            }
        );
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[test]
    fn test_sweep_sees_everything_as_stale_from_the_future() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"a").unwrap();
        std::fs::write(dir.path().join("b.zip"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let sweeper = Sweeper::new(vec![dir.path().to_path_buf()], HOUR, HOUR);
        let stats = sweeper.sweep_at(SystemTime::now() + 2 * HOUR);

        assert_eq!(stats.removed, 2);
        // Directories are not touched
        assert!(dir.path().join("nested").is_dir());
    }

    #[test]
    fn test_sweep_skips_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sweeper = Sweeper::new(vec![dir.path().join("nope")], HOUR, HOUR);

        assert_eq!(sweeper.sweep_at(SystemTime::now()), SweepStats::default());
    }

    #[tokio::test]
    async fn test_started_sweeper_runs_immediately_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("stale.pdf");
        std::fs::write(&stale, b"x").unwrap();

        // Zero max age: anything written before the first tick is stale
        let sweeper = Sweeper::new(vec![dir.path().to_path_buf()], Duration::ZERO, HOUR);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let handle = sweeper.start();

        for _ in 0..100 {
            if !stale.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        handle.stop().await;
        assert!(!stale.exists());
    }
}
