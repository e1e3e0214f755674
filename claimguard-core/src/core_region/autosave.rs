//! Periodic flush of dirty claims

use super::manager::{FlushReport, RegionManager};
use crate::shutdown::ShutdownSignal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Totals over the lifetime of one autosave task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSaveStats {
    pub flushes: usize,
    pub saved: usize,
    pub failures: usize,
}

/// Background task saving claim staff at a fixed interval
pub struct AutoSave;

impl AutoSave {
    /// Run on the current runtime until a shutdown signal arrives
    pub fn spawn(
        manager: Arc<RegionManager>,
        interval: Duration,
        shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> JoinHandle<AutoSaveStats> {
        tokio::spawn(Self::run(manager, interval, shutdown))
    }

    /// Flush every `interval`; on a graceful shutdown flush once more and
    /// return. Flushes run one at a time on the blocking pool.
    pub async fn run(
        manager: Arc<RegionManager>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<ShutdownSignal>,
    ) -> AutoSaveStats {
        let mut stats = AutoSaveStats::default();
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(interval = ?interval, "Autosave started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    Self::flush(&manager, &mut stats).await;
                }
                signal = shutdown.recv() => {
                    match signal {
                        Ok(ShutdownSignal::Immediate) => {
                            warn!(dirty = manager.dirty_count(), "Autosave stopped without a final flush");
                        }
                        Ok(ShutdownSignal::Graceful) | Err(_) => {
                            Self::flush(&manager, &mut stats).await;
                        }
                    }
                    break;
                }
            }
        }

        info!(flushes = stats.flushes, saved = stats.saved, "Autosave stopped");
        stats
    }

    async fn flush(manager: &Arc<RegionManager>, stats: &mut AutoSaveStats) {
        let manager = Arc::clone(manager);
        match tokio::task::spawn_blocking(move || manager.flush_dirty()).await {
            Ok(Ok(FlushReport { saved, failed })) => {
                stats.flushes += 1;
                stats.saved += saved;
                stats.failures += failed.len();
                if !failed.is_empty() {
                    warn!(failed = failed.len(), "Autosave left regions dirty; retrying next tick");
                } else if saved > 0 {
                    debug!(saved, "Autosave flushed regions");
                }
            }
            Ok(Err(e)) => {
                stats.flushes += 1;
                error!("Autosave flush failed: {}", e);
            }
            Err(e) => {
                error!("Autosave task panicked: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_region::coords::WorldCoordinate;
    use crate::core_region::manager::{ClaimOutcome, ManagerSettings};
    use crate::core_region::storage::{MemoryRegionStore, RegionStore};
    use crate::core_region::types::{PlayerId, WorldId};
    use crate::shutdown::ShutdownCoordinator;

    fn dirty_manager(store: Arc<MemoryRegionStore>) -> Arc<RegionManager> {
        let manager = Arc::new(RegionManager::new(store, ManagerSettings::default()));
        let coordinate = WorldCoordinate::new(WorldId::new("w"), 0, 0, 0);
        let region = match manager.create_region(coordinate, PlayerId::new("alice")).unwrap() {
            ClaimOutcome::Created(region) => region,
            ClaimOutcome::Refused(r) => panic!("refused: {}", r),
        };
        let id = {
            let mut region = region.write().unwrap();
            region.staff.invite(&PlayerId::new("alice"), &PlayerId::new("bob"));
            region.id
        };
        manager.mark_dirty(&id);
        manager
    }

    #[tokio::test]
    async fn test_final_flush_on_graceful_shutdown() {
        let store = Arc::new(MemoryRegionStore::new());
        let manager = dirty_manager(store.clone());
        let coordinator = ShutdownCoordinator::new();

        let handle = AutoSave::spawn(manager.clone(), Duration::from_secs(3600), coordinator.subscribe());
        coordinator.shutdown().await;
        let stats = handle.await.unwrap();

        assert_eq!(stats.saved, 1);
        assert_eq!(manager.dirty_count(), 0);
        assert!(store.load_regions().unwrap()[0].staff.is_invited(&PlayerId::new("bob")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_flush() {
        let store = Arc::new(MemoryRegionStore::new());
        let manager = dirty_manager(store.clone());
        let coordinator = ShutdownCoordinator::new();

        let handle = AutoSave::spawn(manager.clone(), Duration::from_secs(60), coordinator.subscribe());
        tokio::time::sleep(Duration::from_secs(61)).await;
        // Let the blocking flush finish before checking.
        while manager.dirty_count() > 0 {
            tokio::task::yield_now().await;
        }

        coordinator.shutdown().await;
        let stats = handle.await.unwrap();
        assert!(stats.flushes >= 2);
        assert_eq!(stats.saved, 1);
    }

    #[tokio::test]
    async fn test_immediate_shutdown_skips_flush() {
        let store = Arc::new(MemoryRegionStore::new());
        let manager = dirty_manager(store);
        let coordinator = ShutdownCoordinator::new();

        let handle = AutoSave::spawn(manager.clone(), Duration::from_secs(3600), coordinator.subscribe());
        coordinator.shutdown_immediately().await;
        let stats = handle.await.unwrap();

        assert_eq!(stats.flushes, 0);
        assert_eq!(manager.dirty_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_regions_dirty() {
        let store = Arc::new(MemoryRegionStore::new());
        let manager = dirty_manager(store.clone());
        store.set_fail_writes(true);
        let coordinator = ShutdownCoordinator::new();

        let handle = AutoSave::spawn(manager.clone(), Duration::from_secs(3600), coordinator.subscribe());
        coordinator.shutdown().await;
        let stats = handle.await.unwrap();

        assert_eq!(stats.failures, 1);
        assert_eq!(manager.dirty_count(), 1);
    }
}
