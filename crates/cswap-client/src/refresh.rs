//! best-effort periodic refresh of public pool state
//!
//! a poller fetches a [`PoolView`] every interval and publishes it through
//! a `watch` channel. consumers see the latest view only and must tolerate
//! staleness. the poller exits once every receiver is dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cswap_ledger::{EncryptedLedger, SystemClock};
use cswap_pool::PoolEngine;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::devnet::Devnet;
use crate::orchestrator::{pool_view, PoolView};

/// where a poller reads pool state from
pub trait StateSource: Send + Sync + 'static {
    fn fetch(&self) -> Result<PoolView>;
}

impl<L: EncryptedLedger + ?Sized + 'static> StateSource for Arc<PoolEngine<L>> {
    fn fetch(&self) -> Result<PoolView> {
        Ok(pool_view(self))
    }
}

/// reloads a devnet snapshot on every fetch, so another process's
/// writes show up
pub struct SnapshotSource {
    config: ClientConfig,
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(config: ClientConfig, path: PathBuf) -> Self {
        Self { config, path }
    }
}

impl StateSource for SnapshotSource {
    fn fetch(&self) -> Result<PoolView> {
        let devnet = Devnet::open_with_clock(&self.config, &self.path, Arc::new(SystemClock))?;
        Ok(pool_view(devnet.engine()))
    }
}

pub struct Poller {
    pub updates: watch::Receiver<Option<PoolView>>,
    pub handle: JoinHandle<()>,
}

/// start polling `source` every `interval`, first fetch immediately
pub fn spawn_poller<S: StateSource>(source: S, interval: Duration) -> Poller {
    let (tx, rx) = watch::channel(None);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tx.closed() => break,
            }

            match source.fetch() {
                Ok(view) => {
                    let changed = match &*tx.borrow() {
                        Some(prev) => *prev != view,
                        None => true,
                    };
                    if changed {
                        debug!("pool view changed: reserves {:?}", view.reserves);
                    }
                    if tx.send(Some(view)).is_err() {
                        break;
                    }
                }
                // keep publishing the last good view
                Err(e) => warn!("refresh failed: {:#}", e),
            }
        }
        debug!("refresh poller stopped");
    });

    Poller { updates: rx, handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Failing(AtomicUsize);

    impl StateSource for Failing {
        fn fetch(&self) -> Result<PoolView> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("unreachable node")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_keep_polling() {
        let source = Arc::new(Failing(AtomicUsize::new(0)));
        let poller = spawn_poller(ArcSource(source.clone()), Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(46)).await;
        assert!(poller.updates.borrow().is_none());
        assert!(source.0.load(Ordering::SeqCst) >= 4);

        drop(poller.updates);
        poller.handle.await.unwrap();
    }

    struct ArcSource(Arc<Failing>);

    impl StateSource for ArcSource {
        fn fetch(&self) -> Result<PoolView> {
            self.0.fetch()
        }
    }
}
