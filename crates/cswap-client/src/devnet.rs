//! devnet wiring
//!
//! a software ledger, a pool engine and an in-process decryption service,
//! persisted as one json snapshot between cli invocations. NOT SECURE, the
//! snapshot holds the ledger key.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use cswap_disclosure::{DecryptionService, Eip712Domain, LocalSigner, SoftwareDecryptionService};
use cswap_ledger::{Clock, LedgerSnapshot, SoftwareLedger, SystemClock};
use cswap_pool::{Pool, PoolEngine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;

pub const SNAPSHOT_FILE: &str = "devnet.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevnetSnapshot {
    pub version: u32,
    pub ledger: LedgerSnapshot,
    pub pool: Pool,
}

impl DevnetSnapshot {
    const VERSION: u32 = 1;

    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read(path).with_context(|| format!("reading devnet snapshot {}", path.display()))?;
        let snapshot: DevnetSnapshot = serde_json::from_slice(&content)
            .with_context(|| format!("parsing devnet snapshot {}", path.display()))?;
        if snapshot.version != Self::VERSION {
            anyhow::bail!("unsupported devnet snapshot version: {}", snapshot.version);
        }
        Ok(snapshot)
    }
}

pub struct Devnet {
    ledger: Arc<SoftwareLedger>,
    engine: Arc<PoolEngine<SoftwareLedger>>,
    clock: Arc<dyn Clock>,
    domain: Eip712Domain,
    relayer_url: Option<String>,
    path: Option<PathBuf>,
}

impl Devnet {
    /// fresh in-memory devnet
    pub fn new(config: &ClientConfig, clock: Arc<dyn Clock>) -> Self {
        let pair = config.pair();
        let ledger = Arc::new(SoftwareLedger::with_clock(pair.assets().to_vec(), clock.clone()));
        let engine = Arc::new(PoolEngine::new(pair, ledger.clone()));
        Self {
            ledger,
            engine,
            clock,
            domain: config.domain(),
            relayer_url: config.relayer_url.clone(),
            path: None,
        }
    }

    /// restore from `path`, or start fresh if it does not exist yet
    pub fn open(config: &ClientConfig, path: &Path) -> Result<Self> {
        Self::open_with_clock(config, path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(config: &ClientConfig, path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut devnet = if path.exists() {
            let snapshot = DevnetSnapshot::load(path)?;
            let ledger = Arc::new(SoftwareLedger::restore(snapshot.ledger, clock.clone())?);
            let engine = Arc::new(PoolEngine::with_state(config.pair(), ledger.clone(), snapshot.pool));
            debug!("restored devnet from {}", path.display());
            Self {
                ledger,
                engine,
                clock,
                domain: config.domain(),
                relayer_url: config.relayer_url.clone(),
                path: None,
            }
        } else {
            info!("no devnet snapshot at {}, starting fresh", path.display());
            Self::new(config, clock)
        };
        devnet.path = Some(path.to_path_buf());
        Ok(devnet)
    }

    /// `<data_dir>/devnet.json`
    pub fn default_path(config: &ClientConfig) -> Result<PathBuf> {
        Ok(config.data_dir()?.join(SNAPSHOT_FILE))
    }

    pub fn ledger(&self) -> &Arc<SoftwareLedger> {
        &self.ledger
    }

    pub fn engine(&self) -> &Arc<PoolEngine<SoftwareLedger>> {
        &self.engine
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn snapshot(&self) -> Result<DevnetSnapshot> {
        Ok(DevnetSnapshot {
            version: DevnetSnapshot::VERSION,
            ledger: self.ledger.snapshot()?,
            pool: self.engine.snapshot(),
        })
    }

    /// write the snapshot back to where it was opened from
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.snapshot()?)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
        debug!("saved devnet to {}", path.display());
        Ok(())
    }

    /// decryption service for this devnet: remote relayer if configured
    /// and built with `network`, the in-process service otherwise
    pub fn decryption_service(&self) -> Arc<dyn DecryptionService> {
        if let Some(url) = &self.relayer_url {
            #[cfg(feature = "network")]
            {
                info!("using decryption relayer at {}", url);
                return Arc::new(cswap_disclosure::RelayerClient::new(url.clone()));
            }
            #[cfg(not(feature = "network"))]
            warn!("relayer {} configured but network support is not built in", url);
        }
        Arc::new(SoftwareDecryptionService::with_clock(
            self.ledger.clone(),
            self.domain.clone(),
            self.clock.clone(),
        ))
    }
}

/// deterministic signing identity for a named dev account
pub fn dev_identity(name: &str) -> Result<Arc<LocalSigner>> {
    let signer = LocalSigner::dev(name).with_context(|| format!("deriving dev identity {}", name))?;
    Ok(Arc::new(signer))
}
