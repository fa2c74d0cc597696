//! client configuration
//!
//! read from `--config <path>` or `~/.config/cswap/config.toml`. every
//! field has a default, so a missing file is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use cswap_disclosure::{Eip712Domain, DEFAULT_DURATION_DAYS};
use cswap_ledger::{Address, AssetPair};
use cswap_pool::ASSET_DECIMALS;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    pub decimals: u32,
}

impl AssetConfig {
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            decimals: ASSET_DECIMALS,
        }
    }

    /// deterministic contract address of this asset
    pub fn address(&self) -> Address {
        Address::derive(format!("asset:{}", self.symbol.to_lowercase()).as_bytes())
    }
}

/// signing domain of the decryption gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub name: String,
    pub version: String,
    /// label the verifying contract address is derived from
    pub verifying_contract: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            name: "Decryption".into(),
            version: "1".into(),
            verifying_contract: "decryption-gateway".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub chain_id: u64,
    /// pool/account refresh period, seconds
    pub refresh_interval_secs: u64,
    /// validity window of disclosure grants, days
    pub disclosure_days: u32,
    /// lifetime of the pool's operator delegation, days
    pub operator_days: u32,
    /// reuse signed disclosure grants within their window
    pub cache_grants: bool,
    /// remote decryption relayer; the in-process service is used when unset
    pub relayer_url: Option<String>,
    /// devnet snapshot directory, defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
    pub asset_a: AssetConfig,
    pub asset_b: AssetConfig,
    pub gateway: GatewayConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: 9000,
            refresh_interval_secs: 15,
            disclosure_days: DEFAULT_DURATION_DAYS,
            operator_days: 30,
            cache_grants: false,
            relayer_url: None,
            data_dir: None,
            asset_a: AssetConfig::new("USDC"),
            asset_b: AssetConfig::new("ZAMA"),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `~/.config/cswap/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| anyhow!("could not find config directory"))?;
        Ok(config_dir.join("cswap").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: ClientConfig =
            toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// load `path` (or the default path); a missing file yields defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml).with_context(|| format!("writing config {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            return Err(anyhow!("refresh_interval_secs must be positive"));
        }
        if self.disclosure_days == 0 || self.disclosure_days > cswap_disclosure::MAX_DURATION_DAYS {
            return Err(anyhow!(
                "disclosure_days must be within 1..={}",
                cswap_disclosure::MAX_DURATION_DAYS
            ));
        }
        if self.operator_days == 0 {
            return Err(anyhow!("operator_days must be positive"));
        }
        if self.asset_a.symbol.eq_ignore_ascii_case(&self.asset_b.symbol) {
            return Err(anyhow!("pool assets must differ"));
        }
        Ok(())
    }

    /// devnet snapshot directory
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(d) => Ok(d.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or_else(|| anyhow!("could not find data directory"))?;
                Ok(data_dir.join("cswap"))
            }
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn operator_lifetime_secs(&self) -> u64 {
        self.operator_days as u64 * 86_400
    }

    pub fn pair(&self) -> AssetPair {
        AssetPair::new(self.asset_a.address(), self.asset_b.address())
    }

    pub fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            self.gateway.name.clone(),
            self.gateway.version.clone(),
            self.chain_id,
            Address::derive(self.gateway.verifying_contract.as_bytes()),
        )
    }

    /// asset config by symbol, case-insensitive
    pub fn asset(&self, symbol: &str) -> Option<(Side, &AssetConfig)> {
        if self.asset_a.symbol.eq_ignore_ascii_case(symbol) {
            Some((Side::A, &self.asset_a))
        } else if self.asset_b.symbol.eq_ignore_ascii_case(symbol) {
            Some((Side::B, &self.asset_b))
        } else {
            None
        }
    }

    pub fn asset_config(&self, side: Side) -> &AssetConfig {
        match side {
            Side::A => &self.asset_a,
            Side::B => &self.asset_b,
        }
    }
}

/// which asset of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn address(&self, pair: &AssetPair) -> Address {
        match self {
            Side::A => pair.asset_a,
            Side::B => pair.asset_b,
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}
