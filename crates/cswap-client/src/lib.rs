//! # cswap-client
//!
//! thin orchestration over the pool engine and the disclosure protocol.
//!
//! ```text
//! intent ──► Orchestrator ──► PoolEngine ──► EncryptedLedger
//!                 │
//!                 └─────────► DisclosureClient ──► decryption service
//! ```
//!
//! - [`config`]: toml configuration with defaults
//! - [`devnet`]: software ledger + pool + service, persisted as json
//! - [`orchestrator`]: mint, enable pool, liquidity, swap, decrypt
//! - [`refresh`]: periodic pool view polling over a watch channel

pub mod config;
pub mod devnet;
pub mod orchestrator;
pub mod refresh;

pub use config::{AssetConfig, ClientConfig, GatewayConfig, Side};
pub use devnet::{dev_identity, Devnet, DevnetSnapshot};
pub use orchestrator::{AccountView, Orchestrator, PoolView};
pub use refresh::{spawn_poller, Poller, SnapshotSource, StateSource};
