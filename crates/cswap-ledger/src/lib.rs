//! # cswap-ledger
//!
//! the encrypted-ledger boundary that the swap pool and the disclosure
//! client talk to.
//!
//! the ledger owns every confidential balance. callers never see plaintext:
//! they get a [`BalanceHandle`] that changes identity whenever the underlying
//! ciphertext changes, and they move value with confidential transfers that
//! are gated by time-bounded operator delegation.
//!
//! ## architecture
//!
//! ```text
//!   owner ──authorize_operator(pool, expiry)──┐
//!                                             ▼
//!  ┌──────────┐  execute_batch   ┌─────────────────────────┐
//!  │   pool   │ ───────────────► │     EncryptedLedger     │
//!  │  engine  │                  │  (account, asset) → h   │
//!  └──────────┘                  │  h → sealed balance     │
//!                                │  operator grants        │
//!                                └────────────┬────────────┘
//!                                             │ HandleAccess::reveal
//!                                             ▼
//!                                    decryption service
//! ```
//!
//! implementations:
//! - software: in-memory, balances sealed with a ledger key. NOT SECURE,
//!   it stands in for the real encrypted coprocessor in tests and on devnet.

pub mod address;
pub mod clock;
pub mod error;
pub mod handle;
pub mod hex_serde;
pub mod ledger;
pub mod operator;
pub mod software;

pub use address::{Address, AssetPair};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, ErrorKind, Result};
pub use handle::BalanceHandle;
pub use ledger::{EncryptedLedger, HandleAccess, Transfer, TransferReceipt};
pub use operator::OperatorGrant;
pub use software::{LedgerSnapshot, SoftwareLedger};
