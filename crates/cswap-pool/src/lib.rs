//! # cswap-pool
//!
//! constant-product pool for one confidential asset pair.
//!
//! reserves and share accounting are plaintext; custody is not. every
//! deposit, withdrawal and swap moves value as an atomic batch of
//! confidential transfers on the [`EncryptedLedger`](cswap_ledger::EncryptedLedger),
//! initiated by the pool's own ledger account. users authorize that account
//! as an operator on both assets first; the pool never checks delegation
//! itself, the ledger does.
//!
//! ## pricing
//!
//! ```text
//! in'  = in * 997 / 1000
//! out  = reserve_out * in' / (reserve_in + in')
//! ```
//!
//! first deposit mints `isqrt(a * b)` shares; later deposits mint
//! `min(a * S / reserve_a, b * S / reserve_b)` and the pool keeps any
//! excess. burns return `shares * reserve / S` of each asset. all rounding
//! is down.

pub mod engine;
pub mod error;
pub mod math;
pub mod state;
pub mod swap;
pub mod units;

pub use engine::PoolEngine;
pub use error::{ErrorKind, PoolError, Result};
pub use state::Pool;
pub use swap::{
    AddLiquidityReceipt, LiquidityQuote, RemoveLiquidityReceipt, SwapDirection, SwapQuote,
    SwapReceipt,
};
pub use units::{format_units, parse_units, UnitsError, ASSET_DECIMALS, SHARE_DECIMALS};
