//! pool engine
//!
//! owns the [`Pool`] aggregate for one asset pair and drives the ledger.
//! each mutation holds the engine lock across planning, the atomic ledger
//! batch and the state commit; state changes only after the batch landed.

use std::sync::Arc;

use cswap_ledger::{Address, AssetPair, EncryptedLedger, Transfer};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::state::Pool;
use crate::swap::{
    AddLiquidityReceipt, LiquidityQuote, RemoveLiquidityReceipt, SwapDirection, SwapQuote,
    SwapReceipt,
};
use crate::{PoolError, Result};

pub struct PoolEngine<L: EncryptedLedger + ?Sized> {
    pair: AssetPair,
    account: Address,
    ledger: Arc<L>,
    state: Mutex<Pool>,
}

impl<L: EncryptedLedger + ?Sized> PoolEngine<L> {
    /// fresh, empty pool for `pair`
    pub fn new(pair: AssetPair, ledger: Arc<L>) -> Self {
        Self::with_state(pair, ledger, Pool::new())
    }

    /// engine over an existing aggregate, e.g. restored from a snapshot
    pub fn with_state(pair: AssetPair, ledger: Arc<L>, pool: Pool) -> Self {
        Self {
            account: pair.pool_address(),
            pair,
            ledger,
            state: Mutex::new(pool),
        }
    }

    pub fn pair(&self) -> AssetPair {
        self.pair
    }

    /// ledger account holding the reserves, the operator users authorize
    pub fn pool_account(&self) -> Address {
        self.account
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    /// `(reserve_a, reserve_b)`
    pub fn reserves(&self) -> (u64, u64) {
        self.state.lock().reserves()
    }

    pub fn total_liquidity(&self) -> u128 {
        self.state.lock().total_supply()
    }

    pub fn liquidity_of(&self, account: &Address) -> u128 {
        self.state.lock().liquidity_of(account)
    }

    /// consistent copy of the whole aggregate
    pub fn snapshot(&self) -> Pool {
        self.state.lock().clone()
    }

    pub fn quote_swap(&self, direction: SwapDirection, amount_in: u64) -> Result<SwapQuote> {
        self.state.lock().quote_swap(direction, amount_in)
    }

    pub fn quote_liquidity(&self, amount_a: u64, amount_b: u64) -> Result<LiquidityQuote> {
        self.state.lock().quote_liquidity(amount_a, amount_b)
    }

    /// deposit both assets and mint shares to `provider`
    ///
    /// needs the pool authorized as operator on both assets. amounts beyond
    /// the current ratio are kept by the pool, see [`Self::quote_liquidity`].
    pub fn add_liquidity(
        &self,
        provider: &Address,
        amount_a: u64,
        amount_b: u64,
    ) -> Result<AddLiquidityReceipt> {
        let mut state = self.state.lock();
        let quote = state.quote_liquidity(amount_a, amount_b)?;

        self.execute(&[
            Transfer::new(*provider, self.account, self.pair.asset_a, amount_a),
            Transfer::new(*provider, self.account, self.pair.asset_b, amount_b),
        ])?;

        let seeding = state.is_empty();
        state.apply_add(*provider, amount_a, amount_b, quote.shares);
        debug_assert!(state.is_consistent());

        if seeding {
            info!(
                "pool seeded by {} with ({}, {}), {} shares",
                provider, amount_a, amount_b, quote.shares
            );
        } else {
            info!(
                "{} added ({}, {}) for {} shares",
                provider, amount_a, amount_b, quote.shares
            );
        }

        Ok(AddLiquidityReceipt {
            amount_a,
            amount_b,
            shares_minted: quote.shares,
            reserves: state.reserves(),
        })
    }

    /// burn `shares` of `provider` for the proportional reserves
    pub fn remove_liquidity(&self, provider: &Address, shares: u128) -> Result<RemoveLiquidityReceipt> {
        let mut state = self.state.lock();
        let plan = state.plan_remove(provider, shares)?;

        self.execute(&[
            Transfer::new(self.account, *provider, self.pair.asset_a, plan.amount_a),
            Transfer::new(self.account, *provider, self.pair.asset_b, plan.amount_b),
        ])?;

        state.apply_remove(provider, &plan);
        debug_assert!(state.is_consistent());
        info!(
            "{} burned {} shares for ({}, {})",
            provider, shares, plan.amount_a, plan.amount_b
        );

        Ok(RemoveLiquidityReceipt {
            shares_burned: shares,
            amount_a: plan.amount_a,
            amount_b: plan.amount_b,
            reserves: state.reserves(),
        })
    }

    pub fn swap_exact_a_for_b(
        &self,
        trader: &Address,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapReceipt> {
        self.swap_exact(trader, SwapDirection::AToB, amount_in, min_amount_out)
    }

    pub fn swap_exact_b_for_a(
        &self,
        trader: &Address,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapReceipt> {
        self.swap_exact(trader, SwapDirection::BToA, amount_in, min_amount_out)
    }

    fn swap_exact(
        &self,
        trader: &Address,
        direction: SwapDirection,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapReceipt> {
        let mut state = self.state.lock();
        let quote = state.plan_swap(direction, amount_in, min_amount_out)?;

        self.execute(&[
            Transfer::new(*trader, self.account, direction.input_asset(&self.pair), amount_in),
            Transfer::new(
                self.account,
                *trader,
                direction.output_asset(&self.pair),
                quote.amount_out,
            ),
        ])?;

        state.apply_swap(&quote);
        debug_assert!(state.is_consistent());
        info!(
            "{} swapped {} for {} ({:?}, impact {} bps)",
            trader, amount_in, quote.amount_out, direction, quote.price_impact_bps
        );

        Ok(SwapReceipt {
            direction,
            amount_in,
            amount_out: quote.amount_out,
            reserves: state.reserves(),
        })
    }

    /// run the transfer pair as one ledger batch initiated by the pool
    fn execute(&self, transfers: &[Transfer]) -> Result<()> {
        match self.ledger.execute_batch(&self.account, transfers) {
            Ok(receipts) => {
                debug!("ledger batch of {} landed", receipts.len());
                Ok(())
            }
            Err(e) => {
                let err = PoolError::from(e);
                warn!("ledger rejected pool batch: {}", err);
                Err(err)
            }
        }
    }
}
