//! pool aggregate
//!
//! reserves, share supply and per-account shares for one asset pair.
//! every mutation is split into a fallible `plan_*` that validates and
//! prices against the current state and an infallible `apply_*` that the
//! engine calls only after the ledger batch landed.

use std::collections::BTreeMap;

use cswap_ledger::Address;
use serde::{Deserialize, Serialize};

use crate::math;
use crate::swap::{LiquidityQuote, SwapDirection, SwapQuote};
use crate::{PoolError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    reserve_a: u64,
    reserve_b: u64,
    total_supply: u128,
    balances: BTreeMap<Address, u128>,
}

/// validated burn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BurnPlan {
    pub shares: u128,
    pub amount_a: u64,
    pub amount_b: u64,
}

impl Pool {
    /// empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// `(reserve_a, reserve_b)`
    pub fn reserves(&self) -> (u64, u64) {
        (self.reserve_a, self.reserve_b)
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn liquidity_of(&self, account: &Address) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// accounts holding shares, in address order
    pub fn providers(&self) -> impl Iterator<Item = (&Address, &u128)> {
        self.balances.iter()
    }

    /// true before the seeding deposit and after every share was burned
    pub fn is_empty(&self) -> bool {
        self.total_supply == 0
    }

    /// `reserve_a > 0 ⇔ reserve_b > 0` and shares sum to supply
    pub fn is_consistent(&self) -> bool {
        let sum: Option<u128> = self
            .balances
            .values()
            .try_fold(0u128, |acc, s| acc.checked_add(*s));
        (self.reserve_a > 0) == (self.reserve_b > 0) && sum == Some(self.total_supply)
    }

    /// price a swap; an output of zero is rejected
    pub fn quote_swap(&self, direction: SwapDirection, amount_in: u64) -> Result<SwapQuote> {
        let quote = self.price(direction, amount_in)?;
        if quote.amount_out == 0 {
            return Err(PoolError::InsufficientOutputAmount);
        }
        Ok(quote)
    }

    fn price(&self, direction: SwapDirection, amount_in: u64) -> Result<SwapQuote> {
        if amount_in == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let (reserve_in, reserve_out) = direction.orient(self.reserve_a, self.reserve_b);
        if reserve_in == 0 || reserve_out == 0 {
            return Err(PoolError::InsufficientLiquidity);
        }
        reserve_in
            .checked_add(amount_in)
            .ok_or(PoolError::ArithmeticOverflow)?;

        let amount_out = math::swap_output(amount_in, reserve_in, reserve_out)?;

        Ok(SwapQuote {
            direction,
            amount_in,
            amount_in_after_fee: math::amount_in_after_fee(amount_in),
            amount_out,
            reserve_in,
            reserve_out,
            price_impact_bps: math::price_impact_bps(amount_in, amount_out, reserve_in, reserve_out),
        })
    }

    pub(crate) fn plan_swap(
        &self,
        direction: SwapDirection,
        amount_in: u64,
        min_amount_out: u64,
    ) -> Result<SwapQuote> {
        let quote = self.price(direction, amount_in)?;
        if quote.amount_out < min_amount_out {
            return Err(PoolError::SlippageExceeded {
                amount_out: quote.amount_out,
                min_amount_out,
            });
        }
        // only reachable with min_amount_out == 0
        if quote.amount_out == 0 {
            return Err(PoolError::InsufficientOutputAmount);
        }
        Ok(quote)
    }

    pub(crate) fn apply_swap(&mut self, quote: &SwapQuote) {
        match quote.direction {
            SwapDirection::AToB => {
                self.reserve_a += quote.amount_in;
                self.reserve_b -= quote.amount_out;
            }
            SwapDirection::BToA => {
                self.reserve_b += quote.amount_in;
                self.reserve_a -= quote.amount_out;
            }
        }
    }

    /// shares minted for a deposit, plus the amounts that actually back them
    ///
    /// anything beyond the proportional amounts is absorbed by the pool.
    pub fn quote_liquidity(&self, amount_a: u64, amount_b: u64) -> Result<LiquidityQuote> {
        if amount_a == 0 || amount_b == 0 {
            return Err(PoolError::ZeroAmount);
        }
        self.reserve_a
            .checked_add(amount_a)
            .ok_or(PoolError::ArithmeticOverflow)?;
        self.reserve_b
            .checked_add(amount_b)
            .ok_or(PoolError::ArithmeticOverflow)?;

        let shares = math::liquidity_to_mint(
            amount_a,
            amount_b,
            self.reserve_a,
            self.reserve_b,
            self.total_supply,
        )?;
        if shares == 0 {
            return Err(PoolError::InsufficientLiquidityMinted);
        }
        self.total_supply
            .checked_add(shares)
            .ok_or(PoolError::ArithmeticOverflow)?;

        let (proportional_a, proportional_b) = if self.total_supply == 0 {
            (amount_a, amount_b)
        } else {
            let a = math::mul_div_up(shares, self.reserve_a as u128, self.total_supply)?;
            let b = math::mul_div_up(shares, self.reserve_b as u128, self.total_supply)?;
            (
                a.min(amount_a as u128) as u64,
                b.min(amount_b as u128) as u64,
            )
        };

        Ok(LiquidityQuote {
            shares,
            proportional_a,
            proportional_b,
        })
    }

    pub(crate) fn apply_add(&mut self, provider: Address, amount_a: u64, amount_b: u64, shares: u128) {
        self.reserve_a += amount_a;
        self.reserve_b += amount_b;
        self.total_supply += shares;
        *self.balances.entry(provider).or_insert(0) += shares;
    }

    pub(crate) fn plan_remove(&self, provider: &Address, shares: u128) -> Result<BurnPlan> {
        if shares == 0 {
            return Err(PoolError::ZeroAmount);
        }
        let available = self.liquidity_of(provider);
        if shares > available {
            return Err(PoolError::InsufficientShares {
                requested: shares,
                available,
            });
        }

        let (amount_a, amount_b) =
            math::liquidity_to_burn(shares, self.reserve_a, self.reserve_b, self.total_supply)?;
        if amount_a == 0 || amount_b == 0 {
            return Err(PoolError::InsufficientLiquidityBurned);
        }

        Ok(BurnPlan {
            shares,
            amount_a,
            amount_b,
        })
    }

    pub(crate) fn apply_remove(&mut self, provider: &Address, plan: &BurnPlan) {
        self.reserve_a -= plan.amount_a;
        self.reserve_b -= plan.amount_b;
        self.total_supply -= plan.shares;
        if let Some(held) = self.balances.get_mut(provider) {
            *held -= plan.shares;
            if *held == 0 {
                self.balances.remove(provider);
            }
        }
    }
}
