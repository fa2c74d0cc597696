//! swap direction, quotes and operation receipts

use cswap_ledger::{Address, AssetPair};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// sell asset A, receive asset B
    AToB,
    /// sell asset B, receive asset A
    BToA,
}

impl SwapDirection {
    pub fn input_asset(&self, pair: &AssetPair) -> Address {
        match self {
            SwapDirection::AToB => pair.asset_a,
            SwapDirection::BToA => pair.asset_b,
        }
    }

    pub fn output_asset(&self, pair: &AssetPair) -> Address {
        match self {
            SwapDirection::AToB => pair.asset_b,
            SwapDirection::BToA => pair.asset_a,
        }
    }

    /// direction that sells `asset`, if it belongs to the pair
    pub fn selling(pair: &AssetPair, asset: &Address) -> Option<Self> {
        if *asset == pair.asset_a {
            Some(SwapDirection::AToB)
        } else if *asset == pair.asset_b {
            Some(SwapDirection::BToA)
        } else {
            None
        }
    }

    /// order `(reserve_a, reserve_b)` as `(reserve_in, reserve_out)`
    pub fn orient(&self, reserve_a: u64, reserve_b: u64) -> (u64, u64) {
        match self {
            SwapDirection::AToB => (reserve_a, reserve_b),
            SwapDirection::BToA => (reserve_b, reserve_a),
        }
    }
}

/// read-only pricing of a swap against current reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub direction: SwapDirection,
    pub amount_in: u64,
    pub amount_in_after_fee: u64,
    pub amount_out: u64,
    pub reserve_in: u64,
    pub reserve_out: u64,
    /// execution price shortfall vs spot, fee included
    pub price_impact_bps: u32,
}

impl SwapQuote {
    /// smallest acceptable output for a slippage tolerance in bps
    pub fn min_amount_out(&self, slippage_bps: u32) -> u64 {
        let keep = 10_000u128.saturating_sub(slippage_bps as u128);
        (self.amount_out as u128 * keep / 10_000) as u64
    }
}

/// sizing helper for a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityQuote {
    /// shares the deposit would mint
    pub shares: u128,
    /// amount of A actually backing those shares at the current ratio
    pub proportional_a: u64,
    /// amount of B actually backing those shares at the current ratio
    pub proportional_b: u64,
}

impl LiquidityQuote {
    /// what the pool absorbs beyond the proportional amounts
    pub fn excess(&self, amount_a: u64, amount_b: u64) -> (u64, u64) {
        (
            amount_a.saturating_sub(self.proportional_a),
            amount_b.saturating_sub(self.proportional_b),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub direction: SwapDirection,
    pub amount_in: u64,
    pub amount_out: u64,
    /// `(reserve_a, reserve_b)` after the swap
    pub reserves: (u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityReceipt {
    pub amount_a: u64,
    pub amount_b: u64,
    pub shares_minted: u128,
    pub reserves: (u64, u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityReceipt {
    pub shares_burned: u128,
    pub amount_a: u64,
    pub amount_b: u64,
    pub reserves: (u64, u64),
}
