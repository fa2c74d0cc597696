//! constant-product pricing and liquidity-share arithmetic
//!
//! all functions are pure and round down, so rounding dust always stays
//! in the pool. products of two u64 values fit u128; anything wider goes
//! through [`BigUint`] and fails with [`PoolError::ArithmeticOverflow`]
//! only if the final result does not fit.

use num_bigint::BigUint;

use crate::{PoolError, Result};

/// fee retained by the pool: 0.3%
pub const FEE_NUMERATOR: u64 = 997;
pub const FEE_DENOMINATOR: u64 = 1000;

/// basis points in one whole
pub const BPS: u128 = 10_000;

/// floor(sqrt(n))
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    // 2^ceil(bits/2) is always >= sqrt(n)
    let bits = 128 - n.leading_zeros();
    let mut x: u128 = 1 << ((bits + 1) / 2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// floor(a * b / d)
pub fn mul_div(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(PoolError::ArithmeticOverflow);
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / d);
    }
    let q = BigUint::from(a) * BigUint::from(b) / BigUint::from(d);
    u128::try_from(q).map_err(|_| PoolError::ArithmeticOverflow)
}

/// ceil(a * b / d)
pub fn mul_div_up(a: u128, b: u128, d: u128) -> Result<u128> {
    if d == 0 {
        return Err(PoolError::ArithmeticOverflow);
    }
    let product = BigUint::from(a) * BigUint::from(b);
    let q = (product + BigUint::from(d - 1)) / BigUint::from(d);
    u128::try_from(q).map_err(|_| PoolError::ArithmeticOverflow)
}

/// input that actually prices the trade after the pool fee
pub fn amount_in_after_fee(amount_in: u64) -> u64 {
    // < amount_in, always fits
    (amount_in as u128 * FEE_NUMERATOR as u128 / FEE_DENOMINATOR as u128) as u64
}

/// output of selling `amount_in` into reserves `(reserve_in, reserve_out)`
///
/// `reserve_out * in' / (reserve_in + in')` with `in'` the fee-adjusted
/// input. result is strictly below `reserve_out`.
pub fn swap_output(amount_in: u64, reserve_in: u64, reserve_out: u64) -> Result<u64> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(PoolError::InsufficientLiquidity);
    }
    let after_fee = amount_in_after_fee(amount_in) as u128;
    let numerator = reserve_out as u128 * after_fee;
    let denominator = reserve_in as u128 + after_fee;
    Ok((numerator / denominator) as u64)
}

/// shares minted for depositing `(amount_a, amount_b)`
///
/// first deposit mints `isqrt(a * b)`, later ones the smaller of the two
/// proportional claims.
pub fn liquidity_to_mint(
    amount_a: u64,
    amount_b: u64,
    reserve_a: u64,
    reserve_b: u64,
    supply: u128,
) -> Result<u128> {
    if supply == 0 {
        return Ok(isqrt(amount_a as u128 * amount_b as u128));
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(PoolError::InsufficientLiquidity);
    }
    let by_a = mul_div(amount_a as u128, supply, reserve_a as u128)?;
    let by_b = mul_div(amount_b as u128, supply, reserve_b as u128)?;
    Ok(by_a.min(by_b))
}

/// assets returned for burning `shares`
pub fn liquidity_to_burn(
    shares: u128,
    reserve_a: u64,
    reserve_b: u64,
    supply: u128,
) -> Result<(u64, u64)> {
    if supply == 0 {
        return Err(PoolError::InsufficientLiquidity);
    }
    let a = mul_div(shares, reserve_a as u128, supply)?;
    let b = mul_div(shares, reserve_b as u128, supply)?;
    let a = u64::try_from(a).map_err(|_| PoolError::ArithmeticOverflow)?;
    let b = u64::try_from(b).map_err(|_| PoolError::ArithmeticOverflow)?;
    Ok((a, b))
}

/// how far the execution price falls short of the spot price, in bps
///
/// includes the fee, so a non-trivial trade is never below 30 bps.
pub fn price_impact_bps(amount_in: u64, amount_out: u64, reserve_in: u64, reserve_out: u64) -> u32 {
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
        return 0;
    }
    let realized = amount_out as u128 * reserve_in as u128;
    let ideal = amount_in as u128 * reserve_out as u128;
    let ratio = mul_div(realized, BPS, ideal).unwrap_or(BPS);
    BPS.saturating_sub(ratio) as u32
}
