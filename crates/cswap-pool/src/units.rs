//! decimal amounts ⇄ base units

use thiserror::Error;

/// base-unit decimals of both pool assets
pub const ASSET_DECIMALS: u32 = 6;

/// base-unit decimals of liquidity shares
pub const SHARE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,

    #[error("invalid amount {0:?}")]
    Invalid(String),

    #[error("{given} decimals given, at most {max} allowed")]
    TooPrecise { given: usize, max: u32 },

    #[error("amount out of range")]
    Overflow,
}

/// parse `"1.5"` with 6 decimals into `1_500_000`
pub fn parse_units(s: &str, decimals: u32) -> Result<u128, UnitsError> {
    let s = s.trim().replace('_', "");
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s.as_str(), ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::Invalid(s.clone()));
    }
    let digits = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if !digits(whole) || !digits(frac) {
        return Err(UnitsError::Invalid(s.clone()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooPrecise {
            given: frac.len(),
            max: decimals,
        });
    }

    let scale = 10u128.checked_pow(decimals).ok_or(UnitsError::Overflow)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| UnitsError::Overflow)?
    };
    let frac_value: u128 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = decimals as usize);
        padded.parse().map_err(|_| UnitsError::Overflow)?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(frac_value))
        .ok_or(UnitsError::Overflow)
}

/// render base units as a decimal string, trailing zeros trimmed
pub fn format_units(value: u128, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = match 10u128.checked_pow(decimals) {
        Some(s) => s,
        None => return value.to_string(),
    };
    let whole = value / scale;
    let frac = value % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
