use alloy::primitives::U256;
use alloy::primitives::utils::format_units;

/// Implied decimals of every on-chain amount.
pub const DECIMALS: u8 = 18;

/// Scale an on-chain amount down to token units.
///
/// The division by 10^18 happens on the exact decimal string so the only
/// rounding is the final cast to `f64`.
pub fn to_egld(value: U256) -> f64 {
    format_units(value, DECIMALS)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

/// Whole tokens as an on-chain amount (`n × 10^18`).
pub fn egld(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(DECIMALS))
}
