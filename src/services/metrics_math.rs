//! Fixed-point TVL and share-price math
//!
//! Pure functions over raw `uint256` vault state. Intermediate division
//! runs at bigdecimal's default precision (100 significant digits), then
//! the result is truncated toward zero to a fixed scale: 6 fractional
//! digits for TVL, 18 for share price. `total_supply == 0` is a defined
//! case (zero price), not an error.

use alloy::primitives::U256;
use bigdecimal::num_bigint::{BigInt, BigUint};
use bigdecimal::{BigDecimal, RoundingMode};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Fractional digits kept for TVL values
const TVL_SCALE: i64 = 6;

/// Fractional digits kept for share-price values
const SHARE_PRICE_SCALE: i64 = 18;

fn u256_to_bigdecimal(value: U256) -> BigDecimal {
    let bytes: [u8; 32] = value.to_be_bytes();
    BigDecimal::from(BigInt::from(BigUint::from_bytes_be(&bytes)))
}

/// TVL in human-readable asset units: `total_assets / 10^decimals`,
/// truncated to 6 fractional digits.
pub fn tvl_in_asset(total_assets: U256, decimals: u32) -> BigDecimal {
    let bytes: [u8; 32] = total_assets.to_be_bytes();
    let raw = BigInt::from(BigUint::from_bytes_be(&bytes));
    // 10^-decimals applied as a scale shift, so the division is exact
    BigDecimal::new(raw, i64::from(decimals)).with_scale_round(TVL_SCALE, RoundingMode::Down)
}

/// Price per share: `total_assets / total_supply`, truncated to 18
/// fractional digits; exactly 0 when the vault has no shares.
pub fn share_price(total_assets: U256, total_supply: U256) -> BigDecimal {
    if total_supply.is_zero() {
        return BigDecimal::from(0).with_scale(SHARE_PRICE_SCALE);
    }
    (u256_to_bigdecimal(total_assets) / u256_to_bigdecimal(total_supply))
        .with_scale_round(SHARE_PRICE_SCALE, RoundingMode::Down)
}

/// Narrow an arbitrary-precision value into the stored `Decimal` type.
///
/// Returns `None` when the value does not fit the storage precision
/// (a 96-bit mantissa); callers treat that as a per-unit failure.
pub fn to_stored_decimal(value: &BigDecimal) -> Option<Decimal> {
    Decimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_vector_exact_truncation() {
        // totalAssets = 1e9 raw at 6 decimals, totalSupply = 9e20
        let ta = U256::from(1_000_000_000u64);
        let ts = U256::from_str("900000000000000000000").unwrap();

        let tvl = tvl_in_asset(ta, 6);
        assert_eq!(tvl.to_string(), "1000.000000");

        // 1e9 / 9e20 = 1.111...e-12, truncated (not rounded) at 18 places
        let pps = share_price(ta, ts);
        assert_eq!(pps.to_string(), "0.000000000001111111");
    }

    #[test]
    fn test_zero_supply_is_zero_price() {
        let pps = share_price(U256::from(12_345u64), U256::ZERO);
        assert_eq!(pps, BigDecimal::from(0));
    }

    #[test]
    fn test_tvl_truncates_toward_zero() {
        // 1.9999999 asset units must not round up at 6 digits
        let tvl = tvl_in_asset(U256::from(19_999_999u64), 7);
        assert_eq!(tvl.to_string(), "1.999999");
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let ta = U256::from(777_777_777u64);
        let ts = U256::from(123_456_789u64);
        for _ in 0..5 {
            assert_eq!(tvl_in_asset(ta, 6), tvl_in_asset(ta, 6));
            assert_eq!(share_price(ta, ts), share_price(ta, ts));
        }
    }

    #[test]
    fn test_uint256_sized_inputs() {
        // Larger than any 96-bit mantissa: full uint256 range must not panic
        let huge = U256::MAX;
        let tvl = tvl_in_asset(huge, 18);
        assert!(tvl > BigDecimal::from(0));
        // ~1.157e77 / 1e18 has 59 integer digits; too wide to store
        assert!(to_stored_decimal(&tvl).is_none());
    }

    #[test]
    fn test_stored_decimal_roundtrip() {
        let pps = share_price(
            U256::from(1_000_000_000u64),
            U256::from_str("900000000000000000000").unwrap(),
        );
        let stored = to_stored_decimal(&pps).unwrap();
        assert_eq!(stored.to_string(), "0.000000000001111111");
    }
}
