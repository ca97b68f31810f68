//! Fixed-point scalar arithmetic over arbitrary-precision integers.
//!
//! Every fractional quantity in the engine (scores, edge weights, degrees,
//! the damping factor, the convergence threshold) is an unsigned big integer
//! denoting `value * 10^DECIMALS`. Signed values appear only at the public
//! boundary, as link weights. Operations are exact; division truncates
//! towards zero.

use num_bigint::{BigInt, BigUint};

/// Decimal precision of the fixed-point representation.
pub const DECIMALS: u32 = 18;

/// Cap on the attenuation multiple applied to negatively ranked nodes,
/// as a plain integer.
pub const MAX_NEG_OFFSET: u64 = 10;

/// 1.0 at the fixed-point scale: `10^DECIMALS`.
pub fn precision() -> BigUint {
    BigUint::from(10u32).pow(DECIMALS)
}

/// An unsigned integer value scaled to fixed point.
pub fn scaled(value: u64) -> BigUint {
    BigUint::from(value) * precision()
}

/// A signed integer value scaled to fixed point (the public link-weight
/// form).
pub fn scaled_signed(value: i64) -> BigInt {
    BigInt::from(value) * BigInt::from(precision())
}

/// Multiply, then divide, truncating towards zero.
///
/// The order is load-bearing: re-associating the product and the quotient
/// changes truncation and with it cross-platform reproducibility. Every
/// scaling site in the engine goes through this helper (or spells out the
/// same order inline where the reference computation demands a different
/// grouping).
pub fn mul_div(a: &BigUint, b: &BigUint, divisor: &BigUint) -> BigUint {
    a * b / divisor
}

/// Subtraction that treats underflow as a fatal invariant break.
///
/// Under the documented graph invariants no subtraction in the engine can
/// go negative; if one does, the input was corrupted and the computation
/// aborts with a diagnostic.
#[track_caller]
pub fn checked_sub(minuend: &BigUint, subtrahend: &BigUint) -> BigUint {
    if subtrahend > minuend {
        panic!("fixed-point underflow: {minuend} - {subtrahend}");
    }
    minuend - subtrahend
}

/// `|a - b|`.
pub fn abs_diff(a: &BigUint, b: &BigUint) -> BigUint {
    if a > b {
        a - b
    } else {
        b - a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_scale() {
        assert_eq!(precision().to_string(), "1000000000000000000");
        assert_eq!(scaled(3), BigUint::from(3u32) * precision());
    }

    #[test]
    fn test_scaled_signed_keeps_sign() {
        assert_eq!(scaled_signed(2), BigInt::from(precision()) * 2);
        assert_eq!(scaled_signed(-2), BigInt::from(precision()) * -2);
    }

    #[test]
    fn test_mul_div_truncates_towards_zero() {
        // 7 * 3 / 4 = 21 / 4 = 5 (exact value 5.25)
        let result = mul_div(
            &BigUint::from(7u32),
            &BigUint::from(3u32),
            &BigUint::from(4u32),
        );
        assert_eq!(result, BigUint::from(5u32));
    }

    #[test]
    fn test_mul_div_keeps_scale() {
        // 0.5 * 0.5 at scale = 0.25 at scale
        let half = precision() / 2u32;
        assert_eq!(mul_div(&half, &half, &precision()), precision() / 4u32);
    }

    #[test]
    fn test_checked_sub() {
        let five = BigUint::from(5u32);
        let two = BigUint::from(2u32);
        assert_eq!(checked_sub(&five, &two), BigUint::from(3u32));
        assert_eq!(checked_sub(&five, &five), BigUint::from(0u32));
    }

    #[test]
    #[should_panic(expected = "fixed-point underflow")]
    fn test_checked_sub_underflow_is_fatal() {
        checked_sub(&BigUint::from(2u32), &BigUint::from(5u32));
    }

    #[test]
    fn test_abs_diff_is_symmetric() {
        let a = BigUint::from(9u32);
        let b = BigUint::from(4u32);
        assert_eq!(abs_diff(&a, &b), BigUint::from(5u32));
        assert_eq!(abs_diff(&b, &a), BigUint::from(5u32));
    }
}
