//! Currency-precision helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount is a `rust_decimal::Decimal`.

use rust_decimal::Decimal;

/// Default tolerance for bank reconciliation (one hundredth of a currency unit).
pub const DEFAULT_BANK_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Returns true if `a` and `b` differ by at most `tolerance` (inclusive).
#[must_use]
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_tolerance_is_one_cent() {
        assert_eq!(DEFAULT_BANK_TOLERANCE, dec!(0.01));
    }

    #[rstest]
    #[case(dec!(100.00), dec!(100.00), true)]
    #[case(dec!(100.01), dec!(100.00), true)]
    #[case(dec!(99.99), dec!(100.00), true)]
    #[case(dec!(100.02), dec!(100.00), false)]
    #[case(dec!(105.00), dec!(100.00), false)]
    fn test_within_tolerance(#[case] a: Decimal, #[case] b: Decimal, #[case] expected: bool) {
        assert_eq!(within_tolerance(a, b, DEFAULT_BANK_TOLERANCE), expected);
    }
}
