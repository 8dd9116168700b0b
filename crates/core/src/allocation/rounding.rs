//! Rounding of allocated amounts.

use rust_decimal::{Decimal, RoundingStrategy};

use super::types::RoundingMethod;

impl RoundingMethod {
    /// Rounds `amount` to `precision` fractional digits.
    ///
    /// `Nearest` rounds half away from zero, `Up` toward positive infinity and
    /// `Down` toward negative infinity. `None` returns the amount unchanged.
    #[must_use]
    pub fn apply(self, amount: Decimal, precision: u32) -> Decimal {
        let strategy = match self {
            Self::Nearest => RoundingStrategy::MidpointAwayFromZero,
            Self::Up => RoundingStrategy::ToPositiveInfinity,
            Self::Down => RoundingStrategy::ToNegativeInfinity,
            Self::None => return amount,
        };
        amount.round_dp_with_strategy(precision, strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(RoundingMethod::Nearest, dec!(10.005), dec!(10.01))]
    #[case(RoundingMethod::Nearest, dec!(10.004), dec!(10.00))]
    #[case(RoundingMethod::Nearest, dec!(-10.005), dec!(-10.01))]
    #[case(RoundingMethod::Up, dec!(10.001), dec!(10.01))]
    #[case(RoundingMethod::Up, dec!(-10.009), dec!(-10.00))]
    #[case(RoundingMethod::Down, dec!(10.009), dec!(10.00))]
    #[case(RoundingMethod::Down, dec!(-10.001), dec!(-10.01))]
    #[case(RoundingMethod::None, dec!(10.123456), dec!(10.123456))]
    fn test_rounding_methods(
        #[case] method: RoundingMethod,
        #[case] amount: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(method.apply(amount, 2), expected);
    }

    #[test]
    fn test_zero_precision() {
        assert_eq!(RoundingMethod::Nearest.apply(dec!(2.5), 0), dec!(3));
        assert_eq!(RoundingMethod::Down.apply(dec!(2.9), 0), dec!(2));
    }

    #[test]
    fn test_already_at_precision_is_unchanged() {
        assert_eq!(RoundingMethod::Up.apply(dec!(5000.00), 2), dec!(5000));
    }
}
