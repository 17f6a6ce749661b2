use alloy::primitives::U256;
use fastnum::{
    bint,
    decimal::{Context, Decimal, RoundingMode, UnsignedDecimal},
};

/// Number of fractional digits used by the protocol for stablecoin amounts
/// and leverage, and by tokens that do not declare otherwise.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Converter {
    decimals: i32,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(DEFAULT_DECIMALS)
    }
}

impl Converter {
    pub const fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    /// Fixed-point representation of one whole unit, `10^decimals`.
    pub fn one(&self) -> U256 {
        U256::from(10u64).pow(U256::from(self.decimals as u64))
    }

    /// Decimal value of the fixed-point integer, or `None` if it does not
    /// fit into the decimal width.
    pub fn from_unsigned<const N: usize>(&self, value: U256) -> Option<UnsignedDecimal<N>> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice())?;
        Some(UnsignedDecimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            Context::default().with_rounding_mode(RoundingMode::Floor),
        ))
    }

    /// Exact fixed-point representation of the decimal, or `None` if it
    /// has more fractional digits than `decimals` or does not fit into
    /// [`U256`].
    pub fn to_unsigned<const N: usize>(&self, value: UnsignedDecimal<N>) -> Option<U256> {
        self.scale_exact(
            U256::from_le_slice(value.digits().to_radix_le(256).as_slice()),
            value.fractional_digits_count(),
        )
    }

    /// Exact fixed-point magnitude of a signed decimal, the sign is dropped.
    pub fn to_unsigned_abs<const N: usize>(&self, value: Decimal<N>) -> Option<U256> {
        self.scale_exact(
            U256::from_le_slice(value.digits().to_radix_le(256).as_slice()),
            value.fractional_digits_count(),
        )
    }

    /// Move `digits * 10^-scale` to `decimals` fractional digits without
    /// rounding.
    fn scale_exact(&self, digits: U256, scale: i16) -> Option<U256> {
        let shift = self.decimals - i32::from(scale);
        let factor = U256::from(10u64).checked_pow(U256::from(shift.unsigned_abs()))?;
        if shift >= 0 {
            digits.checked_mul(factor)
        } else if (digits % factor).is_zero() {
            Some(digits / factor)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use fastnum::{dec128, udec128};

    use super::*;

    #[test]
    fn test_numeric_converter_from_unsigned() {
        assert_eq!(
            Converter::new(0).from_unsigned::<2>(U256::from(1234567890)),
            Some(udec128!(1234567890))
        );
        assert_eq!(
            Converter::new(6).from_unsigned::<2>(U256::from(1234567890)),
            Some(udec128!(1234.56789))
        );
        assert_eq!(
            Converter::new(18).from_unsigned::<2>(U256::from(1_500_000_000_000_000_000u64)),
            Some(udec128!(1.5))
        );
        assert_eq!(Converter::new(18).from_unsigned::<2>(U256::MAX), None);
    }

    #[test]
    fn test_numeric_converter_to_unsigned() {
        assert_eq!(
            Converter::new(0).to_unsigned(udec128!(1234567890)),
            Some(U256::from(1234567890))
        );
        assert_eq!(
            Converter::new(6).to_unsigned(udec128!(1234.56789)),
            Some(U256::from(1234567890))
        );
        assert_eq!(
            Converter::default().to_unsigned(udec128!(200)),
            Some(U256::from(200u64) * U256::from(10u64).pow(U256::from(18)))
        );
        assert_eq!(
            Converter::new(2).to_unsigned(udec128!(1.500)),
            Some(U256::from(150))
        );
    }

    #[test]
    fn test_numeric_converter_rejects_excess_fractional_digits() {
        assert_eq!(Converter::new(6).to_unsigned(udec128!(1.2345678)), None);
        assert_eq!(Converter::new(6).to_unsigned_abs(dec128!(0.0000004)), None);
        assert_eq!(Converter::new(6).to_unsigned_abs(dec128!(-0.0000009)), None);
        assert_eq!(Converter::new(0).to_unsigned(udec128!(0.5)), None);
    }

    #[test]
    fn test_numeric_converter_keeps_large_values_exact() {
        assert_eq!(
            Converter::default().to_unsigned(udec128!(1000000000000000000000)),
            Some(U256::from(10u64).pow(U256::from(39)))
        );
        assert_eq!(
            Converter::default().to_unsigned_abs(dec128!(-123456789012345678901.5)),
            Some(
                U256::from(1234567890123456789015u128)
                    * U256::from(10u64).pow(U256::from(17))
            )
        );
    }

    #[test]
    fn test_numeric_converter_overflow() {
        assert_eq!(Converter::new(255).to_unsigned(udec128!(1)), None);
        assert_eq!(Converter::default().to_unsigned(udec128!(1e60)), None);
        assert_eq!(Converter::default().to_unsigned_abs(dec128!(-1e60)), None);
    }

    #[test]
    fn test_numeric_converter_to_unsigned_abs() {
        assert_eq!(
            Converter::new(6).to_unsigned_abs(dec128!(-1234.56789)),
            Some(U256::from(1234567890))
        );
        assert_eq!(
            Converter::new(6).to_unsigned_abs(dec128!(1234.56789)),
            Some(U256::from(1234567890))
        );
        assert_eq!(
            Converter::new(6).to_unsigned_abs(dec128!(0)),
            Some(U256::ZERO)
        );
    }

    #[test]
    fn test_numeric_converter_one() {
        assert_eq!(Converter::new(6).one(), U256::from(1_000_000));
        assert_eq!(
            Converter::default().one(),
            U256::from(1_000_000_000_000_000_000u64)
        );
    }
}
