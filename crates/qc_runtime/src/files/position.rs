//! Conversions between calculator integers and native file positions.

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use qc_core::byteorder;

use crate::errors::FileError;

/// Widens a native offset through HALF words, low word first.
pub fn from_native(value: u64) -> BigInt {
    BigInt::from_slice(Sign::Plus, &byteorder::u64_to_halves(value))
}

/// Narrows to a native offset; values outside `i64` are rejected, never
/// truncated.
pub fn to_native(value: &BigInt) -> Result<i64, FileError> {
    value.to_i64().ok_or(FileError::PositionOutOfRange)
}

/// Narrows an absolute position, which must be non-negative.
pub fn to_absolute(value: &BigInt) -> Result<u64, FileError> {
    let offset = to_native(value)?;
    u64::try_from(offset).map_err(|_| FileError::NegativePosition)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_keeps_high_word() {
        let v = (7u64 << 32) | 9;
        assert_eq!(from_native(v), BigInt::from(v));
        assert_eq!(from_native(0), BigInt::from(0));
    }

    #[test]
    fn narrowing_rejects_out_of_range() {
        let big = BigInt::from(i64::MAX) + 1;
        assert!(matches!(to_native(&big), Err(FileError::PositionOutOfRange)));
        assert!(matches!(to_absolute(&BigInt::from(-1)), Err(FileError::NegativePosition)));
        assert_eq!(to_absolute(&BigInt::from(42)).unwrap(), 42);
    }
}
