//! Fixed-point conversion.
//!
//! Every price and quantity on the wire is an unsigned integer holding the
//! decimal value multiplied by 10^8.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Number of implied decimal places on the wire.
pub const SCALE_DIGITS: u32 = 8;

/// 10^8, the wire multiplier.
pub const SCALE: u64 = 100_000_000;

/// Decode a wire integer into an exact decimal.
#[inline]
pub fn to_decimal(raw: u64) -> Decimal {
    Decimal::from_i128_with_scale(raw as i128, SCALE_DIGITS)
}

/// Encode a decimal back into wire units. `None` if negative, out of range,
/// or carrying more than eight decimal places.
pub fn from_decimal(value: Decimal) -> Option<u64> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let scaled = value.checked_mul(Decimal::from(SCALE))?;
    if scaled.fract() != Decimal::ZERO {
        return None;
    }
    scaled.to_u64()
}
