//! Splitting 64-bit and floating point values into 32-bit wire halves, and joining them
//! back together.
//!
//! Every 64-bit quantity the codec touches (varint64, fixed64, double) travels as a
//! [`Split64`] so the varint loops can shuffle bits between two `u32`s directly. The
//! float helpers work on the host `f64` and produce canonical IEEE-754 bit patterns.

use crate::util::pow2;

/// A 64-bit bit pattern carried as two 32-bit halves, `hi * 2^32 + lo`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Split64 {
    pub lo: u32,
    pub hi: u32,
}

impl Split64 {
    pub const fn new(lo: u32, hi: u32) -> Self {
        Split64 { lo, hi }
    }

    /// Two's complement negation of the combined 64-bit value.
    #[must_use]
    pub const fn negate(self) -> Split64 {
        let lo = (!self.lo).wrapping_add(1);
        let hi = if lo == 0 {
            (!self.hi).wrapping_add(1)
        } else {
            !self.hi
        };
        Split64 { lo, hi }
    }

    /// Applies the zigzag transform, `n >= 0 ? 2n : -2n - 1`, on the halves.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub const fn zigzag_encode(self) -> Split64 {
        // All ones when negative, all zeros otherwise.
        let sign = ((self.hi as i32) >> 31) as u32;
        Split64 {
            lo: (self.lo << 1) ^ sign,
            hi: ((self.hi << 1) | (self.lo >> 31)) ^ sign,
        }
    }

    /// Inverse of [`Split64::zigzag_encode`].
    #[must_use]
    pub const fn zigzag_decode(self) -> Split64 {
        let sign = (self.lo & 1).wrapping_neg();
        Split64 {
            lo: ((self.lo >> 1) | (self.hi << 31)) ^ sign,
            hi: (self.hi >> 1) ^ sign,
        }
    }

    pub const fn is_zero(self) -> bool {
        self.lo == 0 && self.hi == 0
    }
}

/// Splits an unsigned 64-bit value.
#[allow(clippy::cast_possible_truncation)]
pub const fn split_uint64(value: u64) -> Split64 {
    Split64 {
        lo: value as u32,
        hi: (value >> 32) as u32,
    }
}

/// Splits a signed 64-bit value into its two's complement halves.
///
/// The magnitude is split first and negated on the halves, so `i64::MIN` (whose
/// magnitude is `2^63`) comes out as the correct pattern.
pub const fn split_int64(value: i64) -> Split64 {
    let magnitude = split_uint64(value.unsigned_abs());
    if value < 0 {
        magnitude.negate()
    } else {
        magnitude
    }
}

/// Splits a signed 64-bit value after applying the zigzag transform.
pub const fn split_zigzag64(value: i64) -> Split64 {
    split_int64(value).zigzag_encode()
}

pub const fn join_uint64(split: Split64) -> u64 {
    ((split.hi as u64) << 32) | split.lo as u64
}

#[allow(clippy::cast_possible_wrap)]
pub const fn join_int64(split: Split64) -> i64 {
    join_uint64(split) as i64
}

pub const fn join_zigzag64(split: Split64) -> i64 {
    join_int64(split.zigzag_decode())
}

#[allow(clippy::cast_sign_loss)]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[allow(clippy::cast_possible_wrap)]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

/// Canonical quiet NaN for `float` fields.
pub const FLOAT32_NAN_BITS: u32 = 0x7FC0_0000;
/// Canonical quiet NaN for `double` fields, as `(lo, hi)`.
pub const FLOAT64_NAN_BITS: Split64 = Split64::new(0, 0x7FF8_0000);

const FLOAT32_SIGN: u32 = 0x8000_0000;
const FLOAT32_INFINITY: u32 = 0x7F80_0000;
const FLOAT32_MANTISSA_MASK: u32 = 0x007F_FFFF;
/// Largest finite `f32`. Anything with a larger magnitude saturates to infinity.
const FLOAT32_MAX: f64 = f32::MAX as f64;
/// Smallest positive normal `f32`, `2^-126`.
const FLOAT32_MIN_NORMAL: f64 = f32::MIN_POSITIVE as f64;

/// Narrows a host number to the bit pattern of an IEEE-754 single, in the `lo` half.
///
/// Zero keeps its sign, NaN becomes [`FLOAT32_NAN_BITS`], magnitudes beyond the `f32`
/// range saturate to infinity. Subnormals are scaled by the fixed factor `2^149` instead
/// of going through the exponent. Rounding is half away from zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn split_float32(value: f64) -> Split64 {
    if value.is_nan() {
        return Split64::new(FLOAT32_NAN_BITS, 0);
    }

    let sign = if value.is_sign_negative() { FLOAT32_SIGN } else { 0 };
    let magnitude = value.abs();

    // Also covers `-0.0`, which only differs from `0.0` in the sign bit.
    if magnitude == 0.0 {
        return Split64::new(sign, 0);
    }

    if magnitude > FLOAT32_MAX {
        return Split64::new(sign | FLOAT32_INFINITY, 0);
    }

    if magnitude < FLOAT32_MIN_NORMAL {
        // Rounding up to 2^23 lands exactly on the smallest normal's encoding.
        let mantissa = (magnitude * pow2(149)).round() as u32;
        return Split64::new(sign | mantissa, 0);
    }

    // `magnitude` is a normal f64 here, so its unbiased exponent comes straight from the
    // bit pattern.
    let mut exponent = ((magnitude.to_bits() >> 52) & 0x7FF) as i32 - 1023;
    let mut mantissa = (magnitude * pow2(23 - exponent)).round() as u32;
    if mantissa >= 1 << 24 {
        // Rounded up into the next binade.
        mantissa >>= 1;
        exponent += 1;
    }
    if exponent > 127 {
        return Split64::new(sign | FLOAT32_INFINITY, 0);
    }

    let biased = (exponent + 127) as u32;
    Split64::new(sign | (biased << 23) | (mantissa & FLOAT32_MANTISSA_MASK), 0)
}

/// Reconstructs a host number from the bit pattern of an IEEE-754 single.
pub fn join_float32(bits: u32) -> f64 {
    let sign = if bits & FLOAT32_SIGN != 0 { -1.0 } else { 1.0 };
    let exponent = (bits >> 23) & 0xFF;
    let mantissa = f64::from(bits & FLOAT32_MANTISSA_MASK);

    match exponent {
        0xFF if mantissa != 0.0 => f64::NAN,
        0xFF => sign * f64::INFINITY,
        // Subnormal, including both zeros. Scaled by the same fixed factor as the split.
        0 => sign * mantissa * pow2(-149),
        #[allow(clippy::cast_possible_wrap)]
        _ => sign * (mantissa + 8_388_608.0) * pow2(exponent as i32 - 150),
    }
}

/// Splits a host number into the halves of its IEEE-754 double bit pattern.
///
/// NaN is canonicalized to [`FLOAT64_NAN_BITS`], every other value (signed zero,
/// subnormals, infinities) keeps its exact pattern.
pub fn split_float64(value: f64) -> Split64 {
    if value.is_nan() {
        return FLOAT64_NAN_BITS;
    }
    split_uint64(value.to_bits())
}

/// Reconstructs a host number from the halves of an IEEE-754 double bit pattern.
pub fn join_float64(split: Split64) -> f64 {
    let bits = join_uint64(split);
    let value = f64::from_bits(bits);
    if value.is_nan() {
        // Payloads do not survive into the host representation.
        return f64::NAN;
    }
    value
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    #[test]
    fn test_split_int64_min() {
        assert_eq!(split_int64(i64::MIN), Split64::new(0, 0x8000_0000));
        assert_eq!(split_int64(-1), Split64::new(u32::MAX, u32::MAX));
        assert_eq!(join_int64(split_int64(i64::MIN)), i64::MIN);
    }

    #[test]
    fn test_zigzag_encoding() {
        assert_eq!(zigzag_encode_32(0), 0);
        assert_eq!(zigzag_encode_32(-1), 1);
        assert_eq!(zigzag_encode_32(1), 2);
        assert_eq!(zigzag_encode_32(-2), 3);
        assert_eq!(zigzag_encode_32(i32::MAX), 4_294_967_294);
        assert_eq!(zigzag_encode_32(i32::MIN), 4_294_967_295);

        assert_eq!(join_uint64(split_zigzag64(-1)), 1);
        assert_eq!(join_uint64(split_zigzag64(i64::MAX)), u64::MAX - 1);
        assert_eq!(join_uint64(split_zigzag64(i64::MIN)), u64::MAX);
    }

    #[test]
    fn test_split_float32_negative_zero() {
        let split = split_float32(-0.0);
        assert_eq!(split, Split64::new(0x8000_0000, 0));

        let joined = join_float32(split.lo);
        assert_eq!(joined, 0.0);
        assert_eq!(1.0 / joined, f64::NEG_INFINITY);
    }

    #[test]
    fn test_split_float32_specials() {
        assert_eq!(split_float32(f64::NAN).lo, FLOAT32_NAN_BITS);
        assert_eq!(split_float32(f64::INFINITY).lo, 0x7F80_0000);
        assert_eq!(split_float32(f64::NEG_INFINITY).lo, 0xFF80_0000);
        // Out of f32 range saturates instead of wrapping the exponent.
        assert_eq!(split_float32(1e39).lo, 0x7F80_0000);
        assert_eq!(split_float32(-1e300).lo, 0xFF80_0000);

        assert!(join_float32(0x7FC0_0001).is_nan());
        assert_eq!(join_float32(0xFF80_0000), f64::NEG_INFINITY);
    }

    #[test]
    fn test_split_float32_subnormals() {
        let smallest = f64::from(f32::from_bits(1));
        assert_eq!(split_float32(smallest).lo, 1);
        assert_eq!(join_float32(1), smallest);

        let largest_subnormal = f32::from_bits(FLOAT32_MANTISSA_MASK);
        assert_eq!(
            split_float32(f64::from(largest_subnormal)).lo,
            FLOAT32_MANTISSA_MASK
        );
        assert_eq!(join_float32(FLOAT32_MANTISSA_MASK), f64::from(largest_subnormal));

        // Half of the smallest subnormal rounds away from zero.
        assert_eq!(split_float32(smallest / 2.0).lo, 1);
    }

    #[test]
    fn test_split_float32_rounds_into_next_binade() {
        // Just below 2.0 but closer to 2.0 than to the largest f32 under it.
        let value = 2.0 - pow2(-30);
        assert_eq!(split_float32(value).lo, 2.0f32.to_bits());
    }

    #[test]
    fn test_split_float64_specials() {
        assert_eq!(split_float64(-0.0), Split64::new(0, 0x8000_0000));
        assert_eq!(split_float64(f64::NAN), FLOAT64_NAN_BITS);
        assert_eq!(split_float64(f64::INFINITY), Split64::new(0, 0x7FF0_0000));
        assert_eq!(split_float64(f64::from_bits(1)), Split64::new(1, 0));

        let negative_zero = join_float64(Split64::new(0, 0x8000_0000));
        assert_eq!(1.0 / negative_zero, f64::NEG_INFINITY);
        assert!(join_float64(Split64::new(1, 0x7FF0_0000)).is_nan());
    }

    #[property_test]
    fn proptest_float32_roundtrip(bits: u32) {
        let value = f32::from_bits(bits);
        let split = split_float32(f64::from(value));
        if value.is_nan() {
            prop_assert_eq!(split.lo, FLOAT32_NAN_BITS);
        } else {
            prop_assert_eq!(split.lo, bits);
            prop_assert_eq!(join_float32(split.lo).to_bits(), f64::from(value).to_bits());
        }
        prop_assert_eq!(split.hi, 0);
    }

    #[property_test]
    fn proptest_float64_roundtrip(bits: u64) {
        let value = f64::from_bits(bits);
        let joined = join_float64(split_float64(value));
        if value.is_nan() {
            prop_assert!(joined.is_nan());
        } else {
            prop_assert_eq!(joined.to_bits(), bits);
        }
    }

    #[property_test]
    fn proptest_float32_matches_native_narrowing(value: f64) {
        // Ties are the only place our rounding can differ from the hardware's.
        let native = value as f32;
        let split = split_float32(value);
        if value.is_nan() {
            prop_assert_eq!(split.lo, FLOAT32_NAN_BITS);
        } else if f64::from(native) == value || native.is_infinite() {
            prop_assert_eq!(split.lo, native.to_bits());
        }
    }

    #[property_test]
    fn proptest_zigzag64_bijection(value: i64) {
        let encoded = split_zigzag64(value);
        prop_assert_eq!(join_zigzag64(encoded), value);
        let expected = ((value << 1) ^ (value >> 63)) as u64;
        prop_assert_eq!(join_uint64(encoded), expected);
        if value >= 0 {
            prop_assert_eq!(join_uint64(encoded) % 2, 0);
        }
    }

    #[property_test]
    fn proptest_zigzag32_bijection(value: i32) {
        prop_assert_eq!(zigzag_decode_32(zigzag_encode_32(value)), value);
    }

    #[property_test]
    fn proptest_split_int64_matches_native(value: i64) {
        prop_assert_eq!(join_uint64(split_int64(value)), value as u64);
    }
}
