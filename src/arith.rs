//! 64-bit integer arithmetic over pairs of 32-bit halves.
//!
//! Values read off the wire are carried as `(lo, hi)` halves (see [`Split64`]) so the
//! varint and fixed64 codecs never need to materialize a full 64-bit number. The types
//! here do exact arithmetic on that representation, most importantly conversion to and
//! from decimal strings one digit at a time.

use core::cmp::Ordering;
use core::fmt;

use crate::split::Split64;

/// An unsigned 64-bit integer stored as two unsigned 32-bit halves.
///
/// The value is `hi * 2^32 + lo`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct UInt64 {
    pub lo: u32,
    pub hi: u32,
}

impl UInt64 {
    pub const ZERO: UInt64 = UInt64 { lo: 0, hi: 0 };
    pub const MAX: UInt64 = UInt64 {
        lo: u32::MAX,
        hi: u32::MAX,
    };

    pub const fn new(lo: u32, hi: u32) -> Self {
        UInt64 { lo, hi }
    }

    pub const fn is_zero(self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Returns true if the most significant bit is set.
    pub const fn msb(self) -> bool {
        self.hi & 0x8000_0000 != 0
    }

    /// Returns true if the least significant bit is set.
    pub const fn lsb(self) -> bool {
        self.lo & 1 != 0
    }

    /// Wrapping addition, carrying out of the low half into the high half.
    #[must_use]
    pub const fn add(self, other: UInt64) -> UInt64 {
        let (lo, carry) = self.lo.overflowing_add(other.lo);
        let hi = self
            .hi
            .wrapping_add(other.hi)
            .wrapping_add(if carry { 1 } else { 0 });
        UInt64 { lo, hi }
    }

    /// Wrapping subtraction, borrowing from the high half when the low half underflows.
    #[must_use]
    pub const fn sub(self, other: UInt64) -> UInt64 {
        let (lo, borrow) = self.lo.overflowing_sub(other.lo);
        let hi = self
            .hi
            .wrapping_sub(other.hi)
            .wrapping_sub(if borrow { 1 } else { 0 });
        UInt64 { lo, hi }
    }

    /// Two's complement negation.
    #[must_use]
    pub const fn negate(self) -> UInt64 {
        UInt64::ZERO.sub(self)
    }

    /// Shifts left by `bits`, discarding bits shifted past the top. `bits >= 64` yields zero.
    #[must_use]
    pub const fn shift_left(self, bits: u32) -> UInt64 {
        match bits {
            0 => self,
            1..=31 => UInt64 {
                lo: self.lo << bits,
                hi: (self.hi << bits) | (self.lo >> (32 - bits)),
            },
            32..=63 => UInt64 {
                lo: 0,
                hi: self.lo << (bits - 32),
            },
            _ => UInt64::ZERO,
        }
    }

    /// Logical right shift by `bits`. `bits >= 64` yields zero.
    #[must_use]
    pub const fn shift_right(self, bits: u32) -> UInt64 {
        match bits {
            0 => self,
            1..=31 => UInt64 {
                lo: (self.lo >> bits) | (self.hi << (32 - bits)),
                hi: self.hi >> bits,
            },
            32..=63 => UInt64 {
                lo: self.hi >> (bits - 32),
                hi: 0,
            },
            _ => UInt64::ZERO,
        }
    }

    /// Multiplies two 32-bit values into a full 64-bit product.
    ///
    /// Each operand is split into 16-bit halves so every partial product fits in 32
    /// bits, then the four partial products are recombined with explicit carries.
    pub const fn mul32x32(a: u32, b: u32) -> UInt64 {
        let a_lo = a & 0xFFFF;
        let a_hi = a >> 16;
        let b_lo = b & 0xFFFF;
        let b_hi = b >> 16;

        let lo_lo = a_lo * b_lo;
        let lo_hi = a_lo * b_hi;
        let hi_lo = a_hi * b_lo;
        let hi_hi = a_hi * b_hi;

        let mut product_hi = hi_hi + (lo_hi >> 16) + (hi_lo >> 16);

        let (product_lo, carry_a) = lo_lo.overflowing_add((lo_hi & 0xFFFF) << 16);
        if carry_a {
            product_hi += 1;
        }
        let (product_lo, carry_b) = product_lo.overflowing_add((hi_lo & 0xFFFF) << 16);
        if carry_b {
            product_hi += 1;
        }

        UInt64 {
            lo: product_lo,
            hi: product_hi,
        }
    }

    /// Wrapping multiplication by a 32-bit scalar.
    #[must_use]
    pub const fn mul(self, scalar: u32) -> UInt64 {
        let lo = UInt64::mul32x32(self.lo, scalar);
        // Only the low half of `hi * scalar` survives once it is shifted up 32 bits.
        let hi = UInt64::mul32x32(self.hi, scalar);
        lo.add(UInt64 { lo: 0, hi: hi.lo })
    }

    /// Long division by a 32-bit divisor, returning `(quotient, remainder)`.
    ///
    /// Returns `None` when `divisor` is zero.
    pub fn div(self, divisor: u32) -> Option<(UInt64, UInt64)> {
        if divisor == 0 {
            return None;
        }

        let mut quotient = UInt64::ZERO;
        let mut remainder = self;
        let mut divisor = UInt64::new(divisor, 0);
        let mut unit = UInt64::new(1, 0);

        // Normalize so the divisor's top bit is set, tracking the matching quotient bit.
        while !divisor.msb() {
            divisor = divisor.shift_left(1);
            unit = unit.shift_left(1);
        }

        while !unit.is_zero() {
            if divisor <= remainder {
                quotient = quotient.add(unit);
                remainder = remainder.sub(divisor);
            }
            divisor = divisor.shift_right(1);
            unit = unit.shift_right(1);
        }

        Some((quotient, remainder))
    }

    /// Parses a string of ASCII decimal digits.
    ///
    /// Returns `None` for an empty string, any non-digit character, or a value that
    /// does not fit in 64 bits.
    pub fn from_decimal_str(s: &str) -> Option<UInt64> {
        if s.is_empty() {
            return None;
        }

        let mut result = UInt64::ZERO;
        for byte in s.bytes() {
            if !byte.is_ascii_digit() {
                return None;
            }
            // Anything above MAX / 10 overflows once multiplied by ten.
            if result > UInt64::MAX_DIV_10 {
                return None;
            }
            let scaled = result.mul(10);
            let next = scaled.add(UInt64::new(u32::from(byte - b'0'), 0));
            if next < scaled {
                return None;
            }
            result = next;
        }
        Some(result)
    }

    /// `u64::MAX / 10`, the largest value that can be multiplied by ten without overflow.
    const MAX_DIV_10: UInt64 = UInt64 {
        lo: 0x9999_9999,
        hi: 0x1999_9999,
    };

    pub const fn to_u64(self) -> u64 {
        ((self.hi as u64) << 32) | self.lo as u64
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_u64(value: u64) -> UInt64 {
        UInt64 {
            lo: value as u32,
            hi: (value >> 32) as u32,
        }
    }
}

impl PartialOrd for UInt64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for UInt64 {
    fn cmp(&self, other: &Self) -> Ordering {
        self.hi.cmp(&other.hi).then(self.lo.cmp(&other.lo))
    }
}

impl fmt::Display for UInt64 {
    /// Renders the value in decimal by repeated division by ten.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // u64::MAX has 20 decimal digits.
        let mut digits = [0u8; 20];
        let mut len = 0;
        let mut value = *self;
        loop {
            let Some((quotient, remainder)) = value.div(10) else {
                unreachable!("dividing by a non-zero constant");
            };
            #[allow(clippy::cast_possible_truncation)]
            let digit = remainder.lo as u8;
            digits[len] = b'0' + digit;
            len += 1;
            value = quotient;
            if value.is_zero() {
                break;
            }
        }
        digits[..len].reverse();
        // Every byte is an ASCII digit.
        let rendered = core::str::from_utf8(&digits[..len]).map_err(|_| fmt::Error)?;
        f.pad_integral(true, "", rendered)
    }
}

impl From<Split64> for UInt64 {
    fn from(split: Split64) -> Self {
        UInt64::new(split.lo, split.hi)
    }
}

impl From<UInt64> for Split64 {
    fn from(value: UInt64) -> Self {
        Split64::new(value.lo, value.hi)
    }
}

/// A signed 64-bit integer stored as two's complement 32-bit halves.
///
/// Arithmetic is shared with [`UInt64`], only decimal conversion treats the top bit as
/// a sign.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Int64 {
    pub lo: u32,
    pub hi: u32,
}

impl Int64 {
    pub const ZERO: Int64 = Int64 { lo: 0, hi: 0 };
    pub const MIN: Int64 = Int64 {
        lo: 0,
        hi: 0x8000_0000,
    };
    pub const MAX: Int64 = Int64 {
        lo: u32::MAX,
        hi: 0x7FFF_FFFF,
    };

    pub const fn new(lo: u32, hi: u32) -> Self {
        Int64 { lo, hi }
    }

    pub const fn is_negative(self) -> bool {
        self.unsigned().msb()
    }

    #[must_use]
    pub const fn add(self, other: Int64) -> Int64 {
        Int64::from_unsigned(self.unsigned().add(other.unsigned()))
    }

    #[must_use]
    pub const fn sub(self, other: Int64) -> Int64 {
        Int64::from_unsigned(self.unsigned().sub(other.unsigned()))
    }

    /// Wrapping multiplication by a 32-bit scalar.
    #[must_use]
    pub const fn mul(self, scalar: u32) -> Int64 {
        Int64::from_unsigned(self.unsigned().mul(scalar))
    }

    #[must_use]
    pub const fn negate(self) -> Int64 {
        Int64::from_unsigned(self.unsigned().negate())
    }

    /// Parses an optionally `-` prefixed string of ASCII decimal digits.
    ///
    /// Returns `None` for malformed input or a value outside `i64::MIN..=i64::MAX`.
    pub fn from_decimal_str(s: &str) -> Option<Int64> {
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let magnitude = UInt64::from_decimal_str(digits)?;

        if negative {
            // 2^63 is representable only as the negative minimum.
            if magnitude > Int64::MIN.unsigned() {
                return None;
            }
            Some(Int64::from_unsigned(magnitude).negate())
        } else {
            if magnitude.msb() {
                return None;
            }
            Some(Int64::from_unsigned(magnitude))
        }
    }

    /// Reinterprets the halves as unsigned.
    pub const fn unsigned(self) -> UInt64 {
        UInt64::new(self.lo, self.hi)
    }

    pub const fn from_unsigned(value: UInt64) -> Int64 {
        Int64::new(value.lo, value.hi)
    }

    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(self) -> i64 {
        self.unsigned().to_u64() as i64
    }

    #[allow(clippy::cast_sign_loss)]
    pub const fn from_i64(value: i64) -> Int64 {
        Int64::from_unsigned(UInt64::from_u64(value as u64))
    }
}

impl PartialOrd for Int64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Int64 {
    fn cmp(&self, other: &Self) -> Ordering {
        // Flipping the sign bit maps two's complement order onto unsigned order.
        let flip = |v: Int64| UInt64::new(v.lo, v.hi ^ 0x8000_0000);
        flip(*self).cmp(&flip(*other))
    }
}

impl fmt::Display for Int64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            // The negation of MIN is MIN again, which as unsigned is exactly 2^63.
            let magnitude = self.negate().unsigned();
            f.pad_integral(false, "", &magnitude.to_string())
        } else {
            fmt::Display::fmt(&self.unsigned(), f)
        }
    }
}

impl From<Split64> for Int64 {
    fn from(split: Split64) -> Self {
        Int64::new(split.lo, split.hi)
    }
}

impl From<Int64> for Split64 {
    fn from(value: Int64) -> Self {
        Split64::new(value.lo, value.hi)
    }
}
