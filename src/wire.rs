//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use core::num::NonZeroU32;

use static_assertions::assert_eq_size;

use crate::error::DecodeErrorKind;
use crate::leb128::LebCodec;
use crate::util::unlikely;

/// Minimum value of a protobuf field number.
pub const MINIMUM_FIELD_NUMBER: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// A decoded protobuf field key containing a field number and a wire type.
///
/// The layout mirrors the protobuf wire format:
/// * Bits 0-2: wire type (0-5)
/// * Bits 3-31: field number (1 to 2^29-1)
///
/// Since field numbers start at 1, the minimum raw value is 8 (`1 << 3`), so the key
/// is always non-zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FieldKey(NonZeroU32);

assert_eq_size!(FieldKey, Option<FieldKey>);

impl FieldKey {
    /// Builds a key from its parts, returning `None` when `field_number` is out of range.
    pub fn new(field_number: u32, wire_type: WireType) -> Option<Self> {
        if !(MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&field_number) {
            return None;
        }
        let raw = (field_number << 3) | u32::from(wire_type.into_val());
        NonZeroU32::new(raw).map(FieldKey)
    }

    /// Validates a raw key read off the wire.
    #[inline(always)]
    pub fn try_from_raw(raw_key: u32) -> Result<Self, DecodeErrorKind> {
        #[allow(clippy::cast_possible_truncation)]
        let wire_type_raw = (raw_key & 0b111) as u8;
        if unlikely(wire_type_raw > WireType::MAX_VAL) {
            return Err(DecodeErrorKind::InvalidWireType {
                value: wire_type_raw,
            });
        }

        // A u32 key can never carry a field number above the maximum, only zero is
        // out of range.
        if unlikely(raw_key >> 3 == 0) {
            return Err(DecodeErrorKind::InvalidFieldNumber { value: 0 });
        }
        NonZeroU32::new(raw_key)
            .map(FieldKey)
            .ok_or(DecodeErrorKind::InvalidFieldNumber { value: 0 })
    }

    #[inline(always)]
    pub fn wire_type(self) -> WireType {
        #[allow(clippy::cast_possible_truncation)]
        let raw = (self.0.get() & 0b111) as u8;
        // Validated during construction.
        WireType::try_from_val(raw).unwrap_or(WireType::Varint)
    }

    #[inline(always)]
    pub const fn field_number(self) -> u32 {
        self.0.get() >> 3
    }

    #[inline(always)]
    pub fn into_parts(self) -> (u32, WireType) {
        (self.field_number(), self.wire_type())
    }

    /// The raw `field_number << 3 | wire_type` value.
    #[inline(always)]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl core::fmt::Debug for FieldKey {
    #[cold]
    #[inline(never)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FieldKey")
            .field("field_number", &self.field_number())
            .field("wire_type", &self.wire_type())
            .finish()
    }
}

/// Encodes the provided field number and wire type as a protobuf field key.
///
/// Follows the specification from <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
///
/// # Panics
///
/// Panics if `field_number` is not within
/// [`MINIMUM_FIELD_NUMBER`]`..=`[`MAXIMUM_FIELD_NUMBER`].
#[inline(always)]
pub fn encode_key<B: bytes::BufMut>(wire_type: WireType, field_number: u32, buf: &mut B) -> usize {
    assert!(
        (MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&field_number),
        "field number {field_number} out of range"
    );
    let key = (field_number << 3) | u32::from(wire_type.into_val());
    key.encode_leb128(buf)
}

/// Returns the encoded length of a field key.
#[inline(always)]
pub fn encoded_key_len(field_number: u32) -> usize {
    // The wire type only occupies the low 3 bits and never changes the length.
    (field_number << 3).encoded_leb128_len()
}

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded each key-value pair
/// is turned into a record consisting of a field number, a [`WireType`], and a payload.
/// The [`WireType`] indicates how large the proceeding payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

assert_eq_size!(WireType, u8);

impl WireType {
    /// Maximum value an [`WireType`] can be.
    const MAX_VAL: u8 = 5;

    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    pub const fn try_from_val(value: u8) -> Result<Self, DecodeErrorKind> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            value => Err(DecodeErrorKind::InvalidWireType { value }),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }

    /// Number of payload bytes for fixed-width wire types.
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::I32 => Some(4),
            WireType::I64 => Some(8),
            _ => None,
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeErrorKind;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self, DecodeErrorKind> {
        WireType::try_from_val(value)
    }
}
