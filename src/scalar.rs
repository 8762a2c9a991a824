//! Scalar protobuf types and how they map onto [`Decoder`] and [`Encoder`] primitives.
//!
//! Plain Rust integers use the varint encodings (`u32` is `uint32`, `i64` is `int64`,
//! and so on). The zigzag and fixed-width encodings have their own wrapper types.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::wire::WireType;

/// A protobuf scalar that can appear on its own or inside a packed repeated field.
pub trait Scalar: Copy + Default + PartialEq + core::fmt::Debug {
    const WIRE_TYPE: WireType;
    /// Encoded size, when it doesn't depend on the value.
    const FIXED_WIDTH: Option<usize>;

    fn read(decoder: &mut Decoder) -> Self;
    fn write(self, encoder: &mut Encoder);
}

macro_rules! impl_scalar {
    ($($ty:ty => $wire:expr, $width:expr, $read:expr, $write:expr;)+) => {$(
        impl Scalar for $ty {
            const WIRE_TYPE: WireType = $wire;
            const FIXED_WIDTH: Option<usize> = $width;

            #[inline]
            fn read(decoder: &mut Decoder) -> Self {
                $read(decoder)
            }

            #[inline]
            fn write(self, encoder: &mut Encoder) {
                $write(encoder, self);
            }
        }
    )+};
}

macro_rules! scalar_wrapper {
    ($(#[$doc:meta] $name:ident($inner:ty);)+) => {$(
        #[$doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl core::ops::Deref for $name {
            type Target = $inner;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                $name(value)
            }
        }

        impl From<$name> for $inner {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    )+};
}

scalar_wrapper! {
    /// Wrapper for protobuf `sint32` (zigzag-encoded signed 32-bit integer).
    Sint32(i32);
    /// Wrapper for protobuf `sint64` (zigzag-encoded signed 64-bit integer).
    Sint64(i64);
    /// Wrapper for protobuf `fixed32` (little-endian unsigned 32-bit integer).
    Fixed32(u32);
    /// Wrapper for protobuf `fixed64` (little-endian unsigned 64-bit integer).
    Fixed64(u64);
    /// Wrapper for protobuf `sfixed32` (little-endian signed 32-bit integer).
    Sfixed32(i32);
    /// Wrapper for protobuf `sfixed64` (little-endian signed 64-bit integer).
    Sfixed64(i64);
}

impl_scalar! {
    u32 => WireType::Varint, None,
        Decoder::read_unsigned_varint32,
        |e: &mut Encoder, v| { e.write_unsigned_varint32(v); };
    u64 => WireType::Varint, None,
        Decoder::read_unsigned_varint64,
        |e: &mut Encoder, v| { e.write_unsigned_varint64(v); };
    i32 => WireType::Varint, None,
        Decoder::read_signed_varint32,
        |e: &mut Encoder, v| { e.write_signed_varint32(v); };
    i64 => WireType::Varint, None,
        Decoder::read_signed_varint64,
        |e: &mut Encoder, v| { e.write_signed_varint64(v); };
    bool => WireType::Varint, Some(1),
        Decoder::read_bool,
        Encoder::write_bool;
    Sint32 => WireType::Varint, None,
        |d: &mut Decoder| Sint32(d.read_zigzag_varint32()),
        |e: &mut Encoder, v: Sint32| { e.write_zigzag_varint32(v.0); };
    Sint64 => WireType::Varint, None,
        |d: &mut Decoder| Sint64(d.read_zigzag_varint64()),
        |e: &mut Encoder, v: Sint64| { e.write_zigzag_varint64(v.0); };
    Fixed32 => WireType::I32, Some(4),
        |d: &mut Decoder| Fixed32(d.read_uint32()),
        |e: &mut Encoder, v: Fixed32| e.write_uint32(v.0);
    Fixed64 => WireType::I64, Some(8),
        |d: &mut Decoder| Fixed64(d.read_uint64()),
        |e: &mut Encoder, v: Fixed64| e.write_uint64(v.0);
    Sfixed32 => WireType::I32, Some(4),
        |d: &mut Decoder| Sfixed32(d.read_int32()),
        |e: &mut Encoder, v: Sfixed32| e.write_int32(v.0);
    Sfixed64 => WireType::I64, Some(8),
        |d: &mut Decoder| Sfixed64(d.read_int64()),
        |e: &mut Encoder, v: Sfixed64| e.write_int64(v.0);
    f32 => WireType::I32, Some(4),
        Decoder::read_float,
        Encoder::write_float;
    f64 => WireType::I64, Some(8),
        Decoder::read_double,
        Encoder::write_double;
}
