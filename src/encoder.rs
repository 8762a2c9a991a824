//! Append-only builder for wire primitives, the inverse of [`Decoder`](crate::decoder::Decoder).

use bytes::BufMut;

use crate::leb128::LebCodec;
use crate::split::{
    split_float32, split_float64, split_int64, split_uint64, split_zigzag64, zigzag_encode_32,
    Split64,
};

#[derive(Debug, Clone, Default)]
pub struct Encoder {
    buffer: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder::default()
    }

    /// Number of bytes written since the last [`Encoder::end`].
    pub fn length(&self) -> usize {
        self.buffer.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }

    /// Returns everything written so far and leaves the encoder empty.
    pub fn end(&mut self) -> Vec<u8> {
        core::mem::take(&mut self.buffer)
    }

    pub fn write_unsigned_varint32(&mut self, value: u32) -> usize {
        value.encode_leb128(&mut self.buffer)
    }

    /// Writes an `int32` varint. Negative values are sign extended to 64 bits, and so
    /// always take ten bytes.
    pub fn write_signed_varint32(&mut self, value: i32) -> usize {
        if value >= 0 {
            #[allow(clippy::cast_sign_loss)]
            let value = value as u32;
            self.write_unsigned_varint32(value)
        } else {
            self.write_split_varint64(split_int64(i64::from(value)))
        }
    }

    pub fn write_zigzag_varint32(&mut self, value: i32) -> usize {
        self.write_unsigned_varint32(zigzag_encode_32(value))
    }

    pub fn write_split_varint64(&mut self, value: Split64) -> usize {
        value.encode_leb128(&mut self.buffer)
    }

    pub fn write_unsigned_varint64(&mut self, value: u64) -> usize {
        self.write_split_varint64(split_uint64(value))
    }

    pub fn write_signed_varint64(&mut self, value: i64) -> usize {
        self.write_split_varint64(split_int64(value))
    }

    pub fn write_zigzag_varint64(&mut self, value: i64) -> usize {
        self.write_split_varint64(split_zigzag64(value))
    }

    pub fn write_uint8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    pub fn write_uint16(&mut self, value: u16) {
        self.buffer.put_u16_le(value);
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.buffer.put_u32_le(value);
    }

    /// Writes both halves as 8 little-endian bytes, low half first.
    pub fn write_split_fixed64(&mut self, value: Split64) {
        self.buffer.put_u32_le(value.lo);
        self.buffer.put_u32_le(value.hi);
    }

    pub fn write_uint64(&mut self, value: u64) {
        self.write_split_fixed64(split_uint64(value));
    }

    pub fn write_int8(&mut self, value: i8) {
        self.buffer.put_i8(value);
    }

    pub fn write_int16(&mut self, value: i16) {
        self.buffer.put_i16_le(value);
    }

    pub fn write_int32(&mut self, value: i32) {
        self.buffer.put_i32_le(value);
    }

    pub fn write_int64(&mut self, value: i64) {
        self.write_split_fixed64(split_int64(value));
    }

    pub fn write_float(&mut self, value: f32) {
        self.write_uint32(split_float32(f64::from(value)).lo);
    }

    pub fn write_double(&mut self, value: f64) {
        self.write_split_fixed64(split_float64(value));
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(u8::from(value));
    }

    pub fn write_enum(&mut self, value: i32) -> usize {
        self.write_signed_varint32(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes the UTF-8 bytes of `value`, returning how many were written.
    pub fn write_string(&mut self, value: &str) -> usize {
        self.buffer.extend_from_slice(value.as_bytes());
        value.len()
    }

    /// Writes UTF-16 code units as UTF-8, returning how many bytes were written.
    ///
    /// Surrogate pairs combine into a single four byte sequence, a lone surrogate is
    /// written as U+FFFD.
    pub fn write_utf16(&mut self, units: &[u16]) -> usize {
        let before = self.buffer.len();
        let mut scratch = [0u8; 4];
        for c in char::decode_utf16(units.iter().copied()) {
            let c = c.unwrap_or(char::REPLACEMENT_CHARACTER);
            self.buffer
                .extend_from_slice(c.encode_utf8(&mut scratch).as_bytes());
        }
        self.buffer.len() - before
    }
}
