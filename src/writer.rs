//! Field-level writer, the mirror of [`Reader`](crate::reader::Reader).
//!
//! Submessages are written in a single pass. [`Writer::begin_delimited`] writes the
//! field key, seals everything written so far into a block, and remembers that block
//! in a bookmark. [`Writer::end_delimited`] measures what was written since and appends
//! the length varint to the bookmarked block, so the prefix ends up directly in front
//! of the payload once the blocks are concatenated.

use smallvec::SmallVec;

use crate::arith::{Int64, UInt64};
use crate::encoder::Encoder;
use crate::leb128::LebCodec;
use crate::scalar::{Fixed32, Fixed64, Scalar, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::split::{split_uint64, Split64};
use crate::wire::{encode_key, WireType};

#[derive(Debug, Clone, Copy)]
struct Bookmark {
    /// Index of the block ending with the field key.
    block: usize,
    /// Total length at the start of the payload.
    start: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Writer {
    blocks: Vec<Vec<u8>>,
    encoder: Encoder,
    /// Bytes held by `blocks`.
    total_length: usize,
    bookmarks: SmallVec<[Bookmark; 8]>,
}

impl Writer {
    pub fn new() -> Self {
        Writer::default()
    }

    /// Number of bytes written so far.
    pub fn length(&self) -> usize {
        self.total_length + self.encoder.length()
    }

    /// Discards everything written, including open submessages.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.encoder.end();
        self.total_length = 0;
        self.bookmarks.clear();
    }

    /// Seals the encoder's bytes into a new block and returns its index.
    fn save_block(&mut self) -> usize {
        let block = self.encoder.end();
        self.total_length += block.len();
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    /// Concatenates everything written into one buffer and resets the writer.
    ///
    /// # Panics
    ///
    /// Panics if a [`Writer::begin_delimited`] has no matching
    /// [`Writer::end_delimited`].
    pub fn result_buffer(&mut self) -> Vec<u8> {
        assert!(
            self.bookmarks.is_empty(),
            "{} submessage(s) still open, unbalanced begin_delimited/end_delimited",
            self.bookmarks.len()
        );
        let tail = self.encoder.end();
        let mut out = Vec::with_capacity(self.total_length + tail.len());
        for block in self.blocks.drain(..) {
            out.extend_from_slice(&block);
        }
        out.extend_from_slice(&tail);
        self.total_length = 0;
        out
    }

    /// Writes a field key.
    ///
    /// # Panics
    ///
    /// Panics if `field` is not a valid field number.
    pub fn write_field_header(&mut self, field: u32, wire_type: WireType) {
        encode_key(wire_type, field, self.encoder.buffer_mut());
    }

    /// Starts a length-delimited field whose length is not known yet.
    pub fn begin_delimited(&mut self, field: u32) {
        self.write_field_header(field, WireType::Len);
        let block = self.save_block();
        self.bookmarks.push(Bookmark {
            block,
            start: self.total_length,
        });
    }

    /// Closes the innermost open length-delimited field.
    ///
    /// # Panics
    ///
    /// Panics if there is no open field.
    pub fn end_delimited(&mut self) {
        let Some(bookmark) = self.bookmarks.pop() else {
            panic!("end_delimited without a matching begin_delimited");
        };
        let payload_len = self.length() - bookmark.start;
        let prefix = split_uint64(payload_len as u64);
        let written = prefix.encode_leb128(&mut self.blocks[bookmark.block]);
        self.total_length += written;
    }

    /// Writes `value` as a submessage, `write` emits its fields.
    pub fn write_message<T, F>(&mut self, field: u32, value: &T, write: F)
    where
        T: ?Sized,
        F: FnOnce(&T, &mut Writer),
    {
        self.begin_delimited(field);
        write(value, self);
        self.end_delimited();
    }

    /// Writes `value` as a group, `write` emits its fields.
    pub fn write_group<T, F>(&mut self, field: u32, value: &T, write: F)
    where
        T: ?Sized,
        F: FnOnce(&T, &mut Writer),
    {
        self.write_field_header(field, WireType::SGroup);
        write(value, self);
        self.write_field_header(field, WireType::EGroup);
    }

    /// Appends already encoded fields verbatim.
    pub fn write_serialized_message(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        self.save_block();
        self.total_length += bytes.len();
        self.blocks.push(bytes.to_vec());
    }

    pub fn write_scalar<T: Scalar>(&mut self, field: u32, value: T) {
        self.write_field_header(field, T::WIRE_TYPE);
        value.write(&mut self.encoder);
    }

    pub fn write_int32(&mut self, field: u32, value: i32) {
        self.write_scalar(field, value);
    }

    pub fn write_int64(&mut self, field: u32, value: i64) {
        self.write_scalar(field, value);
    }

    pub fn write_uint32(&mut self, field: u32, value: u32) {
        self.write_scalar(field, value);
    }

    pub fn write_uint64(&mut self, field: u32, value: u64) {
        self.write_scalar(field, value);
    }

    pub fn write_sint32(&mut self, field: u32, value: i32) {
        self.write_scalar(field, Sint32(value));
    }

    pub fn write_sint64(&mut self, field: u32, value: i64) {
        self.write_scalar(field, Sint64(value));
    }

    pub fn write_fixed32(&mut self, field: u32, value: u32) {
        self.write_scalar(field, Fixed32(value));
    }

    pub fn write_fixed64(&mut self, field: u32, value: u64) {
        self.write_scalar(field, Fixed64(value));
    }

    pub fn write_sfixed32(&mut self, field: u32, value: i32) {
        self.write_scalar(field, Sfixed32(value));
    }

    pub fn write_sfixed64(&mut self, field: u32, value: i64) {
        self.write_scalar(field, Sfixed64(value));
    }

    pub fn write_float(&mut self, field: u32, value: f32) {
        self.write_scalar(field, value);
    }

    pub fn write_double(&mut self, field: u32, value: f64) {
        self.write_scalar(field, value);
    }

    pub fn write_bool(&mut self, field: u32, value: bool) {
        self.write_scalar(field, value);
    }

    pub fn write_enum(&mut self, field: u32, value: i32) {
        self.write_scalar(field, value);
    }

    pub fn write_split_varint64(&mut self, field: u32, value: Split64) {
        self.write_field_header(field, WireType::Varint);
        self.encoder.write_split_varint64(value);
    }

    pub fn write_split_zigzag_varint64(&mut self, field: u32, value: Split64) {
        self.write_split_varint64(field, value.zigzag_encode());
    }

    pub fn write_split_fixed64(&mut self, field: u32, value: Split64) {
        self.write_field_header(field, WireType::I64);
        self.encoder.write_split_fixed64(value);
    }

    /// Writes an `int64` field given as a decimal string.
    ///
    /// Returns `false`, writing nothing, if `value` is not a valid `int64`.
    pub fn write_int64_string(&mut self, field: u32, value: &str) -> bool {
        match Int64::from_decimal_str(value) {
            Some(value) => {
                self.write_split_varint64(field, value.into());
                true
            }
            None => false,
        }
    }

    /// Writes a `uint64` field given as a decimal string.
    ///
    /// Returns `false`, writing nothing, if `value` is not a valid `uint64`.
    pub fn write_uint64_string(&mut self, field: u32, value: &str) -> bool {
        match UInt64::from_decimal_str(value) {
            Some(value) => {
                self.write_split_varint64(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn write_sint64_string(&mut self, field: u32, value: &str) -> bool {
        match Int64::from_decimal_str(value) {
            Some(value) => {
                self.write_split_zigzag_varint64(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn write_fixed64_string(&mut self, field: u32, value: &str) -> bool {
        match UInt64::from_decimal_str(value) {
            Some(value) => {
                self.write_split_fixed64(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn write_sfixed64_string(&mut self, field: u32, value: &str) -> bool {
        match Int64::from_decimal_str(value) {
            Some(value) => {
                self.write_split_fixed64(field, value.into());
                true
            }
            None => false,
        }
    }

    /// Writes a length-delimited field whose payload is already at hand.
    fn write_len_prefixed(&mut self, field: u32, payload: &[u8]) {
        self.write_field_header(field, WireType::Len);
        self.encoder.write_unsigned_varint64(payload.len() as u64);
        self.encoder.write_bytes(payload);
    }

    pub fn write_string(&mut self, field: u32, value: &str) {
        self.write_len_prefixed(field, value.as_bytes());
    }

    /// Writes a `string` field from UTF-16 code units.
    pub fn write_string_utf16(&mut self, field: u32, units: &[u16]) {
        // The UTF-8 length isn't known until the units are converted.
        self.begin_delimited(field);
        self.encoder.write_utf16(units);
        self.end_delimited();
    }

    pub fn write_bytes(&mut self, field: u32, value: &[u8]) {
        self.write_len_prefixed(field, value);
    }

    /// Writes `values` as a packed repeated field. Nothing is written for an empty slice.
    pub fn write_packed<T: Scalar>(&mut self, field: u32, values: &[T]) {
        if values.is_empty() {
            return;
        }
        match T::FIXED_WIDTH {
            Some(width) => {
                self.write_field_header(field, WireType::Len);
                self.encoder
                    .write_unsigned_varint64((values.len() * width) as u64);
                for value in values {
                    value.write(&mut self.encoder);
                }
            }
            None => {
                self.begin_delimited(field);
                for value in values {
                    value.write(&mut self.encoder);
                }
                self.end_delimited();
            }
        }
    }

    /// Writes `values` with one key per value.
    pub fn write_repeated<T: Scalar>(&mut self, field: u32, values: &[T]) {
        for value in values {
            self.write_scalar(field, *value);
        }
    }
}
