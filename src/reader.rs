//! Tag-driven iteration over the fields of an encoded message.
//!
//! ```
//! use binproto::reader::Reader;
//!
//! let mut reader = Reader::new(&[0x08u8, 0xAC, 0x02]);
//! let mut value = 0;
//! while reader.next_field() && !reader.is_end_group() {
//!     match reader.field_number() {
//!         1 => value = reader.read_uint32(),
//!         _ => reader.skip_field(),
//!     }
//! }
//! assert!(reader.finish().is_ok());
//! assert_eq!(value, 300);
//! ```
//!
//! A [`Reader`] shares the poison-and-continue policy of its [`Decoder`]: a malformed
//! tag, length, group, or a field read with a mismatched accessor poisons the reader,
//! [`Reader::next_field`] starts returning `false`, and the failure is reported by
//! [`Reader::status`] or [`Reader::finish`].

use bytes::Bytes;

use crate::buffer::ByteSource;
use crate::config::DecodeConfig;
use crate::decoder::Decoder;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::pool::InstancePool;
use crate::scalar::{Fixed32, Fixed64, Scalar, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::split::{join_uint64, Split64};
use crate::wire::{FieldKey, WireType};

thread_local! {
    static READER_POOL: InstancePool<Reader> = const { InstancePool::new() };
}

#[derive(Debug, Clone, Default)]
pub struct Reader {
    decoder: Decoder,
    key: Option<FieldKey>,
    field_cursor: usize,
    depth: u32,
    config: DecodeConfig,
}

impl Reader {
    pub fn new<'a>(source: impl Into<ByteSource<'a>>) -> Self {
        Reader::from_decoder(Decoder::new(source))
    }

    pub fn with_config<'a>(source: impl Into<ByteSource<'a>>, config: DecodeConfig) -> Self {
        let mut reader = Reader::new(source);
        reader.config = config;
        reader
    }

    pub fn from_decoder(decoder: Decoder) -> Self {
        Reader {
            field_cursor: decoder.cursor(),
            decoder,
            ..Reader::default()
        }
    }

    /// Like [`Reader::new`], but reuses an instance from this thread's pool if one is
    /// available.
    pub fn alloc<'a>(source: impl Into<ByteSource<'a>>) -> Self {
        let mut reader = READER_POOL
            .try_with(InstancePool::take)
            .ok()
            .flatten()
            .unwrap_or_default();
        reader.decoder.set_block(source);
        reader
    }

    /// Clears this reader and returns it to this thread's pool.
    pub fn free(mut self) {
        self.decoder.clear();
        self.key = None;
        self.field_cursor = 0;
        self.depth = 0;
        self.config = DecodeConfig::default();
        let _ = READER_POOL.try_with(move |pool| pool.release(self));
    }

    pub fn config(&self) -> &DecodeConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DecodeConfig) {
        self.config = config;
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut Decoder {
        &mut self.decoder
    }

    /// Rewinds to the start of the buffer and forgets the current field and any error.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.key = None;
        self.field_cursor = self.decoder.cursor();
        self.depth = 0;
    }

    /// Reads the next field key.
    ///
    /// Returns `false` once the buffer (or the enclosing submessage) is exhausted, or
    /// the reader has been poisoned.
    pub fn next_field(&mut self) -> bool {
        self.key = None;
        if self.decoder.error() || self.decoder.at_end() {
            return false;
        }

        self.field_cursor = self.decoder.cursor();
        // Keys are read at full width so that bits above the low 32 aren't dropped.
        let raw = self.decoder.read_split_varint64();
        if self.decoder.error() {
            return false;
        }
        if raw.hi != 0 {
            // The field number doesn't fit in 29 bits, saturated if it doesn't even fit
            // in 32.
            let value = if raw.hi < 8 {
                (raw.hi << 29) | (raw.lo >> 3)
            } else {
                u32::MAX
            };
            self.decoder.poison_at(
                DecodeErrorKind::InvalidFieldNumber { value },
                self.field_cursor,
            );
            return false;
        }

        match FieldKey::try_from_raw(raw.lo) {
            Ok(key) => {
                self.key = Some(key);
                true
            }
            Err(kind) => {
                self.decoder.poison_at(kind, self.field_cursor);
                false
            }
        }
    }

    /// The key of the current field, `None` before the first call to
    /// [`Reader::next_field`] or after it returned `false`.
    pub fn field_key(&self) -> Option<FieldKey> {
        self.key
    }

    /// Field number of the current field, or 0 if there is none.
    pub fn field_number(&self) -> u32 {
        self.key.map_or(0, FieldKey::field_number)
    }

    pub fn wire_type(&self) -> Option<WireType> {
        self.key.map(FieldKey::wire_type)
    }

    pub fn is_end_group(&self) -> bool {
        self.wire_type() == Some(WireType::EGroup)
    }

    pub fn is_delimited(&self) -> bool {
        self.wire_type() == Some(WireType::Len)
    }

    /// Offset of the current field's key.
    pub fn field_cursor(&self) -> usize {
        self.field_cursor
    }

    /// Raw bytes of the current field, key included, up to the cursor.
    ///
    /// After the field has been read or skipped this is the complete encoded field,
    /// which can be handed to [`Writer::write_serialized_message`] unchanged.
    ///
    /// [`Writer::write_serialized_message`]: crate::writer::Writer::write_serialized_message
    pub fn field_bytes(&self) -> Bytes {
        let end = self.decoder.cursor().max(self.field_cursor);
        self.decoder.buffer().slice(self.field_cursor..end)
    }

    pub fn error(&self) -> bool {
        self.decoder.error()
    }

    pub fn status(&self) -> Result<(), DecodeError> {
        self.decoder.status()
    }

    /// Ends the pass, reporting the first failure if there was one.
    pub fn finish(self) -> Result<(), DecodeError> {
        self.status()
    }

    fn current_key(&self) -> FieldKey {
        match self.key {
            Some(key) => key,
            None => panic!("no current field, call `next_field` first"),
        }
    }

    /// Poisons the reader unless the current field has the `expected` wire type.
    ///
    /// # Panics
    ///
    /// Panics if there is no current field.
    pub fn expect_wire_type(&mut self, expected: WireType) -> bool {
        let key = self.current_key();
        if self.decoder.error() {
            return false;
        }
        if key.wire_type() != expected {
            self.decoder.poison_at(
                DecodeErrorKind::UnexpectedWireType {
                    field: key.field_number(),
                    expected,
                    actual: key.wire_type(),
                },
                self.field_cursor,
            );
            return false;
        }
        true
    }

    /// Reads a length prefix and checks it fits in what remains of the window.
    fn read_length(&mut self) -> usize {
        let offset = self.decoder.cursor();
        let value = join_uint64(self.decoder.read_split_varint64());
        if self.decoder.error() {
            return 0;
        }
        match usize::try_from(value) {
            Ok(len) if len <= self.decoder.remaining().len() => len,
            _ => {
                self.decoder
                    .poison_at(DecodeErrorKind::LengthOverflow { value }, offset);
                0
            }
        }
    }

    fn enter(&mut self) -> bool {
        if self.depth >= self.config.max_depth {
            self.decoder.poison(DecodeErrorKind::RecursionLimitExceeded {
                limit: self.config.max_depth,
            });
            return false;
        }
        self.depth += 1;
        true
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Skips over the current field's payload, whatever its wire type.
    ///
    /// # Panics
    ///
    /// Panics if there is no current field.
    pub fn skip_field(&mut self) {
        let key = self.current_key();
        match key.wire_type() {
            WireType::Varint => self.decoder.skip_varint(),
            WireType::I64 => self.decoder.advance(8),
            WireType::I32 => self.decoder.advance(4),
            WireType::Len => {
                let len = self.read_length();
                self.decoder.advance(len);
            }
            WireType::SGroup => self.skip_group(),
            WireType::EGroup => self.decoder.poison_at(
                DecodeErrorKind::StrayEndGroup {
                    field: key.field_number(),
                },
                self.field_cursor,
            ),
        }
    }

    /// Skips every field up to and including the end-group tag matching the current
    /// start-group field.
    pub fn skip_group(&mut self) {
        if !self.expect_wire_type(WireType::SGroup) {
            return;
        }
        let start = self.current_key();
        // The whole group, start key included, is the current field afterwards.
        let group_cursor = self.field_cursor;
        if !self.enter() {
            return;
        }
        loop {
            if !self.next_field() {
                if !self.decoder.error() {
                    self.decoder.poison(DecodeErrorKind::UnterminatedGroup {
                        field: start.field_number(),
                    });
                }
                break;
            }
            if self.is_end_group() {
                self.check_end_group(start.field_number());
                break;
            }
            self.skip_field();
        }
        self.leave();
        self.key = Some(start);
        self.field_cursor = group_cursor;
    }

    fn check_end_group(&mut self, expected: u32) {
        let actual = self.field_number();
        if actual != expected {
            self.decoder.poison_at(
                DecodeErrorKind::UnmatchedEndGroup { expected, actual },
                self.field_cursor,
            );
        }
    }

    /// Reads a length-delimited submessage into `target`.
    ///
    /// `read` sees a reader whose window ends with the submessage, so it can loop on
    /// [`Reader::next_field`] exactly like a top-level parse.
    pub fn read_message<T, F>(&mut self, target: &mut T, read: F)
    where
        F: FnOnce(&mut T, &mut Reader),
    {
        if !self.expect_wire_type(WireType::Len) {
            return;
        }
        let start = self.current_key();
        let message_cursor = self.field_cursor;
        let len = self.read_length();
        if self.decoder.error() || !self.enter() {
            return;
        }

        let outer_end = self.decoder.end();
        let inner_end = self.decoder.cursor() + len;
        self.decoder.set_end(inner_end);

        read(target, self);

        self.decoder.set_end(outer_end);
        self.decoder.set_cursor(inner_end);
        self.leave();
        self.key = Some(start);
        self.field_cursor = message_cursor;
    }

    /// Reads a group into `target`. `read` must stop at the end-group tag, see
    /// [`Reader::is_end_group`].
    pub fn read_group<T, F>(&mut self, target: &mut T, read: F)
    where
        F: FnOnce(&mut T, &mut Reader),
    {
        if !self.expect_wire_type(WireType::SGroup) {
            return;
        }
        let start = self.current_key();
        let group_cursor = self.field_cursor;
        if !self.enter() {
            return;
        }

        read(target, self);

        if !self.decoder.error() {
            if self.is_end_group() {
                self.check_end_group(start.field_number());
            } else {
                self.decoder.poison(DecodeErrorKind::UnterminatedGroup {
                    field: start.field_number(),
                });
            }
        }
        self.leave();
        self.key = Some(start);
        self.field_cursor = group_cursor;
    }

    /// Reads the current field as the scalar `T`.
    pub fn read_scalar<T: Scalar>(&mut self) -> T {
        if !self.expect_wire_type(T::WIRE_TYPE) {
            return T::default();
        }
        T::read(&mut self.decoder)
    }

    pub fn read_int32(&mut self) -> i32 {
        self.read_scalar()
    }

    pub fn read_int64(&mut self) -> i64 {
        self.read_scalar()
    }

    pub fn read_uint32(&mut self) -> u32 {
        self.read_scalar()
    }

    pub fn read_uint64(&mut self) -> u64 {
        self.read_scalar()
    }

    pub fn read_sint32(&mut self) -> i32 {
        self.read_scalar::<Sint32>().0
    }

    pub fn read_sint64(&mut self) -> i64 {
        self.read_scalar::<Sint64>().0
    }

    pub fn read_fixed32(&mut self) -> u32 {
        self.read_scalar::<Fixed32>().0
    }

    pub fn read_fixed64(&mut self) -> u64 {
        self.read_scalar::<Fixed64>().0
    }

    pub fn read_sfixed32(&mut self) -> i32 {
        self.read_scalar::<Sfixed32>().0
    }

    pub fn read_sfixed64(&mut self) -> i64 {
        self.read_scalar::<Sfixed64>().0
    }

    pub fn read_float(&mut self) -> f32 {
        self.read_scalar()
    }

    pub fn read_double(&mut self) -> f64 {
        self.read_scalar()
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_scalar()
    }

    pub fn read_enum(&mut self) -> i32 {
        self.read_scalar()
    }

    pub fn read_split_varint64(&mut self) -> Split64 {
        if !self.expect_wire_type(WireType::Varint) {
            return Split64::default();
        }
        self.decoder.read_split_varint64()
    }

    pub fn read_split_fixed64(&mut self) -> Split64 {
        if !self.expect_wire_type(WireType::I64) {
            return Split64::default();
        }
        self.decoder.read_split_fixed64()
    }

    /// Reads an `int64` field as a decimal string.
    pub fn read_int64_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::Varint) {
            return String::new();
        }
        self.decoder.read_signed_varint64_string()
    }

    pub fn read_uint64_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::Varint) {
            return String::new();
        }
        self.decoder.read_unsigned_varint64_string()
    }

    pub fn read_sint64_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::Varint) {
            return String::new();
        }
        self.decoder.read_zigzag_varint64_string()
    }

    pub fn read_fixed64_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::I64) {
            return String::new();
        }
        self.decoder.read_uint64_string()
    }

    pub fn read_sfixed64_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::I64) {
            return String::new();
        }
        self.decoder.read_int64_string()
    }

    /// Reads a `string` field.
    ///
    /// Invalid UTF-8 is skipped, or poisons the reader when
    /// [`DecodeConfig::strict_utf8`] is set.
    pub fn read_string(&mut self) -> String {
        if !self.expect_wire_type(WireType::Len) {
            return String::new();
        }
        let len = self.read_length();
        if self.config.strict_utf8 {
            self.decoder.read_string_strict(len)
        } else {
            self.decoder.read_string(len)
        }
    }

    /// Reads a `bytes` field as a zero-copy view of the input.
    pub fn read_bytes(&mut self) -> Bytes {
        if !self.expect_wire_type(WireType::Len) {
            return Bytes::new();
        }
        let len = self.read_length();
        self.decoder.read_bytes(len)
    }

    /// Reads a packed repeated field.
    pub fn read_packed<T: Scalar>(&mut self) -> Vec<T> {
        let mut values = Vec::new();
        self.read_packed_into(&mut values);
        values
    }

    /// Reads a packed repeated field, appending the values to `dst`.
    pub fn read_packed_into<T: Scalar>(&mut self, dst: &mut Vec<T>) {
        if !self.expect_wire_type(WireType::Len) {
            return;
        }
        let len = self.read_length();
        if self.decoder.error() {
            return;
        }

        if let Some(width) = T::FIXED_WIDTH {
            if len % width != 0 {
                #[allow(clippy::cast_possible_truncation)]
                self.decoder.poison(DecodeErrorKind::InvalidPackedLength {
                    expected_multiple: width as u32,
                    actual: u32::try_from(len).unwrap_or(u32::MAX),
                });
                return;
            }
            dst.reserve(len / width);
        }

        let outer_end = self.decoder.end();
        let inner_end = self.decoder.cursor() + len;
        self.decoder.set_end(inner_end);
        while !self.decoder.at_end() {
            let value = T::read(&mut self.decoder);
            if self.decoder.error() {
                break;
            }
            dst.push(value);
        }
        self.decoder.set_end(outer_end);
        self.decoder.set_cursor(inner_end);
    }

    /// Reads one occurrence of a repeated scalar field, accepting both the packed and
    /// the one-value-per-tag encoding.
    pub fn read_repeated_into<T: Scalar>(&mut self, dst: &mut Vec<T>) {
        if self.is_delimited() {
            self.read_packed_into(dst);
        } else {
            let value = self.read_scalar();
            if !self.decoder.error() {
                dst.push(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::MAXIMUM_FIELD_NUMBER;
    use crate::encoder::Encoder;

    fn key(field: u32, wire_type: WireType) -> u32 {
        (field << 3) | u32::from(wire_type.into_val())
    }

    #[test]
    fn test_read_300() {
        let mut reader = Reader::new(&[0x08u8, 0xAC, 0x02]);
        assert!(reader.next_field());
        assert_eq!(reader.field_number(), 1);
        assert_eq!(reader.wire_type(), Some(WireType::Varint));
        assert_eq!(reader.read_uint32(), 300);
        assert!(!reader.next_field());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_invalid_keys_poison() {
        #[track_caller]
        fn test_case(bytes: &[u8], expected: DecodeErrorKind) {
            let mut reader = Reader::new(bytes);
            assert!(!reader.next_field());
            let err = reader.status().unwrap_err();
            assert_eq!(err.kind(), expected);
            assert_eq!(err.offset(), 0);
        }

        test_case(&[0x0E, 0x00], DecodeErrorKind::InvalidWireType { value: 6 });
        test_case(&[0x0F, 0x00], DecodeErrorKind::InvalidWireType { value: 7 });
        test_case(&[0x00, 0x00], DecodeErrorKind::InvalidFieldNumber { value: 0 });
        test_case(&[0x88], DecodeErrorKind::UnexpectedEndOfBuffer);
    }

    #[test]
    fn test_over_wide_keys_poison() {
        #[track_caller]
        fn test_case(bytes: &[u8], field: u32) {
            let mut reader = Reader::new(bytes);
            assert!(!reader.next_field());
            let err = reader.finish().unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::InvalidFieldNumber { value: field });
            assert_eq!(err.offset(), 0);
        }

        // Bits 32..=34 of the key are set, the low 32 bits alone look like field
        // 2^29-1.
        test_case(&[0xF8, 0xFF, 0xFF, 0xFF, 0x7F, 0x05], u32::MAX);
        // Key 2^32 + 8, the low 32 bits alone look like field 1.
        test_case(&[0x88, 0x80, 0x80, 0x80, 0x10, 0x07], (1 << 29) | 1);
        // Past bit 35 the field number saturates.
        test_case(&[0x88, 0x80, 0x80, 0x80, 0x80, 0x01, 0x07], u32::MAX);

        // The largest valid field number in the longest minimal key still reads.
        let mut reader = Reader::new(&[0xF8u8, 0xFF, 0xFF, 0xFF, 0x0F, 0x05]);
        assert!(reader.next_field());
        assert_eq!(reader.field_number(), MAXIMUM_FIELD_NUMBER);
        assert_eq!(reader.read_uint32(), 5);
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn test_skip_every_wire_type() {
        let mut encoder = Encoder::new();
        encoder.write_unsigned_varint32(key(1, WireType::Varint));
        encoder.write_unsigned_varint64(u64::MAX);
        encoder.write_unsigned_varint32(key(2, WireType::I64));
        encoder.write_uint64(7);
        encoder.write_unsigned_varint32(key(3, WireType::Len));
        encoder.write_unsigned_varint32(3);
        encoder.write_string("abc");
        encoder.write_unsigned_varint32(key(4, WireType::SGroup));
        encoder.write_unsigned_varint32(key(5, WireType::I32));
        encoder.write_uint32(9);
        encoder.write_unsigned_varint32(key(4, WireType::EGroup));
        encoder.write_unsigned_varint32(key(6, WireType::Varint));
        encoder.write_unsigned_varint32(42);

        let mut reader = Reader::new(encoder.end());
        let mut seen = Vec::new();
        while reader.next_field() {
            seen.push(reader.field_number());
            if reader.field_number() == 6 {
                assert_eq!(reader.read_uint32(), 42);
            } else {
                reader.skip_field();
            }
        }
        assert!(reader.finish().is_ok());
        assert_eq!(seen, [1, 2, 3, 4, 6]);
    }

    #[test]
    fn test_field_bytes_covers_skipped_group() {
        let bytes = [0x0Bu8, 0x15, 0x01, 0x00, 0x00, 0x00, 0x0C, 0x18, 0x01];
        let mut reader = Reader::new(&bytes);
        assert!(reader.next_field());
        reader.skip_field();
        assert_eq!(reader.field_number(), 1);
        assert_eq!(&reader.field_bytes()[..], &bytes[..7]);

        assert!(reader.next_field());
        assert_eq!(reader.read_uint32(), 1);
        assert_eq!(&reader.field_bytes()[..], &bytes[7..]);
    }

    #[test]
    fn test_group_errors() {
        #[track_caller]
        fn test_case(bytes: &[u8], expected: DecodeErrorKind) {
            let mut reader = Reader::new(bytes);
            while reader.next_field() {
                reader.skip_field();
            }
            assert_eq!(reader.status().unwrap_err().kind(), expected);
        }

        // Start group 1, end group 2.
        test_case(
            &[0x0B, 0x14],
            DecodeErrorKind::UnmatchedEndGroup {
                expected: 1,
                actual: 2,
            },
        );
        // Start group 1 with no end.
        test_case(&[0x0B, 0x08, 0x01], DecodeErrorKind::UnterminatedGroup { field: 1 });
        // End group without a start.
        test_case(&[0x0C], DecodeErrorKind::StrayEndGroup { field: 1 });
    }

    #[test]
    fn test_recursion_limit() {
        // Ten nested start-group tags for field 1.
        let bytes = [0x0Bu8; 10];

        let mut config = DecodeConfig::new();
        config.max_depth(4);
        let mut reader = Reader::with_config(&bytes, config);
        assert!(reader.next_field());
        reader.skip_field();
        assert_eq!(
            reader.status().unwrap_err().kind(),
            DecodeErrorKind::RecursionLimitExceeded { limit: 4 }
        );
    }

    #[test]
    fn test_length_overflow() {
        // Field 1, length 5, only 2 bytes follow.
        let mut reader = Reader::new(&[0x0Au8, 0x05, 0x61, 0x62]);
        assert!(reader.next_field());
        assert_eq!(reader.read_string(), "");
        let err = reader.status().unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::LengthOverflow { value: 5 });
        assert_eq!(err.offset(), 1);
    }

    #[test]
    fn test_unexpected_wire_type() {
        let mut reader = Reader::new(&[0x08u8, 0x01, 0x10, 0x02]);
        assert!(reader.next_field());
        assert_eq!(reader.read_string(), "");
        assert!(!reader.next_field());
        assert_eq!(
            reader.status().unwrap_err().kind(),
            DecodeErrorKind::UnexpectedWireType {
                field: 1,
                expected: WireType::Len,
                actual: WireType::Varint,
            }
        );
    }

    #[test]
    fn test_read_message_restores_window() {
        // Field 1: submessage { field 1: 150 }, then field 2: 7.
        let bytes = [0x0Au8, 0x03, 0x08, 0x96, 0x01, 0x10, 0x07];
        let mut reader = Reader::new(&bytes);

        let mut inner = 0u32;
        let mut outer = 0u32;
        while reader.next_field() {
            match reader.field_number() {
                1 => reader.read_message(&mut inner, |inner, reader| {
                    while reader.next_field() {
                        match reader.field_number() {
                            1 => *inner = reader.read_uint32(),
                            _ => reader.skip_field(),
                        }
                    }
                }),
                2 => outer = reader.read_uint32(),
                _ => reader.skip_field(),
            }
        }
        assert!(reader.finish().is_ok());
        assert_eq!(inner, 150);
        assert_eq!(outer, 7);
    }

    #[test]
    fn test_read_group() {
        // Group 2 { field 1: 5 }, then field 3: 1.
        let bytes = [0x13u8, 0x08, 0x05, 0x14, 0x18, 0x01];
        let mut reader = Reader::new(&bytes);
        let mut inner = 0u32;
        let mut after = false;
        while reader.next_field() {
            match reader.field_number() {
                2 => reader.read_group(&mut inner, |inner, reader| {
                    while reader.next_field() && !reader.is_end_group() {
                        match reader.field_number() {
                            1 => *inner = reader.read_uint32(),
                            _ => reader.skip_field(),
                        }
                    }
                }),
                3 => after = reader.read_bool(),
                _ => reader.skip_field(),
            }
        }
        assert!(reader.finish().is_ok());
        assert_eq!(inner, 5);
        assert!(after);
    }

    #[test]
    fn test_packed_and_repeated() {
        // Field 4 packed [3, 270, 86942], then two unpacked entries.
        let bytes = [
            0x22u8, 0x06, 0x03, 0x8E, 0x02, 0x9E, 0xA7, 0x05, 0x20, 0x01, 0x20, 0x02,
        ];
        let mut reader = Reader::new(&bytes);
        let mut values: Vec<u32> = Vec::new();
        while reader.next_field() {
            reader.read_repeated_into(&mut values);
        }
        assert!(reader.finish().is_ok());
        assert_eq!(values, [3, 270, 86942, 1, 2]);
    }

    #[test]
    fn test_packed_fixed_length_must_be_multiple() {
        let mut reader = Reader::new(&[0x0Au8, 0x03, 0x00, 0x00, 0x00]);
        assert!(reader.next_field());
        assert!(reader.read_packed::<Fixed32>().is_empty());
        assert_eq!(
            reader.status().unwrap_err().kind(),
            DecodeErrorKind::InvalidPackedLength {
                expected_multiple: 4,
                actual: 3,
            }
        );
    }

    #[test]
    fn test_packed_varint_truncated() {
        // Packed run of 2 bytes ending mid varint, more data after it.
        let mut reader = Reader::new(&[0x0Au8, 0x02, 0x01, 0x80, 0x01]);
        assert!(reader.next_field());
        let values = reader.read_packed::<u32>();
        assert_eq!(values, [1]);
        assert_eq!(
            reader.status().unwrap_err().kind(),
            DecodeErrorKind::UnexpectedEndOfBuffer
        );
    }

    #[test]
    fn test_strict_utf8() {
        let bytes = [0x0Au8, 0x03, 0x61, 0x80, 0x62];

        let mut reader = Reader::new(&bytes);
        assert!(reader.next_field());
        assert_eq!(reader.read_string(), "ab");
        assert!(reader.finish().is_ok());

        let mut config = DecodeConfig::new();
        config.strict_utf8(true);
        let mut reader = Reader::with_config(&bytes, config);
        assert!(reader.next_field());
        assert_eq!(reader.read_string(), "");
        assert_eq!(
            reader.finish().unwrap_err().kind(),
            DecodeErrorKind::InvalidUtf8
        );
    }

    #[test]
    fn test_decimal_strings() {
        let mut encoder = Encoder::new();
        encoder.write_unsigned_varint32(key(1, WireType::Varint));
        encoder.write_signed_varint64(i64::MIN);
        encoder.write_unsigned_varint32(key(2, WireType::I64));
        encoder.write_uint64(u64::MAX);
        encoder.write_unsigned_varint32(key(3, WireType::Varint));
        encoder.write_zigzag_varint64(-5);

        let mut reader = Reader::new(encoder.end());
        assert!(reader.next_field());
        assert_eq!(reader.read_int64_string(), "-9223372036854775808");
        assert!(reader.next_field());
        assert_eq!(reader.read_fixed64_string(), "18446744073709551615");
        assert!(reader.next_field());
        assert_eq!(reader.read_sint64_string(), "-5");
        assert!(reader.finish().is_ok());
    }

    #[test]
    #[should_panic(expected = "next_field")]
    fn test_read_without_field_panics() {
        let mut reader = Reader::new(&[0x08u8, 0x01]);
        reader.read_uint32();
    }

    #[test]
    fn test_pooled_reader_is_reset() {
        let mut reader = Reader::alloc(&[0x0Eu8]);
        assert!(!reader.next_field());
        assert!(reader.error());
        reader.free();

        let mut reader = Reader::alloc(&[0x08u8, 0x01]);
        assert!(!reader.error());
        assert_eq!(reader.field_key(), None);
        assert!(reader.next_field());
        assert_eq!(reader.read_uint32(), 1);
        reader.free();
    }
}
