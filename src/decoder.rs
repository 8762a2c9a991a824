//! Cursor over an immutable byte buffer that decodes wire primitives.
//!
//! Reads never fail individually. The first malformed or out-of-range read poisons the
//! decoder, records a [`DecodeError`], and every read after that returns a zero value
//! without touching the buffer. Check [`Decoder::status`] once the pass is done.

use bytes::Bytes;

use crate::arith::{Int64, UInt64};
use crate::buffer::ByteSource;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::leb128::{skip_leb128, LebCodec};
use crate::pool::InstancePool;
use crate::split::{
    join_float32, join_float64, join_int64, join_uint64, join_zigzag64, zigzag_decode_32, Split64,
};
use crate::util::unlikely;

thread_local! {
    static DECODER_POOL: InstancePool<Decoder> = const { InstancePool::new() };
}

#[derive(Debug, Clone, Default)]
pub struct Decoder {
    bytes: Bytes,
    start: usize,
    end: usize,
    cursor: usize,
    error: Option<DecodeError>,
}

impl Decoder {
    /// Creates a decoder over the whole of `source`.
    ///
    /// A source that cannot be normalized (e.g. malformed base64) yields an empty,
    /// already poisoned decoder.
    pub fn new<'a>(source: impl Into<ByteSource<'a>>) -> Self {
        let mut decoder = Decoder::default();
        decoder.set_block(source);
        decoder
    }

    /// Like [`Decoder::new`], but reuses an instance from this thread's pool if one is
    /// available.
    pub fn alloc<'a>(source: impl Into<ByteSource<'a>>) -> Self {
        let mut decoder = DECODER_POOL
            .try_with(InstancePool::take)
            .ok()
            .flatten()
            .unwrap_or_default();
        decoder.set_block(source);
        decoder
    }

    /// Clears this decoder and returns it to this thread's pool.
    pub fn free(mut self) {
        self.clear();
        // The pool is gone during thread teardown, the instance is dropped instead.
        let _ = DECODER_POOL.try_with(move |pool| pool.release(self));
    }

    /// Replaces the underlying buffer, resetting the window, cursor, and error state.
    pub fn set_block<'a>(&mut self, source: impl Into<ByteSource<'a>>) {
        self.error = None;
        match source.into().into_bytes() {
            Ok(bytes) => {
                self.start = 0;
                self.end = bytes.len();
                self.cursor = 0;
                self.bytes = bytes;
            }
            Err(kind) => {
                self.bytes = Bytes::new();
                self.start = 0;
                self.end = 0;
                self.cursor = 0;
                self.poison(kind);
            }
        }
    }

    /// Restricts decoding to `start..end` of the underlying buffer and moves the cursor
    /// to `start`.
    ///
    /// # Panics
    ///
    /// Panics if the range is inverted or extends past the buffer.
    pub fn set_window(&mut self, start: usize, end: usize) {
        assert!(
            start <= end && end <= self.bytes.len(),
            "window {start}..{end} out of bounds for buffer of {} bytes",
            self.bytes.len()
        );
        self.start = start;
        self.end = end;
        self.cursor = start;
    }

    /// Drops the buffer and resets everything.
    pub fn clear(&mut self) {
        *self = Decoder::default();
    }

    /// Rewinds the cursor to the start of the window and clears the error state.
    pub fn reset(&mut self) {
        self.cursor = self.start;
        self.error = None;
    }

    /// The whole underlying buffer, ignoring the window.
    pub fn buffer(&self) -> &Bytes {
        &self.bytes
    }

    /// Bytes between the cursor and the end of the window.
    pub fn remaining(&self) -> &[u8] {
        &self.bytes[self.cursor.min(self.end)..self.end]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// # Panics
    ///
    /// Panics if `cursor` is outside of the current window.
    pub fn set_cursor(&mut self, cursor: usize) {
        assert!(
            (self.start..=self.end).contains(&cursor),
            "cursor {cursor} outside of window {}..{}",
            self.start,
            self.end
        );
        self.cursor = cursor;
    }

    /// Moves the cursor forward, poisoning the decoder if that would pass the end.
    pub fn advance(&mut self, count: usize) {
        if unlikely(count > self.end.saturating_sub(self.cursor)) {
            self.poison(DecodeErrorKind::UnexpectedEndOfBuffer);
            return;
        }
        self.cursor += count;
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Moves the end of the window.
    ///
    /// # Panics
    ///
    /// Panics if `end` is before the start of the window or past the buffer.
    pub fn set_end(&mut self, end: usize) {
        assert!(
            self.start <= end && end <= self.bytes.len(),
            "end {end} out of bounds for window starting at {} in buffer of {} bytes",
            self.start,
            self.bytes.len()
        );
        self.end = end;
    }

    pub fn at_end(&self) -> bool {
        self.cursor >= self.end
    }

    pub fn past_end(&self) -> bool {
        self.cursor > self.end
    }

    /// Whether any read so far has failed.
    pub fn error(&self) -> bool {
        self.error.is_some()
    }

    /// The first failure recorded, if any.
    pub fn last_error(&self) -> Option<DecodeError> {
        self.error
    }

    pub fn status(&self) -> Result<(), DecodeError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Records `kind` at the current cursor unless an earlier failure was recorded.
    pub(crate) fn poison(&mut self, kind: DecodeErrorKind) {
        self.poison_at(kind, self.cursor);
    }

    pub(crate) fn poison_at(&mut self, kind: DecodeErrorKind, offset: usize) {
        if self.error.is_none() {
            tracing::debug!(%kind, offset, "decoder poisoned");
            self.error = Some(DecodeError::new(kind, offset));
        }
        self.cursor = self.end;
    }

    #[inline]
    fn varint<T: LebCodec>(&mut self) -> Option<T> {
        if unlikely(self.error.is_some()) {
            return None;
        }
        match T::decode_leb128(self.remaining()) {
            Ok((value, len)) => {
                self.cursor += len;
                Some(value)
            }
            Err(kind) => {
                self.poison(kind);
                None
            }
        }
    }

    #[inline]
    fn fixed<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        if unlikely(self.error.is_some()) {
            return out;
        }
        match self.remaining().get(..N) {
            Some(slice) => {
                out.copy_from_slice(slice);
                self.cursor += N;
            }
            None => self.poison(DecodeErrorKind::UnexpectedEndOfBuffer),
        }
        out
    }

    /// Takes the next `len` bytes as a zero-copy view.
    fn take(&mut self, len: usize) -> Option<Bytes> {
        if unlikely(self.error.is_some()) {
            return None;
        }
        if unlikely(len > self.remaining().len()) {
            self.poison(DecodeErrorKind::UnexpectedEndOfBuffer);
            return None;
        }
        let view = self.bytes.slice(self.cursor..self.cursor + len);
        self.cursor += len;
        Some(view)
    }

    /// Reads the low 32 bits of a varint.
    pub fn read_unsigned_varint32(&mut self) -> u32 {
        self.varint::<u32>().unwrap_or(0)
    }

    /// Reads an `int32` varint, which is sign extended to ten bytes when negative.
    pub fn read_signed_varint32(&mut self) -> i32 {
        #[allow(clippy::cast_possible_wrap)]
        let value = self.read_unsigned_varint32() as i32;
        value
    }

    pub fn read_zigzag_varint32(&mut self) -> i32 {
        zigzag_decode_32(self.read_unsigned_varint32())
    }

    pub fn read_split_varint64(&mut self) -> Split64 {
        self.varint::<Split64>().unwrap_or_default()
    }

    /// Reads a zigzag varint and undoes the zigzag mapping, keeping both halves.
    pub fn read_split_zigzag_varint64(&mut self) -> Split64 {
        self.read_split_varint64().zigzag_decode()
    }

    pub fn read_unsigned_varint64(&mut self) -> u64 {
        join_uint64(self.read_split_varint64())
    }

    pub fn read_signed_varint64(&mut self) -> i64 {
        join_int64(self.read_split_varint64())
    }

    pub fn read_zigzag_varint64(&mut self) -> i64 {
        join_zigzag64(self.read_split_varint64())
    }

    pub fn read_unsigned_varint64_string(&mut self) -> String {
        UInt64::from(self.read_split_varint64()).to_string()
    }

    pub fn read_signed_varint64_string(&mut self) -> String {
        Int64::from(self.read_split_varint64()).to_string()
    }

    pub fn read_zigzag_varint64_string(&mut self) -> String {
        Int64::from(self.read_split_zigzag_varint64()).to_string()
    }

    pub fn read_uint8(&mut self) -> u8 {
        u8::from_le_bytes(self.fixed())
    }

    pub fn read_uint16(&mut self) -> u16 {
        u16::from_le_bytes(self.fixed())
    }

    pub fn read_uint32(&mut self) -> u32 {
        u32::from_le_bytes(self.fixed())
    }

    /// Reads 8 little-endian bytes as two 32-bit halves.
    pub fn read_split_fixed64(&mut self) -> Split64 {
        let lo = self.read_uint32();
        let hi = self.read_uint32();
        Split64::new(lo, hi)
    }

    pub fn read_uint64(&mut self) -> u64 {
        join_uint64(self.read_split_fixed64())
    }

    pub fn read_uint64_string(&mut self) -> String {
        UInt64::from(self.read_split_fixed64()).to_string()
    }

    pub fn read_int8(&mut self) -> i8 {
        i8::from_le_bytes(self.fixed())
    }

    pub fn read_int16(&mut self) -> i16 {
        i16::from_le_bytes(self.fixed())
    }

    pub fn read_int32(&mut self) -> i32 {
        i32::from_le_bytes(self.fixed())
    }

    pub fn read_int64(&mut self) -> i64 {
        join_int64(self.read_split_fixed64())
    }

    pub fn read_int64_string(&mut self) -> String {
        Int64::from(self.read_split_fixed64()).to_string()
    }

    pub fn read_float(&mut self) -> f32 {
        // Every value join_float32 produces is exactly representable as an f32.
        #[allow(clippy::cast_possible_truncation)]
        let value = join_float32(self.read_uint32()) as f32;
        value
    }

    pub fn read_double(&mut self) -> f64 {
        join_float64(self.read_split_fixed64())
    }

    /// Reads a varint of any width, `true` if it is non-zero.
    pub fn read_bool(&mut self) -> bool {
        !self.read_split_varint64().is_zero()
    }

    pub fn read_enum(&mut self) -> i32 {
        self.read_signed_varint32()
    }

    /// Decodes `len` bytes of UTF-8, skipping malformed sequences.
    ///
    /// Stray continuation bytes and bytes that can never start a sequence are dropped.
    /// When a lead byte isn't followed by enough continuation bytes, only the lead byte
    /// is dropped and decoding resumes at the byte after it, so a valid character right
    /// after a truncated sequence survives. Sequences that decode to a surrogate or past
    /// U+10FFFF become U+FFFD.
    pub fn read_string(&mut self, len: usize) -> String {
        match self.take(len) {
            Some(bytes) => match core::str::from_utf8(&bytes) {
                Ok(valid) => valid.to_owned(),
                Err(_) => decode_utf8_lenient(&bytes),
            },
            None => String::new(),
        }
    }

    /// Decodes `len` bytes of UTF-8, poisoning the decoder if they are not valid.
    pub fn read_string_strict(&mut self, len: usize) -> String {
        let offset = self.cursor;
        match self.take(len) {
            Some(bytes) => match core::str::from_utf8(&bytes) {
                Ok(valid) => valid.to_owned(),
                Err(_) => {
                    self.poison_at(DecodeErrorKind::InvalidUtf8, offset);
                    String::new()
                }
            },
            None => String::new(),
        }
    }

    /// Returns a zero-copy view of the next `len` bytes.
    ///
    /// Poisons the decoder and returns an empty view if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Bytes {
        self.take(len).unwrap_or_default()
    }

    /// Advances past a varint without decoding it.
    pub fn skip_varint(&mut self) {
        if unlikely(self.error.is_some()) {
            return;
        }
        match skip_leb128(self.remaining()) {
            Ok(len) => self.cursor += len,
            Err(kind) => self.poison(kind),
        }
    }
}

fn decode_utf8_lenient(bytes: &[u8]) -> String {
    #[inline(always)]
    fn continuation(bytes: &[u8], idx: usize) -> Option<u32> {
        match bytes.get(idx) {
            Some(&b) if b & 0xC0 == 0x80 => Some(u32::from(b & 0x3F)),
            _ => None,
        }
    }

    let mut out = String::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let lead = bytes[idx];
        idx += 1;

        let (mut code_point, trailing) = match lead {
            0x00..=0x7F => {
                out.push(char::from(lead));
                continue;
            }
            0xC0..=0xDF => (u32::from(lead & 0x1F), 1),
            0xE0..=0xEF => (u32::from(lead & 0x0F), 2),
            0xF0..=0xF7 => (u32::from(lead & 0x07), 3),
            // Stray continuation bytes and 0xF8..=0xFF.
            _ => continue,
        };

        let mut complete = true;
        for offset in 0..trailing {
            match continuation(bytes, idx + offset) {
                Some(bits) => code_point = (code_point << 6) | bits,
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            // N.B. only the lead byte is dropped, whatever followed is decoded anew.
            continue;
        }
        idx += trailing;
        out.push(char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    out
}
