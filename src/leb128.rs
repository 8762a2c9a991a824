//! LEB128 variable-length integer encoding/decoding.
//!
//! 64-bit varints are decoded straight into a [`Split64`] without ever building a
//! `u64`: the first four bytes fill the low 28 bits of `lo`, the fifth byte straddles
//! the top 4 bits of `lo` and the bottom 3 bits of `hi`, and the remaining five bytes
//! fill `hi`.

use crate::error::DecodeErrorKind;
use crate::split::Split64;
use crate::util::likely;

/// Types that can be encoded as, and decoded from, a LEB128 encoded integer.
pub trait LebCodec: Sized + Copy {
    /// Maximum number of bytes a well-formed encoding occupies on the wire.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 variable length integer from the front of `data`.
    ///
    /// Returns the decoded value and the number of bytes it occupied.
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind>;

    /// Encode `self` into the provided buffer, returning the number of bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

#[inline(always)]
fn byte_at(data: &[u8], idx: usize) -> Result<u8, DecodeErrorKind> {
    data.get(idx)
        .copied()
        .ok_or(DecodeErrorKind::UnexpectedEndOfBuffer)
}

impl LebCodec for u32 {
    // Negative int32 values are sign extended to ten bytes.
    const MAX_LEB_BYTES: usize = 10;

    /// Decodes the low 32 bits of a varint.
    ///
    /// The fifth byte only contributes its low 4 bits. If it still has the
    /// continuation bit set the remaining bytes, up to ten in total, are consumed and
    /// discarded.
    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind> {
        // Byte 1.
        let mut b = byte_at(data, 0)?;
        let mut value = u32::from(b & 0x7F);
        if likely(b < 0x80) {
            return Ok((value, 1));
        }

        // Byte 2.
        b = byte_at(data, 1)?;
        value |= u32::from(b & 0x7F) << 7;
        if b < 0x80 {
            return Ok((value, 2));
        }

        // Byte 3.
        b = byte_at(data, 2)?;
        value |= u32::from(b & 0x7F) << 14;
        if b < 0x80 {
            return Ok((value, 3));
        }

        // Byte 4.
        b = byte_at(data, 3)?;
        value |= u32::from(b & 0x7F) << 21;
        if b < 0x80 {
            return Ok((value, 4));
        }

        // Byte 5, only 4 payload bits fit.
        b = byte_at(data, 4)?;
        value |= u32::from(b & 0x0F) << 28;
        if b < 0x80 {
            return Ok((value, 5));
        }

        // Bytes 6 to 10 only carry bits above 32.
        for idx in 5..Self::MAX_LEB_BYTES {
            if byte_at(data, idx)? < 0x80 {
                return Ok((value, idx + 1));
            }
        }

        // Uh oh! We've read 10 bytes and didn't find the final byte.
        Err(DecodeErrorKind::InvalidVarInt)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut written = 1;
        while value > 0x7F {
            buf.put_u8((value as u8 & 0x7F) | 0x80);
            value >>= 7;
            written += 1;
        }
        buf.put_u8(value as u8);
        written
    }

    /// Compute the LEB128 encoded length using leading_zeros.
    ///
    /// For u32: significant_bits = 32 - leading_zeros
    /// bytes = ceil((32 - lz) / 7), minimum 1.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        // Lookup table mapping leading_zeros (0-32) to LEB128 byte count.
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 33] = [
            5, 5, 5, 5,                         // 0-3:   32-29 bits -> 5 bytes
            4, 4, 4, 4, 4, 4, 4,                // 4-10:  28-22 bits -> 4 bytes
            3, 3, 3, 3, 3, 3, 3,                // 11-17: 21-15 bits -> 3 bytes
            2, 2, 2, 2, 2, 2, 2,                // 18-24: 14-8 bits  -> 2 bytes
            1, 1, 1, 1, 1, 1, 1, 1,             // 25-32: 7-0 bits   -> 1 byte
        ];

        usize::from(LZ_TO_LEN[self.leading_zeros() as usize])
    }
}

impl LebCodec for Split64 {
    const MAX_LEB_BYTES: usize = 10;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeErrorKind> {
        let mut lo: u32 = 0;
        let mut hi: u32 = 0;

        // Bytes 1 to 4 fill the low 28 bits of `lo`.
        for idx in 0..4 {
            let b = byte_at(data, idx)?;
            lo |= u32::from(b & 0x7F) << (idx * 7);
            if b < 0x80 {
                return Ok((Split64::new(lo, hi), idx + 1));
            }
        }

        // Byte 5 straddles both halves: 4 bits on top of `lo`, 3 bits at the bottom of
        // `hi`.
        let b = byte_at(data, 4)?;
        lo |= u32::from(b & 0x7F) << 28;
        hi |= u32::from(b & 0x7F) >> 4;
        if b < 0x80 {
            return Ok((Split64::new(lo, hi), 5));
        }

        // Bytes 6 to 10 fill `hi` starting at bit 3. Only the lowest bit of byte 10
        // still fits, the rest is shifted out.
        for idx in 5..Self::MAX_LEB_BYTES {
            let b = byte_at(data, idx)?;
            #[allow(clippy::cast_possible_truncation)]
            let shift = ((idx - 5) * 7 + 3) as u32;
            hi |= u32::from(b & 0x7F) << shift;
            if b < 0x80 {
                return Ok((Split64::new(lo, hi), idx + 1));
            }
        }

        // Uh oh! We've read 10 bytes and didn't find the final byte.
        Err(DecodeErrorKind::InvalidVarInt)
    }

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let Split64 { mut lo, mut hi } = self;
        let mut written = 1;
        while hi > 0 || lo > 0x7F {
            buf.put_u8((lo as u8 & 0x7F) | 0x80);
            lo = (lo >> 7) | (hi << 25);
            hi >>= 7;
            written += 1;
        }
        buf.put_u8(lo as u8);
        written
    }

    /// Compute the LEB128 encoded length from the combined leading zeros of both halves.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        // Lookup table mapping leading_zeros (0-64) to LEB128 byte count.
        // Index 64 (value 0) maps to 1 byte.
        // Index 0 (all 64 bits used) maps to 10 bytes.
        #[rustfmt::skip]
        const LZ_TO_LEN: [u8; 65] = [
            10,                                         // 0:     64 bits -> 10 bytes
            9, 9, 9, 9, 9, 9, 9,                        // 1-7:   63-57 bits -> 9 bytes
            8, 8, 8, 8, 8, 8, 8,                        // 8-14:  56-50 bits -> 8 bytes
            7, 7, 7, 7, 7, 7, 7,                        // 15-21: 49-43 bits -> 7 bytes
            6, 6, 6, 6, 6, 6, 6,                        // 22-28: 42-36 bits -> 6 bytes
            5, 5, 5, 5, 5, 5, 5,                        // 29-35: 35-29 bits -> 5 bytes
            4, 4, 4, 4, 4, 4, 4,                        // 36-42: 28-22 bits -> 4 bytes
            3, 3, 3, 3, 3, 3, 3,                        // 43-49: 21-15 bits -> 3 bytes
            2, 2, 2, 2, 2, 2, 2,                        // 50-56: 14-8 bits  -> 2 bytes
            1, 1, 1, 1, 1, 1, 1, 1,                     // 57-64: 7-0 bits   -> 1 byte
        ];

        let lz = if self.hi == 0 {
            32 + self.lo.leading_zeros()
        } else {
            self.hi.leading_zeros()
        };
        usize::from(LZ_TO_LEN[lz as usize])
    }
}

/// Returns the length of the varint at the front of `data` without decoding it.
#[inline]
pub fn skip_leb128(data: &[u8]) -> Result<usize, DecodeErrorKind> {
    for idx in 0..Split64::MAX_LEB_BYTES {
        if byte_at(data, idx)? < 0x80 {
            return Ok(idx + 1);
        }
    }
    Err(DecodeErrorKind::InvalidVarInt)
}
