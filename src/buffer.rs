//! Byte sources accepted at the decoder boundary.
//!
//! Every input is normalized to a single [`Bytes`] view before decoding starts, so the
//! decoder only ever deals with one contiguous, cheaply cloneable buffer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use crate::error::DecodeErrorKind;

/// Input for a [`Decoder`](crate::decoder::Decoder) or [`Reader`](crate::reader::Reader).
#[derive(Debug, Clone)]
pub enum ByteSource<'a> {
    /// Borrowed bytes, copied once during normalization.
    Slice(&'a [u8]),
    /// Shared bytes, used as is.
    Bytes(Bytes),
    /// Owned bytes, moved into a [`Bytes`] without copying.
    Vec(Vec<u8>),
    /// Standard (padded) base64 text.
    Base64(&'a str),
}

impl ByteSource<'_> {
    /// Normalizes the source into a single contiguous view.
    pub fn into_bytes(self) -> Result<Bytes, DecodeErrorKind> {
        match self {
            ByteSource::Slice(slice) => Ok(Bytes::copy_from_slice(slice)),
            ByteSource::Bytes(bytes) => Ok(bytes),
            ByteSource::Vec(vec) => Ok(Bytes::from(vec)),
            ByteSource::Base64(text) => STANDARD
                .decode(text.trim())
                .map(Bytes::from)
                .map_err(|_| DecodeErrorKind::InvalidBase64),
        }
    }
}

impl<'a> From<&'a [u8]> for ByteSource<'a> {
    fn from(value: &'a [u8]) -> Self {
        ByteSource::Slice(value)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for ByteSource<'a> {
    fn from(value: &'a [u8; N]) -> Self {
        ByteSource::Slice(value.as_slice())
    }
}

impl<'a> From<&'a Vec<u8>> for ByteSource<'a> {
    fn from(value: &'a Vec<u8>) -> Self {
        ByteSource::Slice(value.as_slice())
    }
}

impl From<Vec<u8>> for ByteSource<'_> {
    fn from(value: Vec<u8>) -> Self {
        ByteSource::Vec(value)
    }
}

impl From<Bytes> for ByteSource<'_> {
    fn from(value: Bytes) -> Self {
        ByteSource::Bytes(value)
    }
}

/// Encodes `data` as standard (padded) base64.
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_normalize_to_same_bytes() {
        let raw = [0x08u8, 0xAC, 0x02];
        let expected = Bytes::from_static(&[0x08, 0xAC, 0x02]);

        assert_eq!(ByteSource::from(&raw).into_bytes().unwrap(), expected);
        assert_eq!(ByteSource::from(&raw[..]).into_bytes().unwrap(), expected);
        assert_eq!(ByteSource::from(raw.to_vec()).into_bytes().unwrap(), expected);
        assert_eq!(
            ByteSource::from(expected.clone()).into_bytes().unwrap(),
            expected
        );
        assert_eq!(ByteSource::Base64("CKwC").into_bytes().unwrap(), expected);
    }

    #[test]
    fn test_invalid_base64() {
        assert_eq!(
            ByteSource::Base64("not base64!").into_bytes(),
            Err(DecodeErrorKind::InvalidBase64)
        );
    }

    #[test]
    fn test_encode_base64() {
        assert_eq!(encode_base64(&[0x08, 0xAC, 0x02]), "CKwC");
        assert_eq!(encode_base64(b""), "");
        assert_eq!(encode_base64(b"hi"), "aGk=");
    }
}
