use thiserror::Error;

use crate::wire::WireType;

/// The reason a decode pass was poisoned.
///
/// [`Decoder`](crate::decoder::Decoder) and [`Reader`](crate::reader::Reader) never
/// return these from individual reads. The first failure is recorded and every later
/// read produces a zero value, the caller inspects the recorded kind once the pass is
/// over.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },
    #[error("invalid field number: {value}")]
    InvalidFieldNumber { value: u32 },
    #[error("invalid leb128 varint")]
    InvalidVarInt,
    #[error("unexpected end of buffer")]
    UnexpectedEndOfBuffer,
    #[error("length prefix {value} runs past the end of the enclosing buffer")]
    LengthOverflow { value: u64 },
    #[error("end-group tag for field {actual} does not match start-group field {expected}")]
    UnmatchedEndGroup { expected: u32, actual: u32 },
    #[error("group for field {field} is missing its end-group tag")]
    UnterminatedGroup { field: u32 },
    #[error("end-group tag for field {field} without a matching start-group")]
    StrayEndGroup { field: u32 },
    #[error("field {field} has wire type {actual:?}, expected {expected:?}")]
    UnexpectedWireType {
        field: u32,
        expected: WireType,
        actual: WireType,
    },
    #[error("packed field length {actual} is not a multiple of {expected_multiple}")]
    InvalidPackedLength { expected_multiple: u32, actual: u32 },
    #[error("message nesting exceeds the limit of {limit}")]
    RecursionLimitExceeded { limit: u32 },
    #[error("invalid base64 input")]
    InvalidBase64,
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// A poisoned decode pass, with the byte offset at which it was first detected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("{kind} (at offset {offset})")]
pub struct DecodeError {
    kind: DecodeErrorKind,
    offset: usize,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        DecodeError { kind, offset }
    }

    /// Returns what went wrong.
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Returns the cursor position at the time of the failure.
    pub fn offset(&self) -> usize {
        self.offset
    }
}
