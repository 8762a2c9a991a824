//! A protobuf binary wire format codec.
//!
//! The crate is layered bottom up:
//!
//! * [`arith`] and [`split`] do exact 64-bit arithmetic on pairs of 32-bit halves and
//!   split integers and floats into those halves.
//! * [`leb128`] and [`wire`] encode varints, field keys, and wire types.
//! * [`decoder::Decoder`] and [`encoder::Encoder`] read and write raw values.
//! * [`reader::Reader`] and [`writer::Writer`] work in terms of fields, including
//!   submessages, groups, and packed repeated fields.
//! * [`message`] stores and (de)serializes whole messages described by a
//!   [`MessageLayout`](message::MessageLayout).
//!
//! Malformed input never panics. The first failure poisons the decoder or reader, every
//! later read returns a zero value, and the failure is reported once the pass ends:
//!
//! ```
//! use binproto::error::DecodeErrorKind;
//! use binproto::reader::Reader;
//!
//! // Field 1 claims 5 bytes, only 1 follows.
//! let mut reader = Reader::new(&[0x0Au8, 0x05, 0x61]);
//! while reader.next_field() {
//!     reader.skip_field();
//! }
//! let err = reader.finish().unwrap_err();
//! assert_eq!(err.kind(), DecodeErrorKind::LengthOverflow { value: 5 });
//! ```

pub mod arith;
pub mod buffer;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
// Publically export `leb128` because the functions are useful on their own.
pub mod leb128;
pub mod message;
pub mod pool;
pub mod reader;
pub mod scalar;
pub mod split;
pub mod wire;
pub mod writer;

mod util;

pub use crate::buffer::ByteSource;
pub use crate::config::DecodeConfig;
pub use crate::error::{DecodeError, DecodeErrorKind};
pub use crate::message::{Message, Record, Value};
pub use crate::reader::Reader;
pub use crate::writer::Writer;
