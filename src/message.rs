//! Schema-driven messages.
//!
//! [`Message`] is implemented by anything that can write itself to a [`Writer`] and read
//! itself back from a [`Reader`]. [`Record`] implements it generically from a static
//! [`MessageLayout`], so a message type can be described without generated code:
//!
//! ```
//! use binproto::message::{FieldKind, FieldSpec, Message, MessageLayout, Record, Value};
//!
//! static PERSON: MessageLayout = MessageLayout {
//!     name: "Person",
//!     fields: &[
//!         FieldSpec::new(1, FieldKind::String),
//!         FieldSpec::new(2, FieldKind::Int32),
//!         FieldSpec::new(3, FieldKind::String).repeated(),
//!     ],
//!     oneofs: &[],
//! };
//!
//! let mut person = Record::new(&PERSON);
//! person.set_field(1, "Ada");
//! person.set_field(2, 36i32);
//! person.push_repeated(3, "ada@example.com");
//!
//! let bytes = person.serialize_binary();
//! let parsed = Record::parse(&PERSON, bytes.as_slice()).unwrap();
//! assert_eq!(parsed.get_field(2), Some(&Value::Int32(36)));
//! assert_eq!(parsed, person);
//! ```

use crate::buffer::ByteSource;
use crate::config::DecodeConfig;
use crate::error::DecodeError;
use crate::reader::Reader;
use crate::writer::Writer;

mod layout;
mod record;
mod value;

pub use layout::{FieldKind, FieldSpec, MessageLayout};
pub use record::Record;
pub use value::Value;

pub trait Message {
    /// Writes every field of `self` to `writer`.
    fn serialize_binary_to_writer(&self, writer: &mut Writer);

    /// Reads fields from `reader` into `self` until the reader's window ends or an
    /// end-group tag is reached. Errors are left on the reader.
    fn deserialize_binary_from_reader(&mut self, reader: &mut Reader);

    fn serialize_binary(&self) -> Vec<u8> {
        let mut writer = Writer::new();
        self.serialize_binary_to_writer(&mut writer);
        writer.result_buffer()
    }

    /// Merges the fields encoded in `source` into `self`.
    ///
    /// On error `self` may hold a partial merge, whose contents should not be trusted.
    fn merge_binary<'a>(&mut self, source: impl Into<ByteSource<'a>>) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        self.merge_binary_with_config(source, DecodeConfig::default())
    }

    fn merge_binary_with_config<'a>(
        &mut self,
        source: impl Into<ByteSource<'a>>,
        config: DecodeConfig,
    ) -> Result<(), DecodeError>
    where
        Self: Sized,
    {
        let mut reader = Reader::alloc(source);
        reader.set_config(config);
        self.deserialize_binary_from_reader(&mut reader);
        if reader.is_end_group() {
            // An end-group tag at the top level has no start, this poisons the reader.
            reader.skip_field();
        }
        let status = reader.status();
        reader.free();
        status
    }

    fn deserialize_binary<'a>(source: impl Into<ByteSource<'a>>) -> Result<Self, DecodeError>
    where
        Self: Default + Sized,
    {
        let mut message = Self::default();
        message.merge_binary(source)?;
        Ok(message)
    }
}

impl Message for Record {
    fn serialize_binary_to_writer(&self, writer: &mut Writer) {
        self.write_fields(writer);
    }

    fn deserialize_binary_from_reader(&mut self, reader: &mut Reader) {
        self.read_fields(reader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeErrorKind;

    /// A hand written message, the way generated code would look.
    #[derive(Debug, Default, PartialEq)]
    struct Pair {
        key: String,
        values: Vec<i64>,
        child: Option<Box<Pair>>,
    }

    impl Message for Pair {
        fn serialize_binary_to_writer(&self, writer: &mut Writer) {
            if !self.key.is_empty() {
                writer.write_string(1, &self.key);
            }
            writer.write_packed(2, &self.values);
            if let Some(child) = &self.child {
                writer.write_message(3, child.as_ref(), Pair::serialize_binary_to_writer);
            }
        }

        fn deserialize_binary_from_reader(&mut self, reader: &mut Reader) {
            while reader.next_field() && !reader.is_end_group() {
                match reader.field_number() {
                    1 => self.key = reader.read_string(),
                    2 => reader.read_repeated_into(&mut self.values),
                    3 => {
                        let child = self.child.get_or_insert_with(Box::default);
                        reader.read_message(child.as_mut(), Pair::deserialize_binary_from_reader);
                    }
                    _ => reader.skip_field(),
                }
            }
        }
    }

    #[test]
    fn test_hand_written_message() {
        let pair = Pair {
            key: "outer".to_owned(),
            values: vec![-1, 0, 1 << 40],
            child: Some(Box::new(Pair {
                key: "inner".to_owned(),
                ..Pair::default()
            })),
        };
        let bytes = pair.serialize_binary();
        assert_eq!(Pair::deserialize_binary(bytes.as_slice()).unwrap(), pair);
    }

    #[test]
    fn test_merge_appends_repeated() {
        let mut pair = Pair::deserialize_binary(&[0x10u8, 0x01]).unwrap();
        pair.merge_binary(&[0x10u8, 0x02, 0x0A, 0x01, 0x6B]).unwrap();
        assert_eq!(pair.values, [1, 2]);
        assert_eq!(pair.key, "k");
    }

    #[test]
    fn test_top_level_end_group() {
        let err = Pair::deserialize_binary(&[0x0Au8, 0x00, 0x14]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::StrayEndGroup { field: 2 });
        assert_eq!(err.offset(), 2);
    }

    #[test]
    fn test_config_is_applied() {
        // Three levels of field 3 submessages.
        let bytes = [0x1Au8, 0x04, 0x1A, 0x02, 0x1A, 0x00];
        assert!(Pair::deserialize_binary(&bytes).is_ok());

        let mut config = DecodeConfig::new();
        config.max_depth(2);
        let mut pair = Pair::default();
        let err = pair.merge_binary_with_config(&bytes, config).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::RecursionLimitExceeded { limit: 2 }
        );
    }
}
