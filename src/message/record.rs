//! Generic field storage for a message described by a [`MessageLayout`].

use std::collections::HashMap;

use crate::buffer::{encode_base64, ByteSource};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::reader::Reader;
use crate::scalar::{Fixed32, Fixed64, Scalar, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::wire::{MAXIMUM_FIELD_NUMBER, MINIMUM_FIELD_NUMBER};
use crate::writer::Writer;

use super::layout::{FieldKind, FieldSpec, MessageLayout};
use super::value::Value;

/// Marks an unbounded pivot, i.e. no extension has been stored.
const NO_PIVOT: u32 = u32::MAX;

/// Field values of one message.
///
/// Fields numbered below the pivot live in a dense array indexed by field number.
/// Extensions, any number above the layout's largest declared field, live in a map
/// that is only allocated once the first extension is stored. The pivot is the
/// smallest stored extension number.
#[derive(Clone)]
pub struct Record {
    layout: &'static MessageLayout,
    array: Vec<Option<Value>>,
    extensions: Option<HashMap<u32, Value>>,
    pivot: u32,
    frozen: bool,
    /// Encoded fields that the layout doesn't describe.
    unknown: Vec<u8>,
}

impl Record {
    pub fn new(layout: &'static MessageLayout) -> Self {
        Record {
            layout,
            array: Vec::new(),
            extensions: None,
            pivot: NO_PIVOT,
            frozen: false,
            unknown: Vec::new(),
        }
    }

    /// Builds a record from field values.
    ///
    /// Values are stored as given, so a oneof may end up with several members set. Each
    /// oneof is then repaired with [`Record::compute_oneof_case`].
    ///
    /// # Panics
    ///
    /// Panics if a value doesn't fit its declared field, see [`Record::set_field`].
    pub fn from_parts(
        layout: &'static MessageLayout,
        fields: impl IntoIterator<Item = (u32, Value)>,
    ) -> Self {
        let mut record = Record::new(layout);
        for (number, value) in fields {
            record.set_field(number, value);
        }
        for group in layout.oneofs {
            record.compute_oneof_case(group);
        }
        record
    }

    /// Parses `source` into a new record.
    pub fn parse<'a>(
        layout: &'static MessageLayout,
        source: impl Into<ByteSource<'a>>,
    ) -> Result<Self, DecodeError> {
        use super::Message;

        let mut record = Record::new(layout);
        record.merge_binary(source)?;
        Ok(record)
    }

    pub fn layout(&self) -> &'static MessageLayout {
        self.layout
    }

    /// The smallest field number routed to the extension map, `None` if no extension
    /// is stored.
    pub fn pivot(&self) -> Option<u32> {
        (self.pivot != NO_PIVOT).then_some(self.pivot)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Makes this record, and every record nested in it, immutable. Any later mutation
    /// panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
        for slot in &mut self.array {
            if let Some(value) = slot {
                freeze_value(value);
            }
        }
        for value in self.extensions.iter_mut().flat_map(HashMap::values_mut) {
            freeze_value(value);
        }
    }

    #[track_caller]
    fn assert_mutable(&self) {
        assert!(
            !self.frozen,
            "attempted to modify frozen message {}",
            self.layout.name
        );
    }

    fn is_extension(&self, number: u32) -> bool {
        number > self.layout.max_field_number()
    }

    pub fn get_field(&self, number: u32) -> Option<&Value> {
        if number < self.pivot {
            let index = array_index(number)?;
            self.array.get(index)?.as_ref()
        } else {
            self.extensions.as_ref()?.get(&number)
        }
    }

    pub fn has_field(&self, number: u32) -> bool {
        self.get_field(number).is_some()
    }

    fn value_mut(&mut self, number: u32) -> Option<&mut Value> {
        if number < self.pivot {
            let index = array_index(number)?;
            self.array.get_mut(index)?.as_mut()
        } else {
            self.extensions.as_mut()?.get_mut(&number)
        }
    }

    /// Values of a repeated field. Unset fields read as an empty slice, a singular value
    /// as a slice of one.
    pub fn get_repeated(&self, number: u32) -> &[Value] {
        match self.get_field(number) {
            None => &[],
            Some(Value::Repeated(values)) => values,
            Some(value) => core::slice::from_ref(value),
        }
    }

    /// Stores `value` in field `number` without touching the rest of its oneof, if any.
    ///
    /// # Panics
    ///
    /// Panics if the record is frozen, `number` is not a valid field number, or `value`
    /// doesn't fit the declared kind of the field. Repeated fields take a
    /// [`Value::Repeated`] whose elements all fit.
    #[track_caller]
    pub fn set_field(&mut self, number: u32, value: impl Into<Value>) {
        self.assert_mutable();
        let value = value.into();
        self.check_fits(number, &value);
        self.store(number, value);
    }

    /// Stores `value` in field `number` and clears the other members of its oneof.
    ///
    /// # Panics
    ///
    /// Panics if `number` doesn't belong to a oneof, and for the reasons listed on
    /// [`Record::set_field`].
    #[track_caller]
    pub fn set_oneof_field(&mut self, number: u32, value: impl Into<Value>) {
        let Some(group) = self.layout.oneof_for(number) else {
            panic!("field {number} of {} is not part of a oneof", self.layout.name);
        };
        self.assert_mutable();
        let value = value.into();
        self.check_fits(number, &value);
        for &other in group {
            if other != number {
                self.remove(other);
            }
        }
        self.store(number, value);
    }

    /// Appends `value` to a repeated field.
    ///
    /// # Panics
    ///
    /// Panics if the record is frozen, the field is declared but not repeated, or
    /// `value` doesn't fit the declared kind.
    #[track_caller]
    pub fn push_repeated(&mut self, number: u32, value: impl Into<Value>) {
        self.assert_mutable();
        check_field_number(number);
        let value = value.into();
        match self.layout.field(number) {
            Some(spec) => assert!(
                spec.repeated && value.fits(spec.kind),
                "{value:?} can't be appended to field {number} ({:?}) of {}",
                spec.kind,
                self.layout.name
            ),
            None => assert!(
                !matches!(value, Value::Repeated(_)),
                "repeated values can't nest, field {number} of {}",
                self.layout.name
            ),
        }
        self.repeated_mut(number).push(value);
    }

    /// The submessage in field `number`, created empty if unset.
    ///
    /// Creating the submessage clears the other members of its oneof.
    ///
    /// # Panics
    ///
    /// Panics if the record is frozen or the field is not a singular message or group.
    #[track_caller]
    pub fn message_mut(&mut self, number: u32) -> &mut Record {
        self.assert_mutable();
        let layout = match self.layout.field(number) {
            Some(spec) if !spec.repeated => spec.kind.layout(),
            _ => None,
        };
        let Some(layout) = layout else {
            panic!(
                "field {number} of {} is not a singular message",
                self.layout.name
            );
        };
        if !self.has_field(number) {
            if let Some(group) = self.layout.oneof_for(number) {
                for &other in group {
                    self.remove(other);
                }
            }
            self.store(number, Value::Message(Record::new(layout)));
        }
        match self.value_mut(number) {
            Some(Value::Message(record)) => record,
            _ => unreachable!("field {number} holds a message"),
        }
    }

    /// Removes field `number`, returning its value.
    ///
    /// # Panics
    ///
    /// Panics if the record is frozen.
    #[track_caller]
    pub fn clear_field(&mut self, number: u32) -> Option<Value> {
        self.assert_mutable();
        self.remove(number)
    }

    /// Removes every field and all preserved unknown fields.
    ///
    /// # Panics
    ///
    /// Panics if the record is frozen.
    #[track_caller]
    pub fn clear(&mut self) {
        self.assert_mutable();
        self.array.clear();
        self.extensions = None;
        self.pivot = NO_PIVOT;
        self.unknown.clear();
    }

    /// Returns the populated member of the oneof `group`.
    ///
    /// If more than one member is set, the last one in `group` order is kept and the
    /// others are cleared.
    ///
    /// # Panics
    ///
    /// Panics if a repair is needed and the record is frozen.
    #[track_caller]
    pub fn compute_oneof_case(&mut self, group: &[u32]) -> Option<u32> {
        let mut case = None;
        for &number in group {
            if !self.has_field(number) {
                continue;
            }
            if let Some(previous) = case.replace(number) {
                self.assert_mutable();
                self.remove(previous);
            }
        }
        case
    }

    /// Returns a `bytes` field encoded as standard base64.
    pub fn get_bytes_as_base64(&self, number: u32) -> Option<String> {
        let bytes = self.get_field(number)?.as_bytes()?;
        Some(encode_base64(bytes))
    }

    /// Stores the decoded contents of `encoded` in a `bytes` field.
    ///
    /// # Panics
    ///
    /// Panics for the reasons listed on [`Record::set_field`].
    #[track_caller]
    pub fn set_bytes_from_base64(
        &mut self,
        number: u32,
        encoded: &str,
    ) -> Result<(), DecodeErrorKind> {
        let bytes = ByteSource::Base64(encoded).into_bytes()?;
        self.set_field(number, Value::Bytes(bytes));
        Ok(())
    }

    /// Encoded fields that were read but aren't described by the layout.
    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown
    }

    #[track_caller]
    pub fn clear_unknown_fields(&mut self) {
        self.assert_mutable();
        self.unknown.clear();
    }

    /// Populated fields in field number order.
    pub fn fields(&self) -> impl Iterator<Item = (u32, &Value)> + '_ {
        let mut extensions: Vec<_> = self
            .extensions
            .iter()
            .flatten()
            .map(|(number, value)| (*number, value))
            .collect();
        extensions.sort_unstable_by_key(|(number, _)| *number);

        self.array
            .iter()
            .zip(MINIMUM_FIELD_NUMBER..)
            .filter_map(|(slot, number)| slot.as_ref().map(|value| (number, value)))
            .chain(extensions)
    }

    #[track_caller]
    fn check_fits(&self, number: u32, value: &Value) {
        check_field_number(number);
        let fits = match (self.layout.field(number), value) {
            (Some(spec), Value::Repeated(values)) if spec.repeated => {
                values.iter().all(|value| value.fits(spec.kind))
            }
            (Some(spec), value) => !spec.repeated && value.fits(spec.kind),
            (None, Value::Repeated(values)) => {
                !values.iter().any(|value| matches!(value, Value::Repeated(_)))
            }
            (None, _) => true,
        };
        assert!(
            fits,
            "{value:?} doesn't fit field {number} of {}",
            self.layout.name
        );
    }

    fn store(&mut self, number: u32, value: Value) {
        if self.is_extension(number) && number < self.pivot {
            // Stored extensions are all above the declared fields, so nothing in the
            // array has to move.
            self.pivot = number;
        }
        if number < self.pivot {
            let Some(index) = array_index(number) else {
                return;
            };
            if self.array.len() <= index {
                self.array.resize_with(index + 1, || None);
            }
            self.array[index] = Some(value);
        } else {
            self.extensions
                .get_or_insert_with(HashMap::new)
                .insert(number, value);
        }
    }

    fn remove(&mut self, number: u32) -> Option<Value> {
        if number < self.pivot {
            let index = array_index(number)?;
            return self.array.get_mut(index)?.take();
        }
        let extensions = self.extensions.as_mut()?;
        let value = extensions.remove(&number);
        if value.is_some() {
            self.pivot = extensions.keys().copied().min().unwrap_or(NO_PIVOT);
        }
        value
    }

    /// The repeated values of field `number`, materialized on first use. A singular
    /// value already stored becomes the first element.
    fn repeated_mut(&mut self, number: u32) -> &mut Vec<Value> {
        if !matches!(self.get_field(number), Some(Value::Repeated(_))) {
            let values = self.remove(number).into_iter().collect();
            self.store(number, Value::Repeated(values));
        }
        match self.value_mut(number) {
            Some(Value::Repeated(values)) => values,
            _ => unreachable!("field {number} holds repeated values"),
        }
    }

    /// Writes every populated field, then the preserved unknown fields.
    pub(crate) fn write_fields(&self, writer: &mut Writer) {
        for (number, value) in self.fields() {
            match self.layout.field(number) {
                Some(spec) => write_declared(writer, spec, value),
                None => write_natural(writer, number, value),
            }
        }
        writer.write_serialized_message(&self.unknown);
    }

    /// Reads fields until the window ends or an end-group tag is reached.
    pub(crate) fn read_fields(&mut self, reader: &mut Reader) {
        self.assert_mutable();
        while reader.next_field() && !reader.is_end_group() {
            let number = reader.field_number();
            let Some(spec) = self.layout.field(number) else {
                self.preserve_unknown(reader);
                continue;
            };

            let packed_run =
                spec.repeated && spec.kind.is_packable() && reader.is_delimited();
            if !packed_run && reader.wire_type() != Some(spec.kind.wire_type()) {
                tracing::trace!(
                    layout = self.layout.name,
                    field = number,
                    wire_type = ?reader.wire_type(),
                    "field has an unexpected wire type, keeping it as unknown"
                );
                self.preserve_unknown(reader);
                continue;
            }

            if packed_run {
                let mut values = Vec::new();
                read_packed_values(reader, spec.kind, &mut values);
                self.repeated_mut(number).extend(values);
            } else if spec.repeated {
                let value = read_value(reader, spec.kind, None);
                if !reader.error() {
                    self.repeated_mut(number).push(value);
                }
            } else {
                // Submessages seen twice are merged.
                let existing = match self.remove(number) {
                    Some(Value::Message(record)) => Some(record),
                    _ => None,
                };
                let value = read_value(reader, spec.kind, existing);
                if reader.error() {
                    return;
                }
                match self.layout.oneof_for(number) {
                    Some(_) => self.set_oneof_field(number, value),
                    None => self.store(number, value),
                }
            }
        }
    }

    fn preserve_unknown(&mut self, reader: &mut Reader) {
        reader.skip_field();
        if reader.error() {
            return;
        }
        let bytes = reader.field_bytes();
        tracing::trace!(
            layout = self.layout.name,
            field = reader.field_number(),
            len = bytes.len(),
            "preserving unknown field"
        );
        self.unknown.extend_from_slice(&bytes);
    }
}

/// Reads the fields of a length-delimited submessage, where an end-group tag can't
/// appear.
pub(crate) fn read_message_fields(record: &mut Record, reader: &mut Reader) {
    record.read_fields(reader);
    if reader.is_end_group() {
        // Poisons the reader with a stray end-group error.
        reader.skip_field();
    }
}

#[track_caller]
fn check_field_number(number: u32) {
    assert!(
        (MINIMUM_FIELD_NUMBER..=MAXIMUM_FIELD_NUMBER).contains(&number),
        "field number {number} out of range"
    );
}

fn array_index(number: u32) -> Option<usize> {
    let index = number.checked_sub(MINIMUM_FIELD_NUMBER)?;
    usize::try_from(index).ok()
}

fn freeze_value(value: &mut Value) {
    match value {
        Value::Message(record) => record.freeze(),
        Value::Repeated(values) => values.iter_mut().for_each(freeze_value),
        _ => {}
    }
}

fn write_declared(writer: &mut Writer, spec: &FieldSpec, value: &Value) {
    match value {
        Value::Repeated(values) if spec.packed => {
            write_packed_values(writer, spec.number, spec.kind, values);
        }
        Value::Repeated(values) => {
            for value in values {
                write_value(writer, spec.number, spec.kind, value);
            }
        }
        value => write_value(writer, spec.number, spec.kind, value),
    }
}

/// Writes a field with no declaration, using the encoding implied by its value.
fn write_natural(writer: &mut Writer, number: u32, value: &Value) {
    match value {
        Value::Repeated(values) => {
            for value in values {
                write_natural(writer, number, value);
            }
        }
        value => {
            if let Some(kind) = value.natural_kind() {
                write_value(writer, number, kind, value);
            }
        }
    }
}

fn write_value(writer: &mut Writer, number: u32, kind: FieldKind, value: &Value) {
    match (kind, value) {
        (FieldKind::Double, Value::Double(v)) => writer.write_double(number, *v),
        (FieldKind::Float, Value::Float(v)) => writer.write_float(number, *v),
        (FieldKind::Int64, Value::Int64(v)) => writer.write_int64(number, *v),
        (FieldKind::UInt64, Value::UInt64(v)) => writer.write_uint64(number, *v),
        (FieldKind::Int32, Value::Int32(v)) => writer.write_int32(number, *v),
        (FieldKind::Fixed64, Value::UInt64(v)) => writer.write_fixed64(number, *v),
        (FieldKind::Fixed32, Value::UInt32(v)) => writer.write_fixed32(number, *v),
        (FieldKind::Bool, Value::Bool(v)) => writer.write_bool(number, *v),
        (FieldKind::String, Value::String(v)) => writer.write_string(number, v),
        (FieldKind::Group(_), Value::Message(record)) => {
            writer.write_group(number, record, Record::write_fields);
        }
        (FieldKind::Message(_), Value::Message(record)) => {
            writer.write_message(number, record, Record::write_fields);
        }
        (FieldKind::Bytes, Value::Bytes(v)) => writer.write_bytes(number, v),
        (FieldKind::UInt32, Value::UInt32(v)) => writer.write_uint32(number, *v),
        (FieldKind::Enum, Value::Int32(v)) => writer.write_enum(number, *v),
        (FieldKind::Sfixed32, Value::Int32(v)) => writer.write_sfixed32(number, *v),
        (FieldKind::Sfixed64, Value::Int64(v)) => writer.write_sfixed64(number, *v),
        (FieldKind::Sint32, Value::Int32(v)) => writer.write_sint32(number, *v),
        (FieldKind::Sint64, Value::Int64(v)) => writer.write_sint64(number, *v),
        (kind, value) => unreachable!("{value:?} stored in a field of kind {kind:?}"),
    }
}

fn write_packed_values(writer: &mut Writer, number: u32, kind: FieldKind, values: &[Value]) {
    fn collect<T: Scalar>(values: &[Value], convert: impl Fn(&Value) -> Option<T>) -> Vec<T> {
        values.iter().filter_map(convert).collect()
    }

    match kind {
        FieldKind::Double => writer.write_packed(number, &collect(values, Value::as_f64)),
        FieldKind::Float => writer.write_packed(number, &collect(values, Value::as_f32)),
        FieldKind::Int64 => writer.write_packed(number, &collect(values, Value::as_i64)),
        FieldKind::UInt64 => writer.write_packed(number, &collect(values, Value::as_u64)),
        FieldKind::Int32 | FieldKind::Enum => {
            writer.write_packed(number, &collect(values, Value::as_i32));
        }
        FieldKind::UInt32 => writer.write_packed(number, &collect(values, Value::as_u32)),
        FieldKind::Bool => writer.write_packed(number, &collect(values, Value::as_bool)),
        FieldKind::Fixed64 => {
            let values = collect(values, |v| v.as_u64().map(Fixed64));
            writer.write_packed(number, &values);
        }
        FieldKind::Fixed32 => {
            let values = collect(values, |v| v.as_u32().map(Fixed32));
            writer.write_packed(number, &values);
        }
        FieldKind::Sfixed64 => {
            let values = collect(values, |v| v.as_i64().map(Sfixed64));
            writer.write_packed(number, &values);
        }
        FieldKind::Sfixed32 => {
            let values = collect(values, |v| v.as_i32().map(Sfixed32));
            writer.write_packed(number, &values);
        }
        FieldKind::Sint64 => {
            let values = collect(values, |v| v.as_i64().map(Sint64));
            writer.write_packed(number, &values);
        }
        FieldKind::Sint32 => {
            let values = collect(values, |v| v.as_i32().map(Sint32));
            writer.write_packed(number, &values);
        }
        FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) | FieldKind::Group(_) => {
            for value in values {
                write_value(writer, number, kind, value);
            }
        }
    }
}

fn read_value(reader: &mut Reader, kind: FieldKind, existing: Option<Record>) -> Value {
    match kind {
        FieldKind::Double => Value::Double(reader.read_double()),
        FieldKind::Float => Value::Float(reader.read_float()),
        FieldKind::Int64 => Value::Int64(reader.read_int64()),
        FieldKind::UInt64 => Value::UInt64(reader.read_uint64()),
        FieldKind::Int32 => Value::Int32(reader.read_int32()),
        FieldKind::Fixed64 => Value::UInt64(reader.read_fixed64()),
        FieldKind::Fixed32 => Value::UInt32(reader.read_fixed32()),
        FieldKind::Bool => Value::Bool(reader.read_bool()),
        FieldKind::String => Value::String(reader.read_string()),
        FieldKind::Bytes => Value::Bytes(reader.read_bytes()),
        FieldKind::UInt32 => Value::UInt32(reader.read_uint32()),
        FieldKind::Enum => Value::Int32(reader.read_enum()),
        FieldKind::Sfixed32 => Value::Int32(reader.read_sfixed32()),
        FieldKind::Sfixed64 => Value::Int64(reader.read_sfixed64()),
        FieldKind::Sint32 => Value::Int32(reader.read_sint32()),
        FieldKind::Sint64 => Value::Int64(reader.read_sint64()),
        FieldKind::Message(layout) => {
            let mut record = existing.unwrap_or_else(|| Record::new(layout));
            reader.read_message(&mut record, read_message_fields);
            Value::Message(record)
        }
        FieldKind::Group(layout) => {
            let mut record = existing.unwrap_or_else(|| Record::new(layout));
            reader.read_group(&mut record, Record::read_fields);
            Value::Message(record)
        }
    }
}

fn read_packed_values(reader: &mut Reader, kind: FieldKind, dst: &mut Vec<Value>) {
    fn extend<T: Scalar>(reader: &mut Reader, dst: &mut Vec<Value>, convert: impl Fn(T) -> Value) {
        dst.extend(reader.read_packed::<T>().into_iter().map(convert));
    }

    match kind {
        FieldKind::Double => extend(reader, dst, Value::Double),
        FieldKind::Float => extend(reader, dst, Value::Float),
        FieldKind::Int64 => extend(reader, dst, Value::Int64),
        FieldKind::UInt64 => extend(reader, dst, Value::UInt64),
        FieldKind::Int32 | FieldKind::Enum => extend(reader, dst, Value::Int32),
        FieldKind::UInt32 => extend(reader, dst, Value::UInt32),
        FieldKind::Bool => extend(reader, dst, Value::Bool),
        FieldKind::Fixed64 => extend(reader, dst, |v: Fixed64| Value::UInt64(v.0)),
        FieldKind::Fixed32 => extend(reader, dst, |v: Fixed32| Value::UInt32(v.0)),
        FieldKind::Sfixed64 => extend(reader, dst, |v: Sfixed64| Value::Int64(v.0)),
        FieldKind::Sfixed32 => extend(reader, dst, |v: Sfixed32| Value::Int32(v.0)),
        FieldKind::Sint64 => extend(reader, dst, |v: Sint64| Value::Int64(v.0)),
        FieldKind::Sint32 => extend(reader, dst, |v: Sint32| Value::Int32(v.0)),
        // Not packable, callers check `FieldKind::is_packable`.
        FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) | FieldKind::Group(_) => {
            reader.skip_field();
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.layout, other.layout)
            && self.fields().eq(other.fields())
            && self.unknown == other.unknown
    }
}

impl core::fmt::Debug for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct(self.layout.name);
        for (number, value) in self.fields() {
            s.field(&number.to_string(), value);
        }
        if !self.unknown.is_empty() {
            s.field("unknown", &self.unknown);
        }
        if self.frozen {
            s.field("frozen", &true);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    static POINT: MessageLayout = MessageLayout {
        name: "Point",
        fields: &[
            FieldSpec::new(1, FieldKind::Sint32),
            FieldSpec::new(2, FieldKind::Sint32),
        ],
        oneofs: &[],
    };

    static SHAPE: MessageLayout = MessageLayout {
        name: "Shape",
        fields: &[
            FieldSpec::new(1, FieldKind::String),
            FieldSpec::new(2, FieldKind::Message(&POINT)),
            FieldSpec::new(3, FieldKind::Int32).packed(),
            FieldSpec::new(4, FieldKind::Double),
            FieldSpec::new(5, FieldKind::Fixed32),
            FieldSpec::new(6, FieldKind::Bytes),
            FieldSpec::new(7, FieldKind::Group(&POINT)),
            FieldSpec::new(8, FieldKind::Message(&POINT)).repeated(),
        ],
        oneofs: &[&[4, 5]],
    };

    fn point(x: i32, y: i32) -> Record {
        Record::from_parts(&POINT, [(1, Value::Int32(x)), (2, Value::Int32(y))])
    }

    #[test]
    fn test_set_and_get() {
        let mut shape = Record::new(&SHAPE);
        assert!(!shape.has_field(1));
        shape.set_field(1, "square");
        assert_eq!(shape.get_field(1).and_then(Value::as_str), Some("square"));
        assert!(shape.get_repeated(3).is_empty());
        assert_eq!(shape.get_field(0), None);

        shape.set_field(3, vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(shape.get_repeated(3), [Value::Int32(1), Value::Int32(2)]);
        assert_eq!(shape.get_repeated(1), [Value::from("square")]);

        assert_eq!(shape.clear_field(1), Some(Value::from("square")));
        assert!(!shape.has_field(1));
    }

    #[test]
    #[should_panic(expected = "doesn't fit")]
    fn test_set_wrong_kind_panics() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(1, 5i32);
    }

    #[test]
    #[should_panic(expected = "doesn't fit")]
    fn test_set_wrong_layout_panics() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(2, Record::new(&SHAPE));
    }

    #[test]
    fn test_extensions_move_the_pivot() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(2, point(1, 2));
        assert_eq!(shape.pivot(), None);

        shape.set_field(100, 7u64);
        assert_eq!(shape.pivot(), Some(100));
        shape.set_field(50, true);
        assert_eq!(shape.pivot(), Some(50));

        assert_eq!(shape.get_field(100).and_then(Value::as_u64), Some(7));
        assert_eq!(shape.get_field(50).and_then(Value::as_bool), Some(true));
        assert!(shape.has_field(2));

        shape.clear_field(50);
        assert_eq!(shape.pivot(), Some(100));
        shape.clear_field(100);
        assert_eq!(shape.pivot(), None);
        assert!(shape.has_field(2));
    }

    #[test]
    fn test_fields_are_in_number_order() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(200, 2u32);
        shape.set_field(6, &b"\x01"[..]);
        shape.set_field(100, 1u32);
        shape.set_field(1, "a");
        let numbers: Vec<u32> = shape.fields().map(|(number, _)| number).collect();
        assert_eq!(numbers, [1, 6, 100, 200]);
    }

    #[test]
    fn test_oneof_setter_clears_siblings() {
        let mut shape = Record::new(&SHAPE);
        shape.set_oneof_field(4, 1.5f64);
        shape.set_oneof_field(5, 3u32);
        assert!(!shape.has_field(4));
        assert_eq!(shape.compute_oneof_case(&[4, 5]), Some(5));

        shape.clear_field(5);
        assert_eq!(shape.compute_oneof_case(&[4, 5]), None);
    }

    #[test]
    fn test_oneof_repair_keeps_last() {
        let shape = Record::from_parts(&SHAPE, [(5, Value::UInt32(2)), (4, Value::Double(1.0))]);
        assert!(!shape.has_field(4));
        assert_eq!(shape.get_field(5).and_then(Value::as_u32), Some(2));

        let mut shape = Record::new(&SHAPE);
        shape.set_field(4, 1.0f64);
        shape.set_field(5, 2u32);
        assert_eq!(shape.compute_oneof_case(&[4, 5]), Some(5));
        assert!(!shape.has_field(4));
    }

    #[test]
    #[should_panic(expected = "not part of a oneof")]
    fn test_oneof_setter_outside_oneof_panics() {
        let mut shape = Record::new(&SHAPE);
        shape.set_oneof_field(1, "a");
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn test_frozen_rejects_mutation() {
        let mut shape = Record::new(&SHAPE);
        shape.freeze();
        shape.set_field(1, "a");
    }

    #[test]
    fn test_freeze_is_recursive() {
        let mut shape = Record::new(&SHAPE);
        shape.message_mut(2).set_field(1, 1i32);
        shape.push_repeated(8, point(3, 4));
        shape.freeze();

        assert!(shape.is_frozen());
        let inner = shape.get_field(2).and_then(Value::as_message).unwrap();
        assert!(inner.is_frozen());
        assert!(shape.get_repeated(8).iter().all(|v| v.as_message().unwrap().is_frozen()));
    }

    #[test]
    fn test_frozen_valid_oneof_can_be_read() {
        let mut shape = Record::new(&SHAPE);
        shape.set_oneof_field(4, 2.0f64);
        shape.freeze();
        assert_eq!(shape.compute_oneof_case(&[4, 5]), Some(4));
    }

    #[test]
    fn test_message_mut_clears_oneof() {
        static CHOICE: MessageLayout = MessageLayout {
            name: "Choice",
            fields: &[
                FieldSpec::new(1, FieldKind::Message(&POINT)),
                FieldSpec::new(2, FieldKind::String),
            ],
            oneofs: &[&[1, 2]],
        };

        let mut choice = Record::new(&CHOICE);
        choice.set_oneof_field(2, "none");
        choice.message_mut(1).set_field(2, -1i32);
        assert!(!choice.has_field(2));
        assert_eq!(choice.serialize_binary(), [0x0A, 0x02, 0x10, 0x01]);
    }

    #[test]
    fn test_packed_encoding() {
        let shape = Record::from_parts(
            &SHAPE,
            [(3, Value::Repeated(vec![Value::Int32(1), Value::Int32(2), Value::Int32(3)]))],
        );
        assert_eq!(shape.serialize_binary(), [0x1A, 0x03, 0x01, 0x02, 0x03]);

        // Unpacked input for a packed field is accepted too.
        let parsed = Record::parse(&SHAPE, &[0x18u8, 0x01, 0x1A, 0x01, 0x02, 0x18, 0x03]).unwrap();
        assert_eq!(parsed, shape);
    }

    #[test]
    fn test_round_trip() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(1, "hexagon");
        shape.set_field(2, point(-1, 1));
        shape.set_field(3, vec![Value::Int32(-5), Value::Int32(i32::MAX)]);
        shape.set_oneof_field(5, 6u32);
        shape.set_field(6, &[0xFFu8, 0x00][..]);
        shape.set_field(7, point(0, 9));
        shape.push_repeated(8, point(1, 1));
        shape.push_repeated(8, point(2, 2));

        let bytes = shape.serialize_binary();
        let parsed = Record::parse(&SHAPE, bytes.as_slice()).unwrap();
        assert_eq!(parsed, shape);
        assert_eq!(parsed.serialize_binary(), bytes);
    }

    #[test]
    fn test_unknown_fields_are_preserved() {
        // Field 1 "a", then field 20 varint 5, which Shape doesn't declare.
        let bytes = [0x0Au8, 0x01, 0x61, 0xA0, 0x01, 0x05];
        let shape = Record::parse(&SHAPE, &bytes).unwrap();
        assert_eq!(shape.get_field(1).and_then(Value::as_str), Some("a"));
        assert!(!shape.has_field(20));
        assert_eq!(shape.unknown_fields(), [0xA0, 0x01, 0x05]);
        assert_eq!(shape.serialize_binary(), bytes);

        let mut shape = shape;
        shape.clear_unknown_fields();
        assert_eq!(shape.serialize_binary(), [0x0A, 0x01, 0x61]);
    }

    #[test]
    fn test_wire_type_mismatch_is_kept_as_unknown() {
        let shape = Record::parse(&SHAPE, &[0x08u8, 0x01]).unwrap();
        assert!(!shape.has_field(1));
        assert_eq!(shape.unknown_fields(), [0x08, 0x01]);
    }

    #[test]
    fn test_repeated_submessage_merges() {
        // Field 2 twice, first sets x = 1, second sets y = 2.
        let bytes = [0x12u8, 0x02, 0x08, 0x02, 0x12, 0x02, 0x10, 0x04];
        let shape = Record::parse(&SHAPE, &bytes).unwrap();
        assert_eq!(shape.get_field(2), Some(&Value::Message(point(1, 2))));
    }

    #[test]
    fn test_group_field() {
        let bytes = [0x3Bu8, 0x08, 0x02, 0x3C];
        let shape = Record::parse(&SHAPE, &bytes).unwrap();
        let group = shape.get_field(7).and_then(Value::as_message).unwrap();
        assert_eq!(group.get_field(1), Some(&Value::Int32(1)));
        assert_eq!(shape.serialize_binary(), bytes);
    }

    #[test]
    fn test_stray_end_group_is_an_error() {
        #[track_caller]
        fn test_case(bytes: &[u8]) {
            let err = Record::parse(&SHAPE, bytes).unwrap_err();
            assert_eq!(err.kind(), DecodeErrorKind::StrayEndGroup { field: 1 });
        }

        test_case(&[0x0C]);
        // Inside a length-delimited submessage.
        test_case(&[0x12, 0x01, 0x0C]);
    }

    #[test]
    fn test_malformed_input_is_reported() {
        let err = Record::parse(&SHAPE, &[0x0Au8, 0x05, 0x61]).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::LengthOverflow { value: 5 });

        let err = Record::parse(&SHAPE, ByteSource::Base64("***")).unwrap_err();
        assert_eq!(err.kind(), DecodeErrorKind::InvalidBase64);

        // Key 2^32 + 8 must not be truncated to field 1.
        let err = Record::parse(&POINT, &[0x88u8, 0x80, 0x80, 0x80, 0x10, 0x07]).unwrap_err();
        assert_eq!(
            err.kind(),
            DecodeErrorKind::InvalidFieldNumber {
                value: (1 << 29) | 1
            }
        );
    }

    #[test]
    fn test_extension_natural_encoding() {
        let mut shape = Record::new(&SHAPE);
        shape.set_field(100, "ext");
        assert_eq!(
            shape.serialize_binary(),
            [0xA2, 0x06, 0x03, b'e', b'x', b't']
        );
    }

    #[test]
    fn test_base64_bytes() {
        let mut shape = Record::new(&SHAPE);
        shape.set_bytes_from_base64(6, "AAEC").unwrap();
        assert_eq!(
            shape.get_field(6).and_then(Value::as_bytes).map(|b| &b[..]),
            Some(&[0u8, 1, 2][..])
        );
        assert_eq!(shape.get_bytes_as_base64(6).as_deref(), Some("AAEC"));
        assert_eq!(shape.get_bytes_as_base64(1), None);

        assert_eq!(
            shape.set_bytes_from_base64(6, "!!"),
            Err(DecodeErrorKind::InvalidBase64)
        );
    }

    #[test]
    fn test_debug_output() {
        let record = point(1, 2);
        assert_eq!(format!("{record:?}"), "Point { 1: Int32(1), 2: Int32(2) }");
    }
}
