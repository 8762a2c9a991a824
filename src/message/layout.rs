//! Static descriptions of a message's fields.

use crate::wire::WireType;

/// The declared protobuf type of a field.
#[derive(Clone, Copy)]
pub enum FieldKind {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Group(&'static MessageLayout),
    Message(&'static MessageLayout),
    Bytes,
    UInt32,
    Enum,
    Sfixed32,
    Sfixed64,
    Sint32,
    Sint64,
}

impl FieldKind {
    /// Wire type of a single, unpacked value of this kind.
    pub const fn wire_type(self) -> WireType {
        match self {
            FieldKind::Double | FieldKind::Fixed64 | FieldKind::Sfixed64 => WireType::I64,
            FieldKind::Float | FieldKind::Fixed32 | FieldKind::Sfixed32 => WireType::I32,
            FieldKind::String | FieldKind::Bytes | FieldKind::Message(_) => WireType::Len,
            FieldKind::Group(_) => WireType::SGroup,
            FieldKind::Int64
            | FieldKind::UInt64
            | FieldKind::Int32
            | FieldKind::Bool
            | FieldKind::UInt32
            | FieldKind::Enum
            | FieldKind::Sint32
            | FieldKind::Sint64 => WireType::Varint,
        }
    }

    /// Whether repeated fields of this kind may use the packed encoding.
    pub const fn is_packable(self) -> bool {
        !matches!(
            self.wire_type(),
            WireType::Len | WireType::SGroup | WireType::EGroup
        )
    }

    /// Layout of the nested message, for message and group kinds.
    pub const fn layout(self) -> Option<&'static MessageLayout> {
        match self {
            FieldKind::Group(layout) | FieldKind::Message(layout) => Some(layout),
            _ => None,
        }
    }
}

impl PartialEq for FieldKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldKind::Group(a), FieldKind::Group(b))
            | (FieldKind::Message(a), FieldKind::Message(b)) => core::ptr::eq(*a, *b),
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

impl Eq for FieldKind {}

impl core::fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Layouts can refer to themselves, so only their name is printed.
        match self {
            FieldKind::Group(layout) => write!(f, "Group({})", layout.name),
            FieldKind::Message(layout) => write!(f, "Message({})", layout.name),
            FieldKind::Double => f.write_str("Double"),
            FieldKind::Float => f.write_str("Float"),
            FieldKind::Int64 => f.write_str("Int64"),
            FieldKind::UInt64 => f.write_str("UInt64"),
            FieldKind::Int32 => f.write_str("Int32"),
            FieldKind::Fixed64 => f.write_str("Fixed64"),
            FieldKind::Fixed32 => f.write_str("Fixed32"),
            FieldKind::Bool => f.write_str("Bool"),
            FieldKind::String => f.write_str("String"),
            FieldKind::Bytes => f.write_str("Bytes"),
            FieldKind::UInt32 => f.write_str("UInt32"),
            FieldKind::Enum => f.write_str("Enum"),
            FieldKind::Sfixed32 => f.write_str("Sfixed32"),
            FieldKind::Sfixed64 => f.write_str("Sfixed64"),
            FieldKind::Sint32 => f.write_str("Sint32"),
            FieldKind::Sint64 => f.write_str("Sint64"),
        }
    }
}

/// One declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub number: u32,
    pub kind: FieldKind,
    pub repeated: bool,
    pub packed: bool,
}

impl FieldSpec {
    pub const fn new(number: u32, kind: FieldKind) -> Self {
        FieldSpec {
            number,
            kind,
            repeated: false,
            packed: false,
        }
    }

    #[must_use]
    pub const fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Marks a repeated field as packed. Ignored for kinds that can't be packed.
    #[must_use]
    pub const fn packed(mut self) -> Self {
        self.repeated = true;
        self.packed = self.kind.is_packable();
        self
    }
}

/// The fields and oneof groups of a message type.
///
/// Layouts are meant to be `static`s, and may refer to themselves:
///
/// ```
/// use binproto::message::{FieldKind, FieldSpec, MessageLayout};
///
/// static NODE: MessageLayout = MessageLayout {
///     name: "Node",
///     fields: &[
///         FieldSpec::new(1, FieldKind::Int32),
///         FieldSpec::new(2, FieldKind::Message(&NODE)).repeated(),
///     ],
///     oneofs: &[],
/// };
///
/// assert_eq!(NODE.max_field_number(), 2);
/// ```
#[derive(Debug)]
pub struct MessageLayout {
    pub name: &'static str,
    pub fields: &'static [FieldSpec],
    /// Groups of mutually exclusive field numbers.
    pub oneofs: &'static [&'static [u32]],
}

impl MessageLayout {
    pub fn field(&self, number: u32) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.number == number)
    }

    /// Largest declared field number, numbers above it are extensions.
    pub fn max_field_number(&self) -> u32 {
        self.fields.iter().map(|spec| spec.number).max().unwrap_or(0)
    }

    /// The oneof group `number` belongs to, if any.
    pub fn oneof_for(&self, number: u32) -> Option<&'static [u32]> {
        self.oneofs
            .iter()
            .copied()
            .find(|group| group.contains(&number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static INNER: MessageLayout = MessageLayout {
        name: "Inner",
        fields: &[FieldSpec::new(1, FieldKind::Bool)],
        oneofs: &[],
    };

    static OUTER: MessageLayout = MessageLayout {
        name: "Outer",
        fields: &[
            FieldSpec::new(1, FieldKind::Sint32).packed(),
            FieldSpec::new(3, FieldKind::String).packed(),
            FieldSpec::new(7, FieldKind::Message(&INNER)),
            FieldSpec::new(8, FieldKind::Group(&OUTER)),
        ],
        oneofs: &[&[1, 3]],
    };

    #[test]
    fn test_lookups() {
        assert_eq!(OUTER.max_field_number(), 8);
        assert_eq!(OUTER.field(7).map(|s| s.kind), Some(FieldKind::Message(&INNER)));
        assert!(OUTER.field(2).is_none());
        assert_eq!(OUTER.oneof_for(3), Some(&[1u32, 3][..]));
        assert_eq!(OUTER.oneof_for(7), None);
    }

    #[test]
    fn test_packed_only_for_scalars() {
        let sint = OUTER.field(1).unwrap();
        assert!(sint.repeated && sint.packed);
        let string = OUTER.field(3).unwrap();
        assert!(string.repeated && !string.packed);
    }

    #[test]
    fn test_kind_equality_by_layout_identity() {
        assert_eq!(FieldKind::Group(&OUTER), FieldKind::Group(&OUTER));
        assert_ne!(FieldKind::Message(&OUTER), FieldKind::Message(&INNER));
        assert_ne!(FieldKind::Message(&INNER), FieldKind::Group(&INNER));
        assert_eq!(format!("{:?}", FieldKind::Group(&OUTER)), "Group(Outer)");
    }

    #[test]
    fn test_wire_types() {
        assert_eq!(FieldKind::Sint64.wire_type(), WireType::Varint);
        assert_eq!(FieldKind::Sfixed32.wire_type(), WireType::I32);
        assert_eq!(FieldKind::Double.wire_type(), WireType::I64);
        assert_eq!(FieldKind::Group(&INNER).wire_type(), WireType::SGroup);
        assert!(!FieldKind::Bytes.is_packable());
        assert!(FieldKind::Enum.is_packable());
    }
}
