//! Static type descriptors for bindable objects.
//!
//! A [`TypeDescriptor`] lists the members a path may step through. Descriptors
//! are plain `static` items so they can reference each other (including
//! cyclically) and hand out `&'static` member descriptors that accessor nodes
//! keep for their whole lifetime.
//!
//! ```
//! use pathbind_core::{MemberDescriptor, TypeDescriptor, ValueType};
//!
//! static NODE_MEMBERS: [MemberDescriptor; 2] = [
//!     MemberDescriptor::property("Label", ValueType::Text),
//!     MemberDescriptor::property("Next", ValueType::Object(&NODE)),
//! ];
//! static NODE: TypeDescriptor = TypeDescriptor::new("Node", &NODE_MEMBERS);
//!
//! assert!(NODE.member("Next").is_some());
//! assert!(NODE.member("Prev").is_none());
//! ```

use std::fmt;

use crate::object::Bindable;
use crate::value::Value;

/// Declared type of a member or path endpoint.
#[derive(Clone, Copy)]
pub enum ValueType {
    /// Accepts any value, including null.
    Any,
    Bool,
    Int,
    Float,
    /// Nullable text.
    Text,
    /// Nullable reference to an object of the given type.
    Object(&'static TypeDescriptor),
}

impl ValueType {
    /// Human readable type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "Any",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Text => "Text",
            Self::Object(desc) => desc.name,
        }
    }

    /// Whether null is a legal value of this type.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Any | Self::Text | Self::Object(_))
    }

    /// Zero value produced when a path crosses a null object.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Any | Self::Text | Self::Object(_) => Value::Null,
        }
    }

    /// Whether `value` can be stored in a slot of this type without conversion.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (_, Value::Null) => self.is_reference(),
            (Self::Bool, Value::Bool(_))
            | (Self::Int, Value::Int(_))
            | (Self::Float, Value::Float(_))
            | (Self::Text, Value::Text(_)) => true,
            (Self::Object(desc), Value::Object(obj)) => obj.descriptor().same_type(desc),
            _ => false,
        }
    }

    /// Descriptor of an object type, `None` for scalars and `Any`.
    #[must_use]
    pub fn object_descriptor(&self) -> Option<&'static TypeDescriptor> {
        match self {
            Self::Object(desc) => Some(*desc),
            _ => None,
        }
    }
}

impl PartialEq for ValueType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Object(a), Self::Object(b)) => a.same_type(b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for ValueType {}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object(desc) => write!(f, "Object({})", desc.name),
            other => f.write_str(other.name()),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a member is stored on its owner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberKind {
    /// Accessed through the object's getter/setter and may raise change notifications.
    Property,
    /// A raw storage slot; writes never notify.
    Field,
}

/// One readable and writable member of a [`TypeDescriptor`].
#[derive(Clone, Copy, Debug)]
pub struct MemberDescriptor {
    pub name: &'static str,
    pub kind: MemberKind,
    pub value_type: ValueType,
}

impl MemberDescriptor {
    #[must_use]
    pub const fn property(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            kind: MemberKind::Property,
            value_type,
        }
    }

    #[must_use]
    pub const fn field(name: &'static str, value_type: ValueType) -> Self {
        Self {
            name,
            kind: MemberKind::Field,
            value_type,
        }
    }
}

/// Static description of a bindable type.
pub struct TypeDescriptor {
    pub name: &'static str,
    pub members: &'static [MemberDescriptor],
}

impl TypeDescriptor {
    #[must_use]
    pub const fn new(name: &'static str, members: &'static [MemberDescriptor]) -> Self {
        Self { name, members }
    }

    /// Look up a member by name.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&'static MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Types are identified by their descriptor's address; names are labels
    /// only and may collide.
    #[must_use]
    pub fn same_type(&self, other: &TypeDescriptor) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field(
                "members",
                &self.members.iter().map(|m| m.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static POINT_MEMBERS: [MemberDescriptor; 2] = [
        MemberDescriptor::property("X", ValueType::Int),
        MemberDescriptor::field("Tag", ValueType::Text),
    ];
    static POINT: TypeDescriptor = TypeDescriptor::new("Point", &POINT_MEMBERS);

    #[test]
    fn defaults_follow_nullability() {
        assert_eq!(ValueType::Int.default_value(), Value::Int(0));
        assert_eq!(ValueType::Bool.default_value(), Value::Bool(false));
        assert!(ValueType::Text.default_value().is_null());
        assert!(ValueType::Object(&POINT).default_value().is_null());
    }

    #[test]
    fn null_only_fits_reference_types() {
        assert!(ValueType::Text.accepts(&Value::Null));
        assert!(ValueType::Any.accepts(&Value::Null));
        assert!(!ValueType::Int.accepts(&Value::Null));
        assert!(!ValueType::Float.accepts(&Value::Int(1)));
    }

    #[test]
    fn member_lookup() {
        let x = POINT.member("X").expect("X is declared");
        assert_eq!(x.kind, MemberKind::Property);
        assert_eq!(POINT.member("Tag").map(|m| m.kind), Some(MemberKind::Field));
        assert!(POINT.member("Y").is_none());
    }

    static OTHER_POINT: TypeDescriptor = TypeDescriptor::new("Point", &[]);

    #[test]
    fn object_types_compare_by_descriptor() {
        assert_eq!(ValueType::Object(&POINT), ValueType::Object(&POINT));
        assert_ne!(ValueType::Object(&POINT), ValueType::Any);
        assert_ne!(ValueType::Object(&POINT), ValueType::Object(&OTHER_POINT));
        assert!(!POINT.same_type(&OTHER_POINT));
        assert_eq!(format!("{:?}", ValueType::Object(&POINT)), "Object(Point)");
    }
}
