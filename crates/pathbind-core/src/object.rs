//! The contract objects implement to take part in bindings.
//!
//! A [`Bindable`] exposes its members through a static [`TypeDescriptor`] and
//! may advertise change notifications in one of two styles:
//!
//! - a structured "named member changed" event ([`Bindable::property_changed`]);
//! - one bare event per member, named `<Member>Changed`
//!   ([`Bindable::member_event`]).
//!
//! Neither is required. Members of objects without notifications are still
//! readable and writable; they just never report external changes.
//!
//! [`DynObject`] is a ready-made implementation backed by a descriptor.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{BindError, Result};
use crate::event::Event;
use crate::types::{MemberKind, TypeDescriptor};
use crate::value::Value;

/// Shared handle to a bindable object.
pub type ObjectRef = Rc<dyn Bindable>;

/// Whether two handles point at the same object instance.
#[must_use]
pub fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

/// An object whose members can be reached by binding paths.
///
/// All methods take `&self`; implementors use interior mutability and must
/// release internal borrows before raising change notifications, since
/// handlers read the object back synchronously.
pub trait Bindable {
    /// Runtime type of this object.
    fn descriptor(&self) -> &'static TypeDescriptor;

    /// Read a property declared with [`MemberKind::Property`].
    fn get_property(&self, name: &str) -> Result<Value>;

    /// Write a property declared with [`MemberKind::Property`].
    fn set_property(&self, name: &str, value: Value) -> Result<()>;

    /// Storage slot of a member declared with [`MemberKind::Field`].
    fn field(&self, _name: &str) -> Option<&FieldSlot> {
        None
    }

    /// Structured notification carrying the changed member's name.
    fn property_changed(&self) -> Option<&Event<str>> {
        None
    }

    /// Per-member event following the `<Member>Changed` naming convention.
    fn member_event(&self, _event_name: &str) -> Option<&Event> {
        None
    }
}

/// Error for a member the runtime object does not provide.
#[must_use]
pub fn unknown_member(descriptor: &TypeDescriptor, member: &str) -> BindError {
    BindError::UnknownMember {
        type_name: descriptor.name.to_owned(),
        member: member.to_owned(),
    }
}

/// A plain value slot backing a field member.
#[derive(Default)]
pub struct FieldSlot(RefCell<Value>);

impl FieldSlot {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(RefCell::new(value))
    }

    #[must_use]
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        *self.0.borrow_mut() = value;
    }
}

impl fmt::Debug for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldSlot").field(&*self.0.borrow()).finish()
    }
}

/// Change-notification style of a [`DynObject`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Notify {
    /// Property writes raise nothing.
    #[default]
    Silent,
    /// Property writes raise [`Bindable::property_changed`] with the member name.
    PropertyChanged,
    /// Property writes raise the member's `<Member>Changed` event.
    MemberEvents,
}

/// Descriptor-driven bindable object.
///
/// Every declared member starts at its type's default value. Property writes
/// always notify (no equality short-circuit); field writes never do.
///
/// ```
/// use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor, Value, ValueType};
///
/// static MEMBERS: [MemberDescriptor; 1] = [MemberDescriptor::property("Count", ValueType::Int)];
/// static COUNTER: TypeDescriptor = TypeDescriptor::new("Counter", &MEMBERS);
///
/// let counter = DynObject::new(&COUNTER, Notify::MemberEvents).with("Count", 3).shared();
/// assert_eq!(counter.get("Count").unwrap(), Value::Int(3));
/// ```
pub struct DynObject {
    descriptor: &'static TypeDescriptor,
    notify: Notify,
    properties: RefCell<AHashMap<&'static str, Value>>,
    fields: AHashMap<&'static str, FieldSlot>,
    property_changed: Event<str>,
    member_events: AHashMap<String, Event>,
}

impl DynObject {
    #[must_use]
    pub fn new(descriptor: &'static TypeDescriptor, notify: Notify) -> Self {
        let mut properties = AHashMap::new();
        let mut fields = AHashMap::new();
        let mut member_events = AHashMap::new();
        for member in descriptor.members {
            let initial = member.value_type.default_value();
            match member.kind {
                MemberKind::Property => {
                    properties.insert(member.name, initial);
                    if notify == Notify::MemberEvents {
                        member_events.insert(format!("{}Changed", member.name), Event::new());
                    }
                }
                MemberKind::Field => {
                    fields.insert(member.name, FieldSlot::new(initial));
                }
            }
        }
        Self {
            descriptor,
            notify,
            properties: RefCell::new(properties),
            fields,
            property_changed: Event::new(),
            member_events,
        }
    }

    /// Initialize a member without raising notifications. Unknown names are ignored.
    #[must_use]
    pub fn with(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if let Some(slot) = self.fields.get(name) {
            slot.set(value);
        } else if let Some(current) = self.properties.borrow_mut().get_mut(name) {
            *current = value;
        }
        self
    }

    #[must_use]
    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// Read any declared member, property or field.
    pub fn get(&self, name: &str) -> Result<Value> {
        match self.fields.get(name) {
            Some(slot) => Ok(slot.get()),
            None => self.get_property(name),
        }
    }

    /// Write any declared member; properties notify, fields do not.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match self.fields.get(name) {
            Some(slot) => {
                slot.set(value);
                Ok(())
            }
            None => self.set_property(name, value),
        }
    }

    #[must_use]
    pub fn notify_style(&self) -> Notify {
        self.notify
    }

    fn raise(&self, name: &str) {
        match self.notify {
            Notify::Silent => {}
            Notify::PropertyChanged => self.property_changed.emit(name),
            Notify::MemberEvents => {
                if let Some(event) = self.member_events.get(&format!("{name}Changed")) {
                    event.emit(&());
                }
            }
        }
    }
}

impl Bindable for DynObject {
    fn descriptor(&self) -> &'static TypeDescriptor {
        self.descriptor
    }

    fn get_property(&self, name: &str) -> Result<Value> {
        self.properties
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| unknown_member(self.descriptor, name))
    }

    fn set_property(&self, name: &str, value: Value) -> Result<()> {
        {
            let mut properties = self.properties.borrow_mut();
            let slot = properties
                .get_mut(name)
                .ok_or_else(|| unknown_member(self.descriptor, name))?;
            *slot = value;
        }
        self.raise(name);
        Ok(())
    }

    fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.fields.get(name)
    }

    fn property_changed(&self) -> Option<&Event<str>> {
        (self.notify == Notify::PropertyChanged).then_some(&self.property_changed)
    }

    fn member_event(&self, event_name: &str) -> Option<&Event> {
        self.member_events.get(event_name)
    }
}

impl fmt::Debug for DynObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynObject")
            .field("type", &self.descriptor.name)
            .field("notify", &self.notify)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MemberDescriptor, ValueType};
    use std::cell::Cell;

    static ITEM_MEMBERS: [MemberDescriptor; 2] = [
        MemberDescriptor::property("Count", ValueType::Int),
        MemberDescriptor::field("Note", ValueType::Text),
    ];
    static ITEM: TypeDescriptor = TypeDescriptor::new("Item", &ITEM_MEMBERS);

    #[test]
    fn members_start_at_defaults() {
        let item = DynObject::new(&ITEM, Notify::Silent);
        assert_eq!(item.get("Count"), Ok(Value::Int(0)));
        assert_eq!(item.get("Note"), Ok(Value::Null));
        assert!(item.get("Missing").is_err());
    }

    #[test]
    fn member_events_fire_on_property_write() {
        let item = DynObject::new(&ITEM, Notify::MemberEvents).shared();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let event = item.member_event("CountChanged").expect("declared property");
        let _sub = event.subscribe(move |_| h.set(h.get() + 1));

        item.set("Count", 4).unwrap();
        item.set("Note", "field writes are quiet").unwrap();
        assert_eq!(hits.get(), 1);
        assert!(item.member_event("NoteChanged").is_none());
    }

    #[test]
    fn property_changed_carries_name() {
        let item = DynObject::new(&ITEM, Notify::PropertyChanged).shared();
        let names = Rc::new(RefCell::new(Vec::new()));
        let n = Rc::clone(&names);
        let _sub = item
            .property_changed()
            .expect("enabled")
            .subscribe(move |name: &str| n.borrow_mut().push(name.to_owned()));

        item.set("Count", 1).unwrap();
        assert_eq!(*names.borrow(), vec!["Count".to_string()]);
        assert!(item.member_event("CountChanged").is_none());
    }

    #[test]
    fn handlers_can_read_back_during_notification() {
        let item = DynObject::new(&ITEM, Notify::MemberEvents).shared();
        let seen = Rc::new(Cell::new(0));
        let reader = Rc::clone(&item);
        let s = Rc::clone(&seen);
        let _sub = item
            .member_event("CountChanged")
            .unwrap()
            .subscribe(move |_| {
                if let Ok(Value::Int(v)) = reader.get("Count") {
                    s.set(v);
                }
            });
        item.set("Count", 9).unwrap();
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn identity_comparison() {
        let a: ObjectRef = DynObject::new(&ITEM, Notify::Silent).shared();
        let b: ObjectRef = DynObject::new(&ITEM, Notify::Silent).shared();
        assert!(same_object(&a, &Rc::clone(&a)));
        assert!(!same_object(&a, &b));
    }
}
