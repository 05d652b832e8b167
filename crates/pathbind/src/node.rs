//! Binding nodes: the public handle on one resolved path endpoint.
//!
//! A [`BindingNode`] pairs a root object with a path and exposes the value at
//! the end of that path. External listeners register change triggers; the
//! accessor chain only listens to the object graph while at least one
//! trigger is registered.
//!
//! ```
//! use pathbind::{BindingNode, path};
//! use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor, Value, ValueType};
//!
//! static MEMBERS: [MemberDescriptor; 1] = [MemberDescriptor::property("Count", ValueType::Int)];
//! static COUNTER: TypeDescriptor = TypeDescriptor::new("Counter", &MEMBERS);
//!
//! let counter = DynObject::new(&COUNTER, Notify::MemberEvents).with("Count", 2).shared();
//! let node = BindingNode::new(counter.clone(), &path!(Count)).unwrap();
//! assert_eq!(node.get::<i64>().unwrap(), 2);
//!
//! node.set_value(5).unwrap();
//! assert_eq!(counter.get("Count").unwrap(), Value::Int(5));
//! ```
//!
//! # Invariants
//!
//! 1. `value()` re-evaluates the chain from the root on every call.
//! 2. Triggers fire in registration order.
//! 3. The chain holds subscriptions if and only if `trigger_count() > 0`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use pathbind_core::{BindError, Bindable, FromValue, ObjectRef, Result, Value, ValueType};

use crate::accessor::{AccessorNode, ChangeCallback};
use crate::content::ContentData;
use crate::path::{PathExpr, ResolvedPath, resolve};
use crate::splice::BindingSplice;

/// Handle returned by [`BindingNode::add_change_trigger`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TriggerId(u64);

pub(crate) struct NodeInner {
    leaf: Rc<AccessorNode>,
    path: ResolvedPath,
    source: RefCell<ObjectRef>,
    triggers: RefCell<Vec<(TriggerId, ChangeCallback)>>,
    next_trigger: Cell<u64>,
    content: Option<Weak<ContentData>>,
}

/// A root object plus a resolved path into it.
///
/// Cloning yields another handle to the same endpoint.
#[derive(Clone)]
pub struct BindingNode {
    inner: Rc<NodeInner>,
}

impl BindingNode {
    /// Resolve `path` against the runtime type of `source`.
    pub fn new(source: ObjectRef, path: &PathExpr) -> Result<Self> {
        Self::build(source, path, None)
    }

    pub(crate) fn in_content(
        source: ObjectRef,
        path: &PathExpr,
        content: &Rc<ContentData>,
    ) -> Result<Self> {
        Self::build(source, path, Some(Rc::downgrade(content)))
    }

    fn build(source: ObjectRef, path: &PathExpr, content: Option<Weak<ContentData>>) -> Result<Self> {
        let path = resolve(path, source.descriptor())?;
        let leaf = AccessorNode::build_chain(&path);
        leaf.attach_source(Value::Object(ObjectRef::clone(&source)));
        Ok(Self {
            inner: Rc::new(NodeInner {
                leaf,
                path,
                source: RefCell::new(source),
                triggers: RefCell::new(Vec::new()),
                next_trigger: Cell::new(0),
                content,
            }),
        })
    }

    /// The root object the path is evaluated against.
    #[must_use]
    pub fn source(&self) -> ObjectRef {
        ObjectRef::clone(&self.inner.source.borrow())
    }

    /// Re-point the chain at another root of the same type.
    ///
    /// Subscriptions follow the new root and registered triggers fire.
    pub fn set_source(&self, source: ObjectRef) -> Result<()> {
        let expected = self.inner.path.root;
        if !source.descriptor().same_type(expected) {
            return Err(BindError::IncompatibleTypes {
                from: source.descriptor().name.to_owned(),
                to: expected.name.to_owned(),
            });
        }
        *self.inner.source.borrow_mut() = ObjectRef::clone(&source);
        self.inner.leaf.attach_source(Value::Object(source));
        Ok(())
    }

    /// Current value at the end of the path.
    pub fn value(&self) -> Result<Value> {
        self.inner.leaf.read()
    }

    /// Typed read of the current value.
    pub fn get<T: FromValue>(&self) -> Result<T> {
        T::from_value(self.value()?)
    }

    /// Write through the path. The value must already fit [`Self::value_type`].
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let expected = self.value_type();
        if !expected.accepts(&value) {
            return Err(BindError::IncompatibleTypes {
                from: value.type_name().to_owned(),
                to: expected.name().to_owned(),
            });
        }
        self.inner.leaf.write(value)
    }

    /// Declared type of the path's endpoint.
    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.inner.path.value_type()
    }

    /// Textual form of the bound path; empty for the root.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path.text
    }

    /// Register `trigger` to run whenever the endpoint value changes.
    ///
    /// The first registration starts listening on the object graph.
    pub fn add_change_trigger(&self, trigger: impl Fn() + 'static) -> TriggerId {
        let id = TriggerId(self.inner.next_trigger.get());
        self.inner.next_trigger.set(id.0 + 1);

        let first = {
            let mut triggers = self.inner.triggers.borrow_mut();
            triggers.push((id, Rc::new(trigger)));
            triggers.len() == 1
        };
        if first {
            let node = Rc::downgrade(&self.inner);
            self.inner
                .leaf
                .set_change_callback(Some(Rc::new(move || fan_out(&node))));
        }
        id
    }

    /// Remove a trigger. Returns `false` if `id` was not registered.
    ///
    /// Removing the last trigger releases every subscription of the chain.
    pub fn remove_change_trigger(&self, id: TriggerId) -> bool {
        let (removed, now_empty) = {
            let mut triggers = self.inner.triggers.borrow_mut();
            let before = triggers.len();
            triggers.retain(|(tid, _)| *tid != id);
            (triggers.len() != before, triggers.is_empty())
        };
        if removed && now_empty {
            self.inner.leaf.set_change_callback(None);
        }
        removed
    }

    #[must_use]
    pub fn trigger_count(&self) -> usize {
        self.inner.triggers.borrow().len()
    }

    /// Whether the chain currently holds any change subscription.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner.leaf.is_listening()
    }

    /// Connect this endpoint (as source) to `path` on `target`.
    ///
    /// Nodes created by a [`BindingContent`](crate::BindingContent) hand the
    /// splice to that content, which also supplies its default direction.
    pub fn to(&self, target: ObjectRef, path: &PathExpr) -> Result<BindingSplice> {
        let target = Self::new(target, path)?;
        let content = self.inner.content.as_ref().and_then(Weak::upgrade);
        Ok(BindingSplice::connect(self.clone(), target, content.as_ref()))
    }

    pub(crate) fn same_source(&self, object: &ObjectRef) -> bool {
        pathbind_core::same_object(&self.inner.source.borrow(), object)
    }
}

fn fan_out(node: &Weak<NodeInner>) {
    let Some(node) = node.upgrade() else {
        return;
    };
    let snapshot: Vec<ChangeCallback> = node
        .triggers
        .borrow()
        .iter()
        .map(|(_, cb)| Rc::clone(cb))
        .collect();
    for trigger in snapshot {
        trigger();
    }
}

impl fmt::Debug for BindingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingNode")
            .field("root", &self.inner.path.root.name)
            .field("path", &self.inner.path.text)
            .field("value_type", &self.value_type())
            .field("triggers", &self.trigger_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor};

    static ENGINE_MEMBERS: [MemberDescriptor; 1] =
        [MemberDescriptor::property("Rpm", ValueType::Int)];
    static ENGINE: TypeDescriptor = TypeDescriptor::new("Engine", &ENGINE_MEMBERS);

    static CAR_MEMBERS: [MemberDescriptor; 2] = [
        MemberDescriptor::property("Engine", ValueType::Object(&ENGINE)),
        MemberDescriptor::property("Name", ValueType::Text),
    ];
    static CAR: TypeDescriptor = TypeDescriptor::new("Car", &CAR_MEMBERS);

    fn car_with_engine(rpm: i64) -> (Rc<DynObject>, Rc<DynObject>) {
        let engine = DynObject::new(&ENGINE, Notify::MemberEvents)
            .with("Rpm", rpm)
            .shared();
        let car = DynObject::new(&CAR, Notify::MemberEvents)
            .with("Engine", Value::Object(engine.clone()))
            .shared();
        (car, engine)
    }

    #[test]
    fn reads_nested_value() {
        let (car, _engine) = car_with_engine(900);
        let node = BindingNode::new(car, &path!(Engine.Rpm)).unwrap();
        assert_eq!(node.get::<i64>().unwrap(), 900);
        assert_eq!(node.value_type(), ValueType::Int);
        assert_eq!(node.path(), "Engine.Rpm");
    }

    #[test]
    fn unsupported_path_fails_construction() {
        let (car, _) = car_with_engine(0);
        let expr = PathExpr::parse("Engine.Rpm()").unwrap();
        assert!(matches!(
            BindingNode::new(car, &expr),
            Err(BindError::PathNotSupported { .. })
        ));
    }

    #[test]
    fn set_value_rejects_wrong_type() {
        let (car, _) = car_with_engine(0);
        let node = BindingNode::new(car, &path!(Engine.Rpm)).unwrap();
        assert!(matches!(
            node.set_value("fast"),
            Err(BindError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn triggers_fire_in_order() {
        let (car, engine) = car_with_engine(0);
        let node = BindingNode::new(car, &path!(Engine.Rpm)).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            node.add_change_trigger(move || log.borrow_mut().push(tag));
        }

        engine.set("Rpm", 1200).unwrap();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn last_removal_stops_listening() {
        let (car, engine) = car_with_engine(0);
        let node = BindingNode::new(car.clone(), &path!(Engine.Rpm)).unwrap();
        let a = node.add_change_trigger(|| {});
        let b = node.add_change_trigger(|| {});
        assert!(node.is_listening());

        assert!(node.remove_change_trigger(a));
        assert!(node.is_listening());
        assert!(node.remove_change_trigger(b));
        assert!(!node.is_listening());
        assert!(!node.remove_change_trigger(b));

        assert_eq!(car.member_event("EngineChanged").unwrap().handler_count(), 0);
        assert_eq!(engine.member_event("RpmChanged").unwrap().handler_count(), 0);
    }

    #[test]
    fn set_source_retargets_and_fires() {
        let (first, _) = car_with_engine(1);
        let (second, second_engine) = car_with_engine(2);
        let node = BindingNode::new(first, &path!(Engine.Rpm)).unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        node.add_change_trigger(move || h.set(h.get() + 1));

        node.set_source(second).unwrap();
        assert_eq!(hits.get(), 1);
        assert_eq!(node.get::<i64>().unwrap(), 2);

        second_engine.set("Rpm", 3).unwrap();
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn set_source_requires_same_type() {
        let (car, engine) = car_with_engine(0);
        let node = BindingNode::new(car, &path!(Name)).unwrap();
        assert!(node.set_source(engine).is_err());
    }

    #[test]
    fn set_source_rejects_unrelated_type_with_same_name() {
        static LOOKALIKE: TypeDescriptor = TypeDescriptor::new("Car", &CAR_MEMBERS);
        let (car, _) = car_with_engine(0);
        let node = BindingNode::new(car, &path!(Name)).unwrap();
        let lookalike = DynObject::new(&LOOKALIKE, Notify::MemberEvents).shared();
        assert!(matches!(
            node.set_source(lookalike),
            Err(BindError::IncompatibleTypes { .. })
        ));
    }

    #[test]
    fn root_path_reads_the_object() {
        let (car, _) = car_with_engine(0);
        let node = BindingNode::new(car.clone(), &path!()).unwrap();
        assert_eq!(node.value().unwrap(), Value::Object(car));
        assert_eq!(node.value_type(), ValueType::Object(&CAR));
    }
}
