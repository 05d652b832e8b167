//! Change subscription for one member step of a path.
//!
//! A [`ChangeSubscriber`] watches the object a member node currently reads
//! from. When that object reports a change of the watched member, the node's
//! change trigger is invoked. The subscriber follows the node's parent value:
//! whenever the parent resolves to a different instance it drops the old
//! subscription and attaches to the new one.
//!
//! Two notification styles are tried, in order, once per attach:
//!
//! 1. [`Bindable::property_changed`](pathbind_core::Bindable::property_changed),
//!    filtered by member name;
//! 2. [`Bindable::member_event`](pathbind_core::Bindable::member_event) named
//!    `<Member>Changed`.
//!
//! An object offering neither is attached silently: only writes made through
//! the binding propagate.
//!
//! # Invariants
//!
//! 1. At most one live subscription at a time.
//! 2. Subscribing to the instance already watched is a no-op.
//! 3. `unsubscribe` is idempotent.
//! 4. The subscriber holds only a `Weak` link to its node.

use std::rc::Weak;

use pathbind_core::{Bindable, ObjectRef, Subscription, Value, same_object};

use crate::accessor::AccessorNode;

/// Which notification mechanism an attached object offered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Strategy {
    PropertyChanged,
    MemberEvent,
    Unavailable,
}

pub(crate) struct ChangeSubscriber {
    member: &'static str,
    node: Weak<AccessorNode>,
    source: Option<ObjectRef>,
    subscription: Option<Subscription>,
    strategy: Strategy,
}

impl ChangeSubscriber {
    pub(crate) fn new(member: &'static str, node: Weak<AccessorNode>) -> Self {
        Self {
            member,
            node,
            source: None,
            subscription: None,
            strategy: Strategy::Unavailable,
        }
    }

    /// Watch `parent_value` (the object the member is read from).
    pub(crate) fn subscribe(&mut self, parent_value: &Value) {
        let next = parent_value.as_object();
        let unchanged = match (&self.source, next) {
            (None, None) => true,
            (Some(current), Some(next)) => same_object(current, next),
            _ => false,
        };
        if unchanged {
            return;
        }

        self.unsubscribe();
        if let Some(obj) = next {
            let (subscription, strategy) = attach(obj, self.member, &self.node);
            tracing::trace!(
                member = self.member,
                owner = obj.descriptor().name,
                ?strategy,
                "change subscription attached"
            );
            self.source = Some(ObjectRef::clone(obj));
            self.subscription = subscription;
            self.strategy = strategy;
        }
    }

    pub(crate) fn unsubscribe(&mut self) {
        if self.source.take().is_some() {
            tracing::trace!(
                member = self.member,
                strategy = ?self.strategy,
                "change subscription released"
            );
        }
        self.subscription = None;
        self.strategy = Strategy::Unavailable;
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.source.is_some()
    }

    #[cfg(test)]
    pub(crate) fn strategy(&self) -> Strategy {
        self.strategy
    }
}

fn attach(
    obj: &ObjectRef,
    member: &'static str,
    node: &Weak<AccessorNode>,
) -> (Option<Subscription>, Strategy) {
    if let Some(event) = obj.property_changed() {
        let node = Weak::clone(node);
        let sub = event.subscribe(move |changed: &str| {
            if changed == member {
                if let Some(node) = node.upgrade() {
                    node.call_change_trigger();
                }
            }
        });
        return (Some(sub), Strategy::PropertyChanged);
    }

    if let Some(event) = obj.member_event(&format!("{member}Changed")) {
        let node = Weak::clone(node);
        let sub = event.subscribe(move |_| {
            if let Some(node) = node.upgrade() {
                node.call_change_trigger();
            }
        });
        return (Some(sub), Strategy::MemberEvent);
    }

    (None, Strategy::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use crate::path::resolve;
    use pathbind_core::{
        DynObject, Event, MemberDescriptor, Notify, TypeDescriptor, ValueType,
    };
    use std::rc::Rc;

    static BOX_MEMBERS: [MemberDescriptor; 1] =
        [MemberDescriptor::property("Level", ValueType::Int)];
    static BOX: TypeDescriptor = TypeDescriptor::new("Box", &BOX_MEMBERS);

    fn object(notify: Notify) -> Value {
        Value::Object(DynObject::new(&BOX, notify).shared())
    }

    #[test]
    fn picks_property_changed_first() {
        let mut sub = ChangeSubscriber::new("Level", Weak::new());
        sub.subscribe(&object(Notify::PropertyChanged));
        assert_eq!(sub.strategy(), Strategy::PropertyChanged);
    }

    /// Offers both notification styles for `Level`.
    struct Gauge {
        level: std::cell::Cell<i64>,
        property_changed: Event<str>,
        level_changed: Event,
    }

    impl Gauge {
        fn shared() -> Rc<Self> {
            Rc::new(Self {
                level: std::cell::Cell::new(0),
                property_changed: Event::new(),
                level_changed: Event::new(),
            })
        }

        fn raise_both(&self, level: i64) {
            self.level.set(level);
            self.property_changed.emit("Level");
            self.level_changed.emit(&());
        }
    }

    impl Bindable for Gauge {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &BOX
        }

        fn get_property(&self, name: &str) -> pathbind_core::Result<Value> {
            match name {
                "Level" => Ok(Value::Int(self.level.get())),
                _ => Err(pathbind_core::unknown_member(&BOX, name)),
            }
        }

        fn set_property(&self, name: &str, value: Value) -> pathbind_core::Result<()> {
            match (name, value) {
                ("Level", Value::Int(v)) => {
                    self.raise_both(v);
                    Ok(())
                }
                _ => Err(pathbind_core::unknown_member(&BOX, name)),
            }
        }

        fn property_changed(&self) -> Option<&Event<str>> {
            Some(&self.property_changed)
        }

        fn member_event(&self, event_name: &str) -> Option<&Event> {
            (event_name == "LevelChanged").then_some(&self.level_changed)
        }
    }

    #[test]
    fn structured_notification_wins_over_member_event() {
        let gauge = Gauge::shared();
        let leaf = AccessorNode::build_chain(&resolve(&path!(Level), &BOX).unwrap());
        leaf.attach_source(Value::Object(gauge.clone()));
        let hits = Rc::new(std::cell::Cell::new(0u32));
        let h = Rc::clone(&hits);
        leaf.set_change_callback(Some(Rc::new(move || h.set(h.get() + 1))));

        assert_eq!(leaf.strategy(), Some(Strategy::PropertyChanged));
        assert_eq!(gauge.property_changed.handler_count(), 1);
        assert_eq!(gauge.level_changed.handler_count(), 0);

        gauge.raise_both(7);
        assert_eq!(hits.get(), 1);
        assert_eq!(leaf.read().unwrap(), Value::Int(7));
    }

    #[test]
    fn falls_back_to_member_event() {
        let mut sub = ChangeSubscriber::new("Level", Weak::new());
        sub.subscribe(&object(Notify::MemberEvents));
        assert_eq!(sub.strategy(), Strategy::MemberEvent);
    }

    #[test]
    fn degrades_silently_without_notifications() {
        let mut sub = ChangeSubscriber::new("Level", Weak::new());
        sub.subscribe(&object(Notify::Silent));
        assert!(sub.is_subscribed());
        assert_eq!(sub.strategy(), Strategy::Unavailable);
    }

    #[test]
    fn same_instance_is_a_no_op() {
        let obj = DynObject::new(&BOX, Notify::MemberEvents).shared();
        let value = Value::Object(obj.clone());
        let mut sub = ChangeSubscriber::new("Level", Weak::new());
        sub.subscribe(&value);
        sub.subscribe(&value);
        let event = obj.member_event("LevelChanged").unwrap();
        assert_eq!(event.handler_count(), 1);
    }

    #[test]
    fn retargeting_releases_previous_instance() {
        let first = DynObject::new(&BOX, Notify::MemberEvents).shared();
        let second = DynObject::new(&BOX, Notify::MemberEvents).shared();
        let mut sub = ChangeSubscriber::new("Level", Weak::new());

        sub.subscribe(&Value::Object(first.clone()));
        sub.subscribe(&Value::Object(second.clone()));
        assert_eq!(first.member_event("LevelChanged").unwrap().handler_count(), 0);
        assert_eq!(second.member_event("LevelChanged").unwrap().handler_count(), 1);

        sub.subscribe(&Value::Null);
        assert!(!sub.is_subscribed());
        assert_eq!(Rc::strong_count(&second), 1);
    }

    #[test]
    fn unsubscribe_twice_is_harmless() {
        let mut sub = ChangeSubscriber::new("Level", Weak::new());
        sub.subscribe(&object(Notify::MemberEvents));
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_subscribed());
    }
}
