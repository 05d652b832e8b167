//! Accessor nodes: one runtime node per resolved path step.
//!
//! A chain is built bottom-up from a resolved path: an identity node holding
//! the attached root, then one member node per step, each owning its parent.
//! Binding nodes only talk to the leaf.
//!
//! # Invariants
//!
//! 1. Reads always walk the chain from the root; nothing is cached.
//! 2. A null intermediate object yields the member type's default value on
//!    read and swallows writes, but the write still fires the change trigger.
//! 3. A member node re-targets its change subscription *before* invoking its
//!    own trigger when the parent value changes.
//! 4. A write through a member node fires its trigger exactly once, however
//!    many notifications the underlying object raises during the write.
//! 5. Callbacks and subscriptions refer to nodes through `Weak` only; the
//!    parent link is the single ownership edge.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use pathbind_core::{
    BindError, Bindable, MemberDescriptor, MemberKind, ObjectRef, Result, Value, unknown_member,
};

use crate::path::ResolvedPath;
use crate::subscriber::ChangeSubscriber;

pub(crate) type ChangeCallback = Rc<dyn Fn()>;

/// Raises a `Cell<bool>` flag for the guard's lifetime.
pub(crate) struct Silence<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> Silence<'a> {
    pub(crate) fn raise(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for Silence<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// How a member step reads and writes its slice of the object graph.
#[derive(Clone, Copy)]
pub(crate) enum MemberAccessor {
    Property(&'static MemberDescriptor),
    Field(&'static MemberDescriptor),
}

impl MemberAccessor {
    fn new(member: &'static MemberDescriptor) -> Self {
        match member.kind {
            MemberKind::Property => Self::Property(member),
            MemberKind::Field => Self::Field(member),
        }
    }

    fn descriptor(self) -> &'static MemberDescriptor {
        match self {
            Self::Property(m) | Self::Field(m) => m,
        }
    }

    fn read(self, owner: &ObjectRef) -> Result<Value> {
        match self {
            Self::Property(m) => owner.get_property(m.name),
            Self::Field(m) => owner
                .field(m.name)
                .map(|slot| slot.get())
                .ok_or_else(|| unknown_member(owner.descriptor(), m.name)),
        }
    }

    fn write(self, owner: &ObjectRef, value: Value) -> Result<()> {
        match self {
            Self::Property(m) => owner.set_property(m.name, value),
            Self::Field(m) => {
                let slot = owner
                    .field(m.name)
                    .ok_or_else(|| unknown_member(owner.descriptor(), m.name))?;
                slot.set(value);
                Ok(())
            }
        }
    }
}

enum Step {
    Identity {
        source: RefCell<Value>,
    },
    Member {
        parent: Rc<AccessorNode>,
        accessor: MemberAccessor,
        subscriber: RefCell<ChangeSubscriber>,
    },
}

pub(crate) struct AccessorNode {
    step: Step,
    callback: RefCell<Option<ChangeCallback>>,
    silent: Cell<bool>,
    this: Weak<AccessorNode>,
}

impl AccessorNode {
    /// Build the chain for `path` and return its leaf.
    pub(crate) fn build_chain(path: &ResolvedPath) -> Rc<Self> {
        path.steps
            .iter()
            .copied()
            .fold(Self::identity(), |parent, member| Self::member(parent, member))
    }

    fn identity() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            step: Step::Identity {
                source: RefCell::new(Value::Null),
            },
            callback: RefCell::new(None),
            silent: Cell::new(false),
            this: Weak::clone(this),
        })
    }

    fn member(parent: Rc<Self>, member: &'static MemberDescriptor) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            step: Step::Member {
                parent,
                accessor: MemberAccessor::new(member),
                subscriber: RefCell::new(ChangeSubscriber::new(member.name, Weak::clone(this))),
            },
            callback: RefCell::new(None),
            silent: Cell::new(false),
            this: Weak::clone(this),
        })
    }

    /// Current value at this step.
    pub(crate) fn read(&self) -> Result<Value> {
        match &self.step {
            Step::Identity { source } => Ok(source.borrow().clone()),
            Step::Member {
                parent, accessor, ..
            } => match parent.read()? {
                Value::Null => Ok(accessor.descriptor().value_type.default_value()),
                Value::Object(owner) => accessor.read(&owner),
                other => Err(not_an_object(&other, accessor.descriptor())),
            },
        }
    }

    /// Store `value` at this step and fire the change trigger once.
    pub(crate) fn write(&self, value: Value) -> Result<()> {
        match &self.step {
            Step::Identity { .. } => {
                self.attach_source(value);
                Ok(())
            }
            Step::Member {
                parent, accessor, ..
            } => {
                match parent.read()? {
                    Value::Null => {}
                    Value::Object(owner) => {
                        let _quiet = Silence::raise(&self.silent);
                        accessor.write(&owner, value)?;
                    }
                    other => return Err(not_an_object(&other, accessor.descriptor())),
                }
                self.call_change_trigger();
                Ok(())
            }
        }
    }

    /// Point the chain at a new root object.
    pub(crate) fn attach_source(&self, source: Value) {
        match &self.step {
            Step::Identity { source: slot } => {
                *slot.borrow_mut() = source;
                self.call_change_trigger();
            }
            Step::Member { parent, .. } => parent.attach_source(source),
        }
    }

    /// Install (`Some`) or remove (`None`) the single change callback.
    ///
    /// Member nodes start or stop listening on their parent's value and pass
    /// a re-targeting callback up the chain, so removal releases every
    /// subscription transitively.
    pub(crate) fn set_change_callback(&self, callback: Option<ChangeCallback>) {
        let listening = callback.is_some();
        *self.callback.borrow_mut() = callback;

        if let Step::Member {
            parent, subscriber, ..
        } = &self.step
        {
            if listening {
                let parent_value = value_or_null(parent);
                subscriber.borrow_mut().subscribe(&parent_value);
                let this = Weak::clone(&self.this);
                parent.set_change_callback(Some(Rc::new(move || {
                    if let Some(node) = this.upgrade() {
                        node.on_source_changed();
                    }
                })));
            } else {
                subscriber.borrow_mut().unsubscribe();
                parent.set_change_callback(None);
            }
        }
    }

    /// Invoke the change callback unless this node is writing.
    pub(crate) fn call_change_trigger(&self) {
        if self.silent.get() {
            return;
        }
        let callback = self.callback.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Whether this node or any ancestor holds a live change subscription.
    pub(crate) fn is_listening(&self) -> bool {
        match &self.step {
            Step::Identity { .. } => self.callback.borrow().is_some(),
            Step::Member {
                parent, subscriber, ..
            } => subscriber.borrow().is_subscribed() || parent.is_listening(),
        }
    }

    #[cfg(test)]
    pub(crate) fn strategy(&self) -> Option<crate::subscriber::Strategy> {
        match &self.step {
            Step::Identity { .. } => None,
            Step::Member { subscriber, .. } => Some(subscriber.borrow().strategy()),
        }
    }

    fn on_source_changed(&self) {
        if let Step::Member {
            parent, subscriber, ..
        } = &self.step
        {
            let parent_value = value_or_null(parent);
            subscriber.borrow_mut().subscribe(&parent_value);
        }
        self.call_change_trigger();
    }
}

fn value_or_null(parent: &AccessorNode) -> Value {
    parent.read().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "cannot read parent value, change subscription detached");
        Value::Null
    })
}

fn not_an_object(value: &Value, member: &MemberDescriptor) -> BindError {
    BindError::IncompatibleTypes {
        from: value.type_name().to_owned(),
        to: format!("owner of `{}`", member.name),
    }
}

impl fmt::Debug for AccessorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Step::Identity { .. } => f.write_str("Identity"),
            Step::Member {
                parent, accessor, ..
            } => {
                let kind = match accessor {
                    MemberAccessor::Property(_) => "property",
                    MemberAccessor::Field(_) => "field",
                };
                write!(f, "{parent:?} -> {} ({kind})", accessor.descriptor().name)
            }
        }
    }
}
