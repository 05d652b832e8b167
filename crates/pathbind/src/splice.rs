//! Splices: synchronization links between two binding nodes.
//!
//! A [`BindingSplice`] copies the value at one endpoint into the other. The
//! first explicit copy ([`read_source`](BindingSplice::read_source) or
//! [`read_target`](BindingSplice::read_target)) binds the splice: from then
//! on the endpoints' change triggers re-run the copy according to the
//! current [`Direction`].
//!
//! # State machine
//!
//! | State | Entered by | Triggers registered |
//! |-------|------------|---------------------|
//! | `Unbound` | construction | none |
//! | `Bound` | first `read_*`, `direction()` while bound | per direction |
//! | `Disposed` | `dispose()`, owning content cleared | none |
//!
//! # Invariants
//!
//! 1. A copy raises the destination side's silent flag, so the destination's
//!    own trigger cannot start the opposite copy. A two-way splice performs
//!    exactly one copy per external change.
//! 2. Every operation on a disposed splice fails with
//!    [`BindError::UseAfterDispose`]; `dispose()` itself is idempotent.
//! 3. A failed copy leaves the destination untouched and the state unchanged.
//! 4. Dropping the last handle detaches the splice's triggers.
//!
//! # Failure Modes
//!
//! Triggers cannot return errors. Copy failures inside a trigger are logged at
//! `warn` level. A trigger firing for a disabled direction means the state
//! machine is desynchronized and panics.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use pathbind_core::{BindError, ConverterRegistry, FromValue, Result, Value};

use crate::accessor::Silence;
use crate::content::ContentData;
use crate::node::{BindingNode, TriggerId};
use crate::scope::DisposeScope;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Which way a bound splice propagates changes.
///
/// | Variant | Bits | Text |
/// |---------|------|------|
/// | `Manual` | `0` | `manual` |
/// | `SourceToTarget` | `1` | `source-to-target` |
/// | `TargetToSource` | `2` | `target-to-source` |
/// | `TwoWay` | `3` | `two-way` |
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum Direction {
    /// Only explicit `read_source` / `read_target` calls copy.
    Manual,
    SourceToTarget,
    TargetToSource,
    #[default]
    TwoWay,
}

impl Direction {
    const SOURCE_TO_TARGET: u8 = 1;
    const TARGET_TO_SOURCE: u8 = 2;

    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Manual => 0,
            Self::SourceToTarget => Self::SOURCE_TO_TARGET,
            Self::TargetToSource => Self::TARGET_TO_SOURCE,
            Self::TwoWay => Self::SOURCE_TO_TARGET | Self::TARGET_TO_SOURCE,
        }
    }

    #[must_use]
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Manual),
            1 => Some(Self::SourceToTarget),
            2 => Some(Self::TargetToSource),
            3 => Some(Self::TwoWay),
            _ => None,
        }
    }

    #[must_use]
    pub const fn source_to_target(self) -> bool {
        self.bits() & Self::SOURCE_TO_TARGET != 0
    }

    #[must_use]
    pub const fn target_to_source(self) -> bool {
        self.bits() & Self::TARGET_TO_SOURCE != 0
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::SourceToTarget => "source-to-target",
            Self::TargetToSource => "target-to-source",
            Self::TwoWay => "two-way",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = BindError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::Manual,
            Self::SourceToTarget,
            Self::TargetToSource,
            Self::TwoWay,
        ]
        .into_iter()
        .find(|d| s.trim().eq_ignore_ascii_case(d.as_str()))
        .ok_or_else(|| BindError::Conversion {
            value: s.to_owned(),
            target: "Direction".into(),
            reason: "expected manual, source-to-target, target-to-source or two-way".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// BindingSplice
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Unbound,
    Bound,
    Disposed,
}

#[derive(Clone, Copy, Debug)]
enum Side {
    Source,
    Target,
}

type Convert = Rc<dyn Fn(Value) -> Result<Value>>;

#[derive(Clone)]
struct Converters {
    to_target: Convert,
    to_source: Convert,
}

struct SpliceInner {
    source: BindingNode,
    target: BindingNode,
    direction: Cell<Direction>,
    state: Cell<State>,
    silent_source: Cell<bool>,
    silent_target: Cell<bool>,
    converters: RefCell<Option<Converters>>,
    registry: RefCell<Rc<ConverterRegistry>>,
    source_trigger: Cell<Option<TriggerId>>,
    target_trigger: Cell<Option<TriggerId>>,
}

/// A link keeping two binding nodes in sync.
///
/// Handles are cheap to clone and share one splice.
#[derive(Clone)]
pub struct BindingSplice {
    inner: Rc<SpliceInner>,
}

impl BindingSplice {
    /// Link `source` and `target` with a two-way, unbound splice.
    #[must_use]
    pub fn new(source: BindingNode, target: BindingNode) -> Self {
        Self::connect(source, target, None)
    }

    pub(crate) fn connect(
        source: BindingNode,
        target: BindingNode,
        content: Option<&Rc<ContentData>>,
    ) -> Self {
        let (direction, registry) = content.map_or_else(
            || (Direction::default(), ConverterRegistry::global()),
            |c| (c.default_direction(), c.registry()),
        );
        let splice = Self {
            inner: Rc::new(SpliceInner {
                source,
                target,
                direction: Cell::new(direction),
                state: Cell::new(State::Unbound),
                silent_source: Cell::new(false),
                silent_target: Cell::new(false),
                converters: RefCell::new(None),
                registry: RefCell::new(registry),
                source_trigger: Cell::new(None),
                target_trigger: Cell::new(None),
            }),
        };
        if let Some(content) = content {
            content.push(splice.clone());
        }
        splice
    }

    #[must_use]
    pub fn source(&self) -> &BindingNode {
        &self.inner.source
    }

    #[must_use]
    pub fn target(&self) -> &BindingNode {
        &self.inner.target
    }

    /// Copy source to target, binding the splice if it is not bound yet.
    pub fn read_source(&self) -> Result<&Self> {
        self.ensure_live()?;
        self.inner.copy(Side::Source)?;
        self.bind_if_unbound();
        Ok(self)
    }

    /// Copy target to source, binding the splice if it is not bound yet.
    pub fn read_target(&self) -> Result<&Self> {
        self.ensure_live()?;
        self.inner.copy(Side::Target)?;
        self.bind_if_unbound();
        Ok(self)
    }

    #[must_use]
    pub fn current_direction(&self) -> Direction {
        self.inner.direction.get()
    }

    /// Change the propagation direction; re-registers triggers when bound.
    pub fn direction(&self, direction: Direction) -> Result<&Self> {
        self.ensure_live()?;
        let previous = self.inner.direction.replace(direction);
        if self.inner.state.get() == State::Bound && previous != direction {
            tracing::debug!(
                source_path = self.inner.source.path(),
                target_path = self.inner.target.path(),
                from = %previous,
                to = %direction,
                "splice rebound"
            );
            self.install_triggers();
        }
        Ok(self)
    }

    /// Use explicit conversions instead of the registry, in both directions.
    ///
    /// ```
    /// use pathbind::{BindingNode, BindingSplice, path};
    /// use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor, Value, ValueType};
    ///
    /// static MEMBERS: [MemberDescriptor; 1] = [MemberDescriptor::property("Level", ValueType::Int)];
    /// static GAUGE: TypeDescriptor = TypeDescriptor::new("Gauge", &MEMBERS);
    ///
    /// let a = DynObject::new(&GAUGE, Notify::MemberEvents).with("Level", 3).shared();
    /// let b = DynObject::new(&GAUGE, Notify::MemberEvents).shared();
    /// let splice = BindingNode::new(a.clone(), &path!(Level))
    ///     .and_then(|node| node.to(b.clone(), &path!(Level)))
    ///     .unwrap();
    /// splice
    ///     .with_converting(|v: i64| Ok(v * 10), |v: i64| Ok(v / 10))
    ///     .and_then(BindingSplice::read_source)
    ///     .unwrap();
    /// assert_eq!(b.get("Level").unwrap(), Value::Int(30));
    /// ```
    pub fn with_converting<S, T>(
        &self,
        to_target: impl Fn(S) -> Result<T> + 'static,
        to_source: impl Fn(T) -> Result<S> + 'static,
    ) -> Result<&Self>
    where
        S: FromValue + Into<Value> + 'static,
        T: FromValue + Into<Value> + 'static,
    {
        self.ensure_live()?;
        let to_target: Convert = Rc::new(move |v| to_target(S::from_value(v)?).map(Into::into));
        let to_source: Convert = Rc::new(move |v| to_source(T::from_value(v)?).map(Into::into));
        *self.inner.converters.borrow_mut() = Some(Converters {
            to_target,
            to_source,
        });
        Ok(self)
    }

    /// Resolve implicit conversions through `registry` instead of the one
    /// inherited at construction.
    pub fn with_registry(&self, registry: Rc<ConverterRegistry>) -> Result<&Self> {
        self.ensure_live()?;
        *self.inner.registry.borrow_mut() = registry;
        Ok(self)
    }

    /// Ignore target changes until the next source-to-target copy.
    pub fn suspend_target(&self) -> Result<&Self> {
        self.ensure_live()?;
        self.inner.silent_target.set(true);
        Ok(self)
    }

    /// Unregister all triggers. Further operations fail; repeated calls are no-ops.
    pub fn dispose(&self) {
        if self.inner.state.replace(State::Disposed) == State::Disposed {
            return;
        }
        self.inner.remove_triggers();
        tracing::debug!(
            source_path = self.inner.source.path(),
            target_path = self.inner.target.path(),
            "splice disposed"
        );
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.state.get() == State::Disposed
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.inner.state.get() == State::Bound
    }

    /// Dispose this splice when `scope` is disposed.
    pub fn dispose_with(&self, scope: &mut DisposeScope) -> &Self {
        let splice = self.clone();
        scope.defer(move || splice.dispose());
        self
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            return Err(BindError::UseAfterDispose);
        }
        Ok(())
    }

    fn bind_if_unbound(&self) {
        if self.inner.state.get() == State::Unbound {
            self.install_triggers();
            tracing::debug!(
                source_path = self.inner.source.path(),
                target_path = self.inner.target.path(),
                direction = %self.inner.direction.get(),
                "splice bound"
            );
        }
    }

    fn install_triggers(&self) {
        let inner = &self.inner;
        inner.remove_triggers();
        let direction = inner.direction.get();
        if direction.source_to_target() {
            let weak = Rc::downgrade(inner);
            let id = inner
                .source
                .add_change_trigger(move || on_endpoint_changed(&weak, Side::Source));
            inner.source_trigger.set(Some(id));
        }
        if direction.target_to_source() {
            let weak = Rc::downgrade(inner);
            let id = inner
                .target
                .add_change_trigger(move || on_endpoint_changed(&weak, Side::Target));
            inner.target_trigger.set(Some(id));
        }
        inner.state.set(State::Bound);
    }
}

impl SpliceInner {
    /// Copy from `origin` to the opposite endpoint with the destination silenced.
    fn copy(&self, origin: Side) -> Result<()> {
        let (from, to, silent) = match origin {
            Side::Source => (&self.source, &self.target, &self.silent_target),
            Side::Target => (&self.target, &self.source, &self.silent_source),
        };
        let _quiet = Silence::raise(silent);

        let value = from.value()?;
        let converter = self.converters.borrow().clone().map(|c| match origin {
            Side::Source => c.to_target,
            Side::Target => c.to_source,
        });
        let value = match converter {
            Some(convert) => convert(value)?,
            None => {
                let registry = Rc::clone(&self.registry.borrow());
                registry.coerce(value, &to.value_type())?
            }
        };
        to.set_value(value)
    }

    fn remove_triggers(&self) {
        if let Some(id) = self.source_trigger.take() {
            self.source.remove_change_trigger(id);
        }
        if let Some(id) = self.target_trigger.take() {
            self.target.remove_change_trigger(id);
        }
    }

    fn on_changed(&self, side: Side) -> Result<()> {
        let direction = self.direction.get();
        let (enabled, silent) = match side {
            Side::Source => (direction.source_to_target(), &self.silent_source),
            Side::Target => (direction.target_to_source(), &self.silent_target),
        };
        if !enabled {
            return Err(BindError::InternalConsistency(match side {
                Side::Source => "source trigger fired while source-to-target is disabled",
                Side::Target => "target trigger fired while target-to-source is disabled",
            }));
        }
        if silent.get() {
            return Ok(());
        }
        self.copy(side)
    }
}

fn on_endpoint_changed(splice: &Weak<SpliceInner>, side: Side) {
    let Some(splice) = splice.upgrade() else {
        return;
    };
    if splice.state.get() == State::Disposed {
        return;
    }
    if let Err(err) = splice.on_changed(side) {
        if err.is_fatal() {
            panic!("{err}");
        }
        tracing::warn!(
            error = %err,
            ?side,
            source_path = splice.source.path(),
            target_path = splice.target.path(),
            "change propagation failed"
        );
    }
}

impl Drop for SpliceInner {
    fn drop(&mut self) {
        self.remove_triggers();
    }
}

impl fmt::Debug for BindingSplice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSplice")
            .field("source", &self.inner.source)
            .field("target", &self.inner.target)
            .field("direction", &self.inner.direction.get())
            .field("state", &self.inner.state.get())
            .field("converting", &self.inner.converters.borrow().is_some())
            .finish()
    }
}
