//! Binding contents: many splices anchored to one source root.
//!
//! A [`BindingContent`] is the usual entry point. It owns every splice created
//! through it, applies its default direction to new splices and tears them
//! all down on [`clear`](BindingContent::clear).
//!
//! ```
//! use pathbind::{BindingContent, path};
//! use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor, Value, ValueType};
//!
//! static MEMBERS: [MemberDescriptor; 1] = [MemberDescriptor::property("Level", ValueType::Int)];
//! static GAUGE: TypeDescriptor = TypeDescriptor::new("Gauge", &MEMBERS);
//!
//! let model = DynObject::new(&GAUGE, Notify::MemberEvents).with("Level", 4).shared();
//! let view = DynObject::new(&GAUGE, Notify::MemberEvents).shared();
//!
//! let content = BindingContent::new(model.clone());
//! content.bind(&path!(Level)).unwrap().to(view.clone(), &path!(Level)).unwrap();
//! content.read_source().unwrap();
//! assert_eq!(view.get("Level").unwrap(), Value::Int(4));
//!
//! view.set("Level", 9).unwrap();
//! assert_eq!(model.get("Level").unwrap(), Value::Int(9));
//!
//! content.clear();
//! view.set("Level", 1).unwrap();
//! assert_eq!(model.get("Level").unwrap(), Value::Int(9));
//! ```
//!
//! # Invariants
//!
//! 1. New splices take the default direction current at creation time.
//! 2. `clear()` disposes every owned splice exactly once and is idempotent.
//! 3. Bulk reads visit splices in creation order.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::rc::Rc;

use pathbind_core::{ConverterRegistry, ObjectRef, Result};

use crate::node::BindingNode;
use crate::path::PathExpr;
use crate::scope::DisposeScope;
use crate::splice::{BindingSplice, Direction};

/// Construction options for [`BindingContent`].
#[derive(Clone, Debug, Default)]
pub struct ContentOptions {
    /// Direction given to every new splice.
    pub default_direction: Direction,
    /// Registry for implicit conversions; the thread's global registry if `None`.
    pub registry: Option<Rc<ConverterRegistry>>,
}

pub(crate) struct ContentData {
    splices: RefCell<Vec<BindingSplice>>,
    default_direction: Cell<Direction>,
    registry: Rc<ConverterRegistry>,
}

impl ContentData {
    pub(crate) fn default_direction(&self) -> Direction {
        self.default_direction.get()
    }

    pub(crate) fn registry(&self) -> Rc<ConverterRegistry> {
        Rc::clone(&self.registry)
    }

    pub(crate) fn push(&self, splice: BindingSplice) {
        self.splices.borrow_mut().push(splice);
    }

    fn snapshot(&self) -> Vec<BindingSplice> {
        self.splices.borrow().clone()
    }

    fn clear(&self) {
        let splices = mem::take(&mut *self.splices.borrow_mut());
        if splices.is_empty() {
            return;
        }
        tracing::debug!(count = splices.len(), "binding content cleared");
        for splice in splices {
            splice.dispose();
        }
    }
}

/// Owner of the splices bound against one source root.
pub struct BindingContent {
    source: ObjectRef,
    data: Rc<ContentData>,
}

impl BindingContent {
    /// A content with two-way splices and the global converter registry.
    #[must_use]
    pub fn new(source: ObjectRef) -> Self {
        Self::with_options(source, ContentOptions::default())
    }

    #[must_use]
    pub fn with_options(source: ObjectRef, options: ContentOptions) -> Self {
        Self {
            source,
            data: Rc::new(ContentData {
                splices: RefCell::new(Vec::new()),
                default_direction: Cell::new(options.default_direction),
                registry: options.registry.unwrap_or_else(ConverterRegistry::global),
            }),
        }
    }

    #[must_use]
    pub fn source(&self) -> ObjectRef {
        ObjectRef::clone(&self.source)
    }

    #[must_use]
    pub fn default_direction(&self) -> Direction {
        self.data.default_direction()
    }

    /// Applies to splices created afterwards only.
    pub fn set_default_direction(&self, direction: Direction) {
        self.data.default_direction.set(direction);
    }

    /// Start a splice at `path` on the content's source.
    ///
    /// Finish it with [`BindingNode::to`]; the splice is then owned here.
    pub fn bind(&self, path: &PathExpr) -> Result<BindingNode> {
        BindingNode::in_content(ObjectRef::clone(&self.source), path, &self.data)
    }

    /// Copy source to target on every splice.
    pub fn read_source(&self) -> Result<()> {
        for splice in self.data.snapshot() {
            splice.read_source()?;
        }
        Ok(())
    }

    /// Copy target to source on every splice.
    pub fn read_target(&self) -> Result<()> {
        for splice in self.data.snapshot() {
            splice.read_target()?;
        }
        Ok(())
    }

    /// View of the splices whose target root is `target`.
    #[must_use]
    pub fn section(&self, target: &ObjectRef) -> BindingSection<'_> {
        BindingSection {
            data: &self.data,
            target: ObjectRef::clone(target),
        }
    }

    #[must_use]
    pub fn splices(&self) -> Vec<BindingSplice> {
        self.data.snapshot()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.splices.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.splices.borrow().is_empty()
    }

    /// Dispose and forget every splice.
    pub fn clear(&self) {
        self.data.clear();
    }

    /// Clear this content when `scope` is disposed.
    #[must_use]
    pub fn clear_on_dispose(self, scope: &mut DisposeScope) -> Self {
        let data = Rc::clone(&self.data);
        scope.defer(move || data.clear());
        self
    }
}

impl fmt::Debug for BindingContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContent")
            .field("source", &self.source.descriptor().name)
            .field("splices", &self.len())
            .field("default_direction", &self.default_direction())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Non-owning view over the splices of a content that target one object.
pub struct BindingSection<'a> {
    data: &'a ContentData,
    target: ObjectRef,
}

impl BindingSection<'_> {
    fn matching(&self) -> Vec<BindingSplice> {
        self.data
            .snapshot()
            .into_iter()
            .filter(|s| s.target().same_source(&self.target))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.matching().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matching().is_empty()
    }

    pub fn read_source(&self) -> Result<()> {
        for splice in self.matching() {
            splice.read_source()?;
        }
        Ok(())
    }

    pub fn read_target(&self) -> Result<()> {
        for splice in self.matching() {
            splice.read_target()?;
        }
        Ok(())
    }

    /// Stop target changes from propagating until the guard is released.
    ///
    /// Releasing the guard copies source to target on the same splices.
    #[must_use = "dropping the guard resumes immediately"]
    pub fn suspend(&self) -> SuspendGuard {
        let splices: Vec<BindingSplice> = self
            .matching()
            .into_iter()
            .filter(|s| s.suspend_target().is_ok())
            .collect();
        SuspendGuard { splices }
    }
}

impl fmt::Debug for BindingSection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingSection")
            .field("target", &self.target.descriptor().name)
            .field("splices", &self.len())
            .finish()
    }
}

/// Returned by [`BindingSection::suspend`].
pub struct SuspendGuard {
    splices: Vec<BindingSplice>,
}

impl SuspendGuard {
    /// Resume now, reporting the first copy error.
    pub fn resume(mut self) -> Result<()> {
        for splice in mem::take(&mut self.splices) {
            splice.read_source()?;
        }
        Ok(())
    }
}

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        for splice in mem::take(&mut self.splices) {
            if let Err(err) = splice.read_source() {
                tracing::warn!(
                    error = %err,
                    target_path = splice.target().path(),
                    "resume after suspend failed"
                );
            }
        }
    }
}

impl fmt::Debug for SuspendGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuspendGuard")
            .field("splices", &self.splices.len())
            .finish()
    }
}
