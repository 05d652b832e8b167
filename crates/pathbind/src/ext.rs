//! Shorthands for starting bindings from a shared object.

use std::rc::Rc;

use pathbind_core::{Bindable, ObjectRef, Result};

use crate::content::BindingContent;
use crate::node::BindingNode;
use crate::path::PathExpr;

/// Binding constructors on `Rc<T>` for any [`Bindable`] `T`.
pub trait BindableExt {
    /// A fresh [`BindingContent`] rooted at this object.
    fn binding_content(&self) -> BindingContent;

    /// A standalone [`BindingNode`] at `path` on this object.
    fn bind(&self, path: &PathExpr) -> Result<BindingNode>;
}

impl<T: Bindable + 'static> BindableExt for Rc<T> {
    fn binding_content(&self) -> BindingContent {
        let source: ObjectRef = Rc::clone(self) as ObjectRef;
        BindingContent::new(source)
    }

    fn bind(&self, path: &PathExpr) -> Result<BindingNode> {
        BindingNode::new(Rc::clone(self) as ObjectRef, path)
    }
}
