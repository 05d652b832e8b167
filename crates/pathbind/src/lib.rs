#![forbid(unsafe_code)]

//! Path-based data binding between object graphs.
//!
//! # Architecture
//!
//! ```text
//!  BindingContent ──owns──▶ BindingSplice ──▶ BindingNode (source)
//!                                        └──▶ BindingNode (target)
//!  BindingNode ──owns──▶ leaf AccessorNode ──▶ … ──▶ identity AccessorNode
//!                              │
//!                              └── ChangeSubscriber ──weak──▶ Bindable events
//! ```
//!
//! - A [`PathExpr`] (usually written with [`path!`]) is resolved once against
//!   the root's [`TypeDescriptor`](pathbind_core::TypeDescriptor).
//! - Each path step becomes an accessor node. Reads walk the chain from the
//!   root; null intermediates read as the member's default.
//! - A [`BindingNode`] fans endpoint changes out to registered triggers.
//! - A [`BindingSplice`] copies values between two nodes per [`Direction`],
//!   converting through the [`ConverterRegistry`](pathbind_core::ConverterRegistry)
//!   or an explicit converter pair.
//! - A [`BindingContent`] owns splices rooted at one object and clears them as
//!   a unit, optionally when a [`DisposeScope`] ends.
//!
//! Everything is single-threaded: handles are `Rc`-based and neither `Send`
//! nor `Sync`, and every notification runs synchronously on the caller's
//! thread.
//!
//! # Example
//!
//! ```
//! use pathbind::prelude::*;
//! use pathbind_core::{DynObject, MemberDescriptor, Notify, TypeDescriptor, Value, ValueType};
//!
//! static ADDRESS_MEMBERS: [MemberDescriptor; 1] =
//!     [MemberDescriptor::property("Zip", ValueType::Int)];
//! static ADDRESS: TypeDescriptor = TypeDescriptor::new("Address", &ADDRESS_MEMBERS);
//! static PERSON_MEMBERS: [MemberDescriptor; 1] =
//!     [MemberDescriptor::property("Home", ValueType::Object(&ADDRESS))];
//! static PERSON: TypeDescriptor = TypeDescriptor::new("Person", &PERSON_MEMBERS);
//! static FORM_MEMBERS: [MemberDescriptor; 1] =
//!     [MemberDescriptor::property("Text", ValueType::Text)];
//! static FORM: TypeDescriptor = TypeDescriptor::new("Form", &FORM_MEMBERS);
//!
//! let home = DynObject::new(&ADDRESS, Notify::MemberEvents).with("Zip", 10115).shared();
//! let person = DynObject::new(&PERSON, Notify::MemberEvents)
//!     .with("Home", Value::Object(home.clone()))
//!     .shared();
//! let form = DynObject::new(&FORM, Notify::PropertyChanged).shared();
//!
//! let content = person.binding_content();
//! content.bind(&path!(Home.Zip))?.to(form.clone(), &path!(Text))?;
//! content.read_source()?;
//! assert_eq!(form.get("Text")?, Value::from("10115"));
//!
//! form.set("Text", "20095")?;
//! assert_eq!(home.get("Zip")?, Value::Int(20095));
//! # Ok::<(), pathbind_core::BindError>(())
//! ```

mod accessor;
pub mod content;
pub mod ext;
pub mod node;
pub mod path;
pub mod scope;
pub mod splice;
mod subscriber;

pub use content::{BindingContent, BindingSection, ContentOptions, SuspendGuard};
pub use ext::BindableExt;
pub use node::{BindingNode, TriggerId};
pub use path::PathExpr;
pub use scope::DisposeScope;
pub use splice::{BindingSplice, Direction};

pub use pathbind_core::{BindError, Result};

/// Everything needed to declare and connect bindings.
pub mod prelude {
    pub use crate::path;
    pub use crate::{
        BindableExt, BindingContent, BindingNode, BindingSplice, ContentOptions, Direction,
        DisposeScope, PathExpr,
    };
}
