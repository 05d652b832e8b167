#![forbid(unsafe_code)]

//! Object model for pathbind.
//!
//! This crate provides the pieces a binding path walks over:
//! - [`Value`] and [`ValueType`] for dynamically typed member values
//! - [`TypeDescriptor`] / [`MemberDescriptor`] as a static replacement for reflection
//! - [`Bindable`] for objects exposing members and change notifications
//! - [`Event`] / [`Subscription`] for RAII-managed change events
//! - [`ConverterRegistry`] for the explicit type-conversion fallback
//! - [`BindError`] shared by every crate in the workspace

pub mod convert;
pub mod error;
pub mod event;
pub mod object;
pub mod types;
pub mod value;

pub use convert::{ConverterRegistry, TypeConverter};
pub use error::{BindError, Result};
pub use event::{Event, Subscription};
pub use object::{Bindable, DynObject, FieldSlot, Notify, ObjectRef, same_object, unknown_member};
pub use types::{MemberDescriptor, MemberKind, TypeDescriptor, ValueType};
pub use value::{FromValue, Value};
