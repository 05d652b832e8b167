//! Explicit type-converter registry used when copying values between paths.
//!
//! [`ConverterRegistry::coerce`] applies a fixed fallback order:
//!
//! 1. the value already fits the destination type: assign it unchanged;
//! 2. the converter registered for the value's runtime type can produce the
//!    destination type;
//! 3. the converter registered for the destination type can consume the
//!    value's runtime type;
//! 4. otherwise fail with [`BindError::IncompatibleTypes`].
//!
//! # Built-in conversions
//!
//! | From | To | Rule |
//! |------|----|------|
//! | `Int` | `Text` | decimal formatting |
//! | `Int` | `Float` | widening |
//! | `Float` | `Text` | shortest round-trip formatting |
//! | `Bool` | `Text` | `"true"` / `"false"` |
//! | `Text` | `Int`, `Float`, `Bool` | parse after trimming whitespace |
//!
//! There is deliberately no `Float -> Int` rule and no generic stringification
//! of objects: those need an explicit converter.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::{BindError, Result};
use crate::types::ValueType;
use crate::value::Value;

thread_local! {
    static GLOBAL_REGISTRY: Rc<ConverterRegistry> = Rc::new(ConverterRegistry::with_builtins());
}

/// Converts values of one type to and from other types.
///
/// A converter is registered under the name of the type it belongs to.
/// `*_to` methods convert *from* that type; `*_from` methods convert *into* it.
pub trait TypeConverter {
    fn can_convert_to(&self, _target: &ValueType) -> bool {
        false
    }

    fn convert_to(&self, value: &Value, target: &ValueType) -> Result<Value> {
        Err(BindError::incompatible(value.type_name(), target.name()))
    }

    fn can_convert_from(&self, _source: &ValueType) -> bool {
        false
    }

    fn convert_from(&self, value: &Value) -> Result<Value>;
}

fn parse_failure(value: &Value, target: &str, reason: impl fmt::Display) -> BindError {
    BindError::Conversion {
        value: value.to_string(),
        target: target.to_owned(),
        reason: reason.to_string(),
    }
}

fn text_of<'a>(value: &'a Value, target: &str) -> Result<&'a str> {
    value
        .as_text()
        .map(str::trim)
        .ok_or_else(|| BindError::incompatible(value.type_name(), target))
}

struct IntConverter;

impl TypeConverter for IntConverter {
    fn can_convert_to(&self, target: &ValueType) -> bool {
        matches!(target, ValueType::Text | ValueType::Float)
    }

    fn convert_to(&self, value: &Value, target: &ValueType) -> Result<Value> {
        match (value, target) {
            (Value::Int(v), ValueType::Text) => Ok(Value::Text(v.to_string())),
            #[allow(clippy::cast_precision_loss)]
            (Value::Int(v), ValueType::Float) => Ok(Value::Float(*v as f64)),
            _ => Err(BindError::incompatible(value.type_name(), target.name())),
        }
    }

    fn can_convert_from(&self, source: &ValueType) -> bool {
        matches!(source, ValueType::Text)
    }

    fn convert_from(&self, value: &Value) -> Result<Value> {
        let text = text_of(value, "Int")?;
        text.parse::<i64>()
            .map(Value::Int)
            .map_err(|e| parse_failure(value, "Int", e))
    }
}

struct FloatConverter;

impl TypeConverter for FloatConverter {
    fn can_convert_to(&self, target: &ValueType) -> bool {
        matches!(target, ValueType::Text)
    }

    fn convert_to(&self, value: &Value, target: &ValueType) -> Result<Value> {
        match value {
            Value::Float(v) => Ok(Value::Text(v.to_string())),
            _ => Err(BindError::incompatible(value.type_name(), target.name())),
        }
    }

    fn can_convert_from(&self, source: &ValueType) -> bool {
        matches!(source, ValueType::Text)
    }

    fn convert_from(&self, value: &Value) -> Result<Value> {
        let text = text_of(value, "Float")?;
        text.parse::<f64>()
            .map(Value::Float)
            .map_err(|e| parse_failure(value, "Float", e))
    }
}

struct BoolConverter;

impl TypeConverter for BoolConverter {
    fn can_convert_to(&self, target: &ValueType) -> bool {
        matches!(target, ValueType::Text)
    }

    fn convert_to(&self, value: &Value, target: &ValueType) -> Result<Value> {
        match value {
            Value::Bool(v) => Ok(Value::Text(v.to_string())),
            _ => Err(BindError::incompatible(value.type_name(), target.name())),
        }
    }

    fn can_convert_from(&self, source: &ValueType) -> bool {
        matches!(source, ValueType::Text)
    }

    fn convert_from(&self, value: &Value) -> Result<Value> {
        let text = text_of(value, "Bool")?;
        if text.eq_ignore_ascii_case("true") {
            Ok(Value::Bool(true))
        } else if text.eq_ignore_ascii_case("false") {
            Ok(Value::Bool(false))
        } else {
            Err(parse_failure(value, "Bool", "expected `true` or `false`"))
        }
    }
}

/// Type-name keyed set of [`TypeConverter`]s.
pub struct ConverterRegistry {
    converters: RefCell<AHashMap<&'static str, Rc<dyn TypeConverter>>>,
}

impl ConverterRegistry {
    /// A registry without any converters: only direct assignment succeeds.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            converters: RefCell::new(AHashMap::new()),
        }
    }

    /// A registry preloaded with the built-in scalar conversions.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register(ValueType::Int.name(), IntConverter);
        registry.register(ValueType::Float.name(), FloatConverter);
        registry.register(ValueType::Bool.name(), BoolConverter);
        registry
    }

    /// The thread-wide registry used when no other registry is supplied.
    #[must_use]
    pub fn global() -> Rc<Self> {
        GLOBAL_REGISTRY.with(Rc::clone)
    }

    /// Register (or replace) the converter belonging to `type_name`.
    pub fn register(&self, type_name: &'static str, converter: impl TypeConverter + 'static) {
        self.converters
            .borrow_mut()
            .insert(type_name, Rc::new(converter));
    }

    #[must_use]
    pub fn converter_for(&self, ty: &ValueType) -> Option<Rc<dyn TypeConverter>> {
        self.converters.borrow().get(ty.name()).cloned()
    }

    /// Make `value` fit `target`, following the module-level fallback order.
    pub fn coerce(&self, value: Value, target: &ValueType) -> Result<Value> {
        if target.accepts(&value) {
            return Ok(value);
        }
        if let Some(source) = value.runtime_type() {
            if let Some(conv) = self
                .converter_for(&source)
                .filter(|c| c.can_convert_to(target))
            {
                return checked(conv.convert_to(&value, target)?, target);
            }
            if let Some(conv) = self
                .converter_for(target)
                .filter(|c| c.can_convert_from(&source))
            {
                return checked(conv.convert_from(&value)?, target);
            }
        }
        Err(BindError::incompatible(value.type_name(), target.name()))
    }
}

/// Reject converter output that still does not fit `target`.
fn checked(out: Value, target: &ValueType) -> Result<Value> {
    if target.accepts(&out) {
        Ok(out)
    } else {
        Err(BindError::incompatible(out.type_name(), target.name()))
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.converters.borrow().keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("ConverterRegistry")
            .field("converters", &names)
            .finish()
    }
}
