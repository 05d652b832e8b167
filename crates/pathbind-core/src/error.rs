//! Error type shared by every binding operation.
//!
//! # Failure Modes
//!
//! | Failure | Raised by | Effect |
//! |---------|-----------|--------|
//! | `PathNotSupported` | path resolution | node is never built |
//! | `UnknownMember` | path resolution, misbehaving [`Bindable`](crate::Bindable) | node is never built / read fails |
//! | `IncompatibleTypes` | value copy, typed reads | destination left untouched |
//! | `Conversion` | value copy | destination left untouched |
//! | `UseAfterDispose` | any splice operation after `dispose()` | caller lifecycle bug |
//! | `InternalConsistency` | splice callbacks | fatal, the splice state machine is desynchronized |
//!
//! Reading through a null intermediate object is *not* an error: the
//! member's default value is produced instead.

/// Errors raised while resolving, reading, writing or synchronizing bindings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    /// The path contains a step that is not a property or field access.
    #[error("path `{path}` is not supported: {reason}")]
    PathNotSupported { path: String, reason: String },

    /// A member name could not be found on a type.
    #[error("type `{type_name}` has no member `{member}`")]
    UnknownMember { type_name: String, member: String },

    /// No direct assignment or converter bridges the two types.
    #[error("incompatible data types {from} and {to}")]
    IncompatibleTypes { from: String, to: String },

    /// A converter was selected but rejected the value.
    #[error("cannot convert {value} to {target}: {reason}")]
    Conversion {
        value: String,
        target: String,
        reason: String,
    },

    /// The splice has already been disposed.
    #[error("binding splice has already been disposed")]
    UseAfterDispose,

    /// A callback fired for a direction that is not enabled.
    #[error("internal consistency error: {0}")]
    InternalConsistency(&'static str),
}

impl BindError {
    pub(crate) fn incompatible(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::IncompatibleTypes {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Whether this error signals a bug in the binding engine itself.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InternalConsistency(_))
    }
}

/// Result alias used throughout pathbind.
pub type Result<T, E = BindError> = std::result::Result<T, E>;
