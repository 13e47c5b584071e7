//! Invocation-time error types.
//!
//! Resolution-time errors live in [`crate::dispatch::result`]; the types here
//! surface only once a resolved handle is actually invoked against concrete
//! values. Conversion failures in particular are deferred on purpose: whether
//! `"300"` fits an `i8` parameter depends on the value, not the type, so the
//! resolver accepts the candidate and the converter reports the failure.

use thiserror::Error;

/// Failure applying a registered or built-in conversion to a concrete value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    /// The source value could not be parsed or reshaped into the target type.
    #[error("cannot convert {value:?} to {target}")]
    Format {
        /// Rendering of the offending value.
        value: String,
        /// Name of the target type.
        target: String,
    },

    /// The source value parsed but falls outside the target type's range.
    #[error("value {value} is out of range for {target}")]
    Range {
        /// Rendering of the offending value.
        value: String,
        /// Name of the target type.
        target: String,
    },

    /// A string named no constant of the target enumeration.
    #[error("no constant named {value:?} in enumeration {enum_name}")]
    UnknownConstant {
        /// The constant name that was looked up.
        value: String,
        /// The enumeration type's registered name.
        enum_name: String,
    },
}

/// Failure invoking a resolved method, property, or iterator handle.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// A bound argument conversion failed on the concrete value.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The host invoker itself reported a failure.
    #[error("method {method:?} failed: {message}")]
    Host {
        /// Name of the failing member.
        method: String,
        /// Host-supplied failure description.
        message: String,
    },

    /// A sequence adapter was handed an index outside the sequence.
    #[error("index {index} is out of bounds for a sequence of length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: i64,
        /// The sequence length at invocation time.
        len: usize,
    },

    /// A handle was invoked with a different argument count than it was
    /// resolved for.
    #[error("method {method:?} was resolved for {expected} arguments but invoked with {got}")]
    Arity {
        /// Name of the member.
        method: String,
        /// Argument count the handle was bound for.
        expected: usize,
        /// Argument count supplied at invocation.
        got: usize,
    },

    /// An adapter invoker received a receiver of the wrong runtime shape.
    #[error("method {method:?} expects a {expected} receiver")]
    Receiver {
        /// Name of the member.
        method: String,
        /// The receiver shape the adapter requires.
        expected: &'static str,
    },
}

impl InvokeError {
    /// Convenience constructor for host-side failures.
    pub fn host(method: impl Into<String>, message: impl Into<String>) -> Self {
        InvokeError::Host {
            method: method.into(),
            message: message.into(),
        }
    }
}
