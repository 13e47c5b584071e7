//! The facade consumed by the template evaluator.
//!
//! Everything the evaluator needs funnels through the [`Introspect`] trait:
//! resolving a method call, a property read or write, or an iteration over
//! a reference. Each operation answers `Ok(Some(handle))`,
//! `Ok(None)` for "no such member" (the caller surfaces a missing-reference
//! condition), or an error only for genuine resolution failures (ambiguity,
//! no exported declaration).
//!
//! Policy concerns wrap the base [`Introspector`] by composition:
//! [`RestrictedIntrospector`] screens denied types and members before
//! delegating, [`DeprecationIntrospector`] observes resolved metadata after
//! delegating. Both implement [`Introspect`] themselves, so chains assemble
//! in any order.
//!
//! # Module Structure
//!
//! - [`introspector`] - Base implementation and method handles
//! - [`property`] - Ordered property-access strategies and their handles
//! - [`iterate`] - Iteration adapters
//! - [`policy`] - Restriction and deprecation decorators

mod introspector;
mod iterate;
mod policy;
mod property;

pub use introspector::{Introspector, MethodHandle};
pub use iterate::ValueIter;
pub use policy::{DeprecationIntrospector, RestrictedIntrospector, RestrictionRules};
pub use property::{PropertyGetHandle, PropertySetHandle};

use crate::dispatch::ResolveError;
use crate::events::SourceLocation;
use crate::value::Value;

/// Resolution facade the template evaluator calls into.
pub trait Introspect: Send + Sync {
    /// Resolves a method call against the target's runtime type and the
    /// actual argument values.
    fn resolve_method(
        &self,
        target: &Value,
        name: &str,
        args: &[Value],
        location: &SourceLocation,
    ) -> Result<Option<MethodHandle>, ResolveError>;

    /// Resolves a property read using the ordered fallback strategies
    /// (bean accessor, map access, sequence adapter, public field).
    fn resolve_property_get(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertyGetHandle>, ResolveError>;

    /// Resolves a property write.
    fn resolve_property_set(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertySetHandle>, ResolveError>;

    /// Resolves an iteration adapter, or `None` when the value cannot be
    /// iterated.
    fn resolve_iterator(
        &self,
        target: &Value,
        location: &SourceLocation,
    ) -> Result<Option<ValueIter>, ResolveError>;
}
