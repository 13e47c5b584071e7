//! Runtime Introspection for the Vellum Template Engine
//!
//! Templates reference host objects without compile-time knowledge of
//! their types, so every method call, property access, and loop in a
//! rendering pass comes through this crate: it inspects the target's
//! registered type, picks the right overload for the actual argument
//! values, binds any needed type conversions, and hands back an invocable
//! handle.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌────────────────┐    ┌───────────────────┐
//! │ evaluator │◄──►│ facade chain   │◄──►│ resolver + tables │
//! │ (caller)  │    │ (policy links) │    │ + conversions     │
//! └───────────┘    └────────────────┘    └───────────────────┘
//! ```
//!
//! The evaluator talks to an [`Introspect`] facade, optionally wrapped in
//! restriction and deprecation decorators. The base [`Introspector`]
//! resolves against per-type member tables cached in a shared
//! [`ResolutionContext`], consulting the [`ConversionRegistry`] when no
//! overload fits the actual types directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vellum_introspect::{
//!     DescriptorBuilder, Introspect, Introspector, MethodSig, ResolutionContext,
//!     SourceLocation, TypeDesc, Value,
//! };
//!
//! let context = Arc::new(ResolutionContext::new());
//! context.register(
//!     DescriptorBuilder::new("Greeter")
//!         .method(
//!             MethodSig::new("greet", vec![TypeDesc::Str], TypeDesc::Str)
//!                 .with_invoker(|_target, args| {
//!                     Ok(Value::str(format!("hello, {}", args[0])))
//!                 }),
//!         )
//!         .build(),
//! );
//!
//! // `greeter` is a `Value::object` wrapping a host that reports the
//! // descriptor registered above.
//! let facade = Introspector::new(context);
//! let args = [Value::str("world")];
//! let handle = facade
//!     .resolve_method(&greeter, "greet", &args, &SourceLocation::unknown())?
//!     .expect("greet is registered");
//! assert_eq!(handle.invoke(&greeter, &args)?, Value::str("hello, world"));
//! ```

pub mod config;
pub mod context;
pub mod convert;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod facade;
pub mod table;
pub mod value;

pub use config::{
    build_introspector, ConfigError, ConversionMode, IntrospectConfig, RestrictionConfig,
};
pub use context::ResolutionContext;
pub use convert::{ConversionRegistry, Converter};
pub use descriptor::{
    DeclaringType, DescriptorBuilder, FieldSig, MemberFlags, MethodSig, TypeDesc, TypeDescriptor,
    TypeIdentity,
};
pub use dispatch::{
    Ambiguity, Applicability, NoMatch, Resolution, ResolveError, ResolvedMethod, Resolver,
    Specificity, TypeLookup,
};
pub use error::{ConversionError, InvokeError};
pub use events::{EventSink, IntrospectEvent, RecordingSink, SourceLocation, TracingSink};
pub use facade::{
    DeprecationIntrospector, Introspect, Introspector, MethodHandle, PropertyGetHandle,
    PropertySetHandle, RestrictedIntrospector, RestrictionRules, ValueIter,
};
pub use table::MemberTable;
pub use value::{ArgType, HostObject, ListCell, MapCell, MapKey, Value};
