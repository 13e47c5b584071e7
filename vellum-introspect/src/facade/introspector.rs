//! The base facade implementation and method handles.
//!
//! A [`MethodHandle`] is a fully bound call: the winning signature (with
//! its declaration re-homed onto an exported type), one conversion step per
//! argument position, and the variadic packing point if the call expanded a
//! trailing sequence parameter. Invocation applies the bound steps and
//! hands the converted arguments to the registered invoker; this is where
//! deferred conversion errors finally surface.

use std::sync::Arc;

use tracing::debug;

use crate::context::ResolutionContext;
use crate::convert::{widen_numeric, ConversionRegistry, Converter};
use crate::descriptor::{
    DeclaringType, MemberFlags, MethodSig, TypeDesc, TypeDescriptor,
};
use crate::dispatch::{
    position_applicability, Applicability, Resolution, ResolveError, Resolver,
};
use crate::error::InvokeError;
use crate::events::SourceLocation;
use crate::value::{ArgType, Value};

use super::{iterate, property, Introspect, PropertyGetHandle, PropertySetHandle, ValueIter};

/// Per-position conversion step bound at resolution time.
#[derive(Clone)]
pub(crate) enum ArgStep {
    /// Pass the value through.
    Direct,
    /// Apply the infallible numeric widening to the formal type.
    Widen(TypeDesc),
    /// Apply a registered or built-in conversion; may fail at invocation.
    Convert(Converter),
}

/// A resolved, conversion-bound, invocable method.
pub struct MethodHandle {
    sig: MethodSig,
    steps: Vec<ArgStep>,
    pack_from: Option<usize>,
}

impl MethodHandle {
    /// Member name.
    pub fn name(&self) -> &str {
        &self.sig.name
    }

    /// Whether the underlying signature absorbs trailing arguments.
    pub fn is_variadic(&self) -> bool {
        self.sig.is_variadic()
    }

    /// The (re-homed) declaration this handle reports.
    pub fn declaring_type(&self) -> &DeclaringType {
        &self.sig.declared_by
    }

    /// The bound signature.
    pub fn signature(&self) -> &MethodSig {
        &self.sig
    }

    /// Metadata flags of the bound member.
    pub fn member_flags(&self) -> MemberFlags {
        self.sig.flags
    }

    /// Invokes the method: applies the bound conversion steps, packs the
    /// variadic tail if the call expanded one, and calls the registered
    /// invoker.
    pub fn invoke(&self, target: &Value, args: &[Value]) -> Result<Value, InvokeError> {
        if args.len() != self.steps.len() {
            return Err(InvokeError::Arity {
                method: self.sig.name.to_string(),
                expected: self.steps.len(),
                got: args.len(),
            });
        }
        let mut converted = Vec::with_capacity(args.len());
        for (arg, step) in args.iter().zip(&self.steps) {
            converted.push(match step {
                ArgStep::Direct => arg.clone(),
                ArgStep::Widen(formal) => widen_numeric(arg, formal),
                ArgStep::Convert(conv) => conv(arg)?,
            });
        }
        if let Some(from) = self.pack_from {
            let tail = converted.split_off(from);
            converted.push(Value::list(tail));
        }
        self.sig.invoke(target, &converted)
    }
}

impl std::fmt::Debug for MethodHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodHandle")
            .field("sig", &self.sig)
            .field("bound_args", &self.steps.len())
            .field("pack_from", &self.pack_from)
            .finish()
    }
}

/// The conversion step for one argument position, derived from the level
/// the position matched at.
fn step_for(formal: &TypeDesc, actual: &ArgType, conversions: &ConversionRegistry) -> ArgStep {
    match position_applicability(formal, actual, conversions) {
        Applicability::Strict => ArgStep::Direct,
        Applicability::Implicit => {
            if formal.is_primitive() {
                ArgStep::Widen(formal.clone())
            } else {
                // Boxing to the top type keeps the value representation.
                ArgStep::Direct
            }
        }
        Applicability::Explicit => match conversions.needed_converter(formal, actual) {
            Some(conv) => ArgStep::Convert(conv),
            None => ArgStep::Direct,
        },
        Applicability::NotApplicable => ArgStep::Direct,
    }
}

/// Normalizes accessibility and binds per-argument conversion steps for a
/// resolved call.
pub(crate) fn bind_method(
    context: &ResolutionContext,
    receiver: &Arc<TypeDescriptor>,
    resolved: crate::dispatch::ResolvedMethod,
    args: &[ArgType],
) -> Result<MethodHandle, ResolveError> {
    let lookup = |name: &str| context.lookup_type(name);
    let resolver = Resolver::new(&lookup, context.conversions());
    let sig = resolver.normalize_access(&resolved.sig, receiver)?;

    let n = sig.params.len();
    let mut steps = Vec::with_capacity(args.len());
    for (i, actual) in args.iter().enumerate() {
        let formal = if resolved.spread && i + 1 >= n {
            sig.variadic_element().unwrap_or(&sig.params[n - 1])
        } else {
            &sig.params[i.min(n.saturating_sub(1))]
        };
        steps.push(step_for(formal, actual, context.conversions()));
    }
    let pack_from = resolved.spread.then(|| n - 1);
    Ok(MethodHandle {
        sig,
        steps,
        pack_from,
    })
}

/// Base facade: resolves against the registered descriptor graph with no
/// policy applied.
pub struct Introspector {
    context: Arc<ResolutionContext>,
}

impl Introspector {
    /// New facade over a resolution context.
    pub fn new(context: Arc<ResolutionContext>) -> Self {
        Introspector { context }
    }

    /// The owning context.
    pub fn context(&self) -> &Arc<ResolutionContext> {
        &self.context
    }

    /// Resolves and binds a method against an already known descriptor and
    /// argument types. Shared by the property and iterator strategies.
    pub(crate) fn resolve_on_descriptor(
        &self,
        desc: &Arc<TypeDescriptor>,
        name: &str,
        arg_types: &[ArgType],
    ) -> Result<Option<MethodHandle>, ResolveError> {
        let table = self.context.member_table(desc);
        let lookup = |n: &str| self.context.lookup_type(n);
        let resolver = Resolver::new(&lookup, self.context.conversions());
        match resolver.resolve(&table, name, arg_types) {
            Resolution::Resolved(resolved) => {
                bind_method(&self.context, desc, resolved, arg_types).map(Some)
            }
            Resolution::NoMatch(miss) => {
                debug!(%miss, "method lookup missed");
                Ok(None)
            }
            Resolution::Ambiguous(amb) => Err(amb.into()),
        }
    }
}

impl Introspect for Introspector {
    fn resolve_method(
        &self,
        target: &Value,
        name: &str,
        args: &[Value],
        _location: &SourceLocation,
    ) -> Result<Option<MethodHandle>, ResolveError> {
        if target.is_null() {
            return Ok(None);
        }
        let Some(desc) = self.context.descriptor_for(target) else {
            return Ok(None);
        };
        let arg_types: Vec<ArgType> = args.iter().map(Value::arg_type).collect();
        self.resolve_on_descriptor(&desc, name, &arg_types)
    }

    fn resolve_property_get(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertyGetHandle>, ResolveError> {
        property::resolve_get(self, target, identifier, location)
    }

    fn resolve_property_set(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertySetHandle>, ResolveError> {
        property::resolve_set(self, target, identifier, location)
    }

    fn resolve_iterator(
        &self,
        target: &Value,
        location: &SourceLocation,
    ) -> Result<Option<ValueIter>, ResolveError> {
        iterate::resolve(self, target, location)
    }
}
