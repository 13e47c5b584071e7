//! Property access strategies.
//!
//! A property reference like `$order.total` is not a method call, so the
//! facade probes a fixed ladder of strategies and the first hit wins:
//!
//! 1. Bean-style accessor: `get` + identifier (then `is` + identifier for
//!    boolean reads, `set` + identifier for writes), trying the
//!    first-letter-uppercased spelling before the lowercased one.
//! 2. Map-style access: native maps read and write keys directly; host
//!    objects that expose `get(key)` / `put(key, value)` taking a string
//!    or top-type key are routed through those methods.
//! 3. The sequence adapter surface, for native sequences only: the bare
//!    identifier resolved as a zero-argument method (`$items.size`).
//! 4. A declared public field with the exact identifier name.
//!
//! Reads bind fully at resolution time. Writes cannot: the value is not
//! known until assignment, so a bean-setter write only proves at resolution
//! time that a one-argument candidate exists, and re-enters overload
//! resolution with the concrete value type when [`PropertySetHandle::set`]
//! runs. Failures at that point are invocation errors, not resolution
//! errors.

use std::sync::Arc;

use crate::context::ResolutionContext;
use crate::descriptor::{FieldSig, MemberFlags, MethodSig, TypeDesc, TypeDescriptor};
use crate::dispatch::{Resolution, ResolveError, Resolver};
use crate::error::InvokeError;
use crate::events::SourceLocation;
use crate::value::{ArgType, MapKey, Value};

use super::introspector::{bind_method, Introspector, MethodHandle};

/// How a resolved property read is carried out.
enum GetKind {
    /// A bound zero-argument accessor method.
    Accessor(MethodHandle),
    /// Direct key lookup on a native map; missing keys read as null.
    MapKey,
    /// A bound `get(key)` call on a map-like host object.
    MapMethod { handle: MethodHandle, key: Value },
    /// A declared public field with a registered reader.
    Field(FieldSig),
}

/// A resolved property read.
pub struct PropertyGetHandle {
    name: Arc<str>,
    kind: GetKind,
}

impl PropertyGetHandle {
    /// The identifier this handle was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata flags of the member backing the read.
    pub fn member_flags(&self) -> MemberFlags {
        match &self.kind {
            GetKind::Accessor(handle) | GetKind::MapMethod { handle, .. } => {
                handle.member_flags()
            }
            GetKind::MapKey => MemberFlags::PUBLIC,
            GetKind::Field(field) => field.flags,
        }
    }

    /// Performs the read.
    pub fn get(&self, target: &Value) -> Result<Value, InvokeError> {
        match &self.kind {
            GetKind::Accessor(handle) => handle.invoke(target, &[]),
            GetKind::MapKey => {
                let cell = target.as_map().ok_or(InvokeError::Receiver {
                    method: self.name.to_string(),
                    expected: "map",
                })?;
                let value = cell
                    .read()
                    .get(&MapKey::from(self.name.as_ref()))
                    .cloned()
                    .unwrap_or(Value::Null);
                Ok(value)
            }
            GetKind::MapMethod { handle, key } => {
                handle.invoke(target, std::slice::from_ref(key))
            }
            GetKind::Field(field) => field.read(target),
        }
    }
}

impl std::fmt::Debug for PropertyGetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategy = match &self.kind {
            GetKind::Accessor(_) => "accessor",
            GetKind::MapKey => "map-key",
            GetKind::MapMethod { .. } => "map-method",
            GetKind::Field(_) => "field",
        };
        f.debug_struct("PropertyGetHandle")
            .field("name", &self.name)
            .field("strategy", &strategy)
            .finish()
    }
}

/// How a resolved property write is carried out.
enum SetKind {
    /// A bean setter whose overload choice waits for the concrete value.
    Deferred {
        context: Arc<ResolutionContext>,
        desc: Arc<TypeDescriptor>,
        method: Arc<str>,
    },
    /// Direct key insertion on a native map.
    MapKey,
    /// A bound `put(key, value)` call on a map-like host object.
    MapMethod { handle: MethodHandle, key: Value },
    /// A declared public field with a registered writer.
    Field(FieldSig),
}

/// A resolved property write.
///
/// [`set`](PropertySetHandle::set) returns the host method's result where
/// one exists: `put` conventionally yields the previous value. Field and
/// direct-map writes yield the replaced value or null.
pub struct PropertySetHandle {
    name: Arc<str>,
    flags: MemberFlags,
    kind: SetKind,
}

impl PropertySetHandle {
    /// The identifier this handle was resolved for.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Metadata flags of the member backing the write. For a deferred
    /// setter this is the intersection across the capable candidates, so a
    /// deprecation warning fires only when every overload is deprecated.
    pub fn member_flags(&self) -> MemberFlags {
        self.flags
    }

    /// Performs the write.
    pub fn set(&self, target: &Value, value: &Value) -> Result<Value, InvokeError> {
        match &self.kind {
            SetKind::Deferred {
                context,
                desc,
                method,
            } => invoke_deferred_setter(context, desc, method, target, value),
            SetKind::MapKey => {
                let cell = target.as_map().ok_or(InvokeError::Receiver {
                    method: self.name.to_string(),
                    expected: "map",
                })?;
                let previous = cell
                    .write()
                    .insert(MapKey::from(self.name.as_ref()), value.clone());
                Ok(previous.unwrap_or(Value::Null))
            }
            SetKind::MapMethod { handle, key } => {
                handle.invoke(target, &[key.clone(), value.clone()])
            }
            SetKind::Field(field) => {
                field.write(target, value.clone())?;
                Ok(Value::Null)
            }
        }
    }
}

impl std::fmt::Debug for PropertySetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let strategy = match &self.kind {
            SetKind::Deferred { method, .. } => return f
                .debug_struct("PropertySetHandle")
                .field("name", &self.name)
                .field("strategy", &"deferred-setter")
                .field("method", method)
                .finish(),
            SetKind::MapKey => "map-key",
            SetKind::MapMethod { .. } => "map-method",
            SetKind::Field(_) => "field",
        };
        f.debug_struct("PropertySetHandle")
            .field("name", &self.name)
            .field("strategy", &strategy)
            .finish()
    }
}

/// Runs overload resolution for a deferred bean setter now that the value
/// type is known. Late misses and ambiguities surface as invocation
/// errors; the resolution-time existence check keeps them rare.
fn invoke_deferred_setter(
    context: &Arc<ResolutionContext>,
    desc: &Arc<TypeDescriptor>,
    method: &Arc<str>,
    target: &Value,
    value: &Value,
) -> Result<Value, InvokeError> {
    let types = [value.arg_type()];
    let table = context.member_table(desc);
    let lookup = |name: &str| context.lookup_type(name);
    let resolver = Resolver::new(&lookup, context.conversions());
    match resolver.resolve(&table, method, &types) {
        Resolution::Resolved(resolved) => {
            let handle = bind_method(context, desc, resolved, &types)
                .map_err(|err| InvokeError::host(method.as_ref(), err.to_string()))?;
            handle.invoke(target, std::slice::from_ref(value))
        }
        Resolution::NoMatch(miss) => Err(InvokeError::host(method.as_ref(), miss.to_string())),
        Resolution::Ambiguous(amb) => Err(InvokeError::host(
            method.as_ref(),
            ResolveError::from(amb).to_string(),
        )),
    }
}

/// Uppercases the first letter of an identifier.
fn upper_first(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercases the first letter of an identifier.
fn lower_first(ident: &str) -> String {
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Accessor names to probe in order, duplicates removed for identifiers
/// whose first letter has no case.
fn candidate_names(prefixes: &[&str], ident: &str) -> Vec<String> {
    let mut names = Vec::with_capacity(prefixes.len() * 2);
    for prefix in prefixes {
        for variant in [upper_first(ident), lower_first(ident)] {
            let name = format!("{prefix}{variant}");
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// The formal type checked against the key argument of a map-like `get` or
/// `put`: the declared first parameter, or the element type when the
/// method is variadic in a single parameter.
fn first_formal(sig: &MethodSig) -> Option<&TypeDesc> {
    if sig.is_variadic() && sig.params.len() == 1 {
        sig.variadic_element()
    } else {
        sig.params.first()
    }
}

/// Map-like duck typing accepts string keys as-is; a method that would
/// only reach the key through an explicit conversion does not qualify.
fn accepts_string_key(sig: &MethodSig) -> bool {
    matches!(first_formal(sig), Some(TypeDesc::Str | TypeDesc::Any))
}

/// Whether a setter candidate can take exactly one argument, counting
/// variadic absorption.
fn accepts_single_argument(sig: &MethodSig) -> bool {
    if sig.is_variadic() {
        sig.params.len() <= 2
    } else {
        sig.params.len() == 1
    }
}

/// Probes the bean-accessor names for a read; `is` spellings must return
/// a boolean to count.
fn bean_get(
    intro: &Introspector,
    desc: &Arc<TypeDescriptor>,
    ident: &str,
) -> Result<Option<MethodHandle>, ResolveError> {
    for name in candidate_names(&["get", "is"], ident) {
        let Some(handle) = intro.resolve_on_descriptor(desc, &name, &[])? else {
            continue;
        };
        if name.starts_with("is") && handle.signature().returns != TypeDesc::Bool {
            continue;
        }
        return Ok(Some(handle));
    }
    Ok(None)
}

pub(super) fn resolve_get(
    intro: &Introspector,
    target: &Value,
    identifier: &str,
    _location: &SourceLocation,
) -> Result<Option<PropertyGetHandle>, ResolveError> {
    if target.is_null() {
        return Ok(None);
    }
    let Some(desc) = intro.context().descriptor_for(target) else {
        return Ok(None);
    };

    if let Some(handle) = bean_get(intro, &desc, identifier)? {
        return Ok(Some(PropertyGetHandle {
            name: identifier.into(),
            kind: GetKind::Accessor(handle),
        }));
    }

    if matches!(target, Value::Map(_)) {
        return Ok(Some(PropertyGetHandle {
            name: identifier.into(),
            kind: GetKind::MapKey,
        }));
    }
    if matches!(target, Value::Object(_)) {
        if let Some(handle) = intro.resolve_on_descriptor(&desc, "get", &[ArgType::Str])? {
            if accepts_string_key(handle.signature()) {
                return Ok(Some(PropertyGetHandle {
                    name: identifier.into(),
                    kind: GetKind::MapMethod {
                        handle,
                        key: Value::str(identifier),
                    },
                }));
            }
        }
    }

    if matches!(target, Value::List(_)) {
        if let Some(handle) = intro.resolve_on_descriptor(&desc, identifier, &[])? {
            return Ok(Some(PropertyGetHandle {
                name: identifier.into(),
                kind: GetKind::Accessor(handle),
            }));
        }
    }

    let table = intro.context().member_table(&desc);
    if let Some(field) = table.field(identifier) {
        if field.declared_by.exported && field.is_readable() {
            return Ok(Some(PropertyGetHandle {
                name: identifier.into(),
                kind: GetKind::Field(field.clone()),
            }));
        }
    }
    Ok(None)
}

pub(super) fn resolve_set(
    intro: &Introspector,
    target: &Value,
    identifier: &str,
    _location: &SourceLocation,
) -> Result<Option<PropertySetHandle>, ResolveError> {
    if target.is_null() {
        return Ok(None);
    }
    let Some(desc) = intro.context().descriptor_for(target) else {
        return Ok(None);
    };
    let table = intro.context().member_table(&desc);

    for name in candidate_names(&["set"], identifier) {
        let Some(overloads) = table.overloads(&name) else {
            continue;
        };
        let capable: Vec<&MethodSig> = overloads
            .iter()
            .filter(|sig| accepts_single_argument(sig))
            .collect();
        if capable.is_empty() {
            continue;
        }
        let flags = capable
            .iter()
            .fold(MemberFlags::all(), |acc, sig| acc & sig.flags);
        return Ok(Some(PropertySetHandle {
            name: identifier.into(),
            flags,
            kind: SetKind::Deferred {
                context: intro.context().clone(),
                desc: desc.clone(),
                method: name.into(),
            },
        }));
    }

    if matches!(target, Value::Map(_)) {
        return Ok(Some(PropertySetHandle {
            name: identifier.into(),
            flags: MemberFlags::PUBLIC,
            kind: SetKind::MapKey,
        }));
    }
    if matches!(target, Value::Object(_)) {
        if let Some(handle) =
            intro.resolve_on_descriptor(&desc, "put", &[ArgType::Str, ArgType::Null])?
        {
            if accepts_string_key(handle.signature()) {
                let flags = handle.member_flags();
                return Ok(Some(PropertySetHandle {
                    name: identifier.into(),
                    flags,
                    kind: SetKind::MapMethod {
                        handle,
                        key: Value::str(identifier),
                    },
                }));
            }
        }
    }

    if let Some(field) = table.field(identifier) {
        if field.declared_by.exported && field.is_writable() {
            return Ok(Some(PropertySetHandle {
                name: identifier.into(),
                flags: field.flags,
                kind: SetKind::Field(field.clone()),
            }));
        }
    }
    Ok(None)
}
