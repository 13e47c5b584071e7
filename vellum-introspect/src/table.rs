//! Per-type member tables.
//!
//! A [`MemberTable`] is the flattened, name-indexed view of one type's full
//! template-visible surface: its own public members plus everything
//! inherited from superclasses and interfaces. Tables are built once per
//! [`TypeIdentity`] and never mutated; the cache in
//! [`crate::context::ResolutionContext`] keys on identity, so a
//! re-registered type simply gets a fresh table while the stale one is
//! orphaned.
//!
//! Walk order is most-derived first: the type itself, then the superclass
//! chain, then interfaces breadth-first in encounter order. The first
//! declaration collected for a given erased signature (or field name) wins,
//! which is exactly "most-derived wins".

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::descriptor::{FieldSig, MemberFlags, MethodSig, TypeDescriptor, TypeIdentity};

/// Name-indexed member surface of one registered type identity.
#[derive(Debug)]
pub struct MemberTable {
    identity: TypeIdentity,
    type_name: Arc<str>,
    methods: IndexMap<Arc<str>, Vec<MethodSig>>,
    fields: IndexMap<Arc<str>, FieldSig>,
}

impl MemberTable {
    /// Builds the table for a descriptor. Pure and idempotent; safe to run
    /// concurrently for the same identity.
    pub fn build(desc: &Arc<TypeDescriptor>) -> Self {
        let mut methods: IndexMap<Arc<str>, Vec<MethodSig>> = IndexMap::new();
        let mut fields: IndexMap<Arc<str>, FieldSig> = IndexMap::new();
        let mut seen: FxHashSet<TypeIdentity> = FxHashSet::default();
        let mut pending_interfaces: Vec<Arc<TypeDescriptor>> = Vec::new();

        // Superclass chain, most-derived first.
        let mut current = Some(desc.clone());
        while let Some(d) = current {
            if seen.insert(d.identity()) {
                collect(&d, &mut methods, &mut fields);
                pending_interfaces.extend(d.interfaces().iter().cloned());
            }
            current = d.extends().cloned();
        }

        // Then interfaces, breadth-first in encounter order. An interface's
        // own parents count as further interfaces.
        let mut idx = 0;
        while idx < pending_interfaces.len() {
            let iface = pending_interfaces[idx].clone();
            idx += 1;
            if !seen.insert(iface.identity()) {
                continue;
            }
            collect(&iface, &mut methods, &mut fields);
            if let Some(parent) = iface.extends() {
                pending_interfaces.push(parent.clone());
            }
            pending_interfaces.extend(iface.interfaces().iter().cloned());
        }

        MemberTable {
            identity: desc.identity(),
            type_name: desc.shared_name(),
            methods,
            fields,
        }
    }

    /// Identity this table was built for.
    pub fn identity(&self) -> TypeIdentity {
        self.identity
    }

    /// Registered name of the table's type.
    pub fn type_name(&self) -> &Arc<str> {
        &self.type_name
    }

    /// Overload list for a member name.
    pub fn overloads(&self, name: &str) -> Option<&[MethodSig]> {
        self.methods.get(name).map(Vec::as_slice)
    }

    /// Field entry for a name.
    pub fn field(&self, name: &str) -> Option<&FieldSig> {
        self.fields.get(name)
    }

    /// Total number of collected method signatures.
    pub fn method_count(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }
}

fn collect(
    desc: &TypeDescriptor,
    methods: &mut IndexMap<Arc<str>, Vec<MethodSig>>,
    fields: &mut IndexMap<Arc<str>, FieldSig>,
) {
    for m in desc.methods() {
        if !m.flags.contains(MemberFlags::PUBLIC) {
            continue;
        }
        let overloads = methods.entry(m.name.clone()).or_default();
        // A more-derived declaration with the same erased signature was
        // already collected; it overrides this one.
        if overloads.iter().any(|existing| existing.erased_matches(m)) {
            continue;
        }
        overloads.push(m.clone());
    }
    for f in desc.fields() {
        if !f.flags.contains(MemberFlags::PUBLIC) {
            continue;
        }
        if !fields.contains_key(&f.name) {
            fields.insert(f.name.clone(), f.clone());
        }
    }
}
