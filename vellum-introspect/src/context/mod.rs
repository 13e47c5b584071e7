//! Shared resolution state for one engine instance.
//!
//! A [`ResolutionContext`] owns everything dispatch needs at runtime: the
//! registered descriptors by name, the member-table cache keyed by type
//! identity, the conversion registry, and the event sink. It is plain
//! shared state; an engine embeds one per instance, so two engines with
//! different registrations or conversion settings coexist in a process
//! without touching each other.
//!
//! Re-registering a type name is how hot reload works: the new descriptor
//! carries a fresh identity, name lookups see the replacement immediately,
//! and cached tables for the old identity are simply never reached again.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::convert::{ConversionRegistry, Converter};
use crate::descriptor::{TypeDescriptor, TypeIdentity};
use crate::error::ConversionError;
use crate::events::{EventSink, IntrospectEvent, TracingSink};
use crate::table::MemberTable;
use crate::value::Value;

mod builtins;

/// Per-engine registry and cache state.
pub struct ResolutionContext {
    /// Registered host types by name. Re-registration replaces the entry.
    types: RwLock<FxHashMap<Arc<str>, Arc<TypeDescriptor>>>,
    /// Flattened member tables by descriptor identity.
    tables: RwLock<FxHashMap<TypeIdentity, Arc<MemberTable>>>,
    conversions: ConversionRegistry,
    sink: Arc<dyn EventSink>,
    list_descriptor: Arc<TypeDescriptor>,
    map_descriptor: Arc<TypeDescriptor>,
    str_descriptor: Arc<TypeDescriptor>,
}

impl ResolutionContext {
    /// Context with the standard conversion registry, logging through
    /// [`TracingSink`].
    pub fn new() -> Self {
        Self::with_parts(ConversionRegistry::standard(), Arc::new(TracingSink))
    }

    /// Context with the standard conversion registry and a caller-supplied
    /// sink.
    pub fn with_sink(sink: Arc<dyn EventSink>) -> Self {
        Self::with_parts(ConversionRegistry::standard(), sink)
    }

    /// Context with explicit conversion registry and sink.
    pub fn with_parts(conversions: ConversionRegistry, sink: Arc<dyn EventSink>) -> Self {
        ResolutionContext {
            types: RwLock::new(FxHashMap::default()),
            tables: RwLock::new(FxHashMap::default()),
            conversions,
            sink,
            list_descriptor: builtins::list_descriptor(),
            map_descriptor: builtins::map_descriptor(),
            str_descriptor: builtins::str_descriptor(),
        }
    }

    /// The conversion registry resolution consults.
    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// The event sink observers report through.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Registers a host type. A repeated name replaces the previous
    /// registration for lookups; enumeration descriptors additionally gain
    /// a string-to-constant conversion under their own name.
    pub fn register(&self, desc: Arc<TypeDescriptor>) {
        if desc.is_enum() {
            self.conversions
                .register(desc.name(), "str", enum_converter(&desc));
        }
        self.types.write().insert(desc.shared_name(), desc);
    }

    /// Looks up a registered type by name.
    pub fn lookup_type(&self, name: &str) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(name).cloned()
    }

    /// The flattened member table for a descriptor, building and caching
    /// it on first use. Concurrent first uses may both build; the first
    /// writer's table is kept and announced, the loser's is dropped.
    pub fn member_table(&self, desc: &Arc<TypeDescriptor>) -> Arc<MemberTable> {
        if let Some(table) = self.tables.read().get(&desc.identity()) {
            return table.clone();
        }
        let built = Arc::new(MemberTable::build(desc));
        let mut installed = false;
        let table = {
            let mut tables = self.tables.write();
            match tables.entry(desc.identity()) {
                Entry::Occupied(existing) => existing.get().clone(),
                Entry::Vacant(slot) => {
                    installed = true;
                    slot.insert(built.clone());
                    built
                }
            }
        };
        if installed {
            self.sink.emit(&IntrospectEvent::TableRebuilt {
                type_name: desc.shared_name(),
                identity: desc.identity(),
            });
        }
        table
    }

    /// The descriptor governing member resolution for a value: the
    /// object's own registration, or the built-in adapter surface for
    /// sequences, maps, and strings. Primitives and null have none.
    pub fn descriptor_for(&self, value: &Value) -> Option<Arc<TypeDescriptor>> {
        match value {
            Value::Object(obj) => Some(obj.descriptor().clone()),
            Value::List(_) => Some(self.list_descriptor.clone()),
            Value::Map(_) => Some(self.map_descriptor.clone()),
            Value::Str(_) => Some(self.str_descriptor.clone()),
            _ => None,
        }
    }
}

impl Default for ResolutionContext {
    fn default() -> Self {
        ResolutionContext::new()
    }
}

impl std::fmt::Debug for ResolutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionContext")
            .field("types", &self.types.read().len())
            .field("tables", &self.tables.read().len())
            .field("conversions_enabled", &self.conversions.is_enabled())
            .finish()
    }
}

/// Builds the string-to-constant converter installed when an enumeration
/// descriptor is registered.
fn enum_converter(desc: &Arc<TypeDescriptor>) -> Converter {
    let constants = desc.constants().clone();
    let enum_name = desc.shared_name();
    Arc::new(move |value: &Value| match value {
        Value::Str(s) => match constants.get(s.as_ref()) {
            Some(constant) => Ok(constant.clone()),
            None => Err(ConversionError::UnknownConstant {
                value: s.to_string(),
                enum_name: enum_name.to_string(),
            }),
        },
        other => Err(ConversionError::Format {
            value: other.to_string(),
            target: enum_name.to_string(),
        }),
    })
}
