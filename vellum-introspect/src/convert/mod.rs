//! Explicit type conversions.
//!
//! The registry answers one question for the resolver: can a value of the
//! actual type be explicitly converted to satisfy a formal parameter? It is
//! keyed by `(formal name, actual name)` and caches both hits and misses, so
//! repeated negative lookups on a hot call site cost one map probe. The
//! converters themselves are pure closures; they run at invocation time, and
//! any failure (parse error, out-of-range narrowing) surfaces there, never
//! at resolution time.
//!
//! Implicit numeric widening is deliberately not part of the registry. It is
//! infallible, so the resolver binds it inline via [`widen_numeric`].

mod builtins;

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::descriptor::TypeDesc;
use crate::error::ConversionError;
use crate::value::{ArgType, Value};

/// A registered conversion: turns a value of the actual type into a value
/// of the formal type, or reports why it cannot.
pub type Converter = Arc<dyn Fn(&Value) -> Result<Value, ConversionError> + Send + Sync>;

/// Conversion registry with per-pair positive and negative caching.
pub struct ConversionRegistry {
    enabled: bool,
    // formal name -> actual name -> converter or cached "no conversion".
    cache: RwLock<FxHashMap<Box<str>, FxHashMap<Box<str>, Option<Converter>>>>,
}

impl ConversionRegistry {
    /// Standard registry: built-in conversions plus whatever gets
    /// registered later.
    pub fn standard() -> Self {
        ConversionRegistry {
            enabled: true,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Disabled registry: every lookup reports "no conversion", removing
    /// the explicit applicability level entirely.
    pub fn disabled() -> Self {
        ConversionRegistry {
            enabled: false,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    /// Whether explicit conversion is available at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Registers a custom converter for a `(formal, actual)` name pair,
    /// replacing any built-in or previously cached answer.
    pub fn register(&self, formal: &str, actual: &str, converter: Converter) {
        let mut cache = self.cache.write();
        cache
            .entry(Box::from(formal))
            .or_default()
            .insert(Box::from(actual), Some(converter));
    }

    /// The converter needed to pass an `actual` where `formal` is declared,
    /// or `None` when no explicit conversion exists.
    pub fn needed_converter(&self, formal: &TypeDesc, actual: &ArgType) -> Option<Converter> {
        if !self.enabled {
            return None;
        }
        let formal_name = formal.name();
        let actual_name = actual.name();
        {
            let cache = self.cache.read();
            if let Some(inner) = cache.get(formal_name.as_ref()) {
                if let Some(entry) = inner.get(actual_name) {
                    return entry.clone();
                }
            }
        }
        let computed = builtins::builtin_converter(formal, actual);
        let mut cache = self.cache.write();
        cache
            .entry(Box::from(formal_name.as_ref()))
            .or_default()
            // First writer wins; a concurrent probe may have landed first.
            .entry(Box::from(actual_name))
            .or_insert(computed)
            .clone()
    }

    /// Whether an explicit conversion exists for the pair. With
    /// `possible_vararg`, a sequence formal also matches when its element
    /// type is convertible from the actual.
    pub fn is_explicitly_convertible(
        &self,
        formal: &TypeDesc,
        actual: &ArgType,
        possible_vararg: bool,
    ) -> bool {
        if self.needed_converter(formal, actual).is_some() {
            return true;
        }
        if possible_vararg {
            if let TypeDesc::List(elem) = formal {
                return self.needed_converter(elem, actual).is_some();
            }
        }
        false
    }
}

impl std::fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.read();
        let cached: usize = cache.values().map(FxHashMap::len).sum();
        f.debug_struct("ConversionRegistry")
            .field("enabled", &self.enabled)
            .field("cached_pairs", &cached)
            .finish()
    }
}

/// Applies an implicit numeric widening. Infallible: any value/target pair
/// outside the widening table passes through unchanged.
pub fn widen_numeric(value: &Value, target: &TypeDesc) -> Value {
    match (value, target) {
        (Value::I8(n), TypeDesc::I16) => Value::I16(i16::from(*n)),
        (Value::I8(n), TypeDesc::I32) => Value::I32(i32::from(*n)),
        (Value::I8(n), TypeDesc::I64) => Value::I64(i64::from(*n)),
        (Value::I8(n), TypeDesc::F32) => Value::F32(f32::from(*n)),
        (Value::I8(n), TypeDesc::F64) => Value::F64(f64::from(*n)),
        (Value::I16(n), TypeDesc::I32) => Value::I32(i32::from(*n)),
        (Value::I16(n), TypeDesc::I64) => Value::I64(i64::from(*n)),
        (Value::I16(n), TypeDesc::F32) => Value::F32(f32::from(*n)),
        (Value::I16(n), TypeDesc::F64) => Value::F64(f64::from(*n)),
        (Value::I32(n), TypeDesc::I64) => Value::I64(i64::from(*n)),
        (Value::I32(n), TypeDesc::F32) => Value::F32(*n as f32),
        (Value::I32(n), TypeDesc::F64) => Value::F64(f64::from(*n)),
        (Value::I64(n), TypeDesc::F32) => Value::F32(*n as f32),
        (Value::I64(n), TypeDesc::F64) => Value::F64(*n as f64),
        (Value::F32(x), TypeDesc::F64) => Value::F64(f64::from(*x)),
        (Value::Char(c), TypeDesc::I32) => Value::I32(*c as i32),
        (Value::Char(c), TypeDesc::I64) => Value::I64(*c as i64),
        (Value::Char(c), TypeDesc::F32) => Value::F32(*c as u32 as f32),
        (Value::Char(c), TypeDesc::F64) => Value::F64(f64::from(*c as u32)),
        _ => value.clone(),
    }
}
