//! The runtime value model shared by the template evaluator and the
//! introspection core.
//!
//! Template references hold [`Value`]s; the resolver never sees a `Value`
//! directly but works on the [`ArgType`] projection, which collapses each
//! value to its runtime type. Sequences and maps are shared mutable cells so
//! a method resolved on one thread can observe writes made on another, which
//! matches how rendering contexts are shared across worker threads.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::descriptor::TypeDescriptor;

/// A host-provided object exposed to templates.
///
/// Implementations pair the concrete Rust value with the registered
/// [`TypeDescriptor`] describing its template-visible surface. The
/// [`Any`] seam is what registered method invokers downcast through.
pub trait HostObject: Send + Sync {
    /// The descriptor this object was registered under.
    fn descriptor(&self) -> &Arc<TypeDescriptor>;

    /// Downcast seam for registered invokers.
    fn as_any(&self) -> &dyn Any;
}

/// Keys permitted in template-visible maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    /// String key.
    Str(Arc<str>),
    /// Integer key.
    I64(i64),
    /// Boolean key.
    Bool(bool),
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Str(s) => write!(f, "{s}"),
            MapKey::I64(n) => write!(f, "{n}"),
            MapKey::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(Arc::from(s))
    }
}

impl From<i64> for MapKey {
    fn from(n: i64) -> Self {
        MapKey::I64(n)
    }
}

impl MapKey {
    /// Converts a runtime value into a key. Integer widths collapse to one
    /// key space, so `map.get(3)` finds an entry stored under an `i64`.
    /// Values with no key form (null, floats, collections, objects) give
    /// `None`.
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Str(s) => Some(MapKey::Str(s.clone())),
            Value::I8(n) => Some(MapKey::I64(i64::from(*n))),
            Value::I16(n) => Some(MapKey::I64(i64::from(*n))),
            Value::I32(n) => Some(MapKey::I64(i64::from(*n))),
            Value::I64(n) => Some(MapKey::I64(*n)),
            Value::Bool(b) => Some(MapKey::Bool(*b)),
            Value::Char(c) => Some(MapKey::Str(Arc::from(c.to_string().as_str()))),
            _ => None,
        }
    }
}

/// Shared mutable sequence cell.
pub type ListCell = Arc<RwLock<Vec<Value>>>;

/// Shared mutable map cell. `IndexMap` keeps insertion order, so map
/// iteration in templates is deterministic.
pub type MapCell = Arc<RwLock<IndexMap<MapKey, Value>>>;

/// A runtime value observable from a template.
#[derive(Clone)]
pub enum Value {
    /// Absent value. Applicable to reference-like formals, never to
    /// primitive ones.
    Null,
    /// Boolean.
    Bool(bool),
    /// Character.
    Char(char),
    /// 8-bit signed integer.
    I8(i8),
    /// 16-bit signed integer.
    I16(i16),
    /// 32-bit signed integer.
    I32(i32),
    /// 64-bit signed integer.
    I64(i64),
    /// 32-bit float.
    F32(f32),
    /// 64-bit float.
    F64(f64),
    /// Immutable string.
    Str(Arc<str>),
    /// Shared mutable sequence.
    List(ListCell),
    /// Shared mutable map.
    Map(MapCell),
    /// Registered host object.
    Object(Arc<dyn HostObject>),
}

impl Value {
    /// Builds a string value.
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Builds a sequence value from items.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(RwLock::new(items)))
    }

    /// Builds a map value from key/value pairs, keeping insertion order.
    pub fn map(entries: impl IntoIterator<Item = (MapKey, Value)>) -> Self {
        Value::Map(Arc::new(RwLock::new(entries.into_iter().collect())))
    }

    /// Wraps a host object.
    pub fn object(obj: Arc<dyn HostObject>) -> Self {
        Value::Object(obj)
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The runtime type of this value, as seen by the resolver.
    pub fn arg_type(&self) -> ArgType {
        match self {
            Value::Null => ArgType::Null,
            Value::Bool(_) => ArgType::Bool,
            Value::Char(_) => ArgType::Char,
            Value::I8(_) => ArgType::I8,
            Value::I16(_) => ArgType::I16,
            Value::I32(_) => ArgType::I32,
            Value::I64(_) => ArgType::I64,
            Value::F32(_) => ArgType::F32,
            Value::F64(_) => ArgType::F64,
            Value::Str(_) => ArgType::Str,
            Value::List(_) => ArgType::List,
            Value::Map(_) => ArgType::Map,
            Value::Object(obj) => ArgType::Object(obj.descriptor().clone()),
        }
    }

    /// The template-facing name of this value's runtime type.
    pub fn type_name(&self) -> Arc<str> {
        match self {
            Value::Object(obj) => obj.descriptor().shared_name(),
            other => Arc::from(other.arg_type().name()),
        }
    }

    /// Boolean accessor.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Character accessor.
    pub fn as_char(&self) -> Option<char> {
        match self {
            Value::Char(c) => Some(*c),
            _ => None,
        }
    }

    /// Integer accessor, widening any integer variant to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I8(n) => Some(i64::from(*n)),
            Value::I16(n) => Some(i64::from(*n)),
            Value::I32(n) => Some(i64::from(*n)),
            Value::I64(n) => Some(*n),
            _ => None,
        }
    }

    /// Float accessor, widening any numeric variant to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::I8(n) => Some(f64::from(*n)),
            Value::I16(n) => Some(f64::from(*n)),
            Value::I32(n) => Some(f64::from(*n)),
            Value::I64(n) => Some(*n as f64),
            Value::F32(x) => Some(f64::from(*x)),
            Value::F64(x) => Some(*x),
            _ => None,
        }
    }

    /// String accessor.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Sequence cell accessor.
    pub fn as_list(&self) -> Option<&ListCell> {
        match self {
            Value::List(cell) => Some(cell),
            _ => None,
        }
    }

    /// Map cell accessor.
    pub fn as_map(&self) -> Option<&MapCell> {
        match self {
            Value::Map(cell) => Some(cell),
            _ => None,
        }
    }

    /// Host object accessor.
    pub fn as_object(&self) -> Option<&Arc<dyn HostObject>> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::I8(n) => write!(f, "I8({n})"),
            Value::I16(n) => write!(f, "I16({n})"),
            Value::I32(n) => write!(f, "I32({n})"),
            Value::I64(n) => write!(f, "I64({n})"),
            Value::F32(x) => write!(f, "F32({x})"),
            Value::F64(x) => write!(f, "F64({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(cell) => f.debug_tuple("List").field(&*cell.read()).finish(),
            Value::Map(cell) => {
                let map = cell.read();
                let entries: Vec<_> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                f.debug_tuple("Map").field(&entries).finish()
            }
            Value::Object(obj) => write!(
                f,
                "Object({}@{})",
                obj.descriptor().name(),
                obj.descriptor().identity()
            ),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::I8(a), Value::I8(b)) => a == b,
            (Value::I16(a), Value::I16(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F32(a), Value::F32(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                Arc::ptr_eq(a, b) || *a.read() == *b.read()
            }
            (Value::Map(a), Value::Map(b)) => Arc::ptr_eq(a, b) || *a.read() == *b.read(),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Renders a value the way the engine's universal stringifier does.
///
/// Null renders as the empty string; sequences and maps render in
/// `[a, b]` / `{k=v}` form.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::I8(n) => write!(f, "{n}"),
            Value::I16(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::F32(x) => write!(f, "{x}"),
            Value::F64(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(cell) => {
                let items = cell.read();
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(cell) => {
                let map = cell.read();
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
            Value::Object(obj) => write!(
                f,
                "{}@{}",
                obj.descriptor().name(),
                obj.descriptor().identity()
            ),
        }
    }
}

/// The runtime type of an actual argument, as consumed by the resolver.
///
/// This is the normalized form of a [`Value`]: object values carry their
/// full descriptor so ancestry checks need no registry lookup, while
/// sequences and maps are erased to their container kind.
#[derive(Debug, Clone)]
pub enum ArgType {
    /// No value was supplied.
    Null,
    /// Boolean.
    Bool,
    /// Character.
    Char,
    /// 8-bit signed integer.
    I8,
    /// 16-bit signed integer.
    I16,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
    /// String.
    Str,
    /// Sequence of any element type.
    List,
    /// Map of any key/value types.
    Map,
    /// Host object with its registered descriptor.
    Object(Arc<TypeDescriptor>),
}

impl ArgType {
    /// The template-facing name of this type, used in conversion keys and
    /// diagnostics.
    pub fn name(&self) -> &str {
        match self {
            ArgType::Null => "null",
            ArgType::Bool => "bool",
            ArgType::Char => "char",
            ArgType::I8 => "i8",
            ArgType::I16 => "i16",
            ArgType::I32 => "i32",
            ArgType::I64 => "i64",
            ArgType::F32 => "f32",
            ArgType::F64 => "f64",
            ArgType::Str => "str",
            ArgType::List => "list",
            ArgType::Map => "map",
            ArgType::Object(desc) => desc.name(),
        }
    }

    /// True for the null type.
    pub fn is_null(&self) -> bool {
        matches!(self, ArgType::Null)
    }

    /// True for primitive (unboxed) types: booleans, characters, and
    /// numerics.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            ArgType::Bool
                | ArgType::Char
                | ArgType::I8
                | ArgType::I16
                | ArgType::I32
                | ArgType::I64
                | ArgType::F32
                | ArgType::F64
        )
    }
}

impl PartialEq for ArgType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgType::Object(a), ArgType::Object(b)) => a.identity() == b.identity(),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        }
    }
}

impl Eq for ArgType {}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_type_projection_covers_every_variant() {
        assert_eq!(Value::Null.arg_type(), ArgType::Null);
        assert_eq!(Value::Bool(true).arg_type(), ArgType::Bool);
        assert_eq!(Value::I32(1).arg_type(), ArgType::I32);
        assert_eq!(Value::F64(1.5).arg_type(), ArgType::F64);
        assert_eq!(Value::str("x").arg_type(), ArgType::Str);
        assert_eq!(Value::list(vec![]).arg_type(), ArgType::List);
        assert_eq!(Value::map([]).arg_type(), ArgType::Map);
    }

    #[test]
    fn test_display_renders_collections_in_bracket_form() {
        let list = Value::list(vec![Value::I32(1), Value::str("a")]);
        assert_eq!(list.to_string(), "[1, a]");

        let map = Value::map([
            (MapKey::from("k"), Value::I32(7)),
            (MapKey::from("t"), Value::Bool(false)),
        ]);
        assert_eq!(map.to_string(), "{k=7, t=false}");

        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_list_equality_compares_contents() {
        let a = Value::list(vec![Value::I32(1), Value::I32(2)]);
        let b = Value::list(vec![Value::I32(1), Value::I32(2)]);
        assert_eq!(a, b);

        let c = Value::list(vec![Value::I32(3)]);
        assert_ne!(a, c);
    }
}
