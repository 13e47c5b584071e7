//! Adapter descriptors for the built-in value shapes.
//!
//! Native sequences, maps, and strings are not registered host objects,
//! but templates still call methods on them. Each shape gets one shared
//! descriptor whose invokers operate directly on the value; the method
//! names follow the conventions template authors already know from the
//! host-collection world (`size`, `isEmpty`, `containsKey`, `substring`).

use std::sync::Arc;

use crate::descriptor::{DescriptorBuilder, MethodSig, TypeDesc, TypeDescriptor};
use crate::error::InvokeError;
use crate::value::{ListCell, MapCell, MapKey, Value};

fn receiver_list<'a>(method: &str, target: &'a Value) -> Result<&'a ListCell, InvokeError> {
    target.as_list().ok_or(InvokeError::Receiver {
        method: method.to_string(),
        expected: "list",
    })
}

fn receiver_map<'a>(method: &str, target: &'a Value) -> Result<&'a MapCell, InvokeError> {
    target.as_map().ok_or(InvokeError::Receiver {
        method: method.to_string(),
        expected: "map",
    })
}

fn receiver_str<'a>(method: &str, target: &'a Value) -> Result<&'a str, InvokeError> {
    target.as_str().ok_or(InvokeError::Receiver {
        method: method.to_string(),
        expected: "str",
    })
}

fn value_arg<'a>(method: &str, args: &'a [Value], i: usize) -> Result<&'a Value, InvokeError> {
    args.get(i)
        .ok_or_else(|| InvokeError::host(method, "missing argument"))
}

fn int_arg(method: &str, args: &[Value], i: usize) -> Result<i64, InvokeError> {
    value_arg(method, args, i)?
        .as_i64()
        .ok_or_else(|| InvokeError::host(method, "expected an integer argument"))
}

fn str_arg<'a>(method: &str, args: &'a [Value], i: usize) -> Result<&'a str, InvokeError> {
    value_arg(method, args, i)?
        .as_str()
        .ok_or_else(|| InvokeError::host(method, "expected a string argument"))
}

fn bounded_index(index: i64, len: usize) -> Result<usize, InvokeError> {
    if index < 0 || index as usize >= len {
        return Err(InvokeError::IndexOutOfBounds { index, len });
    }
    Ok(index as usize)
}

fn key_to_value(key: &MapKey) -> Value {
    match key {
        MapKey::Str(s) => Value::Str(s.clone()),
        MapKey::I64(n) => Value::I64(*n),
        MapKey::Bool(b) => Value::Bool(*b),
    }
}

/// The descriptor backing method calls on native sequences.
pub(super) fn list_descriptor() -> Arc<TypeDescriptor> {
    DescriptorBuilder::new("list")
        .method(
            MethodSig::new("size", vec![], TypeDesc::I32).with_invoker(|target, _| {
                let cell = receiver_list("size", target)?;
                Ok(Value::I32(cell.read().len() as i32))
            }),
        )
        .method(
            MethodSig::new("isEmpty", vec![], TypeDesc::Bool).with_invoker(|target, _| {
                let cell = receiver_list("isEmpty", target)?;
                Ok(Value::Bool(cell.read().is_empty()))
            }),
        )
        .method(
            MethodSig::new("get", vec![TypeDesc::I32], TypeDesc::Any).with_invoker(
                |target, args| {
                    let cell = receiver_list("get", target)?;
                    let index = int_arg("get", args, 0)?;
                    let items = cell.read();
                    let at = bounded_index(index, items.len())?;
                    Ok(items[at].clone())
                },
            ),
        )
        .method(
            MethodSig::new("set", vec![TypeDesc::I32, TypeDesc::Any], TypeDesc::Any)
                .with_invoker(|target, args| {
                    let cell = receiver_list("set", target)?;
                    let index = int_arg("set", args, 0)?;
                    let value = value_arg("set", args, 1)?.clone();
                    let mut items = cell.write();
                    let at = bounded_index(index, items.len())?;
                    Ok(std::mem::replace(&mut items[at], value))
                }),
        )
        .method(
            MethodSig::new("contains", vec![TypeDesc::Any], TypeDesc::Bool).with_invoker(
                |target, args| {
                    let cell = receiver_list("contains", target)?;
                    let needle = value_arg("contains", args, 0)?;
                    Ok(Value::Bool(cell.read().iter().any(|v| v == needle)))
                },
            ),
        )
        .build()
}

/// The descriptor backing method calls on native maps.
pub(super) fn map_descriptor() -> Arc<TypeDescriptor> {
    DescriptorBuilder::new("map")
        .method(
            MethodSig::new("size", vec![], TypeDesc::I32).with_invoker(|target, _| {
                let cell = receiver_map("size", target)?;
                Ok(Value::I32(cell.read().len() as i32))
            }),
        )
        .method(
            MethodSig::new("isEmpty", vec![], TypeDesc::Bool).with_invoker(|target, _| {
                let cell = receiver_map("isEmpty", target)?;
                Ok(Value::Bool(cell.read().is_empty()))
            }),
        )
        .method(
            MethodSig::new("get", vec![TypeDesc::Any], TypeDesc::Any).with_invoker(
                |target, args| {
                    let cell = receiver_map("get", target)?;
                    let key = value_arg("get", args, 0)?;
                    let found = MapKey::from_value(key)
                        .and_then(|k| cell.read().get(&k).cloned());
                    Ok(found.unwrap_or(Value::Null))
                },
            ),
        )
        .method(
            MethodSig::new("put", vec![TypeDesc::Any, TypeDesc::Any], TypeDesc::Any)
                .with_invoker(|target, args| {
                    let cell = receiver_map("put", target)?;
                    let key = MapKey::from_value(value_arg("put", args, 0)?)
                        .ok_or_else(|| InvokeError::host("put", "value has no map key form"))?;
                    let value = value_arg("put", args, 1)?.clone();
                    let previous = cell.write().insert(key, value);
                    Ok(previous.unwrap_or(Value::Null))
                }),
        )
        .method(
            MethodSig::new("containsKey", vec![TypeDesc::Any], TypeDesc::Bool).with_invoker(
                |target, args| {
                    let cell = receiver_map("containsKey", target)?;
                    let key = value_arg("containsKey", args, 0)?;
                    let present = MapKey::from_value(key)
                        .is_some_and(|k| cell.read().contains_key(&k));
                    Ok(Value::Bool(present))
                },
            ),
        )
        .method(
            MethodSig::new("keys", vec![], TypeDesc::list_of(TypeDesc::Any)).with_invoker(
                |target, _| {
                    let cell = receiver_map("keys", target)?;
                    let keys = cell.read().keys().map(key_to_value).collect();
                    Ok(Value::list(keys))
                },
            ),
        )
        .method(
            MethodSig::new("values", vec![], TypeDesc::list_of(TypeDesc::Any)).with_invoker(
                |target, _| {
                    let cell = receiver_map("values", target)?;
                    let values = cell.read().values().cloned().collect();
                    Ok(Value::list(values))
                },
            ),
        )
        .build()
}

/// The descriptor backing method calls on strings. Index arguments and
/// results count characters, not bytes.
pub(super) fn str_descriptor() -> Arc<TypeDescriptor> {
    DescriptorBuilder::new("str")
        .method(
            MethodSig::new("length", vec![], TypeDesc::I32).with_invoker(|target, _| {
                let s = receiver_str("length", target)?;
                Ok(Value::I32(s.chars().count() as i32))
            }),
        )
        .method(
            MethodSig::new("isEmpty", vec![], TypeDesc::Bool).with_invoker(|target, _| {
                let s = receiver_str("isEmpty", target)?;
                Ok(Value::Bool(s.is_empty()))
            }),
        )
        .method(
            MethodSig::new("toUpperCase", vec![], TypeDesc::Str).with_invoker(|target, _| {
                let s = receiver_str("toUpperCase", target)?;
                Ok(Value::str(s.to_uppercase()))
            }),
        )
        .method(
            MethodSig::new("toLowerCase", vec![], TypeDesc::Str).with_invoker(|target, _| {
                let s = receiver_str("toLowerCase", target)?;
                Ok(Value::str(s.to_lowercase()))
            }),
        )
        .method(
            MethodSig::new("trim", vec![], TypeDesc::Str).with_invoker(|target, _| {
                let s = receiver_str("trim", target)?;
                Ok(Value::str(s.trim()))
            }),
        )
        .method(
            MethodSig::new("contains", vec![TypeDesc::Str], TypeDesc::Bool).with_invoker(
                |target, args| {
                    let s = receiver_str("contains", target)?;
                    Ok(Value::Bool(s.contains(str_arg("contains", args, 0)?)))
                },
            ),
        )
        .method(
            MethodSig::new("startsWith", vec![TypeDesc::Str], TypeDesc::Bool).with_invoker(
                |target, args| {
                    let s = receiver_str("startsWith", target)?;
                    Ok(Value::Bool(s.starts_with(str_arg("startsWith", args, 0)?)))
                },
            ),
        )
        .method(
            MethodSig::new("endsWith", vec![TypeDesc::Str], TypeDesc::Bool).with_invoker(
                |target, args| {
                    let s = receiver_str("endsWith", target)?;
                    Ok(Value::Bool(s.ends_with(str_arg("endsWith", args, 0)?)))
                },
            ),
        )
        .method(
            MethodSig::new("indexOf", vec![TypeDesc::Str], TypeDesc::I32).with_invoker(
                |target, args| {
                    let s = receiver_str("indexOf", target)?;
                    let needle = str_arg("indexOf", args, 0)?;
                    let index = match s.find(needle) {
                        Some(byte) => s[..byte].chars().count() as i32,
                        None => -1,
                    };
                    Ok(Value::I32(index))
                },
            ),
        )
        .method(
            MethodSig::new("charAt", vec![TypeDesc::I32], TypeDesc::Char).with_invoker(
                |target, args| {
                    let s = receiver_str("charAt", target)?;
                    let index = int_arg("charAt", args, 0)?;
                    let at = bounded_index(index, s.chars().count())?;
                    match s.chars().nth(at) {
                        Some(c) => Ok(Value::Char(c)),
                        None => Err(InvokeError::IndexOutOfBounds {
                            index,
                            len: s.chars().count(),
                        }),
                    }
                },
            ),
        )
        .method(
            MethodSig::new("substring", vec![TypeDesc::I32], TypeDesc::Str).with_invoker(
                |target, args| {
                    let s = receiver_str("substring", target)?;
                    let begin = int_arg("substring", args, 0)?;
                    substring(s, begin, s.chars().count() as i64)
                },
            ),
        )
        .method(
            MethodSig::new("substring", vec![TypeDesc::I32, TypeDesc::I32], TypeDesc::Str)
                .with_invoker(|target, args| {
                    let s = receiver_str("substring", target)?;
                    let begin = int_arg("substring", args, 0)?;
                    let end = int_arg("substring", args, 1)?;
                    substring(s, begin, end)
                }),
        )
        .method(
            MethodSig::new("replace", vec![TypeDesc::Str, TypeDesc::Str], TypeDesc::Str)
                .with_invoker(|target, args| {
                    let s = receiver_str("replace", target)?;
                    let from = str_arg("replace", args, 0)?;
                    let to = str_arg("replace", args, 1)?;
                    Ok(Value::str(s.replace(from, to)))
                }),
        )
        .method(
            MethodSig::new("split", vec![TypeDesc::Str], TypeDesc::list_of(TypeDesc::Str))
                .with_invoker(|target, args| {
                    let s = receiver_str("split", target)?;
                    let sep = str_arg("split", args, 0)?;
                    let pieces: Vec<Value> = if sep.is_empty() {
                        s.chars().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(sep).map(Value::str).collect()
                    };
                    Ok(Value::list(pieces))
                }),
        )
        .build()
}

/// Character-indexed substring with host-style bounds checks.
fn substring(s: &str, begin: i64, end: i64) -> Result<Value, InvokeError> {
    let len = s.chars().count() as i64;
    if begin < 0 || begin > len {
        return Err(InvokeError::IndexOutOfBounds {
            index: begin,
            len: len as usize,
        });
    }
    if end < begin || end > len {
        return Err(InvokeError::IndexOutOfBounds {
            index: end,
            len: len as usize,
        });
    }
    let piece: String = s
        .chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect();
    Ok(Value::str(piece))
}

#[cfg(test)]
mod tests {
    use crate::error::InvokeError;
    use crate::table::MemberTable;
    use crate::value::{MapKey, Value};

    use super::{list_descriptor, map_descriptor, str_descriptor};

    fn call(desc_method: (&str, &str), target: &Value, args: &[Value]) -> Value {
        let desc = match desc_method.0 {
            "list" => list_descriptor(),
            "map" => map_descriptor(),
            _ => str_descriptor(),
        };
        let table = MemberTable::build(&desc);
        let overloads = table.overloads(desc_method.1).unwrap();
        let sig = overloads
            .iter()
            .find(|s| s.params.len() == args.len())
            .unwrap();
        sig.invoke(target, args).unwrap()
    }

    #[test]
    fn test_list_adapter_reads_and_writes_by_index() {
        let items = Value::list(vec![Value::I32(10), Value::I32(20)]);
        assert_eq!(call(("list", "size"), &items, &[]), Value::I32(2));
        assert_eq!(
            call(("list", "get"), &items, &[Value::I32(1)]),
            Value::I32(20)
        );
        assert_eq!(
            call(("list", "set"), &items, &[Value::I32(0), Value::str("x")]),
            Value::I32(10)
        );
        assert_eq!(
            call(("list", "get"), &items, &[Value::I32(0)]),
            Value::str("x")
        );
        assert_eq!(
            call(("list", "contains"), &items, &[Value::I32(20)]),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_list_get_reports_bounds() {
        let desc = list_descriptor();
        let table = MemberTable::build(&desc);
        let sig = &table.overloads("get").unwrap()[0];
        let items = Value::list(vec![Value::I32(1)]);
        let err = sig.invoke(&items, &[Value::I32(5)]).unwrap_err();
        assert!(matches!(
            err,
            InvokeError::IndexOutOfBounds { index: 5, len: 1 }
        ));
    }

    #[test]
    fn test_map_adapter_unifies_integer_key_widths() {
        let map = Value::map(vec![(MapKey::I64(3), Value::str("三"))]);
        assert_eq!(
            call(("map", "get"), &map, &[Value::I32(3)]),
            Value::str("三")
        );
        assert_eq!(
            call(("map", "containsKey"), &map, &[Value::I64(3)]),
            Value::Bool(true)
        );
        assert_eq!(call(("map", "get"), &map, &[Value::Null]), Value::Null);
    }

    #[test]
    fn test_map_put_returns_previous_value() {
        let map = Value::map(vec![(MapKey::from("a"), Value::I32(1))]);
        assert_eq!(
            call(("map", "put"), &map, &[Value::str("a"), Value::I32(2)]),
            Value::I32(1)
        );
        assert_eq!(
            call(("map", "put"), &map, &[Value::str("b"), Value::I32(3)]),
            Value::Null
        );
        assert_eq!(call(("map", "size"), &map, &[]), Value::I32(2));
    }

    #[test]
    fn test_str_adapter_counts_characters_not_bytes() {
        let s = Value::str("héllo");
        assert_eq!(call(("str", "length"), &s, &[]), Value::I32(5));
        assert_eq!(
            call(("str", "substring"), &s, &[Value::I32(1), Value::I32(3)]),
            Value::str("él")
        );
        assert_eq!(
            call(("str", "indexOf"), &s, &[Value::str("llo")]),
            Value::I32(2)
        );
        assert_eq!(
            call(("str", "charAt"), &s, &[Value::I32(1)]),
            Value::Char('é')
        );
    }

    #[test]
    fn test_str_split_keeps_separator_semantics() {
        let s = Value::str("a,b,,c");
        let out = call(("str", "split"), &s, &[Value::str(",")]);
        let cell = out.as_list().unwrap();
        let pieces: Vec<Value> = cell.read().clone();
        assert_eq!(
            pieces,
            vec![
                Value::str("a"),
                Value::str("b"),
                Value::str(""),
                Value::str("c")
            ]
        );
    }
}
