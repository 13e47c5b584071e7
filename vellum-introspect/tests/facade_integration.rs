//! End-to-end tests for the introspection facade.
//!
//! These tests exercise the full path a template evaluator takes:
//! registering host types, resolving methods, properties, and iterators
//! through the facade (with and without policy decorators), and invoking
//! the returned handles.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use vellum_introspect::{
    build_introspector, ConfigError, ConversionError, ConversionMode, DeprecationIntrospector,
    DescriptorBuilder, FieldSig, HostObject, Introspect, IntrospectConfig, IntrospectEvent,
    Introspector, InvokeError, MapKey, MethodSig, RecordingSink, ResolutionContext, ResolveError,
    SourceLocation, TypeDesc, TypeDescriptor, Value,
};

// ============================================================
// Helpers
// ============================================================

/// Host carrying only its descriptor; methods that need no state use it.
struct Plain {
    desc: Arc<TypeDescriptor>,
}

impl HostObject for Plain {
    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn plain(desc: &Arc<TypeDescriptor>) -> Value {
    Value::object(Arc::new(Plain { desc: desc.clone() }))
}

/// Pulls the concrete host back out of a receiver value.
fn downcast<T: Any>(target: &Value) -> &T {
    target
        .as_object()
        .expect("receiver is a host object")
        .as_any()
        .downcast_ref::<T>()
        .expect("receiver has the expected host type")
}

fn recording() -> (Arc<ResolutionContext>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let ctx = Arc::new(ResolutionContext::with_sink(sink.clone()));
    (ctx, sink)
}

fn here() -> SourceLocation {
    SourceLocation::new("page.vel", 4, 9)
}

// ============================================================
// Method calls
// ============================================================

#[test]
fn test_method_call_end_to_end() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("title", vec![], TypeDesc::Str)
                .with_invoker(|_, _| Ok(Value::str("Quarterly"))),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);

    let target = plain(&report);
    let handle = facade
        .resolve_method(&target, "title", &[], &here())
        .unwrap()
        .expect("title is registered");
    assert_eq!(handle.name(), "title");
    assert!(!handle.is_variadic());
    assert_eq!(handle.invoke(&target, &[]).unwrap(), Value::str("Quarterly"));
}

#[test]
fn test_conversion_failures_surface_at_invocation() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("pad", vec![TypeDesc::I32], TypeDesc::I32)
                .with_invoker(|_, args| Ok(args[0].clone())),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    let good = [Value::str("12")];
    let handle = facade
        .resolve_method(&target, "pad", &good, &here())
        .unwrap()
        .unwrap();
    assert_eq!(handle.invoke(&target, &good).unwrap(), Value::I32(12));

    // The unparsable argument still resolves; only invocation fails.
    let bad = [Value::str("twelve")];
    let handle = facade
        .resolve_method(&target, "pad", &bad, &here())
        .unwrap()
        .unwrap();
    let err = handle.invoke(&target, &bad).unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Conversion(ConversionError::Format { .. })
    ));

    // Same for narrowing: an i64 argument resolves against the i32 formal,
    // and the bounds check runs when the call happens.
    let wide = [Value::I64(5_000_000_000)];
    let handle = facade
        .resolve_method(&target, "pad", &wide, &here())
        .unwrap()
        .unwrap();
    let err = handle.invoke(&target, &wide).unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Conversion(ConversionError::Range { .. })
    ));
}

#[test]
fn test_widening_produces_the_formal_width_at_invocation() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("skip", vec![TypeDesc::I64], TypeDesc::I64).with_invoker(
                |_, args| match &args[0] {
                    Value::I64(n) => Ok(Value::I64(n + 1)),
                    other => Err(InvokeError::host("skip", format!("expected i64, got {other:?}"))),
                },
            ),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    let args = [Value::I32(41)];
    let handle = facade
        .resolve_method(&target, "skip", &args, &here())
        .unwrap()
        .unwrap();
    assert_eq!(handle.invoke(&target, &args).unwrap(), Value::I64(42));
}

#[test]
fn test_variadic_call_packs_trailing_arguments() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new(
                "join",
                vec![TypeDesc::Str, TypeDesc::list_of(TypeDesc::Str)],
                TypeDesc::Str,
            )
            .variadic()
            .with_invoker(|_, args| {
                let sep = args[0].as_str().unwrap();
                let items = args[1].as_list().unwrap().read();
                let joined = items
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(sep);
                Ok(Value::str(joined))
            }),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    // Trailing arguments pack into one sequence.
    let spread = [
        Value::str("-"),
        Value::str("a"),
        Value::str("b"),
        Value::str("c"),
    ];
    let handle = facade
        .resolve_method(&target, "join", &spread, &here())
        .unwrap()
        .unwrap();
    assert!(handle.is_variadic());
    assert_eq!(handle.invoke(&target, &spread).unwrap(), Value::str("a-b-c"));

    // The tail absorbs zero arguments.
    let none = [Value::str("-")];
    let handle = facade
        .resolve_method(&target, "join", &none, &here())
        .unwrap()
        .unwrap();
    assert_eq!(handle.invoke(&target, &none).unwrap(), Value::str(""));

    // A sequence in tail position passes through unpacked.
    let passthrough = [
        Value::str("-"),
        Value::list(vec![Value::str("x"), Value::str("y")]),
    ];
    let handle = facade
        .resolve_method(&target, "join", &passthrough, &here())
        .unwrap()
        .unwrap();
    assert_eq!(
        handle.invoke(&target, &passthrough).unwrap(),
        Value::str("x-y")
    );
}

#[test]
fn test_null_and_unknown_members_resolve_to_none() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(MethodSig::new("title", vec![], TypeDesc::Str))
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    assert!(facade
        .resolve_method(&Value::Null, "title", &[], &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_method(&target, "subtitle", &[], &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_property_get(&Value::Null, "title", &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_method(&Value::I32(3), "title", &[], &here())
        .unwrap()
        .is_none());
}

#[test]
fn test_cross_assignable_overloads_are_ambiguous() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(MethodSig::new(
            "blend",
            vec![TypeDesc::Str, TypeDesc::Any],
            TypeDesc::Str,
        ))
        .method(MethodSig::new(
            "blend",
            vec![TypeDesc::Any, TypeDesc::Str],
            TypeDesc::Str,
        ))
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    let args = [Value::str("a"), Value::str("b")];
    let err = facade
        .resolve_method(&target, "blend", &args, &here())
        .unwrap_err();
    match err {
        ResolveError::Ambiguous {
            name,
            candidate_count,
        } => {
            assert_eq!(name, "blend");
            assert_eq!(candidate_count, 2);
        }
        other => panic!("expected an ambiguity, got {other:?}"),
    }
}

#[test]
fn test_enum_constants_convert_from_strings() {
    let (ctx, _) = recording();
    let level = DescriptorBuilder::new("Level")
        .constant("LOW", Value::I32(0))
        .constant("HIGH", Value::I32(2))
        .build();
    ctx.register(level);
    let gauge = DescriptorBuilder::new("Gauge")
        .method(
            MethodSig::new("set", vec![TypeDesc::object("Level")], TypeDesc::Any)
                .with_invoker(|_, args| Ok(args[0].clone())),
        )
        .build();
    ctx.register(gauge.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&gauge);

    let args = [Value::str("HIGH")];
    let handle = facade
        .resolve_method(&target, "set", &args, &here())
        .unwrap()
        .expect("string converts to a Level constant");
    assert_eq!(handle.invoke(&target, &args).unwrap(), Value::I32(2));

    let unknown = [Value::str("MEDIUM")];
    let handle = facade
        .resolve_method(&target, "set", &unknown, &here())
        .unwrap()
        .unwrap();
    let err = handle.invoke(&target, &unknown).unwrap_err();
    assert!(matches!(
        err,
        InvokeError::Conversion(ConversionError::UnknownConstant { .. })
    ));
}

// ============================================================
// Properties
// ============================================================

#[test]
fn test_property_get_prefers_bean_accessor_with_case_swap() {
    let (ctx, _) = recording();
    // Only the lowercased spelling exists; the probe falls back to it.
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("gettitle", vec![], TypeDesc::Str)
                .with_invoker(|_, _| Ok(Value::str("Annual"))),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    let handle = facade
        .resolve_property_get(&target, "title", &here())
        .unwrap()
        .expect("gettitle backs the title property");
    assert_eq!(handle.name(), "title");
    assert_eq!(handle.get(&target).unwrap(), Value::str("Annual"));
}

#[test]
fn test_boolean_property_requires_boolean_return() {
    let (ctx, _) = recording();
    let report = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("isActive", vec![], TypeDesc::Bool)
                .with_invoker(|_, _| Ok(Value::Bool(true))),
        )
        .method(
            MethodSig::new("isCount", vec![], TypeDesc::I32)
                .with_invoker(|_, _| Ok(Value::I32(7))),
        )
        .build();
    ctx.register(report.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&report);

    let active = facade
        .resolve_property_get(&target, "active", &here())
        .unwrap()
        .expect("isActive backs the active property");
    assert_eq!(active.get(&target).unwrap(), Value::Bool(true));

    // A non-boolean is-method does not back a property.
    assert!(facade
        .resolve_property_get(&target, "count", &here())
        .unwrap()
        .is_none());
}

#[test]
fn test_map_properties_read_and_write_keys() {
    let (ctx, _) = recording();
    let facade = Introspector::new(ctx);
    let map = Value::map(vec![(MapKey::from("size"), Value::str("legal"))]);

    // Identifiers read keys, even ones shadowing adapter method names.
    let get = facade
        .resolve_property_get(&map, "size", &here())
        .unwrap()
        .unwrap();
    assert_eq!(get.get(&map).unwrap(), Value::str("legal"));

    let set = facade
        .resolve_property_set(&map, "color", &here())
        .unwrap()
        .unwrap();
    assert_eq!(set.set(&map, &Value::str("blue")).unwrap(), Value::Null);
    assert_eq!(
        set.set(&map, &Value::str("teal")).unwrap(),
        Value::str("blue")
    );

    let get = facade
        .resolve_property_get(&map, "color", &here())
        .unwrap()
        .unwrap();
    assert_eq!(get.get(&map).unwrap(), Value::str("teal"));
}

/// Key/value store host used by the duck-typed map property test.
struct Settings {
    desc: Arc<TypeDescriptor>,
    entries: Mutex<Vec<(String, Value)>>,
}

impl HostObject for Settings {
    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn settings_descriptor() -> Arc<TypeDescriptor> {
    DescriptorBuilder::new("Settings")
        .method(
            MethodSig::new("get", vec![TypeDesc::Str], TypeDesc::Any).with_invoker(
                |target, args| {
                    let this: &Settings = downcast(target);
                    let key = args[0].as_str().unwrap();
                    let entries = this.entries.lock();
                    let found = entries.iter().find(|(k, _)| k == key);
                    Ok(found.map(|(_, v)| v.clone()).unwrap_or(Value::Null))
                },
            ),
        )
        .method(
            MethodSig::new("put", vec![TypeDesc::Str, TypeDesc::Any], TypeDesc::Any)
                .with_invoker(|target, args| {
                    let this: &Settings = downcast(target);
                    let key = args[0].as_str().unwrap().to_string();
                    let value = args[1].clone();
                    let mut entries = this.entries.lock();
                    match entries.iter_mut().find(|(k, _)| *k == key) {
                        Some(slot) => Ok(std::mem::replace(&mut slot.1, value)),
                        None => {
                            entries.push((key, value));
                            Ok(Value::Null)
                        }
                    }
                }),
        )
        .build()
}

#[test]
fn test_map_like_hosts_route_properties_through_get_and_put() {
    let (ctx, _) = recording();
    let desc = settings_descriptor();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = Value::object(Arc::new(Settings {
        desc,
        entries: Mutex::new(vec![("theme".to_string(), Value::str("dark"))]),
    }));

    let get = facade
        .resolve_property_get(&target, "theme", &here())
        .unwrap()
        .expect("get(key) backs properties on map-like hosts");
    assert_eq!(get.get(&target).unwrap(), Value::str("dark"));

    let set = facade
        .resolve_property_set(&target, "theme", &here())
        .unwrap()
        .unwrap();
    assert_eq!(set.set(&target, &Value::str("light")).unwrap(), Value::str("dark"));
    assert_eq!(get.get(&target).unwrap(), Value::str("light"));
}

#[test]
fn test_sequence_property_uses_adapter_surface() {
    let (ctx, _) = recording();
    let facade = Introspector::new(ctx);
    let items = Value::list(vec![Value::I32(1), Value::I32(2)]);

    let size = facade
        .resolve_property_get(&items, "size", &here())
        .unwrap()
        .expect("size() backs the size property on sequences");
    assert_eq!(size.get(&items).unwrap(), Value::I32(2));

    let empty = facade
        .resolve_property_get(&items, "empty", &here())
        .unwrap()
        .expect("isEmpty() backs the empty property");
    assert_eq!(empty.get(&items).unwrap(), Value::Bool(false));

    assert!(facade
        .resolve_property_get(&items, "missing", &here())
        .unwrap()
        .is_none());
}

/// Host with a declared public field, used by the field fallback test.
struct Panel {
    desc: Arc<TypeDescriptor>,
    width: Mutex<i64>,
}

impl HostObject for Panel {
    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_public_field_is_the_final_property_fallback() {
    let (ctx, _) = recording();
    let desc = DescriptorBuilder::new("Panel")
        .field(
            FieldSig::new("width", TypeDesc::I64)
                .with_getter(|target| Ok(Value::I64(*downcast::<Panel>(target).width.lock())))
                .with_setter(|target, value| {
                    let n = value
                        .as_i64()
                        .ok_or_else(|| InvokeError::host("width", "expected an integer"))?;
                    *downcast::<Panel>(target).width.lock() = n;
                    Ok(())
                }),
        )
        .build();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = Value::object(Arc::new(Panel {
        desc,
        width: Mutex::new(7),
    }));

    let get = facade
        .resolve_property_get(&target, "width", &here())
        .unwrap()
        .expect("the declared field backs the property");
    assert_eq!(get.get(&target).unwrap(), Value::I64(7));

    let set = facade
        .resolve_property_set(&target, "width", &here())
        .unwrap()
        .unwrap();
    set.set(&target, &Value::I32(9)).unwrap();
    assert_eq!(get.get(&target).unwrap(), Value::I64(9));
}

/// Host recording which setter overload ran.
struct Doc {
    desc: Arc<TypeDescriptor>,
    body: Mutex<String>,
}

impl HostObject for Doc {
    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn test_property_set_defers_overload_choice_to_the_value() {
    let (ctx, _) = recording();
    let desc = DescriptorBuilder::new("Doc")
        .method(
            MethodSig::new("setBody", vec![TypeDesc::Str], TypeDesc::Any).with_invoker(
                |target, args| {
                    let this: &Doc = downcast(target);
                    *this.body.lock() = format!("text:{}", args[0].as_str().unwrap());
                    Ok(Value::Null)
                },
            ),
        )
        .method(
            MethodSig::new("setBody", vec![TypeDesc::list_of(TypeDesc::Any)], TypeDesc::Any)
                .with_invoker(|target, args| {
                    let this: &Doc = downcast(target);
                    let len = args[0].as_list().unwrap().read().len();
                    *this.body.lock() = format!("items:{len}");
                    Ok(Value::Null)
                }),
        )
        .build();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = Value::object(Arc::new(Doc {
        desc,
        body: Mutex::new(String::new()),
    }));

    // One handle serves both value shapes; the overload is picked per set.
    let set = facade
        .resolve_property_set(&target, "body", &here())
        .unwrap()
        .expect("setBody exists");
    set.set(&target, &Value::str("hi")).unwrap();
    assert_eq!(*downcast::<Doc>(&target).body.lock(), "text:hi");

    set.set(&target, &Value::list(vec![Value::Null, Value::Null]))
        .unwrap();
    assert_eq!(*downcast::<Doc>(&target).body.lock(), "items:2");
}

#[test]
fn test_property_set_misses_surface_as_invocation_errors() {
    let (ctx, _) = recording();
    let desc = DescriptorBuilder::new("Panel")
        .method(MethodSig::new(
            "setWidth",
            vec![TypeDesc::I32],
            TypeDesc::Any,
        ))
        .build();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&desc);

    let set = facade
        .resolve_property_set(&target, "width", &here())
        .unwrap()
        .expect("a one-argument setter exists");
    let err = set.set(&target, &Value::list(vec![])).unwrap_err();
    match err {
        InvokeError::Host { method, .. } => assert_eq!(method, "setWidth"),
        other => panic!("expected a host error, got {other:?}"),
    }
}

// ============================================================
// Iteration
// ============================================================

#[test]
fn test_sequence_iteration_runs_over_a_snapshot() {
    let (ctx, _) = recording();
    let facade = Introspector::new(ctx);
    let items = Value::list(vec![Value::I32(1), Value::I32(2)]);

    let iter = facade
        .resolve_iterator(&items, &here())
        .unwrap()
        .expect("sequences iterate");
    // Mutation after resolution does not reach the traversal.
    items.as_list().unwrap().write().push(Value::I32(3));
    let seen: Vec<Value> = iter.map(|item| item.unwrap()).collect();
    assert_eq!(seen, vec![Value::I32(1), Value::I32(2)]);
}

#[test]
fn test_map_iteration_yields_values_in_insertion_order() {
    let (ctx, _) = recording();
    let facade = Introspector::new(ctx);
    let map = Value::map(vec![
        (MapKey::from("b"), Value::I32(2)),
        (MapKey::from("a"), Value::I32(1)),
        (MapKey::from("c"), Value::I32(3)),
    ]);

    let iter = facade.resolve_iterator(&map, &here()).unwrap().unwrap();
    let seen: Vec<Value> = iter.map(|item| item.unwrap()).collect();
    assert_eq!(seen, vec![Value::I32(2), Value::I32(1), Value::I32(3)]);
}

/// Host iterator with its own cursor state.
struct Cursor {
    desc: Arc<TypeDescriptor>,
    remaining: Mutex<Vec<Value>>,
}

impl HostObject for Cursor {
    fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.desc
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn cursor_descriptor() -> Arc<TypeDescriptor> {
    DescriptorBuilder::new("Cursor")
        .method(
            MethodSig::new("hasNext", vec![], TypeDesc::Bool).with_invoker(|target, _| {
                let this: &Cursor = downcast(target);
                Ok(Value::Bool(!this.remaining.lock().is_empty()))
            }),
        )
        .method(
            MethodSig::new("next", vec![], TypeDesc::Any).with_invoker(|target, _| {
                let this: &Cursor = downcast(target);
                let mut remaining = this.remaining.lock();
                if remaining.is_empty() {
                    return Err(InvokeError::host("next", "cursor is exhausted"));
                }
                Ok(remaining.remove(0))
            }),
        )
        .build()
}

#[test]
fn test_host_iterator_passes_through_and_warns_once() {
    let (ctx, sink) = recording();
    let desc = cursor_descriptor();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = Value::object(Arc::new(Cursor {
        desc,
        remaining: Mutex::new(vec![Value::str("x"), Value::str("y")]),
    }));

    let iter = facade
        .resolve_iterator(&target, &here())
        .unwrap()
        .expect("the iterator shape passes through");
    let seen: Vec<Value> = iter.map(|item| item.unwrap()).collect();
    assert_eq!(seen, vec![Value::str("x"), Value::str("y")]);
    assert_eq!(
        sink.count_matching(|e| matches!(e, IntrospectEvent::NonRestartableIterator { .. })),
        1
    );

    // The cursor is spent; a second pass sees nothing, and each resolution
    // warns exactly once.
    let iter = facade.resolve_iterator(&target, &here()).unwrap().unwrap();
    assert_eq!(iter.count(), 0);
    assert_eq!(
        sink.count_matching(|e| matches!(e, IntrospectEvent::NonRestartableIterator { .. })),
        2
    );
}

#[test]
fn test_iterator_method_fallback_produces_a_fresh_traversal() {
    let (ctx, sink) = recording();
    let desc = DescriptorBuilder::new("Feed")
        .method(
            MethodSig::new("iterator", vec![], TypeDesc::list_of(TypeDesc::Any)).with_invoker(
                |_, _| Ok(Value::list(vec![Value::I32(1), Value::I32(2)])),
            ),
        )
        .build();
    ctx.register(desc.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&desc);

    for _ in 0..2 {
        let iter = facade
            .resolve_iterator(&target, &here())
            .unwrap()
            .expect("iterator() backs the traversal");
        let seen: Vec<Value> = iter.map(|item| item.unwrap()).collect();
        assert_eq!(seen, vec![Value::I32(1), Value::I32(2)]);
    }
    // A freshly produced iterator is restartable; no warning applies.
    assert_eq!(
        sink.count_matching(|e| matches!(e, IntrospectEvent::NonRestartableIterator { .. })),
        0
    );
}

#[test]
fn test_uniterable_values_resolve_to_none() {
    let (ctx, _) = recording();
    let facade = Introspector::new(ctx);

    assert!(facade
        .resolve_iterator(&Value::Null, &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_iterator(&Value::I32(5), &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_iterator(&Value::str("ab"), &here())
        .unwrap()
        .is_none());
}

// ============================================================
// Policy decorators and configuration
// ============================================================

#[test]
fn test_configured_chain_denies_and_reports_each_reference_once() {
    let sink = Arc::new(RecordingSink::new());
    let config = IntrospectConfig::from_toml_str(
        r#"
        decorators = ["restrict", "deprecation"]

        [restrict]
        denied_types = ["Secret"]
        denied_members = ["shutdown"]
        "#,
    )
    .unwrap();
    let (ctx, facade) = build_introspector(&config, sink.clone()).unwrap();

    let service = DescriptorBuilder::new("Service")
        .method(
            MethodSig::new("ping", vec![], TypeDesc::Str)
                .with_invoker(|_, _| Ok(Value::str("pong"))),
        )
        .method(
            MethodSig::new("shutdown", vec![], TypeDesc::Any)
                .with_invoker(|_, _| Ok(Value::Null)),
        )
        .build();
    ctx.register(service.clone());
    let secret = DescriptorBuilder::new("Secret")
        .method(
            MethodSig::new("reveal", vec![], TypeDesc::Str)
                .with_invoker(|_, _| Ok(Value::str("xyzzy"))),
        )
        .build();
    ctx.register(secret.clone());

    let svc = plain(&service);
    let sec = plain(&secret);

    // Denials are silent misses, never errors.
    assert!(facade
        .resolve_method(&svc, "shutdown", &[], &here())
        .unwrap()
        .is_none());
    assert!(facade
        .resolve_method(&sec, "reveal", &[], &here())
        .unwrap()
        .is_none());

    // Allowed references pass through the whole chain.
    let ping = facade
        .resolve_method(&svc, "ping", &[], &here())
        .unwrap()
        .unwrap();
    assert_eq!(ping.invoke(&svc, &[]).unwrap(), Value::str("pong"));

    let events = sink.snapshot();
    let denials: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, IntrospectEvent::AccessDenied { .. }))
        .collect();
    assert_eq!(denials.len(), 2);
    assert!(denials.iter().any(|e| matches!(
        e,
        IntrospectEvent::AccessDenied { member: Some(m), .. } if m.as_ref() == "shutdown"
    )));
}

#[test]
fn test_deprecation_decorator_reports_without_changing_results() {
    let sink = Arc::new(RecordingSink::new());
    let ctx = Arc::new(ResolutionContext::with_sink(sink.clone()));
    let desc = DescriptorBuilder::new("Report")
        .method(
            MethodSig::new("legacyTotal", vec![], TypeDesc::I64)
                .deprecated()
                .with_invoker(|_, _| Ok(Value::I64(9))),
        )
        .method(
            MethodSig::new("getTitle", vec![], TypeDesc::Str)
                .deprecated()
                .with_invoker(|_, _| Ok(Value::str("Annual"))),
        )
        .build();
    ctx.register(desc.clone());
    let inner: Arc<dyn Introspect> = Arc::new(Introspector::new(ctx));
    let facade = DeprecationIntrospector::new(inner, sink.clone());
    let target = plain(&desc);

    let handle = facade
        .resolve_method(&target, "legacyTotal", &[], &here())
        .unwrap()
        .expect("deprecated members still resolve");
    assert_eq!(handle.invoke(&target, &[]).unwrap(), Value::I64(9));

    let get = facade
        .resolve_property_get(&target, "title", &here())
        .unwrap()
        .unwrap();
    assert_eq!(get.get(&target).unwrap(), Value::str("Annual"));

    let events = sink.snapshot();
    let deprecations: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            IntrospectEvent::DeprecatedMember { member, .. } => Some(member.as_ref()),
            _ => None,
        })
        .collect();
    assert_eq!(deprecations, vec!["legacyTotal", "title"]);
}

#[test]
fn test_resolved_members_report_an_exported_declaring_type() {
    let (ctx, _) = recording();
    let store = DescriptorBuilder::new("Store")
        .method(MethodSig::new(
            "items",
            vec![],
            TypeDesc::list_of(TypeDesc::Any),
        ))
        .build();
    let vec_store = DescriptorBuilder::new("VecStore")
        .unexported()
        .implements(store.clone())
        .method(
            MethodSig::new("items", vec![], TypeDesc::list_of(TypeDesc::Any))
                .with_invoker(|_, _| Ok(Value::list(vec![Value::I32(1)]))),
        )
        .build();
    ctx.register(store);
    ctx.register(vec_store.clone());
    let facade = Introspector::new(ctx);
    let target = plain(&vec_store);

    let handle = facade
        .resolve_method(&target, "items", &[], &here())
        .unwrap()
        .expect("the interface re-homes the declaration");
    assert_eq!(handle.declaring_type().name.as_ref(), "Store");
    assert!(handle.declaring_type().exported);
    // The hidden type's invoker still runs.
    assert_eq!(
        handle.invoke(&target, &[]).unwrap(),
        Value::list(vec![Value::I32(1)])
    );
}

#[test]
fn test_disabled_conversions_remove_explicit_matches() {
    let sink = Arc::new(RecordingSink::new());
    let config = IntrospectConfig {
        conversion: ConversionMode::Disabled,
        ..IntrospectConfig::default()
    };
    let (ctx, facade) = build_introspector(&config, sink).unwrap();
    let report = DescriptorBuilder::new("Report")
        .method(MethodSig::new("pad", vec![TypeDesc::I32], TypeDesc::I32))
        .build();
    ctx.register(report.clone());
    let target = plain(&report);

    // Without conversions the string argument has no route to i32.
    assert!(facade
        .resolve_method(&target, "pad", &[Value::str("12")], &here())
        .unwrap()
        .is_none());
    // Widening still applies.
    assert!(facade
        .resolve_method(&target, "pad", &[Value::I8(3)], &here())
        .unwrap()
        .is_some());
}

#[test]
fn test_config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("introspect.toml");
    std::fs::write(&path, "conversion = \"disabled\"\ndecorators = [\"restrict\"]\n").unwrap();

    let config = IntrospectConfig::from_path(&path).unwrap();
    assert_eq!(config.conversion, ConversionMode::Disabled);
    assert_eq!(config.decorators, vec!["restrict"]);

    let err = IntrospectConfig::from_path(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
