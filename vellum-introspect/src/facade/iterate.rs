//! Iteration adapters for `#foreach`-style traversal.
//!
//! Native sequences and maps iterate over a snapshot taken at resolution
//! time, so concurrent mutation of the backing collection cannot tear the
//! traversal. Host objects iterate live through their own `hasNext` /
//! `next` pair, which also means they cannot be restarted; resolving one
//! directly emits a warning event so template authors hear about the
//! second, empty pass.

use tracing::{debug, warn};

use crate::descriptor::{TypeDesc, TypeDescriptor};
use crate::dispatch::ResolveError;
use crate::error::InvokeError;
use crate::events::{IntrospectEvent, SourceLocation};
use crate::value::Value;

use super::introspector::{Introspector, MethodHandle};
use std::sync::Arc;

#[derive(Debug)]
enum IterKind {
    /// Snapshot of a native collection.
    Items(std::vec::IntoIter<Value>),
    /// Live traversal of a host iterator.
    Host {
        target: Value,
        has_next: MethodHandle,
        next: MethodHandle,
        failed: bool,
    },
}

/// A resolved iteration over a value.
///
/// Yields `Result` items: host-backed traversal can fail mid-stream, and a
/// failure ends the iteration.
#[derive(Debug)]
pub struct ValueIter {
    kind: IterKind,
}

impl ValueIter {
    fn items(items: Vec<Value>) -> Self {
        ValueIter {
            kind: IterKind::Items(items.into_iter()),
        }
    }

    fn host(target: Value, has_next: MethodHandle, next: MethodHandle) -> Self {
        ValueIter {
            kind: IterKind::Host {
                target,
                has_next,
                next,
                failed: false,
            },
        }
    }
}

impl Iterator for ValueIter {
    type Item = Result<Value, InvokeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.kind {
            IterKind::Items(items) => items.next().map(Ok),
            IterKind::Host {
                target,
                has_next,
                next,
                failed,
            } => {
                if *failed {
                    return None;
                }
                match has_next.invoke(target, &[]) {
                    Ok(Value::Bool(true)) => match next.invoke(target, &[]) {
                        Ok(item) => Some(Ok(item)),
                        Err(err) => {
                            *failed = true;
                            Some(Err(err))
                        }
                    },
                    Ok(Value::Bool(false)) => None,
                    Ok(_) => {
                        *failed = true;
                        Some(Err(InvokeError::host(
                            has_next.name(),
                            "expected a boolean result while iterating",
                        )))
                    }
                    Err(err) => {
                        *failed = true;
                        Some(Err(err))
                    }
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.kind {
            IterKind::Items(items) => items.size_hint(),
            IterKind::Host { .. } => (0, None),
        }
    }
}

/// Looks for the structural iterator shape: a zero-argument `hasNext`
/// returning a boolean plus a zero-argument `next`.
fn iterator_shape(
    intro: &Introspector,
    desc: &Arc<TypeDescriptor>,
) -> Result<Option<(MethodHandle, MethodHandle)>, ResolveError> {
    let Some(has_next) = intro.resolve_on_descriptor(desc, "hasNext", &[])? else {
        return Ok(None);
    };
    if has_next.signature().returns != TypeDesc::Bool {
        return Ok(None);
    }
    let Some(next) = intro.resolve_on_descriptor(desc, "next", &[])? else {
        return Ok(None);
    };
    Ok(Some((has_next, next)))
}

pub(super) fn resolve(
    intro: &Introspector,
    target: &Value,
    location: &SourceLocation,
) -> Result<Option<ValueIter>, ResolveError> {
    match target {
        Value::Null => return Ok(None),
        Value::List(cell) => {
            let items = cell.read().clone();
            return Ok(Some(ValueIter::items(items)));
        }
        Value::Map(cell) => {
            let items: Vec<Value> = cell.read().values().cloned().collect();
            return Ok(Some(ValueIter::items(items)));
        }
        _ => {}
    }
    let Some(desc) = intro.context().descriptor_for(target) else {
        return Ok(None);
    };

    // The target is itself an iterator: pass it through, but it only runs
    // once.
    if let Some((has_next, next)) = iterator_shape(intro, &desc)? {
        intro
            .context()
            .sink()
            .emit(&IntrospectEvent::NonRestartableIterator {
                type_name: desc.shared_name(),
                location: location.clone(),
            });
        return Ok(Some(ValueIter::host(target.clone(), has_next, next)));
    }

    // Duck-typed fallback: ask the object for its iterator now.
    if let Some(handle) = intro.resolve_on_descriptor(&desc, "iterator", &[])? {
        match handle.invoke(target, &[]) {
            Ok(Value::List(cell)) => {
                let items = cell.read().clone();
                return Ok(Some(ValueIter::items(items)));
            }
            Ok(produced) => {
                if let Some(produced_desc) = intro.context().descriptor_for(&produced) {
                    if let Some((has_next, next)) = iterator_shape(intro, &produced_desc)? {
                        return Ok(Some(ValueIter::host(produced, has_next, next)));
                    }
                }
                debug!(
                    type_name = %desc.name(),
                    "iterator() returned a value that is not iterator-shaped"
                );
                return Ok(None);
            }
            Err(err) => {
                warn!(
                    type_name = %desc.name(),
                    error = %err,
                    "iterator() failed while resolving an iteration"
                );
                return Ok(None);
            }
        }
    }
    Ok(None)
}
