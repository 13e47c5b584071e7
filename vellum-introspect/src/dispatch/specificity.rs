//! Specificity: the partial order over formal parameter lists.
//!
//! Used to discriminate between candidates that are equally applicable.
//! Comparison is structural: both formal lists are expanded to the call's
//! arity (variadic tails repeat their element type), then compared position
//! by position. One incomparable position, or strictly-more-specific
//! positions in both directions, makes the signatures incomparable, which
//! is what surfaces as an ambiguity error.

use crate::descriptor::{MethodSig, TypeDesc};

use super::resolver::TypeLookup;

/// Outcome of comparing two formal parameter lists at a call arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specificity {
    /// The first list is strictly more specific.
    More,
    /// The first list is strictly less specific.
    Less,
    /// The lists are interchangeable for this arity.
    Equivalent,
    /// Neither list refines the other.
    Incomparable,
}

/// Whether a value typed `from` is accepted where `to` is declared without
/// an explicit conversion (identity, erasure, widening, subtype, or boxing
/// to the top type).
fn formal_fits(from: &TypeDesc, to: &TypeDesc, lookup: &TypeLookup) -> bool {
    if from.erased_eq(to) {
        return true;
    }
    match (from, to) {
        (_, TypeDesc::Any) => true,
        (TypeDesc::Object(from_name), TypeDesc::Object(to_name)) => lookup(from_name)
            .map(|desc| desc.has_ancestor_named(to_name))
            .unwrap_or(false),
        (TypeDesc::I8, TypeDesc::I16 | TypeDesc::I32 | TypeDesc::I64) => true,
        (TypeDesc::I16, TypeDesc::I32 | TypeDesc::I64) => true,
        (TypeDesc::I32, TypeDesc::I64) => true,
        (
            TypeDesc::I8 | TypeDesc::I16 | TypeDesc::I32 | TypeDesc::I64,
            TypeDesc::F32 | TypeDesc::F64,
        ) => true,
        (TypeDesc::F32, TypeDesc::F64) => true,
        (TypeDesc::Char, TypeDesc::I32 | TypeDesc::I64 | TypeDesc::F32 | TypeDesc::F64) => true,
        _ => false,
    }
}

/// Compares one position of two expanded formal lists.
fn position_specificity(a: &TypeDesc, b: &TypeDesc, lookup: &TypeLookup) -> Specificity {
    match (formal_fits(a, b, lookup), formal_fits(b, a, lookup)) {
        (true, true) => Specificity::Equivalent,
        (true, false) => Specificity::More,
        (false, true) => Specificity::Less,
        (false, false) => Specificity::Incomparable,
    }
}

/// The formal type governing position `i` when the signature is applied at
/// `arity`. A variadic tail contributes its element type when the call
/// actually expanded into it (`spread`), or when the arity differs from the
/// declared parameter count; a sequence passed through unexpanded keeps the
/// declared tail.
fn expanded_formal<'a>(sig: &'a MethodSig, spread: bool, i: usize, arity: usize) -> &'a TypeDesc {
    let n = sig.params.len();
    if sig.is_variadic() && (spread || arity != n) && i >= n - 1 {
        // Applicable variadic candidates always have a sequence tail.
        if let Some(elem) = sig.variadic_element() {
            return elem;
        }
    }
    &sig.params[i.min(n - 1)]
}

/// Compares two applicable candidates' formal lists at a call arity, each
/// under the interpretation it matched with.
///
/// When the expanded lists are fully equivalent, a fixed-arity signature is
/// strictly more specific than a variadic one; this is what makes
/// `f(x)` beat `f(xs...)` for a one-argument call.
pub(crate) fn compare(
    c1: &MethodSig,
    spread1: bool,
    c2: &MethodSig,
    spread2: bool,
    arity: usize,
    lookup: &TypeLookup,
) -> Specificity {
    let mut more = false;
    let mut less = false;
    for i in 0..arity {
        let t1 = expanded_formal(c1, spread1, i, arity);
        let t2 = expanded_formal(c2, spread2, i, arity);
        match position_specificity(t1, t2, lookup) {
            Specificity::Equivalent => {}
            Specificity::More => more = true,
            Specificity::Less => less = true,
            Specificity::Incomparable => return Specificity::Incomparable,
        }
    }
    match (more, less) {
        (true, false) => Specificity::More,
        (false, true) => Specificity::Less,
        (true, true) => Specificity::Incomparable,
        (false, false) => match (c1.is_variadic(), c2.is_variadic()) {
            (false, true) => Specificity::More,
            (true, false) => Specificity::Less,
            _ => Specificity::Equivalent,
        },
    }
}
