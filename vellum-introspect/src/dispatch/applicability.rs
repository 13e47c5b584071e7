//! Applicability: whether and how well an actual argument tuple satisfies
//! a candidate's formal parameters.
//!
//! Each position matches at one of three levels, and a candidate's level is
//! the minimum across its positions. The levels order
//! `NotApplicable < Explicit < Implicit < Strict`, so a candidate needing
//! any registered conversion ranks below one satisfied by widening alone,
//! which ranks below an exact or subtype match.

use crate::convert::ConversionRegistry;
use crate::descriptor::{MethodSig, TypeDesc};
use crate::value::ArgType;

/// How well a value of an actual type satisfies a formal parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Applicability {
    /// The position cannot be satisfied.
    NotApplicable,
    /// Satisfiable through a registered or built-in conversion.
    Explicit,
    /// Satisfiable through autoboxing or primitive widening.
    Implicit,
    /// Exact, subtype, or null-to-reference match.
    Strict,
}

/// A candidate's overall fit for a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateFit {
    /// Minimum applicability across argument positions.
    pub level: Applicability,
    /// Whether trailing arguments must be packed into the variadic tail.
    pub spread: bool,
}

/// Applicability of one actual type at one formal position.
pub(crate) fn position_applicability(
    formal: &TypeDesc,
    actual: &ArgType,
    conversions: &ConversionRegistry,
) -> Applicability {
    // Null satisfies any reference-like formal and no primitive one.
    if actual.is_null() {
        return if formal.is_reference() {
            Applicability::Strict
        } else {
            Applicability::NotApplicable
        };
    }
    if strict_match(formal, actual) {
        return Applicability::Strict;
    }
    if implicit_match(formal, actual) {
        return Applicability::Implicit;
    }
    if conversions.is_explicitly_convertible(formal, actual, false) {
        return Applicability::Explicit;
    }
    Applicability::NotApplicable
}

fn strict_match(formal: &TypeDesc, actual: &ArgType) -> bool {
    match (formal, actual) {
        (TypeDesc::Bool, ArgType::Bool)
        | (TypeDesc::Char, ArgType::Char)
        | (TypeDesc::I8, ArgType::I8)
        | (TypeDesc::I16, ArgType::I16)
        | (TypeDesc::I32, ArgType::I32)
        | (TypeDesc::I64, ArgType::I64)
        | (TypeDesc::F32, ArgType::F32)
        | (TypeDesc::F64, ArgType::F64)
        | (TypeDesc::Str, ArgType::Str)
        | (TypeDesc::Map, ArgType::Map) => true,
        // Sequence element types are erased at resolution time.
        (TypeDesc::List(_), ArgType::List) => true,
        (TypeDesc::Object(name), ArgType::Object(desc)) => desc.has_ancestor_named(name),
        // Reference values reach the top type without boxing.
        (TypeDesc::Any, actual) => !actual.is_primitive(),
        _ => false,
    }
}

fn implicit_match(formal: &TypeDesc, actual: &ArgType) -> bool {
    // Primitives box up to the top type.
    if matches!(formal, TypeDesc::Any) && actual.is_primitive() {
        return true;
    }
    is_widening(actual, formal)
}

/// The primitive widening table: lossy-free conversions applied without a
/// registered converter.
pub(crate) fn is_widening(actual: &ArgType, formal: &TypeDesc) -> bool {
    matches!(
        (actual, formal),
        (
            ArgType::I8,
            TypeDesc::I16 | TypeDesc::I32 | TypeDesc::I64 | TypeDesc::F32 | TypeDesc::F64
        ) | (
            ArgType::I16,
            TypeDesc::I32 | TypeDesc::I64 | TypeDesc::F32 | TypeDesc::F64
        ) | (ArgType::I32, TypeDesc::I64 | TypeDesc::F32 | TypeDesc::F64)
            | (ArgType::I64, TypeDesc::F32 | TypeDesc::F64)
            | (ArgType::F32, TypeDesc::F64)
            | (
                ArgType::Char,
                TypeDesc::I32 | TypeDesc::I64 | TypeDesc::F32 | TypeDesc::F64
            )
    )
}

/// Evaluates a candidate against a call's actual types. `None` means some
/// position is unsatisfiable (or the arity cannot match).
pub(crate) fn candidate_fit(
    sig: &MethodSig,
    args: &[ArgType],
    conversions: &ConversionRegistry,
) -> Option<CandidateFit> {
    let m = args.len();
    let n = sig.params.len();

    let Some(elem) = sig.variadic_element() else {
        if m != n {
            return None;
        }
        let mut level = Applicability::Strict;
        for (formal, actual) in sig.params.iter().zip(args) {
            let p = position_applicability(formal, actual, conversions);
            if p == Applicability::NotApplicable {
                return None;
            }
            level = level.min(p);
        }
        return Some(CandidateFit {
            level,
            spread: false,
        });
    };

    // Variadic: the tail absorbs zero, one, or many trailing arguments.
    if m + 1 < n {
        return None;
    }
    let mut level = Applicability::Strict;
    for (formal, actual) in sig.params[..n - 1].iter().zip(args.iter()) {
        let p = position_applicability(formal, actual, conversions);
        if p == Applicability::NotApplicable {
            return None;
        }
        level = level.min(p);
    }

    if m == n {
        // Equal arity: the final actual may pass through as the sequence
        // itself, or expand as a single element. Use the better of the two;
        // ties go to the direct interpretation, which needs no adapter.
        let direct =
            position_applicability(&sig.params[n - 1], &args[n - 1], conversions);
        let expanded = position_applicability(elem, &args[n - 1], conversions);
        return if direct >= expanded {
            if direct == Applicability::NotApplicable {
                return None;
            }
            Some(CandidateFit {
                level: level.min(direct),
                spread: false,
            })
        } else {
            Some(CandidateFit {
                level: level.min(expanded),
                spread: true,
            })
        };
    }

    // Absorb zero (m == n-1) or several (m > n) trailing arguments.
    for actual in &args[n - 1..] {
        let p = position_applicability(elem, actual, conversions);
        if p == Applicability::NotApplicable {
            return None;
        }
        level = level.min(p);
    }
    Some(CandidateFit {
        level,
        spread: true,
    })
}
