//! Resolution outcomes and resolution-time errors.
//!
//! Only two conditions are hard errors at resolution time: ambiguity and a
//! missing exported declaration. "No applicable overload" is an ordinary
//! outcome the facade maps to `Ok(None)`, so it carries diagnostics rather
//! than implementing `Error`.

use std::fmt;

use thiserror::Error;

use crate::descriptor::MethodSig;
use crate::value::ArgType;

use super::applicability::Applicability;

/// Outcome of resolving a member name against an actual argument tuple.
#[derive(Debug)]
pub enum Resolution {
    /// A unique best candidate was found.
    Resolved(ResolvedMethod),
    /// No candidate was applicable (or the name is unknown).
    NoMatch(NoMatch),
    /// Several candidates survived domination; the call is ambiguous.
    Ambiguous(Ambiguity),
}

/// The unique best candidate for a call.
#[derive(Debug)]
pub struct ResolvedMethod {
    /// The winning signature.
    pub sig: MethodSig,
    /// The applicability level it won at.
    pub level: Applicability,
    /// Whether trailing arguments must be packed into the variadic tail.
    pub spread: bool,
}

/// Diagnostics for a failed lookup. Not an error: the caller surfaces a
/// missing-reference condition instead.
#[derive(Debug, Clone)]
pub struct NoMatch {
    /// The member name that was called.
    pub name: String,
    /// The actual argument types supplied.
    pub arg_types: Vec<ArgType>,
    /// How many same-named candidates were considered.
    pub candidates_seen: usize,
}

impl fmt::Display for NoMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no applicable overload of {:?} for (", self.name)?;
        for (i, t) in self.arg_types.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{t}")?;
        }
        write!(f, "); {} candidate(s) considered", self.candidates_seen)
    }
}

/// Several equally good candidates; surfaced as an error, never silently
/// tie-broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    /// The member name that was called.
    pub name: String,
    /// Number of surviving candidates.
    pub candidate_count: usize,
}

/// Errors raised at resolution time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Multiple candidates are equally applicable and equally specific.
    #[error("ambiguous reference to {name:?}: {candidate_count} candidates are equally specific")]
    Ambiguous {
        /// The member name that was called.
        name: String,
        /// Number of surviving candidates.
        candidate_count: usize,
    },

    /// The chosen signature has no exported declaration to invoke through.
    #[error("member {member:?} of type {type_name} has no exported declaration")]
    Inaccessible {
        /// Registered name of the receiver's type.
        type_name: String,
        /// The member that was resolved.
        member: String,
    },
}

impl From<Ambiguity> for ResolveError {
    fn from(a: Ambiguity) -> Self {
        ResolveError::Ambiguous {
            name: a.name,
            candidate_count: a.candidate_count,
        }
    }
}
