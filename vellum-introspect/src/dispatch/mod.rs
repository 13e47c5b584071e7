//! Overload resolution.
//!
//! This module implements the resolution algorithm that selects which
//! registered signature a template call binds to, based on the runtime
//! types of all supplied arguments. Resolution is modeled on
//! static-language method selection rules but runs entirely at render
//! time, so the hazards those rules exist for (ambiguity, narrowing,
//! varargs) are live here.
//!
//! # Algorithm Overview
//!
//! 1. **Collect candidates**: Fetch the overload list for the member name
//! 2. **Rank applicability**: Per candidate, the minimum across argument
//!    positions of strict / implicit / explicit matching
//! 3. **Keep the non-dominated**: Higher applicability wins outright; at
//!    equal applicability, strictly greater specificity wins
//! 4. **Select**: A unique survivor resolves; several survivors are an
//!    ambiguity error, never a silent tie-break
//!
//! # Module Structure
//!
//! - [`applicability`] - Per-position and per-candidate applicability levels
//! - [`specificity`] - The partial order over formal parameter lists
//! - [`result`] - Resolution outcomes and resolution-time errors
//! - [`resolver`] - The kept-set loop and accessibility normalization

mod applicability;
mod result;
mod resolver;
mod specificity;


pub use applicability::{Applicability, CandidateFit};
pub use result::{Ambiguity, NoMatch, Resolution, ResolveError, ResolvedMethod};
pub use resolver::{Resolver, TypeLookup};
pub use specificity::Specificity;

pub(crate) use applicability::position_applicability;
