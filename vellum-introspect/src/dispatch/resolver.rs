//! The resolution loop.
//!
//! A single pass over the overload list maintains a kept set of
//! non-dominated candidates. Domination is applicability first, then
//! specificity; two surviving candidates at the end are an ambiguity. The
//! resolver is stateless over borrowed collaborators, so one can be built
//! per call site without allocation.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::convert::ConversionRegistry;
use crate::descriptor::{DeclaringType, MemberFlags, MethodSig, TypeDescriptor, TypeIdentity};
use crate::table::MemberTable;
use crate::value::ArgType;

use super::applicability::{candidate_fit, CandidateFit};
use super::result::{Ambiguity, NoMatch, Resolution, ResolveError, ResolvedMethod};
use super::specificity::{self, Specificity};

/// Callback used to look up a registered descriptor by name when comparing
/// object formals.
pub type TypeLookup<'a> = dyn Fn(&str) -> Option<Arc<TypeDescriptor>> + 'a;

/// Stateless overload resolver over borrowed collaborators.
pub struct Resolver<'a> {
    lookup: &'a TypeLookup<'a>,
    conversions: &'a ConversionRegistry,
}

impl<'a> Resolver<'a> {
    /// New resolver borrowing the descriptor lookup and conversion
    /// registry.
    pub fn new(lookup: &'a TypeLookup<'a>, conversions: &'a ConversionRegistry) -> Self {
        Resolver {
            lookup,
            conversions,
        }
    }

    /// Resolves a member name against the actual argument types.
    #[tracing::instrument(level = "trace", skip_all, fields(member = %name, arity = args.len()))]
    pub fn resolve(&self, table: &MemberTable, name: &str, args: &[ArgType]) -> Resolution {
        let Some(candidates) = table.overloads(name) else {
            return Resolution::NoMatch(NoMatch {
                name: name.to_string(),
                arg_types: args.to_vec(),
                candidates_seen: 0,
            });
        };

        let mut kept: Vec<(&MethodSig, CandidateFit)> = Vec::new();
        for sig in candidates {
            let Some(fit) = candidate_fit(sig, args, self.conversions) else {
                continue;
            };
            if kept
                .iter()
                .any(|&(k_sig, k_fit)| self.dominates(k_sig, k_fit, sig, fit, args))
            {
                continue;
            }
            kept.retain(|&(k_sig, k_fit)| !self.dominates(sig, fit, k_sig, k_fit, args));
            kept.push((sig, fit));
        }

        match kept.as_slice() {
            [] => Resolution::NoMatch(NoMatch {
                name: name.to_string(),
                arg_types: args.to_vec(),
                candidates_seen: candidates.len(),
            }),
            [(sig, fit)] => {
                trace!(level = ?fit.level, spread = fit.spread, "resolved");
                Resolution::Resolved(ResolvedMethod {
                    sig: (*sig).clone(),
                    level: fit.level,
                    spread: fit.spread,
                })
            }
            survivors => Resolution::Ambiguous(Ambiguity {
                name: name.to_string(),
                candidate_count: survivors.len(),
            }),
        }
    }

    /// Whether candidate `a` strictly beats candidate `b` for this call.
    fn dominates(
        &self,
        a_sig: &MethodSig,
        a_fit: CandidateFit,
        b_sig: &MethodSig,
        b_fit: CandidateFit,
        args: &[ArgType],
    ) -> bool {
        if a_fit.level != b_fit.level {
            return a_fit.level > b_fit.level;
        }
        match specificity::compare(
            a_sig,
            a_fit.spread,
            b_sig,
            b_fit.spread,
            args.len(),
            self.lookup,
        ) {
            Specificity::More => true,
            // With every supplied argument null, nothing constrains the
            // choice; prefer the fixed-arity candidate over the variadic.
            Specificity::Incomparable => {
                args.iter().all(ArgType::is_null) && !a_sig.is_variadic() && b_sig.is_variadic()
            }
            _ => false,
        }
    }

    /// Re-homes a chosen signature onto an exported declaration.
    ///
    /// Members declared on non-exported types keep their concrete invoker,
    /// but their reported declaration must come from an exported ancestor
    /// with the identical erased signature. Statics skip this step. The
    /// walk is rooted at the receiver; any exported redeclaration below the
    /// original declarer would already have shadowed it in the member
    /// table, so the first hit is the shallowest exported declarer.
    pub fn normalize_access(
        &self,
        sig: &MethodSig,
        receiver: &Arc<TypeDescriptor>,
    ) -> Result<MethodSig, ResolveError> {
        if sig.declared_by.exported || sig.flags.contains(MemberFlags::STATIC) {
            return Ok(sig.clone());
        }
        match find_exported_declaration(receiver, sig) {
            Some(declaring) => {
                let mut rehomed = sig.clone();
                rehomed.declared_by = declaring;
                Ok(rehomed)
            }
            None => Err(ResolveError::Inaccessible {
                type_name: receiver.name().to_string(),
                member: sig.name.to_string(),
            }),
        }
    }
}

/// Superclass chain first, then interfaces breadth-first, returning the
/// first exported type declaring the same erased signature.
fn find_exported_declaration(
    receiver: &Arc<TypeDescriptor>,
    sig: &MethodSig,
) -> Option<DeclaringType> {
    let mut pending_interfaces: Vec<Arc<TypeDescriptor>> = Vec::new();

    let mut current = Some(receiver.clone());
    while let Some(d) = current {
        if d.is_exported() && d.declares_erased(sig) {
            return Some(d.declaring_type());
        }
        pending_interfaces.extend(d.interfaces().iter().cloned());
        current = d.extends().cloned();
    }

    let mut seen: FxHashSet<TypeIdentity> = FxHashSet::default();
    let mut idx = 0;
    while idx < pending_interfaces.len() {
        let iface = pending_interfaces[idx].clone();
        idx += 1;
        if !seen.insert(iface.identity()) {
            continue;
        }
        if iface.is_exported() && iface.declares_erased(sig) {
            return Some(iface.declaring_type());
        }
        if let Some(parent) = iface.extends() {
            pending_interfaces.push(parent.clone());
        }
        pending_interfaces.extend(iface.interfaces().iter().cloned());
    }
    None
}
