//! Policy decorators around the base facade.
//!
//! Both decorators hold the next [`Introspect`] link, so a deployment
//! stacks them in whatever order its configuration lists. Restriction is a
//! pre-filter: a denied reference never reaches the inner facade and
//! resolves to "no such member" rather than an error. Deprecation is a
//! post-observer: it never changes what resolved, it only reports on it.

use std::sync::Arc;

use crate::descriptor::{MemberFlags, TypeDescriptor};
use crate::dispatch::ResolveError;
use crate::events::{EventSink, IntrospectEvent, SourceLocation};
use crate::value::Value;

use super::{Introspect, MethodHandle, PropertyGetHandle, PropertySetHandle, ValueIter};

/// Deny lists applied by [`RestrictedIntrospector`].
#[derive(Debug, Clone, Default)]
pub struct RestrictionRules {
    denied_types: Vec<Arc<str>>,
    denied_packages: Vec<Arc<str>>,
    denied_members: Vec<Arc<str>>,
}

impl RestrictionRules {
    /// Empty rule set; denies nothing.
    pub fn new() -> Self {
        RestrictionRules::default()
    }

    /// Denies an exact registered type name.
    pub fn deny_type(mut self, name: impl Into<Arc<str>>) -> Self {
        self.denied_types.push(name.into());
        self
    }

    /// Denies a package prefix. A type named `acme.billing.Invoice` is
    /// covered by `acme.billing` and by `acme`, never by `acme.bill`.
    pub fn deny_package(mut self, name: impl Into<Arc<str>>) -> Self {
        self.denied_packages.push(name.into());
        self
    }

    /// Denies a member name on every type.
    pub fn deny_member(mut self, name: impl Into<Arc<str>>) -> Self {
        self.denied_members.push(name.into());
        self
    }

    /// Whether a member name is denied.
    pub fn denies_member(&self, member: &str) -> bool {
        self.denied_members.iter().any(|m| m.as_ref() == member)
    }

    /// Whether a type name is denied, by exact name or package prefix.
    pub fn denies_type_name(&self, name: &str) -> bool {
        if self.denied_types.iter().any(|t| t.as_ref() == name) {
            return true;
        }
        self.denied_packages.iter().any(|pkg| {
            name.strip_prefix(pkg.as_ref())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }

    /// Whether a descriptor or any of its ancestors is denied. Denying a
    /// supertype closes off every subtype reachable through it.
    pub fn denies_descriptor(&self, desc: &Arc<TypeDescriptor>) -> bool {
        if self.denies_type_name(desc.name()) {
            return true;
        }
        if let Some(parent) = desc.extends() {
            if self.denies_descriptor(parent) {
                return true;
            }
        }
        desc.interfaces().iter().any(|i| self.denies_descriptor(i))
    }

    fn is_empty(&self) -> bool {
        self.denied_types.is_empty()
            && self.denied_packages.is_empty()
            && self.denied_members.is_empty()
    }
}

/// Screens references against deny lists before delegating.
pub struct RestrictedIntrospector {
    inner: Arc<dyn Introspect>,
    rules: RestrictionRules,
    sink: Arc<dyn EventSink>,
}

impl RestrictedIntrospector {
    /// Wraps `inner` with the given rules, reporting denials to `sink`.
    pub fn new(inner: Arc<dyn Introspect>, rules: RestrictionRules, sink: Arc<dyn EventSink>) -> Self {
        RestrictedIntrospector { inner, rules, sink }
    }

    /// Checks a reference and reports exactly one event if it is denied.
    fn denies(&self, target: &Value, member: Option<&str>, location: &SourceLocation) -> bool {
        if self.rules.is_empty() {
            return false;
        }
        let denied = match member {
            Some(member) if self.rules.denies_member(member) => true,
            _ => match target {
                Value::Object(obj) => self.rules.denies_descriptor(obj.descriptor()),
                other => self.rules.denies_type_name(&other.type_name()),
            },
        };
        if denied {
            self.sink.emit(&IntrospectEvent::AccessDenied {
                type_name: target.type_name(),
                member: member.map(Arc::from),
                location: location.clone(),
            });
        }
        denied
    }
}

impl Introspect for RestrictedIntrospector {
    fn resolve_method(
        &self,
        target: &Value,
        name: &str,
        args: &[Value],
        location: &SourceLocation,
    ) -> Result<Option<MethodHandle>, ResolveError> {
        if self.denies(target, Some(name), location) {
            return Ok(None);
        }
        self.inner.resolve_method(target, name, args, location)
    }

    fn resolve_property_get(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertyGetHandle>, ResolveError> {
        if self.denies(target, Some(identifier), location) {
            return Ok(None);
        }
        self.inner.resolve_property_get(target, identifier, location)
    }

    fn resolve_property_set(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertySetHandle>, ResolveError> {
        if self.denies(target, Some(identifier), location) {
            return Ok(None);
        }
        self.inner.resolve_property_set(target, identifier, location)
    }

    fn resolve_iterator(
        &self,
        target: &Value,
        location: &SourceLocation,
    ) -> Result<Option<ValueIter>, ResolveError> {
        if self.denies(target, None, location) {
            return Ok(None);
        }
        self.inner.resolve_iterator(target, location)
    }
}

/// Reports references to deprecated members after delegating. Results pass
/// through unchanged.
pub struct DeprecationIntrospector {
    inner: Arc<dyn Introspect>,
    sink: Arc<dyn EventSink>,
}

impl DeprecationIntrospector {
    /// Wraps `inner`, reporting deprecated references to `sink`.
    pub fn new(inner: Arc<dyn Introspect>, sink: Arc<dyn EventSink>) -> Self {
        DeprecationIntrospector { inner, sink }
    }

    fn report(
        &self,
        target: &Value,
        member: &str,
        flags: MemberFlags,
        location: &SourceLocation,
    ) {
        if flags.contains(MemberFlags::DEPRECATED) {
            self.sink.emit(&IntrospectEvent::DeprecatedMember {
                type_name: target.type_name(),
                member: Arc::from(member),
                location: location.clone(),
            });
        }
    }
}

impl Introspect for DeprecationIntrospector {
    fn resolve_method(
        &self,
        target: &Value,
        name: &str,
        args: &[Value],
        location: &SourceLocation,
    ) -> Result<Option<MethodHandle>, ResolveError> {
        let resolved = self.inner.resolve_method(target, name, args, location)?;
        if let Some(handle) = &resolved {
            self.report(target, handle.name(), handle.member_flags(), location);
        }
        Ok(resolved)
    }

    fn resolve_property_get(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertyGetHandle>, ResolveError> {
        let resolved = self.inner.resolve_property_get(target, identifier, location)?;
        if let Some(handle) = &resolved {
            self.report(target, handle.name(), handle.member_flags(), location);
        }
        Ok(resolved)
    }

    fn resolve_property_set(
        &self,
        target: &Value,
        identifier: &str,
        location: &SourceLocation,
    ) -> Result<Option<PropertySetHandle>, ResolveError> {
        let resolved = self.inner.resolve_property_set(target, identifier, location)?;
        if let Some(handle) = &resolved {
            self.report(target, handle.name(), handle.member_flags(), location);
        }
        Ok(resolved)
    }

    fn resolve_iterator(
        &self,
        target: &Value,
        location: &SourceLocation,
    ) -> Result<Option<ValueIter>, ResolveError> {
        self.inner.resolve_iterator(target, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::descriptor::DescriptorBuilder;
    use crate::events::RecordingSink;

    #[test]
    fn test_package_prefix_matches_whole_segments() {
        let rules = RestrictionRules::new().deny_package("acme.internal");
        assert!(rules.denies_type_name("acme.internal"));
        assert!(rules.denies_type_name("acme.internal.Tool"));
        assert!(!rules.denies_type_name("acme.internals.Tool"));
        assert!(!rules.denies_type_name("acme"));
    }

    #[test]
    fn test_member_denial_matches_exact_names() {
        let rules = RestrictionRules::new().deny_member("shutdown");
        assert!(rules.denies_member("shutdown"));
        assert!(!rules.denies_member("shutdownAll"));
    }

    #[test]
    fn test_denying_a_supertype_covers_descendants() {
        let base = DescriptorBuilder::new("Base").build();
        let widget = DescriptorBuilder::new("Widget").extends(base).build();
        let store = DescriptorBuilder::new("Store").build();
        let vec_store = DescriptorBuilder::new("VecStore")
            .implements(store)
            .build();
        let plain = DescriptorBuilder::new("Plain").build();

        let rules = RestrictionRules::new().deny_type("Base").deny_type("Store");
        assert!(rules.denies_descriptor(&widget));
        assert!(rules.denies_descriptor(&vec_store));
        assert!(!rules.denies_descriptor(&plain));
    }

    /// Inner facade that fails the test if a denied reference leaks through.
    struct NoCalls;

    impl Introspect for NoCalls {
        fn resolve_method(
            &self,
            _: &Value,
            _: &str,
            _: &[Value],
            _: &SourceLocation,
        ) -> Result<Option<MethodHandle>, ResolveError> {
            panic!("denied reference reached the inner facade");
        }

        fn resolve_property_get(
            &self,
            _: &Value,
            _: &str,
            _: &SourceLocation,
        ) -> Result<Option<PropertyGetHandle>, ResolveError> {
            panic!("denied reference reached the inner facade");
        }

        fn resolve_property_set(
            &self,
            _: &Value,
            _: &str,
            _: &SourceLocation,
        ) -> Result<Option<PropertySetHandle>, ResolveError> {
            panic!("denied reference reached the inner facade");
        }

        fn resolve_iterator(
            &self,
            _: &Value,
            _: &SourceLocation,
        ) -> Result<Option<ValueIter>, ResolveError> {
            panic!("denied reference reached the inner facade");
        }
    }

    #[test]
    fn test_denied_references_short_circuit_with_one_event_each() {
        let sink = Arc::new(RecordingSink::new());
        let rules = RestrictionRules::new()
            .deny_member("purge")
            .deny_type("list");
        let facade = RestrictedIntrospector::new(Arc::new(NoCalls), rules, sink.clone());
        let loc = SourceLocation::unknown();

        assert!(facade
            .resolve_method(&Value::I32(1), "purge", &[], &loc)
            .unwrap()
            .is_none());
        assert!(facade
            .resolve_property_set(&Value::I32(1), "purge", &loc)
            .unwrap()
            .is_none());
        assert!(facade
            .resolve_iterator(&Value::list(vec![]), &loc)
            .unwrap()
            .is_none());

        let events = sink.snapshot();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            IntrospectEvent::AccessDenied { member: Some(m), .. } if m.as_ref() == "purge"
        ));
        assert!(matches!(
            &events[2],
            IntrospectEvent::AccessDenied { member: None, .. }
        ));
    }
}
