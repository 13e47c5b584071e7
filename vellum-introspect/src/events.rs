//! Structured events emitted by the introspection core.
//!
//! The core never logs directly from resolution paths; it hands an
//! [`IntrospectEvent`] to the injected [`EventSink`]. The default sink
//! forwards to `tracing`, and tests install a [`RecordingSink`] to assert
//! exact emission counts (policy denials must emit exactly once per denied
//! attempt).

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::descriptor::TypeIdentity;

/// Position in the template that triggered a resolution, carried through
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Template name.
    pub template: Arc<str>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl SourceLocation {
    /// Location at a known template position.
    pub fn new(template: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        SourceLocation {
            template: template.into(),
            line,
            column,
        }
    }

    /// Placeholder for calls made outside template rendering.
    pub fn unknown() -> Self {
        SourceLocation {
            template: Arc::from("<unknown>"),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.template, self.line, self.column)
    }
}

/// One observable occurrence inside the core.
#[derive(Debug, Clone, PartialEq)]
pub enum IntrospectEvent {
    /// A member table was built for a type identity.
    TableRebuilt {
        /// Registered type name.
        type_name: Arc<str>,
        /// Identity the table is keyed under.
        identity: TypeIdentity,
    },
    /// A resolved member is marked deprecated.
    DeprecatedMember {
        /// Registered type name of the target.
        type_name: Arc<str>,
        /// The deprecated member's name.
        member: Arc<str>,
        /// Where the template referenced it.
        location: SourceLocation,
    },
    /// A restriction policy denied a resolution attempt.
    AccessDenied {
        /// Registered type name of the target.
        type_name: Arc<str>,
        /// Member that was requested, when the operation names one.
        member: Option<Arc<str>>,
        /// Where the template referenced it.
        location: SourceLocation,
    },
    /// A host-supplied iterator was passed through; it cannot be restarted
    /// if the template iterates it again.
    NonRestartableIterator {
        /// Registered type name of the target.
        type_name: Arc<str>,
        /// Where the template iterated it.
        location: SourceLocation,
    },
}

/// Receives core events. Implementations must be cheap and non-blocking;
/// resolution hot paths call straight into them.
pub trait EventSink: Send + Sync {
    /// Handles one event.
    fn emit(&self, event: &IntrospectEvent);
}

/// Default sink: forwards events to `tracing`. Table rebuilds log at debug,
/// everything else at warn.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &IntrospectEvent) {
        match event {
            IntrospectEvent::TableRebuilt { type_name, identity } => {
                debug!(type_name = %type_name, identity = %identity, "member table built");
            }
            IntrospectEvent::DeprecatedMember {
                type_name,
                member,
                location,
            } => {
                warn!(
                    type_name = %type_name,
                    member = %member,
                    location = %location,
                    "deprecated member referenced"
                );
            }
            IntrospectEvent::AccessDenied {
                type_name,
                member,
                location,
            } => {
                warn!(
                    type_name = %type_name,
                    member = member.as_deref().unwrap_or("<none>"),
                    location = %location,
                    "access denied by restriction policy"
                );
            }
            IntrospectEvent::NonRestartableIterator {
                type_name,
                location,
            } => {
                warn!(
                    type_name = %type_name,
                    location = %location,
                    "iterating a host iterator; it cannot be restarted"
                );
            }
        }
    }
}

/// Test sink that records every event in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<IntrospectEvent>>,
}

impl RecordingSink {
    /// New empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out the events recorded so far.
    pub fn snapshot(&self) -> Vec<IntrospectEvent> {
        self.events.lock().clone()
    }

    /// Drains and returns the recorded events.
    pub fn take(&self) -> Vec<IntrospectEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Number of recorded events matching the predicate.
    pub fn count_matching(&self, pred: impl Fn(&IntrospectEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &IntrospectEvent) {
        self.events.lock().push(event.clone());
    }
}
