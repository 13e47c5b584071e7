//! Facade configuration.
//!
//! Read once when an engine instance is assembled. The configuration
//! chooses the conversion registry flavor, lists the policy decorators to
//! stack around the base facade, and carries the restriction decorator's
//! deny lists:
//!
//! ```toml
//! conversion = "standard"
//! decorators = ["restrict", "deprecation"]
//!
//! [restrict]
//! denied_types = ["acme.io.FileTool"]
//! denied_packages = ["acme.internal"]
//! denied_members = ["shutdown"]
//! ```
//!
//! Decorators apply base-first, so the last entry becomes the outermost
//! link and sees every reference before the rest of the chain.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::context::ResolutionContext;
use crate::convert::ConversionRegistry;
use crate::events::EventSink;
use crate::facade::{
    DeprecationIntrospector, Introspect, Introspector, RestrictedIntrospector, RestrictionRules,
};

/// Errors raised while loading or applying configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}")]
    Io {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The text was not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The decorator list named something this build does not provide.
    #[error("unknown decorator {0:?} in configuration")]
    UnknownDecorator(String),
}

/// Which conversion registry the context is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Built-in and registered conversions participate in resolution.
    Standard,
    /// Conversions never apply; only strict and widening matches resolve.
    Disabled,
}

/// Deny lists for the `"restrict"` decorator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RestrictionConfig {
    /// Exact registered type names to deny.
    pub denied_types: Vec<String>,
    /// Package prefixes to deny, matched on segment boundaries.
    pub denied_packages: Vec<String>,
    /// Member names to deny on every type.
    pub denied_members: Vec<String>,
}

/// Facade configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrospectConfig {
    /// Conversion registry flavor.
    pub conversion: ConversionMode,
    /// Decorator identifiers, applied base-first.
    pub decorators: Vec<String>,
    /// Deny lists consumed when `decorators` includes `"restrict"`.
    pub restrict: RestrictionConfig,
}

impl Default for IntrospectConfig {
    fn default() -> Self {
        Self {
            conversion: ConversionMode::Standard,
            decorators: Vec::new(),
            restrict: RestrictionConfig::default(),
        }
    }
}

impl IntrospectConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    fn restriction_rules(&self) -> RestrictionRules {
        let mut rules = RestrictionRules::new();
        for name in &self.restrict.denied_types {
            rules = rules.deny_type(name.as_str());
        }
        for name in &self.restrict.denied_packages {
            rules = rules.deny_package(name.as_str());
        }
        for name in &self.restrict.denied_members {
            rules = rules.deny_member(name.as_str());
        }
        rules
    }
}

/// Builds the resolution context and decorator chain the configuration
/// describes. The context is returned alongside the facade so the caller
/// can keep registering host types after assembly.
pub fn build_introspector(
    config: &IntrospectConfig,
    sink: Arc<dyn EventSink>,
) -> Result<(Arc<ResolutionContext>, Arc<dyn Introspect>), ConfigError> {
    let conversions = match config.conversion {
        ConversionMode::Standard => ConversionRegistry::standard(),
        ConversionMode::Disabled => ConversionRegistry::disabled(),
    };
    let context = Arc::new(ResolutionContext::with_parts(conversions, sink.clone()));
    let mut chain: Arc<dyn Introspect> = Arc::new(Introspector::new(context.clone()));
    for decorator in &config.decorators {
        chain = match decorator.as_str() {
            "restrict" => Arc::new(RestrictedIntrospector::new(
                chain,
                config.restriction_rules(),
                sink.clone(),
            )),
            "deprecation" => Arc::new(DeprecationIntrospector::new(chain, sink.clone())),
            other => return Err(ConfigError::UnknownDecorator(other.to_string())),
        };
    }
    Ok((context, chain))
}
