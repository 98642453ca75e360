//! Extension registry core for the plugin console.
//! Plugins declare typed extensions; the registry aggregates them and consumers
//! query them by predicate, optionally resolving deferred fields.

pub mod config;
pub mod extension;
pub mod logging;
pub mod plugin;
pub mod registry;

pub use config::{ConfigError, RegistryConfig};
pub use extension::deferred::{DeferredField, LoadError, LoadResult, LoadState, LoaderHandle};
pub use extension::flags::{gating_flag_names, ExtensionFlags, FlagSnapshot};
pub use extension::kind::ExtensionKind;
pub use extension::model::{Extension, ExtensionBuilder, ExtensionDeclaration, Properties, Property};
pub use extension::validate::{validate, PayloadError, ValidationPolicy};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use plugin::manifest::{parse_extensions, parse_plugin, read_plugin, CodeRefTable, ManifestError};
pub use plugin::Plugin;
pub use registry::{
    ExtensionRegistry, LoadReport, ResolveFailure, ResolveOutcome, ResolvedExtension, SkipReason,
    SkippedExtension,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
