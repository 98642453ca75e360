//! Extension registry.
//!
//! # Responsibility
//! - Aggregate plugin declarations into one immutable, ordered snapshot.
//! - Answer synchronous predicate queries over that snapshot.
//!
//! # Invariants
//! - Plugin order, then declaration order, is preserved.
//! - Only extensions with a known kind enter the snapshot.
//! - `load` replaces the previous snapshot; it never appends.
//! - Consumers cannot mutate a snapshot once it is published.

mod resolve;

pub use resolve::{ResolveFailure, ResolveOutcome, ResolvedExtension};

use crate::config::RegistryConfig;
use crate::extension::flags::FlagSnapshot;
use crate::extension::kind::ExtensionKind;
use crate::extension::model::Extension;
use crate::extension::validate::{validate, PayloadError, ValidationPolicy};
use crate::plugin::Plugin;
use log::{info, warn};
use std::sync::Arc;

/// Why one declaration did not enter the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    UnknownExtensionType(String),
    InvalidPayload(PayloadError),
    Disabled(String),
}

/// One declaration dropped during `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedExtension {
    pub plugin: String,
    /// Position within the plugin's declaration list.
    pub index: usize,
    pub reason: SkipReason,
}

/// Summary of one `load` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub plugins: usize,
    pub loaded: usize,
    pub skipped: Vec<SkippedExtension>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Process-scoped extension registry. Construct one per host (or per test)
/// and hand it to consumers by reference.
#[derive(Debug, Clone)]
pub struct ExtensionRegistry {
    config: RegistryConfig,
    extensions: Arc<[Extension]>,
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            extensions: Arc::from(Vec::new()),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Aggregates all plugins, replacing any previously loaded snapshot.
    ///
    /// Declarations that cannot be registered are skipped and reported; they
    /// never abort aggregation of the remaining declarations.
    pub fn load(&mut self, plugins: impl IntoIterator<Item = Plugin>) -> LoadReport {
        let mut report = LoadReport::default();
        let mut aggregated = Vec::new();

        for plugin in plugins {
            report.plugins += 1;
            let (name, declarations) = plugin.into_parts();
            let plugin_name: Arc<str> = Arc::from(name.as_str());

            for (index, declaration) in declarations.into_iter().enumerate() {
                let Some(kind) = ExtensionKind::from_tag(&declaration.type_tag) else {
                    warn!(
                        "event=extension_skipped module=registry status=warn plugin={} index={} reason=unknown_type type={}",
                        name, index, declaration.type_tag
                    );
                    report.skipped.push(SkippedExtension {
                        plugin: name.clone(),
                        index,
                        reason: SkipReason::UnknownExtensionType(declaration.type_tag),
                    });
                    continue;
                };

                let extension =
                    Extension::from_declaration(kind, Arc::clone(&plugin_name), declaration);
                if let Some(reason) = self.admission_check(&extension) {
                    warn!(
                        "event=extension_skipped module=registry status=warn plugin={} index={} type={} reason={:?}",
                        name, index, kind, reason
                    );
                    report.skipped.push(SkippedExtension {
                        plugin: name.clone(),
                        index,
                        reason,
                    });
                    continue;
                }
                aggregated.push(extension);
            }
        }

        report.loaded = aggregated.len();
        if !self.extensions.is_empty() {
            info!(
                "event=registry_replaced module=registry status=ok previous={}",
                self.extensions.len()
            );
        }
        self.extensions = Arc::from(aggregated);
        info!(
            "event=registry_load module=registry status=ok plugins={} extensions={} skipped={}",
            report.plugins,
            report.loaded,
            report.skipped.len()
        );
        report
    }

    fn admission_check(&self, extension: &Extension) -> Option<SkipReason> {
        if let Some(id) = extension.id() {
            if self.config.is_disabled(id) {
                return Some(SkipReason::Disabled(id.to_string()));
            }
        }
        if self.config.validation == ValidationPolicy::Strict {
            if let Err(err) = validate(extension) {
                return Some(SkipReason::InvalidPayload(err));
            }
        }
        None
    }

    /// Full immutable snapshot in registry order.
    pub fn all(&self) -> Arc<[Extension]> {
        Arc::clone(&self.extensions)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Extensions matching `predicate`, in registry order.
    pub fn query<P>(&self, predicate: P) -> Vec<&Extension>
    where
        P: Fn(&Extension) -> bool,
    {
        self.extensions
            .iter()
            .filter(|&extension| predicate(extension))
            .collect()
    }

    /// Like `query`, additionally dropping extensions gated off by `flags`.
    pub fn query_in_use<P>(&self, predicate: P, flags: &FlagSnapshot) -> Vec<&Extension>
    where
        P: Fn(&Extension) -> bool,
    {
        self.extensions
            .iter()
            .filter(|&extension| predicate(extension) && extension.flags().is_in_use(flags))
            .collect()
    }

    /// Extensions contributed by one plugin, in declaration order.
    pub fn by_plugin(&self, plugin: &str) -> Vec<&Extension> {
        self.query(|extension| extension.plugin() == plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtensionRegistry, SkipReason};
    use crate::config::RegistryConfig;
    use crate::extension::flags::{ExtensionFlags, FlagSnapshot};
    use crate::extension::kind::{is_add_action, is_nav_item, ExtensionKind};
    use crate::extension::model::ExtensionDeclaration;
    use crate::plugin::Plugin;
    use serde_json::json;

    fn add_action(id: &str) -> ExtensionDeclaration {
        ExtensionDeclaration::of_kind(ExtensionKind::AddAction)
            .with_value("id", json!(id))
            .with_value("label", json!(id))
            .with_value("href", json!(format!("/add/{id}")))
    }

    #[test]
    fn disabled_ids_are_skipped_and_reported() {
        let mut registry =
            ExtensionRegistry::with_config(RegistryConfig::default().disable("deploy-image"));
        let report = registry.load([Plugin::with_extensions(
            "dev-console",
            [add_action("import-from-git"), add_action("deploy-image")],
        )]);

        assert_eq!(report.loaded, 1);
        assert_eq!(
            report.skipped[0].reason,
            SkipReason::Disabled("deploy-image".to_string())
        );
        let ids: Vec<_> = registry
            .query(is_add_action)
            .into_iter()
            .filter_map(|extension| extension.id())
            .collect();
        assert_eq!(ids, vec!["import-from-git"]);
    }

    #[test]
    fn strict_policy_skips_invalid_payloads() {
        let broken = ExtensionDeclaration::of_kind(ExtensionKind::HrefNavItem)
            .with_value("section", json!("Home"));
        let separator = ExtensionDeclaration::of_kind(ExtensionKind::NavSeparator);

        let mut lenient = ExtensionRegistry::new();
        lenient.load([Plugin::with_extensions(
            "kubevirt",
            [broken.clone(), separator.clone()],
        )]);
        assert_eq!(lenient.query(is_nav_item).len(), 2);

        let mut strict = ExtensionRegistry::with_config(RegistryConfig::strict());
        let report = strict.load([Plugin::with_extensions("kubevirt", [broken, separator])]);
        assert_eq!(strict.query(is_nav_item).len(), 1);
        assert!(matches!(
            report.skipped[0].reason,
            SkipReason::InvalidPayload(_)
        ));
        assert_eq!(report.skipped[0].index, 0);
    }

    #[test]
    fn query_in_use_applies_flag_gate() {
        let gated = add_action("deploy-image").with_flags(ExtensionFlags::new(
            ["OPENSHIFT"],
            Vec::<String>::new(),
        ));
        let mut registry = ExtensionRegistry::new();
        registry.load([Plugin::with_extensions(
            "dev-console",
            [add_action("import-from-git"), gated],
        )]);

        let off = FlagSnapshot::new().with("OPENSHIFT", false);
        assert_eq!(registry.query_in_use(is_add_action, &off).len(), 1);

        let on = FlagSnapshot::new().with("OPENSHIFT", true);
        assert_eq!(registry.query_in_use(is_add_action, &on).len(), 2);
    }

    #[test]
    fn snapshot_survives_reload() {
        let mut registry = ExtensionRegistry::new();
        registry.load([Plugin::with_extensions("a", [add_action("one")])]);
        let before = registry.all();

        registry.load([Plugin::with_extensions("b", [add_action("two")])]);
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].plugin(), "a");
        assert_eq!(registry.all()[0].plugin(), "b");
        assert_eq!(registry.by_plugin("a").len(), 0);
    }
}
