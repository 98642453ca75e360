//! Batch resolution of deferred extension fields.
//!
//! # Invariants
//! - Every matched extension resolves concurrently; one failure never blocks
//!   the others.
//! - Output order is registry order, independent of settlement order.
//! - The returned future completes only after every triggered load settled.

use super::ExtensionRegistry;
use crate::extension::deferred::LoadError;
use crate::extension::flags::ExtensionFlags;
use crate::extension::kind::ExtensionKind;
use crate::extension::model::{Extension, Property};
use futures::future::join_all;
use log::{debug, warn};
use serde_json::Value;
use std::collections::BTreeMap;

/// Extension whose deferred fields have all been replaced by their values.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedExtension {
    pub kind: ExtensionKind,
    pub plugin: String,
    pub properties: BTreeMap<String, Value>,
    /// Gate of the source extension, for callers that re-check flags later.
    pub flags: ExtensionFlags,
}

impl ResolvedExtension {
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

/// Extension excluded from a resolved batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveFailure {
    pub kind: ExtensionKind,
    pub plugin: String,
    /// Position of the extension within the matched set.
    pub position: usize,
    /// First failing property, in property order.
    pub property: String,
    pub error: LoadError,
}

/// Result of `ExtensionRegistry::query_resolved`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOutcome {
    pub resolved: Vec<ResolvedExtension>,
    pub failures: Vec<ResolveFailure>,
}

impl ResolveOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl ExtensionRegistry {
    /// Queries like `query`, then loads every deferred field of the matched
    /// extensions.
    ///
    /// Extensions with a failing loader are reported in `failures` and left
    /// out of `resolved`. Dropping the returned future discards its results;
    /// loads already started stay attached to their fields.
    pub async fn query_resolved<P>(&self, predicate: P) -> ResolveOutcome
    where
        P: Fn(&Extension) -> bool,
    {
        let matched = self.query(predicate);
        let settled = join_all(
            matched
                .iter()
                .enumerate()
                .map(|(position, extension)| resolve_extension(position, extension)),
        )
        .await;

        let mut outcome = ResolveOutcome::default();
        for result in settled {
            match result {
                Ok(resolved) => outcome.resolved.push(resolved),
                Err(failure) => {
                    warn!(
                        "event=extension_resolve_failed module=resolver status=warn plugin={} type={} property={} error={}",
                        failure.plugin, failure.kind, failure.property, failure.error
                    );
                    outcome.failures.push(failure);
                }
            }
        }
        debug!(
            "event=query_resolved module=resolver status=ok matched={} resolved={} failed={}",
            matched.len(),
            outcome.resolved.len(),
            outcome.failures.len()
        );
        outcome
    }
}

async fn resolve_extension(
    position: usize,
    extension: &Extension,
) -> Result<ResolvedExtension, ResolveFailure> {
    let fields = join_all(
        extension
            .properties()
            .iter()
            .map(|(name, property)| async move {
                let value = match property {
                    Property::Immediate(value) => Ok(value.clone()),
                    Property::Deferred(field) => field.load().await,
                };
                (name, value)
            }),
    )
    .await;

    let mut properties = BTreeMap::new();
    for (name, value) in fields {
        match value {
            Ok(value) => {
                properties.insert(name.clone(), value);
            }
            Err(error) => {
                return Err(ResolveFailure {
                    kind: extension.kind(),
                    plugin: extension.plugin().to_string(),
                    position,
                    property: name.clone(),
                    error,
                });
            }
        }
    }

    Ok(ResolvedExtension {
        kind: extension.kind(),
        plugin: extension.plugin().to_string(),
        properties,
        flags: extension.flags().clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::extension::deferred::LoadError;
    use crate::extension::flags::{ExtensionFlags, FlagSnapshot};
    use crate::extension::kind::{is_dashboards_card, ExtensionKind};
    use crate::extension::model::ExtensionDeclaration;
    use crate::plugin::Plugin;
    use crate::registry::ExtensionRegistry;
    use futures::executor::block_on;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn immediate_only_extensions_resolve_unchanged() {
        let mut registry = ExtensionRegistry::new();
        registry.load([Plugin::with_extensions(
            "ceph",
            [ExtensionDeclaration::of_kind(ExtensionKind::DashboardsCard)
                .with_value("tab", json!("persistent-storage"))],
        )]);

        let outcome = block_on(registry.query_resolved(is_dashboards_card));
        assert!(outcome.is_complete());
        assert_eq!(
            outcome.resolved[0].property("tab"),
            Some(&json!("persistent-storage"))
        );
    }

    #[test]
    fn failure_names_first_failing_property() {
        let mut registry = ExtensionRegistry::new();
        registry.load([Plugin::with_extensions(
            "ceph",
            [ExtensionDeclaration::of_kind(ExtensionKind::DashboardsCard)
                .with_deferred("loader", || async { Err(LoadError::new("chunk failed")) })
                .with_deferred("z-extra", || async { Ok(json!(1)) })],
        )]);

        let outcome = block_on(registry.query_resolved(is_dashboards_card));
        assert!(outcome.resolved.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].property, "loader");
        assert_eq!(outcome.failures[0].error.message(), "chunk failed");
        assert_eq!(outcome.failures[0].position, 0);
    }

    #[test]
    fn empty_match_set_resolves_to_empty_outcome() {
        let registry = ExtensionRegistry::new();
        let outcome = block_on(registry.query_resolved(is_dashboards_card));
        assert_eq!(outcome, super::ResolveOutcome::default());
    }

    #[test]
    fn resolved_extension_keeps_its_flag_gate() {
        let mut registry = ExtensionRegistry::new();
        registry.load([Plugin::with_extensions(
            "ceph",
            [ExtensionDeclaration::of_kind(ExtensionKind::DashboardsCard)
                .with_deferred("loader", || async { Ok(json!("card")) })
                .with_flags(ExtensionFlags::new(["CEPH", "CEPH"], ["MCG_STANDALONE"]))],
        )]);

        let outcome = block_on(registry.query_resolved(is_dashboards_card));
        let flags = &outcome.resolved[0].flags;
        assert_eq!(flags.required, vec!["CEPH"]);
        assert_eq!(flags.disallowed, vec!["MCG_STANDALONE"]);

        let snapshot = FlagSnapshot::new()
            .with("CEPH", true)
            .with("MCG_STANDALONE", false);
        assert!(flags.is_in_use(&snapshot));
        assert!(!flags.is_in_use(&FlagSnapshot::new()));
    }

    #[test]
    fn cloned_declaration_loads_once_per_extension() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let shared = ExtensionDeclaration::of_kind(ExtensionKind::DashboardsCard).with_deferred(
            "loader",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(json!("card")) }
            },
        );

        let mut registry = ExtensionRegistry::new();
        registry.load([
            Plugin::with_extensions("first", [shared.clone()]),
            Plugin::with_extensions("second", [shared]),
        ]);

        let outcome = block_on(registry.query_resolved(is_dashboards_card));
        assert_eq!(outcome.resolved.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        block_on(registry.query_resolved(is_dashboards_card));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
