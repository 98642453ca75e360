//! Extension records and their property payloads.
//!
//! # Responsibility
//! - Define the raw declaration a plugin ships (`ExtensionDeclaration`).
//! - Define the aggregated, immutable record the registry hands out
//!   (`Extension`).
//!
//! # Invariants
//! - An `Extension` always carries a known `ExtensionKind`; raw tags only live
//!   on declarations.
//! - Deferred properties are resolved only by the resolver, never implicitly.

use crate::extension::deferred::{DeferredField, LoadResult};
use crate::extension::flags::ExtensionFlags;
use crate::extension::kind::ExtensionKind;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

/// One property value: available now or produced by a loader.
#[derive(Debug, Clone)]
pub enum Property {
    Immediate(Value),
    Deferred(DeferredField),
}

impl Property {
    pub fn as_immediate(&self) -> Option<&Value> {
        match self {
            Self::Immediate(value) => Some(value),
            Self::Deferred(_) => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&DeferredField> {
        match self {
            Self::Immediate(_) => None,
            Self::Deferred(field) => Some(field),
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Self::Immediate(value)
    }
}

impl From<DeferredField> for Property {
    fn from(field: DeferredField) -> Self {
        Self::Deferred(field)
    }
}

/// Named property payload of one extension.
pub type Properties = BTreeMap<String, Property>;

/// Extension as declared by a plugin, before aggregation.
///
/// `type_tag` is kept as a raw string: declarations may carry tags this build
/// does not know, which the registry rejects.
///
/// Clones share the memoization slots of their deferred fields until they are
/// loaded into a registry. Each admitted extension gets its own slots, so a
/// declaration registered twice loads each deferred field once per extension.
#[derive(Debug, Clone)]
pub struct ExtensionDeclaration {
    pub type_tag: String,
    pub properties: Properties,
    pub flags: ExtensionFlags,
}

impl ExtensionDeclaration {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            properties: Properties::new(),
            flags: ExtensionFlags::default(),
        }
    }

    pub fn of_kind(kind: ExtensionKind) -> Self {
        Self::new(kind.as_str())
    }

    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), Property::Immediate(value));
        self
    }

    pub fn with_deferred<F, Fut>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LoadResult> + Send + 'static,
    {
        self.properties
            .insert(name.into(), Property::Deferred(DeferredField::new(loader)));
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_flags(mut self, flags: ExtensionFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// Aggregated extension record. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Extension {
    kind: ExtensionKind,
    plugin: Arc<str>,
    properties: Arc<Properties>,
    flags: ExtensionFlags,
}

impl Extension {
    pub fn builder(kind: ExtensionKind, plugin: &str) -> ExtensionBuilder {
        ExtensionBuilder {
            kind,
            plugin: Arc::from(plugin),
            properties: Properties::new(),
            flags: ExtensionFlags::default(),
        }
    }

    pub(crate) fn from_declaration(
        kind: ExtensionKind,
        plugin: Arc<str>,
        declaration: ExtensionDeclaration,
    ) -> Self {
        Self {
            kind,
            plugin,
            properties: Arc::new(detach_deferred(declaration.properties)),
            flags: declaration.flags.sanitized(),
        }
    }

    pub fn kind(&self) -> ExtensionKind {
        self.kind
    }

    /// Name of the plugin that contributed this extension.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn flags(&self) -> &ExtensionFlags {
        &self.flags
    }

    /// Looks up an immediate value by dotted path, e.g. `componentProps.href`.
    ///
    /// The first segment names the property; later segments walk into JSON
    /// objects. Deferred properties yield `None`.
    pub fn value_at(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let root = self.properties.get(segments.next()?)?.as_immediate()?;
        segments.try_fold(root, |value, segment| value.get(segment))
    }

    /// The `properties.id` string, when present.
    pub fn id(&self) -> Option<&str> {
        self.value_at("id").and_then(Value::as_str)
    }

    pub fn has_deferred(&self) -> bool {
        self.properties.values().any(Property::is_deferred)
    }
}

fn detach_deferred(properties: Properties) -> Properties {
    properties
        .into_iter()
        .map(|(name, property)| match property {
            Property::Deferred(field) => (name, Property::Deferred(field.detached())),
            immediate => (name, immediate),
        })
        .collect()
}

/// Builder for extensions constructed directly by the host.
#[derive(Debug)]
pub struct ExtensionBuilder {
    kind: ExtensionKind,
    plugin: Arc<str>,
    properties: Properties,
    flags: ExtensionFlags,
}

impl ExtensionBuilder {
    pub fn value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.properties.insert(name.into(), Property::Immediate(value));
        self
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn flags(mut self, flags: ExtensionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(self) -> Extension {
        Extension {
            kind: self.kind,
            plugin: self.plugin,
            properties: Arc::new(self.properties),
            flags: self.flags.sanitized(),
        }
    }
}
