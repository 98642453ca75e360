//! Explicit payload validation per extension kind.
//!
//! # Responsibility
//! - Declare which property paths each kind requires and their shapes.
//! - Check an aggregated extension against those requirements on request.
//!
//! # Invariants
//! - Predicates never call into this module; tag matching stays shallow.
//! - Deferred requirements only apply to top-level properties.

use crate::extension::kind::ExtensionKind;
use crate::extension::model::{Extension, Property};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// How the registry treats payloads at aggregation time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationPolicy {
    /// Accept any payload whose tag is known.
    #[default]
    Lenient,
    /// Skip extensions that fail `validate`.
    Strict,
}

/// Expected shape of one required property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    String,
    Number,
    Bool,
    Object,
    /// A string or an array of strings (route paths).
    StringOrList,
    /// A deferred loader.
    Deferred,
    /// Present with any immediate value, or deferred.
    Any,
}

impl Shape {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::StringOrList => "string or string list",
            Self::Deferred => "deferred loader",
            Self::Any => "any value",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::StringOrList => {
                value.is_string()
                    || value
                        .as_array()
                        .is_some_and(|items| items.iter().all(Value::is_string))
            }
            Self::Deferred => false,
            Self::Any => !value.is_null(),
        }
    }
}

/// One required property path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub path: &'static str,
    pub shape: Shape,
}

const fn require(path: &'static str, shape: Shape) -> Requirement {
    Requirement { path, shape }
}

const NAV_HREF: &[Requirement] = &[
    require("section", Shape::String),
    require("componentProps.name", Shape::String),
    require("componentProps.href", Shape::String),
];
const NAV_RESOURCE: &[Requirement] = &[
    require("section", Shape::String),
    require("componentProps.name", Shape::String),
    require("componentProps.resource", Shape::String),
];
const FEATURE_FLAG_MODEL: &[Requirement] = &[
    require("model", Shape::Object),
    require("flag", Shape::String),
];
const FEATURE_FLAG_CUSTOM: &[Requirement] = &[require("detect", Shape::Deferred)];
const MODEL_DEFINITION: &[Requirement] = &[require("models", Shape::Any)];
const REDUX_REDUCER: &[Requirement] = &[
    require("namespace", Shape::String),
    require("reducer", Shape::Deferred),
];
const CONTEXT_PROVIDER: &[Requirement] = &[
    require("provider", Shape::Deferred),
    require("useValueHook", Shape::Deferred),
];
const ROUTE_PAGE: &[Requirement] = &[
    require("path", Shape::StringOrList),
    require("loader", Shape::Deferred),
];
const RESOURCE_PAGE: &[Requirement] = &[
    require("model", Shape::Object),
    require("loader", Shape::Deferred),
];
const RESOURCE_TAB_PAGE: &[Requirement] = &[
    require("model", Shape::Object),
    require("href", Shape::String),
    require("name", Shape::String),
    require("loader", Shape::Deferred),
];
const DASHBOARDS_TAB: &[Requirement] = &[
    require("id", Shape::String),
    require("title", Shape::String),
];
const DASHBOARDS_CARD: &[Requirement] = &[
    require("tab", Shape::String),
    require("position", Shape::String),
    require("loader", Shape::Deferred),
];
const ACTIVITY_RESOURCE: &[Requirement] = &[
    require("k8sResource", Shape::Object),
    require("loader", Shape::Deferred),
];
const OVERVIEW_CRD: &[Requirement] = &[require("resources", Shape::Object)];
const HORIZONTAL_NAV_TAB: &[Requirement] = &[
    require("model", Shape::Object),
    require("page", Shape::Object),
    require("loader", Shape::Deferred),
];
const ALERT_ACTION: &[Requirement] = &[
    require("alert", Shape::String),
    require("text", Shape::String),
    require("action", Shape::Deferred),
];
const TOPOLOGY_COMPONENT_FACTORY: &[Requirement] = &[require("factory", Shape::Deferred)];
const TOPOLOGY_DATA_MODEL_FACTORY: &[Requirement] = &[
    require("id", Shape::String),
    require("priority", Shape::Number),
];
const TOPOLOGY_DISPLAY_FILTERS: &[Requirement] = &[
    require("getTopologyFilters", Shape::Deferred),
    require("applyDisplayOptions", Shape::Deferred),
];
const TOPOLOGY_CREATE_CONNECTOR: &[Requirement] = &[require("getCreateConnector", Shape::Deferred)];
const PVC_CREATE_PROP: &[Requirement] = &[
    require("label", Shape::String),
    require("path", Shape::String),
];
const PVC_STATUS: &[Requirement] = &[
    require("loader", Shape::Deferred),
    require("priority", Shape::Number),
];
const PVC_ALERT: &[Requirement] = &[require("loader", Shape::Deferred)];
const PVC_DELETE: &[Requirement] = &[require("onPVCKill", Shape::Deferred)];
const YAML_TEMPLATE: &[Requirement] = &[
    require("model", Shape::Object),
    require("template", Shape::String),
];
const ADD_ACTION: &[Requirement] = &[
    require("id", Shape::String),
    require("label", Shape::String),
    require("href", Shape::String),
];
const CLUSTER_GLOBAL_CONFIG: &[Requirement] = &[
    require("id", Shape::String),
    require("kind", Shape::String),
    require("model", Shape::Object),
];
const STORAGE_CLASS_PROVISIONER: &[Requirement] = &[require("CSI", Shape::Object)];

/// Requirements for one kind. Kinds without a payload contract return `&[]`.
pub fn requirements(kind: ExtensionKind) -> &'static [Requirement] {
    match kind {
        ExtensionKind::FeatureFlagModel => FEATURE_FLAG_MODEL,
        ExtensionKind::FeatureFlagCustom => FEATURE_FLAG_CUSTOM,
        ExtensionKind::ModelDefinition => MODEL_DEFINITION,
        ExtensionKind::ReduxReducer => REDUX_REDUCER,
        ExtensionKind::ContextProvider => CONTEXT_PROVIDER,
        ExtensionKind::RoutePage | ExtensionKind::StandaloneRoutePage => ROUTE_PAGE,
        ExtensionKind::ResourceListPage | ExtensionKind::ResourceDetailsPage => RESOURCE_PAGE,
        ExtensionKind::ResourceTabPage => RESOURCE_TAB_PAGE,
        ExtensionKind::HrefNavItem => NAV_HREF,
        ExtensionKind::ResourceNsNavItem | ExtensionKind::ResourceClusterNavItem => NAV_RESOURCE,
        ExtensionKind::NavSeparator => &[],
        ExtensionKind::DashboardsTab => DASHBOARDS_TAB,
        ExtensionKind::DashboardsCard => DASHBOARDS_CARD,
        ExtensionKind::DashboardsActivityResource => ACTIVITY_RESOURCE,
        ExtensionKind::OverviewCrd => OVERVIEW_CRD,
        ExtensionKind::HorizontalNavTab => HORIZONTAL_NAV_TAB,
        ExtensionKind::AlertAction => ALERT_ACTION,
        ExtensionKind::TopologyComponentFactory => TOPOLOGY_COMPONENT_FACTORY,
        ExtensionKind::TopologyDataModelFactory => TOPOLOGY_DATA_MODEL_FACTORY,
        ExtensionKind::TopologyDisplayFilters => TOPOLOGY_DISPLAY_FILTERS,
        ExtensionKind::TopologyCreateConnector => TOPOLOGY_CREATE_CONNECTOR,
        ExtensionKind::PvcCreateProp => PVC_CREATE_PROP,
        ExtensionKind::PvcStatus => PVC_STATUS,
        ExtensionKind::PvcAlert => PVC_ALERT,
        ExtensionKind::PvcDelete => PVC_DELETE,
        ExtensionKind::YamlTemplate => YAML_TEMPLATE,
        ExtensionKind::AddAction => ADD_ACTION,
        ExtensionKind::ClusterGlobalConfig => CLUSTER_GLOBAL_CONFIG,
        ExtensionKind::StorageClassProvisioner => STORAGE_CLASS_PROVISIONER,
    }
}

/// Payload validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("{kind} is missing required property `{path}`")]
    Missing {
        kind: ExtensionKind,
        path: &'static str,
    },
    #[error("{kind} property `{path}` must be a {expected}")]
    WrongShape {
        kind: ExtensionKind,
        path: &'static str,
        expected: &'static str,
    },
}

/// Checks every requirement of the extension's kind, reporting the first
/// violation in declaration order.
pub fn validate(extension: &Extension) -> Result<(), PayloadError> {
    let kind = extension.kind();
    for requirement in requirements(kind) {
        check(extension, kind, requirement)?;
    }
    Ok(())
}

fn check(
    extension: &Extension,
    kind: ExtensionKind,
    requirement: &Requirement,
) -> Result<(), PayloadError> {
    let Requirement { path, shape } = *requirement;
    let wrong_shape = PayloadError::WrongShape {
        kind,
        path,
        expected: shape.as_str(),
    };

    let root = path.split('.').next().unwrap_or(path);
    match extension.property(root) {
        None => Err(PayloadError::Missing { kind, path }),
        Some(Property::Deferred(_)) if root == path => match shape {
            Shape::Deferred | Shape::Any => Ok(()),
            _ => Err(wrong_shape),
        },
        Some(Property::Deferred(_)) => Err(wrong_shape),
        Some(Property::Immediate(_)) => match extension.value_at(path) {
            None | Some(Value::Null) => Err(PayloadError::Missing { kind, path }),
            Some(value) if shape.accepts(value) => Ok(()),
            Some(_) => Err(wrong_shape),
        },
    }
}
