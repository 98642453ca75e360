//! Closed set of extension kinds and their type-guard predicates.
//!
//! # Responsibility
//! - Map every supported `type` tag to one `ExtensionKind` variant.
//! - Provide one predicate per kind plus group predicates for families.
//!
//! # Invariants
//! - Tags are unique; `from_tag(kind.as_str()) == Some(kind)` for every kind.
//! - Predicates check the tag only. Payload shape is never inspected here.

use crate::extension::model::Extension;
use std::fmt::{Display, Formatter};

macro_rules! extension_kinds {
    ($($variant:ident => $tag:literal, $predicate:ident;)+) => {
        /// Statically known extension discriminants.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ExtensionKind {
            $(
                #[doc = concat!("`", $tag, "`")]
                $variant,
            )+
        }

        impl ExtensionKind {
            /// Every supported kind, in declaration order.
            pub const ALL: &'static [ExtensionKind] = &[$(ExtensionKind::$variant,)+];

            /// Stable tag used in plugin declarations.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }

            /// Parses one declaration tag. Matching is exact and case-sensitive.
            pub fn from_tag(tag: &str) -> Option<Self> {
                match tag {
                    $($tag => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        $(
            #[doc = concat!("Returns `true` when the extension is tagged `", $tag, "`.")]
            pub fn $predicate(extension: &Extension) -> bool {
                extension.kind() == ExtensionKind::$variant
            }
        )+
    };
}

extension_kinds! {
    FeatureFlagModel => "FeatureFlag/Model", is_feature_flag_model;
    FeatureFlagCustom => "FeatureFlag/Custom", is_feature_flag_custom;
    ModelDefinition => "ModelDefinition", is_model_definition;
    ReduxReducer => "ReduxReducer", is_redux_reducer;
    ContextProvider => "ContextProvider", is_context_provider;
    RoutePage => "Page/Route", is_route_page;
    StandaloneRoutePage => "Page/Route/Standalone", is_standalone_route_page;
    ResourceListPage => "Page/Resource/List", is_resource_list_page;
    ResourceDetailsPage => "Page/Resource/Details", is_resource_details_page;
    ResourceTabPage => "Page/Resource/Tab", is_resource_tab_page;
    HrefNavItem => "NavItem/Href", is_href_nav_item;
    ResourceNsNavItem => "NavItem/ResourceNS", is_resource_ns_nav_item;
    ResourceClusterNavItem => "NavItem/ResourceCluster", is_resource_cluster_nav_item;
    NavSeparator => "NavItem/Separator", is_nav_separator;
    DashboardsTab => "Dashboards/Tab", is_dashboards_tab;
    DashboardsCard => "Dashboards/Card", is_dashboards_card;
    DashboardsActivityResource => "Dashboards/Overview/Activity/Resource", is_dashboards_activity_resource;
    OverviewCrd => "Overview/CRD", is_overview_crd;
    HorizontalNavTab => "HorizontalNavTab", is_horizontal_nav_tab;
    AlertAction => "AlertAction", is_alert_action;
    TopologyComponentFactory => "Topology/ComponentFactory", is_topology_component_factory;
    TopologyDataModelFactory => "Topology/DataModelFactory", is_topology_data_model_factory;
    TopologyDisplayFilters => "Topology/DisplayFilters", is_topology_display_filters;
    TopologyCreateConnector => "Topology/CreateConnector", is_topology_create_connector;
    PvcCreateProp => "PVCCreateProp", is_pvc_create_prop;
    PvcStatus => "PVCStatus", is_pvc_status;
    PvcAlert => "PVCAlert", is_pvc_alert;
    PvcDelete => "PVCDelete", is_pvc_delete;
    YamlTemplate => "YAMLTemplate", is_yaml_template;
    AddAction => "AddAction", is_add_action;
    ClusterGlobalConfig => "ClusterGlobalConfig", is_cluster_global_config;
    StorageClassProvisioner => "StorageClass/Provisioner", is_storage_class_provisioner;
}

impl Display for ExtensionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Any `NavItem/*` extension.
pub fn is_nav_item(extension: &Extension) -> bool {
    matches!(
        extension.kind(),
        ExtensionKind::HrefNavItem
            | ExtensionKind::ResourceNsNavItem
            | ExtensionKind::ResourceClusterNavItem
            | ExtensionKind::NavSeparator
    )
}

/// Any `FeatureFlag/*` extension.
pub fn is_feature_flag(extension: &Extension) -> bool {
    matches!(
        extension.kind(),
        ExtensionKind::FeatureFlagModel | ExtensionKind::FeatureFlagCustom
    )
}

/// Any `Page/*` extension.
pub fn is_page(extension: &Extension) -> bool {
    matches!(
        extension.kind(),
        ExtensionKind::RoutePage
            | ExtensionKind::StandaloneRoutePage
            | ExtensionKind::ResourceListPage
            | ExtensionKind::ResourceDetailsPage
            | ExtensionKind::ResourceTabPage
    )
}

/// Any `Topology/*` extension.
pub fn is_topology(extension: &Extension) -> bool {
    matches!(
        extension.kind(),
        ExtensionKind::TopologyComponentFactory
            | ExtensionKind::TopologyDataModelFactory
            | ExtensionKind::TopologyDisplayFilters
            | ExtensionKind::TopologyCreateConnector
    )
}

/// Any PVC* extension.
pub fn is_pvc_extension(extension: &Extension) -> bool {
    matches!(
        extension.kind(),
        ExtensionKind::PvcCreateProp
            | ExtensionKind::PvcStatus
            | ExtensionKind::PvcAlert
            | ExtensionKind::PvcDelete
    )
}

#[cfg(test)]
mod tests {
    use super::{
        is_dashboards_card, is_href_nav_item, is_nav_item, is_page, is_pvc_extension,
        is_resource_ns_nav_item, ExtensionKind,
    };
    use crate::extension::model::Extension;
    use std::collections::BTreeSet;

    fn extension(kind: ExtensionKind) -> Extension {
        Extension::builder(kind, "test-plugin").build()
    }

    #[test]
    fn tags_round_trip_for_every_kind() {
        for kind in ExtensionKind::ALL {
            assert_eq!(ExtensionKind::from_tag(kind.as_str()), Some(*kind));
        }
    }

    #[test]
    fn tags_are_unique() {
        let tags: BTreeSet<&str> = ExtensionKind::ALL.iter().map(|kind| kind.as_str()).collect();
        assert_eq!(tags.len(), ExtensionKind::ALL.len());
    }

    #[test]
    fn from_tag_is_exact() {
        assert_eq!(ExtensionKind::from_tag("navitem/href"), None);
        assert_eq!(ExtensionKind::from_tag(" NavItem/Href"), None);
        assert_eq!(ExtensionKind::from_tag(""), None);
    }

    #[test]
    fn kind_predicate_matches_only_its_own_tag() {
        for kind in ExtensionKind::ALL {
            let candidate = extension(*kind);
            assert_eq!(
                is_href_nav_item(&candidate),
                *kind == ExtensionKind::HrefNavItem
            );
            assert_eq!(
                is_dashboards_card(&candidate),
                *kind == ExtensionKind::DashboardsCard
            );
        }
    }

    #[test]
    fn group_predicates_cover_their_family() {
        assert!(is_nav_item(&extension(ExtensionKind::NavSeparator)));
        assert!(is_nav_item(&extension(ExtensionKind::ResourceClusterNavItem)));
        assert!(!is_nav_item(&extension(ExtensionKind::DashboardsCard)));
        assert!(is_page(&extension(ExtensionKind::StandaloneRoutePage)));
        assert!(!is_page(&extension(ExtensionKind::HorizontalNavTab)));
        assert!(!is_resource_ns_nav_item(&extension(
            ExtensionKind::HrefNavItem
        )));
    }

    #[test]
    fn pvc_group_matches_exactly_the_pvc_tags() {
        for kind in ExtensionKind::ALL {
            assert_eq!(
                is_pvc_extension(&extension(*kind)),
                kind.as_str().starts_with("PVC")
            );
        }
    }
}
