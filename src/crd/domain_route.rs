//! ClusterDomainRoute Custom Resource Definition
//!
//! A ClusterDomainRoute authorizes calls from a source domain to a
//! destination domain and carries the headers the gateway attaches to
//! outbound requests.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AuthenticationType, InterConnProtocol, TokenConfig};

/// Specification for a ClusterDomainRoute
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kuscia.secretflow",
    version = "v1alpha1",
    kind = "ClusterDomainRoute",
    plural = "clusterdomainroutes",
    shortname = "cdr",
    namespaced = false,
    printcolumn = r#"{"name":"Source","type":"string","jsonPath":".spec.source"}"#,
    printcolumn = r#"{"name":"Destination","type":"string","jsonPath":".spec.destination"}"#,
    printcolumn = r#"{"name":"Authentication","type":"string","jsonPath":".spec.authenticationType"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDomainRouteSpec {
    /// Calling domain
    pub source: String,

    /// Called domain
    pub destination: String,

    /// Protocol spoken across the route
    #[serde(default)]
    pub inter_conn_protocol: InterConnProtocol,

    /// Authentication applied to outbound requests
    pub authentication_type: AuthenticationType,

    /// Credential rotation settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_config: Option<TokenConfig>,

    /// Headers added to every outbound request
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_headers_to_add: BTreeMap<String, String>,
}

/// Deterministic route name for a source/destination pair
pub fn route_name(source: &str, destination: &str) -> String {
    format!("{source}-{destination}")
}
