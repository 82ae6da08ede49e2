//! Domain Custom Resource Definition
//!
//! A Domain is one tenant of the federation. Its name doubles as the
//! namespace and as the ServiceAccount name provisioned for it.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{CustomResource, Resource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{AuthCenter, DomainRole, InterConnProtocol};
use crate::error::UNKNOWN_DOMAIN;
use crate::{Error, AUTH_COMPLETED, DOMAIN_AUTH_LABEL};

/// Specification for a Domain
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "kuscia.secretflow",
    version = "v1alpha1",
    kind = "Domain",
    plural = "domains",
    namespaced = false,
    printcolumn = r#"{"name":"Role","type":"string","jsonPath":".spec.role"}"#,
    printcolumn = r#"{"name":"MasterDomain","type":"string","jsonPath":".spec.masterDomain"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DomainSpec {
    /// Role in the federation
    #[serde(default)]
    pub role: DomainRole,

    /// Declared interconnection protocols, effective protocol first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inter_conn_protocols: Vec<InterConnProtocol>,

    /// Master domain: empty, this domain's own name, or another domain
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub master_domain: String,

    /// Trust-center configuration; when set a trust route is provisioned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_center: Option<AuthCenter>,
}

impl Domain {
    /// Domain name, which is also its namespace and principal name
    pub fn id(&self) -> Result<&str, Error> {
        self.metadata
            .name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::validation(UNKNOWN_DOMAIN, "domain has no metadata.name"))
    }

    /// Returns true if the master-domain field is empty or names this domain
    pub fn is_self_mastered(&self) -> bool {
        let master = self.spec.master_domain.as_str();
        master.is_empty() || Some(master) == self.metadata.name.as_deref()
    }

    /// Returns true if the completion label is present with the completed value
    pub fn is_auth_completed(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(DOMAIN_AUTH_LABEL))
            .map(|value| value == AUTH_COMPLETED)
            .unwrap_or(false)
    }

    /// Set a label, creating the label map if needed
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
    }

    /// Controller owner reference pointing at this domain
    ///
    /// Objects carrying it are garbage collected when the domain is deleted.
    pub fn owner_reference(&self) -> Result<OwnerReference, Error> {
        let name = self.id()?;
        self.controller_owner_ref(&())
            .ok_or_else(|| Error::validation(name, "domain has no metadata.uid"))
    }
}
