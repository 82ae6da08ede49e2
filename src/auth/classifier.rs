//! Domain classification
//!
//! Pure functions mapping a Domain's role and interconnection fields to the
//! provisioning strategy it needs. No I/O happens here.

use crate::crd::{Domain, InterConnProtocol};

/// Which set of authorization resources a domain needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProvisionStrategy {
    /// Self-mastered Kuscia partner: namespace RBAC and, if configured, a trust route
    MasterPath,
    /// Kuscia partner mastered elsewhere: nothing to provision locally
    LitePath,
    /// Everything else: namespace RBAC, cluster binding and, if configured, a trust route
    StandardPath,
}

impl ProvisionStrategy {
    /// Returns true if the strategy creates namespace-scoped RBAC
    pub fn provisions_namespace_rbac(&self) -> bool {
        !matches!(self, Self::LitePath)
    }

    /// Returns true if the strategy creates the ClusterRoleBinding
    pub fn provisions_cluster_binding(&self) -> bool {
        matches!(self, Self::StandardPath)
    }
}

impl std::fmt::Display for ProvisionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MasterPath => write!(f, "master"),
            Self::LitePath => write!(f, "lite"),
            Self::StandardPath => write!(f, "standard"),
        }
    }
}

/// Classify a domain into its provisioning strategy
pub fn classify(domain: &Domain) -> ProvisionStrategy {
    let spec = &domain.spec;
    let native_partner = spec.role.is_partner()
        && spec
            .inter_conn_protocols
            .first()
            .is_some_and(InterConnProtocol::is_native);

    match (native_partner, domain.is_self_mastered()) {
        (true, true) => ProvisionStrategy::MasterPath,
        (true, false) => ProvisionStrategy::LitePath,
        (false, _) => ProvisionStrategy::StandardPath,
    }
}

/// Protocol a trust route for this domain speaks
///
/// Only a partner's first declared non-native protocol overrides Kuscia.
pub fn effective_protocol(domain: &Domain) -> InterConnProtocol {
    match domain.spec.inter_conn_protocols.first() {
        Some(protocol) if domain.spec.role.is_partner() && !protocol.is_native() => *protocol,
        _ => InterConnProtocol::Kuscia,
    }
}
