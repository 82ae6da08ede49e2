//! Trust route provisioning
//!
//! A trust route authorizes a domain to call the control-plane domain. The
//! issued bearer token travels in the route's outbound headers.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::classifier::effective_protocol;
use super::provisioner::{ensure_exists, Provisioned};
use crate::crd::{route_name, ClusterDomainRoute, ClusterDomainRouteSpec, Domain, TokenConfig};
use crate::store::ClusterStore;
use crate::{Error, DEFAULT_ROLLING_UPDATE_PERIOD_SECONDS};

/// Header carrying the bearer credential on outbound requests
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Header name and value for a bearer token
pub fn authorization_header(token: &str) -> (String, String) {
    (AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}"))
}

/// Builds and creates ClusterDomainRoutes
pub struct TrustRouteProvisioner {
    store: Arc<dyn ClusterStore>,
}

impl TrustRouteProvisioner {
    /// Create a provisioner using the given store
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Build the route from `domain` to `destination` carrying `token`
    ///
    /// The domain must declare a trust-center configuration.
    pub fn build_route(
        domain: &Domain,
        destination: &str,
        token: &str,
    ) -> Result<ClusterDomainRoute, Error> {
        let source = domain.id()?;
        let auth_center = domain
            .spec
            .auth_center
            .as_ref()
            .ok_or_else(|| Error::validation(source, "domain has no authCenter"))?;

        let spec = ClusterDomainRouteSpec {
            source: source.to_string(),
            destination: destination.to_string(),
            inter_conn_protocol: effective_protocol(domain),
            authentication_type: auth_center.authentication_type,
            token_config: Some(TokenConfig {
                token_gen_method: auth_center.token_gen_method,
                rolling_update_period: DEFAULT_ROLLING_UPDATE_PERIOD_SECONDS,
            }),
            request_headers_to_add: BTreeMap::from([authorization_header(token)]),
        };

        let mut route = ClusterDomainRoute::new(&route_name(source, destination), spec);
        route.metadata.owner_references = Some(vec![domain.owner_reference()?]);
        Ok(route)
    }

    /// Ensure the trust route from `domain` to `destination` exists
    pub async fn provision_route(
        &self,
        domain: &Domain,
        destination: &str,
        token: &str,
    ) -> Result<Provisioned, Error> {
        let route = Self::build_route(domain, destination, token)?;
        let name = route.metadata.name.clone().unwrap_or_default();
        ensure_exists(
            "ClusterDomainRoute",
            &name,
            self.store.create_cluster_domain_route(&route),
        )
        .await
    }
}
