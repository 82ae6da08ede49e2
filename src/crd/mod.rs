//! Custom Resource Definitions for domain authorization
//!
//! This module contains the CRDs the controller reads (Domain) and
//! writes (Domain labels, ClusterDomainRoute).

mod domain;
mod domain_route;
mod types;

pub use domain::{Domain, DomainSpec};
pub use domain_route::{route_name, ClusterDomainRoute, ClusterDomainRouteSpec};
pub use types::{
    AuthCenter, AuthenticationType, DomainRole, InterConnProtocol, TokenConfig, TokenGenMethod,
};
