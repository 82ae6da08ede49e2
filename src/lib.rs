//! Kuscia domain authorization - RBAC and trust-route provisioning for federated domains
//!
//! Every domain registered with the control plane needs a set of access-control
//! resources before it can take part in the federation. This crate decides which
//! resources a domain needs, creates the missing ones, and labels the domain once
//! provisioning has fully succeeded.
//!
//! # Architecture
//!
//! Reconciliation is level-triggered and idempotent:
//! - Every create treats "already exists" as success, so partial progress is safe
//! - The completion label on the Domain itself gates re-provisioning
//! - Every created object is owned by its Domain and is garbage collected with it
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (Domain, ClusterDomainRoute)
//! - [`auth`] - Classification, provisioning and completion tracking
//! - [`controller`] - kube-runtime reconciliation entry points
//! - [`store`] - Cluster resource store abstraction over the Kubernetes API
//! - [`template`] - Role manifest rendering from on-disk templates
//! - [`error`] - Error types for the controller

#![deny(missing_docs)]

pub mod auth;
pub mod controller;
pub mod crd;
pub mod error;
pub mod store;
pub mod template;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Label key carrying the domain authorization completion marker
pub const DOMAIN_AUTH_LABEL: &str = "kuscia.secretflow/domain-auth";

/// Label value signaling that authorization provisioning finished
pub const AUTH_COMPLETED: &str = "completed";

/// Default namespace the controller runs in (trust-route destination)
pub const DEFAULT_NAMESPACE: &str = "kuscia-system";

/// Default root directory holding `etc/conf` templates
pub const DEFAULT_ROOT_DIR: &str = "/home/kuscia";

/// Pre-existing ClusterRole bound to non-master domains
pub const DEFAULT_DOMAIN_CLUSTER_ROLE: &str = "domain-cluster-res";

/// Role template location relative to the root directory
pub const ROLE_TEMPLATE_RELATIVE_PATH: &str = "etc/conf/domain-namespace-res.yaml";

/// Lifetime of the bearer token issued for a domain's ServiceAccount (10 years)
pub const TOKEN_EXPIRATION_SECONDS: i64 = 3650 * 24 * 3600;

/// Rolling-update period advertised on trust routes (24 hours)
///
/// Independent of [`TOKEN_EXPIRATION_SECONDS`]; the route advertises a daily
/// rotation while the token it carries lives for ten years.
pub const DEFAULT_ROLLING_UPDATE_PERIOD_SECONDS: i64 = 86400;

/// Field manager used for server-side apply of CRDs
pub const FIELD_MANAGER: &str = "kuscia-domain-auth";
