//! Domain authorization provisioning
//!
//! [`DomainAuthorizer::reconcile`] is the entry point: it skips domains that
//! already carry the completion marker, classifies the rest, provisions the
//! resources their strategy needs, and commits the marker last.
//!
//! | Strategy | ServiceAccount/Role/RoleBinding | ClusterRoleBinding | Trust route |
//! |---|---|---|---|
//! | MasterPath | yes | no | if `authCenter` |
//! | LitePath | no | no | no |
//! | StandardPath | yes | yes | if `authCenter` |

mod classifier;
mod completion;
mod credential;
mod provisioner;
mod route;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

pub use classifier::{classify, effective_protocol, ProvisionStrategy};
pub use completion::CompletionTracker;
pub use credential::CredentialIssuer;
pub use provisioner::{ensure_exists, Provisioned, ResourceProvisioner, RBAC_API_GROUP};
pub use route::{authorization_header, TrustRouteProvisioner, AUTHORIZATION_HEADER};

use crate::crd::Domain;
use crate::store::ClusterStore;
use crate::template::TemplateRenderer;
use crate::{
    Error, DEFAULT_DOMAIN_CLUSTER_ROLE, DEFAULT_NAMESPACE, DEFAULT_ROOT_DIR,
    ROLE_TEMPLATE_RELATIVE_PATH,
};

/// Settings for domain authorization provisioning
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthConfig {
    /// Namespace the controller runs in; destination of every trust route
    pub namespace: String,
    /// Root directory containing `etc/conf/domain-namespace-res.yaml`
    pub root_dir: PathBuf,
    /// ClusterRole bound for standard-path domains
    pub cluster_role: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            cluster_role: DEFAULT_DOMAIN_CLUSTER_ROLE.to_string(),
        }
    }
}

impl AuthConfig {
    /// Set the controller namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the template root directory
    pub fn root_dir(mut self, root_dir: impl AsRef<Path>) -> Self {
        self.root_dir = root_dir.as_ref().to_path_buf();
        self
    }

    /// Set the ClusterRole bound for standard-path domains
    pub fn cluster_role(mut self, cluster_role: impl Into<String>) -> Self {
        self.cluster_role = cluster_role.into();
        self
    }

    /// Full path of the Role template
    pub fn role_template_path(&self) -> PathBuf {
        self.root_dir.join(ROLE_TEMPLATE_RELATIVE_PATH)
    }
}

/// What a reconciliation did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The completion marker was already set; nothing was written
    AlreadyCompleted,
    /// Resources for the strategy were ensured and the marker committed
    Completed(ProvisionStrategy),
}

/// Orchestrates authorization provisioning for one domain at a time
///
/// Callers must not reconcile the same domain concurrently; kube-runtime's
/// controller guarantees this per object key.
pub struct DomainAuthorizer {
    namespace: String,
    provisioner: ResourceProvisioner,
    credentials: CredentialIssuer,
    routes: TrustRouteProvisioner,
    completion: CompletionTracker,
}

impl DomainAuthorizer {
    /// Create an authorizer over the given store and Role renderer
    pub fn new(
        store: Arc<dyn ClusterStore>,
        renderer: Arc<dyn TemplateRenderer>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            namespace: config.namespace.clone(),
            provisioner: ResourceProvisioner::new(
                store.clone(),
                renderer,
                config.role_template_path(),
                config.cluster_role.clone(),
            ),
            credentials: CredentialIssuer::new(store.clone()),
            routes: TrustRouteProvisioner::new(store.clone()),
            completion: CompletionTracker::new(store),
        }
    }

    /// Provision everything `domain` needs and commit the completion marker
    ///
    /// Any failure returns before the marker is committed; rerunning after a
    /// failure skips objects created by earlier attempts.
    pub async fn reconcile(&self, domain: &Domain) -> Result<ReconcileOutcome, Error> {
        if CompletionTracker::is_done(domain) {
            debug!("domain auth already completed, skipping");
            return Ok(ReconcileOutcome::AlreadyCompleted);
        }

        let strategy = classify(domain);
        info!(%strategy, "provisioning domain authorization");

        if strategy.provisions_namespace_rbac() {
            self.provision(domain, strategy).await?;
        } else {
            debug!("lite domain trusts its master, nothing to provision");
        }

        self.completion.commit(domain).await?;
        Ok(ReconcileOutcome::Completed(strategy))
    }

    async fn provision(&self, domain: &Domain, strategy: ProvisionStrategy) -> Result<(), Error> {
        let domain_id = domain.id()?;
        let owner = domain.owner_reference()?;

        self.provisioner
            .ensure_namespace_rbac(domain_id, &owner)
            .await?;

        if strategy.provisions_cluster_binding() {
            self.provisioner
                .ensure_cluster_role_binding(domain_id, &owner)
                .await?;
        }

        if domain.spec.auth_center.is_some() {
            // Principal name equals the domain name
            let token = self
                .credentials
                .issue_credential(domain_id, domain_id)
                .await?;
            self.routes
                .provision_route(domain, &self.namespace, &token)
                .await?;
        }

        Ok(())
    }
}
