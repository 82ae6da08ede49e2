//! Domain controller
//!
//! Watches cluster-scoped Domain objects and runs authorization provisioning
//! until the completion marker is set.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{error, info, instrument};

use crate::auth::{AuthConfig, DomainAuthorizer, ReconcileOutcome};
use crate::crd::Domain;
use crate::store::{ClusterStore, KubeStore};
use crate::template::{FileTemplateRenderer, TemplateRenderer};
use crate::Error;

/// Controller context shared across reconciliations
pub struct Context {
    /// Provisioning orchestrator
    pub authorizer: DomainAuthorizer,
}

impl Context {
    /// Create a context backed by the Kubernetes API and on-disk templates
    pub fn new(client: Client, config: &AuthConfig) -> Self {
        Self {
            authorizer: DomainAuthorizer::new(
                Arc::new(KubeStore::new(client)),
                Arc::new(FileTemplateRenderer::new()),
                config,
            ),
        }
    }

    /// Create a context for testing with a custom store and renderer
    #[cfg(test)]
    pub fn for_testing(
        store: Arc<dyn ClusterStore>,
        renderer: Arc<dyn TemplateRenderer>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            authorizer: DomainAuthorizer::new(store, renderer, config),
        }
    }
}

/// Reconcile a Domain
///
/// Completed domains are left alone. Success waits for the next change:
/// the label update that commits completion triggers one more pass, which
/// then short-circuits on the marker.
#[instrument(skip(domain, ctx), fields(domain = %domain.name_any()))]
pub async fn reconcile(domain: Arc<Domain>, ctx: Arc<Context>) -> Result<Action, Error> {
    match ctx.authorizer.reconcile(&domain).await? {
        ReconcileOutcome::AlreadyCompleted => {}
        ReconcileOutcome::Completed(strategy) => {
            info!(%strategy, "domain authorization provisioned");
        }
    }
    Ok(Action::await_change())
}

/// Error policy for the controller
///
/// Failed reconciliations are retried after a fixed delay. Every step is
/// idempotent, so the retry resumes wherever the failure stopped.
pub fn error_policy(domain: Arc<Domain>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        domain = %domain.name_any(),
        "reconciliation failed"
    );
    Action::requeue(Duration::from_secs(5))
}
