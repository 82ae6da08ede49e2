//! Idempotent RBAC provisioning
//!
//! Each `ensure_*` operation builds the desired object, owned by the Domain,
//! and creates it through [`ensure_exists`]. An object that is already present
//! counts as provisioned, which makes a whole reconciliation safe to retry.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::ObjectMeta;
use tracing::{debug, error, info};

use crate::store::ClusterStore;
use crate::template::{RoleTemplateInput, TemplateRenderer};
use crate::Error;

/// API group of RBAC roles referenced by bindings
pub const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

const SERVICE_ACCOUNT_KIND: &str = "ServiceAccount";
const ROLE_KIND: &str = "Role";
const CLUSTER_ROLE_KIND: &str = "ClusterRole";

/// Result of an idempotent create
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provisioned {
    /// The object was created by this call
    Created,
    /// The object already existed; nothing was changed
    AlreadyPresent,
}

/// Await a create, treating AlreadyExists as success
///
/// Any other error is logged and returned unmodified.
pub async fn ensure_exists<F>(kind: &str, name: &str, create: F) -> Result<Provisioned, Error>
where
    F: Future<Output = Result<(), Error>>,
{
    match create.await {
        Ok(()) => {
            info!(kind = %kind, name = %name, "created");
            Ok(Provisioned::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(kind = %kind, name = %name, "already exists");
            Ok(Provisioned::AlreadyPresent)
        }
        Err(e) => {
            error!(kind = %kind, name = %name, error = %e, "create failed");
            Err(e)
        }
    }
}

/// Creates the per-domain identity and RBAC objects
pub struct ResourceProvisioner {
    store: Arc<dyn ClusterStore>,
    renderer: Arc<dyn TemplateRenderer>,
    role_template: PathBuf,
    cluster_role: String,
}

impl ResourceProvisioner {
    /// Create a provisioner
    ///
    /// # Arguments
    ///
    /// * `role_template` - Path of the Role manifest template
    /// * `cluster_role` - Pre-existing ClusterRole bound by [`Self::ensure_cluster_role_binding`]
    pub fn new(
        store: Arc<dyn ClusterStore>,
        renderer: Arc<dyn TemplateRenderer>,
        role_template: impl Into<PathBuf>,
        cluster_role: impl Into<String>,
    ) -> Self {
        Self {
            store,
            renderer,
            role_template: role_template.into(),
            cluster_role: cluster_role.into(),
        }
    }

    /// Ensure the domain's ServiceAccount exists
    pub async fn ensure_service_account(
        &self,
        domain_id: &str,
        owner: &OwnerReference,
    ) -> Result<Provisioned, Error> {
        let service_account = ServiceAccount {
            metadata: owned_meta(domain_id, Some(domain_id), owner),
            ..Default::default()
        };
        ensure_exists(
            SERVICE_ACCOUNT_KIND,
            domain_id,
            self.store
                .create_service_account(domain_id, &service_account),
        )
        .await
    }

    /// Ensure the domain's Role exists; returns the rendered Role name
    ///
    /// Template errors are configuration errors and always propagate.
    pub async fn ensure_role(
        &self,
        domain_id: &str,
        owner: &OwnerReference,
    ) -> Result<String, Error> {
        let mut role = self
            .renderer
            .render_role(&self.role_template, &RoleTemplateInput::new(domain_id))?;

        let name = role
            .metadata
            .name
            .clone()
            .ok_or_else(|| Error::validation(domain_id, "rendered Role has no name"))?;
        role.metadata.namespace = Some(domain_id.to_string());
        role.metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(owner.clone());

        ensure_exists(ROLE_KIND, &name, self.store.create_role(domain_id, &role)).await?;
        Ok(name)
    }

    /// Ensure the RoleBinding granting `role_name` to the domain's ServiceAccount
    pub async fn ensure_role_binding(
        &self,
        domain_id: &str,
        role_name: &str,
        owner: &OwnerReference,
    ) -> Result<Provisioned, Error> {
        let role_binding = RoleBinding {
            metadata: owned_meta(domain_id, Some(domain_id), owner),
            subjects: Some(vec![service_account_subject(domain_id)]),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: ROLE_KIND.to_string(),
                name: role_name.to_string(),
            },
        };
        ensure_exists(
            "RoleBinding",
            domain_id,
            self.store.create_role_binding(domain_id, &role_binding),
        )
        .await
    }

    /// Ensure ServiceAccount, Role and RoleBinding, in dependency order
    pub async fn ensure_namespace_rbac(
        &self,
        domain_id: &str,
        owner: &OwnerReference,
    ) -> Result<(), Error> {
        self.ensure_service_account(domain_id, owner).await?;
        let role_name = self.ensure_role(domain_id, owner).await?;
        self.ensure_role_binding(domain_id, &role_name, owner).await?;
        Ok(())
    }

    /// Ensure the ClusterRoleBinding to the shared domain ClusterRole
    pub async fn ensure_cluster_role_binding(
        &self,
        domain_id: &str,
        owner: &OwnerReference,
    ) -> Result<Provisioned, Error> {
        let binding = ClusterRoleBinding {
            metadata: owned_meta(domain_id, None, owner),
            subjects: Some(vec![service_account_subject(domain_id)]),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: CLUSTER_ROLE_KIND.to_string(),
                name: self.cluster_role.clone(),
            },
        };
        ensure_exists(
            "ClusterRoleBinding",
            domain_id,
            self.store.create_cluster_role_binding(&binding),
        )
        .await
    }
}

fn owned_meta(name: &str, namespace: Option<&str>, owner: &OwnerReference) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        owner_references: Some(vec![owner.clone()]),
        ..Default::default()
    }
}

/// The domain's ServiceAccount lives in the namespace named after it
fn service_account_subject(domain_id: &str) -> Subject {
    Subject {
        kind: SERVICE_ACCOUNT_KIND.to_string(),
        name: domain_id.to_string(),
        namespace: Some(domain_id.to_string()),
        api_group: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{object_key, InMemoryStore};
    use crate::store::MockClusterStore;
    use crate::template::{MockTemplateRenderer, TemplateError};
    use k8s_openapi::api::rbac::v1::Role;

    fn owner(name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "kuscia.secretflow/v1alpha1".to_string(),
            kind: "Domain".to_string(),
            name: name.to_string(),
            uid: format!("uid-{name}"),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn role_renderer() -> MockTemplateRenderer {
        let mut renderer = MockTemplateRenderer::new();
        renderer.expect_render_role().returning(|_, input| {
            Ok(Role {
                metadata: ObjectMeta {
                    name: Some(input.domain_id.clone()),
                    ..Default::default()
                },
                rules: None,
            })
        });
        renderer
    }

    fn provisioner(store: Arc<dyn ClusterStore>) -> ResourceProvisioner {
        ResourceProvisioner::new(
            store,
            Arc::new(role_renderer()),
            "/etc/conf/domain-namespace-res.yaml",
            "domain-cluster-res",
        )
    }

    // =========================================================================
    // ensure_exists contract
    // =========================================================================

    #[tokio::test]
    async fn test_ensure_exists_reports_created() {
        let result = ensure_exists("Role", "a", async { Ok(()) }).await.unwrap();
        assert_eq!(result, Provisioned::Created);
    }

    #[tokio::test]
    async fn test_ensure_exists_swallows_already_exists() {
        let result = ensure_exists("Role", "a", async {
            Err(Error::already_exists("Role", "a"))
        })
        .await
        .unwrap();
        assert_eq!(result, Provisioned::AlreadyPresent);
    }

    #[tokio::test]
    async fn test_ensure_exists_propagates_other_errors() {
        let err = ensure_exists("Role", "a", async {
            Err(Error::validation("a", "forbidden"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    // =========================================================================
    // Object shape
    // =========================================================================

    /// Story: every object created for a domain is owned by it
    ///
    /// Deleting the Domain cascades to everything provisioned for it,
    /// however far provisioning got.
    #[tokio::test]
    async fn story_created_objects_carry_owner_reference() {
        let store = Arc::new(InMemoryStore::new());
        let p = provisioner(store.clone());
        let owner = owner("alice");

        p.ensure_namespace_rbac("alice", &owner).await.unwrap();
        p.ensure_cluster_role_binding("alice", &owner).await.unwrap();

        let keys = store.resource_keys();
        assert_eq!(keys.len(), 4);
        for key in keys {
            let object = store.object(&key).unwrap();
            assert_eq!(
                object["metadata"]["ownerReferences"][0]["uid"], "uid-alice",
                "{key} must be owned by the domain"
            );
        }
    }

    #[tokio::test]
    async fn test_role_binding_binds_service_account_to_rendered_role() {
        let store = Arc::new(InMemoryStore::new());
        let p = provisioner(store.clone());

        p.ensure_namespace_rbac("alice", &owner("alice"))
            .await
            .unwrap();

        let binding = store
            .object(&object_key("RoleBinding", Some("alice"), "alice"))
            .unwrap();
        assert_eq!(binding["subjects"][0]["kind"], "ServiceAccount");
        assert_eq!(binding["subjects"][0]["name"], "alice");
        assert_eq!(binding["subjects"][0]["namespace"], "alice");
        assert_eq!(binding["roleRef"]["apiGroup"], RBAC_API_GROUP);
        assert_eq!(binding["roleRef"]["kind"], "Role");
        assert_eq!(binding["roleRef"]["name"], "alice");

        let role = store
            .object(&object_key("Role", Some("alice"), "alice"))
            .unwrap();
        assert_eq!(role["metadata"]["namespace"], "alice");
    }

    #[tokio::test]
    async fn test_cluster_role_binding_targets_configured_cluster_role() {
        let store = Arc::new(InMemoryStore::new());
        let p = provisioner(store.clone());

        p.ensure_cluster_role_binding("carol", &owner("carol"))
            .await
            .unwrap();

        let binding = store
            .object(&object_key("ClusterRoleBinding", None, "carol"))
            .unwrap();
        assert_eq!(binding["roleRef"]["kind"], "ClusterRole");
        assert_eq!(binding["roleRef"]["name"], "domain-cluster-res");
        assert_eq!(binding["subjects"][0]["namespace"], "carol");
        assert!(binding["metadata"].get("namespace").is_none());
    }

    // =========================================================================
    // Idempotency
    // =========================================================================

    /// Story: creating the RoleBinding twice succeeds without a duplicate
    #[tokio::test]
    async fn story_role_binding_twice_is_idempotent() {
        let store = Arc::new(InMemoryStore::new());
        let p = provisioner(store.clone());
        let owner = owner("alice");

        let first = p.ensure_role_binding("alice", "alice", &owner).await.unwrap();
        let second = p.ensure_role_binding("alice", "alice", &owner).await.unwrap();

        assert_eq!(first, Provisioned::Created);
        assert_eq!(second, Provisioned::AlreadyPresent);
        assert_eq!(store.resource_keys().len(), 1);
    }

    // =========================================================================
    // Failure propagation
    // =========================================================================

    /// Story: a broken Role template stops provisioning before the binding
    #[tokio::test]
    async fn story_template_error_propagates_and_skips_binding() {
        let mut store = MockClusterStore::new();
        store
            .expect_create_service_account()
            .times(1)
            .returning(|_, _| Ok(()));
        store.expect_create_role().never();
        store.expect_create_role_binding().never();

        let mut renderer = MockTemplateRenderer::new();
        renderer.expect_render_role().returning(|path, _| {
            Err(TemplateError::MissingName {
                path: path.to_path_buf(),
            })
        });

        let p = ResourceProvisioner::new(
            Arc::new(store),
            Arc::new(renderer),
            "/etc/conf/domain-namespace-res.yaml",
            "domain-cluster-res",
        );

        let err = p
            .ensure_namespace_rbac("alice", &owner("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Template { .. }));
    }

    #[tokio::test]
    async fn test_store_failure_propagates_unmodified() {
        let mut store = MockClusterStore::new();
        store
            .expect_create_service_account()
            .returning(|_, _| Err(Error::credential("alice", "unauthorized")));

        let p = provisioner(Arc::new(store));
        let err = p
            .ensure_service_account("alice", &owner("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Credential { .. }));
    }
}
