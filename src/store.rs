//! Cluster resource store
//!
//! The controller only ever creates objects, merge-patches the Domain, and
//! requests ServiceAccount tokens. [`ClusterStore`] captures exactly that
//! surface so provisioning logic can be tested without an API server.

use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenRequest, TokenRequestSpec};
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, Role, RoleBinding};
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;

#[cfg(test)]
use mockall::automock;

use crate::crd::{ClusterDomainRoute, Domain};
use crate::Error;

/// Trait abstracting the Kubernetes API operations used for provisioning
///
/// Every `create_*` fails with [`Error::AlreadyExists`] when an object with
/// the same name (and namespace) is already present.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Create a ServiceAccount in `namespace`
    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), Error>;

    /// Create a Role in `namespace`
    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), Error>;

    /// Create a RoleBinding in `namespace`
    async fn create_role_binding(
        &self,
        namespace: &str,
        role_binding: &RoleBinding,
    ) -> Result<(), Error>;

    /// Create a cluster-scoped ClusterRoleBinding
    async fn create_cluster_role_binding(&self, binding: &ClusterRoleBinding)
        -> Result<(), Error>;

    /// Create a cluster-scoped ClusterDomainRoute
    async fn create_cluster_domain_route(&self, route: &ClusterDomainRoute) -> Result<(), Error>;

    /// Apply a JSON merge patch to the named Domain
    ///
    /// Fields absent from `patch` are left untouched on the live object.
    async fn patch_domain(&self, name: &str, patch: &serde_json::Value) -> Result<(), Error>;

    /// Request a bearer token for a ServiceAccount
    ///
    /// # Arguments
    ///
    /// * `namespace` - Namespace of the ServiceAccount
    /// * `service_account` - ServiceAccount name
    /// * `expiration_seconds` - Requested token lifetime
    async fn issue_token(
        &self,
        namespace: &str,
        service_account: &str,
        expiration_seconds: i64,
    ) -> Result<String, Error>;
}

/// Real store implementation backed by the Kubernetes API
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new KubeStore wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Merge patch sent for a Domain mutation
fn domain_merge_patch(patch: &serde_json::Value) -> Patch<&serde_json::Value> {
    Patch::Merge(patch)
}

/// Create an object, mapping HTTP 409 to [`Error::AlreadyExists`]
async fn create_object<K>(api: &Api<K>, kind: &str, object: &K) -> Result<(), Error>
where
    K: Resource + Clone + DeserializeOwned + Serialize + Debug,
{
    match api.create(&PostParams::default(), object).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(ae)) if ae.code == 409 => {
            Err(Error::already_exists(kind, object.name_any()))
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn create_service_account(
        &self,
        namespace: &str,
        service_account: &ServiceAccount,
    ) -> Result<(), Error> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);
        create_object(&api, "ServiceAccount", service_account).await
    }

    async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), Error> {
        let api: Api<Role> = Api::namespaced(self.client.clone(), namespace);
        create_object(&api, "Role", role).await
    }

    async fn create_role_binding(
        &self,
        namespace: &str,
        role_binding: &RoleBinding,
    ) -> Result<(), Error> {
        let api: Api<RoleBinding> = Api::namespaced(self.client.clone(), namespace);
        create_object(&api, "RoleBinding", role_binding).await
    }

    async fn create_cluster_role_binding(
        &self,
        binding: &ClusterRoleBinding,
    ) -> Result<(), Error> {
        let api: Api<ClusterRoleBinding> = Api::all(self.client.clone());
        create_object(&api, "ClusterRoleBinding", binding).await
    }

    async fn create_cluster_domain_route(&self, route: &ClusterDomainRoute) -> Result<(), Error> {
        let api: Api<ClusterDomainRoute> = Api::all(self.client.clone());
        create_object(&api, "ClusterDomainRoute", route).await
    }

    async fn patch_domain(&self, name: &str, patch: &serde_json::Value) -> Result<(), Error> {
        let api: Api<Domain> = Api::all(self.client.clone());
        api.patch(name, &PatchParams::default(), &domain_merge_patch(patch))
            .await?;
        Ok(())
    }

    async fn issue_token(
        &self,
        namespace: &str,
        service_account: &str,
        expiration_seconds: i64,
    ) -> Result<String, Error> {
        let api: Api<ServiceAccount> = Api::namespaced(self.client.clone(), namespace);

        let token_request = TokenRequest {
            metadata: Default::default(),
            spec: TokenRequestSpec {
                audiences: vec![],
                expiration_seconds: Some(expiration_seconds),
                bound_object_ref: None,
            },
            status: None,
        };

        let result = api
            .create_token_request(service_account, &PostParams::default(), &token_request)
            .await
            .map_err(|e| {
                error!(
                    service_account = %service_account,
                    namespace = %namespace,
                    error = %e,
                    "token request failed"
                );
                Error::from(e)
            })?;

        result
            .status
            .map(|status| status.token)
            .ok_or_else(|| Error::credential(service_account, "token response missing status"))
    }
}

/// In-memory store for tests
///
/// Objects are keyed by kind, namespace and name; creating a key twice
/// fails with AlreadyExists just like the API server.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct State {
        objects: BTreeMap<String, serde_json::Value>,
        domain_patches: Vec<(String, serde_json::Value)>,
        tokens_issued: Vec<(String, String, i64)>,
    }

    /// In-memory [`ClusterStore`] honoring create-once semantics
    #[derive(Default)]
    pub struct InMemoryStore {
        state: Mutex<State>,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        fn insert<K: Serialize>(
            &self,
            kind: &str,
            namespace: Option<&str>,
            name: &str,
            object: &K,
        ) -> Result<(), Error> {
            let key = object_key(kind, namespace, name);
            let mut state = self.state.lock().unwrap();
            if state.objects.contains_key(&key) {
                return Err(Error::already_exists(kind, name));
            }
            let value = serde_json::to_value(object).unwrap();
            state.objects.insert(key, value);
            Ok(())
        }

        /// Keys of every object created so far (`Kind/namespace/name`)
        pub fn resource_keys(&self) -> BTreeSet<String> {
            self.state.lock().unwrap().objects.keys().cloned().collect()
        }

        /// Stored object for a key, as JSON
        pub fn object(&self, key: &str) -> Option<serde_json::Value> {
            self.state.lock().unwrap().objects.get(key).cloned()
        }

        /// Every `(name, patch)` passed to `patch_domain`, in order
        pub fn domain_patches(&self) -> Vec<(String, serde_json::Value)> {
            self.state.lock().unwrap().domain_patches.clone()
        }

        /// Every token request as (namespace, service account, expiry)
        pub fn tokens_issued(&self) -> Vec<(String, String, i64)> {
            self.state.lock().unwrap().tokens_issued.clone()
        }
    }

    /// Key format used by [`InMemoryStore::resource_keys`]
    pub fn object_key(kind: &str, namespace: Option<&str>, name: &str) -> String {
        match namespace {
            Some(ns) => format!("{kind}/{ns}/{name}"),
            None => format!("{kind}/{name}"),
        }
    }

    #[async_trait]
    impl ClusterStore for InMemoryStore {
        async fn create_service_account(
            &self,
            namespace: &str,
            service_account: &ServiceAccount,
        ) -> Result<(), Error> {
            let name = service_account.name_any();
            self.insert("ServiceAccount", Some(namespace), &name, service_account)
        }

        async fn create_role(&self, namespace: &str, role: &Role) -> Result<(), Error> {
            self.insert("Role", Some(namespace), &role.name_any(), role)
        }

        async fn create_role_binding(
            &self,
            namespace: &str,
            role_binding: &RoleBinding,
        ) -> Result<(), Error> {
            let name = role_binding.name_any();
            self.insert("RoleBinding", Some(namespace), &name, role_binding)
        }

        async fn create_cluster_role_binding(
            &self,
            binding: &ClusterRoleBinding,
        ) -> Result<(), Error> {
            self.insert("ClusterRoleBinding", None, &binding.name_any(), binding)
        }

        async fn create_cluster_domain_route(
            &self,
            route: &ClusterDomainRoute,
        ) -> Result<(), Error> {
            self.insert("ClusterDomainRoute", None, &route.name_any(), route)
        }

        async fn patch_domain(
            &self,
            name: &str,
            patch: &serde_json::Value,
        ) -> Result<(), Error> {
            self.state
                .lock()
                .unwrap()
                .domain_patches
                .push((name.to_string(), patch.clone()));
            Ok(())
        }

        async fn issue_token(
            &self,
            namespace: &str,
            service_account: &str,
            expiration_seconds: i64,
        ) -> Result<String, Error> {
            let mut state = self.state.lock().unwrap();
            state.tokens_issued.push((
                namespace.to_string(),
                service_account.to_string(),
                expiration_seconds,
            ));
            Ok(format!("token-{}-{}", service_account, state.tokens_issued.len()))
        }
    }
}
