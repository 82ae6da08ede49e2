//! Kuscia domain authorization controller

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kuscia_domain_auth::auth::AuthConfig;
use kuscia_domain_auth::controller::{error_policy, reconcile, Context};
use kuscia_domain_auth::crd::{ClusterDomainRoute, Domain};
use kuscia_domain_auth::{
    DEFAULT_DOMAIN_CLUSTER_ROLE, DEFAULT_NAMESPACE, DEFAULT_ROOT_DIR, FIELD_MANAGER,
};

/// Provisions RBAC and trust routes for domains joining a Kuscia federation
#[derive(Parser, Debug)]
#[command(name = "kuscia-domain-auth", version, about, long_about = None)]
struct Cli {
    /// Generate CRD manifests and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    ///
    /// Watches Domain objects and provisions each one until it carries the
    /// domain-auth completion label.
    Controller(ControllerArgs),
}

/// Controller mode arguments
#[derive(Args, Debug, Clone)]
struct ControllerArgs {
    /// Namespace the controller runs in; trust routes point here
    #[arg(long, env = "KUSCIA_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    namespace: String,

    /// Root directory containing etc/conf/domain-namespace-res.yaml
    #[arg(long, env = "KUSCIA_ROOT_DIR", default_value = DEFAULT_ROOT_DIR)]
    root_dir: PathBuf,

    /// ClusterRole bound to every non-partner domain
    #[arg(
        long,
        env = "KUSCIA_DOMAIN_CLUSTER_ROLE",
        default_value = DEFAULT_DOMAIN_CLUSTER_ROLE
    )]
    cluster_role: String,
}

impl Default for ControllerArgs {
    fn default() -> Self {
        let config = AuthConfig::default();
        Self {
            namespace: config.namespace,
            root_dir: config.root_dir,
            cluster_role: config.cluster_role,
        }
    }
}

impl From<ControllerArgs> for AuthConfig {
    fn from(args: ControllerArgs) -> Self {
        AuthConfig::default()
            .namespace(args.namespace)
            .root_dir(args.root_dir)
            .cluster_role(args.cluster_role)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let domain = serde_yaml::to_string(&Domain::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize Domain CRD: {}", e))?;
        let route = serde_yaml::to_string(&ClusterDomainRoute::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize ClusterDomainRoute CRD: {}", e))?;
        println!("{domain}---\n{route}");
        return Ok(());
    }

    match cli.command {
        Some(Commands::Controller(args)) => run_controller(args.into()).await,
        None => run_controller(ControllerArgs::default().into()).await,
    }
}

/// CRDs installed at startup, keyed by their full name
///
/// Domain objects and their CRD belong to the federation control plane; this
/// controller only labels them, so the Domain schema is printed by `--crd`
/// but never applied.
fn managed_crds() -> Vec<(&'static str, CustomResourceDefinition)> {
    vec![(
        "clusterdomainroutes.kuscia.secretflow",
        ClusterDomainRoute::crd(),
    )]
}

/// Install the ClusterDomainRoute CRD if no other manager owns it
///
/// Applied without forcing, so a CRD already managed by the control plane
/// is left as it is.
async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    use kube::api::{Patch, PatchParams};

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER);

    for (name, crd) in managed_crds() {
        tracing::info!(crd = %name, "Installing CRD...");
        match crds.patch(name, &params, &Patch::Apply(&crd)).await {
            Ok(_) => {}
            Err(kube::Error::Api(ae)) if ae.code == 409 => {
                tracing::warn!(
                    crd = %name,
                    reason = %ae.message,
                    "CRD owned by another manager, leaving it unchanged"
                );
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to install CRD {}: {}", name, e)),
        }
    }

    Ok(())
}

/// Run the Domain controller until a shutdown signal arrives
async fn run_controller(config: AuthConfig) -> anyhow::Result<()> {
    tracing::info!(
        namespace = %config.namespace,
        role_template = %config.role_template_path().display(),
        cluster_role = %config.cluster_role,
        "Domain auth controller starting..."
    );

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    ensure_crds_installed(&client).await?;

    let domains: Api<Domain> = Api::all(client.clone());
    let ctx = Arc::new(Context::new(client, &config));

    Controller::new(domains, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok(action) => {
                    tracing::debug!(?action, "Domain reconciliation completed");
                }
                Err(e) => {
                    tracing::error!(error = ?e, "Domain reconciliation error");
                }
            }
        })
        .await;

    tracing::info!("Domain auth controller stopped");
    Ok(())
}
