//! CLI commands

use std::sync::Arc;

use clap::Args;
use tracing::debug;

use crate::cluster::{ClusterClient, KubeClusterClient};
use crate::config::{load_config, resolve_kubeconfig, KedactlConfig};
use crate::Result;

pub mod create_deployment;
pub mod format;
pub mod get_status;
pub mod setup_cluster;

/// Flags selecting the cluster, shared by every command
#[derive(Args, Clone, Debug, Default)]
pub struct ClusterArgs {
    /// Path to kubeconfig file (default: $KEDACTL_KUBECONFIG, config file, then kube defaults)
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Kubeconfig context to use (default: current context)
    #[arg(long, global = true)]
    pub context: Option<String>,
}

/// Connected cluster plus the user's configuration
pub struct Session {
    /// Cluster handle shared by every component
    pub cluster: Arc<dyn ClusterClient>,
    /// Loaded `~/.kedactl/config.json`
    pub config: KedactlConfig,
}

impl Session {
    /// Load configuration and connect once for the whole command
    pub async fn connect(args: &ClusterArgs) -> Result<Self> {
        let config = load_config()?;
        let kubeconfig = resolve_kubeconfig(args.kubeconfig.as_deref(), &config);
        debug!(kubeconfig = ?kubeconfig, context = ?args.context, "Connecting to cluster");

        let cluster =
            KubeClusterClient::connect(kubeconfig.as_deref(), args.context.as_deref()).await?;
        Ok(Self {
            cluster: Arc::new(cluster),
            config,
        })
    }
}
