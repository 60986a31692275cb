//! kedactl - stand up KEDA-scaled workloads on Kubernetes
//!
//! kedactl connects to a cluster, makes sure Helm and the KEDA autoscaler are
//! installed, and creates or inspects a single KEDA-scaled Deployment, either
//! from API objects built in-process or from a Helm chart.
//!
//! # Modules
//!
//! - [`cluster`] - Cluster Client trait and its kube-rs implementation
//! - [`exec`] - External process port (`helm`, `kubectl`, `sh`)
//! - [`workload`] - Deployment, ScaledObject and Helm values documents
//! - [`provision`] - Ordered provisioning with rollback
//! - [`status`] - Deployment health
//! - [`install`] - Install-if-absent for Helm and KEDA
//! - [`summary`] - Cluster overview
//! - [`commands`] - CLI commands
//! - [`config`] - User configuration and kubeconfig resolution
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod cluster;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod install;
pub mod provision;
pub mod retry;
pub mod status;
pub mod summary;
pub mod workload;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

use commands::create_deployment::CreateDeploymentArgs;
use commands::get_status::GetStatusArgs;
use commands::setup_cluster::SetupClusterArgs;
use commands::ClusterArgs;

/// kedactl - automate KEDA-scaled workloads on Kubernetes
#[derive(Parser, Debug)]
#[command(name = "kedactl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Cluster selection
    #[command(flatten)]
    pub cluster: ClusterArgs,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// kedactl commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to the cluster, install Helm and KEDA, and print a summary
    SetupCluster(SetupClusterArgs),
    /// Create a KEDA-enabled Deployment
    CreateDeployment(CreateDeploymentArgs),
    /// Show the health status of a Deployment
    GetStatus(GetStatusArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::SetupCluster(args) => commands::setup_cluster::run(args, &self.cluster).await,
            Commands::CreateDeployment(args) => {
                commands::create_deployment::run(args, &self.cluster).await
            }
            Commands::GetStatus(args) => commands::get_status::run(args, &self.cluster).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::parse_from([
            "kedactl",
            "get-status",
            "--name",
            "my-app",
            "--kubeconfig",
            "/tmp/kc",
            "--context",
            "kind-dev",
        ]);
        assert_eq!(cli.cluster.kubeconfig.as_deref(), Some("/tmp/kc"));
        assert_eq!(cli.cluster.context.as_deref(), Some("kind-dev"));
        match cli.command {
            Commands::GetStatus(args) => {
                assert_eq!(args.name, "my-app");
                assert_eq!(args.namespace, "default");
            }
            other => panic!("Expected GetStatus, got {other:?}"),
        }
    }

    #[test]
    fn setup_cluster_takes_no_arguments() {
        let cli = Cli::parse_from(["kedactl", "setup-cluster"]);
        assert!(matches!(cli.command, Commands::SetupCluster(_)));
    }

    #[test]
    fn create_deployment_requires_metric_flags() {
        let result = Cli::try_parse_from([
            "kedactl",
            "create-deployment",
            "--name",
            "my-app",
            "--image",
            "nginx",
        ]);
        assert!(result.is_err());
    }
}
