//! `kedactl setup-cluster` - install Helm and KEDA, then summarize the cluster

use std::sync::Arc;

use clap::Args;
use tracing::info;

use super::format::print_table;
use super::{ClusterArgs, Session};
use crate::cluster::ClusterClient;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::install::{InstallOutcome, Installer, Tool};
use crate::summary::ClusterSummary;
use crate::{Error, Result};

/// Connect, install Helm and KEDA if missing, and print a summary
#[derive(Args, Debug, Default)]
pub struct SetupClusterArgs {}

/// Run the command
pub async fn run(_args: SetupClusterArgs, cluster_args: &ClusterArgs) -> Result<()> {
    println!("--- Setting up Kubernetes Cluster ---");
    let session = Session::connect(cluster_args).await?;
    println!("Cluster connection successful.");

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let installer = Installer::new(session.cluster.clone(), runner.clone())
        .with_keda_readiness(session.config.keda_readiness());

    let summary = setup(&installer, session.cluster.as_ref(), runner.as_ref()).await?;

    println!("\n--- Kubernetes Cluster Summary ---");
    print_table(&["Metric", "Value"], &summary.table_rows());
    Ok(())
}

/// Install Helm, then KEDA, then collect the summary.
///
/// KEDA is only attempted once Helm is ready; either failure ends the command.
pub async fn setup(
    installer: &Installer,
    cluster: &dyn ClusterClient,
    runner: &dyn CommandRunner,
) -> Result<ClusterSummary> {
    require(installer, Tool::Helm, "Aborting KEDA installation.").await?;
    require(installer, Tool::Keda, "").await?;

    info!("Collecting cluster summary");
    Ok(ClusterSummary::collect(cluster, runner).await)
}

async fn require(installer: &Installer, tool: Tool, on_failure: &str) -> Result<()> {
    match installer.ensure_installed(tool).await {
        InstallOutcome::Ready => {
            println!("{} installation successful.", tool);
            Ok(())
        }
        InstallOutcome::Failed { reason } => {
            println!("{} installation failed. {}", tool, on_failure);
            Err(Error::command_failed(format!("install {}", tool), reason))
        }
    }
}
