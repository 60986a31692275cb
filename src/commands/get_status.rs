//! `kedactl get-status` - health of a Deployment

use clap::Args;

use super::format::{print_table, render_document, OutputFormat};
use super::{ClusterArgs, Session};
use crate::status::{HealthStatus, StatusReporter};
use crate::{Error, Result};

/// Show the health status of a Deployment
#[derive(Args, Debug, Clone)]
pub struct GetStatusArgs {
    /// Deployment name
    #[arg(long)]
    pub name: String,

    /// Namespace of the Deployment
    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,
}

/// Run the command
pub async fn run(args: GetStatusArgs, cluster_args: &ClusterArgs) -> Result<()> {
    println!("--- Getting Health Status for Deployment: {} ---", args.name);
    let session = Session::connect(cluster_args).await?;
    let reporter = StatusReporter::new(session.cluster);

    let health = fetch(&reporter, &args.name, &args.namespace).await?;
    match args.output {
        OutputFormat::Table => print_health(&health),
        format => println!("{}", render_document(&health, format)?),
    }
    Ok(())
}

/// Health of the Deployment; a missing Deployment ends the command
pub async fn fetch(reporter: &StatusReporter, name: &str, namespace: &str) -> Result<HealthStatus> {
    reporter
        .get_health(name, namespace)
        .await?
        .ok_or_else(|| Error::not_found("Deployment", name, namespace))
}

fn print_health(health: &HealthStatus) {
    print_table(&["FIELD", "VALUE"], &health.summary_rows());

    println!();
    if health.conditions.is_empty() {
        println!("No conditions reported.");
    } else {
        print_table(
            &["TYPE", "STATUS", "REASON", "MESSAGE"],
            &health.condition_rows(),
        );
    }
}
