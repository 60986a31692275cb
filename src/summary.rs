//! Read-only overview of the cluster printed after `setup-cluster`

use serde::Serialize;

use crate::cluster::ClusterClient;
use crate::exec::{args, CommandRunner};
use crate::install::{KEDA_NAMESPACE, KEDA_OPERATOR};
use crate::workload::ScaledObject;

const NOT_AVAILABLE: &str = "N/A";
const NAMESPACES_SHOWN: usize = 5;

/// One `Metric | Value` row
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SummaryRow {
    /// Metric name
    pub metric: String,
    /// Rendered value
    pub value: String,
}

impl SummaryRow {
    fn new(metric: &str, value: impl Into<String>) -> Self {
        Self {
            metric: metric.to_string(),
            value: value.into(),
        }
    }
}

/// Cluster overview in a fixed row order
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ClusterSummary {
    /// Rows, in display order
    pub rows: Vec<SummaryRow>,
}

impl ClusterSummary {
    /// Query the cluster and local tools.
    ///
    /// The queries are independent and run concurrently; a failing query
    /// degrades its own rows to `N/A` rather than failing the summary.
    pub async fn collect(cluster: &dyn ClusterClient, runner: &dyn CommandRunner) -> Self {
        let (client_version, server_version, nodes, namespaces, helm_version, keda_crd, operator) = tokio::join!(
            kubectl_client_version(runner),
            cluster.server_version(),
            cluster.list_node_names(),
            cluster.list_namespace_names(),
            helm_version(runner),
            cluster.crd_exists(ScaledObject::CRD_NAME),
            cluster.get_deployment(KEDA_OPERATOR, KEDA_NAMESPACE),
        );

        let mut rows = vec![
            SummaryRow::new(
                "Kubernetes Client Version",
                client_version.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ),
            SummaryRow::new(
                "Kubernetes Server Version",
                server_version.unwrap_or_else(|_| NOT_AVAILABLE.to_string()),
            ),
        ];

        match nodes {
            Ok(names) => {
                rows.push(SummaryRow::new("Number of Nodes", names.len().to_string()));
                rows.push(SummaryRow::new("Node Names", names.join(", ")));
            }
            Err(_) => {
                rows.push(SummaryRow::new("Number of Nodes", NOT_AVAILABLE));
                rows.push(SummaryRow::new("Node Names", NOT_AVAILABLE));
            }
        }

        match namespaces {
            Ok(names) => {
                rows.push(SummaryRow::new(
                    "Number of Namespaces",
                    names.len().to_string(),
                ));
                rows.push(SummaryRow::new("Namespaces", truncate_names(&names)));
            }
            Err(_) => {
                rows.push(SummaryRow::new("Number of Namespaces", NOT_AVAILABLE));
                rows.push(SummaryRow::new("Namespaces", NOT_AVAILABLE));
            }
        }

        match helm_version {
            Some(version) => {
                rows.push(SummaryRow::new("Helm Installed", "Yes"));
                rows.push(SummaryRow::new("Helm Version", version));
            }
            None => {
                rows.push(SummaryRow::new("Helm Installed", "No"));
                rows.push(SummaryRow::new("Helm Version", NOT_AVAILABLE));
            }
        }

        let (installed, running) = match keda_crd {
            Ok(true) => match operator {
                Ok(Some(_)) => ("Yes", "Yes"),
                Ok(None) => ("Yes", "No (Deployment not found)"),
                Err(_) => ("Yes", NOT_AVAILABLE),
            },
            Ok(false) => ("No (CRD not found)", NOT_AVAILABLE),
            Err(_) => ("No (check failed)", NOT_AVAILABLE),
        };
        rows.push(SummaryRow::new("KEDA Installed", installed));
        rows.push(SummaryRow::new("KEDA Operator Running", running));

        Self { rows }
    }

    /// Rows as table cells
    pub fn table_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|r| vec![r.metric.clone(), r.value.clone()])
            .collect()
    }
}

/// First line of `kubectl version --client`
async fn kubectl_client_version(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner
        .run("kubectl", &args(["version", "--client"]))
        .await
        .ok()?;
    if !output.success() {
        return None;
    }
    let line = output.stdout.lines().next()?.trim();
    Some(line.trim_start_matches("Client Version:").trim().to_string())
}

/// `helm version --short`, or `None` when Helm is unusable
async fn helm_version(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner
        .run("helm", &args(["version", "--short"]))
        .await
        .ok()?;
    output.success().then(|| output.stdout.trim().to_string())
}

/// First five names, comma-joined, with `...` when there are more
fn truncate_names(names: &[String]) -> String {
    let shown = names
        .iter()
        .take(NAMESPACES_SHOWN)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > NAMESPACES_SHOWN {
        format!("{}...", shown)
    } else {
        shown
    }
}
