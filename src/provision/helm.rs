//! Provisioning through a Helm chart
//!
//! The chart renders the Deployment and ScaledObject from a values file
//! written to a temporary location. `helm install --wait` is atomic from our
//! side, so there is nothing to roll back here: a failed install leaves no
//! objects kedactl created.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{ensure_namespace, read_back, ProvisionResult, Provisioner};
use crate::cluster::ClusterClient;
use crate::exec::{run_checked, CommandRunner};
use crate::retry::RetryConfig;
use crate::workload::{DeploymentRequest, ResourceBuilder};
use crate::Result;

/// Chart used when neither `--chart-path` nor the config file names one
pub const DEFAULT_CHART_PATH: &str = "./charts/my-app-chart";

const HELM: &str = "helm";

/// Installs a chart as a release named after the request
pub struct HelmProvisioner {
    cluster: Arc<dyn ClusterClient>,
    runner: Arc<dyn CommandRunner>,
    chart: String,
    readback: RetryConfig,
}

impl HelmProvisioner {
    /// Create a provisioner for `chart`
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        runner: Arc<dyn CommandRunner>,
        chart: impl Into<String>,
    ) -> Self {
        Self {
            cluster,
            runner,
            chart: chart.into(),
            readback: RetryConfig::with_max_attempts(crate::config::DEFAULT_READBACK_ATTEMPTS),
        }
    }

    /// Override the read-back budget
    pub fn with_readback(mut self, readback: RetryConfig) -> Self {
        self.readback = readback;
        self
    }

    /// Write the values file and run `helm install`.
    ///
    /// The values file is removed when this returns, whatever the outcome.
    async fn install(&self, req: &DeploymentRequest) -> Result<()> {
        let values = serde_yaml::to_string(&ResourceBuilder::helm_values(req))?;

        let mut values_file = tempfile::Builder::new()
            .prefix("kedactl-values-")
            .suffix(".yaml")
            .tempfile()?;
        values_file.write_all(values.as_bytes())?;
        values_file.flush()?;

        let args = vec![
            "install".to_string(),
            req.name.clone(),
            self.chart.clone(),
            "--namespace".to_string(),
            req.namespace.clone(),
            "-f".to_string(),
            values_file.path().display().to_string(),
            "--wait".to_string(),
        ];

        info!(
            release = %req.name,
            chart = %self.chart,
            namespace = %req.namespace,
            "Installing Helm chart"
        );
        let result = run_checked(self.runner.as_ref(), HELM, &args).await;
        drop(values_file);

        let output = result?;
        if !output.stderr.trim().is_empty() {
            warn!(release = %req.name, stderr = %output.stderr.trim(), "helm install wrote to stderr");
        }
        info!(release = %req.name, "Helm release installed");
        Ok(())
    }

    /// Name of the Deployment the chart rendered.
    ///
    /// Taken from the release manifest; falls back to the common
    /// `<release>-<chart>` naming when the manifest is unavailable.
    async fn workload_name(&self, release: &str, namespace: &str) -> String {
        let args = vec![
            "get".to_string(),
            "manifest".to_string(),
            release.to_string(),
            "-n".to_string(),
            namespace.to_string(),
        ];

        match run_checked(self.runner.as_ref(), HELM, &args).await {
            Ok(output) => {
                if let Some(name) = deployment_name_from_manifest(&output.stdout) {
                    debug!(release = %release, deployment = %name, "Resolved workload from manifest");
                    return name;
                }
                debug!(release = %release, "Release manifest has no Deployment");
            }
            Err(e) => {
                warn!(release = %release, error = %e, "Could not read release manifest");
            }
        }

        fallback_workload_name(release, &self.chart)
    }
}

#[async_trait]
impl Provisioner for HelmProvisioner {
    async fn provision(&self, req: &DeploymentRequest) -> Result<ProvisionResult> {
        req.validate()?;

        ensure_namespace(self.cluster.as_ref(), &req.namespace).await?;

        self.install(req).await?;

        let workload_name = self.workload_name(&req.name, &req.namespace).await;
        let readback = read_back(
            self.cluster.as_ref(),
            &workload_name,
            &req.namespace,
            &self.readback,
        )
        .await;

        let mut result = ProvisionResult::new(req, workload_name).with_readback(readback);
        result.helm_release = Some(req.name.clone());
        result.endpoints = ResourceBuilder::helm_endpoints(req);
        Ok(result)
    }
}

/// `metadata.name` of the first Deployment in a multi-document manifest
fn deployment_name_from_manifest(manifest: &str) -> Option<String> {
    for document in serde_yaml::Deserializer::from_str(manifest) {
        let Ok(value) = serde_yaml::Value::deserialize(document) else {
            continue;
        };
        if value.get("kind").and_then(|k| k.as_str()) != Some("Deployment") {
            continue;
        }
        if let Some(name) = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(|n| n.as_str())
        {
            return Some(name.to_string());
        }
    }
    None
}

/// `<release>-<chart directory name>`
fn fallback_workload_name(release: &str, chart: &str) -> String {
    let chart_name = Path::new(chart)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| chart.to_string());
    format!("{}-{}", release, chart_name)
}
