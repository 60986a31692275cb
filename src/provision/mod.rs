//! Provisioner: stands up one KEDA-scaled workload
//!
//! Both strategies walk the same ordered sequence, each step its own failure
//! domain:
//!
//! 1. Ensure the namespace exists
//! 2. Create the workload (Deployment)
//! 3. Create the autoscaling policy (ScaledObject), deleting the Deployment
//!    again if this fails
//! 4. Read the Deployment back for replica counts
//!
//! [`ApiProvisioner`] submits the objects directly; [`HelmProvisioner`] lets
//! a chart render them and covers steps 2-3 with one `helm install`.

mod api;
mod helm;

pub use api::ApiProvisioner;
pub use helm::{HelmProvisioner, DEFAULT_CHART_PATH};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as K8sDeployment;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cluster::ClusterClient;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::workload::{DeploymentRequest, EventSourceConfig, ResourceBuilder};
use crate::{Error, Result};

/// Scaling settings echoed back to the user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScalingConfig {
    /// Minimum replicas
    pub min_replicas: u32,
    /// Maximum replicas
    pub max_replicas: u32,
    /// KEDA trigger type
    pub metric_type: String,
    /// Trigger target value
    pub metric_value: String,
    /// Extra trigger metadata
    pub event_source: EventSourceConfig,
}

impl ScalingConfig {
    fn from_request(req: &DeploymentRequest) -> Self {
        Self {
            min_replicas: req.min_replicas,
            max_replicas: req.max_replicas,
            metric_type: req.scaling_metric_type.clone(),
            metric_value: req.scaling_metric_value.clone(),
            event_source: req.event_source_config.clone(),
        }
    }
}

/// Replica counts read back after provisioning
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplicaSummary {
    /// Replicas requested in the Deployment spec
    pub desired: u32,
    /// Replicas reported in status
    pub current: u32,
    /// Ready replicas
    pub ready: u32,
    /// Available replicas
    pub available: u32,
}

impl ReplicaSummary {
    /// Extract counts from a Deployment; missing counters read as 0
    pub fn from_deployment(deployment: &K8sDeployment) -> Self {
        let desired = deployment
            .spec
            .as_ref()
            .and_then(|s| s.replicas)
            .unwrap_or(0);
        let status = deployment.status.as_ref();
        let count = |f: fn(&k8s_openapi::api::apps::v1::DeploymentStatus) -> Option<i32>| {
            status.and_then(f).unwrap_or(0).max(0) as u32
        };

        Self {
            desired: desired.max(0) as u32,
            current: count(|s| s.replicas),
            ready: count(|s| s.ready_replicas),
            available: count(|s| s.available_replicas),
        }
    }
}

/// What a successful provision created
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProvisionResult {
    /// Helm release name, for the Helm strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helm_release: Option<String>,
    /// Name of the Deployment in the cluster
    pub workload_name: String,
    /// Namespace
    pub namespace: String,
    /// Full image reference
    pub image: String,
    /// How to reach the workload
    pub endpoints: Vec<String>,
    /// Scaling settings
    pub scaling_config: ScalingConfig,
    /// Replica counts, absent when the read-back failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<ReplicaSummary>,
    /// Non-fatal problems encountered after the resources were created
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ProvisionResult {
    fn new(req: &DeploymentRequest, workload_name: impl Into<String>) -> Self {
        Self {
            helm_release: None,
            workload_name: workload_name.into(),
            namespace: req.namespace.clone(),
            image: req.image_ref(),
            endpoints: ResourceBuilder::endpoints(req),
            scaling_config: ScalingConfig::from_request(req),
            replicas: None,
            warnings: Vec::new(),
        }
    }

    /// Record the outcome of the read-back step
    fn with_readback(mut self, readback: std::result::Result<ReplicaSummary, String>) -> Self {
        match readback {
            Ok(summary) => self.replicas = Some(summary),
            Err(warning) => self.warnings.push(warning),
        }
        self
    }
}

/// Creates a KEDA-scaled workload from a [`DeploymentRequest`]
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Run the full provisioning sequence.
    ///
    /// Returns a result only when every resource was created; any failure
    /// returns the error and no partial result.
    async fn provision(&self, req: &DeploymentRequest) -> Result<ProvisionResult>;
}

/// Make sure `name` exists, creating it if needed.
///
/// Idempotent: an existing namespace is left alone, and a create that loses a
/// race to another writer counts as success. Any other read error aborts
/// before anything is mutated.
pub async fn ensure_namespace(cluster: &dyn ClusterClient, name: &str) -> Result<()> {
    if cluster.namespace_exists(name).await? {
        debug!(namespace = %name, "Namespace already exists");
        return Ok(());
    }

    match cluster
        .create_namespace(&ResourceBuilder::namespace(name))
        .await
    {
        Ok(()) => {
            info!(namespace = %name, "Created namespace");
            Ok(())
        }
        Err(Error::AlreadyExists { .. }) => {
            debug!(namespace = %name, "Namespace created concurrently");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Read the Deployment back until it is visible or the budget runs out.
///
/// Failure comes back as a warning message, not an error: by the time this
/// runs the resources already exist.
pub async fn read_back(
    cluster: &dyn ClusterClient,
    name: &str,
    namespace: &str,
    config: &RetryConfig,
) -> std::result::Result<ReplicaSummary, String> {
    let result = retry_with_backoff(config, "read_back_deployment", || async move {
        match cluster.get_deployment(name, namespace).await? {
            Some(deployment) => Ok(ReplicaSummary::from_deployment(&deployment)),
            None => Err(Error::not_found("Deployment", name, namespace)),
        }
    })
    .await;

    result.map_err(|e| {
        warn!(name = %name, namespace = %namespace, error = %e, "Deployment read-back failed");
        format!("resources created but status read-back failed: {}", e)
    })
}
