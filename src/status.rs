//! Status Reporter: health of a provisioned workload
//!
//! Health is read fresh from the Deployment on every call.

use std::sync::Arc;

use k8s_openapi::api::apps::v1::Deployment as K8sDeployment;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cluster::ClusterClient;
use crate::Result;

/// One Deployment condition
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    /// Condition type (`Available`, `Progressing`, ...)
    #[serde(rename = "type")]
    pub type_: String,
    /// `True`, `False` or `Unknown`
    pub status: String,
    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Replica counts and conditions of a Deployment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Deployment name
    pub name: String,
    /// Namespace
    pub namespace: String,
    /// Ready replicas
    pub ready_replicas: u32,
    /// Replicas running the latest template
    pub updated_replicas: u32,
    /// Available replicas
    pub available_replicas: u32,
    /// Replicas reported in status
    pub total_replicas: u32,
    /// Conditions in the order the API server reports them
    pub conditions: Vec<Condition>,
}

impl HealthStatus {
    /// Build from a Deployment; absent counters read as 0
    pub fn from_deployment(name: &str, namespace: &str, deployment: &K8sDeployment) -> Self {
        let status = deployment.status.as_ref();
        let count = |v: Option<i32>| v.unwrap_or(0).max(0) as u32;

        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conds| {
                conds
                    .iter()
                    .map(|c| Condition {
                        type_: c.type_.clone(),
                        status: c.status.clone(),
                        reason: c.reason.clone(),
                        message: c.message.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ready_replicas: count(status.and_then(|s| s.ready_replicas)),
            updated_replicas: count(status.and_then(|s| s.updated_replicas)),
            available_replicas: count(status.and_then(|s| s.available_replicas)),
            total_replicas: count(status.and_then(|s| s.replicas)),
            conditions,
        }
    }

    /// Whether every reported replica is ready
    pub fn is_healthy(&self) -> bool {
        self.total_replicas > 0 && self.ready_replicas >= self.total_replicas
    }

    /// Summary rows as `(field, value)` pairs
    pub fn summary_rows(&self) -> Vec<Vec<String>> {
        vec![
            vec!["Name".to_string(), self.name.clone()],
            vec!["Namespace".to_string(), self.namespace.clone()],
            vec!["Ready Replicas".to_string(), self.ready_replicas.to_string()],
            vec!["Updated Replicas".to_string(), self.updated_replicas.to_string()],
            vec![
                "Available Replicas".to_string(),
                self.available_replicas.to_string(),
            ],
            vec!["Total Replicas".to_string(), self.total_replicas.to_string()],
        ]
    }

    /// Condition rows as `(type, status, reason, message)`
    pub fn condition_rows(&self) -> Vec<Vec<String>> {
        self.conditions
            .iter()
            .map(|c| {
                vec![
                    c.type_.clone(),
                    c.status.clone(),
                    c.reason.clone().unwrap_or_default(),
                    c.message.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }
}

/// Reads workload health through the cluster client
pub struct StatusReporter {
    cluster: Arc<dyn ClusterClient>,
}

impl StatusReporter {
    /// Create a reporter
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self { cluster }
    }

    /// Current health of `name`, or `None` when the Deployment does not exist
    pub async fn get_health(&self, name: &str, namespace: &str) -> Result<Option<HealthStatus>> {
        let Some(deployment) = self.cluster.get_deployment(name, namespace).await? else {
            debug!(name = %name, namespace = %namespace, "Deployment not found");
            return Ok(None);
        };
        Ok(Some(HealthStatus::from_deployment(
            name,
            namespace,
            &deployment,
        )))
    }
}
