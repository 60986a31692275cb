//! Provisioning by submitting objects straight to the API server

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use super::{ensure_namespace, read_back, ProvisionResult, Provisioner};
use crate::cluster::ClusterClient;
use crate::retry::RetryConfig;
use crate::workload::{DeploymentRequest, ResourceBuilder};
use crate::Result;

/// Creates the Namespace, Deployment and ScaledObject built in-process
pub struct ApiProvisioner {
    cluster: Arc<dyn ClusterClient>,
    readback: RetryConfig,
}

impl ApiProvisioner {
    /// Create a provisioner that reads the Deployment back once
    pub fn new(cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            cluster,
            readback: RetryConfig::with_max_attempts(1),
        }
    }

    /// Override the read-back budget
    pub fn with_readback(mut self, readback: RetryConfig) -> Self {
        self.readback = readback;
        self
    }

    /// Delete the Deployment after the ScaledObject could not be created.
    ///
    /// A failure here is logged only; the caller returns the original error.
    async fn roll_back(&self, req: &DeploymentRequest) {
        info!(name = %req.name, namespace = %req.namespace, "Rolling back Deployment");
        if let Err(e) = self
            .cluster
            .delete_deployment(&req.name, &req.namespace)
            .await
        {
            error!(
                name = %req.name,
                namespace = %req.namespace,
                error = %e,
                "Rollback failed, Deployment left behind"
            );
        }
    }
}

#[async_trait]
impl Provisioner for ApiProvisioner {
    async fn provision(&self, req: &DeploymentRequest) -> Result<ProvisionResult> {
        req.validate()?;

        ensure_namespace(self.cluster.as_ref(), &req.namespace).await?;

        let deployment = ResourceBuilder::deployment(req);
        self.cluster.create_deployment(&deployment).await?;
        info!(name = %req.name, namespace = %req.namespace, "Created Deployment");

        let scaled_object = ResourceBuilder::scaled_object(req);
        if let Err(e) = self.cluster.create_scaled_object(&scaled_object).await {
            error!(
                name = %scaled_object.metadata.name,
                namespace = %req.namespace,
                error = %e,
                "Failed to create ScaledObject"
            );
            self.roll_back(req).await;
            return Err(e);
        }
        info!(
            name = %scaled_object.metadata.name,
            namespace = %req.namespace,
            "Created ScaledObject"
        );

        let readback = read_back(
            self.cluster.as_ref(),
            &req.name,
            &req.namespace,
            &self.readback,
        )
        .await;

        Ok(ProvisionResult::new(req, &req.name).with_readback(readback))
    }
}
