//! Shared setup for the live-cluster tests

use std::sync::Arc;

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams};
use kube::Client;
use rand::Rng;

use kedactl::cluster::{ClusterClient, KubeClusterClient};
use kedactl::workload::{DeploymentRequest, EventSourceConfig, ResourceSettings};

/// Connect using the ambient kubeconfig, panicking with a hint when no
/// cluster is reachable
pub async fn connect() -> (Arc<dyn ClusterClient>, Client) {
    let cluster = KubeClusterClient::connect(None, None)
        .await
        .expect("a reachable cluster (try `kind create cluster`)");
    let client = Client::try_default().await.expect("kube client");
    (Arc::new(cluster), client)
}

/// Namespace name unique to one test run
pub fn unique_namespace(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0xFFFFFF);
    format!("{}-{:06x}", prefix, suffix)
}

/// nginx scaled on cpu, in `namespace`
pub fn nginx_request(name: &str, namespace: &str) -> DeploymentRequest {
    DeploymentRequest {
        name: name.to_string(),
        namespace: namespace.to_string(),
        image: "nginx".to_string(),
        tag: "latest".to_string(),
        resources: ResourceSettings::default(),
        container_port: 80,
        min_replicas: 1,
        max_replicas: 3,
        scaling_metric_type: "cpu".to_string(),
        scaling_metric_value: "50".to_string(),
        event_source_config: EventSourceConfig::default(),
    }
}

/// Delete a test namespace and everything in it
pub async fn cleanup_namespace(client: &Client, namespace: &str) {
    let api: Api<Namespace> = Api::all(client.clone());
    let _ = api.delete(namespace, &DeleteParams::default()).await;
}
