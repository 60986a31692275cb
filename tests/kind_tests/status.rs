//! Stories about reading workload health from a real cluster

use kedactl::provision::{ApiProvisioner, Provisioner};
use kedactl::status::StatusReporter;

use super::helpers::{cleanup_namespace, connect, nginx_request, unique_namespace};

/// Story: asking for a Deployment that was never created is not an error
#[tokio::test]
#[ignore]
async fn story_missing_deployment_has_no_health() {
    let (cluster, _client) = connect().await;
    let reporter = StatusReporter::new(cluster);

    let health = reporter
        .get_health("does-not-exist", "default")
        .await
        .expect("lookup should succeed");
    assert!(health.is_none());
}

/// Story: a freshly provisioned Deployment reports its replica target
#[tokio::test]
#[ignore]
async fn story_provisioned_deployment_reports_health() {
    let (cluster, client) = connect().await;
    let namespace = unique_namespace("kedactl-status");

    ApiProvisioner::new(cluster.clone())
        .provision(&nginx_request("web", &namespace))
        .await
        .expect("provisioning should succeed");

    let health = StatusReporter::new(cluster)
        .get_health("web", &namespace)
        .await
        .expect("lookup should succeed")
        .expect("Deployment exists");
    assert_eq!(health.name, "web");
    assert_eq!(health.namespace, namespace);

    cleanup_namespace(&client, &namespace).await;
}
