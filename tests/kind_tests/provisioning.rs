//! Stories about provisioning KEDA-scaled Deployments on a real cluster

use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, DynamicObject, PostParams};

use kedactl::cluster::{scaled_object_resource, ClusterClient};
use kedactl::provision::{ensure_namespace, ApiProvisioner, Provisioner};
use kedactl::workload::{scaled_object_name, ResourceBuilder};
use kedactl::Error;

use super::helpers::{cleanup_namespace, connect, nginx_request, unique_namespace};

/// Story: a platform engineer creates nginx scaled on CPU in a fresh namespace
#[tokio::test]
#[ignore]
async fn story_provision_creates_deployment_and_scaled_object() {
    let (cluster, client) = connect().await;
    let namespace = unique_namespace("kedactl-provision");

    let result = ApiProvisioner::new(cluster.clone())
        .provision(&nginx_request("web", &namespace))
        .await
        .expect("provisioning should succeed");

    assert_eq!(result.workload_name, "web");
    assert_eq!(result.endpoints, vec!["Internal Port: 80"]);

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), &namespace);
    let deployment = deployments.get("web").await.expect("Deployment exists");
    assert_eq!(deployment.spec.and_then(|s| s.replicas), Some(1));

    let scaled_objects: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &namespace, &scaled_object_resource());
    let so = scaled_objects
        .get(&scaled_object_name("web"))
        .await
        .expect("ScaledObject exists");
    assert_eq!(so.data["spec"]["scaleTargetRef"]["name"], "web");

    cleanup_namespace(&client, &namespace).await;
}

/// Story: running the same request twice conflicts instead of duplicating
#[tokio::test]
#[ignore]
async fn story_second_provision_conflicts() {
    let (cluster, client) = connect().await;
    let namespace = unique_namespace("kedactl-conflict");
    let provisioner = ApiProvisioner::new(cluster.clone());
    let request = nginx_request("web", &namespace);

    provisioner.provision(&request).await.expect("first run");
    let err = provisioner.provision(&request).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    cleanup_namespace(&client, &namespace).await;
}

/// Story: ensuring a namespace twice is harmless
#[tokio::test]
#[ignore]
async fn story_namespace_ensure_is_idempotent() {
    let (cluster, client) = connect().await;
    let namespace = unique_namespace("kedactl-ns");

    ensure_namespace(cluster.as_ref(), &namespace).await.unwrap();
    ensure_namespace(cluster.as_ref(), &namespace).await.unwrap();
    assert!(cluster.namespace_exists(&namespace).await.unwrap());

    cleanup_namespace(&client, &namespace).await;
}

/// Story: the autoscaling policy is rejected, so the Deployment created just
/// before it is removed again and the rejection is what the user sees
#[tokio::test]
#[ignore]
async fn story_rejected_scaled_object_rolls_back_deployment() {
    let (cluster, client) = connect().await;
    let namespace = unique_namespace("kedactl-rollback");
    let request = nginx_request("web", &namespace);

    // Occupy the ScaledObject name so the provisioner's create conflicts
    ensure_namespace(cluster.as_ref(), &namespace).await.unwrap();
    let blocker = serde_json::to_value(ResourceBuilder::scaled_object(&request)).unwrap();
    let blocker: DynamicObject = serde_json::from_value(blocker).unwrap();
    let scaled_objects: Api<DynamicObject> =
        Api::namespaced_with(client.clone(), &namespace, &scaled_object_resource());
    scaled_objects
        .create(&PostParams::default(), &blocker)
        .await
        .expect("blocking ScaledObject");

    let err = ApiProvisioner::new(cluster.clone())
        .provision(&request)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists { .. }));

    let leftover = cluster.get_deployment("web", &namespace).await.unwrap();
    assert!(
        leftover.map_or(true, |d| d.metadata.deletion_timestamp.is_some()),
        "Deployment should be rolled back"
    );

    cleanup_namespace(&client, &namespace).await;
}
