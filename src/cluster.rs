//! Cluster Client: the authenticated handle to the Kubernetes API
//!
//! [`ClusterClient`] is the seam every other component talks to the control
//! plane through. [`KubeClusterClient`] implements it with kube-rs; tests use
//! the generated `MockClusterClient`.
//!
//! Reads that can legitimately miss return `Option` (404 is `None`). Creates
//! map 409 to [`Error::AlreadyExists`] so callers can tell a conflict from a
//! rejection.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as K8sDeployment;
use k8s_openapi::api::core::v1::{Namespace as K8sNamespace, Node};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, DeleteParams, DynamicObject, ListParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, info};

use crate::error::ConnectionErrorExt;
use crate::workload::{Deployment, Namespace, ScaledObject};
use crate::{Error, Result};

/// Timeout for establishing a connection to the API server
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Timeout for reading a response from the API server
pub const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed operations kedactl performs against the cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Whether a namespace exists
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Create a namespace
    async fn create_namespace(&self, namespace: &Namespace) -> Result<()>;

    /// Create a Deployment
    async fn create_deployment(&self, deployment: &Deployment) -> Result<()>;

    /// Delete a Deployment
    async fn delete_deployment(&self, name: &str, namespace: &str) -> Result<()>;

    /// Read a Deployment, including its status
    async fn get_deployment(&self, name: &str, namespace: &str) -> Result<Option<K8sDeployment>>;

    /// Create a KEDA ScaledObject
    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<()>;

    /// Names of all nodes
    async fn list_node_names(&self) -> Result<Vec<String>>;

    /// Names of all namespaces
    async fn list_namespace_names(&self) -> Result<Vec<String>>;

    /// Whether a CustomResourceDefinition is installed
    async fn crd_exists(&self, name: &str) -> Result<bool>;

    /// API server `gitVersion`
    async fn server_version(&self) -> Result<String>;
}

/// [`ClusterClient`] backed by a kube-rs [`Client`]
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the resolved kubeconfig and verify the API server
    /// answers.
    ///
    /// `kubeconfig` of `None` falls back to kube's own inference
    /// (`KUBECONFIG`, `~/.kube/config`, in-cluster). Every failure here is an
    /// [`Error::Connection`].
    pub async fn connect(kubeconfig: Option<&str>, context: Option<&str>) -> Result<Self> {
        let client = create_client(kubeconfig.map(Path::new), context).await?;
        let version = client
            .apiserver_version()
            .await
            .map_err(|e| Error::connection(format!("API server unreachable: {}", e)))?;

        info!(version = %version.git_version, "Connected to Kubernetes cluster");
        Ok(Self::new(client))
    }

    fn scaled_objects(&self, namespace: &str) -> Api<DynamicObject> {
        Api::namespaced_with(self.client.clone(), namespace, &scaled_object_resource())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        let api: Api<K8sNamespace> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        let api: Api<K8sNamespace> = Api::all(self.client.clone());
        let obj: K8sNamespace = convert(namespace)?;
        let name = &namespace.metadata.name;

        api.create(&PostParams::default(), &obj)
            .await
            .map_err(|e| create_error(e, "Namespace", name, ""))?;
        debug!(namespace = %name, "Created namespace");
        Ok(())
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<()> {
        let namespace = deployment.metadata.namespace.as_deref().unwrap_or("default");
        let api: Api<K8sDeployment> = Api::namespaced(self.client.clone(), namespace);
        let obj: K8sDeployment = convert(deployment)?;
        let name = &deployment.metadata.name;

        api.create(&PostParams::default(), &obj)
            .await
            .map_err(|e| create_error(e, "Deployment", name, namespace))?;
        debug!(name = %name, namespace = %namespace, "Created Deployment");
        Ok(())
    }

    async fn delete_deployment(&self, name: &str, namespace: &str) -> Result<()> {
        let api: Api<K8sDeployment> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        debug!(name = %name, namespace = %namespace, "Deleted Deployment");
        Ok(())
    }

    async fn get_deployment(&self, name: &str, namespace: &str) -> Result<Option<K8sDeployment>> {
        let api: Api<K8sDeployment> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn create_scaled_object(&self, scaled_object: &ScaledObject) -> Result<()> {
        let namespace = scaled_object
            .metadata
            .namespace
            .as_deref()
            .unwrap_or("default");
        let obj: DynamicObject = convert(scaled_object)?;
        let name = &scaled_object.metadata.name;

        self.scaled_objects(namespace)
            .create(&PostParams::default(), &obj)
            .await
            .map_err(|e| create_error(e, ScaledObject::KIND, name, namespace))?;
        debug!(name = %name, namespace = %namespace, "Created ScaledObject");
        Ok(())
    }

    async fn list_node_names(&self) -> Result<Vec<String>> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;
        Ok(nodes
            .items
            .into_iter()
            .filter_map(|n| n.metadata.name)
            .collect())
    }

    async fn list_namespace_names(&self) -> Result<Vec<String>> {
        let api: Api<K8sNamespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?;
        Ok(namespaces
            .items
            .into_iter()
            .filter_map(|n| n.metadata.name)
            .collect())
    }

    async fn crd_exists(&self, name: &str) -> Result<bool> {
        let api: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        Ok(api.get_opt(name).await?.is_some())
    }

    async fn server_version(&self) -> Result<String> {
        Ok(self.client.apiserver_version().await?.git_version)
    }
}

/// Build a kube client with connect/read timeouts applied
async fn create_client(kubeconfig: Option<&Path>, context: Option<&str>) -> Result<Client> {
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::connection(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .conn_err()?
        }
        None if context.is_some() => Config::from_kubeconfig(&options).await.conn_err()?,
        None => Config::infer().await.conn_err()?,
    };

    config.connect_timeout = Some(CONNECT_TIMEOUT);
    config.read_timeout = Some(READ_TIMEOUT);
    Client::try_from(config).conn_err()
}

/// `ApiResource` for `keda.sh/v1alpha1` ScaledObjects
pub fn scaled_object_resource() -> ApiResource {
    ApiResource {
        group: ScaledObject::GROUP.to_string(),
        version: ScaledObject::VERSION.to_string(),
        api_version: ScaledObject::API_VERSION.to_string(),
        kind: ScaledObject::KIND.to_string(),
        plural: ScaledObject::PLURAL.to_string(),
    }
}

/// Re-type a kedactl document as the object kube-rs submits
fn convert<T, U>(doc: &T) -> Result<U>
where
    T: serde::Serialize,
    U: serde::de::DeserializeOwned,
{
    Ok(serde_json::from_value(serde_json::to_value(doc)?)?)
}

/// Map a create failure: 409 becomes [`Error::AlreadyExists`]
fn create_error(err: kube::Error, kind: &str, name: &str, namespace: &str) -> Error {
    match err {
        kube::Error::Api(ae) if ae.code == 409 => Error::already_exists(kind, name, namespace),
        other => Error::Kube(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::fixtures::my_app;
    use crate::workload::ResourceBuilder;

    #[test]
    fn scaled_object_resource_points_at_keda_group() {
        let ar = scaled_object_resource();
        assert_eq!(ar.group, "keda.sh");
        assert_eq!(ar.version, "v1alpha1");
        assert_eq!(ar.api_version, "keda.sh/v1alpha1");
        assert_eq!(ar.kind, "ScaledObject");
        assert_eq!(ar.plural, "scaledobjects");
    }

    // ==========================================================================
    // Story: kedactl documents convert into the objects kube-rs submits
    // ==========================================================================

    #[test]
    fn deployment_document_converts_to_typed_deployment() {
        let doc = ResourceBuilder::deployment(&my_app());
        let obj: K8sDeployment = convert(&doc).unwrap();

        assert_eq!(obj.metadata.name.as_deref(), Some("my-app"));
        assert_eq!(obj.metadata.namespace.as_deref(), Some("default"));
        let spec = obj.spec.expect("spec");
        assert_eq!(spec.replicas, Some(1));

        let pod = spec.template.spec.expect("pod spec");
        let container = &pod.containers[0];
        assert_eq!(container.image.as_deref(), Some("nginx:latest"));
        let limits = container
            .resources
            .as_ref()
            .and_then(|r| r.limits.as_ref())
            .expect("limits");
        assert_eq!(limits.get("cpu").map(|q| q.0.as_str()), Some("200m"));
        assert_eq!(limits.get("memory").map(|q| q.0.as_str()), Some("256Mi"));
    }

    #[test]
    fn scaled_object_document_converts_to_dynamic_object() {
        let doc = ResourceBuilder::scaled_object(&my_app());
        let obj: DynamicObject = convert(&doc).unwrap();

        let types = obj.types.expect("type meta");
        assert_eq!(types.api_version, "keda.sh/v1alpha1");
        assert_eq!(types.kind, "ScaledObject");
        assert_eq!(obj.metadata.name.as_deref(), Some("my-app-scaledobject"));
        assert_eq!(obj.data["spec"]["scaleTargetRef"]["name"], "my-app");
        assert_eq!(obj.data["spec"]["triggers"][0]["type"], "cpu");
    }

    #[test]
    fn namespace_document_converts_to_typed_namespace() {
        let obj: K8sNamespace = convert(&ResourceBuilder::namespace("team-a")).unwrap();
        assert_eq!(obj.metadata.name.as_deref(), Some("team-a"));
        assert!(obj.metadata.namespace.is_none());
    }

    #[tokio::test]
    async fn connect_with_missing_kubeconfig_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");

        let result = KubeClusterClient::connect(missing.to_str(), None).await;
        match result {
            Err(Error::Connection { message }) => {
                assert!(message.contains("failed to read kubeconfig"))
            }
            Err(other) => panic!("Expected Connection error, got {other:?}"),
            Ok(_) => panic!("Expected Connection error, got a client"),
        }
    }
}
