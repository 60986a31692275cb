//! Resource documents for a KEDA-scaled workload
//!
//! This module turns a [`DeploymentRequest`] into the declarative documents
//! the cluster needs:
//! - Namespace: created on demand
//! - Deployment: the container replicas
//! - ScaledObject: KEDA autoscaling policy targeting the Deployment
//! - Helm values: the same settings in chart-values form
//!
//! Everything here is pure. Maps are `BTreeMap`, so identical requests always
//! serialize to identical bytes.

mod request;

#[cfg(test)]
pub(crate) use request::fixtures;
pub use request::{DeploymentRequest, EventSourceConfig, ResourceSettings};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label key tying pods, selector and Deployment together
pub const APP_LABEL: &str = "app";
/// Label on the ScaledObject naming the Deployment it scales
pub const DEPLOYMENT_NAME_LABEL: &str = "deploymentName";
/// Suffix appended to the Deployment name to name its ScaledObject
pub const SCALED_OBJECT_SUFFIX: &str = "-scaledobject";
/// Trigger metadata key carrying the scaling target value
pub const TRIGGER_VALUE_KEY: &str = "value";

// =============================================================================
// Kubernetes Resource Types
// =============================================================================

/// Object metadata for the documents kedactl creates
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Resource name
    pub name: String,
    /// Resource namespace (absent for cluster-scoped objects)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    /// Metadata for a namespaced object
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            labels: BTreeMap::new(),
        }
    }

    /// Metadata for a cluster-scoped object
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            labels: BTreeMap::new(),
        }
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Kubernetes Namespace
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
}

// =============================================================================
// Deployment
// =============================================================================

/// Kubernetes Deployment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: DeploymentSpec,
}

/// Deployment spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Number of replicas
    pub replicas: u32,
    /// Label selector
    pub selector: LabelSelector,
    /// Pod template
    pub template: PodTemplateSpec,
}

/// Label selector
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    /// Match labels
    pub match_labels: BTreeMap<String, String>,
}

/// Pod template spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    /// Pod metadata
    pub metadata: PodMeta,
    /// Pod spec
    pub spec: PodSpec,
}

/// Pod metadata (labels only)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodMeta {
    /// Labels
    pub labels: BTreeMap<String, String>,
}

/// Pod spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Containers
    pub containers: Vec<Container>,
}

/// Container spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container name
    pub name: String,
    /// Image
    pub image: String,
    /// Ports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    /// Resource requirements
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,
}

/// Container port
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    /// Port number
    pub container_port: u16,
}

/// Resource requirements
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequirements {
    /// Requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requests: Option<ResourceQuantity>,
    /// Limits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ResourceQuantity>,
}

/// Resource quantity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceQuantity {
    /// CPU
    pub cpu: String,
    /// Memory
    pub memory: String,
}

// =============================================================================
// KEDA ScaledObject
// =============================================================================

/// KEDA ScaledObject: scales a Deployment from one event-driven trigger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObject {
    /// API version
    pub api_version: String,
    /// Kind
    pub kind: String,
    /// Metadata
    pub metadata: ObjectMeta,
    /// Spec
    pub spec: ScaledObjectSpec,
}

impl ScaledObject {
    /// API group
    pub const GROUP: &'static str = "keda.sh";
    /// API version within the group
    pub const VERSION: &'static str = "v1alpha1";
    /// Full apiVersion
    pub const API_VERSION: &'static str = "keda.sh/v1alpha1";
    /// Kind
    pub const KIND: &'static str = "ScaledObject";
    /// Resource plural
    pub const PLURAL: &'static str = "scaledobjects";
    /// CRD name used to detect a KEDA installation
    pub const CRD_NAME: &'static str = "scaledobjects.keda.sh";
}

/// ScaledObject spec
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    /// Reference to the Deployment to scale
    pub scale_target_ref: ScaleTargetRef,
    /// Minimum replica count
    pub min_replica_count: u32,
    /// Maximum replica count
    pub max_replica_count: u32,
    /// Autoscaling triggers
    pub triggers: Vec<ScaledObjectTrigger>,
}

/// Scale target reference
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTargetRef {
    /// Kind
    pub kind: String,
    /// Name
    pub name: String,
}

/// A single KEDA trigger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectTrigger {
    /// Trigger type: "cpu", "memory", "kafka", ...
    #[serde(rename = "type")]
    pub type_: String,
    /// Trigger-specific metadata
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// Helm chart values
// =============================================================================

/// Values document handed to `helm install -f`.
///
/// Key names follow the chart's `values.yaml`. The chart's native HPA block
/// stays disabled so it does not fight KEDA for the replica count.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmValues {
    /// Image repository and tag
    pub image: HelmImage,
    /// Service exposure
    pub service: HelmService,
    /// Container resources
    pub resources: ResourceRequirements,
    /// The chart's built-in HPA settings
    pub autoscaling: HelmAutoscaling,
    /// KEDA settings consumed by the chart's ScaledObject template
    pub keda_config: HelmKedaConfig,
    /// Initial replica count
    pub replica_count: u32,
    /// Service account settings
    pub service_account: HelmServiceAccount,
    /// Ingress settings
    pub ingress: HelmIngress,
}

/// `image` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HelmImage {
    /// Image repository
    pub repository: String,
    /// Image tag
    pub tag: String,
}

/// `service` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HelmService {
    /// Service type
    #[serde(rename = "type")]
    pub type_: String,
    /// Service port
    pub port: u16,
}

/// `autoscaling` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmAutoscaling {
    /// Whether the chart renders its own HPA
    pub enabled: bool,
    /// HPA minimum
    pub min_replicas: u32,
    /// HPA maximum
    pub max_replicas: u32,
    /// HPA CPU target
    #[serde(rename = "targetCPUUtilizationPercentage")]
    pub target_cpu_utilization_percentage: u32,
}

/// `kedaConfig` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmKedaConfig {
    /// Whether the chart renders a ScaledObject
    pub enabled: bool,
    /// Minimum replicas
    pub min_replicas: u32,
    /// Maximum replicas
    pub max_replicas: u32,
    /// Trigger type
    pub metric_type: String,
    /// Trigger target value
    pub metric_value: String,
    /// Trigger metadata
    pub event_source_config: EventSourceConfig,
}

/// `serviceAccount` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HelmServiceAccount {
    /// Create a dedicated service account
    pub create: bool,
    /// Automount its token
    pub automount: bool,
}

/// `ingress` block
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmIngress {
    /// Whether to render an Ingress
    pub enabled: bool,
    /// Ingress class
    pub class_name: String,
    /// Annotations
    pub annotations: BTreeMap<String, String>,
    /// Host rules
    pub hosts: Vec<HelmIngressHost>,
    /// TLS entries
    pub tls: Vec<serde_json::Value>,
}

/// One ingress host rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct HelmIngressHost {
    /// Host name
    pub host: String,
    /// Paths
    pub paths: Vec<HelmIngressPath>,
}

/// One ingress path
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HelmIngressPath {
    /// Path
    pub path: String,
    /// Path type
    pub path_type: String,
}

// =============================================================================
// Builder
// =============================================================================

/// Builds the documents for a [`DeploymentRequest`]
pub struct ResourceBuilder;

impl ResourceBuilder {
    /// Namespace document
    pub fn namespace(name: &str) -> Namespace {
        Namespace {
            api_version: "v1".to_string(),
            kind: "Namespace".to_string(),
            metadata: ObjectMeta::cluster_scoped(name),
        }
    }

    /// Deployment starting at `min_replicas`
    pub fn deployment(req: &DeploymentRequest) -> Deployment {
        let labels = app_labels(&req.name);

        Deployment {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta::new(&req.name, &req.namespace).with_label(APP_LABEL, &req.name),
            spec: DeploymentSpec {
                replicas: req.min_replicas,
                selector: LabelSelector {
                    match_labels: labels.clone(),
                },
                template: PodTemplateSpec {
                    metadata: PodMeta { labels },
                    spec: PodSpec {
                        containers: vec![Container {
                            name: req.name.clone(),
                            image: req.image_ref(),
                            ports: vec![ContainerPort {
                                container_port: req.container_port,
                            }],
                            resources: Some(Self::resources(req)),
                        }],
                    },
                },
            },
        }
    }

    /// ScaledObject targeting the Deployment from [`Self::deployment`]
    pub fn scaled_object(req: &DeploymentRequest) -> ScaledObject {
        ScaledObject {
            api_version: ScaledObject::API_VERSION.to_string(),
            kind: ScaledObject::KIND.to_string(),
            metadata: ObjectMeta::new(scaled_object_name(&req.name), &req.namespace)
                .with_label(DEPLOYMENT_NAME_LABEL, &req.name),
            spec: ScaledObjectSpec {
                scale_target_ref: ScaleTargetRef {
                    kind: "Deployment".to_string(),
                    name: req.name.clone(),
                },
                min_replica_count: req.min_replicas,
                max_replica_count: req.max_replicas,
                triggers: vec![ScaledObjectTrigger {
                    type_: req.scaling_metric_type.clone(),
                    metadata: Self::trigger_metadata(req),
                }],
            },
        }
    }

    /// Trigger metadata: `value` first, then the event source entries.
    ///
    /// An event source entry named `value` replaces the metric value.
    pub fn trigger_metadata(req: &DeploymentRequest) -> BTreeMap<String, serde_json::Value> {
        let mut metadata = BTreeMap::new();
        metadata.insert(
            TRIGGER_VALUE_KEY.to_string(),
            serde_json::Value::String(req.scaling_metric_value.clone()),
        );
        metadata.extend(
            req.event_source_config
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        metadata
    }

    /// Chart values for the Helm strategy
    pub fn helm_values(req: &DeploymentRequest) -> HelmValues {
        HelmValues {
            image: HelmImage {
                repository: req.image.clone(),
                tag: req.tag.clone(),
            },
            service: HelmService {
                type_: "ClusterIP".to_string(),
                port: req.container_port,
            },
            resources: Self::resources(req),
            autoscaling: HelmAutoscaling {
                enabled: false,
                min_replicas: 1,
                max_replicas: 100,
                target_cpu_utilization_percentage: 80,
            },
            keda_config: HelmKedaConfig {
                enabled: true,
                min_replicas: req.min_replicas,
                max_replicas: req.max_replicas,
                metric_type: req.scaling_metric_type.clone(),
                metric_value: req.scaling_metric_value.clone(),
                event_source_config: req.event_source_config.clone(),
            },
            replica_count: req.min_replicas,
            service_account: HelmServiceAccount {
                create: true,
                automount: true,
            },
            ingress: HelmIngress {
                enabled: false,
                class_name: String::new(),
                annotations: BTreeMap::new(),
                hosts: vec![HelmIngressHost {
                    host: "chart-example.local".to_string(),
                    paths: vec![HelmIngressPath {
                        path: "/".to_string(),
                        path_type: "ImplementationSpecific".to_string(),
                    }],
                }],
                tls: vec![],
            },
        }
    }

    /// Endpoints reported back to the user
    pub fn endpoints(req: &DeploymentRequest) -> Vec<String> {
        vec![format!("Internal Port: {}", req.container_port)]
    }

    /// Endpoints reported for a Helm release
    pub fn helm_endpoints(req: &DeploymentRequest) -> Vec<String> {
        vec![format!("Internal Container Port: {}", req.container_port)]
    }

    fn resources(req: &DeploymentRequest) -> ResourceRequirements {
        ResourceRequirements {
            requests: Some(ResourceQuantity {
                cpu: req.resources.cpu_request.clone(),
                memory: req.resources.memory_request.clone(),
            }),
            limits: Some(ResourceQuantity {
                cpu: req.resources.cpu_limit.clone(),
                memory: req.resources.memory_limit.clone(),
            }),
        }
    }
}

/// Name of the ScaledObject for a Deployment
pub fn scaled_object_name(deployment: &str) -> String {
    format!("{}{}", deployment, SCALED_OBJECT_SUFFIX)
}

fn app_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(APP_LABEL.to_string(), name.to_string())])
}

// =============================================================================
// Tests
// =============================================================================
