//! `kedactl create-deployment` - provision a KEDA-scaled Deployment

use std::sync::Arc;

use clap::{Args, ValueEnum};

use super::format::{render_document, OutputFormat};
use super::{ClusterArgs, Session};
use crate::cluster::ClusterClient;
use crate::config::KedactlConfig;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::provision::{ApiProvisioner, HelmProvisioner, Provisioner, DEFAULT_CHART_PATH};
use crate::workload::{DeploymentRequest, EventSourceConfig, ResourceSettings};
use crate::Result;

/// How the workload is created
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Submit Deployment and ScaledObject directly
    #[default]
    Api,
    /// Install a Helm chart with generated values
    Helm,
}

/// Create a KEDA-enabled Deployment
#[derive(Args, Debug, Clone)]
pub struct CreateDeploymentArgs {
    /// Deployment name (also the Helm release name)
    #[arg(long)]
    pub name: String,

    /// Namespace, created if missing
    #[arg(long, default_value = "default")]
    pub namespace: String,

    /// Container image name (e.g. nginx)
    #[arg(long)]
    pub image: String,

    /// Container image tag
    #[arg(long, default_value = "latest")]
    pub tag: String,

    /// CPU request
    #[arg(long, default_value = "100m")]
    pub cpu_req: String,

    /// CPU limit
    #[arg(long, default_value = "200m")]
    pub cpu_limit: String,

    /// Memory request
    #[arg(long, default_value = "128Mi")]
    pub mem_req: String,

    /// Memory limit
    #[arg(long, default_value = "256Mi")]
    pub mem_limit: String,

    /// Container port to expose
    #[arg(long, default_value_t = 80)]
    pub port: u16,

    /// Minimum replicas for autoscaling
    #[arg(long, default_value_t = 1)]
    pub min_replicas: u32,

    /// Maximum replicas for autoscaling
    #[arg(long, default_value_t = 10)]
    pub max_replicas: u32,

    /// KEDA trigger type (e.g. cpu, memory, kafka)
    #[arg(long)]
    pub scaling_metric_type: String,

    /// Target value for the scaling metric
    #[arg(long)]
    pub scaling_metric_value: String,

    /// JSON object merged into the trigger metadata (e.g. '{"topic":"t","broker":"b:9092"}')
    #[arg(long)]
    pub event_source_config: Option<String>,

    /// Create the objects directly or through a Helm chart
    #[arg(long, value_enum, default_value_t = Strategy::Api)]
    pub strategy: Strategy,

    /// Helm chart for `--strategy helm`
    #[arg(long, env = "KEDACTL_CHART_PATH")]
    pub chart_path: Option<String>,

    /// Output format for the result
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

impl CreateDeploymentArgs {
    /// Parse and check the flags without touching the cluster
    pub fn to_request(&self) -> Result<DeploymentRequest> {
        let request = DeploymentRequest {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            image: self.image.clone(),
            tag: self.tag.clone(),
            resources: ResourceSettings {
                cpu_request: self.cpu_req.clone(),
                cpu_limit: self.cpu_limit.clone(),
                memory_request: self.mem_req.clone(),
                memory_limit: self.mem_limit.clone(),
            },
            container_port: self.port,
            min_replicas: self.min_replicas,
            max_replicas: self.max_replicas,
            scaling_metric_type: self.scaling_metric_type.clone(),
            scaling_metric_value: self.scaling_metric_value.clone(),
            event_source_config: EventSourceConfig::parse_opt(
                self.event_source_config.as_deref(),
            )?,
        };
        request.validate()?;
        Ok(request)
    }

    /// Chart from the flag, then the config file, then the default
    fn chart(&self, config: &KedactlConfig) -> String {
        self.chart_path
            .clone()
            .or_else(|| config.chart_path.clone())
            .unwrap_or_else(|| DEFAULT_CHART_PATH.to_string())
    }
}

/// Run the command
pub async fn run(args: CreateDeploymentArgs, cluster_args: &ClusterArgs) -> Result<()> {
    let request = args.to_request()?;

    println!("--- Creating KEDA-enabled Deployment: {} ---", request.name);
    let session = Session::connect(cluster_args).await?;
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
    let provisioner = provisioner_for(&args, session.cluster, runner, &session.config);

    let result = provisioner.provision(&request).await?;

    println!("\nDeployment created successfully with the following details:");
    println!("{}", render_document(&result, args.output)?);
    Ok(())
}

/// Pick the provisioning strategy
pub fn provisioner_for(
    args: &CreateDeploymentArgs,
    cluster: Arc<dyn ClusterClient>,
    runner: Arc<dyn CommandRunner>,
    config: &KedactlConfig,
) -> Box<dyn Provisioner> {
    match args.strategy {
        Strategy::Api => Box::new(ApiProvisioner::new(cluster)),
        Strategy::Helm => Box::new(
            HelmProvisioner::new(cluster, runner, args.chart(config))
                .with_readback(config.helm_readback()),
        ),
    }
}
