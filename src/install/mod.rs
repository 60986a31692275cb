//! Installer: makes sure Helm and KEDA are present
//!
//! Both tools are install-if-absent:
//!
//! - Helm: `helm version` decides; otherwise the official `get-helm-3` script
//!   runs through `sh`.
//! - KEDA: present when the `scaledobjects.keda.sh` CRD exists and the
//!   operator has a ready replica. Otherwise the `kedacore/keda` chart is
//!   installed (unless the CRD is already there) and the operator is polled
//!   with a fixed budget.
//!
//! Failures never escape as errors: they fold into [`InstallOutcome::Failed`]
//! and the caller decides whether to carry on.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::cluster::ClusterClient;
use crate::config::{DEFAULT_KEDA_READY_ATTEMPTS, DEFAULT_KEDA_READY_INTERVAL_SECS};
use crate::exec::{args, run_checked, CommandRunner};
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::workload::ScaledObject;
use crate::{Error, Result};

/// Official Helm 3 install script
pub const HELM_INSTALL_SCRIPT_URL: &str =
    "https://raw.githubusercontent.com/helm/helm/master/scripts/get-helm-3";
/// Helm repository name for the KEDA charts
pub const KEDA_REPO_NAME: &str = "kedacore";
/// Helm repository URL for the KEDA charts
pub const KEDA_REPO_URL: &str = "https://kedacore.github.io/charts";
/// Release name and namespace KEDA is installed into
pub const KEDA_NAMESPACE: &str = "keda";
/// Deployment running the KEDA operator
pub const KEDA_OPERATOR: &str = "keda-operator";

/// Something [`Installer::ensure_installed`] can provide
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    /// The Helm CLI on this host
    Helm,
    /// The KEDA controller in the cluster
    Keda,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tool::Helm => write!(f, "Helm"),
            Tool::Keda => write!(f, "KEDA"),
        }
    }
}

/// Result of an install attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The tool is installed and usable
    Ready,
    /// The tool could not be made ready
    Failed {
        /// What went wrong
        reason: String,
    },
}

impl InstallOutcome {
    /// Whether the tool is ready
    pub fn is_ready(&self) -> bool {
        matches!(self, InstallOutcome::Ready)
    }
}

/// Installs Helm and KEDA on demand
pub struct Installer {
    cluster: Arc<dyn ClusterClient>,
    runner: Arc<dyn CommandRunner>,
    keda_readiness: RetryConfig,
}

impl Installer {
    /// Create an installer with the default KEDA readiness budget
    pub fn new(cluster: Arc<dyn ClusterClient>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            cluster,
            runner,
            keda_readiness: RetryConfig::fixed(
                DEFAULT_KEDA_READY_ATTEMPTS,
                std::time::Duration::from_secs(DEFAULT_KEDA_READY_INTERVAL_SECS),
            ),
        }
    }

    /// Override the KEDA readiness budget
    pub fn with_keda_readiness(mut self, readiness: RetryConfig) -> Self {
        self.keda_readiness = readiness;
        self
    }

    /// Make `tool` ready, installing it if needed
    pub async fn ensure_installed(&self, tool: Tool) -> InstallOutcome {
        let result = match tool {
            Tool::Helm => self.ensure_helm().await,
            Tool::Keda => self.ensure_keda().await,
        };

        match result {
            Ok(()) => {
                info!(tool = %tool, "Ready");
                InstallOutcome::Ready
            }
            Err(e) => {
                warn!(tool = %tool, error = %e, "Installation failed");
                InstallOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn ensure_helm(&self) -> Result<()> {
        match self.runner.run("helm", &args(["version"])).await {
            Ok(output) if output.success() => {
                info!("Helm is already installed");
                return Ok(());
            }
            Ok(_) | Err(Error::ToolNotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        info!("Helm not found, installing");
        let script = format!("curl -fsSL {} | bash", HELM_INSTALL_SCRIPT_URL);
        run_checked(self.runner.as_ref(), "sh", &["-c".to_string(), script]).await?;
        info!("Helm installed");
        Ok(())
    }

    async fn ensure_keda(&self) -> Result<()> {
        let crd_installed = self.cluster.crd_exists(ScaledObject::CRD_NAME).await?;
        if crd_installed && self.keda_operator_ready().await.unwrap_or(false) {
            info!("KEDA is already installed and running");
            return Ok(());
        }

        if crd_installed {
            info!("KEDA CRDs present, waiting for the operator");
        } else {
            self.install_keda_chart().await?;
        }

        self.wait_for_keda_operator().await
    }

    async fn install_keda_chart(&self) -> Result<()> {
        info!("Installing KEDA");
        let runner = self.runner.as_ref();
        run_checked(runner, "helm", &args(["repo", "add", KEDA_REPO_NAME, KEDA_REPO_URL])).await?;
        run_checked(runner, "helm", &args(["repo", "update"])).await?;
        run_checked(
            runner,
            "helm",
            &args([
                "install",
                "keda",
                "kedacore/keda",
                "--namespace",
                KEDA_NAMESPACE,
                "--create-namespace",
            ]),
        )
        .await?;
        info!("KEDA chart installed");
        Ok(())
    }

    /// Poll the operator until ready. Gives up after the budget, keeping the
    /// last lookup error in the reason.
    async fn wait_for_keda_operator(&self) -> Result<()> {
        let installer = self;
        let checks = self.keda_readiness.max_attempts;
        retry_with_backoff(&self.keda_readiness, "keda_operator_ready", || async move {
            if installer.keda_operator_ready().await? {
                Ok(())
            } else {
                Err(Error::not_ready(KEDA_OPERATOR, "no ready replicas yet"))
            }
        })
        .await
        .map_err(|e| match e {
            Error::NotReady { .. } => Error::not_ready(
                KEDA_OPERATOR,
                format!("no ready replicas after {} checks", checks),
            ),
            other => Error::not_ready(
                KEDA_OPERATOR,
                format!("gave up after {} checks: {}", checks, other),
            ),
        })
    }

    /// Whether `keda/keda-operator` has at least one ready replica
    pub async fn keda_operator_ready(&self) -> Result<bool> {
        let deployment = self
            .cluster
            .get_deployment(KEDA_OPERATOR, KEDA_NAMESPACE)
            .await?;
        let ready = deployment
            .and_then(|d| d.status)
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0);
        Ok(ready >= 1)
    }
}
