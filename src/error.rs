//! Error types for kedactl
//!
//! One enum covers every failure category the tool distinguishes:
//! connectivity, conflicts and rejections from the control plane, external
//! tool failures, and local validation. "Not found" on reads is modelled as
//! `Option::None` by the components; [`Error::NotFound`] only exists for the
//! CLI boundary where a missing resource ends the command.

use std::fmt::Display;

use thiserror::Error;

/// Result type alias using the kedactl [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for kedactl operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Cannot load a kubeconfig, build a client, or reach the API server
    #[error("cluster connection failed: {message}")]
    Connection {
        /// Description of what failed
        message: String,
    },

    /// Kubernetes API error not covered by a more specific variant
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The object already exists (HTTP 409 on create)
    #[error("{kind} '{name}' already exists in namespace '{namespace}'")]
    AlreadyExists {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Namespace of the resource
        namespace: String,
    },

    /// A resource the command depends on does not exist
    #[error("{kind} '{name}' not found in namespace '{namespace}'")]
    NotFound {
        /// Resource kind
        kind: String,
        /// Resource name
        name: String,
        /// Namespace of the resource
        namespace: String,
    },

    /// An external binary is not installed or not on PATH
    #[error("'{tool}' command not found, ensure it is installed and on your PATH")]
    ToolNotFound {
        /// Binary name
        tool: String,
    },

    /// An external command exited non-zero
    #[error("command failed: {command}: {stderr}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// Captured stderr (or a description when there is none)
        stderr: String,
    },

    /// A polled component never became ready within its attempt budget
    #[error("{component} not ready: {message}")]
    NotReady {
        /// What was being waited on
        component: String,
        /// Why it is not ready
        message: String,
    },

    /// Malformed user input, rejected before any cluster or process call
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a connection error with the given message
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a validation error with the given message
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-ready error for `component`
    pub fn not_ready(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotReady {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a command failure for `command` with captured stderr
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a not-found error for a namespaced resource
    pub fn not_found(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::NotFound {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    /// Create an already-exists error for a namespaced resource
    pub fn already_exists(
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

/// Extension trait to convert foreign errors into [`Error::Connection`].
///
/// Used while building the kube client, where every failure (bad kubeconfig,
/// unknown context, TLS setup) means the same thing to the user.
pub trait ConnectionErrorExt<T> {
    /// Convert an error to `Error::Connection` using its Display implementation.
    fn conn_err(self) -> Result<T>;
}

impl<T, E: Display> ConnectionErrorExt<T> for std::result::Result<T, E> {
    fn conn_err(self) -> Result<T> {
        self.map_err(|e| Error::connection(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story Tests: Error Messages Users See
    // ==========================================================================

    /// Bad --event-source-config JSON is reported as a validation failure
    #[test]
    fn story_validation_errors_are_labelled() {
        let err = Error::validation("event-source-config is not valid JSON");
        assert!(err.to_string().starts_with("validation error"));
        assert!(err.to_string().contains("not valid JSON"));

        match Error::validation("min") {
            Error::Validation { message } => assert_eq!(message, "min"),
            _ => panic!("Expected Validation variant"),
        }
    }

    /// A failing helm invocation carries the command and its stderr
    #[test]
    fn story_command_failures_carry_stderr() {
        let err = Error::command_failed(
            "helm install my-app ./chart",
            "Error: INSTALLATION FAILED: cannot re-use a name",
        );
        let msg = err.to_string();
        assert!(msg.contains("helm install my-app"));
        assert!(msg.contains("cannot re-use a name"));
    }

    /// Missing binaries tell the user what to install
    #[test]
    fn story_missing_tool_names_the_binary() {
        let err = Error::ToolNotFound {
            tool: "helm".to_string(),
        };
        assert!(err.to_string().contains("'helm' command not found"));
    }

    #[test]
    fn story_not_found_and_conflict_name_the_resource() {
        let err = Error::not_found("Deployment", "my-app", "prod");
        assert_eq!(
            err.to_string(),
            "Deployment 'my-app' not found in namespace 'prod'"
        );

        let err = Error::already_exists("ScaledObject", "my-app-scaledobject", "prod");
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn story_not_ready_names_the_component() {
        let err = Error::not_ready("keda-operator", "no ready replicas after 10 checks");
        assert_eq!(
            err.to_string(),
            "keda-operator not ready: no ready replicas after 10 checks"
        );
        assert!(!matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn conn_err_maps_display_errors() {
        let result: std::result::Result<(), &str> = Err("no kubeconfig found");
        let err = result.conn_err().unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(err.to_string().contains("no kubeconfig found"));
    }

    #[test]
    fn io_errors_convert_via_from() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
