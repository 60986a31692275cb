//! The user's description of a KEDA-scaled workload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// CPU and memory requests/limits, in cluster quantity syntax (`100m`, `128Mi`).
///
/// The strings are passed through untouched; the API server validates them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceSettings {
    /// CPU request
    pub cpu_request: String,
    /// CPU limit
    pub cpu_limit: String,
    /// Memory request
    pub memory_request: String,
    /// Memory limit
    pub memory_limit: String,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            cpu_request: "100m".to_string(),
            cpu_limit: "200m".to_string(),
            memory_request: "128Mi".to_string(),
            memory_limit: "256Mi".to_string(),
        }
    }
}

/// Scaler-specific trigger metadata (Kafka topic, broker list, queue name...).
///
/// Kept as an opaque mapping: the keys depend on the scaler type and are
/// validated by KEDA's admission webhook, not here.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EventSourceConfig(pub BTreeMap<String, serde_json::Value>);

impl EventSourceConfig {
    /// Parse a JSON object such as `{"topic":"t","broker":"b:9092"}`.
    ///
    /// Anything that is not a JSON object is rejected.
    pub fn parse(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            Error::validation(format!("event-source-config is not valid JSON: {}", e))
        })?;
        match value {
            serde_json::Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(Error::validation(format!(
                "event-source-config must be a JSON object, got: {}",
                other
            ))),
        }
    }

    /// Parse an optional flag value; absent means empty.
    pub fn parse_opt(json: Option<&str>) -> Result<Self> {
        match json {
            Some(s) if !s.trim().is_empty() => Self::parse(s),
            _ => Ok(Self::default()),
        }
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// Everything needed to provision one KEDA-scaled Deployment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeploymentRequest {
    /// Deployment name (also the container name and `app` label)
    pub name: String,
    /// Target namespace, created if missing
    pub namespace: String,
    /// Image repository, without tag
    pub image: String,
    /// Image tag
    pub tag: String,
    /// Container resources
    pub resources: ResourceSettings,
    /// Port the container listens on
    pub container_port: u16,
    /// Replicas at creation and KEDA's lower bound
    pub min_replicas: u32,
    /// KEDA's upper bound
    pub max_replicas: u32,
    /// KEDA trigger type (`cpu`, `memory`, `kafka`, ...)
    pub scaling_metric_type: String,
    /// Target value for the trigger
    pub scaling_metric_value: String,
    /// Extra trigger metadata merged verbatim
    pub event_source_config: EventSourceConfig,
}

impl DeploymentRequest {
    /// Full image reference, `image:tag`
    pub fn image_ref(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// Local checks that need no cluster round-trip.
    ///
    /// Resource quantities are deliberately not checked here; the API server
    /// owns quantity syntax.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name must not be empty"));
        }
        if self.namespace.trim().is_empty() {
            return Err(Error::validation("namespace must not be empty"));
        }
        if self.image.trim().is_empty() {
            return Err(Error::validation("image must not be empty"));
        }
        if self.container_port == 0 {
            return Err(Error::validation("port must be between 1 and 65535"));
        }
        if self.min_replicas > self.max_replicas {
            return Err(Error::validation(format!(
                "min-replicas ({}) must not exceed max-replicas ({})",
                self.min_replicas, self.max_replicas
            )));
        }
        if self.scaling_metric_type.trim().is_empty() {
            return Err(Error::validation("scaling-metric-type must not be empty"));
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::my_app;
    use super::*;

    #[test]
    fn image_ref_joins_repository_and_tag() {
        assert_eq!(my_app().image_ref(), "nginx:latest");
    }

    #[test]
    fn valid_request_passes() {
        assert!(my_app().validate().is_ok());

        let mut equal = my_app();
        equal.min_replicas = 3;
        equal.max_replicas = 3;
        assert!(equal.validate().is_ok());
    }

    #[test]
    fn min_above_max_is_rejected() {
        let mut req = my_app();
        req.min_replicas = 5;
        req.max_replicas = 2;

        let err = req.validate().unwrap_err();
        assert!(err.to_string().contains("min-replicas (5)"));
    }

    #[test]
    fn empty_name_and_zero_port_are_rejected() {
        let mut req = my_app();
        req.name = " ".to_string();
        assert!(req.validate().is_err());

        let mut req = my_app();
        req.container_port = 0;
        assert!(req.validate().is_err());
    }

    /// Quantities are the API server's business, not ours
    #[test]
    fn odd_quantities_are_not_checked_locally() {
        let mut req = my_app();
        req.resources.cpu_request = "lots".to_string();
        assert!(req.validate().is_ok());
    }

    // ==========================================================================
    // Story: Parsing --event-source-config
    // ==========================================================================

    #[test]
    fn event_source_parses_json_object() {
        let cfg = EventSourceConfig::parse(r#"{"topic":"t","broker":"b:9092"}"#).unwrap();
        assert_eq!(cfg.0.get("topic"), Some(&serde_json::json!("t")));
        assert_eq!(cfg.0.get("broker"), Some(&serde_json::json!("b:9092")));
    }

    #[test]
    fn event_source_rejects_malformed_json() {
        let err = EventSourceConfig::parse(r#"{"topic": "#).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn event_source_rejects_non_objects() {
        assert!(EventSourceConfig::parse(r#"["topic"]"#).is_err());
        assert!(EventSourceConfig::parse("42").is_err());
    }

    #[test]
    fn event_source_absent_or_blank_is_empty() {
        assert!(EventSourceConfig::parse_opt(None).unwrap().is_empty());
        assert!(EventSourceConfig::parse_opt(Some("  ")).unwrap().is_empty());
    }
}
