//! Engine Configuration
//!
//! Naming templates, account defaults, secret labels and the readiness poll
//! policy are carried in an explicit [`Config`] value that is handed to every
//! component. Defaults reproduce the deployed naming conventions; a YAML
//! document can override any subset of them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Placeholder substituted with the project identifier in name templates
pub const PROJECT_PLACEHOLDER: &str = "{project}";

// =============================================================================
// Top-level Configuration
// =============================================================================

/// Complete configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub engine: EngineConfig,
    pub ontap: OntapConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.ontap.validate()
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Naming, account and polling settings for the provisioning engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Namespace holding the credential secrets
    pub secret_namespace: String,
    /// Secret name template, must contain `{project}`
    pub secret_name_template: String,
    /// Administrative account created on every SVM
    pub admin_username: String,
    /// Role granted to the administrative account
    pub admin_role: String,
    /// Data interface name prefix, suffixed with the interface index
    pub data_interface_tag: String,
    /// Management interface name
    pub management_interface_tag: String,
    /// Rotate the admin password when the account exists but its secret is gone
    pub rotate_on_missing_secret: bool,
    pub labels: SecretLabelConfig,
    pub readiness: ReadinessConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            secret_namespace: "ontap-system".to_string(),
            secret_name_template: "ontap-svm-{project}-credentials".to_string(),
            admin_username: "vsadmin".to_string(),
            admin_role: "vsadmin".to_string(),
            data_interface_tag: "data-lif-".to_string(),
            management_interface_tag: "mgmt-lif".to_string(),
            rotate_on_missing_secret: true,
            labels: SecretLabelConfig::default(),
            readiness: ReadinessConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Deterministic credential secret name for a project
    pub fn secret_name(&self, project: &str) -> String {
        self.secret_name_template
            .replace(PROJECT_PLACEHOLDER, project)
    }

    /// Name of the data interface at `index`
    pub fn data_interface_name(&self, index: usize) -> String {
        format!("{}{}", self.data_interface_tag, index)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.secret_name_template.contains(PROJECT_PLACEHOLDER) {
            return Err(Error::Configuration(format!(
                "secretNameTemplate '{}' must contain {}",
                self.secret_name_template, PROJECT_PLACEHOLDER
            )));
        }

        let required = [
            ("secretNamespace", &self.secret_namespace),
            ("adminUsername", &self.admin_username),
            ("adminRole", &self.admin_role),
            ("dataInterfaceTag", &self.data_interface_tag),
            ("managementInterfaceTag", &self.management_interface_tag),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{} must not be empty", field)));
            }
        }

        self.labels.validate()?;
        self.readiness.validate()
    }
}

// =============================================================================
// Secret Labels
// =============================================================================

/// Fixed label set written onto every credential secret
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SecretLabelConfig {
    /// Value for `app.kubernetes.io/part-of`
    pub part_of: String,
    /// Value for `app.kubernetes.io/managed-by`
    pub managed_by: String,
    /// Label key carrying the project identifier
    pub project_label_key: String,
}

impl Default for SecretLabelConfig {
    fn default() -> Self {
        Self {
            part_of: "ontap-svm-provisioner".to_string(),
            managed_by: "svm-controller".to_string(),
            project_label_key: "ontap.storage.io/project".to_string(),
        }
    }
}

impl SecretLabelConfig {
    /// Labels for the secret belonging to `project`
    pub fn labels_for(&self, project: &str) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::new();
        labels.insert("app.kubernetes.io/part-of".to_string(), self.part_of.clone());
        labels.insert(
            "app.kubernetes.io/managed-by".to_string(),
            self.managed_by.clone(),
        );
        labels.insert(self.project_label_key.clone(), project.to_string());
        labels
    }

    fn validate(&self) -> Result<()> {
        if self.project_label_key.trim().is_empty() {
            return Err(Error::Configuration(
                "labels.projectLabelKey must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Readiness Poll
// =============================================================================

/// Bounded readiness poll settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReadinessConfig {
    /// Total number of readiness probes, including the first
    pub max_attempts: u32,
    /// Delay between probes
    pub max_delay_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            max_delay_secs: 5,
        }
    }
}

impl ReadinessConfig {
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Configuration(
                "readiness.maxAttempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// ONTAP Connection
// =============================================================================

/// Connection settings for the ONTAP management API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OntapConfig {
    /// Cluster management endpoint, e.g. `https://cluster-mgmt.example.com`
    pub endpoint: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Skip TLS certificate verification (lab clusters with self-signed certs)
    pub insecure_skip_verify: bool,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for OntapConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ontap-cluster-mgmt".to_string(),
            username: "admin".to_string(),
            password: String::new(),
            insecure_skip_verify: false,
            timeout_secs: 30,
        }
    }
}

impl OntapConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(Error::Configuration(format!(
                "ontap.endpoint '{}' must be an http(s) URL",
                self.endpoint
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "ontap.timeoutSecs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_default_naming() {
        let config = EngineConfig::default();
        assert_eq!(config.secret_name("tenant-a"), "ontap-svm-tenant-a-credentials");
        assert_eq!(config.data_interface_name(0), "data-lif-0");
        assert_eq!(config.data_interface_name(2), "data-lif-2");
        assert_eq!(config.management_interface_tag, "mgmt-lif");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_labels_for_project() {
        let labels = SecretLabelConfig::default().labels_for("tenant-a");
        assert_eq!(labels.len(), 3);
        assert_eq!(
            labels.get("ontap.storage.io/project").map(String::as_str),
            Some("tenant-a")
        );
        assert_eq!(
            labels.get("app.kubernetes.io/managed-by").map(String::as_str),
            Some("svm-controller")
        );
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
engine:
  adminUsername: svmadmin
  readiness:
    maxAttempts: 3
ontap:
  endpoint: https://10.0.0.10
logging:
  json: true
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.engine.admin_username, "svmadmin");
        assert_eq!(config.engine.readiness.max_attempts, 3);
        assert_eq!(config.engine.readiness.max_delay(), Duration::from_secs(5));
        assert_eq!(config.engine.admin_role, "vsadmin");
        assert_eq!(config.ontap.endpoint, "https://10.0.0.10");
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let yaml = r#"
engine:
  secretNameTemplate: fixed-name
"#;
        let err = Config::from_yaml_str(yaml).unwrap_err();
        assert_matches!(err, Error::Configuration(msg) if msg.contains("{project}"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = EngineConfig::default();
        config.readiness.max_attempts = 0;
        assert_matches!(config.validate(), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let mut config = Config::default();
        config.ontap.endpoint = "cluster-mgmt".into();
        assert_matches!(config.validate(), Err(Error::Configuration(_)));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "engine:\n  secretNamespace: storage-creds").unwrap();

        let config = Config::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.engine.secret_namespace, "storage-creds");
    }

    #[test]
    fn test_malformed_yaml() {
        let err = Config::from_yaml_str("engine: [").unwrap_err();
        assert_matches!(err, Error::YamlParse(_));
    }
}
