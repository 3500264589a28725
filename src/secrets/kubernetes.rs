//! Kubernetes Secret Store
//!
//! Mirrors SVM credentials as `core/v1` Secrets in the management cluster.
//! The data map carries `username` and `password` entries.

use crate::domain::ports::{Credentials, SecretRecord, SecretStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::{Api, Client};
use std::collections::BTreeMap;
use tracing::debug;

pub const USERNAME_KEY: &str = "username";
pub const PASSWORD_KEY: &str = "password";

/// Secret store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Store using the in-cluster or kubeconfig client
    pub async fn try_default() -> Result<Self> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretRecord>> {
        match self.api(namespace).get(name).await {
            Ok(secret) => Ok(Some(from_secret(namespace, name, &secret))),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(&self, secret: &SecretRecord) -> Result<()> {
        match self
            .api(&secret.namespace)
            .create(&PostParams::default(), &to_secret(secret))
            .await
        {
            Ok(_) => {
                debug!(namespace = %secret.namespace, name = %secret.name, "Created Secret");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::AlreadyExists {
                kind: "Secret".into(),
                name: format!("{}/{}", secret.namespace, secret.name),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn replace(&self, secret: &SecretRecord) -> Result<()> {
        let api = self.api(&secret.namespace);
        let current = match api.get(&secret.name).await {
            Ok(current) => current,
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                return Err(Error::NotFound {
                    kind: "Secret".into(),
                    name: format!("{}/{}", secret.namespace, secret.name),
                })
            }
            Err(e) => return Err(e.into()),
        };

        // Replace is conditional on the resourceVersion we read
        let mut desired = to_secret(secret);
        desired.metadata.resource_version = current.metadata.resource_version;

        api.replace(&secret.name, &PostParams::default(), &desired)
            .await?;
        debug!(namespace = %secret.namespace, name = %secret.name, "Replaced Secret");
        Ok(())
    }
}

/// Build the Kubernetes object for a record
pub fn to_secret(record: &SecretRecord) -> Secret {
    let mut data = BTreeMap::new();
    data.insert(
        USERNAME_KEY.to_string(),
        ByteString(record.credentials.username.clone().into_bytes()),
    );
    data.insert(
        PASSWORD_KEY.to_string(),
        ByteString(record.credentials.password.clone().into_bytes()),
    );

    Secret {
        metadata: ObjectMeta {
            name: Some(record.name.clone()),
            namespace: Some(record.namespace.clone()),
            labels: Some(record.labels.clone()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    }
}

/// Read a record out of a Kubernetes object; missing entries become empty
pub fn from_secret(namespace: &str, name: &str, secret: &Secret) -> SecretRecord {
    let entry = |key: &str| -> String {
        if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
            return String::from_utf8_lossy(&bytes.0).into_owned();
        }
        secret
            .string_data
            .as_ref()
            .and_then(|d| d.get(key))
            .cloned()
            .unwrap_or_default()
    };

    SecretRecord {
        namespace: namespace.to_string(),
        name: name.to_string(),
        labels: secret.metadata.labels.clone().unwrap_or_default(),
        credentials: Credentials::new(entry(USERNAME_KEY), entry(PASSWORD_KEY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SecretRecord {
        let mut labels = BTreeMap::new();
        labels.insert("ontap.storage.io/project".to_string(), "tenant-a".to_string());
        SecretRecord {
            namespace: "ontap-system".into(),
            name: "ontap-svm-tenant-a-credentials".into(),
            labels,
            credentials: Credentials::new("vsadmin", "ab12cdef"),
        }
    }

    #[test]
    fn test_to_secret_layout() {
        let secret = to_secret(&record());

        assert_eq!(
            secret.metadata.name.as_deref(),
            Some("ontap-svm-tenant-a-credentials")
        );
        assert_eq!(secret.metadata.namespace.as_deref(), Some("ontap-system"));
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));

        let data = secret.data.unwrap();
        assert_eq!(data.get("username").unwrap().0, b"vsadmin".to_vec());
        assert_eq!(data.get("password").unwrap().0, b"ab12cdef".to_vec());
        assert_eq!(
            secret.metadata.labels.unwrap().get("ontap.storage.io/project"),
            Some(&"tenant-a".to_string())
        );
    }

    #[test]
    fn test_from_secret_reads_back() {
        let original = record();
        let parsed = from_secret(
            &original.namespace,
            &original.name,
            &to_secret(&original),
        );
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_from_secret_missing_password() {
        let secret = Secret {
            data: Some(
                [(
                    "username".to_string(),
                    ByteString(b"vsadmin".to_vec()),
                )]
                .into(),
            ),
            ..Default::default()
        };

        let parsed = from_secret("ontap-system", "creds", &secret);
        assert_eq!(parsed.credentials.username, "vsadmin");
        assert!(!parsed.credentials.has_password());
    }

    #[test]
    fn test_from_secret_string_data() {
        let secret = Secret {
            string_data: Some(
                [
                    ("username".to_string(), "vsadmin".to_string()),
                    ("password".to_string(), "ab12cdef".to_string()),
                ]
                .into(),
            ),
            ..Default::default()
        };

        let parsed = from_secret("ontap-system", "creds", &secret);
        assert_eq!(parsed.credentials.password, "ab12cdef");
    }
}
