//! SVM Provisioner
//!
//! Top-level provisioning flow for one tenant:
//!
//! 1. select placement nodes (fails fast below the redundancy floor)
//! 2. create the SVM unless one with the project's name already exists,
//!    handing the controller every aggregate, then wait for it to run with
//!    NVMe enabled
//! 3. create the data interfaces, then the management interface
//! 4. reconcile the admin credential
//!
//! Every step is idempotent against the controller, so a failed run is
//! recovered by running the whole flow again. Nothing created before a
//! failure is rolled back.

use super::credentials::{CredentialOutcome, CredentialReconciler};
use super::endpoints::{EndpointAllocator, EndpointRequest};
use super::nodes::NodeSelector;
use super::readiness::{poll_until_ready, PollError, Probe, RetryPolicy};
use crate::config::EngineConfig;
use crate::domain::ports::{
    InterfaceSpec, SecretStoreRef, StorageControllerRef, Svm, SvmCreateRequest,
};
use crate::error::{Error, Result};
use crate::metrics::EngineMetrics;
use std::net::IpAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

// =============================================================================
// Request / Outcome
// =============================================================================

/// Characters the controller's collection queries read as operators
const QUERY_OPERATOR_CHARS: &[char] = &['*', '|', '!', '<', '>', '=', ',', '{', '}'];

/// Storage requested by a tenant cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Tenant/project identifier, also the SVM name
    pub project_id: String,
    /// One data interface is created per address, in order
    pub data_ips: Vec<IpAddr>,
    pub management_ip: IpAddr,
}

impl ProvisionRequest {
    pub fn new(
        project_id: impl Into<String>,
        data_ips: Vec<IpAddr>,
        management_ip: IpAddr,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            data_ips,
            management_ip,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.project_id.trim().is_empty() {
            return Err(Error::Validation("project id must not be empty".into()));
        }
        if self.project_id.contains(QUERY_OPERATOR_CHARS)
            || self.project_id.contains("..")
            || self.project_id.chars().any(char::is_whitespace)
        {
            return Err(Error::Validation(format!(
                "project id '{}' contains query operators or whitespace",
                self.project_id
            )));
        }
        if self.data_ips.is_empty() {
            return Err(Error::Validation(format!(
                "project {} requested no data addresses",
                self.project_id
            )));
        }
        Ok(())
    }
}

/// What a successful provisioning run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    pub svm: Svm,
    /// Whether this run submitted the SVM create request
    pub created: bool,
    /// Interfaces ensured on the SVM, data first then management
    pub interfaces: Vec<InterfaceSpec>,
    pub credentials: CredentialOutcome,
}

// =============================================================================
// SVM Provisioner
// =============================================================================

/// Drives SVM creation, interface allocation and credential reconciliation
pub struct SvmProvisioner {
    controller: StorageControllerRef,
    nodes: NodeSelector,
    endpoints: EndpointAllocator,
    credentials: CredentialReconciler,
    policy: RetryPolicy,
    metrics: Arc<EngineMetrics>,
}

impl SvmProvisioner {
    pub fn new(
        controller: StorageControllerRef,
        secrets: SecretStoreRef,
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            nodes: NodeSelector::new(controller.clone()),
            endpoints: EndpointAllocator::new(controller.clone(), config.clone(), metrics.clone()),
            credentials: CredentialReconciler::new(
                controller.clone(),
                secrets,
                config.clone(),
                metrics.clone(),
            ),
            policy: RetryPolicy::from(&config.readiness),
            controller,
            metrics,
        }
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Provision storage for a tenant. Errors carry the project id and the
    /// failing step.
    #[instrument(skip_all, fields(project = %request.project_id))]
    pub async fn create_svm(
        &self,
        request: &ProvisionRequest,
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome> {
        let result = self.run(request, cancel).await;
        self.metrics.record_provision(result.is_ok());
        result
    }

    async fn run(
        &self,
        request: &ProvisionRequest,
        cancel: &CancellationToken,
    ) -> Result<ProvisionOutcome> {
        request.validate()?;
        let project = request.project_id.as_str();

        let nodes = self
            .nodes
            .select_nodes()
            .await
            .map_err(|e| e.context(project, "select nodes"))?;

        let (svm, created) = match self
            .controller
            .get_svm_by_name(project)
            .await
            .map_err(|e| e.context(project, "look up svm"))?
        {
            Some(existing) => {
                info!(
                    uuid = existing.uuid.as_deref().unwrap_or("-"),
                    state = %existing.state,
                    "SVM already exists, skipping creation"
                );
                (existing, false)
            }
            None => {
                self.submit_create(project).await?;
                let svm = self
                    .wait_until_ready(project, cancel)
                    .await
                    .map_err(|e| e.context(project, "wait for svm"))?;
                (svm, true)
            }
        };

        let svm_uuid = svm.uuid.clone().ok_or_else(|| {
            Error::NotFound {
                kind: "SvmUuid".into(),
                name: svm.name.clone(),
            }
            .context(project, "resolve svm uuid")
        })?;

        let interfaces = self
            .endpoints
            .allocate(
                &EndpointRequest {
                    svm_uuid: &svm_uuid,
                    data_ips: &request.data_ips,
                    management_ip: request.management_ip,
                },
                &nodes,
            )
            .await
            .map_err(|e| e.context(project, "allocate interfaces"))?;

        let credentials = self
            .credentials
            .reconcile(project, &svm)
            .await
            .map_err(|e| e.context(project, "reconcile credentials"))?;

        info!(
            uuid = %svm_uuid,
            created,
            interfaces = interfaces.len(),
            "SVM provisioned"
        );

        Ok(ProvisionOutcome {
            svm,
            created,
            interfaces,
            credentials,
        })
    }

    /// Submit the create request with every aggregate and NVMe enabled
    async fn submit_create(&self, project: &str) -> Result<()> {
        let aggregates: Vec<String> = self
            .controller
            .list_aggregates()
            .await
            .map_err(|e| e.context(project, "list aggregates"))?
            .into_iter()
            .map(|a| a.name)
            .collect();

        info!(aggregates = ?aggregates, "Creating SVM");

        let create = SvmCreateRequest {
            name: project.to_string(),
            aggregates,
            nvme_enabled: true,
        };
        self.controller
            .create_svm(&create)
            .await
            .map_err(|e| e.context(project, "create svm"))?;
        self.metrics.record_svm_created();
        Ok(())
    }

    /// One readiness observation: name lookup for the UUID, then the SVM
    /// itself by UUID
    async fn probe_readiness(&self, project: &str) -> Result<Probe<Svm>> {
        let Some(found) = self.controller.get_svm_by_name(project).await? else {
            return Ok(Probe::Pending(format!("svm {} not visible yet", project)));
        };
        let Some(uuid) = found.uuid.as_deref() else {
            return Ok(Probe::Pending(found.condition()));
        };

        let svm = self.controller.get_svm(uuid).await?;
        if svm.is_ready() {
            Ok(Probe::Ready(svm))
        } else {
            Ok(Probe::Pending(svm.condition()))
        }
    }

    /// Poll until the SVM has a UUID, is running, and has NVMe enabled
    async fn wait_until_ready(&self, project: &str, cancel: &CancellationToken) -> Result<Svm> {
        let polled = poll_until_ready(&self.policy, cancel, "svm readiness", || {
            self.probe_readiness(project)
        })
        .await;

        match polled {
            Ok(polled) => {
                debug!(attempts = polled.attempts, "SVM ready");
                self.metrics.record_readiness_attempts(polled.attempts);
                Ok(polled.value)
            }
            Err(PollError::Exhausted {
                attempts,
                last_condition,
            }) => {
                self.metrics.record_readiness_attempts(attempts);
                Err(Error::ReadinessTimeout {
                    svm: project.to_string(),
                    attempts,
                    last_condition,
                })
            }
            Err(PollError::Failed(e)) => Err(e),
            Err(PollError::Cancelled) => Err(Error::Cancelled {
                operation: format!("waiting for svm {}", project),
            }),
        }
    }
}
