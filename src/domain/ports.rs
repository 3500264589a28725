//! Domain Ports - Core trait definitions for the SVM provisioner
//!
//! These traits define the boundaries between the provisioning engine and the
//! two external systems it drives: the storage controller management API and
//! the control-plane secret store. Adapters implement these traits to provide
//! concrete functionality.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

// =============================================================================
// Storage Partition (SVM)
// =============================================================================

/// Lifecycle state reported by the controller for an SVM
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SvmState {
    Creating,
    Running,
    Other(String),
}

impl SvmState {
    /// Parse the controller's state string
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "creating" | "initializing" => SvmState::Creating,
            "running" => SvmState::Running,
            other => SvmState::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for SvmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SvmState::Creating => write!(f, "creating"),
            SvmState::Running => write!(f, "running"),
            SvmState::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A storage partition as observed on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Svm {
    /// SVM name (the tenant/project identifier)
    pub name: String,
    /// Controller-assigned UUID, absent until the controller allocates one
    pub uuid: Option<String>,
    /// Lifecycle state
    pub state: SvmState,
    /// Whether the NVMe protocol service is enabled
    pub nvme_enabled: bool,
    /// Backing aggregate names
    pub aggregates: Vec<String>,
}

impl Svm {
    /// UUID plus running state plus NVMe enabled
    pub fn is_ready(&self) -> bool {
        self.uuid.is_some() && self.state == SvmState::Running && self.nvme_enabled
    }

    /// Human readable description of why the SVM is not ready
    pub fn condition(&self) -> String {
        match (&self.uuid, &self.state, self.nvme_enabled) {
            (None, _, _) => format!("svm {} has no uuid yet", self.name),
            (Some(_), SvmState::Running, false) => {
                format!("svm {} is running but nvme is not enabled", self.name)
            }
            (Some(_), state, _) => format!("svm {} is in state {}", self.name, state),
        }
    }
}

/// Request to create an SVM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvmCreateRequest {
    pub name: String,
    /// Every aggregate the controller offers; placement is left to the controller
    pub aggregates: Vec<String>,
    pub nvme_enabled: bool,
}

// =============================================================================
// Nodes & Aggregates
// =============================================================================

/// A controller node, used only for interface placement
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub uuid: String,
    pub name: String,
}

/// A pool of physical capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregate {
    pub uuid: String,
    pub name: String,
}

// =============================================================================
// Network Interfaces
// =============================================================================

/// Traffic class served by an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceRole {
    Data,
    Management,
}

impl std::fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceRole::Data => write!(f, "data"),
            InterfaceRole::Management => write!(f, "management"),
        }
    }
}

/// Fully resolved network interface to create on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    pub ip: IpAddr,
    /// Prefix length (24 or 32)
    pub netmask: u8,
    pub role: InterfaceRole,
    /// Floating address advertised through a BGP peer
    pub vip: bool,
    pub service_policy: String,
    pub svm_uuid: String,
    pub node_uuid: String,
}

// =============================================================================
// Accounts & Credentials
// =============================================================================

/// Username/password pair
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// A stored password is authoritative only when present and non-empty
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request to create an administrative account scoped to an SVM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSpec {
    pub owner_uuid: String,
    pub role: String,
    pub credentials: Credentials,
}

/// An account as reported by the controller (passwords are never readable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub owner_uuid: String,
    pub username: String,
    pub role: String,
    pub locked: bool,
}

// =============================================================================
// Control-plane Secret
// =============================================================================

/// Credential mirror held in the control-plane secret store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRecord {
    pub namespace: String,
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub credentials: Credentials,
}

// =============================================================================
// Storage Controller Ports
// =============================================================================

/// SVM lifecycle operations
#[async_trait]
pub trait PartitionApi: Send + Sync {
    /// Look up an SVM by name
    async fn get_svm_by_name(&self, name: &str) -> Result<Option<Svm>>;

    /// Fetch an SVM by UUID, failing with `NotFound` if it is gone
    async fn get_svm(&self, uuid: &str) -> Result<Svm>;

    /// Submit an SVM create request; completion is observed by polling
    async fn create_svm(&self, request: &SvmCreateRequest) -> Result<()>;
}

/// Cluster node listing
#[async_trait]
pub trait NodeApi: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Aggregate listing
#[async_trait]
pub trait AggregateApi: Send + Sync {
    async fn list_aggregates(&self) -> Result<Vec<Aggregate>>;
}

/// Network interface creation
#[async_trait]
pub trait NetworkApi: Send + Sync {
    /// Create an interface; a duplicate name fails with `AlreadyExists`
    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<()>;
}

/// Routing capability probe
#[async_trait]
pub trait PeeringApi: Send + Sync {
    /// Number of BGP peer groups configured on the cluster
    async fn bgp_peer_group_count(&self) -> Result<usize>;
}

/// SVM-scoped account management
#[async_trait]
pub trait AccountApi: Send + Sync {
    /// Create an account; an existing username fails with `AlreadyExists`
    async fn create_account(&self, spec: &AccountSpec) -> Result<()>;

    async fn get_account(&self, owner_uuid: &str, username: &str) -> Result<Option<Account>>;

    async fn set_account_password(
        &self,
        owner_uuid: &str,
        username: &str,
        password: &str,
    ) -> Result<()>;
}

/// The full capability set the engine consumes from a storage controller
pub trait StorageController:
    PartitionApi + NodeApi + AggregateApi + NetworkApi + PeeringApi + AccountApi
{
}

impl<T> StorageController for T where
    T: PartitionApi + NodeApi + AggregateApi + NetworkApi + PeeringApi + AccountApi
{
}

// =============================================================================
// Secret Store Port
// =============================================================================

/// Control-plane secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Get a secret, `None` if it does not exist
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretRecord>>;

    /// Create a secret; an existing name fails with `AlreadyExists`
    async fn create(&self, secret: &SecretRecord) -> Result<()>;

    /// Overwrite an existing secret's labels and data
    async fn replace(&self, secret: &SecretRecord) -> Result<()>;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type StorageControllerRef = Arc<dyn StorageController>;
pub type SecretStoreRef = Arc<dyn SecretStore>;
