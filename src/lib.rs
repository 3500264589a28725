//! ONTAP SVM Provisioner - Per-Tenant Storage Partitions
//!
//! Provisions an isolated storage virtual machine (SVM) per tenant project on
//! an ONTAP cluster, wires NVMe/TCP data and management interfaces across the
//! cluster's nodes, and keeps the SVM admin password mirrored into a
//! Kubernetes secret.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          SvmProvisioner                              │
//! │   validate → select nodes → create / await SVM → interfaces → creds  │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────────────────┐  │
//! │  │ NodeSelector │  │ EndpointAllocator│  │  CredentialReconciler  │  │
//! │  │  (≥2 nodes)  │  │ (BGP VIP / subnet│  │ (account ⇄ secret)     │  │
//! │  └──────┬───────┘  └────────┬─────────┘  └───────────┬────────────┘  │
//! │         └───────────────────┼────────────────────────┤               │
//! ├─────────────────────────────┼────────────────────────┼───────────────┤
//! │          StorageController port           SecretStore port           │
//! │  ┌──────────────┐ ┌──────────────┐   ┌────────────┐ ┌─────────────┐  │
//! │  │ OntapClient  │ │    Memory    │   │ Kubernetes │ │   Memory    │  │
//! │  │ (REST/HTTPS) │ │   (tests)    │   │  Secrets   │ │  (tests)    │  │
//! │  └──────────────┘ └──────────────┘   └────────────┘ └─────────────┘  │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`provisioning`]: SVM creation, readiness polling, interfaces, credentials
//! - [`domain`]: Core domain types and port traits
//! - [`backends`]: Storage controller adapters
//! - [`secrets`]: Secret store adapters
//! - [`config`]: YAML configuration
//! - [`metrics`]: Prometheus instruments
//! - [`telemetry`]: Log subscriber setup
//! - [`error`]: Error types and handling

pub mod backends;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod provisioning;
pub mod secrets;
pub mod telemetry;

// Re-export commonly used types
pub use backends::{MemoryController, OntapClient};

pub use config::{Config, EngineConfig, LoggingConfig, OntapConfig, ReadinessConfig};

pub use domain::ports::{
    Credentials, InterfaceRole, InterfaceSpec, SecretRecord, SecretStore, SecretStoreRef,
    StorageController, StorageControllerRef, Svm, SvmState,
};

pub use error::{Error, ErrorAction, Result};

pub use metrics::EngineMetrics;

pub use provisioning::{
    AddressingMode, CredentialOutcome, CredentialReconciler, EndpointAllocator, NodeSelector,
    ProvisionOutcome, ProvisionRequest, SvmProvisioner,
};

pub use secrets::{KubeSecretStore, MemorySecretStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
