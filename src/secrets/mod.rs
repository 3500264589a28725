//! Secret Store Adapters
//!
//! - Kubernetes: `core/v1` Secrets in the management cluster
//! - Memory: process-local store for tests and dry runs

pub mod kubernetes;
pub mod memory;

pub use kubernetes::KubeSecretStore;
pub use memory::MemorySecretStore;
