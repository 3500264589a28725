//! Provisioning Engine
//!
//! SVM creation, network interface allocation and admin credential
//! reconciliation for a single tenant per invocation. Components hold no
//! mutable state; concurrent runs for different tenants share nothing but
//! the external systems.

pub mod credentials;
pub mod endpoints;
pub mod nodes;
pub mod readiness;
pub mod svm;

pub use credentials::{generate_password, CredentialOutcome, CredentialReconciler};
pub use endpoints::{AddressingMode, EndpointAllocator, EndpointRequest};
pub use nodes::{NodeSelector, MIN_NODES};
pub use readiness::{poll_until_ready, PollError, Polled, Probe, RetryPolicy};
pub use svm::{ProvisionOutcome, ProvisionRequest, SvmProvisioner};
