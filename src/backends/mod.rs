//! Storage Controller Adapters
//!
//! - ONTAP: cluster management REST API over HTTPS
//! - Memory: scripted controller for tests and dry runs

pub mod memory;
pub mod ontap;

pub use memory::{CallCounts, MemoryController};
pub use ontap::OntapClient;
