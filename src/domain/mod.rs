//! Domain layer - SVM data model and external system ports
//!
//! The provisioning engine only talks to the storage controller and the
//! secret store through the traits defined here.

pub mod ports;

pub use ports::*;
