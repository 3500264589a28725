//! Network Endpoint Allocation
//!
//! Plans and creates the data and management interfaces of an SVM. Data
//! interfaces are placed round-robin over the selected nodes, the management
//! interface always lands on the first node. Whether addresses are host
//! routes behind a BGP peer (/32, VIP) or plain subnet addresses (/24) is
//! decided once per run by probing the controller's peer groups.

use crate::config::EngineConfig;
use crate::domain::ports::{InterfaceRole, InterfaceSpec, Node, StorageControllerRef};
use crate::error::{Error, Result};
use crate::metrics::EngineMetrics;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Service policy of every data interface
pub const DATA_SERVICE_POLICY: &str = "default-data-nvme-tcp";
/// Service policy of the management interface
pub const MANAGEMENT_SERVICE_POLICY: &str = "default-management";

// =============================================================================
// Addressing Mode
// =============================================================================

/// How interface addresses are advertised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// Floating /32 addresses announced through BGP
    HostRoute,
    /// Fixed /24 addresses on the node's subnet
    Subnet,
}

impl AddressingMode {
    pub fn from_peer_groups(count: usize) -> Self {
        if count > 0 {
            AddressingMode::HostRoute
        } else {
            AddressingMode::Subnet
        }
    }

    pub fn netmask(&self) -> u8 {
        match self {
            AddressingMode::HostRoute => 32,
            AddressingMode::Subnet => 24,
        }
    }

    pub fn vip(&self) -> bool {
        matches!(self, AddressingMode::HostRoute)
    }
}

/// Addresses requested for one SVM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRequest<'a> {
    pub svm_uuid: &'a str,
    pub data_ips: &'a [IpAddr],
    pub management_ip: IpAddr,
}

// =============================================================================
// Endpoint Allocator
// =============================================================================

/// Creates SVM network interfaces on the storage controller
pub struct EndpointAllocator {
    controller: StorageControllerRef,
    config: Arc<EngineConfig>,
    metrics: Arc<EngineMetrics>,
}

impl EndpointAllocator {
    pub fn new(
        controller: StorageControllerRef,
        config: Arc<EngineConfig>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            controller,
            config,
            metrics,
        }
    }

    /// Service policy for a role; fixed per role, never configured
    pub fn service_policy(role: InterfaceRole) -> &'static str {
        match role {
            InterfaceRole::Data => DATA_SERVICE_POLICY,
            InterfaceRole::Management => MANAGEMENT_SERVICE_POLICY,
        }
    }

    /// Query the controller for BGP peer groups
    pub async fn probe_addressing(&self) -> Result<AddressingMode> {
        let peer_groups = self.controller.bgp_peer_group_count().await?;
        let mode = AddressingMode::from_peer_groups(peer_groups);
        debug!(peer_groups, ?mode, "Probed interface addressing mode");
        Ok(mode)
    }

    /// Build every interface for the SVM: data interfaces in request order,
    /// then the management interface.
    pub fn plan(
        &self,
        request: &EndpointRequest<'_>,
        nodes: &[Node],
        mode: AddressingMode,
    ) -> Result<Vec<InterfaceSpec>> {
        let first = nodes.first().ok_or(Error::InsufficientNodes {
            found: 0,
            required: super::nodes::MIN_NODES,
        })?;

        let mut interfaces: Vec<InterfaceSpec> = request
            .data_ips
            .iter()
            .enumerate()
            .map(|(index, ip)| {
                self.spec(
                    self.config.data_interface_name(index),
                    *ip,
                    InterfaceRole::Data,
                    request.svm_uuid,
                    &nodes[index % nodes.len()],
                    mode,
                )
            })
            .collect();

        interfaces.push(self.spec(
            self.config.management_interface_tag.clone(),
            request.management_ip,
            InterfaceRole::Management,
            request.svm_uuid,
            first,
            mode,
        ));

        Ok(interfaces)
    }

    fn spec(
        &self,
        name: String,
        ip: IpAddr,
        role: InterfaceRole,
        svm_uuid: &str,
        node: &Node,
        mode: AddressingMode,
    ) -> InterfaceSpec {
        InterfaceSpec {
            name,
            ip,
            netmask: mode.netmask(),
            role,
            vip: mode.vip(),
            service_policy: Self::service_policy(role).to_string(),
            svm_uuid: svm_uuid.to_string(),
            node_uuid: node.uuid.clone(),
        }
    }

    /// Create a single interface. A name the controller already knows is
    /// left as is; any other failure names the interface.
    pub async fn create_interface(&self, spec: &InterfaceSpec) -> Result<()> {
        match self.controller.create_interface(spec).await {
            Ok(()) => {
                info!(
                    interface = %spec.name,
                    ip = %spec.ip,
                    netmask = spec.netmask,
                    vip = spec.vip,
                    node = %spec.node_uuid,
                    role = %spec.role,
                    "Created network interface"
                );
                self.metrics.record_interface_created(spec.role);
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                debug!(interface = %spec.name, "Network interface already exists");
                Ok(())
            }
            Err(e) => Err(Error::InterfaceCreation {
                interface: spec.name.clone(),
                source: Box::new(e),
            }),
        }
    }

    /// Probe, plan and create all interfaces in order, stopping at the first
    /// failure. Interfaces created before the failure are kept.
    pub async fn allocate(
        &self,
        request: &EndpointRequest<'_>,
        nodes: &[Node],
    ) -> Result<Vec<InterfaceSpec>> {
        let mode = self.probe_addressing().await?;
        let interfaces = self.plan(request, nodes, mode)?;

        for spec in &interfaces {
            self.create_interface(spec).await?;
        }

        Ok(interfaces)
    }
}
