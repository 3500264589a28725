//! In-Memory Storage Controller
//!
//! A storage controller kept entirely in process memory. SVMs move from
//! `creating` to `running` after a configurable number of UUID lookups, names
//! are unique per kind just as on a real cluster, and every call is counted
//! so tests can assert on the exact traffic the engine generated.

use crate::domain::ports::{
    Account, AccountApi, AccountSpec, Aggregate, AggregateApi, InterfaceSpec, NetworkApi, Node,
    NodeApi, PartitionApi, PeeringApi, Svm, SvmCreateRequest, SvmState,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

// =============================================================================
// Call Counters
// =============================================================================

/// Number of calls received per operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub svm_name_lookups: u32,
    pub svm_uuid_lookups: u32,
    pub svm_creates: u32,
    pub node_lists: u32,
    pub aggregate_lists: u32,
    pub interface_creates: u32,
    pub peer_group_probes: u32,
    pub account_creates: u32,
    pub account_lookups: u32,
    pub password_rotations: u32,
}

// =============================================================================
// Controller State
// =============================================================================

#[derive(Debug, Clone)]
struct SvmRecord {
    svm: Svm,
    lookups: u32,
}

#[derive(Debug, Clone)]
struct AccountRecord {
    role: String,
    password: String,
}

#[derive(Debug, Default)]
struct State {
    nodes: Vec<Node>,
    aggregates: Vec<Aggregate>,
    peer_groups: usize,
    svms: BTreeMap<String, SvmRecord>,
    svm_requests: Vec<SvmCreateRequest>,
    interfaces: Vec<InterfaceSpec>,
    accounts: BTreeMap<(String, String), AccountRecord>,
    calls: CallCounts,
    next_uuid: u64,
}

// =============================================================================
// Memory Controller
// =============================================================================

/// Storage controller double backed by process memory
#[derive(Debug)]
pub struct MemoryController {
    state: Mutex<State>,
    /// UUID lookups before a new SVM reports `running`, `None` for never
    running_after: Option<u32>,
    /// UUID lookups before NVMe is enabled, `None` to follow `running_after`
    nvme_after: Option<u32>,
    failing_interfaces: HashSet<String>,
}

impl Default for MemoryController {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryController {
    /// Controller with one aggregate, no nodes and no BGP peer groups; new
    /// SVMs are ready on the first UUID lookup
    pub fn new() -> Self {
        let state = State {
            aggregates: vec![Aggregate {
                uuid: "aggr-uuid-1".into(),
                name: "aggr1".into(),
            }],
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            running_after: Some(1),
            nvme_after: None,
            failing_interfaces: HashSet::new(),
        }
    }

    pub fn with_nodes(self, nodes: Vec<Node>) -> Self {
        self.state.lock().nodes = nodes;
        self
    }

    pub fn with_aggregates(self, names: &[&str]) -> Self {
        self.state.lock().aggregates = names
            .iter()
            .enumerate()
            .map(|(i, name)| Aggregate {
                uuid: format!("aggr-uuid-{}", i + 1),
                name: name.to_string(),
            })
            .collect();
        self
    }

    pub fn with_peer_groups(self, count: usize) -> Self {
        self.state.lock().peer_groups = count;
        self
    }

    /// Pre-existing SVM that is already running with NVMe enabled
    pub fn with_running_svm(self, name: &str, uuid: &str) -> Self {
        let svm = Svm {
            name: name.to_string(),
            uuid: Some(uuid.to_string()),
            state: SvmState::Running,
            nvme_enabled: true,
            aggregates: vec![],
        };
        self.state
            .lock()
            .svms
            .insert(name.to_string(), SvmRecord { svm, lookups: 0 });
        self
    }

    /// Pre-existing account on an SVM
    pub fn with_account(self, owner_uuid: &str, username: &str, password: &str) -> Self {
        self.state.lock().accounts.insert(
            (owner_uuid.to_string(), username.to_string()),
            AccountRecord {
                role: "vsadmin".into(),
                password: password.to_string(),
            },
        );
        self
    }

    pub fn ready_after(mut self, lookups: u32) -> Self {
        self.running_after = Some(lookups);
        self
    }

    pub fn nvme_after(mut self, lookups: u32) -> Self {
        self.nvme_after = Some(lookups);
        self
    }

    /// New SVMs stay in `creating` forever
    pub fn never_ready(mut self) -> Self {
        self.running_after = None;
        self
    }

    /// Fail every create of the named interface
    pub fn fail_interface(mut self, name: &str) -> Self {
        self.failing_interfaces.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }

    /// Interfaces that exist, in creation order
    pub fn interfaces(&self) -> Vec<InterfaceSpec> {
        self.state.lock().interfaces.clone()
    }

    /// Every accepted SVM create request
    pub fn svm_requests(&self) -> Vec<SvmCreateRequest> {
        self.state.lock().svm_requests.clone()
    }

    pub fn svm_by_name(&self, name: &str) -> Option<Svm> {
        self.state.lock().svms.get(name).map(|r| r.svm.clone())
    }

    /// Current password of an account
    pub fn account_password(&self, owner_uuid: &str, username: &str) -> Option<String> {
        self.state
            .lock()
            .accounts
            .get(&(owner_uuid.to_string(), username.to_string()))
            .map(|a| a.password.clone())
    }

    fn advance(&self, record: &mut SvmRecord) {
        record.lookups += 1;
        let lookups = record.lookups;
        let reached = |threshold: Option<u32>| threshold.is_some_and(|t| lookups >= t);

        if reached(self.running_after) {
            record.svm.state = SvmState::Running;
        }
        let nvme_threshold = self.nvme_after.or(self.running_after);
        if reached(nvme_threshold) {
            record.svm.nvme_enabled = true;
        }
    }
}

#[async_trait]
impl PartitionApi for MemoryController {
    async fn get_svm_by_name(&self, name: &str) -> Result<Option<Svm>> {
        let mut state = self.state.lock();
        state.calls.svm_name_lookups += 1;
        Ok(state.svms.get(name).map(|r| r.svm.clone()))
    }

    async fn get_svm(&self, uuid: &str) -> Result<Svm> {
        let mut state = self.state.lock();
        state.calls.svm_uuid_lookups += 1;

        let record = state
            .svms
            .values_mut()
            .find(|r| r.svm.uuid.as_deref() == Some(uuid))
            .ok_or_else(|| Error::NotFound {
                kind: "Svm".into(),
                name: uuid.to_string(),
            })?;
        self.advance(record);
        Ok(record.svm.clone())
    }

    async fn create_svm(&self, request: &SvmCreateRequest) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.svm_creates += 1;

        if state.svms.contains_key(&request.name) {
            return Err(Error::AlreadyExists {
                kind: "Svm".into(),
                name: request.name.clone(),
            });
        }

        state.next_uuid += 1;
        let svm = Svm {
            name: request.name.clone(),
            uuid: Some(format!("svm-uuid-{}", state.next_uuid)),
            state: SvmState::Creating,
            nvme_enabled: false,
            aggregates: request.aggregates.clone(),
        };
        debug!(name = %request.name, "Memory controller accepted SVM create");
        state
            .svms
            .insert(request.name.clone(), SvmRecord { svm, lookups: 0 });
        state.svm_requests.push(request.clone());
        Ok(())
    }
}

#[async_trait]
impl NodeApi for MemoryController {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut state = self.state.lock();
        state.calls.node_lists += 1;
        Ok(state.nodes.clone())
    }
}

#[async_trait]
impl AggregateApi for MemoryController {
    async fn list_aggregates(&self) -> Result<Vec<Aggregate>> {
        let mut state = self.state.lock();
        state.calls.aggregate_lists += 1;
        Ok(state.aggregates.clone())
    }
}

#[async_trait]
impl NetworkApi for MemoryController {
    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.interface_creates += 1;

        if self.failing_interfaces.contains(&spec.name) {
            return Err(Error::Controller {
                operation: "create interface".into(),
                status: 500,
                message: format!("injected failure for {}", spec.name),
            });
        }
        if state
            .interfaces
            .iter()
            .any(|i| i.name == spec.name && i.svm_uuid == spec.svm_uuid)
        {
            return Err(Error::AlreadyExists {
                kind: "NetworkInterface".into(),
                name: spec.name.clone(),
            });
        }

        state.interfaces.push(spec.clone());
        Ok(())
    }
}

#[async_trait]
impl PeeringApi for MemoryController {
    async fn bgp_peer_group_count(&self) -> Result<usize> {
        let mut state = self.state.lock();
        state.calls.peer_group_probes += 1;
        Ok(state.peer_groups)
    }
}

#[async_trait]
impl AccountApi for MemoryController {
    async fn create_account(&self, spec: &AccountSpec) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.account_creates += 1;

        let key = (spec.owner_uuid.clone(), spec.credentials.username.clone());
        if state.accounts.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind: "Account".into(),
                name: spec.credentials.username.clone(),
            });
        }

        state.accounts.insert(
            key,
            AccountRecord {
                role: spec.role.clone(),
                password: spec.credentials.password.clone(),
            },
        );
        Ok(())
    }

    async fn get_account(&self, owner_uuid: &str, username: &str) -> Result<Option<Account>> {
        let mut state = self.state.lock();
        state.calls.account_lookups += 1;

        Ok(state
            .accounts
            .get(&(owner_uuid.to_string(), username.to_string()))
            .map(|record| Account {
                owner_uuid: owner_uuid.to_string(),
                username: username.to_string(),
                role: record.role.clone(),
                locked: false,
            }))
    }

    async fn set_account_password(
        &self,
        owner_uuid: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let mut state = self.state.lock();
        state.calls.password_rotations += 1;

        let record = state
            .accounts
            .get_mut(&(owner_uuid.to_string(), username.to_string()))
            .ok_or_else(|| Error::NotFound {
                kind: "Account".into(),
                name: username.to_string(),
            })?;
        record.password = password.to_string();
        Ok(())
    }
}
