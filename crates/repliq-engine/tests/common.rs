//! In-memory cluster used by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use repliq_engine::cluster::{ClusterApi, CreateRequest};
use repliq_engine::model::{NetworkAddresses, NodeNetworks};
use repliq_engine::{ClusterIdentity, PathStatus, RawRelationship, ReplError, Result, Role};

/// How a scripted call fails.
#[derive(Clone, Copy, Debug)]
pub enum Failure {
    NotEmpty,
    AlreadyExists,
    Remote,
    Connection,
}

impl Failure {
    fn to_error(self, host: &str, path: &str) -> ReplError {
        match self {
            Failure::NotEmpty => ReplError::TargetNotEmpty { path: path.into() },
            Failure::AlreadyExists => ReplError::AlreadyExists { path: path.into() },
            Failure::Remote => ReplError::Remote {
                status: 500,
                msg: format!("scripted failure for {}", path),
            },
            Failure::Connection => ReplError::Connection {
                host: host.into(),
                msg: "connection reset".into(),
            },
        }
    }
}

#[derive(Default)]
struct FakeState {
    source_rels: Vec<RawRelationship>,
    destination_rels: Vec<RawRelationship>,
    subdirs: HashMap<String, Vec<String>>,
    path_status: HashMap<String, PathStatus>,
    networks: Vec<NodeNetworks>,
    create_failures: HashMap<String, Failure>,
    accept_failures: HashMap<String, Failure>,
    created: Vec<CreateRequest>,
    accepted: Vec<(String, bool)>,
    deleted: Vec<(Role, String)>,
    readonly: Vec<String>,
    path_checks: Vec<String>,
    next_id: u64,
}

/// Scriptable stand-in for one cluster.
pub struct FakeCluster {
    host: String,
    name: String,
    identity_fails: bool,
    listing_fails: bool,
    readonly_fails: bool,
    state: Mutex<FakeState>,
}

impl FakeCluster {
    pub fn new(host: &str, name: &str) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            identity_fails: false,
            listing_fails: false,
            readonly_fails: false,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub fn with_subdirs(self, base: &str, names: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .subdirs
            .insert(base.into(), names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn with_relationship(self, role: Role, raw: RawRelationship) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            match role {
                Role::Source => state.source_rels.push(raw),
                Role::Destination => state.destination_rels.push(raw),
            }
        }
        self
    }

    pub fn with_network(self, node_id: u64, name: &str, addresses: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let status = NetworkAddresses {
                name: name.into(),
                floating_addresses: addresses.iter().map(|a| a.to_string()).collect(),
            };
            match state.networks.iter_mut().find(|n| n.node_id == node_id) {
                Some(node) => node.network_statuses.push(status),
                None => state.networks.push(NodeNetworks {
                    node_id,
                    node_name: format!("{}-{}", self.name, node_id),
                    network_statuses: vec![status],
                }),
            }
        }
        self
    }

    pub fn with_path_status(self, path: &str, status: PathStatus) -> Self {
        self.state
            .lock()
            .unwrap()
            .path_status
            .insert(path.into(), status);
        self
    }

    pub fn failing_create(self, source_path: &str, failure: Failure) -> Self {
        self.state
            .lock()
            .unwrap()
            .create_failures
            .insert(source_path.into(), failure);
        self
    }

    pub fn failing_accept(self, id: &str, failure: Failure) -> Self {
        self.state
            .lock()
            .unwrap()
            .accept_failures
            .insert(id.into(), failure);
        self
    }

    pub fn failing_identity(mut self) -> Self {
        self.identity_fails = true;
        self
    }

    pub fn failing_listing(mut self) -> Self {
        self.listing_fails = true;
        self
    }

    pub fn failing_readonly(mut self) -> Self {
        self.readonly_fails = true;
        self
    }

    pub fn created(&self) -> Vec<CreateRequest> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn created_addresses(&self) -> Vec<String> {
        self.created().into_iter().map(|c| c.target_address).collect()
    }

    pub fn accepted(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .accepted
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn accept_flags(&self) -> Vec<bool> {
        self.state
            .lock()
            .unwrap()
            .accepted
            .iter()
            .map(|(_, allow)| *allow)
            .collect()
    }

    pub fn deleted(&self) -> Vec<(Role, String)> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn readonly(&self) -> Vec<String> {
        self.state.lock().unwrap().readonly.clone()
    }

    pub fn path_checks(&self) -> Vec<String> {
        self.state.lock().unwrap().path_checks.clone()
    }

    /// Number of calls that changed cluster state.
    pub fn mutations(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.created.len() + state.accepted.len() + state.deleted.len() + state.readonly.len()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    fn host(&self) -> &str {
        &self.host
    }

    async fn cluster_identity(&self) -> Result<ClusterIdentity> {
        if self.identity_fails {
            return Err(ReplError::IdentityLookup("node state unavailable".into()));
        }
        Ok(ClusterIdentity {
            name: self.name.clone(),
            id: format!("{}-uuid", self.name),
        })
    }

    async fn list_relationships(&self, role: Role) -> Result<Vec<RawRelationship>> {
        if self.listing_fails {
            return Err(ReplError::Connection {
                host: self.host.clone(),
                msg: "connection refused".into(),
            });
        }
        let state = self.state.lock().unwrap();
        Ok(match role {
            Role::Source => state.source_rels.clone(),
            Role::Destination => state.destination_rels.clone(),
        })
    }

    async fn create_relationship(&self, request: &CreateRequest) -> Result<RawRelationship> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.create_failures.get(&request.source_path) {
            return Err(failure.to_error(&self.host, &request.source_path));
        }
        state.next_id += 1;
        let raw = RawRelationship {
            id: Some(format!("rel-{}", state.next_id)),
            source_root_path: Some(request.source_path.clone()),
            target_root_path: Some(request.target_path.clone()),
            source_cluster_name: Some(self.name.clone()),
            target_address: Some(request.target_address.clone()),
            state: Some("AWAITING_AUTHORIZATION".into()),
            ..Default::default()
        };
        state.source_rels.push(raw.clone());
        state.created.push(request.clone());
        Ok(raw)
    }

    async fn accept_relationship(
        &self,
        id: &str,
        allow_non_empty: bool,
    ) -> Result<RawRelationship> {
        let mut state = self.state.lock().unwrap();
        if let Some(failure) = state.accept_failures.get(id) {
            return Err(failure.to_error(&self.host, id));
        }
        state.accepted.push((id.into(), allow_non_empty));
        let rel = state
            .destination_rels
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id))
            .ok_or_else(|| ReplError::Remote {
                status: 404,
                msg: format!("no relationship {}", id),
            })?;
        rel.state = Some("ESTABLISHED".into());
        rel.relationship_state = None;
        Ok(rel.clone())
    }

    async fn delete_relationship(&self, role: Role, id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let list = match role {
            Role::Source => &mut state.source_rels,
            Role::Destination => &mut state.destination_rels,
        };
        list.retain(|r| r.id.as_deref() != Some(id));
        state.deleted.push((role, id.into()));
        Ok(())
    }

    async fn set_readonly(&self, path: &str) -> Result<()> {
        if self.readonly_fails {
            return Err(ReplError::Remote {
                status: 403,
                msg: "permission denied".into(),
            });
        }
        self.state.lock().unwrap().readonly.push(path.into());
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NodeNetworks>> {
        Ok(self.state.lock().unwrap().networks.clone())
    }

    async fn list_subdirectories(&self, basepath: &str) -> Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .subdirs
            .get(basepath)
            .cloned()
            .unwrap_or_default())
    }

    async fn path_status(&self, path: &str) -> Result<PathStatus> {
        let mut state = self.state.lock().unwrap();
        state.path_checks.push(path.into());
        Ok(state
            .path_status
            .get(path)
            .copied()
            .unwrap_or(PathStatus::Absent))
    }
}

pub fn source_rel(id: &str, path: &str, address: &str, state: &str) -> RawRelationship {
    RawRelationship {
        id: Some(id.into()),
        source_root_path: Some(path.into()),
        target_root_path: Some(path.into()),
        target_cluster_name: Some("dst-cluster".into()),
        target_address: Some(address.into()),
        state: Some(state.into()),
        ..Default::default()
    }
}

pub fn destination_rel(id: &str, path: &str, state: &str) -> RawRelationship {
    RawRelationship {
        id: Some(id.into()),
        source_root_path: Some(path.into()),
        target_root_path: Some(path.into()),
        source_cluster_name: Some("src-cluster".into()),
        state: Some(state.into()),
        ..Default::default()
    }
}

/// Destination with one node exposing the given floating addresses on `Default`.
pub fn destination_with(addresses: &[&str]) -> FakeCluster {
    FakeCluster::new("dst.example", "dst-cluster").with_network(1, "Default", addresses)
}

/// Ids of relationships currently held in `role`.
pub fn ids(cluster: &FakeCluster, role: Role) -> HashSet<String> {
    let state = cluster.state.lock().unwrap();
    let list = match role {
        Role::Source => &state.source_rels,
        Role::Destination => &state.destination_rels,
    };
    list.iter().filter_map(|r| r.id.clone()).collect()
}
