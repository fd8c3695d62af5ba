//! Relationship data model.
//!
//! [`RawRelationship`] mirrors the JSON records returned by a cluster and
//! tolerates any field being absent or null. [`Relationship`] is the canonical
//! shape the rest of the engine works with.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Which side of a relationship a record was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Record owned by the source cluster.
    Source,
    /// Record owned by the destination cluster.
    Destination,
}

impl Role {
    /// Display label, also used as the CSV `cluster_type` value.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Source => "Source",
            Role::Destination => "Destination",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Relationship state as reported by the owning cluster.
///
/// States this engine does not know about are carried through verbatim in
/// [`ReplicationState::Unknown`] so new remote states never break a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReplicationState {
    /// Destination has not yet authorized the relationship.
    AwaitingAuthorization,
    /// Initial sync finished, relationship idle and consistent.
    Established,
    /// A replication job is running.
    Replicating,
    /// The relationship is being set up.
    Creating,
    /// The two clusters cannot reach each other.
    Disconnected,
    /// Source side was deleted; the destination keeps this remnant.
    Ended,
    /// Any other state string.
    Unknown(String),
}

impl ReplicationState {
    /// Parse a remote state tag. Missing or blank tags become `UNKNOWN`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "AWAITING_AUTHORIZATION" => ReplicationState::AwaitingAuthorization,
            "ESTABLISHED" => ReplicationState::Established,
            "REPLICATING" => ReplicationState::Replicating,
            "CREATING" => ReplicationState::Creating,
            "DISCONNECTED" => ReplicationState::Disconnected,
            "ENDED" => ReplicationState::Ended,
            "" => ReplicationState::Unknown("UNKNOWN".to_string()),
            _ => ReplicationState::Unknown(trimmed.to_string()),
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            ReplicationState::AwaitingAuthorization => "AWAITING_AUTHORIZATION",
            ReplicationState::Established => "ESTABLISHED",
            ReplicationState::Replicating => "REPLICATING",
            ReplicationState::Creating => "CREATING",
            ReplicationState::Disconnected => "DISCONNECTED",
            ReplicationState::Ended => "ENDED",
            ReplicationState::Unknown(tag) => tag,
        }
    }

    /// True for relationships waiting on the destination to accept them.
    ///
    /// Some cluster versions report these as `PENDING`.
    pub fn is_pending(&self) -> bool {
        match self {
            ReplicationState::AwaitingAuthorization => true,
            ReplicationState::Unknown(tag) => tag.eq_ignore_ascii_case("PENDING"),
            _ => false,
        }
    }
}

impl fmt::Display for ReplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ReplicationState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReplicationState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ReplicationState::parse(&tag))
    }
}

/// How the source schedules replication jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Replicate continuously.
    Continuous,
    /// Replicate snapshots taken by a policy.
    SnapshotPolicy,
    /// Policy snapshots plus continuous replication.
    SnapshotPolicyWithContinuous,
    /// Any other mode string.
    Other(String),
}

impl ReplicationMode {
    /// Parse a remote mode tag.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "REPLICATION_CONTINUOUS" => ReplicationMode::Continuous,
            "REPLICATION_SNAPSHOT_POLICY" => ReplicationMode::SnapshotPolicy,
            "REPLICATION_SNAPSHOT_POLICY_WITH_CONTINUOUS" => {
                ReplicationMode::SnapshotPolicyWithContinuous
            }
            other => ReplicationMode::Other(other.to_string()),
        }
    }

    /// Wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            ReplicationMode::Continuous => "REPLICATION_CONTINUOUS",
            ReplicationMode::SnapshotPolicy => "REPLICATION_SNAPSHOT_POLICY",
            ReplicationMode::SnapshotPolicyWithContinuous => {
                "REPLICATION_SNAPSHOT_POLICY_WITH_CONTINUOUS"
            }
            ReplicationMode::Other(tag) => tag,
        }
    }

    /// Human label for card output.
    pub fn label(&self) -> &str {
        match self {
            ReplicationMode::Continuous | ReplicationMode::SnapshotPolicyWithContinuous => {
                "Continuous"
            }
            ReplicationMode::SnapshotPolicy => "Snapshot Policy",
            ReplicationMode::Other(tag) => tag,
        }
    }
}

impl Serialize for ReplicationMode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ReplicationMode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(ReplicationMode::parse(&tag))
    }
}

/// Name and id of a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    /// Display name.
    pub name: String,
    /// Cluster UUID.
    pub id: String,
}

impl ClusterIdentity {
    /// Literal used when the identity query fails.
    pub const UNKNOWN: &'static str = "Unknown";

    /// Identity placeholder for a cluster whose identity could not be read.
    pub fn unknown() -> Self {
        Self {
            name: Self::UNKNOWN.to_string(),
            id: Self::UNKNOWN.to_string(),
        }
    }
}

/// A relationship record exactly as a cluster returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRelationship {
    /// Relationship id.
    pub id: Option<String>,
    /// Source directory.
    pub source_root_path: Option<String>,
    /// Destination directory.
    pub target_root_path: Option<String>,
    /// Source cluster display name.
    pub source_cluster_name: Option<String>,
    /// Destination cluster display name.
    pub target_cluster_name: Option<String>,
    /// Destination address the source replicates to.
    pub target_address: Option<String>,
    /// State tag.
    pub state: Option<String>,
    /// Alternative state field used by some cluster versions.
    pub relationship_state: Option<String>,
    /// Error of the last replication job.
    pub error_from_last_job: Option<String>,
    /// Timestamp of the last consistent replicated state (RFC 3339).
    pub recovery_point: Option<String>,
    /// Snapshots waiting to replicate (source side only).
    pub queued_snapshot_count: Option<u64>,
    /// Replication mode (source side only).
    pub replication_mode: Option<String>,
}

/// A replication relationship as seen from one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    /// Opaque id assigned by the owning cluster.
    pub id: String,
    /// Side this record was fetched from.
    pub role: Role,
    /// Source directory, ending in `/`.
    pub source_path: String,
    /// Destination directory, ending in `/`.
    pub target_path: String,
    /// Source cluster name, `Unknown` when unreported.
    pub source_cluster_name: String,
    /// Destination cluster name, `Unknown` when unreported.
    pub target_cluster_name: String,
    /// Destination address used by the source, when reported.
    pub target_address: Option<String>,
    /// Current state.
    pub state: ReplicationState,
    /// Last job error, if any.
    pub error: Option<String>,
    /// Last consistent replicated state.
    pub recovery_point: Option<DateTime<Utc>>,
    /// Snapshot backlog.
    pub queued_snapshots: Option<u64>,
    /// Replication mode.
    pub mode: Option<ReplicationMode>,
}

impl Relationship {
    /// Name of the cluster on the other side of this record.
    pub fn remote_cluster(&self) -> &str {
        match self.role {
            Role::Source => &self.target_cluster_name,
            Role::Destination => &self.source_cluster_name,
        }
    }
}

/// Format a recovery point the way CSV stores it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a remote RFC 3339 timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Floating addresses one node reports for one network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkAddresses {
    /// Network name.
    pub name: String,
    /// Floating addresses on this node.
    pub floating_addresses: Vec<String>,
}

/// Network status of one node of a cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeNetworks {
    /// Node id.
    pub node_id: u64,
    /// Node name.
    pub node_name: String,
    /// Networks configured on the node.
    pub network_statuses: Vec<NetworkAddresses>,
}

/// Whether a destination directory can receive a new relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// Nothing exists at the path.
    Absent,
    /// Directory exists with no children.
    Empty,
    /// Directory exists and holds this many children.
    NonEmpty(u64),
}
