//! Reads relationship state from a cluster into the canonical model.

use tracing::{debug, warn};

use crate::cluster::ClusterApi;
use crate::error::Result;
use crate::model::{
    parse_timestamp, ClusterIdentity, RawRelationship, Relationship, ReplicationMode,
    ReplicationState, Role,
};
use crate::paths::dir_path;

/// Point-in-time view of the relationships one cluster holds in one role.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    /// Role the relationships were listed in.
    pub role: Role,
    /// Identity of the cluster, `Unknown` when the lookup failed.
    pub identity: ClusterIdentity,
    /// Relationships in fetch order.
    pub relationships: Vec<Relationship>,
    /// Non-fatal problems met while reading.
    pub warnings: Vec<String>,
}

/// Fetches and normalises relationship records.
pub struct RelationshipReader;

impl RelationshipReader {
    /// Read every relationship `cluster` holds in `role`.
    ///
    /// A failed identity lookup does not fail the read: name and id fall back
    /// to `Unknown` and a single warning is recorded on the view. A failed
    /// relationship listing is returned as an error.
    pub async fn read(cluster: &dyn ClusterApi, role: Role) -> Result<ClusterView> {
        let mut warnings = Vec::new();
        let identity = match cluster.cluster_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                let msg = format!(
                    "could not read identity of {} cluster {}: {}",
                    role.label().to_lowercase(),
                    cluster.host(),
                    e
                );
                warn!("{}", msg);
                warnings.push(msg);
                ClusterIdentity::unknown()
            }
        };

        let raw = cluster.list_relationships(role).await?;
        debug!(
            "Read {} {} relationship(s) from {}",
            raw.len(),
            role.label().to_lowercase(),
            identity.name
        );

        let relationships = raw
            .into_iter()
            .map(|r| Self::normalize(r, role, &identity.name))
            .collect();

        Ok(ClusterView {
            role,
            identity,
            relationships,
            warnings,
        })
    }

    /// Map one raw record onto the canonical shape.
    ///
    /// `local_name` fills in the owning cluster's name when the record does
    /// not carry it.
    pub fn normalize(raw: RawRelationship, role: Role, local_name: &str) -> Relationship {
        let state_tag = non_empty(raw.state)
            .or_else(|| non_empty(raw.relationship_state))
            .unwrap_or_default();

        let mut source_cluster_name = non_empty(raw.source_cluster_name);
        let mut target_cluster_name = non_empty(raw.target_cluster_name);
        let local = Some(local_name.to_string()).filter(|n| n != ClusterIdentity::UNKNOWN);
        match role {
            Role::Source if source_cluster_name.is_none() => source_cluster_name = local,
            Role::Destination if target_cluster_name.is_none() => target_cluster_name = local,
            _ => {}
        }

        Relationship {
            id: raw.id.unwrap_or_default(),
            role,
            source_path: non_empty(raw.source_root_path)
                .map(|p| dir_path(&p))
                .unwrap_or_default(),
            target_path: non_empty(raw.target_root_path)
                .map(|p| dir_path(&p))
                .unwrap_or_default(),
            source_cluster_name: source_cluster_name
                .unwrap_or_else(|| ClusterIdentity::UNKNOWN.to_string()),
            target_cluster_name: target_cluster_name
                .unwrap_or_else(|| ClusterIdentity::UNKNOWN.to_string()),
            target_address: non_empty(raw.target_address),
            state: ReplicationState::parse(&state_tag),
            error: non_empty(raw.error_from_last_job),
            recovery_point: non_empty(raw.recovery_point).and_then(|ts| parse_timestamp(&ts)),
            queued_snapshots: raw.queued_snapshot_count,
            mode: non_empty(raw.replication_mode).map(|m| ReplicationMode::parse(&m)),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_source() -> RawRelationship {
        RawRelationship {
            id: Some("rel-1".into()),
            source_root_path: Some("/data/prod".into()),
            target_root_path: Some("/data/prod/".into()),
            target_cluster_name: Some("dst-cluster".into()),
            target_address: Some("10.1.1.20".into()),
            state: Some("ESTABLISHED".into()),
            error_from_last_job: Some("".into()),
            recovery_point: Some("2025-10-21T06:40:30.804453983Z".into()),
            queued_snapshot_count: Some(2),
            replication_mode: Some("REPLICATION_CONTINUOUS".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_source_record() {
        let rel = RelationshipReader::normalize(raw_source(), Role::Source, "src-cluster");
        assert_eq!(rel.id, "rel-1");
        assert_eq!(rel.source_path, "/data/prod/");
        assert_eq!(rel.target_path, "/data/prod/");
        assert_eq!(rel.source_cluster_name, "src-cluster");
        assert_eq!(rel.target_cluster_name, "dst-cluster");
        assert_eq!(rel.state, ReplicationState::Established);
        assert!(rel.error.is_none());
        assert!(rel.recovery_point.is_some());
        assert_eq!(rel.queued_snapshots, Some(2));
        assert_eq!(rel.mode, Some(ReplicationMode::Continuous));
        assert_eq!(rel.remote_cluster(), "dst-cluster");
    }

    #[test]
    fn test_normalize_missing_optionals() {
        let raw = RawRelationship {
            id: Some("rel-2".into()),
            ..Default::default()
        };
        let rel = RelationshipReader::normalize(raw, Role::Destination, "Unknown");
        assert_eq!(rel.source_cluster_name, "Unknown");
        assert_eq!(rel.target_cluster_name, "Unknown");
        assert_eq!(rel.state.as_str(), "UNKNOWN");
        assert!(rel.error.is_none());
        assert!(rel.recovery_point.is_none());
        assert!(rel.queued_snapshots.is_none());
        assert!(rel.mode.is_none());
        assert!(rel.target_address.is_none());
    }

    #[test]
    fn test_relationship_state_fallback_field() {
        let raw = RawRelationship {
            id: Some("rel-3".into()),
            relationship_state: Some("AWAITING_AUTHORIZATION".into()),
            ..Default::default()
        };
        let rel = RelationshipReader::normalize(raw, Role::Destination, "dst");
        assert!(rel.state.is_pending());
        assert_eq!(rel.target_cluster_name, "dst");
    }

    #[test]
    fn test_unparseable_recovery_point_is_absent() {
        let raw = RawRelationship {
            recovery_point: Some("not a time".into()),
            ..raw_source()
        };
        let rel = RelationshipReader::normalize(raw, Role::Source, "src");
        assert!(rel.recovery_point.is_none());
    }
}
