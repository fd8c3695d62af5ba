//! Cross-cluster summary aggregation.
//!
//! Source and destination views stay separate: each cluster gets its own
//! [`ClusterSummary`] built from the records that cluster reported. Nothing
//! here joins the two sides.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::cluster::ClusterApi;
use crate::error::{ReplError, Result};
use crate::model::{Relationship, ReplicationMode, ReplicationState, Role};
use crate::reader::{ClusterView, RelationshipReader};

/// Health bucket of one relationship row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Established with no error.
    Healthy,
    /// Replicating or being created.
    InProgress,
    /// Error reported, or disconnected.
    Problem,
    /// Anything else.
    Warning,
}

impl Health {
    /// Glyph shown on cards.
    pub fn glyph(&self) -> &'static str {
        match self {
            Health::Healthy => "✓",
            Health::InProgress => "⟳",
            Health::Problem => "✗",
            Health::Warning => "⚠",
        }
    }
}

/// Classify a state and error pair. Rules are checked in order.
pub fn classify(state: &ReplicationState, error: Option<&str>) -> Health {
    let has_error = error.is_some_and(|e| !e.is_empty());
    match state {
        ReplicationState::Established if !has_error => Health::Healthy,
        ReplicationState::Replicating | ReplicationState::Creating => Health::InProgress,
        _ if has_error => Health::Problem,
        ReplicationState::Disconnected => Health::Problem,
        _ => Health::Warning,
    }
}

/// One relationship flattened for rendering.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    /// Role of the cluster the row was read from.
    pub cluster_type: Role,
    /// Name of that cluster.
    pub cluster_name: String,
    /// Id of that cluster.
    pub cluster_id: String,
    /// Source directory.
    pub source_path: String,
    /// Destination directory.
    pub target_path: String,
    /// Cluster on the other side.
    pub remote_cluster: String,
    /// Relationship state.
    pub state: ReplicationState,
    /// Relationship id.
    pub replication_id: String,
    /// Last job error.
    pub error: Option<String>,
    /// Last consistent replicated state.
    #[serde(with = "recovery_point_format")]
    pub recovery_point: Option<DateTime<Utc>>,
    /// Snapshot backlog.
    pub queued_snapshots: Option<u64>,
    /// Replication mode.
    pub replication_mode: Option<ReplicationMode>,
}

impl SummaryRow {
    /// Project a relationship onto a row of the cluster it was read from.
    pub fn from_relationship(rel: &Relationship, cluster_name: &str, cluster_id: &str) -> Self {
        Self {
            cluster_type: rel.role,
            cluster_name: cluster_name.to_string(),
            cluster_id: cluster_id.to_string(),
            source_path: rel.source_path.clone(),
            target_path: rel.target_path.clone(),
            remote_cluster: rel.remote_cluster().to_string(),
            state: rel.state.clone(),
            replication_id: rel.id.clone(),
            error: rel.error.clone(),
            recovery_point: rel.recovery_point,
            queued_snapshots: rel.queued_snapshots,
            replication_mode: rel.mode.clone(),
        }
    }

    /// Health of this row, computed on demand.
    pub fn health(&self) -> Health {
        classify(&self.state, self.error.as_deref())
    }

    /// Path owned by the cluster this row came from.
    pub fn local_path(&self) -> &str {
        match self.cluster_type {
            Role::Source => &self.source_path,
            Role::Destination => &self.target_path,
        }
    }

    /// Path on the other cluster.
    pub fn remote_path(&self) -> &str {
        match self.cluster_type {
            Role::Source => &self.target_path,
            Role::Destination => &self.source_path,
        }
    }
}

mod recovery_point_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::model::{format_timestamp, parse_timestamp};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

/// Everything reported about one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Role the cluster plays.
    pub role: Role,
    /// Cluster name, `Unknown` when the identity lookup failed.
    pub cluster_name: String,
    /// Cluster id, `Unknown` when the identity lookup failed.
    pub cluster_id: String,
    /// Rows in fetch order.
    pub rows: Vec<SummaryRow>,
    /// Count per state tag, sorted by tag. States with no rows are absent.
    pub histogram: BTreeMap<String, usize>,
    /// Non-fatal problems met while reading this cluster.
    pub warnings: Vec<String>,
}

impl ClusterSummary {
    /// Build the summary of one cluster view.
    pub fn from_view(view: &ClusterView) -> Self {
        let rows: Vec<SummaryRow> = view
            .relationships
            .iter()
            .map(|r| SummaryRow::from_relationship(r, &view.identity.name, &view.identity.id))
            .collect();
        let mut histogram = BTreeMap::new();
        for row in &rows {
            *histogram.entry(row.state.as_str().to_string()).or_insert(0) += 1;
        }
        Self {
            role: view.role,
            cluster_name: view.identity.name.clone(),
            cluster_id: view.identity.id.clone(),
            rows,
            histogram,
            warnings: view.warnings.clone(),
        }
    }
}

/// Merges per-cluster views into summaries.
pub struct SummaryAggregator;

impl SummaryAggregator {
    /// One summary per view present, source first.
    pub fn aggregate(
        source: Option<&ClusterView>,
        destination: Option<&ClusterView>,
    ) -> Vec<ClusterSummary> {
        source
            .into_iter()
            .chain(destination)
            .map(ClusterSummary::from_view)
            .collect()
    }
}

/// Summaries plus the errors that kept a cluster out of the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryReport {
    /// Summaries in source, destination order.
    pub summaries: Vec<ClusterSummary>,
    /// One line per cluster that could not be read.
    pub errors: Vec<String>,
}

impl SummaryReport {
    /// All rows of all summaries, in report order.
    pub fn rows(&self) -> impl Iterator<Item = &SummaryRow> {
        self.summaries.iter().flat_map(|s| s.rows.iter())
    }

    /// True when some cluster could not be read.
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Read both clusters and build the report.
///
/// A source failure is returned as an error. A destination that could not
/// be connected or read is reported as an inline error line instead, and
/// the source summary is still produced.
pub async fn collect_summary(
    source: &dyn ClusterApi,
    destination: Option<std::result::Result<&dyn ClusterApi, ReplError>>,
) -> Result<SummaryReport> {
    let source_view = RelationshipReader::read(source, Role::Source).await?;

    let mut errors = Vec::new();
    let destination_view = match destination {
        None => None,
        Some(Ok(cluster)) => match RelationshipReader::read(cluster, Role::Destination).await {
            Ok(view) => Some(view),
            Err(e) => {
                error!("Failed to read destination cluster {}: {}", cluster.host(), e);
                errors.push(format!("Destination cluster {}: {}", cluster.host(), e));
                None
            }
        },
        Some(Err(e)) => {
            warn!("Destination cluster unavailable, reporting source only: {}", e);
            errors.push(format!("Destination cluster: {}", e));
            None
        }
    };

    Ok(SummaryReport {
        summaries: SummaryAggregator::aggregate(Some(&source_view), destination_view.as_ref()),
        errors,
    })
}
