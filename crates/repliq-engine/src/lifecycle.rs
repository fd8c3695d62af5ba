//! Relationship lifecycle operations: create, accept and clean.
//!
//! Each operation walks its candidates strictly in order and issues one
//! remote call per item. Fatal errors (see [`ReplError::is_fatal`]) abort the
//! whole action and are returned as `Err`. Every other error is recorded on
//! the item's [`ItemOutcome`] and the batch carries on.

use std::collections::HashSet;
use std::fmt;

use tracing::{error, info, warn};

use crate::balancer::EndpointPool;
use crate::cluster::{ClusterApi, CreateRequest};
use crate::error::{ReplError, Result};
use crate::filter::FilterSpec;
use crate::model::{PathStatus, Relationship, ReplicationState, Role};
use crate::paths::{child_of, child_path, dir_path, is_under, leaf_name, target_path};
use crate::reader::RelationshipReader;

/// Hint logged when the destination refuses a non-empty target.
pub const NOT_EMPTY_HINT: &str =
    "Use --allow_non_empty_dir to replicate into a non-empty directory";

/// Lifecycle action a batch report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// New source relationships.
    Create,
    /// Authorization of pending destination relationships.
    Accept,
    /// Deletion of source relationships.
    CleanSource,
    /// Deletion of ENDED destination remnants.
    CleanDestination,
}

impl Action {
    fn verb(&self) -> &'static str {
        match self {
            Action::Create => "Created",
            Action::Accept => "Accepted",
            Action::CleanSource | Action::CleanDestination => "Deleted",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Action::Create | Action::Accept => "replication relationship(s)",
            Action::CleanSource => "source relationship(s)",
            Action::CleanDestination => "ENDED relationship(s)",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Accept => "accept",
            Action::CleanSource => "clean source",
            Action::CleanDestination => "clean destination",
        };
        f.write_str(name)
    }
}

/// Result of processing one item.
#[derive(Debug)]
pub enum ItemStatus {
    /// The remote mutation went through.
    Succeeded,
    /// Nothing to do for this item, no remote mutation attempted.
    Skipped(ReplError),
    /// The item was attempted and failed.
    Failed(ReplError),
}

/// Outcome recorded for one directory or relationship.
#[derive(Debug)]
pub struct ItemOutcome {
    /// Directory the item is about, on the cluster that was mutated.
    pub path: String,
    /// Relationship id, when known.
    pub relationship_id: Option<String>,
    /// Destination address assigned by the balancer (create only).
    pub address: Option<String>,
    /// What happened.
    pub status: ItemStatus,
}

impl ItemOutcome {
    /// Error attached to a skipped or failed item.
    pub fn error(&self) -> Option<&ReplError> {
        match &self.status {
            ItemStatus::Succeeded => None,
            ItemStatus::Skipped(e) | ItemStatus::Failed(e) => Some(e),
        }
    }
}

/// Per-item outcomes of one lifecycle action.
#[derive(Debug)]
pub struct BatchReport {
    /// Action that produced the report.
    pub action: Action,
    /// Outcomes in processing order.
    pub outcomes: Vec<ItemOutcome>,
    /// True when the operator declined the confirmation gate.
    pub cancelled: bool,
}

impl BatchReport {
    fn new(action: Action) -> Self {
        Self {
            action,
            outcomes: Vec::new(),
            cancelled: false,
        }
    }

    /// Items whose remote mutation succeeded.
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Succeeded))
    }

    /// Items that were attempted and failed.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    /// Items skipped without a mutation.
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped(_)))
    }

    /// Items a mutation was attempted for.
    pub fn attempted(&self) -> usize {
        self.succeeded() + self.failed()
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    /// The aggregate `N of M` line shown at the end of an action.
    pub fn summary_line(&self) -> String {
        if self.cancelled {
            return format!("{} cancelled by operator, no changes made", self.action);
        }
        let mut line = format!(
            "{} {} of {} {}",
            self.action.verb(),
            self.succeeded(),
            self.attempted(),
            self.action.noun()
        );
        if self.skipped() > 0 {
            line.push_str(&format!(", {} skipped", self.skipped()));
        }
        line
    }

    fn push(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }
}

/// Settle the result of one remote call: fatal errors abort, others are recorded.
fn settle<T>(result: Result<T>) -> Result<std::result::Result<T, ReplError>> {
    match result {
        Ok(v) => Ok(Ok(v)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Ok(Err(e)),
    }
}

/// Options of a `create` run.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Directory whose immediate children become relationships.
    pub basepath: String,
    /// Prefix prepended to every source path on the destination.
    pub dst_path: Option<String>,
    /// Filter on child directory names.
    pub filter: FilterSpec,
    /// Skip the destination emptiness check and let the cluster accept data.
    pub allow_non_empty_dir: bool,
}

/// Create one relationship per filtered child of `basepath`.
///
/// Directories already covered by a source relationship are skipped with
/// `AlreadyExists`. Unless non-empty targets are allowed, a populated
/// destination directory fails that item with `TargetNotEmpty`. Both checks
/// happen before an address is drawn from `pool`, so skipped and refused
/// items never affect balancing.
pub async fn create_relationships(
    source: &dyn ClusterApi,
    destination: &dyn ClusterApi,
    pool: &mut EndpointPool,
    opts: &CreateOptions,
) -> Result<BatchReport> {
    let basepath = dir_path(&opts.basepath);
    let existing = RelationshipReader::read(source, Role::Source).await?;
    let seeded = pool.seed(&existing.relationships);
    info!(
        "Seeded destination load from {} existing relationship(s): {}",
        seeded,
        pool.endpoints()
            .iter()
            .map(|e| format!("{}={}", e.address, e.assigned))
            .collect::<Vec<_>>()
            .join(", ")
    );

    let mut replicated: HashSet<String> = existing
        .relationships
        .iter()
        .map(|r| r.source_path.clone())
        .collect();

    let children = source.list_subdirectories(&basepath).await?;
    let mut report = BatchReport::new(Action::Create);

    for name in children {
        let name = name.trim_matches('/');
        if !opts.filter.matches(name) {
            info!("Skipping {}{} (filtered out)", basepath, name);
            continue;
        }

        let source_path = child_path(&basepath, name);
        info!("Evaluating path {}", source_path);

        if replicated.contains(&source_path) {
            info!("Replication already exists for {}. Skipping.", source_path);
            report.push(ItemOutcome {
                path: source_path.clone(),
                relationship_id: None,
                address: None,
                status: ItemStatus::Skipped(ReplError::AlreadyExists { path: source_path }),
            });
            continue;
        }

        let target = target_path(opts.dst_path.as_deref(), &source_path);

        if !opts.allow_non_empty_dir {
            match settle(destination.path_status(&target).await)? {
                Ok(PathStatus::NonEmpty(entries)) => {
                    error!(
                        "Target directory {} holds {} entries, not creating relationship for {}",
                        target, entries, source_path
                    );
                    report.push(ItemOutcome {
                        path: source_path,
                        relationship_id: None,
                        address: None,
                        status: ItemStatus::Failed(ReplError::TargetNotEmpty { path: target }),
                    });
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Could not check target directory {}: {}", target, e);
                    report.push(ItemOutcome {
                        path: source_path,
                        relationship_id: None,
                        address: None,
                        status: ItemStatus::Failed(e),
                    });
                    continue;
                }
            }
        }

        let address = pool.assign()?;
        info!("Using address {} for {} -> {}", address, source_path, target);

        let request = CreateRequest {
            source_path: source_path.clone(),
            target_address: address.clone(),
            target_path: target.clone(),
            allow_non_empty: opts.allow_non_empty_dir,
        };
        match settle(source.create_relationship(&request).await)? {
            Ok(created) => {
                let id = created.id.unwrap_or_default();
                info!(
                    "Created replication relationship {} for {} -> {}:{}",
                    id, source_path, address, target
                );
                replicated.insert(source_path.clone());
                report.push(ItemOutcome {
                    path: source_path,
                    relationship_id: Some(id).filter(|i| !i.is_empty()),
                    address: Some(address),
                    status: ItemStatus::Succeeded,
                });
            }
            Err(e @ ReplError::AlreadyExists { .. }) => {
                info!("Replication already exists for {}. Skipping.", source_path);
                pool.release(&address);
                replicated.insert(source_path.clone());
                report.push(ItemOutcome {
                    path: source_path,
                    relationship_id: None,
                    address: None,
                    status: ItemStatus::Skipped(e),
                });
            }
            Err(e) => {
                error!("Failed to create relationship for {}: {}", source_path, e);
                report.push(ItemOutcome {
                    path: source_path,
                    relationship_id: None,
                    address: Some(address),
                    status: ItemStatus::Failed(e),
                });
            }
        }
    }

    info!("{}", report.summary_line());
    Ok(report)
}

/// Yes/no gate in front of a batch of accepts.
pub trait ConfirmGate {
    /// Show the pending relationships and ask whether to accept all of them.
    fn approve(&self, pending: &[Relationship]) -> Result<bool>;
}

/// Gate that always approves, used when no confirmation was requested.
pub struct AlwaysApprove;

impl ConfirmGate for AlwaysApprove {
    fn approve(&self, _pending: &[Relationship]) -> Result<bool> {
        Ok(true)
    }
}

/// Options of an `accept` run.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptOptions {
    /// Let the destination authorize into a directory that already holds data.
    pub allow_non_empty_dir: bool,
    /// Consult the confirmation gate before accepting anything.
    pub confirm: bool,
}

/// Authorize every pending relationship on the destination.
///
/// With `confirm` set, `gate` sees the whole pending set once. Declining
/// returns a cancelled report without any remote mutation.
pub async fn accept_pending(
    destination: &dyn ClusterApi,
    opts: &AcceptOptions,
    gate: &dyn ConfirmGate,
) -> Result<BatchReport> {
    let view = RelationshipReader::read(destination, Role::Destination).await?;
    let pending: Vec<Relationship> = view
        .relationships
        .into_iter()
        .filter(|r| r.state.is_pending())
        .collect();

    let mut report = BatchReport::new(Action::Accept);
    if pending.is_empty() {
        info!("No pending replication relationships found on {}", destination.host());
        return Ok(report);
    }

    info!("Found {} pending replication relationship(s):", pending.len());
    for rel in &pending {
        info!(
            "  {} from {}: {} -> {} ({})",
            rel.id, rel.source_cluster_name, rel.source_path, rel.target_path, rel.state
        );
    }

    if opts.confirm && !gate.approve(&pending)? {
        info!("Accept cancelled by operator");
        report.cancelled = true;
        return Ok(report);
    }

    for rel in pending {
        info!("Accepting replication {} for {}", rel.id, rel.target_path);
        match settle(
            destination
                .accept_relationship(&rel.id, opts.allow_non_empty_dir)
                .await,
        )? {
            Ok(_) => {
                info!("Successfully accepted replication {}", rel.id);
                report.push(ItemOutcome {
                    path: rel.target_path,
                    relationship_id: Some(rel.id),
                    address: None,
                    status: ItemStatus::Succeeded,
                });
            }
            Err(e) => {
                error!("Failed to accept replication {}: {}", rel.id, e);
                if matches!(e, ReplError::TargetNotEmpty { .. }) {
                    error!("{}", NOT_EMPTY_HINT);
                }
                report.push(ItemOutcome {
                    path: rel.target_path,
                    relationship_id: Some(rel.id),
                    address: None,
                    status: ItemStatus::Failed(e),
                });
            }
        }
    }

    let accepted: Vec<&ItemOutcome> = report
        .outcomes
        .iter()
        .filter(|o| matches!(o.status, ItemStatus::Succeeded))
        .collect();
    for outcome in accepted {
        info!(
            "  accepted {} at {}",
            outcome.relationship_id.as_deref().unwrap_or_default(),
            outcome.path
        );
    }
    info!("{}", report.summary_line());
    Ok(report)
}

/// Options of a source-side `clean` run.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Only relationships at or below this directory are deleted.
    pub basepath: String,
    /// Filter on the child directory name below `basepath`.
    pub filter: FilterSpec,
    /// Make each source directory read-only before deleting its relationship.
    pub set_readonly: bool,
}

/// Delete source relationships under `basepath` that pass the filter.
///
/// The read-only step is best effort: its failure is logged and the delete
/// still goes ahead.
pub async fn clean_source(source: &dyn ClusterApi, opts: &CleanOptions) -> Result<BatchReport> {
    let basepath = dir_path(&opts.basepath);
    let view = RelationshipReader::read(source, Role::Source).await?;
    let mut report = BatchReport::new(Action::CleanSource);

    for rel in view.relationships {
        if !is_under(&rel.source_path, &basepath) {
            continue;
        }
        let name = child_of(&rel.source_path, &basepath)
            .unwrap_or_else(|| leaf_name(&rel.source_path));
        if !opts.filter.matches(name) {
            info!("Skipping {} (filtered out)", rel.source_path);
            continue;
        }

        if opts.set_readonly {
            match source.set_readonly(&rel.source_path).await {
                Ok(()) => info!("Set {} read-only", rel.source_path),
                Err(e) => warn!("Could not set {} read-only: {}", rel.source_path, e),
            }
        }

        info!(
            "Deleting source relationship {} covering {}",
            rel.id, rel.source_path
        );
        let status = match settle(source.delete_relationship(Role::Source, &rel.id).await)? {
            Ok(()) => {
                info!("Successfully deleted relationship {}", rel.id);
                ItemStatus::Succeeded
            }
            Err(e) => {
                error!("Failed to delete relationship {}: {}", rel.id, e);
                ItemStatus::Failed(e)
            }
        };
        report.push(ItemOutcome {
            path: rel.source_path,
            relationship_id: Some(rel.id),
            address: None,
            status,
        });
    }

    info!("{}", report.summary_line());
    Ok(report)
}

/// Delete ENDED destination remnants whose target lies under `basepath`.
///
/// Live relationships are never candidates.
pub async fn clean_destination(
    destination: &dyn ClusterApi,
    basepath: &str,
) -> Result<BatchReport> {
    let basepath = dir_path(basepath);
    let view = RelationshipReader::read(destination, Role::Destination).await?;
    let ended: Vec<Relationship> = view
        .relationships
        .into_iter()
        .filter(|r| r.state == ReplicationState::Ended && is_under(&r.target_path, &basepath))
        .collect();

    let mut report = BatchReport::new(Action::CleanDestination);
    if ended.is_empty() {
        info!("No ENDED relationships under {} on {}", basepath, destination.host());
        return Ok(report);
    }
    info!("Found {} ENDED relationship(s) to delete", ended.len());

    for rel in ended {
        let status = match settle(delete_ended(destination, &rel).await)? {
            Ok(()) => ItemStatus::Succeeded,
            Err(e) => {
                error!("Failed to delete relationship {}: {}", rel.id, e);
                ItemStatus::Failed(e)
            }
        };
        report.push(ItemOutcome {
            path: rel.target_path,
            relationship_id: Some(rel.id),
            address: None,
            status,
        });
    }

    info!("{}", report.summary_line());
    Ok(report)
}

/// Delete one destination relationship, which must be ENDED.
///
/// Anything else is rejected with `InvalidState` before any remote call.
pub async fn delete_ended(destination: &dyn ClusterApi, rel: &Relationship) -> Result<()> {
    if rel.role != Role::Destination || rel.state != ReplicationState::Ended {
        return Err(ReplError::InvalidState {
            id: rel.id.clone(),
            state: format!("{} {}", rel.role.label().to_lowercase(), rel.state),
            expected: "destination ENDED".to_string(),
        });
    }
    info!(
        "Deleting ENDED relationship {} ({} -> {})",
        rel.id, rel.source_path, rel.target_path
    );
    destination
        .delete_relationship(Role::Destination, &rel.id)
        .await?;
    info!("Successfully deleted relationship {}", rel.id);
    Ok(())
}
