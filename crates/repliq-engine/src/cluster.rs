//! Interface to a storage cluster.
//!
//! The engine never talks HTTP itself. Everything it needs from a cluster goes
//! through [`ClusterApi`], which the command line implements over the cluster
//! REST API and tests implement in memory.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{ClusterIdentity, NodeNetworks, PathStatus, RawRelationship, Role};

/// Parameters of a new source-side relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Source directory, ending in `/`.
    pub source_path: String,
    /// Destination floating address chosen by the balancer.
    pub target_address: String,
    /// Destination directory, ending in `/`.
    pub target_path: String,
    /// Whether the destination may already contain data.
    pub allow_non_empty: bool,
}

/// An authenticated session with one cluster.
///
/// Every call is a single remote request. Implementations classify failures
/// into [`crate::ReplError`] variants: unreachable hosts and rejected
/// sessions must surface as the fatal `Connection`/`Auth` kinds so callers can
/// abort; everything else is attributable to the item being processed.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Host this session is bound to.
    fn host(&self) -> &str;

    /// Cluster display name and id. May fail independently of other calls.
    async fn cluster_identity(&self) -> Result<ClusterIdentity>;

    /// All relationship records this cluster holds in the given role.
    async fn list_relationships(&self, role: Role) -> Result<Vec<RawRelationship>>;

    /// Create a source-side relationship.
    async fn create_relationship(&self, request: &CreateRequest) -> Result<RawRelationship>;

    /// Authorize a pending relationship on the destination.
    async fn accept_relationship(&self, id: &str, allow_non_empty: bool)
        -> Result<RawRelationship>;

    /// Delete a relationship record held in `role`.
    async fn delete_relationship(&self, role: Role, id: &str) -> Result<()>;

    /// Make a directory read-only.
    async fn set_readonly(&self, path: &str) -> Result<()>;

    /// Floating addresses of every network on every node.
    async fn list_networks(&self) -> Result<Vec<NodeNetworks>>;

    /// Names of the immediate child directories of `basepath`, in listing order.
    async fn list_subdirectories(&self, basepath: &str) -> Result<Vec<String>>;

    /// Whether `path` is absent, empty or populated.
    async fn path_status(&self, path: &str) -> Result<PathStatus>;
}
