#![warn(missing_docs)]

//! repliq engine: directory replication orchestration between a source and a destination cluster

pub mod balancer;
pub mod cluster;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod model;
pub mod paths;
pub mod reader;
pub mod render;
pub mod summary;

pub use balancer::{resolve_pool, Endpoint, EndpointPool};
pub use cluster::{ClusterApi, CreateRequest};
pub use error::{ReplError, Result};
pub use filter::{FilterMode, FilterSpec};
pub use lifecycle::{
    accept_pending, clean_destination, clean_source, create_relationships, delete_ended,
    AcceptOptions, Action, AlwaysApprove, BatchReport, CleanOptions, ConfirmGate, CreateOptions,
    ItemOutcome, ItemStatus,
};
pub use model::{
    ClusterIdentity, NodeNetworks, PathStatus, RawRelationship, Relationship, ReplicationMode,
    ReplicationState, Role,
};
pub use reader::{ClusterView, RelationshipReader};
pub use render::{render, ReportFormat, Rendered};
pub use summary::{
    collect_summary, ClusterSummary, Health, SummaryAggregator, SummaryReport, SummaryRow,
};
