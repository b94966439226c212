//! Persistence layer for the family graph
//!
//! The durable source of truth is a [`FamilyCollection`]: a member collection
//! plus an edge collection, both keyed by identifiers the collection
//! generates. Two implementations are provided:
//! - [`MemoryCollection`] for tests and ephemeral runs
//! - [`RocksCollection`] for durable storage on disk

pub mod memory;
pub mod storage;

pub use memory::MemoryCollection;
pub use storage::RocksCollection;

use crate::graph::{Edge, EdgeId, Member, MemberPatch, NodeId, Person};
use regex::Regex;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Operation attempted before `connect`
    #[error("Collection is not connected")]
    NotConnected,

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// The collection refused a write
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// The collection cannot be reached
    #[error("Collection unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Document collection holding members and relationship records.
///
/// All calls are blocking and single-attempt. Listing calls return records in
/// ascending identifier order.
pub trait FamilyCollection: Send + Sync {
    /// Connect if not already connected. Calling it again is a no-op.
    fn connect(&self) -> StorageResult<()>;

    fn is_connected(&self) -> bool;

    /// Store a new member and return the stored record with its generated id
    fn insert_member(&self, person: &Person) -> StorageResult<Member>;

    fn find_member(&self, id: NodeId) -> StorageResult<Option<Member>>;

    fn find_members(&self) -> StorageResult<Vec<Member>>;

    /// Members whose `field` text matches `pattern`
    fn find_members_matching(&self, field: &str, pattern: &Regex) -> StorageResult<Vec<Member>>;

    /// Apply a partial update; `false` when the member does not exist
    fn update_member(&self, id: NodeId, patch: &MemberPatch) -> StorageResult<bool>;

    /// `false` when the member does not exist
    fn delete_member(&self, id: NodeId) -> StorageResult<bool>;

    /// Store one directional edge record and return it with its generated id
    fn insert_edge(&self, source: NodeId, target: NodeId, relationship: i64) -> StorageResult<Edge>;

    /// Directed lookup of the record `source -> target`
    fn find_edge(&self, source: NodeId, target: NodeId) -> StorageResult<Option<Edge>>;

    fn find_edges_from(&self, source: NodeId) -> StorageResult<Vec<Edge>>;

    fn find_edges(&self) -> StorageResult<Vec<Edge>>;

    /// `false` when the edge does not exist
    fn update_edge(&self, id: EdgeId, relationship: i64) -> StorageResult<bool>;

    /// `false` when the edge does not exist
    fn delete_edge(&self, id: EdgeId) -> StorageResult<bool>;
}
