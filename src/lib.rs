//! Family Graph
//!
//! A persisted family tree: members are nodes, relationships are signed
//! generation deltas stored as symmetric edge pairs, and every member gets
//! display coordinates from its generation.
//!
//! # Architecture
//!
//! - [`persistence`]: the durable member and edge collections (RocksDB or memory)
//! - [`graph`]: entity model, session-cached graph store and generation layout
//! - [`family`]: the facade adding generation inference on member creation
//! - [`http`]: JSON API over the facade
//! - [`config`]: YAML configuration
//!
//! # Example
//!
//! ```rust
//! use family_graph::{Family, Link, MemoryCollection, Person};
//! use std::sync::Arc;
//!
//! let mut family = Family::new(Arc::new(MemoryCollection::new()));
//!
//! let ana = family.add_member(Person::new("Ana", "Silva").with_generation(0), None).unwrap();
//! let bia = family
//!     .add_member(Person::new("Bia", "Silva"), Some(Link::new(ana.id, 1)))
//!     .unwrap();
//!
//! assert_eq!(bia.generation(), 1);
//! assert_eq!(family.store().get_edge(bia.id, ana.id).unwrap().relationship, 1);
//! ```

pub mod config;
pub mod family;
pub mod graph;
pub mod http;
pub mod persistence;

// Re-export main types for convenience
pub use config::{ConfigError, FamilyConfig, LayoutConfig, ServerConfig, StorageBackend, StorageConfig};

pub use family::{Family, Link};

pub use graph::{
    Edge, EdgeId, GenerationLayout, GraphError, GraphResult, GraphStore, Member, MemberPatch, Node,
    NodeId, Person, Position, PropertyMap, PropertyValue,
};

pub use http::{router, HttpServer};

pub use persistence::{FamilyCollection, MemoryCollection, RocksCollection, StorageError, StorageResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
