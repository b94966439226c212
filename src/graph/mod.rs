//! Family graph
//!
//! This module implements the generational graph model:
//! - Members (persons) as nodes, each holding its outgoing relationship records
//! - Relationships stored as two directed records with negated codes
//! - A session cache synchronized from the persistence layer
//! - A generation-row layout for display coordinates

pub mod edge;
pub mod layout;
pub mod member;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

// Re-export main types
pub use edge::{orient, Edge, EdgePair};
pub use layout::GenerationLayout;
pub use member::{Member, MemberPatch, Person};
pub use node::Node;
pub use property::{lookup_path, PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, NodeId, Position};
