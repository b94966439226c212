//! Relationship edges
//!
//! Every relationship is stored as two directional records. For a pair
//! between `a` and `b` with code `r`:
//!
//! - `a -> b` carries `r`
//! - `b -> a` carries `-r`
//!
//! Positive codes point from the later generation toward the earlier one, so
//! a child holds `+1` toward its parent and the parent holds `-1` toward the
//! child. A code of `0` relates members of the same generation.

use super::types::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

/// One directional half of a relationship pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Identifier of this directional record
    pub id: EdgeId,

    /// Node holding the edge
    pub source: NodeId,

    /// Node the edge points to
    pub target: NodeId,

    /// Signed relationship code, also the generation delta from target to source
    pub relationship: i64,
}

impl Edge {
    pub fn new(id: EdgeId, source: NodeId, target: NodeId, relationship: i64) -> Self {
        Edge {
            id,
            source,
            target,
            relationship,
        }
    }

    /// Check if this edge connects two specific nodes (in either direction)
    pub fn connects(&self, node1: NodeId, node2: NodeId) -> bool {
        (self.source == node1 && self.target == node2)
            || (self.source == node2 && self.target == node1)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.source == node || self.target == node
    }

    /// Whether `other` is the inverse half of this record
    pub fn is_inverse_of(&self, other: &Edge) -> bool {
        self.source == other.target
            && self.target == other.source
            && other.relationship.checked_neg() == Some(self.relationship)
    }
}

/// The two records making up a relationship, primary first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePair {
    pub primary: (NodeId, NodeId, i64),
    pub inverse: (NodeId, NodeId, i64),
}

/// Normalize a relationship request into its stored pair.
///
/// The request means `source -> target` carries `relationship`. The primary
/// record is the half with the non-negative code, so a negative request swaps
/// its operands. Requests that describe the same relationship from opposite
/// ends produce the same pair.
///
/// Returns `None` for `i64::MIN`, whose negation is not representable.
pub fn orient(source: NodeId, target: NodeId, relationship: i64) -> Option<EdgePair> {
    let code = relationship.checked_abs()?;
    let (from, to) = if relationship < 0 {
        (target, source)
    } else {
        (source, target)
    };
    Some(EdgePair {
        primary: (from, to, code),
        inverse: (to, from, -code),
    })
}
