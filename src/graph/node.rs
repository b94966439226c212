//! Graph node wrapping a stored member and its outgoing edges

use super::edge::Edge;
use super::member::Member;
use super::types::{NodeId, Position};
use serde::{Deserialize, Serialize};

/// A member plus the relationship records it holds.
///
/// Neighbours are referenced by [`NodeId`] only; they are resolved through
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub member: Member,

    /// Outgoing edges in insertion order
    pub edges: Vec<Edge>,
}

impl Node {
    pub fn new(member: Member) -> Self {
        Node {
            member,
            edges: Vec::new(),
        }
    }

    pub fn with_edges(member: Member, edges: Vec<Edge>) -> Self {
        Node { member, edges }
    }

    pub fn id(&self) -> NodeId {
        self.member.id
    }

    pub fn generation(&self) -> i64 {
        self.member.generation()
    }

    pub fn position(&self) -> Option<Position> {
        self.member.position
    }

    pub fn edge_to(&self, target: NodeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.target == target)
    }

    pub(crate) fn edge_to_mut(&mut self, target: NodeId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| edge.target == target)
    }

    pub(crate) fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    /// Remove the edge toward `target`, returning it if present
    pub(crate) fn remove_edge_to(&mut self, target: NodeId) -> Option<Edge> {
        let index = self.edges.iter().position(|edge| edge.target == target)?;
        Some(self.edges.remove(index))
    }

    /// Ids of every node this one holds an edge toward
    pub fn neighbours(&self) -> Vec<NodeId> {
        self.edges.iter().map(|edge| edge.target).collect()
    }

    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}
