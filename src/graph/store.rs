//! Graph store: in-memory adjacency synchronized with a family collection
//!
//! The collection is the durable source of truth. The store keeps a
//! session cache of every node and its outgoing edges, filled by one explicit
//! synchronization and kept current by routing every mutation through the
//! collection first. The cache changes only after the collection accepted
//! the write.
//!
//! Relationship records always come in pairs (see [`crate::graph::edge`]).
//! Pair writes are not atomic at the storage layer, so a failed second write
//! is compensated by undoing the first one. If the compensation fails too the
//! caller gets [`GraphError::InconsistentState`].

use super::edge::{orient, Edge};
use super::layout::GenerationLayout;
use super::member::{MemberPatch, Person};
use super::node::Node;
use super::types::NodeId;
use crate::persistence::{FamilyCollection, StorageError};
use indexmap::IndexMap;
use regex::RegexBuilder;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Errors that can occur during graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("No relationship between {0} and {1}")]
    EdgeNotFound(NodeId, NodeId),

    #[error("Node {0} cannot be related to itself")]
    SelfRelationship(NodeId),

    #[error("Relationship between {0} and {1} already exists")]
    EdgeAlreadyExists(NodeId, NodeId),

    /// Code (or inferred generation) outside the representable range
    #[error("Invalid relationship code: {0}")]
    InvalidRelationship(i64),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Persistence error: {0}")]
    Persistence(#[from] StorageError),

    /// Stored data breaks the edge pairing rules
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// A pair write failed half way and could not be undone
    #[error("Inconsistent relationship between {node_a} and {node_b}: {reason}")]
    InconsistentState {
        node_a: NodeId,
        node_b: NodeId,
        reason: String,
    },
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Session-scoped graph over a [`FamilyCollection`]
pub struct GraphStore {
    collection: Arc<dyn FamilyCollection>,

    /// Node cache in ascending id order
    nodes: IndexMap<NodeId, Node>,

    layout: GenerationLayout,

    /// Whether the cache reflects the collection for this session
    synced: bool,
}

impl GraphStore {
    pub fn new(collection: Arc<dyn FamilyCollection>) -> Self {
        Self::with_layout(collection, GenerationLayout::default())
    }

    pub fn with_layout(collection: Arc<dyn FamilyCollection>, layout: GenerationLayout) -> Self {
        GraphStore {
            collection,
            nodes: IndexMap::new(),
            layout,
            synced: false,
        }
    }

    pub fn collection(&self) -> &Arc<dyn FamilyCollection> {
        &self.collection
    }

    pub fn layout(&self) -> &GenerationLayout {
        &self.layout
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// Connect and synchronize once per session
    pub fn ensure_synced(&mut self) -> GraphResult<()> {
        if self.synced {
            return Ok(());
        }
        self.collection.connect()?;
        self.synchronize()
    }

    /// Drop the cache and load it again from the collection
    pub fn refresh(&mut self) -> GraphResult<()> {
        self.synced = false;
        self.nodes.clear();
        self.ensure_synced()
    }

    /// Rebuild the cache from the collection.
    ///
    /// The cache is replaced even when the stored data violates the pairing
    /// rules; the violation is returned so the caller sees it.
    pub fn synchronize(&mut self) -> GraphResult<()> {
        let members = self.collection.find_members()?;
        let edges = self.collection.find_edges()?;

        let mut nodes: IndexMap<NodeId, Node> = members
            .into_iter()
            .map(|member| (member.id, Node::new(member)))
            .collect();

        let mut problems = Vec::new();
        for edge in edges {
            match nodes.get_mut(&edge.source) {
                Some(node) => node.add_edge(edge),
                None => problems.push(format!(
                    "edge {} starts at missing member {}",
                    edge.id, edge.source
                )),
            }
        }
        nodes.sort_keys();

        self.nodes = nodes;
        self.synced = true;
        info!(
            "Synchronized {} members and {} relationships",
            self.node_count(),
            self.edge_count()
        );

        problems.extend(self.integrity_problems());
        Self::report(problems)
    }

    /// Check that every edge has its inverse and points at a live node
    pub fn verify_integrity(&self) -> GraphResult<()> {
        Self::report(self.integrity_problems())
    }

    fn integrity_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for node in self.nodes.values() {
            for edge in &node.edges {
                if edge.source != node.id() {
                    problems.push(format!("edge {} is held by {} but starts at {}", edge.id, node.id(), edge.source));
                    continue;
                }
                match self.nodes.get(&edge.target) {
                    None => problems.push(format!(
                        "edge {} points at missing member {}",
                        edge.id, edge.target
                    )),
                    Some(target) => match target.edge_to(edge.source) {
                        Some(inverse) if edge.is_inverse_of(inverse) => {}
                        Some(inverse) => problems.push(format!(
                            "edge {} ({}) and edge {} ({}) are not inverse codes",
                            edge.id, edge.relationship, inverse.id, inverse.relationship
                        )),
                        None => problems.push(format!(
                            "edge {} ({} -> {}) has no inverse",
                            edge.id, edge.source, edge.target
                        )),
                    },
                }
            }
        }
        problems
    }

    fn report(problems: Vec<String>) -> GraphResult<()> {
        if problems.is_empty() {
            return Ok(());
        }
        let message = problems.join("; ");
        error!("Graph integrity check failed: {}", message);
        Err(GraphError::InvariantViolation(message))
    }

    /// Persist a new person and cache its node
    pub fn add_node(&mut self, person: Person) -> GraphResult<NodeId> {
        self.ensure_synced()?;

        let member = self.collection.insert_member(&person)?;
        let id = member.id;
        self.nodes.insert(id, Node::new(member));

        debug!("Added node {}", id);
        Ok(id)
    }

    /// Look up a node in the cache, falling back to the collection
    pub fn get_node(&self, id: NodeId) -> GraphResult<Option<Node>> {
        if let Some(node) = self.nodes.get(&id) {
            return Ok(Some(node.clone()));
        }
        match self.collection.find_member(id)? {
            Some(member) => {
                let edges = self.collection.find_edges_from(id)?;
                Ok(Some(Node::with_edges(member, edges)))
            }
            None => Ok(None),
        }
    }

    /// Cache-only lookup
    pub fn cached_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes whose `field` matches `pattern`, case-insensitively
    pub fn get_nodes_by_attribute(&self, field: &str, pattern: &str) -> GraphResult<Vec<Node>> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        let members = self.collection.find_members_matching(field, &regex)?;

        members
            .into_iter()
            .map(|member| match self.nodes.get(&member.id) {
                Some(node) => Ok(node.clone()),
                None => {
                    let edges = self.collection.find_edges_from(member.id)?;
                    Ok(Node::with_edges(member, edges))
                }
            })
            .collect()
    }

    /// Every node with freshly computed coordinates, in ascending id order
    pub fn get_all_nodes(&mut self) -> GraphResult<Vec<Node>> {
        self.ensure_synced()?;
        self.apply_layout()?;
        Ok(self.nodes.values().cloned().collect())
    }

    /// Compute coordinates and persist them for every node
    pub fn apply_layout(&mut self) -> GraphResult<()> {
        if self.nodes.is_empty() {
            return Ok(());
        }

        let positions = self.layout.compute(self.nodes.values());
        for (id, position) in positions {
            if !self.collection.update_member(id, &MemberPatch::position(position))? {
                return Err(GraphError::InvariantViolation(format!(
                    "cached member {} is missing from the collection",
                    id
                )));
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.member.position = Some(position);
            }
        }

        debug!("Laid out {} nodes", self.nodes.len());
        Ok(())
    }

    /// Directed lookup of the record `source -> target`
    pub fn get_edge(&self, source: NodeId, target: NodeId) -> Option<&Edge> {
        self.nodes.get(&source)?.edge_to(target)
    }

    fn check_endpoints(&self, source: NodeId, target: NodeId) -> GraphResult<()> {
        if source == target {
            return Err(GraphError::SelfRelationship(source));
        }
        for id in [source, target] {
            if !self.nodes.contains_key(&id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        Ok(())
    }

    /// Both halves of the pair between two nodes, in request order
    fn edge_pair(&self, source: NodeId, target: NodeId) -> GraphResult<Option<(Edge, Edge)>> {
        let forward = self.get_edge(source, target).cloned();
        let backward = self.get_edge(target, source).cloned();
        match (forward, backward) {
            (Some(forward), Some(backward)) => Ok(Some((forward, backward))),
            (None, None) => Ok(None),
            (Some(half), None) | (None, Some(half)) => {
                let message = format!(
                    "edge {} ({} -> {}) has no inverse",
                    half.id, half.source, half.target
                );
                error!("Graph integrity check failed: {}", message);
                Err(GraphError::InvariantViolation(message))
            }
        }
    }

    /// Relate two nodes.
    ///
    /// Afterwards `source -> target` carries `relationship` and
    /// `target -> source` carries its negation.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, relationship: i64) -> GraphResult<()> {
        self.ensure_synced()?;
        let pair = orient(source, target, relationship)
            .ok_or(GraphError::InvalidRelationship(relationship))?;
        self.check_endpoints(source, target)?;
        if self.edge_pair(source, target)?.is_some() {
            return Err(GraphError::EdgeAlreadyExists(source, target));
        }

        let (from, to, code) = pair.primary;
        let primary = self.collection.insert_edge(from, to, code)?;

        let (from, to, code) = pair.inverse;
        let inverse = match self.collection.insert_edge(from, to, code) {
            Ok(edge) => edge,
            Err(cause) => return Err(self.undo_insert(&primary, cause)),
        };

        debug!(
            "Added relationship {} -> {} ({}) as edges {} and {}",
            source, target, relationship, primary.id, inverse.id
        );
        self.cache_edge(primary);
        self.cache_edge(inverse);
        Ok(())
    }

    fn undo_insert(&self, written: &Edge, cause: StorageError) -> GraphError {
        warn!("Rolling back edge {} after failed inverse write: {}", written.id, cause);
        match self.collection.delete_edge(written.id) {
            Ok(_) => GraphError::Persistence(cause),
            Err(rollback) => {
                error!("Rollback of edge {} failed: {}", written.id, rollback);
                GraphError::InconsistentState {
                    node_a: written.source,
                    node_b: written.target,
                    reason: format!(
                        "inverse write failed ({}) and edge {} could not be removed ({})",
                        cause, written.id, rollback
                    ),
                }
            }
        }
    }

    fn cache_edge(&mut self, edge: Edge) {
        if let Some(node) = self.nodes.get_mut(&edge.source) {
            node.add_edge(edge);
        }
    }

    /// Rewrite the code of an existing relationship, same convention as [`Self::add_edge`]
    pub fn change_edge(&mut self, source: NodeId, target: NodeId, relationship: i64) -> GraphResult<()> {
        self.ensure_synced()?;
        let inverse_code = relationship
            .checked_neg()
            .ok_or(GraphError::InvalidRelationship(relationship))?;
        let (forward, backward) = self
            .edge_pair(source, target)?
            .ok_or(GraphError::EdgeNotFound(source, target))?;

        if !self.collection.update_edge(forward.id, relationship)? {
            return Err(GraphError::InvariantViolation(format!(
                "cached edge {} is missing from the collection",
                forward.id
            )));
        }
        let failure = match self.collection.update_edge(backward.id, inverse_code) {
            Ok(true) => None,
            Ok(false) => Some(GraphError::InvariantViolation(format!(
                "cached edge {} is missing from the collection",
                backward.id
            ))),
            Err(cause) => Some(GraphError::Persistence(cause)),
        };
        if let Some(failure) = failure {
            warn!("Restoring edge {} after failed inverse update: {}", forward.id, failure);
            if let Err(rollback) = self.collection.update_edge(forward.id, forward.relationship) {
                error!("Restore of edge {} failed: {}", forward.id, rollback);
                return Err(GraphError::InconsistentState {
                    node_a: source,
                    node_b: target,
                    reason: format!(
                        "inverse update failed ({}) and edge {} could not be restored ({})",
                        failure, forward.id, rollback
                    ),
                });
            }
            if let GraphError::InvariantViolation(message) = &failure {
                error!("Graph integrity check failed: {}", message);
            }
            return Err(failure);
        }

        for (from, to, code) in [(source, target, relationship), (target, source, inverse_code)] {
            if let Some(edge) = self.nodes.get_mut(&from).and_then(|node| node.edge_to_mut(to)) {
                edge.relationship = code;
            }
        }
        debug!("Changed relationship {} -> {} to {}", source, target, relationship);
        Ok(())
    }

    /// Remove the relationship between two nodes, in either direction.
    ///
    /// Returns `false` when the nodes are not related.
    pub fn remove_edge(&mut self, source: NodeId, target: NodeId) -> GraphResult<bool> {
        self.ensure_synced()?;
        let (forward, backward) = match self.edge_pair(source, target)? {
            Some(pair) => pair,
            None => return Ok(false),
        };

        self.collection.delete_edge(forward.id)?;
        if let Err(cause) = self.collection.delete_edge(backward.id) {
            warn!("Restoring edge {} after failed inverse delete: {}", forward.id, cause);
            return match self
                .collection
                .insert_edge(forward.source, forward.target, forward.relationship)
            {
                Ok(restored) => {
                    if let Some(edge) = self
                        .nodes
                        .get_mut(&forward.source)
                        .and_then(|node| node.edge_to_mut(forward.target))
                    {
                        edge.id = restored.id;
                    }
                    Err(GraphError::Persistence(cause))
                }
                Err(rollback) => {
                    error!("Restore of edge {} failed: {}", forward.id, rollback);
                    if let Some(node) = self.nodes.get_mut(&forward.source) {
                        node.remove_edge_to(forward.target);
                    }
                    Err(GraphError::InconsistentState {
                        node_a: source,
                        node_b: target,
                        reason: format!(
                            "inverse delete failed ({}) and edge {} could not be restored ({})",
                            cause, forward.id, rollback
                        ),
                    })
                }
            };
        }

        for edge in [&forward, &backward] {
            if let Some(node) = self.nodes.get_mut(&edge.source) {
                node.remove_edge_to(edge.target);
            }
        }
        debug!("Removed relationship between {} and {}", source, target);
        Ok(true)
    }

    /// Remove a node after removing every relationship touching it.
    ///
    /// Like [`Self::get_node`], a member missing from the cache is looked up in
    /// the collection; if it is stored there the cache is reloaded first.
    /// Returns `false` when the collection does not hold the member either.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<bool> {
        self.ensure_synced()?;
        if !self.nodes.contains_key(&id) {
            if self.collection.find_member(id)?.is_none() {
                return Ok(false);
            }
            debug!("Node {} was stored after this session loaded, reloading", id);
            self.synchronize()?;
        }
        let own_targets = match self.nodes.get(&id) {
            Some(node) => node.neighbours(),
            None => return Ok(false),
        };

        let mut related: BTreeSet<NodeId> = own_targets.into_iter().collect();
        for node in self.nodes.values() {
            if node.edge_to(id).is_some() {
                related.insert(node.id());
            }
        }

        for other in related {
            self.remove_edge(id, other)?;
        }

        self.collection.delete_member(id)?;
        self.nodes.shift_remove(&id);

        let dangling: Vec<String> = self
            .nodes
            .values()
            .flat_map(|node| node.edges.iter())
            .filter(|edge| edge.touches(id))
            .map(|edge| edge.id.to_string())
            .collect();
        if !dangling.is_empty() {
            let message = format!(
                "edges {} still reference removed node {}",
                dangling.join(", "),
                id
            );
            error!("Graph integrity check failed: {}", message);
            return Err(GraphError::InvariantViolation(message));
        }

        debug!("Removed node {}", id);
        Ok(true)
    }

    /// Apply a partial update to a node's member record
    pub fn update_node(&mut self, id: NodeId, patch: &MemberPatch) -> GraphResult<Option<Node>> {
        self.ensure_synced()?;
        if !self.nodes.contains_key(&id) {
            return Ok(None);
        }
        if !self.collection.update_member(id, patch)? {
            return Err(GraphError::InvariantViolation(format!(
                "cached member {} is missing from the collection",
                id
            )));
        }

        Ok(self.nodes.get_mut(&id).map(|node| {
            patch.apply(&mut node.member);
            node.clone()
        }))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of relationships (each stored as two records)
    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|node| node.degree()).sum::<usize>() / 2
    }
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edge_count())
            .field("synced", &self.synced)
            .finish()
    }
}
