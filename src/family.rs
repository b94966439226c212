//! Family tree facade
//!
//! Wraps the [`GraphStore`] with the operations a family tree client needs.
//! The only logic beyond delegation is generation inference when a new member
//! is attached to an existing one.

use crate::config::LayoutConfig;
use crate::graph::{
    Edge, GenerationLayout, GraphError, GraphResult, GraphStore, Member, MemberPatch, Node,
    NodeId, Person,
};
use crate::persistence::FamilyCollection;
use std::sync::Arc;
use tracing::{info, warn};

/// Attachment of a new member to an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Link {
    /// Member the newcomer is related to
    pub previous: NodeId,
    /// Code from the newcomer to `previous`
    pub relationship: i64,
}

impl Link {
    pub fn new(previous: NodeId, relationship: i64) -> Self {
        Link {
            previous,
            relationship,
        }
    }
}

/// A family tree backed by a [`FamilyCollection`]
#[derive(Debug)]
pub struct Family {
    store: GraphStore,
}

impl Family {
    pub fn new(collection: Arc<dyn FamilyCollection>) -> Self {
        Family {
            store: GraphStore::new(collection),
        }
    }

    pub fn with_layout(collection: Arc<dyn FamilyCollection>, layout: LayoutConfig) -> Self {
        Family {
            store: GraphStore::with_layout(collection, GenerationLayout::new(layout)),
        }
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Connect to the collection and load the graph for this session
    pub fn connect(&mut self) -> GraphResult<()> {
        self.store.ensure_synced()
    }

    /// Reload the graph from the collection
    pub fn refresh(&mut self) -> GraphResult<()> {
        self.store.refresh()
    }

    /// Store a new member, optionally related to an existing one.
    ///
    /// A linked member without a generation gets
    /// `previous.generation + relationship`. An unlinked member without one
    /// starts at generation 0. Nothing is written when the link is invalid.
    pub fn add_member(&mut self, mut person: Person, link: Option<Link>) -> GraphResult<Member> {
        self.store.ensure_synced()?;

        if let Some(link) = link {
            let previous = self
                .store
                .cached_node(link.previous)
                .ok_or(GraphError::NodeNotFound(link.previous))?;
            if link.relationship.checked_neg().is_none() {
                return Err(GraphError::InvalidRelationship(link.relationship));
            }
            if person.generation.is_none() {
                let generation = previous
                    .generation()
                    .checked_add(link.relationship)
                    .ok_or(GraphError::InvalidRelationship(link.relationship))?;
                person.generation = Some(generation);
            }
        }
        if person.generation.is_none() {
            person.generation = Some(0);
        }

        let id = self.store.add_node(person)?;

        if let Some(link) = link {
            if let Err(err) = self.store.add_edge(id, link.previous, link.relationship) {
                warn!("Removing member {} after failed link to {}: {}", id, link.previous, err);
                if let Err(cleanup) = self.store.remove_node(id) {
                    warn!("Could not remove member {}: {}", id, cleanup);
                }
                return Err(err);
            }
        }

        let member = self
            .store
            .cached_node(id)
            .map(|node| node.member.clone())
            .ok_or(GraphError::NodeNotFound(id))?;
        info!(
            "Added member {} {} ({}) at generation {}",
            member.person.first_name,
            member.person.last_name,
            id,
            member.generation()
        );
        Ok(member)
    }

    pub fn add_relationship(&mut self, source: NodeId, target: NodeId, relationship: i64) -> GraphResult<()> {
        self.store.add_edge(source, target, relationship)
    }

    pub fn change_relationship(&mut self, source: NodeId, target: NodeId, relationship: i64) -> GraphResult<()> {
        self.store.change_edge(source, target, relationship)
    }

    pub fn remove_relationship(&mut self, source: NodeId, target: NodeId) -> GraphResult<bool> {
        self.store.remove_edge(source, target)
    }

    pub fn update_member(&mut self, id: NodeId, patch: &MemberPatch) -> GraphResult<Option<Node>> {
        self.store.update_node(id, patch)
    }

    /// Remove a member and every relationship touching it
    pub fn remove_member(&mut self, id: NodeId) -> GraphResult<bool> {
        let removed = self.store.remove_node(id)?;
        if removed {
            info!("Removed member {}", id);
        }
        Ok(removed)
    }

    pub fn get_member(&mut self, id: NodeId) -> GraphResult<Option<Node>> {
        self.store.ensure_synced()?;
        self.store.get_node(id)
    }

    /// Members whose `field` matches `pattern`, ignoring case
    pub fn get_members_by_attribute(&mut self, field: &str, pattern: &str) -> GraphResult<Vec<Node>> {
        self.store.ensure_synced()?;
        self.store.get_nodes_by_attribute(field, pattern)
    }

    /// Every member with freshly laid out coordinates
    pub fn get_all_members(&mut self) -> GraphResult<Vec<Node>> {
        self.store.get_all_nodes()
    }

    /// Outgoing relationship records of a member
    pub fn relationships_of(&mut self, id: NodeId) -> GraphResult<Vec<Edge>> {
        self.store.ensure_synced()?;
        self.store
            .get_node(id)?
            .map(|node| node.edges)
            .ok_or(GraphError::NodeNotFound(id))
    }

    pub fn member_count(&self) -> usize {
        self.store.node_count()
    }

    pub fn relationship_count(&self) -> usize {
        self.store.edge_count()
    }
}
