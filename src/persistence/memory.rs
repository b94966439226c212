//! In-memory collection
//!
//! Behaves like the durable collection (generated ids, ordered listings,
//! connect-before-use) without touching disk.

use super::{FamilyCollection, StorageError, StorageResult};
use crate::graph::{Edge, EdgeId, Member, MemberPatch, NodeId, Person};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug)]
struct MemoryState {
    members: BTreeMap<NodeId, Member>,
    edges: BTreeMap<EdgeId, Edge>,
    next_member_id: u64,
    next_edge_id: u64,
}

impl Default for MemoryState {
    fn default() -> Self {
        MemoryState {
            members: BTreeMap::new(),
            edges: BTreeMap::new(),
            next_member_id: 1,
            next_edge_id: 1,
        }
    }
}

/// Collection kept entirely in process memory
#[derive(Debug, Default)]
pub struct MemoryCollection {
    state: RwLock<MemoryState>,
    connected: AtomicBool,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, MemoryState>> {
        if !self.is_connected() {
            return Err(StorageError::NotConnected);
        }
        self.state
            .read()
            .map_err(|_| StorageError::Unavailable("collection lock poisoned".to_string()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, MemoryState>> {
        if !self.is_connected() {
            return Err(StorageError::NotConnected);
        }
        self.state
            .write()
            .map_err(|_| StorageError::Unavailable("collection lock poisoned".to_string()))
    }
}

impl FamilyCollection for MemoryCollection {
    fn connect(&self) -> StorageResult<()> {
        if !self.connected.swap(true, Ordering::SeqCst) {
            debug!("Memory collection connected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn insert_member(&self, person: &Person) -> StorageResult<Member> {
        let mut state = self.write()?;
        let id = NodeId::new(state.next_member_id);
        state.next_member_id += 1;

        let member = Member::new(id, person.clone());
        state.members.insert(id, member.clone());
        debug!("Inserted member {}", id);
        Ok(member)
    }

    fn find_member(&self, id: NodeId) -> StorageResult<Option<Member>> {
        Ok(self.read()?.members.get(&id).cloned())
    }

    fn find_members(&self) -> StorageResult<Vec<Member>> {
        Ok(self.read()?.members.values().cloned().collect())
    }

    fn find_members_matching(&self, field: &str, pattern: &Regex) -> StorageResult<Vec<Member>> {
        Ok(self
            .read()?
            .members
            .values()
            .filter(|member| member.matches(field, pattern))
            .cloned()
            .collect())
    }

    fn update_member(&self, id: NodeId, patch: &MemberPatch) -> StorageResult<bool> {
        let mut state = self.write()?;
        match state.members.get_mut(&id) {
            Some(member) => {
                patch.apply(member);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_member(&self, id: NodeId) -> StorageResult<bool> {
        Ok(self.write()?.members.remove(&id).is_some())
    }

    fn insert_edge(&self, source: NodeId, target: NodeId, relationship: i64) -> StorageResult<Edge> {
        let mut state = self.write()?;
        let id = EdgeId::new(state.next_edge_id);
        state.next_edge_id += 1;

        let edge = Edge::new(id, source, target, relationship);
        state.edges.insert(id, edge.clone());
        debug!("Inserted edge {} ({} -> {}, {})", id, source, target, relationship);
        Ok(edge)
    }

    fn find_edge(&self, source: NodeId, target: NodeId) -> StorageResult<Option<Edge>> {
        Ok(self
            .read()?
            .edges
            .values()
            .find(|edge| edge.source == source && edge.target == target)
            .cloned())
    }

    fn find_edges_from(&self, source: NodeId) -> StorageResult<Vec<Edge>> {
        Ok(self
            .read()?
            .edges
            .values()
            .filter(|edge| edge.source == source)
            .cloned()
            .collect())
    }

    fn find_edges(&self) -> StorageResult<Vec<Edge>> {
        Ok(self.read()?.edges.values().cloned().collect())
    }

    fn update_edge(&self, id: EdgeId, relationship: i64) -> StorageResult<bool> {
        let mut state = self.write()?;
        match state.edges.get_mut(&id) {
            Some(edge) => {
                edge.relationship = relationship;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_edge(&self, id: EdgeId) -> StorageResult<bool> {
        Ok(self.write()?.edges.remove(&id).is_some())
    }
}
