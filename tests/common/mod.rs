#![allow(dead_code)]

use family_graph::graph::{Edge, EdgeId, Member, MemberPatch, NodeId, Person};
use family_graph::{FamilyCollection, MemoryCollection, StorageError, StorageResult};
use regex::Regex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

const UNLIMITED: i64 = -1;

/// Memory collection that refuses a chosen write
pub struct FaultyCollection {
    inner: MemoryCollection,
    fail_member_inserts: AtomicBool,
    edge_inserts_left: AtomicI64,
    edge_updates_left: AtomicI64,
    edge_deletes_left: AtomicI64,
}

impl FaultyCollection {
    pub fn new() -> Self {
        FaultyCollection {
            inner: MemoryCollection::new(),
            fail_member_inserts: AtomicBool::new(false),
            edge_inserts_left: AtomicI64::new(UNLIMITED),
            edge_updates_left: AtomicI64::new(UNLIMITED),
            edge_deletes_left: AtomicI64::new(UNLIMITED),
        }
    }

    pub fn fail_member_inserts(&self) {
        self.fail_member_inserts.store(true, Ordering::SeqCst);
    }

    /// Allow `n` more edge inserts, refuse the next one, then recover
    pub fn allow_edge_inserts(&self, n: i64) {
        self.edge_inserts_left.store(n, Ordering::SeqCst);
    }

    pub fn allow_edge_updates(&self, n: i64) {
        self.edge_updates_left.store(n, Ordering::SeqCst);
    }

    pub fn allow_edge_deletes(&self, n: i64) {
        self.edge_deletes_left.store(n, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_member_inserts.store(false, Ordering::SeqCst);
        for counter in [&self.edge_inserts_left, &self.edge_updates_left, &self.edge_deletes_left] {
            counter.store(UNLIMITED, Ordering::SeqCst);
        }
    }

    fn take(counter: &AtomicI64, operation: &str) -> StorageResult<()> {
        let left = counter.load(Ordering::SeqCst);
        if left == UNLIMITED {
            return Ok(());
        }
        if left == 0 {
            counter.store(UNLIMITED, Ordering::SeqCst);
            return Err(StorageError::Rejected(format!("injected {} failure", operation)));
        }
        counter.store(left - 1, Ordering::SeqCst);
        Ok(())
    }
}

impl FamilyCollection for FaultyCollection {
    fn connect(&self) -> StorageResult<()> {
        self.inner.connect()
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    fn insert_member(&self, person: &Person) -> StorageResult<Member> {
        if self.fail_member_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("injected member insert failure".to_string()));
        }
        self.inner.insert_member(person)
    }

    fn find_member(&self, id: NodeId) -> StorageResult<Option<Member>> {
        self.inner.find_member(id)
    }

    fn find_members(&self) -> StorageResult<Vec<Member>> {
        self.inner.find_members()
    }

    fn find_members_matching(&self, field: &str, pattern: &Regex) -> StorageResult<Vec<Member>> {
        self.inner.find_members_matching(field, pattern)
    }

    fn update_member(&self, id: NodeId, patch: &MemberPatch) -> StorageResult<bool> {
        self.inner.update_member(id, patch)
    }

    fn delete_member(&self, id: NodeId) -> StorageResult<bool> {
        self.inner.delete_member(id)
    }

    fn insert_edge(&self, source: NodeId, target: NodeId, relationship: i64) -> StorageResult<Edge> {
        Self::take(&self.edge_inserts_left, "edge insert")?;
        self.inner.insert_edge(source, target, relationship)
    }

    fn find_edge(&self, source: NodeId, target: NodeId) -> StorageResult<Option<Edge>> {
        self.inner.find_edge(source, target)
    }

    fn find_edges_from(&self, source: NodeId) -> StorageResult<Vec<Edge>> {
        self.inner.find_edges_from(source)
    }

    fn find_edges(&self) -> StorageResult<Vec<Edge>> {
        self.inner.find_edges()
    }

    fn update_edge(&self, id: EdgeId, relationship: i64) -> StorageResult<bool> {
        Self::take(&self.edge_updates_left, "edge update")?;
        self.inner.update_edge(id, relationship)
    }

    fn delete_edge(&self, id: EdgeId) -> StorageResult<bool> {
        Self::take(&self.edge_deletes_left, "edge delete")?;
        self.inner.delete_edge(id)
    }
}

pub fn person(first_name: &str, generation: i64) -> Person {
    Person::new(first_name, "Costa").with_generation(generation)
}
