//! RocksDB collection implementation
//!
//! Members and edges live in their own column families. Keys carry the
//! collection namespace as a prefix so several family trees can share one
//! database directory. Id counters are kept in the `meta` column family and
//! written in the same batch as the record they allocate for.

use super::{FamilyCollection, StorageError, StorageResult};
use crate::graph::{Edge, EdgeId, Member, MemberPatch, NodeId, Person, Position, PropertyMap};
use regex::Regex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, info};

const MEMBERS_CF: &str = "members";
const EDGES_CF: &str = "edges";
const META_CF: &str = "meta";

/// Serialized member for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredMember {
    id: u64,
    first_name: String,
    last_name: String,
    generation: Option<i64>,
    position: Option<(f64, f64)>,
    attributes: Vec<u8>, // Serialized PropertyMap
    created_at: i64,
}

impl StoredMember {
    fn encode(member: &Member) -> StorageResult<Vec<u8>> {
        let stored = StoredMember {
            id: member.id.as_u64(),
            first_name: member.person.first_name.clone(),
            last_name: member.person.last_name.clone(),
            generation: member.person.generation,
            position: member.position.map(|p| (p.x, p.y)),
            attributes: bincode::serialize(&member.person.attributes)?,
            created_at: member.created_at,
        };
        Ok(bincode::serialize(&stored)?)
    }

    fn decode(bytes: &[u8]) -> StorageResult<Member> {
        let stored: StoredMember = bincode::deserialize(bytes)?;
        let attributes: PropertyMap = bincode::deserialize(&stored.attributes)?;
        Ok(Member {
            id: NodeId::new(stored.id),
            person: Person {
                first_name: stored.first_name,
                last_name: stored.last_name,
                generation: stored.generation,
                attributes,
            },
            position: stored.position.map(|(x, y)| Position::new(x, y)),
            created_at: stored.created_at,
        })
    }
}

/// Serialized edge for storage
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEdge {
    id: u64,
    source: u64,
    target: u64,
    relationship: i64,
}

impl StoredEdge {
    fn encode(edge: &Edge) -> StorageResult<Vec<u8>> {
        let stored = StoredEdge {
            id: edge.id.as_u64(),
            source: edge.source.as_u64(),
            target: edge.target.as_u64(),
            relationship: edge.relationship,
        };
        Ok(bincode::serialize(&stored)?)
    }

    fn decode(bytes: &[u8]) -> StorageResult<Edge> {
        let stored: StoredEdge = bincode::deserialize(bytes)?;
        Ok(Edge::new(
            EdgeId::new(stored.id),
            NodeId::new(stored.source),
            NodeId::new(stored.target),
            stored.relationship,
        ))
    }
}

/// RocksDB-backed collection, opened lazily by [`FamilyCollection::connect`]
pub struct RocksCollection {
    path: PathBuf,
    namespace: String,
    db: RwLock<Option<Arc<DB>>>,
    /// Serializes id allocation
    allocator: Mutex<()>,
}

impl RocksCollection {
    pub fn new(path: impl AsRef<Path>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            namespace: namespace.into(),
            db: RwLock::new(None),
            allocator: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn open(&self) -> StorageResult<DB> {
        info!("Opening family collection at: {:?}", self.path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(MEMBERS_CF, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(EDGES_CF, Self::record_cf_options()),
            ColumnFamilyDescriptor::new(META_CF, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, &self.path, cf_descriptors)?;
        info!("Family collection opened successfully");
        Ok(db)
    }

    fn record_cf_options() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn handle(&self) -> StorageResult<Arc<DB>> {
        let guard = self
            .db
            .read()
            .map_err(|_| StorageError::Unavailable("database handle lock poisoned".to_string()))?;
        guard.as_ref().cloned().ok_or(StorageError::NotConnected)
    }

    fn cf<'a>(db: &'a DB, name: &str) -> StorageResult<&'a ColumnFamily> {
        db.cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    fn member_key(&self, id: u64) -> Vec<u8> {
        format!("{}:m:{:016x}", self.namespace, id).into_bytes()
    }

    fn edge_key(&self, id: u64) -> Vec<u8> {
        format!("{}:e:{:016x}", self.namespace, id).into_bytes()
    }

    fn counter_key(&self, kind: &str) -> Vec<u8> {
        format!("{}:next:{}", self.namespace, kind).into_bytes()
    }

    /// Read the next id for `kind` without committing it
    fn peek_next_id(&self, db: &DB, kind: &str) -> StorageResult<u64> {
        let meta = Self::cf(db, META_CF)?;
        match db.get_cf(&meta, self.counter_key(kind))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Ok(1),
        }
    }

    /// Every value stored under `prefix` in the given column family, in key order
    fn scan(&self, db: &DB, cf_name: &str, prefix: &[u8]) -> StorageResult<Vec<Box<[u8]>>> {
        let cf = Self::cf(db, cf_name)?;
        let mut values = Vec::new();
        for item in db.prefix_iterator_cf(&cf, prefix) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(value);
        }
        Ok(values)
    }

    fn scan_members(&self, db: &DB) -> StorageResult<Vec<Member>> {
        let prefix = format!("{}:m:", self.namespace);
        self.scan(db, MEMBERS_CF, prefix.as_bytes())?
            .iter()
            .map(|value| StoredMember::decode(value))
            .collect()
    }

    fn scan_edges(&self, db: &DB) -> StorageResult<Vec<Edge>> {
        let prefix = format!("{}:e:", self.namespace);
        self.scan(db, EDGES_CF, prefix.as_bytes())?
            .iter()
            .map(|value| StoredEdge::decode(value))
            .collect()
    }

    fn get_edge(&self, db: &DB, id: EdgeId) -> StorageResult<Option<Edge>> {
        let cf = Self::cf(db, EDGES_CF)?;
        match db.get_cf(&cf, self.edge_key(id.as_u64()))? {
            Some(value) => Ok(Some(StoredEdge::decode(&value)?)),
            None => Ok(None),
        }
    }

    /// Flush all data to disk
    pub fn flush(&self) -> StorageResult<()> {
        self.handle()?.flush()?;
        debug!("Flushed family collection to disk");
        Ok(())
    }
}

impl FamilyCollection for RocksCollection {
    fn connect(&self) -> StorageResult<()> {
        let mut guard = self
            .db
            .write()
            .map_err(|_| StorageError::Unavailable("database handle lock poisoned".to_string()))?;
        if guard.is_none() {
            *guard = Some(Arc::new(self.open()?));
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.db.read().map(|guard| guard.is_some()).unwrap_or(false)
    }

    fn insert_member(&self, person: &Person) -> StorageResult<Member> {
        let db = self.handle()?;
        let _allocation = self
            .allocator
            .lock()
            .map_err(|_| StorageError::Unavailable("allocator lock poisoned".to_string()))?;

        let id = self.peek_next_id(&db, "member")?;
        let member = Member::new(NodeId::new(id), person.clone());

        let members = Self::cf(&db, MEMBERS_CF)?;
        let meta = Self::cf(&db, META_CF)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&members, self.member_key(id), StoredMember::encode(&member)?);
        batch.put_cf(&meta, self.counter_key("member"), bincode::serialize(&(id + 1))?);
        db.write(batch)?;

        debug!("Stored member {} in {}", member.id, self.namespace);
        Ok(member)
    }

    fn find_member(&self, id: NodeId) -> StorageResult<Option<Member>> {
        let db = self.handle()?;
        let cf = Self::cf(&db, MEMBERS_CF)?;
        match db.get_cf(&cf, self.member_key(id.as_u64()))? {
            Some(value) => Ok(Some(StoredMember::decode(&value)?)),
            None => Ok(None),
        }
    }

    fn find_members(&self) -> StorageResult<Vec<Member>> {
        let db = self.handle()?;
        self.scan_members(&db)
    }

    fn find_members_matching(&self, field: &str, pattern: &Regex) -> StorageResult<Vec<Member>> {
        let db = self.handle()?;
        Ok(self
            .scan_members(&db)?
            .into_iter()
            .filter(|member| member.matches(field, pattern))
            .collect())
    }

    fn update_member(&self, id: NodeId, patch: &MemberPatch) -> StorageResult<bool> {
        let db = self.handle()?;
        let cf = Self::cf(&db, MEMBERS_CF)?;
        let key = self.member_key(id.as_u64());

        let mut member = match db.get_cf(&cf, &key)? {
            Some(value) => StoredMember::decode(&value)?,
            None => return Ok(false),
        };
        patch.apply(&mut member);
        db.put_cf(&cf, key, StoredMember::encode(&member)?)?;

        debug!("Updated member {} in {}", id, self.namespace);
        Ok(true)
    }

    fn delete_member(&self, id: NodeId) -> StorageResult<bool> {
        let db = self.handle()?;
        let cf = Self::cf(&db, MEMBERS_CF)?;
        let key = self.member_key(id.as_u64());

        if db.get_cf(&cf, &key)?.is_none() {
            return Ok(false);
        }
        db.delete_cf(&cf, key)?;

        debug!("Deleted member {} in {}", id, self.namespace);
        Ok(true)
    }

    fn insert_edge(&self, source: NodeId, target: NodeId, relationship: i64) -> StorageResult<Edge> {
        let db = self.handle()?;
        let _allocation = self
            .allocator
            .lock()
            .map_err(|_| StorageError::Unavailable("allocator lock poisoned".to_string()))?;

        let id = self.peek_next_id(&db, "edge")?;
        let edge = Edge::new(EdgeId::new(id), source, target, relationship);

        let edges = Self::cf(&db, EDGES_CF)?;
        let meta = Self::cf(&db, META_CF)?;
        let mut batch = WriteBatch::default();
        batch.put_cf(&edges, self.edge_key(id), StoredEdge::encode(&edge)?);
        batch.put_cf(&meta, self.counter_key("edge"), bincode::serialize(&(id + 1))?);
        db.write(batch)?;

        debug!("Stored edge {} ({} -> {}, {}) in {}", edge.id, source, target, relationship, self.namespace);
        Ok(edge)
    }

    fn find_edge(&self, source: NodeId, target: NodeId) -> StorageResult<Option<Edge>> {
        let db = self.handle()?;
        Ok(self
            .scan_edges(&db)?
            .into_iter()
            .find(|edge| edge.source == source && edge.target == target))
    }

    fn find_edges_from(&self, source: NodeId) -> StorageResult<Vec<Edge>> {
        let db = self.handle()?;
        Ok(self
            .scan_edges(&db)?
            .into_iter()
            .filter(|edge| edge.source == source)
            .collect())
    }

    fn find_edges(&self) -> StorageResult<Vec<Edge>> {
        let db = self.handle()?;
        self.scan_edges(&db)
    }

    fn update_edge(&self, id: EdgeId, relationship: i64) -> StorageResult<bool> {
        let db = self.handle()?;
        let mut edge = match self.get_edge(&db, id)? {
            Some(edge) => edge,
            None => return Ok(false),
        };
        edge.relationship = relationship;

        let cf = Self::cf(&db, EDGES_CF)?;
        db.put_cf(&cf, self.edge_key(id.as_u64()), StoredEdge::encode(&edge)?)?;

        debug!("Updated edge {} in {}", id, self.namespace);
        Ok(true)
    }

    fn delete_edge(&self, id: EdgeId) -> StorageResult<bool> {
        let db = self.handle()?;
        if self.get_edge(&db, id)?.is_none() {
            return Ok(false);
        }

        let cf = Self::cf(&db, EDGES_CF)?;
        db.delete_cf(&cf, self.edge_key(id.as_u64()))?;

        debug!("Deleted edge {} in {}", id, self.namespace);
        Ok(true)
    }
}
