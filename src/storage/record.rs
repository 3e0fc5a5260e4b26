//! Fixed-size node records
//!
//! Each node is encoded as five little-endian `u64` fields in the order
//! `id, begin, end, prev, next`, giving a 40 byte record. Records are keyed
//! by node id, which is all a persisted key-value backend needs to provide.

use crate::interval::{Node, NodeId};
use ahash::AHashMap;

/// Size of one encoded node record in bytes
pub const RECORD_SIZE: usize = 5 * FIELD_SIZE;

const FIELD_SIZE: usize = std::mem::size_of::<u64>();

/// Errors that can occur while decoding a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The byte slice is not exactly one record long
    #[error("record has {0} bytes, expected {}", RECORD_SIZE)]
    InvalidLength(usize),
    /// The encoded id differs from the key it is stored under
    #[error("record stores id {found} under key {key}")]
    KeyMismatch {
        /// Key the record was written under
        key: NodeId,
        /// Id decoded from the record
        found: NodeId,
    },
}

/// Encode a node into its fixed-size record
pub fn encode(node: &Node) -> [u8; RECORD_SIZE] {
    let mut record = [0u8; RECORD_SIZE];
    let fields = [
        node.id.get(),
        node.begin,
        node.end,
        node.prev.get(),
        node.next.get(),
    ];
    for (chunk, value) in record.chunks_exact_mut(FIELD_SIZE).zip(fields) {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    record
}

/// Decode a node from a record
pub fn decode(bytes: &[u8]) -> Result<Node, RecordError> {
    if bytes.len() != RECORD_SIZE {
        return Err(RecordError::InvalidLength(bytes.len()));
    }

    let mut fields = [0u64; 5];
    for (value, chunk) in fields.iter_mut().zip(bytes.chunks_exact(FIELD_SIZE)) {
        let mut raw = [0u8; FIELD_SIZE];
        raw.copy_from_slice(chunk);
        *value = u64::from_le_bytes(raw);
    }

    let [id, begin, end, prev, next] = fields;
    Ok(Node {
        id: NodeId::new(id),
        begin,
        end,
        prev: NodeId::new(prev),
        next: NodeId::new(next),
    })
}

/// Node store holding encoded records keyed by id
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: AHashMap<NodeId, [u8; RECORD_SIZE]>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record bytes for `id`
    pub fn record(&self, id: NodeId) -> Option<&[u8; RECORD_SIZE]> {
        self.records.get(&id)
    }

    /// Store a raw record under `key`, checking that it decodes to that id
    pub fn put_record(&mut self, key: NodeId, bytes: &[u8]) -> Result<(), RecordError> {
        let node = decode(bytes)?;
        if node.id != key {
            return Err(RecordError::KeyMismatch { key, found: node.id });
        }
        self.records.insert(key, encode(&node));
        Ok(())
    }

    /// Total bytes held by records
    pub fn footprint(&self) -> usize {
        self.records.len() * RECORD_SIZE
    }
}

impl super::NodeStore for RecordStore {
    fn load(&self, id: NodeId) -> Option<Node> {
        // Records only enter through `encode`/`put_record`, so they always decode
        self.records.get(&id).and_then(|bytes| decode(bytes).ok())
    }

    fn store(&mut self, node: Node) {
        self.records.insert(node.id, encode(&node));
    }

    fn erase(&mut self, id: NodeId) -> Option<Node> {
        self.records.remove(&id).and_then(|bytes| decode(&bytes).ok())
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&mut self) {
        self.records.clear();
    }
}
