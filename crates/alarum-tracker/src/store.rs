//! Persistent index of outstanding requests, ordered by window start.
//!
//! Backed by sled (pure-Rust, no C dependencies). Named trees:
//!   by_window — factory(32) ‖ window_start(u64 BE) ‖ request_id(32) → bincode(TrackedRequest)
//!   by_id     — request_id(32) → bincode(TrackedRequest)
//!
//! The big-endian composite key makes sled's ordered iteration serve the
//! range queries executors poll with ("first request with window start ≥ X").

use alarum_core::error::AlarumError;
use alarum_core::types::{AccountId, RequestId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One tracked request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRequest {
    pub factory: AccountId,
    pub request_id: RequestId,
    pub window_start: u64,
}

/// Comparison operator for [`RequestTracker::query`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryOp {
    /// Earliest request with window start ≥ value.
    Gte,
    /// Earliest request with window start > value.
    Gt,
    /// Latest request with window start ≤ value.
    Lte,
    /// Latest request with window start < value.
    Lt,
    /// Any request with window start = value.
    Eq,
}

const WINDOW_KEY_LEN: usize = 32 + 8 + 32;

fn window_key(factory: &AccountId, window_start: u64, id: &RequestId) -> [u8; WINDOW_KEY_LEN] {
    let mut key = [0u8; WINDOW_KEY_LEN];
    key[..32].copy_from_slice(factory.as_bytes());
    key[32..40].copy_from_slice(&window_start.to_be_bytes());
    key[40..].copy_from_slice(id.as_bytes());
    key
}

fn factory_floor(factory: &AccountId, window_start: u64) -> [u8; 40] {
    let mut key = [0u8; 40];
    key[..32].copy_from_slice(factory.as_bytes());
    key[32..].copy_from_slice(&window_start.to_be_bytes());
    key
}

fn decode_record(bytes: &[u8]) -> Result<TrackedRequest, AlarumError> {
    bincode::deserialize(bytes).map_err(|e| AlarumError::Serialization(e.to_string()))
}

/// Registry collaborator: indexes requests by `(factory, window_start)`.
pub struct RequestTracker {
    _db: sled::Db,
    by_window: sled::Tree,
    by_id: sled::Tree,
}

impl RequestTracker {
    /// Open or create the tracker database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AlarumError> {
        let db = sled::open(path).map_err(|e| AlarumError::Storage(e.to_string()))?;
        let by_window = db.open_tree("by_window").map_err(|e| AlarumError::Storage(e.to_string()))?;
        let by_id     = db.open_tree("by_id").map_err(|e| AlarumError::Storage(e.to_string()))?;
        Ok(Self { _db: db, by_window, by_id })
    }

    pub fn add_request(
        &self,
        factory: &AccountId,
        request_id: &RequestId,
        window_start: u64,
    ) -> Result<(), AlarumError> {
        let record = TrackedRequest {
            factory: factory.clone(),
            request_id: request_id.clone(),
            window_start,
        };
        let bytes = bincode::serialize(&record)
            .map_err(|e| AlarumError::Serialization(e.to_string()))?;
        self.by_window
            .insert(window_key(factory, window_start, request_id), bytes.clone())
            .map_err(|e| AlarumError::Storage(e.to_string()))?;
        self.by_id
            .insert(request_id.as_bytes(), bytes)
            .map_err(|e| AlarumError::Storage(e.to_string()))?;
        info!(request = %request_id, window_start, "tracked request");
        Ok(())
    }

    pub fn remove_request(&self, request_id: &RequestId) -> Result<(), AlarumError> {
        let record = self
            .get(request_id)?
            .ok_or_else(|| AlarumError::RequestNotTracked(request_id.to_hex()))?;
        self.by_window
            .remove(window_key(&record.factory, record.window_start, request_id))
            .map_err(|e| AlarumError::Storage(e.to_string()))?;
        self.by_id
            .remove(request_id.as_bytes())
            .map_err(|e| AlarumError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get(&self, request_id: &RequestId) -> Result<Option<TrackedRequest>, AlarumError> {
        match self
            .by_id
            .get(request_id.as_bytes())
            .map_err(|e| AlarumError::Storage(e.to_string()))?
        {
            Some(bytes) => Ok(Some(decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn is_known_request(&self, request_id: &RequestId) -> bool {
        self.by_id.contains_key(request_id.as_bytes()).unwrap_or(false)
    }

    pub fn window_start_of(&self, request_id: &RequestId) -> Result<Option<u64>, AlarumError> {
        Ok(self.get(request_id)?.map(|r| r.window_start))
    }

    /// First request of `factory` whose window start satisfies `op value`,
    /// in the direction the operator implies.
    pub fn query(
        &self,
        factory: &AccountId,
        op: QueryOp,
        value: u64,
    ) -> Result<Option<RequestId>, AlarumError> {
        let floor = factory_floor(factory, 0).to_vec();
        let ceiling = factory_floor(factory, u64::MAX)
            .iter()
            .copied()
            .chain([0xffu8; 32])
            .collect::<Vec<u8>>();

        let item = match op {
            QueryOp::Gte => {
                let start = factory_floor(factory, value).to_vec();
                self.by_window.range(start..=ceiling).next()
            }
            QueryOp::Gt => {
                let start = match value.checked_add(1) {
                    Some(v) => factory_floor(factory, v).to_vec(),
                    None => return Ok(None),
                };
                self.by_window.range(start..=ceiling).next()
            }
            QueryOp::Lte => {
                let end = factory_floor(factory, value)
                    .iter()
                    .copied()
                    .chain([0xffu8; 32])
                    .collect::<Vec<u8>>();
                self.by_window.range(floor..=end).next_back()
            }
            QueryOp::Lt => {
                if value == 0 {
                    return Ok(None);
                }
                let end = factory_floor(factory, value - 1)
                    .iter()
                    .copied()
                    .chain([0xffu8; 32])
                    .collect::<Vec<u8>>();
                self.by_window.range(floor..=end).next_back()
            }
            QueryOp::Eq => {
                let start = factory_floor(factory, value).to_vec();
                let end = start
                    .iter()
                    .copied()
                    .take(32)
                    .chain(value.to_be_bytes())
                    .chain([0xffu8; 32])
                    .collect::<Vec<u8>>();
                self.by_window.range(start..=end).next()
            }
        };

        match item {
            Some(entry) => {
                let (_, bytes) = entry.map_err(|e| AlarumError::Storage(e.to_string()))?;
                Ok(Some(decode_record(&bytes)?.request_id))
            }
            None => Ok(None),
        }
    }

    /// The request after `request_id` in window-start order, same factory.
    pub fn next_request(&self, request_id: &RequestId) -> Result<Option<RequestId>, AlarumError> {
        let record = self
            .get(request_id)?
            .ok_or_else(|| AlarumError::RequestNotTracked(request_id.to_hex()))?;
        let key = window_key(&record.factory, record.window_start, request_id).to_vec();
        let ceiling = factory_floor(&record.factory, u64::MAX)
            .iter()
            .copied()
            .chain([0xffu8; 32])
            .collect::<Vec<u8>>();
        // Exclusive lower bound: skip the entry itself.
        let mut after = key.clone();
        after.push(0);
        match self.by_window.range(after..=ceiling).next() {
            Some(entry) => {
                let (_, bytes) = entry.map_err(|e| AlarumError::Storage(e.to_string()))?;
                Ok(Some(decode_record(&bytes)?.request_id))
            }
            None => Ok(None),
        }
    }

    /// The request before `request_id` in window-start order, same factory.
    pub fn previous_request(
        &self,
        request_id: &RequestId,
    ) -> Result<Option<RequestId>, AlarumError> {
        let record = self
            .get(request_id)?
            .ok_or_else(|| AlarumError::RequestNotTracked(request_id.to_hex()))?;
        let key = window_key(&record.factory, record.window_start, request_id).to_vec();
        let floor = factory_floor(&record.factory, 0).to_vec();
        match self.by_window.range(floor..key).next_back() {
            Some(entry) => {
                let (_, bytes) = entry.map_err(|e| AlarumError::Storage(e.to_string()))?;
                Ok(Some(decode_record(&bytes)?.request_id))
            }
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), AlarumError> {
        self._db.flush().map_err(|e| AlarumError::Storage(e.to_string()))?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
