//! Per-direction traffic aggregation for an edge.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};

/// Initial capacity of a source bucket; captures tend to arrive in bursts.
pub const DEFAULT_FRAME_BUCKET_CAPACITY: usize = 64;

/// One observed frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub port_src: Option<u16>,
    pub port_dst: Option<u16>,
    pub protocol: String,
    pub frame_index: u64,
    pub timestamp: DateTime<Utc>,
    pub bytes: u64,
}

impl FrameRecord {
    pub fn new(protocol: impl Into<String>, frame_index: u64, bytes: u64) -> Self {
        Self {
            port_src: None,
            port_dst: None,
            protocol: protocol.into(),
            frame_index,
            timestamp: Utc::now(),
            bytes,
        }
    }

    pub fn with_ports(mut self, port_src: u16, port_dst: u16) -> Self {
        self.port_src = Some(port_src);
        self.port_dst = Some(port_dst);
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Serializable copy of a [`ConnectionDetails`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSnapshot {
    pub total_bytes: u64,
    pub protocols: BTreeSet<String>,
    pub frames: BTreeMap<String, Vec<FrameRecord>>,
}

#[derive(Debug, Default)]
struct Aggregate {
    protocols: BTreeSet<String>,
    frames: AHashMap<String, Vec<FrameRecord>>,
    frame_count: usize,
}

/// Traffic in one direction of an edge, bucketed by import source.
///
/// Writers are serialized by an internal mutex. `total_bytes` is read without
/// the lock and only grows after the matching frame is stored, so it never
/// exceeds the sum of stored frames.
#[derive(Debug, Default)]
pub struct ConnectionDetails {
    aggregate: Mutex<Aggregate>,
    total_bytes: AtomicU64,
}

impl ConnectionDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self, source: &str, frame: FrameRecord) {
        let bytes = frame.bytes;
        let mut agg = self.aggregate.lock();
        if !agg.protocols.contains(&frame.protocol) {
            agg.protocols.insert(frame.protocol.clone());
        }
        agg.frames
            .entry(source.to_string())
            .or_insert_with(|| Vec::with_capacity(DEFAULT_FRAME_BUCKET_CAPACITY))
            .push(frame);
        agg.frame_count += 1;
        self.total_bytes.fetch_add(bytes, Ordering::AcqRel);
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Acquire)
    }

    pub fn frame_count(&self) -> usize {
        self.aggregate.lock().frame_count
    }

    pub fn protocols(&self) -> BTreeSet<String> {
        self.aggregate.lock().protocols.clone()
    }

    /// Frames from one source, in arrival order
    pub fn frames_from(&self, source: &str) -> Vec<FrameRecord> {
        self.aggregate
            .lock()
            .frames
            .get(source)
            .cloned()
            .unwrap_or_default()
    }

    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = self.aggregate.lock().frames.keys().cloned().collect();
        sources.sort();
        sources
    }

    pub fn is_empty(&self) -> bool {
        self.aggregate.lock().frame_count == 0
    }

    /// Consistent copy taken under the lock
    pub fn snapshot(&self) -> ConnectionSnapshot {
        let agg = self.aggregate.lock();
        let frames: BTreeMap<String, Vec<FrameRecord>> = agg
            .frames
            .iter()
            .map(|(source, list)| (source.clone(), list.clone()))
            .collect();
        let total_bytes = frames.values().flatten().map(|f| f.bytes).sum();
        ConnectionSnapshot {
            total_bytes,
            protocols: agg.protocols.clone(),
            frames,
        }
    }

    /// Replay a snapshot into this aggregator (deserialization path)
    pub fn absorb(&self, snapshot: &ConnectionSnapshot) {
        for (source, frames) in &snapshot.frames {
            for frame in frames {
                self.record_frame(source, frame.clone());
            }
        }
    }
}
