//! Sift store: coalescing ingest and ArcSwap-published cache snapshots.
//!
//! Writers feed [`Delta`]s into the ingest loop; readers hold a
//! [`CacheHandle`] and get lock-free consistent snapshots. The handle also
//! implements the [`ObjectStore`] read API the query engine consumes.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use sift_core::{CacheSnapshot, Delta, DeltaKind, MetaObj, ObjectStore, StoreError, Uid};
use smallvec::SmallVec;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Coalescing queue keyed by UID with FIFO order and fixed capacity.
pub struct Coalescer {
    map: FxHashMap<Uid, Delta>,
    order: VecDeque<Uid>,
    cap: usize,
    dropped: u64,
}

impl Coalescer {
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            map: FxHashMap::default(),
            order: VecDeque::new(),
            cap,
            dropped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, d: Delta) {
        let uid = d.uid;
        if !self.map.contains_key(&uid) {
            if self.order.len() >= self.cap {
                if let Some(old) = self.order.pop_front() {
                    self.map.remove(&old);
                    self.dropped += 1;
                }
            }
            self.order.push_back(uid);
        }
        self.map.insert(uid, d);
    }

    /// Drain all currently coalesced deltas in FIFO order.
    pub fn drain_ready(&mut self) -> Vec<Delta> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(uid) = self.order.pop_front() {
            if let Some(d) = self.map.remove(&uid) {
                out.push(d);
            }
        }
        out
    }
}

/// Builds [`CacheSnapshot`] instances from delta batches.
pub struct SnapshotBuilder {
    epoch: u64,
    items: Vec<MetaObj>,
    max_labels: Option<usize>,
    max_annos: Option<usize>,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        let max_labels = env_usize("SIFT_MAX_LABELS_PER_OBJ");
        let max_annos = env_usize("SIFT_MAX_ANNOS_PER_OBJ");
        Self {
            epoch: 0,
            items: Vec::new(),
            max_labels,
            max_annos,
        }
    }

    /// Apply a batch of deltas, replacing or removing items by UID.
    pub fn apply(&mut self, batch: Vec<Delta>) {
        for d in batch {
            match d.kind {
                DeltaKind::Applied => {
                    if let Some(obj) = shape_meta(&d, self.max_labels, self.max_annos) {
                        if let Some(idx) = self.items.iter().position(|x| x.uid == d.uid) {
                            self.items[idx] = obj;
                        } else {
                            self.items.push(obj);
                        }
                    }
                }
                DeltaKind::Deleted => {
                    self.items.retain(|x| x.uid != d.uid);
                }
            }
        }
        self.epoch = self.epoch.saturating_add(1);
    }

    pub fn freeze(&self) -> Arc<CacheSnapshot> {
        Arc::new(CacheSnapshot {
            epoch: self.epoch,
            items: self.items.clone(),
        })
    }
}

/// Shape a cached record from a delta's raw `metadata`. Objects without a
/// name are dropped.
fn shape_meta(d: &Delta, max_labels: Option<usize>, max_annos: Option<usize>) -> Option<MetaObj> {
    let meta = d.raw.get("metadata")?;
    let name = meta.get("name").and_then(|v| v.as_str())?.to_string();
    let namespace = meta
        .get("namespace")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let creation_ts = meta
        .get("creationTimestamp")
        .and_then(|v| v.as_str())
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
        .unwrap_or(0);
    let mut labels = SmallVec::<[(String, String); 8]>::new();
    let mut annotations = SmallVec::<[(String, String); 4]>::new();
    if let Some(lbls) = meta.get("labels").and_then(|m| m.as_object()) {
        for (k, v) in lbls.iter() {
            if let Some(val) = v.as_str() {
                labels.push((k.clone(), val.to_string()));
            }
            if let Some(cap) = max_labels {
                if labels.len() >= cap {
                    break;
                }
            }
        }
    }
    if let Some(ann) = meta.get("annotations").and_then(|m| m.as_object()) {
        for (k, v) in ann.iter() {
            if let Some(val) = v.as_str() {
                annotations.push((k.clone(), val.to_string()));
            }
            if let Some(cap) = max_annos {
                if annotations.len() >= cap {
                    break;
                }
            }
        }
    }
    Some(MetaObj {
        uid: d.uid,
        namespace,
        name,
        creation_ts,
        labels,
        annotations,
    })
}

/// Derive a UID from raw metadata: parse `metadata.uid` as a UUID, or hash
/// namespace/name when absent so replays stay stable.
pub fn uid_from_raw(raw: &serde_json::Value) -> Uid {
    let meta = raw.get("metadata");
    if let Some(s) = meta.and_then(|m| m.get("uid")).and_then(|v| v.as_str()) {
        if let Ok(u) = uuid::Uuid::parse_str(s) {
            return *u.as_bytes();
        }
    }
    let ns = meta
        .and_then(|m| m.get("namespace"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let name = meta
        .and_then(|m| m.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let mut h: u64 = 0xcbf29ce484222325; // 64-bit FNV-1a offset
    for b in ns.as_bytes().iter().chain(b"/".iter()).chain(name.as_bytes()) {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    let mut uid = [0u8; 16];
    uid[..8].copy_from_slice(&h.to_be_bytes());
    uid
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse::<usize>().ok())
}

/// Handle for readers: current snapshot plus epoch subscription.
#[derive(Clone)]
pub struct CacheHandle {
    snap: Arc<ArcSwap<CacheSnapshot>>,
    epoch_rx: watch::Receiver<u64>,
}

impl CacheHandle {
    pub fn current(&self) -> Arc<CacheSnapshot> {
        self.snap.load_full()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }
}

impl ObjectStore<MetaObj> for CacheHandle {
    fn list(&self, scope: &str) -> Result<Vec<MetaObj>, StoreError> {
        let snap = self.current();
        Ok(snap
            .items
            .iter()
            .filter(|o| scope.is_empty() || o.namespace.as_deref() == Some(scope))
            .cloned()
            .collect())
    }

    fn get(&self, scope: &str, name: &str) -> Result<MetaObj, StoreError> {
        let snap = self.current();
        snap.items
            .iter()
            .find(|o| {
                o.name == name && (scope.is_empty() || o.namespace.as_deref() == Some(scope))
            })
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                scope: scope.to_string(),
                name: name.to_string(),
            })
    }
}

/// Spawn an ingest loop consuming deltas and swapping snapshots. Returns a
/// sender for deltas and a handle for reads. The loop drains and publishes a
/// final snapshot when the sender side closes.
pub fn spawn_ingest(cap: usize) -> (mpsc::Sender<Delta>, CacheHandle) {
    let (tx, mut rx) = mpsc::channel::<Delta>(cap);
    let snap = Arc::new(ArcSwap::from_pointee(CacheSnapshot::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut coalescer = Coalescer::with_capacity(cap);
        let mut builder = SnapshotBuilder::new();
        let mut ticker = tokio::time::interval(std::time::Duration::from_millis(8));
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(d) => coalescer.push(d),
                        None => {
                            debug!("delta channel closed; draining and exiting ingest loop");
                            let batch = coalescer.drain_ready();
                            if !batch.is_empty() {
                                builder.apply(batch);
                                let next = builder.freeze();
                                publish(&snap_clone, &epoch_tx, next);
                            }
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    let batch = coalescer.drain_ready();
                    if !batch.is_empty() {
                        builder.apply(batch);
                        let next = builder.freeze();
                        publish(&snap_clone, &epoch_tx, next);
                    }
                }
            }
        }
        info!("ingest loop stopped");
    });

    (tx, CacheHandle { snap, epoch_rx })
}

fn publish(
    snap: &Arc<ArcSwap<CacheSnapshot>>,
    epoch_tx: &watch::Sender<u64>,
    next: Arc<CacheSnapshot>,
) {
    let epoch = next.epoch;
    metrics::gauge!("store_items", next.items.len() as f64);
    metrics::gauge!("store_epoch", epoch as f64);
    snap.store(next);
    let _ = epoch_tx.send(epoch);
}
