//! Best-effort mirroring of committed session state to a backing store.
//!
//! The engine computes a diff of flat records after each commit and hands it to
//! `StoreSync`, which applies it on a background thread. Store failures are logged
//! and never affect the in-memory session.

use crate::models::{CourtId, PlayerId, SessionState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// Key of one stored record.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordKey {
    Player { id: PlayerId },
    QueueEntry { player_id: PlayerId },
    CourtAssignment { court_id: CourtId, player_id: PlayerId },
    PlayerStats { player_id: PlayerId },
}

/// One stored record (players, queue entries, court assignments, player stats).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Player {
        id: PlayerId,
        name: String,
    },
    QueueEntry {
        player_id: PlayerId,
        joined_at: DateTime<Utc>,
    },
    CourtAssignment {
        court_id: CourtId,
        player_id: PlayerId,
    },
    PlayerStats {
        player_id: PlayerId,
        completed_rounds: u32,
        in_progress: bool,
        equipment_usage: f64,
    },
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::Player { id, .. } => RecordKey::Player { id: *id },
            Record::QueueEntry { player_id, .. } => RecordKey::QueueEntry {
                player_id: *player_id,
            },
            Record::CourtAssignment {
                court_id,
                player_id,
            } => RecordKey::CourtAssignment {
                court_id: *court_id,
                player_id: *player_id,
            },
            Record::PlayerStats { player_id, .. } => RecordKey::PlayerStats {
                player_id: *player_id,
            },
        }
    }
}

/// A single create/update or delete against the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StoreChange {
    Upsert { record: Record },
    Delete { key: RecordKey },
}

/// Flatten the session into store records.
pub fn records(state: &SessionState) -> BTreeMap<RecordKey, Record> {
    let mut out = BTreeMap::new();
    let mut put = |record: Record| {
        out.insert(record.key(), record);
    };
    for player in state.players.iter() {
        put(Record::Player {
            id: player.id,
            name: player.name.clone(),
        });
        if let Some(stat) = state.stats.get(player.id) {
            put(Record::PlayerStats {
                player_id: player.id,
                completed_rounds: stat.completed_rounds,
                in_progress: stat.in_progress,
                equipment_usage: stat.equipment_usage,
            });
            if state.queue.contains(player.id) {
                put(Record::QueueEntry {
                    player_id: player.id,
                    joined_at: stat.last_available_at,
                });
            }
        }
    }
    for court in state.courts.iter() {
        for &player_id in &court.occupants {
            put(Record::CourtAssignment {
                court_id: court.id,
                player_id,
            });
        }
    }
    out
}

/// Changes that turn the records of `before` into those of `after`.
/// Deletes come first so a store never sees a dangling reference.
pub fn diff(before: &SessionState, after: &SessionState) -> Vec<StoreChange> {
    let old = records(before);
    let new = records(after);
    let deletes = old
        .keys()
        .filter(|k| !new.contains_key(k))
        .map(|k| StoreChange::Delete { key: k.clone() });
    let upserts = new
        .iter()
        .filter(|(k, r)| old.get(k) != Some(r))
        .map(|(_, r)| StoreChange::Upsert { record: r.clone() });
    deletes.chain(upserts).collect()
}

/// Errors raised by a mirror store.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    /// Delete of a record the store does not hold.
    MissingRecord(RecordKey),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Store I/O error: {}", e),
            StoreError::Serialization(e) => write!(f, "Store serialization error: {}", e),
            StoreError::MissingRecord(key) => write!(f, "Record not found: {:?}", key),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e)
    }
}

/// Backing store that mirrors the session's records.
pub trait MirrorStore: Send + 'static {
    fn apply(&mut self, change: &StoreChange) -> Result<(), StoreError>;

    /// Called after each batch.
    fn flush(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Records kept in memory, keyed like the session.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<RecordKey, Record>,
}

impl MemoryStore {
    pub fn get(&self, key: &RecordKey) -> Option<&Record> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }
}

impl MirrorStore for MemoryStore {
    fn apply(&mut self, change: &StoreChange) -> Result<(), StoreError> {
        match change {
            StoreChange::Upsert { record } => {
                self.records.insert(record.key(), record.clone());
            }
            StoreChange::Delete { key } => {
                self.records
                    .remove(key)
                    .ok_or_else(|| StoreError::MissingRecord(key.clone()))?;
            }
        }
        Ok(())
    }
}

/// Memory store written out as a JSON array of records after every batch.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: MemoryStore::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back a file written by this store.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Record>, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl MirrorStore for JsonFileStore {
    fn apply(&mut self, change: &StoreChange) -> Result<(), StoreError> {
        self.inner.apply(change)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        let records: Vec<&Record> = self.inner.records().collect();
        let json = serde_json::to_string_pretty(&records)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// Sending half of the mirror. Cheap to clone; sends never block.
#[derive(Clone, Debug)]
pub struct StoreSync {
    tx: UnboundedSender<Vec<StoreChange>>,
}

impl StoreSync {
    /// Start the mirror thread. It exits once every `StoreSync` clone is dropped and
    /// hands the store back through the join handle.
    pub fn spawn<S: MirrorStore>(store: S) -> (Self, JoinHandle<S>) {
        let (tx, rx) = unbounded_channel();
        let handle = std::thread::spawn(move || run_mirror(store, rx));
        (Self { tx }, handle)
    }

    /// Queue a batch for the store. Empty batches are dropped.
    pub fn send(&self, changes: Vec<StoreChange>) {
        if changes.is_empty() {
            return;
        }
        if self.tx.send(changes).is_err() {
            log::warn!("Store mirror has stopped; change batch dropped");
        }
    }
}

fn run_mirror<S: MirrorStore>(mut store: S, mut rx: UnboundedReceiver<Vec<StoreChange>>) -> S {
    while let Some(batch) = rx.blocking_recv() {
        let mut failed = 0;
        for change in &batch {
            if let Err(e) = store.apply(change) {
                failed += 1;
                log::warn!("Store rejected {:?}: {}", change, e);
            }
        }
        if let Err(e) = store.flush() {
            log::warn!("Store flush failed: {}", e);
        }
        log::debug!("Mirrored {} change(s), {} failed", batch.len(), failed);
    }
    log::info!("Store mirror stopped");
    store
}
