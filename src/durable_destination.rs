// durable_destination.rs
// Purpose: Offline-safe bounded retention of records for later inspection

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use sled::Db;

use crate::console_destination::console_warn;
use crate::destination::{Destination, DestinationGate};
use crate::errors::{LogshipError, LogshipResult, SafeLock};
use crate::record::{LogLevel, LogRecord};

/// Default number of records retained before oldest-first eviction.
pub const DEFAULT_CAPACITY: usize = 1000;

const TREE_NAME: &str = "records";

/// Bounded ordered retention contract shared by the sled store and the flat
/// file fallback. Insertion order is the read-back order.
pub trait RecordStore: Send + Sync {
    fn append(&self, record: &LogRecord) -> LogshipResult<()>;
    fn read_all(&self) -> LogshipResult<Vec<LogRecord>>;
    fn clear(&self) -> LogshipResult<()>;
    fn len(&self) -> usize;
}

/// Sled-backed store: monotonic big-endian sequence keys in a dedicated
/// tree, so iteration order is insertion order and `pop_min` evicts the
/// oldest record.
pub struct SledStore {
    db: Db,
    capacity: usize,
    next_seq: AtomicU64,
}

impl SledStore {
    pub fn open(path: &Path, capacity: usize) -> LogshipResult<Self> {
        let db = sled::open(path).map_err(|e| LogshipError::store("open sled store", e))?;

        let tree = db
            .open_tree(TREE_NAME)
            .map_err(|e| LogshipError::store("open records tree", e))?;
        let next_seq = match tree.last().map_err(|e| LogshipError::store("read last key", e))? {
            Some((key, _)) => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&key);
                u64::from_be_bytes(raw) + 1
            }
            None => 0,
        };

        Ok(SledStore {
            db,
            capacity,
            next_seq: AtomicU64::new(next_seq),
        })
    }

    fn tree(&self) -> LogshipResult<sled::Tree> {
        self.db
            .open_tree(TREE_NAME)
            .map_err(|e| LogshipError::store("open records tree", e))
    }
}

impl RecordStore for SledStore {
    fn append(&self, record: &LogRecord) -> LogshipResult<()> {
        let data = serde_json::to_vec(record)
            .map_err(|e| LogshipError::serialization("encode record", e))?;

        let tree = self.tree()?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        tree.insert(seq.to_be_bytes(), data)
            .map_err(|e| LogshipError::store("insert record", e))?;

        while tree.len() > self.capacity {
            tree.pop_min()
                .map_err(|e| LogshipError::store("evict oldest record", e))?;
        }

        tree.flush()
            .map_err(|e| LogshipError::store("flush records tree", e))?;
        Ok(())
    }

    fn read_all(&self) -> LogshipResult<Vec<LogRecord>> {
        let tree = self.tree()?;
        let mut records = Vec::with_capacity(tree.len());
        for item in tree.iter() {
            let (_, value) = item.map_err(|e| LogshipError::store("iterate records", e))?;
            match serde_json::from_slice::<LogRecord>(&value) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("skipping undecodable stored record: {}", e),
            }
        }
        Ok(records)
    }

    fn clear(&self) -> LogshipResult<()> {
        let tree = self.tree()?;
        tree.clear()
            .map_err(|e| LogshipError::store("clear records tree", e))?;
        tree.flush()
            .map_err(|e| LogshipError::store("flush records tree", e))?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.tree().map(|tree| tree.len()).unwrap_or(0)
    }
}

/// Flat JSON-lines store used when sled is unavailable or rejects a write.
/// Eviction rewrites the file keeping the newest `capacity` lines.
pub struct FlatFileStore {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
}

impl FlatFileStore {
    pub fn new(path: PathBuf, capacity: usize) -> Self {
        FlatFileStore {
            path,
            capacity,
            lock: Mutex::new(()),
        }
    }

    fn read_lines(&self) -> Vec<String> {
        let Ok(file) = File::open(&self.path) else {
            return Vec::new();
        };
        BufReader::new(file)
            .lines()
            .filter_map(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    fn rewrite(&self, lines: &[String]) -> LogshipResult<()> {
        let mut file = File::create(&self.path)
            .map_err(|e| LogshipError::io("rewrite fallback store", e))?;
        for line in lines {
            writeln!(file, "{}", line).map_err(|e| LogshipError::io("rewrite fallback store", e))?;
        }
        Ok(())
    }
}

impl RecordStore for FlatFileStore {
    fn append(&self, record: &LogRecord) -> LogshipResult<()> {
        let json_line = serde_json::to_string(record)
            .map_err(|e| LogshipError::serialization("encode record", e))?;

        let _guard = self.lock.safe_lock()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LogshipError::io("open fallback store", e))?;
        writeln!(file, "{}", json_line).map_err(|e| LogshipError::io("append record", e))?;

        let lines = self.read_lines();
        if lines.len() > self.capacity {
            let keep = lines.len() - self.capacity;
            self.rewrite(&lines[keep..])?;
        }
        Ok(())
    }

    fn read_all(&self) -> LogshipResult<Vec<LogRecord>> {
        let _guard = self.lock.safe_lock()?;
        Ok(self
            .read_lines()
            .iter()
            .filter_map(|line| serde_json::from_str::<LogRecord>(line).ok())
            .collect())
    }

    fn clear(&self) -> LogshipResult<()> {
        let _guard = self.lock.safe_lock()?;
        if self.path.exists() {
            File::create(&self.path).map_err(|e| LogshipError::io("truncate fallback store", e))?;
        }
        Ok(())
    }

    fn len(&self) -> usize {
        let Ok(_guard) = self.lock.safe_lock() else {
            return 0;
        };
        self.read_lines().len()
    }
}

/// Durable local sink: a bounded transactional store with a flat-file
/// fallback and a read-back API for diagnostics.
pub struct DurableDestination {
    gate: DestinationGate,
    primary: Box<dyn RecordStore>,
    fallback: Option<FlatFileStore>,
}

impl DurableDestination {
    /// Open the sled store under `dir`, degrading to the flat store when
    /// sled itself cannot be opened.
    pub fn new(min_level: LogLevel, dir: &Path, capacity: usize) -> Self {
        let fallback_path = dir.join("fallback.jsonl");
        match SledStore::open(&dir.join("sled"), capacity) {
            Ok(store) => DurableDestination {
                gate: DestinationGate::new(min_level),
                primary: Box::new(store),
                fallback: Some(FlatFileStore::new(fallback_path, capacity)),
            },
            Err(e) => {
                console_warn(&format!(
                    "durable store unavailable, using flat file fallback: {}",
                    e
                ));
                DurableDestination {
                    gate: DestinationGate::new(min_level),
                    primary: Box::new(FlatFileStore::new(fallback_path, capacity)),
                    fallback: None,
                }
            }
        }
    }

    /// Construct over an explicit store, used by tests and custom wiring.
    pub fn with_store(min_level: LogLevel, store: Box<dyn RecordStore>) -> Self {
        DurableDestination {
            gate: DestinationGate::new(min_level),
            primary: store,
            fallback: None,
        }
    }

    /// Stored records in insertion order (primary store first, then any
    /// records that landed on the fallback). Does not mutate.
    pub fn stored_logs(&self) -> Vec<LogRecord> {
        let mut records = match self.primary.read_all() {
            Ok(records) => records,
            Err(e) => {
                console_warn(&format!("durable store read failed: {}", e));
                Vec::new()
            }
        };
        if let Some(fallback) = &self.fallback {
            if let Ok(mut overflow) = fallback.read_all() {
                records.append(&mut overflow);
            }
        }
        records
    }

    /// Empty the store (both primary and fallback).
    pub fn clear_stored(&self) {
        if let Err(e) = self.primary.clear() {
            console_warn(&format!("durable store clear failed: {}", e));
        }
        if let Some(fallback) = &self.fallback {
            let _ = fallback.clear();
        }
    }
}

impl Destination for DurableDestination {
    fn name(&self) -> &str {
        "durable"
    }

    fn enabled(&self) -> bool {
        self.gate.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.gate.set_enabled(enabled);
    }

    fn min_level(&self) -> LogLevel {
        self.gate.min_level()
    }

    fn set_min_level(&self, level: LogLevel) {
        self.gate.set_min_level(level);
    }

    /// Degradation chain: primary store, then flat fallback, then an
    /// explicit one-line warning. The caller never sees a failure.
    fn deliver(&self, record: &LogRecord) -> LogshipResult<()> {
        let Err(primary_err) = self.primary.append(record) else {
            return Ok(());
        };

        if let Some(fallback) = &self.fallback {
            if fallback.append(record).is_ok() {
                log::debug!("record diverted to fallback store: {}", primary_err);
                return Ok(());
            }
        }

        console_warn(&format!("durable store dropped a record: {}", primary_err));
        Ok(())
    }
}
