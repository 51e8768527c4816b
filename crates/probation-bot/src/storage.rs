//! Persistent probation ledger using RocksDB.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use probation_core::{Ledger, ProbationRecord, UserId};
use rocksdb::{Options, WriteOptions, DB};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const PROBATION_PREFIX: &[u8] = b"probation:";

/// RocksDB-backed ledger.
///
/// Writes are synced before returning. Inserts go through a write lock so
/// concurrent adds for the same user collapse into one record.
pub struct Storage {
    db: DB,
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create storage at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path)?;
        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn key(user_id: UserId) -> String {
        // Zero-padded so prefix iteration yields users in numeric order.
        format!("probation:{:020}", user_id.get())
    }

    fn sync_writes() -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        opts
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::Storage("ledger write lock poisoned".into()))
    }

    /// Store a record unless the user already has one.
    pub fn insert_if_absent(&self, record: &ProbationRecord) -> Result<bool> {
        let _guard = self.lock()?;
        let key = Self::key(record.user_id);
        if self.db.get(key.as_bytes())?.is_some() {
            return Ok(false);
        }
        let value = serde_json::to_vec(record)?;
        self.db.put_opt(key.as_bytes(), value, &Self::sync_writes())?;
        info!(op = "add", user_id = %record.user_id, "Added user to ledger");
        Ok(true)
    }

    /// Delete a user's record.
    pub fn delete_record(&self, user_id: UserId) -> Result<bool> {
        let _guard = self.lock()?;
        let key = Self::key(user_id);
        if self.db.get(key.as_bytes())?.is_none() {
            return Ok(false);
        }
        self.db.delete_opt(key.as_bytes(), &Self::sync_writes())?;
        info!(op = "remove", user_id = %user_id, "Removed user from ledger");
        Ok(true)
    }

    /// Get a user's record.
    pub fn get_record(&self, user_id: UserId) -> Result<Option<ProbationRecord>> {
        match self.db.get(Self::key(user_id).as_bytes())? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    /// List all records.
    pub fn list_records(&self) -> Result<Vec<ProbationRecord>> {
        let mut records = Vec::new();

        let iter = self.db.prefix_iterator(PROBATION_PREFIX);
        for item in iter {
            let (key, value) = item?;
            if key.starts_with(PROBATION_PREFIX) {
                records.push(serde_json::from_slice(&value)?);
            } else {
                break;
            }
        }

        Ok(records)
    }
}

impl Ledger for Storage {
    fn add_if_absent_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> probation_core::Result<bool> {
        Ok(self.insert_if_absent(&ProbationRecord::new(user_id, now))?)
    }

    fn remove(&self, user_id: UserId) -> probation_core::Result<bool> {
        Ok(self.delete_record(user_id)?)
    }

    fn get(&self, user_id: UserId) -> probation_core::Result<Option<ProbationRecord>> {
        Ok(self.get_record(user_id)?)
    }

    fn records(&self) -> probation_core::Result<Vec<ProbationRecord>> {
        Ok(self.list_records()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn storage_roundtrip() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let record = ProbationRecord::new(UserId(42), Utc::now());

        assert!(storage.insert_if_absent(&record).unwrap());
        let loaded = storage.get_record(UserId(42)).unwrap().unwrap();
        assert_eq!(record, loaded);
    }

    #[test]
    fn add_twice_keeps_first_timestamp() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let first = Utc::now() - TimeDelta::days(2);

        assert!(storage.add_if_absent_at(UserId(42), first).unwrap());
        assert!(!storage.add_if_absent(UserId(42)).unwrap());

        assert_eq!(storage.list_records().unwrap().len(), 1);
        assert_eq!(storage.get_record(UserId(42)).unwrap().unwrap().entered_at, first);
    }

    #[test]
    fn remove_absent_is_noop() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();

        assert!(!storage.remove(UserId(9)).unwrap());
        assert!(storage.list_records().unwrap().is_empty());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let storage = Storage::open(dir.path()).unwrap();
            storage.add_if_absent(UserId(1)).unwrap();
            storage.add_if_absent(UserId(2)).unwrap();
            storage.remove(UserId(2)).unwrap();
        }

        let storage = Storage::open(dir.path()).unwrap();
        assert_eq!(storage.user_ids().unwrap(), BTreeSet::from([UserId(1)]));
    }

    #[test]
    fn eligible_users_by_age() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let now = Utc::now();
        storage.add_if_absent_at(UserId(42), now - TimeDelta::days(8)).unwrap();
        storage.add_if_absent_at(UserId(43), now - TimeDelta::days(1)).unwrap();

        let eligible = storage.eligible_user_ids_at(TimeDelta::days(7), now).unwrap();

        assert_eq!(eligible, BTreeSet::from([UserId(42)]));
    }

    #[test]
    fn list_is_ordered_by_user_id() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        for user in [300, 2, 10_000_000_000] {
            storage.add_if_absent(UserId(user)).unwrap();
        }

        let users: Vec<_> = storage
            .list_records()
            .unwrap()
            .into_iter()
            .map(|r| r.user_id)
            .collect();

        assert_eq!(users, vec![UserId(2), UserId(300), UserId(10_000_000_000)]);
    }

    #[test]
    fn concurrent_adds_collapse() {
        let dir = tempdir().unwrap();
        let storage = Arc::new(Storage::open(dir.path()).unwrap());

        let inserted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let storage = Arc::clone(&storage);
                    s.spawn(move || storage.add_if_absent(UserId(7)).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| usize::from(h.join().unwrap())).sum()
        });

        assert_eq!(inserted, 1);
        assert_eq!(storage.list_records().unwrap().len(), 1);
    }
}
