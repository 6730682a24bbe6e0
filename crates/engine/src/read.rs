//! Read path: `get()` and `keys()`.
//!
//! A point lookup walks the layers freshest-first: memtable, then SSTables
//! from newest to oldest. The first layer with an opinion wins; a tombstone
//! is as definitive as a value.

use sstable::Operation;

use crate::{Db, Error, Result, TableHandle};

impl Db {
    /// Looks up a key. `KeyNotFound` means the key is absent everywhere or
    /// its most recent record is a tombstone.
    ///
    /// The memtable probe runs under the shared state lock; the SSTable
    /// probe runs after the lock is released, against a snapshot of the
    /// immutable table handles.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("key must not be empty".into()));
        }

        let tables = {
            let state = self.read_state()?;
            match state.mem.get(key) {
                Some(Some(value)) => return Ok(value.clone()),
                Some(None) => return Err(Error::KeyNotFound),
                None => {}
            }
            state.tables.clone()
        };

        lookup_in_tables(&tables, key)
    }

    /// Sorted listing of the keys currently in the memtable, tombstoned
    /// keys included. SSTable-resident keys are not enumerated.
    pub fn keys(&self) -> Result<Vec<Vec<u8>>> {
        let state = self.read_state()?;
        Ok(state.mem.keys().map(|k| k.to_vec()).collect())
    }
}

/// Searches the table stack newest-to-oldest. The first table containing
/// the key decides: a `Set` entry yields its value, a `Del` entry means the
/// key is deleted and older tables must not be consulted.
pub(crate) fn lookup_in_tables(tables: &[TableHandle], key: &[u8]) -> Result<Vec<u8>> {
    for handle in tables.iter().rev() {
        if let Some(entry) = handle.table.get(key) {
            return match entry.operation {
                Operation::Set => Ok(entry.value.clone()),
                Operation::Del => Err(Error::KeyNotFound),
            };
        }
    }
    Err(Error::KeyNotFound)
}
