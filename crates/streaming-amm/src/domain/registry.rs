//! # Stream Registry
//!
//! Per-depositor stream records keyed by address. Settlement never iterates
//! this map; records are looked up one at a time when their owner is touched.
//! The count of active records is maintained on every write.

use super::entities::{Address, Asset, StreamRecord, U256};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StreamRegistry {
    records: HashMap<Address, StreamRecord>,
    active: usize,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user: &Address) -> Option<&StreamRecord> {
        self.records.get(user)
    }

    /// Current flow rate of `user` in `asset`, zero if unknown.
    pub fn flow_rate(&self, user: &Address, asset: Asset) -> U256 {
        self.records
            .get(user)
            .map(|record| record.flow_rate(asset))
            .unwrap_or_default()
    }

    /// Stores a record, dropping it instead once it has no flows and
    /// nothing left to pay out.
    pub fn put(&mut self, user: Address, record: StreamRecord) {
        if !record.is_active() && record.balance0.is_zero() && record.balance1.is_zero() {
            self.replace(user, None);
        } else {
            self.replace(user, Some(record));
        }
    }

    /// Sets the entry for `user` verbatim, `None` removing it.
    pub fn replace(&mut self, user: Address, record: Option<StreamRecord>) {
        let previous = match record {
            Some(record) => {
                if record.is_active() {
                    self.active += 1;
                }
                self.records.insert(user, record)
            }
            None => self.records.remove(&user),
        };
        if previous.is_some_and(|old| old.is_active()) {
            self.active -= 1;
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with a live flow in either asset.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Iterates every record. Diagnostics only.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &StreamRecord)> {
        self.records.iter()
    }
}
