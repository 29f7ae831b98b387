/*
 * Copyright 2006 - 2018, Werner Dittmann
 * Copyright 2026 - Francisco F. Pinochet
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *         http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::record::ZidRecord;
use crate::{ZidCache, ZID_LEN};
use anyhow::Result;
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;

/// A non-persistent cache for tests and throwaway endpoints.
///
/// Every ZRTP run against this backend behaves like a first contact
/// unless records are fed in beforehand.
pub struct MemoryCache {
    own_zid: [u8; ZID_LEN],
    records: HashMap<[u8; ZID_LEN], ZidRecord>,
}

impl MemoryCache {
    /// Creates a cache with a random own ZID.
    pub fn new() -> Self {
        let mut own_zid = [0u8; ZID_LEN];
        OsRng.fill_bytes(&mut own_zid);
        Self::with_zid(own_zid)
    }

    /// Creates a cache with a fixed own ZID.
    pub fn with_zid(own_zid: [u8; ZID_LEN]) -> Self {
        Self {
            own_zid,
            records: HashMap::new(),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ZidCache for MemoryCache {
    fn own_zid(&self) -> [u8; ZID_LEN] {
        self.own_zid
    }

    fn get(&mut self, peer_zid: &[u8; ZID_LEN]) -> ZidRecord {
        self.records
            .get(peer_zid)
            .cloned()
            .unwrap_or_else(|| ZidRecord::empty(*peer_zid))
    }

    fn put(&mut self, record: &ZidRecord) -> Result<()> {
        self.records.insert(record.zid, record.clone());
        Ok(())
    }

    fn close(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_round_trip() {
        let mut cache = MemoryCache::with_zid([1; 12]);
        assert_eq!(cache.own_zid(), [1; 12]);

        let peer = [2u8; 12];
        let mut record = cache.get(&peer);
        assert_eq!(record.flags, 0);

        record.set_new_rs1(&[0x0F; 32], -1);
        cache.put(&record).unwrap();
        assert!(cache.get(&peer).is_rs1_valid());
    }
}
