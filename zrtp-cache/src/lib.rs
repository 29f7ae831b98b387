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

//! The ZID cache: persistent retained-secret storage keyed by peer ZID.
//!
//! The cache anchors continuity of trust between two endpoints: after the
//! first voice-verified call the retained secrets let every later call
//! authenticate without comparing a SAS again. Two backends implement the
//! same narrow contract, a fixed-format file and a SQLite store; the
//! protocol core only ever sees the [`ZidCache`] trait.

pub mod record;
pub mod file;
pub mod memory;
pub mod sqlite;

pub use file::FileCache;
pub use memory::MemoryCache;
pub use record::{flags, ZidRecord};
pub use sqlite::SqliteCache;

use anyhow::Result;

/// Length of a ZID in bytes.
pub const ZID_LEN: usize = 12;

/// Length of a retained secret in bytes.
pub const RS_LEN: usize = 32;

/// Default retained-secret lifetime: thirty days.
pub const DEFAULT_EXPIRE_SECS: i64 = 30 * 24 * 3600;

/// The retained-secret cache contract.
///
/// Opening is the backend constructor and is idempotent: a fresh store
/// generates the local ZID and persists the own record. Access is
/// serialized per handle; sessions only touch their own peer's record at
/// Confirm time, so a single-writer discipline suffices.
pub trait ZidCache {
    /// Returns the local endpoint's ZID, stable across restarts.
    fn own_zid(&self) -> [u8; ZID_LEN];

    /// Returns the record for the given peer. Unknown peers yield a
    /// zeroed record with all flags clear, ready to be filled and `put`.
    fn get(&mut self, peer_zid: &[u8; ZID_LEN]) -> ZidRecord;

    /// Inserts or updates the record keyed by its peer ZID.
    fn put(&mut self, record: &ZidRecord) -> Result<()>;

    /// Flushes and releases the backend.
    fn close(&mut self);
}

/// Current time as seconds since the epoch, signed and 64-bit wide on
/// every host.
pub(crate) fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(_) => 0,
    }
}
