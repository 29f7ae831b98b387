/*
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
use crate::{unix_now, ZidCache, RS_LEN, ZID_LEN};
use anyhow::{anyhow, Context, Result};
use rand_core::{OsRng, RngCore};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// The relational backend, a single SQLite database.
///
/// Peer records live in `zrtp_peers` keyed by ZID, with `secure_since`
/// and `last_use` timestamps the file backend does not track. The local
/// ZID lives in the single-row `zrtp_own` table.
pub struct SqliteCache {
    conn: Option<Connection>,
    own_zid: [u8; ZID_LEN],
}

impl SqliteCache {
    /// Opens (or creates) the database. A fresh database gets a random
    /// own ZID.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("opening ZID database {}", path.as_ref().display()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS zrtp_own (
                 id  INTEGER PRIMARY KEY CHECK (id = 0),
                 zid BLOB NOT NULL
             );
             CREATE TABLE IF NOT EXISTS zrtp_peers (
                 zid            BLOB PRIMARY KEY,
                 flags          INTEGER NOT NULL,
                 rs1            BLOB NOT NULL,
                 rs1_valid_thru INTEGER NOT NULL,
                 rs2            BLOB NOT NULL,
                 rs2_valid_thru INTEGER NOT NULL,
                 mitm_key       BLOB NOT NULL,
                 secure_since   INTEGER NOT NULL,
                 last_use       INTEGER NOT NULL
             );",
        )?;

        let stored: Option<Vec<u8>> = conn
            .query_row("SELECT zid FROM zrtp_own WHERE id = 0", [], |row| {
                row.get(0)
            })
            .optional()?;

        let own_zid = match stored {
            Some(bytes) => bytes
                .as_slice()
                .try_into()
                .map_err(|_| anyhow!("stored own ZID has wrong length"))?,
            None => {
                let mut zid = [0u8; ZID_LEN];
                OsRng.fill_bytes(&mut zid);
                conn.execute(
                    "INSERT INTO zrtp_own (id, zid) VALUES (0, ?1)",
                    params![zid.as_slice()],
                )?;
                zid
            }
        };

        Ok(Self {
            conn: Some(conn),
            own_zid,
        })
    }
}

fn blob_to_secret(blob: Vec<u8>) -> [u8; RS_LEN] {
    let mut out = [0u8; RS_LEN];
    if blob.len() == RS_LEN {
        out.copy_from_slice(&blob);
    }
    out
}

impl ZidCache for SqliteCache {
    fn own_zid(&self) -> [u8; ZID_LEN] {
        self.own_zid
    }

    fn get(&mut self, peer_zid: &[u8; ZID_LEN]) -> ZidRecord {
        let conn = match &self.conn {
            Some(conn) => conn,
            None => return ZidRecord::empty(*peer_zid),
        };

        let row = conn
            .query_row(
                "SELECT flags, rs1, rs1_valid_thru, rs2, rs2_valid_thru, mitm_key, secure_since
                 FROM zrtp_peers WHERE zid = ?1",
                params![peer_zid.as_slice()],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, i64>(6)?,
                    ))
                },
            )
            .optional();

        match row {
            Ok(Some((flags, rs1, rs1_thru, rs2, rs2_thru, mitm, secure_since))) => {
                let mut record = ZidRecord::empty(*peer_zid);
                record.flags = flags;
                record.rs1 = blob_to_secret(rs1);
                record.rs1_valid_thru = rs1_thru;
                record.rs2 = blob_to_secret(rs2);
                record.rs2_valid_thru = rs2_thru;
                record.mitm_key = blob_to_secret(mitm);
                record.secure_since = secure_since;
                record
            }
            _ => ZidRecord::empty(*peer_zid),
        }
    }

    fn put(&mut self, record: &ZidRecord) -> Result<()> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| anyhow!("cache is closed"))?;

        let secure_since = if record.secure_since != 0 {
            record.secure_since
        } else {
            unix_now()
        };

        conn.execute(
            "INSERT INTO zrtp_peers
                 (zid, flags, rs1, rs1_valid_thru, rs2, rs2_valid_thru,
                  mitm_key, secure_since, last_use)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(zid) DO UPDATE SET
                 flags = excluded.flags,
                 rs1 = excluded.rs1,
                 rs1_valid_thru = excluded.rs1_valid_thru,
                 rs2 = excluded.rs2,
                 rs2_valid_thru = excluded.rs2_valid_thru,
                 mitm_key = excluded.mitm_key,
                 last_use = excluded.last_use",
            params![
                record.zid.as_slice(),
                record.flags,
                record.rs1.as_slice(),
                record.rs1_valid_thru,
                record.rs2.as_slice(),
                record.rs2_valid_thru,
                record.mitm_key.as_slice(),
                secure_since,
                unix_now(),
            ],
        )?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.close();
        }
    }
}
