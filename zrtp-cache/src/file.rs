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
use crate::{ZidCache, RS_LEN, ZID_LEN};
use anyhow::{anyhow, Context, Result};
use rand_core::{OsRng, RngCore};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

const FILE_MAGIC: &[u8; 4] = b"ZIDF";
const FILE_VERSION: u32 = 2;
const HEADER_LEN: u64 = 8;

/// Serialized record size: zid + flags + two interval/secret pairs +
/// MitM key. All integers little-endian, intervals always 8 bytes so the
/// file is readable regardless of the host's time width.
const RECORD_LEN: usize = ZID_LEN + 4 + (8 + RS_LEN) * 2 + RS_LEN;

/// The fixed-format file backend.
///
/// Record 0 is the own-ZID record; peer records follow in insertion
/// order and are updated in place. The format carries a magic and a
/// version so a layout change never silently misreads old files.
pub struct FileCache {
    file: Option<File>,
    own_zid: [u8; ZID_LEN],
    index: HashMap<[u8; ZID_LEN], u64>,
}

fn encode_record(record: &ZidRecord) -> [u8; RECORD_LEN] {
    let mut buf = [0u8; RECORD_LEN];
    let mut off = 0;

    buf[off..off + ZID_LEN].copy_from_slice(&record.zid);
    off += ZID_LEN;
    buf[off..off + 4].copy_from_slice(&record.flags.to_le_bytes());
    off += 4;
    buf[off..off + 8].copy_from_slice(&record.rs1_valid_thru.to_le_bytes());
    off += 8;
    buf[off..off + RS_LEN].copy_from_slice(&record.rs1);
    off += RS_LEN;
    buf[off..off + 8].copy_from_slice(&record.rs2_valid_thru.to_le_bytes());
    off += 8;
    buf[off..off + RS_LEN].copy_from_slice(&record.rs2);
    off += RS_LEN;
    buf[off..off + RS_LEN].copy_from_slice(&record.mitm_key);

    buf
}

fn decode_record(buf: &[u8; RECORD_LEN]) -> ZidRecord {
    let mut record = ZidRecord::empty([0u8; ZID_LEN]);
    let mut off = 0;

    record.zid.copy_from_slice(&buf[off..off + ZID_LEN]);
    off += ZID_LEN;
    record.flags = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
    off += 4;
    record.rs1_valid_thru = i64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
    off += 8;
    record.rs1.copy_from_slice(&buf[off..off + RS_LEN]);
    off += RS_LEN;
    record.rs2_valid_thru = i64::from_le_bytes(buf[off..off + 8].try_into().unwrap());
    off += 8;
    record.rs2.copy_from_slice(&buf[off..off + RS_LEN]);
    off += RS_LEN;
    record.mitm_key.copy_from_slice(&buf[off..off + RS_LEN]);

    record
}

impl FileCache {
    /// Opens (or creates) a cache file. A fresh file gets a random own
    /// ZID written as record 0.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())
            .with_context(|| format!("opening ZID cache {}", path.as_ref().display()))?;

        let len = file.metadata()?.len();
        if len == 0 {
            let mut own_zid = [0u8; ZID_LEN];
            OsRng.fill_bytes(&mut own_zid);

            file.write_all(FILE_MAGIC)?;
            file.write_all(&FILE_VERSION.to_le_bytes())?;
            file.write_all(&encode_record(&ZidRecord::own(own_zid)))?;
            file.flush()?;

            return Ok(Self {
                file: Some(file),
                own_zid,
                index: HashMap::new(),
            });
        }

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        let mut version_bytes = [0u8; 4];
        file.read_exact(&mut version_bytes)?;
        if &magic != FILE_MAGIC {
            return Err(anyhow!("not a ZID cache file"));
        }
        let version = u32::from_le_bytes(version_bytes);
        if version != FILE_VERSION {
            return Err(anyhow!("unsupported ZID cache version {}", version));
        }

        let mut buf = [0u8; RECORD_LEN];
        file.read_exact(&mut buf)?;
        let own_record = decode_record(&buf);
        if !own_record.is_own_record() {
            return Err(anyhow!("first cache record is not the own record"));
        }
        let own_zid = own_record.zid;

        let mut index = HashMap::new();
        let mut pos = HEADER_LEN + RECORD_LEN as u64;
        while file.read_exact(&mut buf).is_ok() {
            let record = decode_record(&buf);
            index.insert(record.zid, pos);
            pos += RECORD_LEN as u64;
        }

        Ok(Self {
            file: Some(file),
            own_zid,
            index,
        })
    }
}

impl ZidCache for FileCache {
    fn own_zid(&self) -> [u8; ZID_LEN] {
        self.own_zid
    }

    fn get(&mut self, peer_zid: &[u8; ZID_LEN]) -> ZidRecord {
        let (file, pos) = match (&mut self.file, self.index.get(peer_zid)) {
            (Some(file), Some(pos)) => (file, *pos),
            _ => return ZidRecord::empty(*peer_zid),
        };

        let mut buf = [0u8; RECORD_LEN];
        let ok = file
            .seek(SeekFrom::Start(pos))
            .and_then(|_| file.read_exact(&mut buf))
            .is_ok();
        if !ok {
            return ZidRecord::empty(*peer_zid);
        }
        decode_record(&buf)
    }

    fn put(&mut self, record: &ZidRecord) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| anyhow!("cache is closed"))?;

        let pos = match self.index.get(&record.zid) {
            Some(pos) => *pos,
            None => {
                let pos = file.seek(SeekFrom::End(0))?;
                self.index.insert(record.zid, pos);
                pos
            }
        };

        file.seek(SeekFrom::Start(pos))?;
        file.write_all(&encode_record(record))?;
        file.flush()?;
        Ok(())
    }

    fn close(&mut self) {
        self.file = None;
    }
}
