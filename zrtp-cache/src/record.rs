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

use crate::{unix_now, RS_LEN, ZID_LEN};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Record flag bits.
pub mod flags {
    /// rs1 holds a usable retained secret.
    pub const RS1_VALID: u32 = 0x1;
    /// rs2 holds a usable retained secret.
    pub const RS2_VALID: u32 = 0x2;
    /// A trusted MitM (PBX) key is stored.
    pub const MITM_KEY_AVAILABLE: u32 = 0x4;
    /// This is the own-ZID record; no other flag may be set with it.
    pub const OWN_ZID_RECORD: u32 = 0x8;
    /// The user confirmed the SAS with this peer.
    pub const SAS_VERIFIED: u32 = 0x10;
}

/// One cache entry: the retained secrets shared with a single peer.
///
/// Validity intervals are absolute epoch-second deadlines with two
/// sentinels: `-1` never expires, `0` is already expired. The secrets are
/// wiped when the record is dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZidRecord {
    /// The peer's ZID (or our own, for the own record).
    #[zeroize(skip)]
    pub zid: [u8; ZID_LEN],
    /// Flag bits, see [`flags`].
    #[zeroize(skip)]
    pub flags: u32,
    /// Current retained secret.
    pub rs1: [u8; RS_LEN],
    /// rs1 deadline, epoch seconds (`-1` never, `0` expired).
    #[zeroize(skip)]
    pub rs1_valid_thru: i64,
    /// Previous retained secret.
    pub rs2: [u8; RS_LEN],
    /// rs2 deadline.
    #[zeroize(skip)]
    pub rs2_valid_thru: i64,
    /// Trusted MitM (PBX) key, if enrolled.
    pub mitm_key: [u8; RS_LEN],
    /// When this peer first reached the secure state, epoch seconds.
    #[zeroize(skip)]
    pub secure_since: i64,
}

impl ZidRecord {
    /// A zeroed record for an unknown peer.
    pub fn empty(zid: [u8; ZID_LEN]) -> Self {
        Self {
            zid,
            flags: 0,
            rs1: [0u8; RS_LEN],
            rs1_valid_thru: 0,
            rs2: [0u8; RS_LEN],
            rs2_valid_thru: 0,
            mitm_key: [0u8; RS_LEN],
            secure_since: 0,
        }
    }

    /// The own-ZID record: only the own flag, nothing else.
    pub fn own(zid: [u8; ZID_LEN]) -> Self {
        let mut record = Self::empty(zid);
        record.flags = flags::OWN_ZID_RECORD;
        record
    }

    /// Installs a fresh rs1, shifting the current rs1 into the rs2 slot
    /// together with its interval.
    ///
    /// `expire` of `-1` never expires, `0` (and anything non-positive)
    /// expires immediately, otherwise the deadline is `now + expire`.
    pub fn set_new_rs1(&mut self, data: &[u8; RS_LEN], expire: i64) {
        if self.is_rs1_valid() {
            self.rs2 = self.rs1;
            self.rs2_valid_thru = self.rs1_valid_thru;
            self.flags |= flags::RS2_VALID;
        }

        self.rs1 = *data;
        self.rs1_valid_thru = if expire == -1 {
            -1
        } else if expire <= 0 {
            0
        } else {
            unix_now() + expire
        };
        self.flags |= flags::RS1_VALID;
    }

    fn not_expired_at(valid_thru: i64, now: i64) -> bool {
        if valid_thru == -1 {
            return true;
        }
        if valid_thru == 0 {
            return false;
        }
        now <= valid_thru
    }

    /// True when rs1 has not passed its deadline at time `now`.
    pub fn is_rs1_not_expired_at(&self, now: i64) -> bool {
        Self::not_expired_at(self.rs1_valid_thru, now)
    }

    /// True when rs1 has not passed its deadline.
    pub fn is_rs1_not_expired(&self) -> bool {
        self.is_rs1_not_expired_at(unix_now())
    }

    /// True when rs2 has not passed its deadline at time `now`.
    pub fn is_rs2_not_expired_at(&self, now: i64) -> bool {
        Self::not_expired_at(self.rs2_valid_thru, now)
    }

    /// True when rs2 has not passed its deadline.
    pub fn is_rs2_not_expired(&self) -> bool {
        self.is_rs2_not_expired_at(unix_now())
    }

    /// Stores the trusted MitM key after enrollment.
    pub fn set_mitm_key(&mut self, data: &[u8; RS_LEN]) {
        self.mitm_key = *data;
        self.flags |= flags::MITM_KEY_AVAILABLE;
    }

    pub fn is_rs1_valid(&self) -> bool {
        self.flags & flags::RS1_VALID != 0
    }

    pub fn is_rs2_valid(&self) -> bool {
        self.flags & flags::RS2_VALID != 0
    }

    pub fn is_mitm_key_available(&self) -> bool {
        self.flags & flags::MITM_KEY_AVAILABLE != 0
    }

    /// No other flag is allowed on the own record.
    pub fn is_own_record(&self) -> bool {
        self.flags == flags::OWN_ZID_RECORD
    }

    pub fn set_sas_verified(&mut self) {
        self.flags |= flags::SAS_VERIFIED;
    }

    pub fn reset_sas_verified(&mut self) {
        self.flags &= !flags::SAS_VERIFIED;
    }

    pub fn is_sas_verified(&self) -> bool {
        self.flags & flags::SAS_VERIFIED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rs1_shifts_into_rs2() {
        let mut record = ZidRecord::empty([1; 12]);
        record.set_new_rs1(&[0xAA; 32], -1);
        assert!(record.is_rs1_valid());
        assert!(!record.is_rs2_valid());

        record.set_new_rs1(&[0xBB; 32], -1);
        assert!(record.is_rs2_valid());
        assert_eq!(record.rs1, [0xBB; 32]);
        assert_eq!(record.rs2, [0xAA; 32]);
        assert_eq!(record.rs2_valid_thru, -1);
    }

    #[test]
    fn test_expiry_sentinels() {
        let mut record = ZidRecord::empty([1; 12]);

        record.set_new_rs1(&[0x01; 32], -1);
        assert!(record.is_rs1_not_expired());

        record.set_new_rs1(&[0x02; 32], 0);
        assert!(!record.is_rs1_not_expired());
    }

    #[test]
    fn test_expiry_deadline() {
        let mut record = ZidRecord::empty([1; 12]);
        record.set_new_rs1(&[0x03; 32], 3600);

        let now = crate::unix_now();
        assert!(record.is_rs1_not_expired_at(now));
        assert!(record.is_rs1_not_expired_at(now + 3599));
        assert!(!record.is_rs1_not_expired_at(now + 3601));
    }

    #[test]
    fn test_own_record_flag_exclusive() {
        let record = ZidRecord::own([7; 12]);
        assert!(record.is_own_record());

        let mut tainted = ZidRecord::own([7; 12]);
        tainted.set_sas_verified();
        assert!(!tainted.is_own_record());
    }

    #[test]
    fn test_mitm_key() {
        let mut record = ZidRecord::empty([1; 12]);
        assert!(!record.is_mitm_key_available());
        record.set_mitm_key(&[0x44; 32]);
        assert!(record.is_mitm_key_available());
        assert_eq!(record.mitm_key, [0x44; 32]);
    }
}
