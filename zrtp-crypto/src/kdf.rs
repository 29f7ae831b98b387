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

//! The RFC 6189 key derivation pipeline: s0, the per-direction key block,
//! retained-secret IDs and the MultiStream/PreShared shortcuts.

use crate::traits::Hash;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// KDF label of the s1 contribution derived from a matched retained
/// secret. The label is fixed to the Initiator side so both endpoints
/// feed identical bytes into s0.
pub const LABEL_MATCHED_SECRET: &[u8] = b"Initiator";

/// All keys derived from s0 for one ZRTP session.
///
/// The block is wiped on drop; `s0` itself is wiped by the caller as soon
/// as derivation finishes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// HMAC key authenticating the initiator's Confirm2 (and GoClear).
    pub mackey_i: Vec<u8>,
    /// HMAC key authenticating the responder's Confirm1.
    pub mackey_r: Vec<u8>,
    /// Cipher key for the initiator's Confirm2 body.
    pub zrtpkey_i: Vec<u8>,
    /// Cipher key for the responder's Confirm1 body.
    pub zrtpkey_r: Vec<u8>,
    /// SRTP master key, initiator to responder.
    pub srtpkey_i: Vec<u8>,
    /// SRTP master salt, initiator to responder.
    pub srtpsalt_i: Vec<u8>,
    /// SRTP master key, responder to initiator.
    pub srtpkey_r: Vec<u8>,
    /// SRTP master salt, responder to initiator.
    pub srtpsalt_r: Vec<u8>,
    /// Input to SAS rendering.
    pub sashash: Vec<u8>,
    /// ZRTPSess, the session key feeding MultiStream and enrollment.
    pub zrtp_session: Vec<u8>,
    /// The retained secret to install as rs1 once Confirm succeeds.
    pub new_rs1: Vec<u8>,
}

/// Computes the total hash over the negotiation messages:
/// `H(Hello-R || Commit || DHPart1 || DHPart2)`, byte-exact over the raw
/// message images. MultiStream and PreShared pass only the first two.
pub fn total_hash(hash: &dyn Hash, messages: &[&[u8]]) -> Vec<u8> {
    let mut data = Vec::new();
    for m in messages {
        data.extend_from_slice(m);
    }
    hash.digest(&data)
}

/// Builds the KDF context: `ZIDi || ZIDr || total_hash`.
pub fn kdf_context(zid_i: &[u8; 12], zid_r: &[u8; 12], total_hash: &[u8]) -> Vec<u8> {
    let mut context = Vec::with_capacity(24 + total_hash.len());
    context.extend_from_slice(zid_i);
    context.extend_from_slice(zid_r);
    context.extend_from_slice(total_hash);
    context
}

/// Derives the s0 master secret for the DH modes (RFC 6189 Section 4.4.1.4):
///
/// `s0 = H(1 | DHResult | "ZRTP-HMAC-KDF" | ZIDi | ZIDr | total_hash
///         | len(s1) | s1 | len(s2) | s2 | len(s3) | s3)`
///
/// Absent shared secrets contribute a zero length and no bytes.
pub fn derive_s0(
    hash: &dyn Hash,
    dh_result: &[u8],
    zid_i: &[u8; 12],
    zid_r: &[u8; 12],
    total_hash: &[u8],
    s1: Option<&[u8]>,
    s2: Option<&[u8]>,
    s3: Option<&[u8]>,
) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(dh_result);
    data.extend_from_slice(b"ZRTP-HMAC-KDF");
    data.extend_from_slice(zid_i);
    data.extend_from_slice(zid_r);
    data.extend_from_slice(total_hash);

    for s in [s1, s2, s3] {
        match s {
            Some(secret) => {
                data.extend_from_slice(&(secret.len() as u32).to_be_bytes());
                data.extend_from_slice(secret);
            }
            None => data.extend_from_slice(&0u32.to_be_bytes()),
        }
    }

    let s0 = hash.digest(&data);
    data.zeroize();
    s0
}

/// Derives s0 for a MultiStream session from the master stream's ZRTPSess.
/// The commit nonce enters through the total hash inside `context`.
pub fn derive_multistream_s0(hash: &dyn Hash, zrtp_session: &[u8], context: &[u8]) -> Vec<u8> {
    hash.kdf(zrtp_session, b"ZRTP MSK", context, hash.output_len())
}

/// Derives the PreShared mode key material from a cached rs1.
pub fn preshared_key(hash: &dyn Hash, rs1: &[u8]) -> Vec<u8> {
    hash.hmac(rs1, b"ZRTP PSK")
}

/// The 8-byte key identifier a PreShared Commit carries.
pub fn preshared_key_id(hash: &dyn Hash, psk: &[u8]) -> [u8; 8] {
    let mac = hash.hmac(psk, b"Prsh");
    let mut id = [0u8; 8];
    id.copy_from_slice(&mac[..8]);
    id
}

/// Derives s0 for the PreShared mode.
pub fn derive_preshared_s0(hash: &dyn Hash, psk: &[u8], context: &[u8]) -> Vec<u8> {
    hash.kdf(psk, b"ZRTP PSK", context, hash.output_len())
}

/// Derives the full session key block from s0 (RFC 6189 Section 4.5.3).
///
/// `cipher_key_len` is the negotiated cipher's key length; HMAC keys use
/// the hash length and SRTP salts are always 14 bytes.
pub fn derive_session_keys(
    hash: &dyn Hash,
    s0: &[u8],
    context: &[u8],
    cipher_key_len: usize,
) -> SessionKeys {
    let nh = hash.output_len();

    SessionKeys {
        mackey_i: hash.kdf(s0, b"Initiator HMAC key", context, nh),
        mackey_r: hash.kdf(s0, b"Responder HMAC key", context, nh),
        zrtpkey_i: hash.kdf(s0, b"Initiator ZRTP key", context, cipher_key_len),
        zrtpkey_r: hash.kdf(s0, b"Responder ZRTP key", context, cipher_key_len),
        srtpkey_i: hash.kdf(s0, b"Initiator SRTP master key", context, cipher_key_len),
        srtpsalt_i: hash.kdf(s0, b"Initiator SRTP master salt", context, 14),
        srtpkey_r: hash.kdf(s0, b"Responder SRTP master key", context, cipher_key_len),
        srtpsalt_r: hash.kdf(s0, b"Responder SRTP master salt", context, 14),
        sashash: hash.kdf(s0, b"SAS", context, 32),
        zrtp_session: hash.kdf(s0, b"ZRTP Session Key", context, nh),
        new_rs1: hash.kdf(s0, b"retained secret", context, 32),
    }
}

/// Derives the 8-byte retained-secret ID sent in DHPart1/DHPart2:
/// `HMAC(secret, role label)` truncated.
pub fn secret_id(hash: &dyn Hash, secret: &[u8], label: &[u8]) -> [u8; 8] {
    let mac = hash.hmac(secret, label);
    let mut id = [0u8; 8];
    id.copy_from_slice(&mac[..8]);
    id
}

/// The value a matched retained secret contributes to s0.
pub fn matched_secret(hash: &dyn Hash, secret: &[u8]) -> Vec<u8> {
    hash.hmac(secret, LABEL_MATCHED_SECRET)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Sha256;

    #[test]
    fn test_s0_deterministic() {
        let hash = Sha256;
        let dh = vec![0xAA; 32];
        let zid_i = [0x11; 12];
        let zid_r = [0x22; 12];
        let th = vec![0x33; 32];

        let a = derive_s0(&hash, &dh, &zid_i, &zid_r, &th, None, None, None);
        let b = derive_s0(&hash, &dh, &zid_i, &zid_r, &th, None, None, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_s0_secret_contribution() {
        let hash = Sha256;
        let dh = vec![0xAA; 32];
        let zid_i = [0x11; 12];
        let zid_r = [0x22; 12];
        let th = vec![0x33; 32];
        let s1 = vec![0x44; 32];

        let without = derive_s0(&hash, &dh, &zid_i, &zid_r, &th, None, None, None);
        let with = derive_s0(&hash, &dh, &zid_i, &zid_r, &th, Some(&s1), None, None);
        assert_ne!(without, with);
    }

    #[test]
    fn test_key_block_shapes() {
        let hash = Sha256;
        let s0 = vec![0x55; 32];
        let ctx = kdf_context(&[1; 12], &[2; 12], &[3; 32]);

        let keys = derive_session_keys(&hash, &s0, &ctx, 16);
        assert_eq!(keys.mackey_i.len(), 32);
        assert_eq!(keys.zrtpkey_i.len(), 16);
        assert_eq!(keys.srtpkey_r.len(), 16);
        assert_eq!(keys.srtpsalt_i.len(), 14);
        assert_eq!(keys.srtpsalt_r.len(), 14);
        assert_eq!(keys.sashash.len(), 32);
        assert_eq!(keys.new_rs1.len(), 32);
        assert_ne!(keys.srtpkey_i, keys.srtpkey_r);
        assert_ne!(keys.mackey_i, keys.mackey_r);
    }

    #[test]
    fn test_secret_ids_differ_by_role() {
        let hash = Sha256;
        let rs1 = vec![0x66; 32];
        let a = secret_id(&hash, &rs1, b"Initiator");
        let b = secret_id(&hash, &rs1, b"Responder");
        assert_ne!(a, b);
    }

    #[test]
    fn test_multistream_s0_depends_on_context() {
        let hash = Sha256;
        let sess = vec![0x77; 32];
        let a = derive_multistream_s0(&hash, &sess, b"ctx-one");
        let b = derive_multistream_s0(&hash, &sess, b"ctx-two");
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
