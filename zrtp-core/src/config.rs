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

use crate::registry::{
    AuthTagAlgorithm, CipherAlgorithm, HashAlgorithm, PubKeyAlgorithm, SasAlgorithm,
};
use zeroize::Zeroizing;

/// Per-session configuration: ordered algorithm preferences plus the
/// policy switches.
#[derive(Clone)]
pub struct ZrtpConfig {
    /// Ordered preferred hashes.
    pub hashes: Vec<HashAlgorithm>,
    /// Ordered preferred ciphers.
    pub ciphers: Vec<CipherAlgorithm>,
    /// Ordered preferred SRTP auth tags.
    pub auth_tags: Vec<AuthTagAlgorithm>,
    /// Ordered preferred key agreements; `Mult` is advertised for
    /// MultiStream capability.
    pub pubkeys: Vec<PubKeyAlgorithm>,
    /// Ordered preferred SAS renderings.
    pub sas_types: Vec<SasAlgorithm>,
    /// Client identifier placed in Hello, space padded.
    pub client_id: [u8; 16],
    /// SSRC used in the packet framing.
    pub ssrc: u32,
    /// Act as a trusted MitM (PBX); sets the M flag in Hello.
    pub trusted_mitm: bool,
    /// Request PBX enrollment in Confirm.
    pub enrollment: bool,
    /// Advertise SAS signature capability; sets the S flag in Hello.
    pub sas_sign_support: bool,
    /// Never report a SAS as verified, regardless of cache state.
    pub paranoid: bool,
    /// Set the disclosure flag in Confirm.
    pub disclosure: bool,
    /// Permit GoClear; sets the A flag in Confirm.
    pub allow_clear: bool,
    /// Never send Commit; sets the P flag in Hello.
    pub passive: bool,
    /// Prefer the PreShared mode when a valid rs1 is cached.
    pub preshared: bool,
    /// Optional auxiliary shared secret (e.g. from signaling).
    pub aux_secret: Option<Zeroizing<Vec<u8>>>,
    /// Lifetime of a freshly installed rs1, in seconds.
    pub rs_expire_secs: i64,
}

impl Default for ZrtpConfig {
    fn default() -> Self {
        let mut client_id = [b' '; 16];
        client_id[..10].copy_from_slice(b"zrtp-rs2.0");
        Self {
            hashes: vec![HashAlgorithm::S256],
            ciphers: vec![CipherAlgorithm::Aes1],
            auth_tags: vec![AuthTagAlgorithm::Hs32, AuthTagAlgorithm::Hs80],
            pubkeys: vec![PubKeyAlgorithm::E255, PubKeyAlgorithm::Mult],
            sas_types: vec![SasAlgorithm::B32, SasAlgorithm::B256],
            client_id,
            ssrc: 0,
            trusted_mitm: false,
            enrollment: false,
            sas_sign_support: false,
            paranoid: false,
            disclosure: false,
            allow_clear: false,
            passive: false,
            preshared: false,
            aux_secret: None,
            rs_expire_secs: zrtp_cache::DEFAULT_EXPIRE_SECS,
        }
    }
}
