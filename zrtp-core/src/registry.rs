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

//! The algorithm registry: negotiable 4-byte tags per family, ordered
//! preference lists and the Commit-time selection rules.

use crate::codes::ZrtpErrorCode;
use crate::config::ZrtpConfig;
use zrtp_wire::packets::HelloPacket;

/// Negotiable hash algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    S256,
    S384,
}

impl HashAlgorithm {
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            HashAlgorithm::S256 => *b"S256",
            HashAlgorithm::S384 => *b"S384",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"S256" => Some(HashAlgorithm::S256),
            b"S384" => Some(HashAlgorithm::S384),
            _ => None,
        }
    }
}

/// Negotiable ciphers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    Aes1,
    Aes3,
    TwoFs1,
    TwoFs3,
}

impl CipherAlgorithm {
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            CipherAlgorithm::Aes1 => *b"AES1",
            CipherAlgorithm::Aes3 => *b"AES3",
            CipherAlgorithm::TwoFs1 => *b"2FS1",
            CipherAlgorithm::TwoFs3 => *b"2FS3",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"AES1" => Some(CipherAlgorithm::Aes1),
            b"AES3" => Some(CipherAlgorithm::Aes3),
            b"2FS1" => Some(CipherAlgorithm::TwoFs1),
            b"2FS3" => Some(CipherAlgorithm::TwoFs3),
            _ => None,
        }
    }

    /// Cipher key length in bytes.
    pub const fn key_len(&self) -> usize {
        match self {
            CipherAlgorithm::Aes1 | CipherAlgorithm::TwoFs1 => 16,
            CipherAlgorithm::Aes3 | CipherAlgorithm::TwoFs3 => 32,
        }
    }
}

/// Negotiable SRTP authentication tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTagAlgorithm {
    Hs32,
    Hs80,
    Sk32,
    Sk64,
}

impl AuthTagAlgorithm {
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            AuthTagAlgorithm::Hs32 => *b"HS32",
            AuthTagAlgorithm::Hs80 => *b"HS80",
            AuthTagAlgorithm::Sk32 => *b"SK32",
            AuthTagAlgorithm::Sk64 => *b"SK64",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"HS32" => Some(AuthTagAlgorithm::Hs32),
            b"HS80" => Some(AuthTagAlgorithm::Hs80),
            b"SK32" => Some(AuthTagAlgorithm::Sk32),
            b"SK64" => Some(AuthTagAlgorithm::Sk64),
            _ => None,
        }
    }
}

/// Negotiable key agreement types. `Mult` and `Prsh` are mode markers,
/// not DH groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubKeyAlgorithm {
    Dh2k,
    Dh3k,
    Ec25,
    Ec38,
    E255,
    E414,
    Mult,
    Prsh,
}

impl PubKeyAlgorithm {
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            PubKeyAlgorithm::Dh2k => *b"DH2k",
            PubKeyAlgorithm::Dh3k => *b"DH3k",
            PubKeyAlgorithm::Ec25 => *b"EC25",
            PubKeyAlgorithm::Ec38 => *b"EC38",
            PubKeyAlgorithm::E255 => *b"E255",
            PubKeyAlgorithm::E414 => *b"E414",
            PubKeyAlgorithm::Mult => *b"Mult",
            PubKeyAlgorithm::Prsh => *b"Prsh",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"DH2k" => Some(PubKeyAlgorithm::Dh2k),
            b"DH3k" => Some(PubKeyAlgorithm::Dh3k),
            b"EC25" => Some(PubKeyAlgorithm::Ec25),
            b"EC38" => Some(PubKeyAlgorithm::Ec38),
            b"E255" => Some(PubKeyAlgorithm::E255),
            b"E414" => Some(PubKeyAlgorithm::E414),
            b"Mult" => Some(PubKeyAlgorithm::Mult),
            b"Prsh" => Some(PubKeyAlgorithm::Prsh),
            _ => None,
        }
    }

    /// True for groups strong enough to pair with a 256-bit cipher.
    pub const fn is_large_group(&self) -> bool {
        matches!(
            self,
            PubKeyAlgorithm::Ec38 | PubKeyAlgorithm::E414
        )
    }

    /// True for the keyless session modes.
    pub const fn is_mode_marker(&self) -> bool {
        matches!(self, PubKeyAlgorithm::Mult | PubKeyAlgorithm::Prsh)
    }
}

/// Negotiable SAS rendering schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasAlgorithm {
    B32,
    B256,
    B32E,
    B256E,
}

impl SasAlgorithm {
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            SasAlgorithm::B32 => *b"B32 ",
            SasAlgorithm::B256 => *b"B256",
            SasAlgorithm::B32E => *b"B32E",
            SasAlgorithm::B256E => *b"B56E",
        }
    }

    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"B32 " => Some(SasAlgorithm::B32),
            b"B256" => Some(SasAlgorithm::B256),
            b"B32E" => Some(SasAlgorithm::B32E),
            b"B56E" => Some(SasAlgorithm::B256E),
            _ => None,
        }
    }
}

/// The selected algorithm set a Commit pins down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmProfile {
    pub hash: HashAlgorithm,
    pub cipher: CipherAlgorithm,
    pub auth_tag: AuthTagAlgorithm,
    pub pubkey: PubKeyAlgorithm,
    pub sas: SasAlgorithm,
}

impl AlgorithmProfile {
    /// The mandatory-to-implement baseline.
    pub fn mandatory() -> Self {
        Self {
            hash: HashAlgorithm::S256,
            cipher: CipherAlgorithm::Aes1,
            auth_tag: AuthTagAlgorithm::Hs32,
            pubkey: PubKeyAlgorithm::Dh3k,
            sas: SasAlgorithm::B32,
        }
    }

    /// Builds a profile from Commit tags; the committing side must only
    /// pick algorithms the Hello offered, so every tag must be known.
    pub fn from_commit_tags(
        hash: &[u8; 4],
        cipher: &[u8; 4],
        auth_tag: &[u8; 4],
        pubkey: &[u8; 4],
        sas: &[u8; 4],
    ) -> Result<Self, ZrtpErrorCode> {
        Ok(Self {
            hash: HashAlgorithm::from_tag(hash).ok_or(ZrtpErrorCode::UnsuppHashType)?,
            cipher: CipherAlgorithm::from_tag(cipher).ok_or(ZrtpErrorCode::UnsuppCipherType)?,
            auth_tag: AuthTagAlgorithm::from_tag(auth_tag)
                .ok_or(ZrtpErrorCode::UnsuppSrtpAuthTag)?,
            pubkey: PubKeyAlgorithm::from_tag(pubkey).ok_or(ZrtpErrorCode::UnsuppPkExchange)?,
            sas: SasAlgorithm::from_tag(sas).ok_or(ZrtpErrorCode::UnsuppSasScheme)?,
        })
    }
}

/// Picks the first locally preferred tag the peer also offers, falling
/// back to the given mandatory algorithm on an empty intersection.
fn pick<T: Copy + PartialEq>(
    local: &[T],
    peer: &[T],
    mandatory: T,
) -> T {
    for candidate in local {
        if peer.contains(candidate) {
            return *candidate;
        }
    }
    mandatory
}

fn peer_tags<T, F: Fn(&[u8; 4]) -> Option<T>>(tags: &[[u8; 4]], from_tag: F) -> Vec<T> {
    tags.iter().filter_map(|t| from_tag(t)).collect()
}

/// Commit-time algorithm selection against a peer Hello.
///
/// Returns the profile plus a flag for the AES-256/DH-group mismatch
/// advisory. A chosen `S384` upgrades the cipher to AES-256 and the auth
/// tag to the 80-bit HMAC.
pub fn select_profile(config: &ZrtpConfig, peer: &HelloPacket) -> (AlgorithmProfile, bool) {
    let mandatory = AlgorithmProfile::mandatory();

    let peer_hashes = peer_tags(&peer.hashes, HashAlgorithm::from_tag);
    let peer_ciphers = peer_tags(&peer.ciphers, CipherAlgorithm::from_tag);
    let peer_auth_tags = peer_tags(&peer.auth_tags, AuthTagAlgorithm::from_tag);
    let peer_sas = peer_tags(&peer.sas_types, SasAlgorithm::from_tag);
    let peer_pubkeys: Vec<PubKeyAlgorithm> = peer_tags(&peer.pubkeys, PubKeyAlgorithm::from_tag)
        .into_iter()
        .filter(|a| !a.is_mode_marker())
        .collect();
    let local_pubkeys: Vec<PubKeyAlgorithm> = config
        .pubkeys
        .iter()
        .copied()
        .filter(|a| !a.is_mode_marker())
        .collect();

    let hash = pick(&config.hashes, &peer_hashes, mandatory.hash);
    let mut cipher = pick(&config.ciphers, &peer_ciphers, mandatory.cipher);
    let mut auth_tag = pick(&config.auth_tags, &peer_auth_tags, mandatory.auth_tag);
    let pubkey = pick(&local_pubkeys, &peer_pubkeys, mandatory.pubkey);
    let sas = pick(&config.sas_types, &peer_sas, mandatory.sas);

    if hash == HashAlgorithm::S384 {
        cipher = CipherAlgorithm::Aes3;
        auth_tag = AuthTagAlgorithm::Hs80;
    }

    let offers_big_cipher = peer_ciphers.contains(&CipherAlgorithm::Aes3)
        || peer_ciphers.contains(&CipherAlgorithm::TwoFs3);
    let offers_large_group = peer_pubkeys.iter().any(|a| a.is_large_group());
    let dh_aes_mismatch = offers_big_cipher && !offers_large_group;

    (
        AlgorithmProfile {
            hash,
            cipher,
            auth_tag,
            pubkey,
            sas,
        },
        dh_aes_mismatch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_with(pubkeys: Vec<[u8; 4]>, ciphers: Vec<[u8; 4]>) -> HelloPacket {
        HelloPacket::new(
            *b"1.10",
            [b' '; 16],
            [0; 32],
            [9; 12],
            0,
            vec![*b"S256"],
            ciphers,
            vec![*b"HS32", *b"HS80"],
            pubkeys,
            vec![*b"B32 "],
        )
    }

    #[test]
    fn test_select_prefers_local_order() {
        let config = ZrtpConfig::default();
        let hello = hello_with(vec![*b"E255", *b"Mult"], vec![*b"AES1"]);

        let (profile, mismatch) = select_profile(&config, &hello);
        assert_eq!(profile.hash, HashAlgorithm::S256);
        assert_eq!(profile.cipher, CipherAlgorithm::Aes1);
        assert_eq!(profile.pubkey, PubKeyAlgorithm::E255);
        assert_eq!(profile.sas, SasAlgorithm::B32);
        assert!(!mismatch);
    }

    #[test]
    fn test_no_overlap_falls_back_to_mandatory() {
        let config = ZrtpConfig::default();
        let hello = hello_with(vec![*b"DH2k"], vec![*b"2FS1"]);

        let (profile, _) = select_profile(&config, &hello);
        assert_eq!(profile.pubkey, PubKeyAlgorithm::Dh3k);
        assert_eq!(profile.cipher, CipherAlgorithm::Aes1);
    }

    #[test]
    fn test_aes3_without_large_group_warns() {
        let config = ZrtpConfig::default();
        let hello = hello_with(vec![*b"E255"], vec![*b"AES3", *b"AES1"]);

        let (_, mismatch) = select_profile(&config, &hello);
        assert!(mismatch);

        let hello = hello_with(vec![*b"E414", *b"E255"], vec![*b"AES3", *b"AES1"]);
        let (_, mismatch) = select_profile(&config, &hello);
        assert!(!mismatch);
    }

    #[test]
    fn test_s384_forces_upgrades() {
        let mut config = ZrtpConfig::default();
        config.hashes = vec![HashAlgorithm::S384, HashAlgorithm::S256];

        let mut hello = hello_with(vec![*b"E255"], vec![*b"AES1", *b"AES3"]);
        hello.hashes = vec![*b"S384", *b"S256"];

        let (profile, _) = select_profile(&config, &hello);
        assert_eq!(profile.hash, HashAlgorithm::S384);
        assert_eq!(profile.cipher, CipherAlgorithm::Aes3);
        assert_eq!(profile.auth_tag, AuthTagAlgorithm::Hs80);
    }

    #[test]
    fn test_commit_tags_round_trip() {
        let profile = AlgorithmProfile::from_commit_tags(
            b"S256", b"AES1", b"HS32", b"E255", b"B32 ",
        )
        .unwrap();
        assert_eq!(profile.pubkey, PubKeyAlgorithm::E255);

        assert_eq!(
            AlgorithmProfile::from_commit_tags(b"S999", b"AES1", b"HS32", b"E255", b"B32 "),
            Err(ZrtpErrorCode::UnsuppHashType)
        );
    }
}
