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

use super::header::MessageHeader;
use nom::{bytes::complete::take, IResult};

/// The mode-dependent tail of a Commit message.
///
/// DH modes commit to the initiator's DHPart2 through hvi; the keyless
/// modes carry a fresh nonce instead (plus the key ID for PreShared).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitParams {
    /// DH mode: hvi = H(DHPart2 || Hello-R).
    Dh { hvi: [u8; 32] },
    /// MultiStream mode (`Mult`): a fresh nonce feeding the total hash.
    MultiStream { nonce: [u8; 16] },
    /// PreShared mode (`Prsh`): nonce plus the cached-secret key ID.
    PreShared { nonce: [u8; 16], key_id: [u8; 8] },
}

/// The Commit message claims the Initiator role and pins the negotiated
/// algorithms.
///
/// Defined in RFC 6189 Section 5.4. The trailing HMAC is keyed by H1,
/// revealed later in DHPart2 (or never checked in the keyless modes,
/// which skip DHPart entirely).
#[derive(Debug, Clone)]
pub struct CommitPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// H2, revealing the key of the previously received Hello HMAC.
    pub hash_h2: [u8; 32],
    /// The ZID of the committing endpoint.
    pub zid: [u8; 12],
    /// Selected hash algorithm (e.g., `S256`).
    pub hash_alg: [u8; 4],
    /// Selected cipher algorithm (e.g., `AES1`).
    pub cipher_alg: [u8; 4],
    /// Selected SRTP auth tag length (e.g., `HS32`).
    pub auth_tag_alg: [u8; 4],
    /// Selected key agreement (e.g., `E255`, `Mult`, `Prsh`).
    pub key_agreement_alg: [u8; 4],
    /// Selected SAS rendering scheme (e.g., `B32 `).
    pub sas_alg: [u8; 4],
    /// Mode-dependent commitment values.
    pub params: CommitParams,
    /// HMAC over the message, keyed by H1.
    pub hmac: [u8; 8],
}

impl CommitPacket {
    /// The message type identifier for Commit packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Commit  ";

    /// Builds a Commit with a correct length field for its mode.
    pub fn new(
        hash_h2: [u8; 32],
        zid: [u8; 12],
        hash_alg: [u8; 4],
        cipher_alg: [u8; 4],
        auth_tag_alg: [u8; 4],
        key_agreement_alg: [u8; 4],
        sas_alg: [u8; 4],
        params: CommitParams,
    ) -> Self {
        // Fixed part: header + H2 + ZID + five tags + HMAC = 21 words.
        let tail_words = match &params {
            CommitParams::Dh { .. } => 8,
            CommitParams::MultiStream { .. } => 4,
            CommitParams::PreShared { .. } => 6,
        };
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, 21 + tail_words),
            hash_h2,
            zid,
            hash_alg,
            cipher_alg,
            auth_tag_alg,
            key_agreement_alg,
            sas_alg,
            params,
            hmac: [0u8; 8],
        }
    }

    /// Parses a Commit message from the given input bytes. The tail
    /// layout follows the key agreement tag.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, hash_h2_bytes) = take(32usize)(input)?;
        let (input, zid_bytes) = take(12usize)(input)?;
        let (input, hash_alg_bytes) = take(4usize)(input)?;
        let (input, cipher_alg_bytes) = take(4usize)(input)?;
        let (input, auth_tag_alg_bytes) = take(4usize)(input)?;
        let (input, key_agreement_alg_bytes) = take(4usize)(input)?;
        let (input, sas_alg_bytes) = take(4usize)(input)?;

        let mut key_agreement_alg = [0u8; 4];
        key_agreement_alg.copy_from_slice(key_agreement_alg_bytes);

        let (input, params) = match &key_agreement_alg {
            b"Mult" => {
                let (input, nonce_bytes) = take(16usize)(input)?;
                let mut nonce = [0u8; 16];
                nonce.copy_from_slice(nonce_bytes);
                (input, CommitParams::MultiStream { nonce })
            }
            b"Prsh" => {
                let (input, nonce_bytes) = take(16usize)(input)?;
                let (input, key_id_bytes) = take(8usize)(input)?;
                let mut nonce = [0u8; 16];
                nonce.copy_from_slice(nonce_bytes);
                let mut key_id = [0u8; 8];
                key_id.copy_from_slice(key_id_bytes);
                (input, CommitParams::PreShared { nonce, key_id })
            }
            _ => {
                let (input, hvi_bytes) = take(32usize)(input)?;
                let mut hvi = [0u8; 32];
                hvi.copy_from_slice(hvi_bytes);
                (input, CommitParams::Dh { hvi })
            }
        };

        let (input, hmac_bytes) = take(8usize)(input)?;

        let mut hash_h2 = [0u8; 32];
        hash_h2.copy_from_slice(hash_h2_bytes);
        let mut zid = [0u8; 12];
        zid.copy_from_slice(zid_bytes);
        let mut hash_alg = [0u8; 4];
        hash_alg.copy_from_slice(hash_alg_bytes);
        let mut cipher_alg = [0u8; 4];
        cipher_alg.copy_from_slice(cipher_alg_bytes);
        let mut auth_tag_alg = [0u8; 4];
        auth_tag_alg.copy_from_slice(auth_tag_alg_bytes);
        let mut sas_alg = [0u8; 4];
        sas_alg.copy_from_slice(sas_alg_bytes);
        let mut hmac = [0u8; 8];
        hmac.copy_from_slice(hmac_bytes);

        Ok((
            input,
            Self {
                header,
                hash_h2,
                zid,
                hash_alg,
                cipher_alg,
                auth_tag_alg,
                key_agreement_alg,
                sas_alg,
                params,
                hmac,
            },
        ))
    }

    /// Serializes the Commit message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.hash_h2);
        bytes.extend_from_slice(&self.zid);
        bytes.extend_from_slice(&self.hash_alg);
        bytes.extend_from_slice(&self.cipher_alg);
        bytes.extend_from_slice(&self.auth_tag_alg);
        bytes.extend_from_slice(&self.key_agreement_alg);
        bytes.extend_from_slice(&self.sas_alg);
        match &self.params {
            CommitParams::Dh { hvi } => bytes.extend_from_slice(hvi),
            CommitParams::MultiStream { nonce } => bytes.extend_from_slice(nonce),
            CommitParams::PreShared { nonce, key_id } => {
                bytes.extend_from_slice(nonce);
                bytes.extend_from_slice(key_id);
            }
        }
        bytes.extend_from_slice(&self.hmac);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_commit_codec() {
        let commit = CommitPacket::new(
            [0x22; 32],
            [0x33; 12],
            *b"S256",
            *b"AES1",
            *b"HS32",
            *b"E255",
            *b"B32 ",
            CommitParams::Dh { hvi: [0x44; 32] },
        );

        let bytes = commit.to_bytes();
        assert_eq!(bytes.len(), 29 * 4);

        let (rem, parsed) = CommitPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.zid, commit.zid);
        assert_eq!(parsed.params, commit.params);
    }

    #[test]
    fn test_multistream_commit_codec() {
        let commit = CommitPacket::new(
            [0x22; 32],
            [0x33; 12],
            *b"S256",
            *b"AES1",
            *b"HS32",
            *b"Mult",
            *b"B32 ",
            CommitParams::MultiStream { nonce: [0x55; 16] },
        );

        let bytes = commit.to_bytes();
        assert_eq!(bytes.len(), 25 * 4);

        let (_, parsed) = CommitPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.params, CommitParams::MultiStream { nonce: [0x55; 16] });
    }

    #[test]
    fn test_preshared_commit_codec() {
        let commit = CommitPacket::new(
            [0x22; 32],
            [0x33; 12],
            *b"S256",
            *b"AES1",
            *b"HS32",
            *b"Prsh",
            *b"B32 ",
            CommitParams::PreShared {
                nonce: [0x66; 16],
                key_id: [0x77; 8],
            },
        );

        let bytes = commit.to_bytes();
        assert_eq!(bytes.len(), 27 * 4);

        let (_, parsed) = CommitPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.params, commit.params);
    }
}
