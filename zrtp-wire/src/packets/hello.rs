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

/// Signature-capable flag (S) in the Hello flag byte.
pub const FLAG_SIGNATURE: u8 = 0x40;
/// Trusted MitM flag (M) in the Hello flag byte.
pub const FLAG_MITM: u8 = 0x20;
/// Passive flag (P) in the Hello flag byte.
pub const FLAG_PASSIVE: u8 = 0x10;

/// The Hello message opens the discovery phase and advertises the
/// endpoint's capabilities.
///
/// Defined in RFC 6189 Section 5.2. The five algorithm lists are ordered
/// by preference; their counts travel in the nibbles following the flag
/// byte. The trailing HMAC is keyed by H2, revealed later in Commit.
#[derive(Debug, Clone)]
pub struct HelloPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// The ZRTP protocol version, e.g. `"1.10"`.
    pub version: [u8; 4],
    /// Client identifier string, space padded.
    pub client_id: [u8; 16],
    /// H3, the top of the hash pre-image chain.
    pub hash_h3: [u8; 32],
    /// The ZID of the endpoint.
    pub zid: [u8; 12],
    /// S/M/P flag bits.
    pub flags: u8,
    /// Offered hash algorithms.
    pub hashes: Vec<[u8; 4]>,
    /// Offered ciphers.
    pub ciphers: Vec<[u8; 4]>,
    /// Offered SRTP auth tag lengths.
    pub auth_tags: Vec<[u8; 4]>,
    /// Offered key agreement types.
    pub pubkeys: Vec<[u8; 4]>,
    /// Offered SAS rendering schemes.
    pub sas_types: Vec<[u8; 4]>,
    /// HMAC over the message, keyed by H2.
    pub hmac: [u8; 8],
}

fn parse_tag_list(input: &[u8], count: usize) -> IResult<&[u8], Vec<[u8; 4]>> {
    let mut tags = Vec::with_capacity(count);
    let mut rest = input;
    for _ in 0..count {
        let (r, tag_bytes) = take(4usize)(rest)?;
        let mut tag = [0u8; 4];
        tag.copy_from_slice(tag_bytes);
        tags.push(tag);
        rest = r;
    }
    Ok((rest, tags))
}

impl HelloPacket {
    /// The message type identifier for Hello packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Hello   ";

    /// Builds a Hello with a correct length field; the HMAC is filled in
    /// by the engine once the message image is final.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        version: [u8; 4],
        client_id: [u8; 16],
        hash_h3: [u8; 32],
        zid: [u8; 12],
        flags: u8,
        hashes: Vec<[u8; 4]>,
        ciphers: Vec<[u8; 4]>,
        auth_tags: Vec<[u8; 4]>,
        pubkeys: Vec<[u8; 4]>,
        sas_types: Vec<[u8; 4]>,
    ) -> Self {
        let tags =
            hashes.len() + ciphers.len() + auth_tags.len() + pubkeys.len() + sas_types.len();
        let length = (22 + tags) as u16;
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, length),
            version,
            client_id,
            hash_h3,
            zid,
            flags,
            hashes,
            ciphers,
            auth_tags,
            pubkeys,
            sas_types,
            hmac: [0u8; 8],
        }
    }

    /// Parses a Hello message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, version_bytes) = take(4usize)(input)?;
        let (input, client_id_bytes) = take(16usize)(input)?;
        let (input, hash_h3_bytes) = take(32usize)(input)?;
        let (input, zid_bytes) = take(12usize)(input)?;
        let (input, flag_word) = take(4usize)(input)?;

        let flags = flag_word[0] & 0x70;
        let hc = (flag_word[1] & 0x0F) as usize;
        let cc = (flag_word[2] >> 4) as usize;
        let ac = (flag_word[2] & 0x0F) as usize;
        let kc = (flag_word[3] >> 4) as usize;
        let sc = (flag_word[3] & 0x0F) as usize;

        let (input, hashes) = parse_tag_list(input, hc)?;
        let (input, ciphers) = parse_tag_list(input, cc)?;
        let (input, auth_tags) = parse_tag_list(input, ac)?;
        let (input, pubkeys) = parse_tag_list(input, kc)?;
        let (input, sas_types) = parse_tag_list(input, sc)?;

        let (input, hmac_bytes) = take(8usize)(input)?;

        let mut version = [0u8; 4];
        version.copy_from_slice(version_bytes);
        let mut client_id = [0u8; 16];
        client_id.copy_from_slice(client_id_bytes);
        let mut hash_h3 = [0u8; 32];
        hash_h3.copy_from_slice(hash_h3_bytes);
        let mut zid = [0u8; 12];
        zid.copy_from_slice(zid_bytes);
        let mut hmac = [0u8; 8];
        hmac.copy_from_slice(hmac_bytes);

        Ok((
            input,
            Self {
                header,
                version,
                client_id,
                hash_h3,
                zid,
                flags,
                hashes,
                ciphers,
                auth_tags,
                pubkeys,
                sas_types,
                hmac,
            },
        ))
    }

    /// Serializes the Hello message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.client_id);
        bytes.extend_from_slice(&self.hash_h3);
        bytes.extend_from_slice(&self.zid);

        bytes.push(self.flags & 0x70);
        bytes.push((self.hashes.len() & 0x0F) as u8);
        bytes.push((((self.ciphers.len() & 0x0F) << 4) | (self.auth_tags.len() & 0x0F)) as u8);
        bytes.push((((self.pubkeys.len() & 0x0F) << 4) | (self.sas_types.len() & 0x0F)) as u8);

        for list in [
            &self.hashes,
            &self.ciphers,
            &self.auth_tags,
            &self.pubkeys,
            &self.sas_types,
        ] {
            for tag in list {
                bytes.extend_from_slice(tag);
            }
        }

        bytes.extend_from_slice(&self.hmac);
        bytes
    }

    /// True when the passive flag is set; a passive endpoint never sends
    /// Commit.
    pub fn is_passive(&self) -> bool {
        self.flags & FLAG_PASSIVE != 0
    }

    /// True when the endpoint advertises trusted MitM (PBX) capability.
    pub fn is_mitm(&self) -> bool {
        self.flags & FLAG_MITM != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hello() -> HelloPacket {
        let mut client_id = [b' '; 16];
        client_id[..9].copy_from_slice(b"zrtp-rs 2");
        HelloPacket::new(
            *b"1.10",
            client_id,
            [0xA3; 32],
            [0x11; 12],
            0,
            vec![*b"S256"],
            vec![*b"AES1"],
            vec![*b"HS32", *b"HS80"],
            vec![*b"E255", *b"Mult"],
            vec![*b"B32 "],
        )
    }

    #[test]
    fn test_hello_codec() {
        let hello = sample_hello();
        let bytes = hello.to_bytes();
        assert_eq!(bytes.len(), hello.header.length as usize * 4);

        let (rem, parsed) = HelloPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.version, hello.version);
        assert_eq!(parsed.zid, hello.zid);
        assert_eq!(parsed.hash_h3, hello.hash_h3);
        assert_eq!(parsed.pubkeys, hello.pubkeys);
        assert_eq!(parsed.sas_types, hello.sas_types);
    }

    #[test]
    fn test_hello_flags() {
        let mut hello = sample_hello();
        hello.flags = FLAG_PASSIVE | FLAG_MITM;
        let bytes = hello.to_bytes();
        let (_, parsed) = HelloPacket::parse(&bytes).unwrap();
        assert!(parsed.is_passive());
        assert!(parsed.is_mitm());
    }
}
