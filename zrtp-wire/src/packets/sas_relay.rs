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

use super::header::MessageHeader;
use nom::{bytes::complete::take, IResult};

/// The plaintext carried inside the encrypted part of a SASrelay message:
/// the rendering scheme and the relayed SAS hash (RFC 6189 Section 5.13).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasRelayBody {
    /// Signature length in words (9 bits on the wire).
    pub sig_len_words: u16,
    /// V/A/D flag bits, as in Confirm.
    pub flags: u8,
    /// The rendering scheme the relayed hash belongs to.
    pub sas_alg: [u8; 4],
    /// The SAS hash relayed by the trusted MitM.
    pub sas_hash: [u8; 32],
    /// Optional signature block.
    pub signature: Vec<u8>,
}

impl SasRelayBody {
    /// Serializes the plaintext body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(40 + self.signature.len());
        bytes.push(0);
        bytes.push(((self.sig_len_words >> 8) & 0x01) as u8);
        bytes.push((self.sig_len_words & 0xFF) as u8);
        bytes.push(self.flags & 0x0F);
        bytes.extend_from_slice(&self.sas_alg);
        bytes.extend_from_slice(&self.sas_hash);
        bytes.extend_from_slice(&self.signature);
        bytes
    }

    /// Parses a decrypted body.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, filler) = take(2usize)(input)?;
        let (input, sig_low) = take(1usize)(input)?;
        let (input, flag_byte) = take(1usize)(input)?;
        let (input, sas_alg_bytes) = take(4usize)(input)?;
        let (input, sas_hash_bytes) = take(32usize)(input)?;

        let sig_len_words = (((filler[1] & 0x01) as u16) << 8) | sig_low[0] as u16;
        let (input, signature_bytes) = take(sig_len_words as usize * 4)(input)?;

        let mut sas_alg = [0u8; 4];
        sas_alg.copy_from_slice(sas_alg_bytes);
        let mut sas_hash = [0u8; 32];
        sas_hash.copy_from_slice(sas_hash_bytes);

        Ok((
            input,
            Self {
                sig_len_words,
                flags: flag_byte[0] & 0x0F,
                sas_alg,
                sas_hash,
                signature: signature_bytes.to_vec(),
            },
        ))
    }
}

/// The SASrelay message lets an enrolled PBX replace the SAS of a relayed
/// call leg. Same shape as Confirm: HMAC, IV, encrypted body.
#[derive(Debug, Clone)]
pub struct SasRelayPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// HMAC over the encrypted region, truncated to 8 bytes.
    pub hmac: [u8; 8],
    /// CFB initialization vector.
    pub iv: [u8; 16],
    /// The encrypted body (a [`SasRelayBody`]).
    pub encrypted: Vec<u8>,
}

impl SasRelayPacket {
    /// The message type identifier for SASrelay packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"SASrelay";

    /// Builds a SASrelay with a correct length field.
    pub fn new(iv: [u8; 16], encrypted: Vec<u8>) -> Self {
        let length = ((12 + 8 + 16 + encrypted.len()) / 4) as u16;
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, length),
            hmac: [0u8; 8],
            iv,
            encrypted,
        }
    }

    /// Parses a SASrelay message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, hmac_bytes) = take(8usize)(input)?;
        let (input, iv_bytes) = take(16usize)(input)?;

        let enc_len = (header.length as usize * 4).saturating_sub(12 + 8 + 16);
        let (input, encrypted_bytes) = take(enc_len)(input)?;

        let mut hmac = [0u8; 8];
        hmac.copy_from_slice(hmac_bytes);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(iv_bytes);

        Ok((
            input,
            Self {
                header,
                hmac,
                iv,
                encrypted: encrypted_bytes.to_vec(),
            },
        ))
    }

    /// Serializes the SASrelay message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.hmac);
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(&self.encrypted);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_body_codec() {
        let body = SasRelayBody {
            sig_len_words: 0,
            flags: 0,
            sas_alg: *b"B32 ",
            sas_hash: [0x5A; 32],
            signature: Vec::new(),
        };

        let bytes = body.to_bytes();
        assert_eq!(bytes.len(), 40);

        let (rem, parsed) = SasRelayBody::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_relay_packet_codec() {
        let relay = SasRelayPacket::new([0x10; 16], vec![0x20; 40]);
        let bytes = relay.to_bytes();
        assert_eq!(bytes.len(), relay.header.length as usize * 4);

        let (_, parsed) = SasRelayPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.encrypted, relay.encrypted);
    }
}
