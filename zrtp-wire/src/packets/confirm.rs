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
use nom::{bytes::complete::take, number::complete::be_u32, IResult};

/// PBX enrollment flag (E) in the Confirm flag byte.
pub const FLAG_PBX_ENROLLMENT: u8 = 0x08;
/// SAS verified flag (V).
pub const FLAG_SAS_VERIFIED: u8 = 0x04;
/// Allow clear (GoClear permitted) flag (A).
pub const FLAG_ALLOW_CLEAR: u8 = 0x02;
/// Disclosure indication flag (D).
pub const FLAG_DISCLOSURE: u8 = 0x01;

/// The plaintext carried inside the encrypted part of a Confirm message.
///
/// H0 plus the signature length, flag byte, cache expiration interval and
/// an optional signature block (RFC 6189 Section 5.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmBody {
    /// H0, the root of the hash pre-image chain.
    pub hash_h0: [u8; 32],
    /// Signature length in words (9 bits on the wire).
    pub sig_len_words: u16,
    /// E/V/A/D flag bits.
    pub flags: u8,
    /// Cache expiration interval in seconds; 0xffffffff means unbounded.
    pub expire_interval: u32,
    /// Optional signature block, `sig_len_words * 4` bytes.
    pub signature: Vec<u8>,
}

impl ConfirmBody {
    /// Serializes the plaintext body (the unit the cipher operates on).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(40 + self.signature.len());
        bytes.extend_from_slice(&self.hash_h0);
        bytes.push(0);
        bytes.push(((self.sig_len_words >> 8) & 0x01) as u8);
        bytes.push((self.sig_len_words & 0xFF) as u8);
        bytes.push(self.flags & 0x0F);
        bytes.extend_from_slice(&self.expire_interval.to_be_bytes());
        bytes.extend_from_slice(&self.signature);
        bytes
    }

    /// Parses a decrypted body.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, hash_h0_bytes) = take(32usize)(input)?;
        let (input, filler) = take(2usize)(input)?;
        let (input, sig_low) = take(1usize)(input)?;
        let (input, flag_byte) = take(1usize)(input)?;
        let (input, expire_interval) = be_u32(input)?;

        let sig_len_words = (((filler[1] & 0x01) as u16) << 8) | sig_low[0] as u16;
        let (input, signature_bytes) = take(sig_len_words as usize * 4)(input)?;

        let mut hash_h0 = [0u8; 32];
        hash_h0.copy_from_slice(hash_h0_bytes);

        Ok((
            input,
            Self {
                hash_h0,
                sig_len_words,
                flags: flag_byte[0] & 0x0F,
                expire_interval,
                signature: signature_bytes.to_vec(),
            },
        ))
    }
}

/// The Confirm message finishes the handshake: an HMAC, the CFB IV and
/// the encrypted body.
///
/// Defined in RFC 6189 Section 5.7. The HMAC covers the encrypted region
/// and is keyed by the sender's negotiated HMAC key, so unlike the
/// discovery messages it is checked immediately on receipt.
#[derive(Debug, Clone)]
pub struct ConfirmPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// HMAC over the encrypted region, truncated to 8 bytes.
    pub hmac: [u8; 8],
    /// CFB initialization vector.
    pub iv: [u8; 16],
    /// The encrypted body (a [`ConfirmBody`] under the sender's ZRTP key).
    pub encrypted: Vec<u8>,
}

impl ConfirmPacket {
    /// The message type identifier for Confirm1 packets.
    pub const MESSAGE_TYPE_CONF1: [u8; 8] = *b"Confirm1";
    /// The message type identifier for Confirm2 packets.
    pub const MESSAGE_TYPE_CONF2: [u8; 8] = *b"Confirm2";

    /// Builds a Confirm with a correct length field.
    pub fn new(message_type: [u8; 8], iv: [u8; 16], encrypted: Vec<u8>) -> Self {
        let length = ((12 + 8 + 16 + encrypted.len()) / 4) as u16;
        Self {
            header: MessageHeader::new(message_type, length),
            hmac: [0u8; 8],
            iv,
            encrypted,
        }
    }

    /// Parses a Confirm message from the given input bytes. The size of
    /// the encrypted region follows from the header length field.
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

    /// Serializes the Confirm message into its byte representation.
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
    fn test_body_codec() {
        let body = ConfirmBody {
            hash_h0: [0xDD; 32],
            sig_len_words: 0,
            flags: FLAG_SAS_VERIFIED | FLAG_ALLOW_CLEAR,
            expire_interval: 0xFFFF_FFFF,
            signature: Vec::new(),
        };

        let bytes = body.to_bytes();
        assert_eq!(bytes.len(), 40);

        let (rem, parsed) = ConfirmBody::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_body_with_signature() {
        let body = ConfirmBody {
            hash_h0: [0x01; 32],
            sig_len_words: 3,
            flags: 0,
            expire_interval: 3600,
            signature: vec![0xEE; 12],
        };

        let bytes = body.to_bytes();
        let (_, parsed) = ConfirmBody::parse(&bytes).unwrap();
        assert_eq!(parsed.signature.len(), 12);
        assert_eq!(parsed.expire_interval, 3600);
    }

    #[test]
    fn test_confirm_codec() {
        let confirm = ConfirmPacket::new(
            ConfirmPacket::MESSAGE_TYPE_CONF1,
            [0xCC; 16],
            vec![0xAB; 40],
        );

        let bytes = confirm.to_bytes();
        assert_eq!(bytes.len(), 19 * 4);

        let (rem, parsed) = ConfirmPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.iv, confirm.iv);
        assert_eq!(parsed.encrypted, confirm.encrypted);
    }
}
