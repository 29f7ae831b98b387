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

/// The DHPart messages exchange the Diffie-Hellman public values and the
/// retained-secret IDs.
///
/// Defined in RFC 6189 Sections 5.5 (DHPart1) and 5.6 (DHPart2). The
/// trailing HMAC is keyed by H0, revealed inside the encrypted Confirm.
#[derive(Debug, Clone)]
pub struct DhPartPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// H1, revealing the key of the previously received Commit HMAC.
    pub hash_h1: [u8; 32],
    /// rs1 ID: HMAC(rs1, role label) truncated to 8 bytes.
    pub rs1_id: [u8; 8],
    /// rs2 ID.
    pub rs2_id: [u8; 8],
    /// Auxiliary secret ID, keyed by the sender's H3.
    pub aux_secret_id: [u8; 8],
    /// PBX (trusted MitM) secret ID.
    pub pbx_secret_id: [u8; 8],
    /// The DH public value.
    pub public_value: Vec<u8>,
    /// HMAC over the message, keyed by H0.
    pub hmac: [u8; 8],
}

impl DhPartPacket {
    /// The message type identifier for DHPart1 packets.
    pub const MESSAGE_TYPE_DH1: [u8; 8] = *b"DHPart1 ";
    /// The message type identifier for DHPart2 packets.
    pub const MESSAGE_TYPE_DH2: [u8; 8] = *b"DHPart2 ";

    /// Fixed byte count besides the public value: header, H1, four IDs
    /// and the HMAC.
    const FIXED_LEN: usize = 12 + 32 + 4 * 8 + 8;

    /// Builds a DHPart1 or DHPart2 with a correct length field.
    pub fn new(
        message_type: [u8; 8],
        hash_h1: [u8; 32],
        rs1_id: [u8; 8],
        rs2_id: [u8; 8],
        aux_secret_id: [u8; 8],
        pbx_secret_id: [u8; 8],
        public_value: Vec<u8>,
    ) -> Self {
        let length = ((Self::FIXED_LEN + public_value.len()) / 4) as u16;
        Self {
            header: MessageHeader::new(message_type, length),
            hash_h1,
            rs1_id,
            rs2_id,
            aux_secret_id,
            pbx_secret_id,
            public_value,
            hmac: [0u8; 8],
        }
    }

    /// Parses a DHPart message from the given input bytes. The public
    /// value length follows from the header length field.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, hash_h1_bytes) = take(32usize)(input)?;
        let (input, rs1_id_bytes) = take(8usize)(input)?;
        let (input, rs2_id_bytes) = take(8usize)(input)?;
        let (input, aux_secret_id_bytes) = take(8usize)(input)?;
        let (input, pbx_secret_id_bytes) = take(8usize)(input)?;

        let pv_len = (header.length as usize * 4).saturating_sub(Self::FIXED_LEN);
        let (input, public_value_bytes) = take(pv_len)(input)?;
        let (input, hmac_bytes) = take(8usize)(input)?;

        let mut hash_h1 = [0u8; 32];
        hash_h1.copy_from_slice(hash_h1_bytes);
        let mut rs1_id = [0u8; 8];
        rs1_id.copy_from_slice(rs1_id_bytes);
        let mut rs2_id = [0u8; 8];
        rs2_id.copy_from_slice(rs2_id_bytes);
        let mut aux_secret_id = [0u8; 8];
        aux_secret_id.copy_from_slice(aux_secret_id_bytes);
        let mut pbx_secret_id = [0u8; 8];
        pbx_secret_id.copy_from_slice(pbx_secret_id_bytes);
        let mut hmac = [0u8; 8];
        hmac.copy_from_slice(hmac_bytes);

        Ok((
            input,
            Self {
                header,
                hash_h1,
                rs1_id,
                rs2_id,
                aux_secret_id,
                pbx_secret_id,
                public_value: public_value_bytes.to_vec(),
                hmac,
            },
        ))
    }

    /// Serializes the DHPart message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.hash_h1);
        bytes.extend_from_slice(&self.rs1_id);
        bytes.extend_from_slice(&self.rs2_id);
        bytes.extend_from_slice(&self.aux_secret_id);
        bytes.extend_from_slice(&self.pbx_secret_id);
        bytes.extend_from_slice(&self.public_value);
        bytes.extend_from_slice(&self.hmac);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dh_part_codec() {
        let dh = DhPartPacket::new(
            DhPartPacket::MESSAGE_TYPE_DH1,
            [0x66; 32],
            [0x77; 8],
            [0x88; 8],
            [0x99; 8],
            [0xAA; 8],
            vec![0xBB; 32],
        );

        let bytes = dh.to_bytes();
        assert_eq!(bytes.len(), dh.header.length as usize * 4);

        let (rem, parsed) = DhPartPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.hash_h1, dh.hash_h1);
        assert_eq!(parsed.public_value, dh.public_value);
        assert_eq!(parsed.rs1_id, dh.rs1_id);
    }
}
