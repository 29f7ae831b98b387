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

use nom::{bytes::complete::take, number::complete::be_u16, IResult};

/// The ZRTP magic cookie ("ZRTP") in the packet framing.
pub const ZRTP_MAGIC: u32 = 0x5a525450;

/// The message preamble starting every ZRTP message block.
pub const MESSAGE_PREAMBLE: u16 = 0x505a;

/// The common ZRTP message header.
///
/// Every message starts with this 12-byte block: preamble, length in
/// 32-bit words (covering the whole message, not the packet framing or
/// CRC), and the 8-character type block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    /// Must be equal to [`MESSAGE_PREAMBLE`].
    pub preamble: u16,
    /// The length of the message in 32-bit words, including this header.
    pub length: u16,
    /// The 8-character message type block (e.g., `"Hello   "`).
    pub message_type: [u8; 8],
}

impl MessageHeader {
    /// Size of the serialized header in bytes.
    pub const SIZE: usize = 12;

    /// Builds a header for the given type and total message word count.
    pub fn new(message_type: [u8; 8], length_words: u16) -> Self {
        Self {
            preamble: MESSAGE_PREAMBLE,
            length: length_words,
            message_type,
        }
    }

    /// Parses a message header from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, preamble) = be_u16(input)?;
        let (input, length) = be_u16(input)?;
        let (input, type_bytes) = take(8usize)(input)?;

        let mut message_type = [0u8; 8];
        message_type.copy_from_slice(type_bytes);

        Ok((
            input,
            Self {
                preamble,
                length,
                message_type,
            },
        ))
    }

    /// Serializes the message header into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        bytes.extend_from_slice(&self.preamble.to_be_bytes());
        bytes.extend_from_slice(&self.length.to_be_bytes());
        bytes.extend_from_slice(&self.message_type);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_codec() {
        let header = MessageHeader::new(*b"Hello   ", 22);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), MessageHeader::SIZE);

        let (rem, parsed) = MessageHeader::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed, header);
        assert_eq!(parsed.preamble, MESSAGE_PREAMBLE);
    }
}
