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

/// The GoClear message requests the transition back to clear media.
///
/// Defined in RFC 6189 Section 5.11. The HMAC is keyed by the sender's
/// negotiated HMAC key, so the receiver can tell it from an injected
/// request.
#[derive(Debug, Clone)]
pub struct GoClearPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// HMAC authenticating the GoClear request.
    pub clear_hmac: [u8; 8],
}

impl GoClearPacket {
    /// The message type identifier for GoClear packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"GoClear ";

    /// Builds a GoClear; the HMAC is filled in by the engine.
    pub fn new() -> Self {
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, 5),
            clear_hmac: [0u8; 8],
        }
    }

    /// Parses a GoClear message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, clear_hmac_bytes) = take(8usize)(input)?;
        let mut clear_hmac = [0u8; 8];
        clear_hmac.copy_from_slice(clear_hmac_bytes);
        Ok((input, Self { header, clear_hmac }))
    }

    /// Serializes the GoClear message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.clear_hmac);
        bytes
    }
}

impl Default for GoClearPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// The Error message reports a fatal protocol condition.
///
/// Defined in RFC 6189 Section 5.9; the subcode set in Section 5.9.1 is
/// closed.
#[derive(Debug, Clone)]
pub struct ErrorPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// The error subcode.
    pub error_code: u32,
}

impl ErrorPacket {
    /// The message type identifier for Error packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Error   ";

    /// Builds an Error for the given subcode.
    pub fn new(error_code: u32) -> Self {
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, 4),
            error_code,
        }
    }

    /// Parses an Error message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, error_code) = be_u32(input)?;
        Ok((input, Self { header, error_code }))
    }

    /// Serializes the Error message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.error_code.to_be_bytes());
        bytes
    }
}

/// The Ping message probes a ZRTP endpoint (RFC 6189 Section 5.15).
#[derive(Debug, Clone)]
pub struct PingPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// The ZRTP protocol version.
    pub version: [u8; 4],
    /// The sender's endpoint hash.
    pub endpoint_hash: [u8; 8],
}

impl PingPacket {
    /// The message type identifier for Ping packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"Ping    ";

    /// Builds a Ping.
    pub fn new(version: [u8; 4], endpoint_hash: [u8; 8]) -> Self {
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, 6),
            version,
            endpoint_hash,
        }
    }

    /// Parses a Ping message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, version_bytes) = take(4usize)(input)?;
        let (input, hash_bytes) = take(8usize)(input)?;

        let mut version = [0u8; 4];
        version.copy_from_slice(version_bytes);
        let mut endpoint_hash = [0u8; 8];
        endpoint_hash.copy_from_slice(hash_bytes);

        Ok((
            input,
            Self {
                header,
                version,
                endpoint_hash,
            },
        ))
    }

    /// Serializes the Ping message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.endpoint_hash);
        bytes
    }
}

/// The PingACK message answers a Ping, echoing the pinger's endpoint
/// hash and SSRC (RFC 6189 Section 5.16).
#[derive(Debug, Clone)]
pub struct PingAckPacket {
    /// Common message header.
    pub header: MessageHeader,
    /// The ZRTP protocol version.
    pub version: [u8; 4],
    /// The responder's endpoint hash.
    pub sender_hash: [u8; 8],
    /// The endpoint hash copied from the received Ping.
    pub received_hash: [u8; 8],
    /// The SSRC copied from the received Ping packet framing.
    pub received_ssrc: u32,
}

impl PingAckPacket {
    /// The message type identifier for PingACK packets.
    pub const MESSAGE_TYPE: [u8; 8] = *b"PingACK ";

    /// Builds a PingACK.
    pub fn new(
        version: [u8; 4],
        sender_hash: [u8; 8],
        received_hash: [u8; 8],
        received_ssrc: u32,
    ) -> Self {
        Self {
            header: MessageHeader::new(Self::MESSAGE_TYPE, 9),
            version,
            sender_hash,
            received_hash,
            received_ssrc,
        }
    }

    /// Parses a PingACK message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        let (input, version_bytes) = take(4usize)(input)?;
        let (input, sender_bytes) = take(8usize)(input)?;
        let (input, received_bytes) = take(8usize)(input)?;
        let (input, received_ssrc) = be_u32(input)?;

        let mut version = [0u8; 4];
        version.copy_from_slice(version_bytes);
        let mut sender_hash = [0u8; 8];
        sender_hash.copy_from_slice(sender_bytes);
        let mut received_hash = [0u8; 8];
        received_hash.copy_from_slice(received_bytes);

        Ok((
            input,
            Self {
                header,
                version,
                sender_hash,
                received_hash,
                received_ssrc,
            },
        ))
    }

    /// Serializes the PingACK message into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header.to_bytes();
        bytes.extend_from_slice(&self.version);
        bytes.extend_from_slice(&self.sender_hash);
        bytes.extend_from_slice(&self.received_hash);
        bytes.extend_from_slice(&self.received_ssrc.to_be_bytes());
        bytes
    }
}

/// The bare acknowledgement messages: HelloACK, Conf2ACK, ErrorACK,
/// ClearACK and RelayACK carry only the message header.
#[derive(Debug, Clone)]
pub struct AckPacket {
    /// Common message header.
    pub header: MessageHeader,
}

impl AckPacket {
    /// The message type identifier for HelloACK packets.
    pub const MESSAGE_TYPE_HELLO_ACK: [u8; 8] = *b"HelloACK";
    /// The message type identifier for Conf2ACK packets.
    pub const MESSAGE_TYPE_CONF2_ACK: [u8; 8] = *b"Conf2ACK";
    /// The message type identifier for ErrorACK packets.
    pub const MESSAGE_TYPE_ERROR_ACK: [u8; 8] = *b"ErrorACK";
    /// The message type identifier for ClearACK packets.
    pub const MESSAGE_TYPE_CLEAR_ACK: [u8; 8] = *b"ClearACK";
    /// The message type identifier for RelayACK packets.
    pub const MESSAGE_TYPE_RELAY_ACK: [u8; 8] = *b"RelayACK";

    /// Builds an acknowledgement of the given type.
    pub fn new(message_type: [u8; 8]) -> Self {
        Self {
            header: MessageHeader::new(message_type, 3),
        }
    }

    /// Parses an acknowledgement message from the given input bytes.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, header) = MessageHeader::parse(input)?;
        Ok((input, Self { header }))
    }

    /// Serializes the acknowledgement into its byte representation.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.header.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goclear_codec() {
        let mut goclear = GoClearPacket::new();
        goclear.clear_hmac = [0xEE; 8];

        let bytes = goclear.to_bytes();
        assert_eq!(bytes.len(), 5 * 4);

        let (rem, parsed) = GoClearPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.clear_hmac, goclear.clear_hmac);
    }

    #[test]
    fn test_error_codec() {
        let error = ErrorPacket::new(0x52);
        let bytes = error.to_bytes();
        assert_eq!(bytes.len(), 4 * 4);

        let (_, parsed) = ErrorPacket::parse(&bytes).unwrap();
        assert_eq!(parsed.error_code, 0x52);
    }

    #[test]
    fn test_ping_pong_codec() {
        let ping = PingPacket::new(*b"1.10", [0x01; 8]);
        let (_, parsed) = PingPacket::parse(&ping.to_bytes()).unwrap();
        assert_eq!(parsed.endpoint_hash, ping.endpoint_hash);

        let ack = PingAckPacket::new(*b"1.10", [0x02; 8], parsed.endpoint_hash, 0xdeadbeef);
        let (_, parsed) = PingAckPacket::parse(&ack.to_bytes()).unwrap();
        assert_eq!(parsed.received_hash, [0x01; 8]);
        assert_eq!(parsed.received_ssrc, 0xdeadbeef);
    }

    #[test]
    fn test_ack_codec() {
        let ack = AckPacket::new(AckPacket::MESSAGE_TYPE_HELLO_ACK);
        let bytes = ack.to_bytes();
        assert_eq!(bytes.len(), 12);

        let (rem, parsed) = AckPacket::parse(&bytes).unwrap();
        assert!(rem.is_empty());
        assert_eq!(parsed.header.message_type, AckPacket::MESSAGE_TYPE_HELLO_ACK);
    }
}
