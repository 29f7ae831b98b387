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

//! Packet framing: the non-RTP marker, sequence number, magic cookie,
//! SSRC and the trailing CRC-32 around a single ZRTP message.

use crate::error::CodecError;
use crate::packets::*;

/// First two octets of every ZRTP packet, distinguishing it from RTP.
pub const PACKET_MARKER: [u8; 2] = [0x10, 0x00];

/// Packet framing size before the message: marker + sequence + magic +
/// SSRC.
pub const FRAME_LEN: usize = 12;

/// Size of the trailing CRC-32.
pub const CRC_LEN: usize = 4;

/// Framing fields of a received packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    /// Sequence number from the packet framing.
    pub seq: u16,
    /// Source identifier from the packet framing.
    pub ssrc: u32,
}

/// A decoded ZRTP message of any type.
#[derive(Debug, Clone)]
pub enum Message {
    Hello(HelloPacket),
    HelloAck,
    Commit(CommitPacket),
    DhPart1(DhPartPacket),
    DhPart2(DhPartPacket),
    Confirm1(ConfirmPacket),
    Confirm2(ConfirmPacket),
    Conf2Ack,
    Error(ErrorPacket),
    ErrorAck,
    GoClear(GoClearPacket),
    ClearAck,
    SasRelay(SasRelayPacket),
    RelayAck,
    Ping(PingPacket),
    PingAck(PingAckPacket),
}

impl Message {
    /// Serializes the message block (header through body, no framing).
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Message::Hello(p) => p.to_bytes(),
            Message::HelloAck => AckPacket::new(AckPacket::MESSAGE_TYPE_HELLO_ACK).to_bytes(),
            Message::Commit(p) => p.to_bytes(),
            Message::DhPart1(p) | Message::DhPart2(p) => p.to_bytes(),
            Message::Confirm1(p) | Message::Confirm2(p) => p.to_bytes(),
            Message::Conf2Ack => AckPacket::new(AckPacket::MESSAGE_TYPE_CONF2_ACK).to_bytes(),
            Message::Error(p) => p.to_bytes(),
            Message::ErrorAck => AckPacket::new(AckPacket::MESSAGE_TYPE_ERROR_ACK).to_bytes(),
            Message::GoClear(p) => p.to_bytes(),
            Message::ClearAck => AckPacket::new(AckPacket::MESSAGE_TYPE_CLEAR_ACK).to_bytes(),
            Message::SasRelay(p) => p.to_bytes(),
            Message::RelayAck => AckPacket::new(AckPacket::MESSAGE_TYPE_RELAY_ACK).to_bytes(),
            Message::Ping(p) => p.to_bytes(),
            Message::PingAck(p) => p.to_bytes(),
        }
    }
}

/// Wraps a serialized message into a full packet: framing in front,
/// CRC-32 behind.
pub fn encode_packet(seq: u16, ssrc: u32, message: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(FRAME_LEN + message.len() + CRC_LEN);
    packet.extend_from_slice(&PACKET_MARKER);
    packet.extend_from_slice(&seq.to_be_bytes());
    packet.extend_from_slice(&ZRTP_MAGIC.to_be_bytes());
    packet.extend_from_slice(&ssrc.to_be_bytes());
    packet.extend_from_slice(message);

    let crc = crc32fast::hash(&packet);
    packet.extend_from_slice(&crc.to_be_bytes());
    packet
}

/// Returns the raw message block of a framed packet. The engine retains
/// these images until the matching HMAC key is revealed.
pub fn message_image(packet: &[u8]) -> Result<&[u8], CodecError> {
    if packet.len() < FRAME_LEN + MessageHeader::SIZE + CRC_LEN {
        return Err(CodecError::BadLength);
    }
    Ok(&packet[FRAME_LEN..packet.len() - CRC_LEN])
}

/// Validates the framing of a full packet and decodes the message.
///
/// Checks, in order: marker and magic cookie, length and alignment,
/// CRC-32, message preamble and length field, message type, body shape.
/// A CRC failure means line corruption; callers drop the packet silently
/// per RFC 6189.
pub fn decode_packet(packet: &[u8]) -> Result<(PacketInfo, Message), CodecError> {
    // Anything without the marker and cookie is not ZRTP traffic; the
    // remaining checks only judge packets that claim to be ZRTP.
    if packet.len() < FRAME_LEN || packet[0..2] != PACKET_MARKER {
        return Err(CodecError::BadMagic);
    }
    let magic = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
    if magic != ZRTP_MAGIC {
        return Err(CodecError::BadMagic);
    }

    if packet.len() < FRAME_LEN + MessageHeader::SIZE + CRC_LEN {
        return Err(CodecError::BadLength);
    }
    if packet.len() % 4 != 0 {
        return Err(CodecError::Unaligned);
    }

    let seq = u16::from_be_bytes([packet[2], packet[3]]);
    let ssrc = u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]);

    let crc_offset = packet.len() - CRC_LEN;
    let crc_received = u32::from_be_bytes([
        packet[crc_offset],
        packet[crc_offset + 1],
        packet[crc_offset + 2],
        packet[crc_offset + 3],
    ]);
    if crc32fast::hash(&packet[..crc_offset]) != crc_received {
        return Err(CodecError::CrcMismatch);
    }

    let message = &packet[FRAME_LEN..crc_offset];
    let info = PacketInfo { seq, ssrc };
    Ok((info, parse_message(message)?))
}

/// Parses a message block that has already been unframed and CRC-checked.
pub fn parse_message(message: &[u8]) -> Result<Message, CodecError> {
    let (_, header) = MessageHeader::parse(message).map_err(|_| CodecError::TruncatedBody)?;
    if header.preamble != MESSAGE_PREAMBLE {
        return Err(CodecError::BadMagic);
    }
    if header.length as usize * 4 != message.len() {
        return Err(CodecError::BadLength);
    }

    fn body<T>(r: Result<(&[u8], T), nom::Err<nom::error::Error<&[u8]>>>) -> Result<T, CodecError> {
        match r {
            Ok((rest, value)) if rest.is_empty() => Ok(value),
            Ok(_) => Err(CodecError::BadLength),
            Err(_) => Err(CodecError::TruncatedBody),
        }
    }

    match &header.message_type {
        b"Hello   " => Ok(Message::Hello(body(HelloPacket::parse(message))?)),
        b"HelloACK" => Ok(Message::HelloAck),
        b"Commit  " => Ok(Message::Commit(body(CommitPacket::parse(message))?)),
        b"DHPart1 " => Ok(Message::DhPart1(body(DhPartPacket::parse(message))?)),
        b"DHPart2 " => Ok(Message::DhPart2(body(DhPartPacket::parse(message))?)),
        b"Confirm1" => Ok(Message::Confirm1(body(ConfirmPacket::parse(message))?)),
        b"Confirm2" => Ok(Message::Confirm2(body(ConfirmPacket::parse(message))?)),
        b"Conf2ACK" => Ok(Message::Conf2Ack),
        b"Error   " => Ok(Message::Error(body(ErrorPacket::parse(message))?)),
        b"ErrorACK" => Ok(Message::ErrorAck),
        b"GoClear " => Ok(Message::GoClear(body(GoClearPacket::parse(message))?)),
        b"ClearACK" => Ok(Message::ClearAck),
        b"SASrelay" => Ok(Message::SasRelay(body(SasRelayPacket::parse(message))?)),
        b"RelayACK" => Ok(Message::RelayAck),
        b"Ping    " => Ok(Message::Ping(body(PingPacket::parse(message))?)),
        b"PingACK " => Ok(Message::PingAck(body(PingAckPacket::parse(message))?)),
        other => Err(CodecError::UnknownType(*other)),
    }
}
