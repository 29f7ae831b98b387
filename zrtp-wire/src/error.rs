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

use thiserror::Error;

/// Reasons a packet fails to decode.
///
/// A packet is accepted only when the marker, magic cookie, alignment,
/// length field and CRC all validate. `HmacMismatch` is produced by the
/// protocol engine when a retroactive message HMAC check fails, never by
/// `decode_packet` itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Packet marker, magic cookie or message preamble mismatch.
    #[error("bad packet marker or magic cookie")]
    BadMagic,
    /// Length field inconsistent with the actual packet size.
    #[error("length field does not match packet size")]
    BadLength,
    /// Packet size is not a multiple of four bytes.
    #[error("packet is not 32-bit aligned")]
    Unaligned,
    /// Trailing CRC-32 does not match the packet content.
    #[error("CRC-32 mismatch")]
    CrcMismatch,
    /// Message type block is not one of the RFC 6189 types.
    #[error("unknown message type")]
    UnknownType([u8; 8]),
    /// Message body is shorter than its type requires.
    #[error("truncated message body")]
    TruncatedBody,
    /// Message HMAC did not verify once its key was revealed.
    #[error("message HMAC mismatch")]
    HmacMismatch,
}
