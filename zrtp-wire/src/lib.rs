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

//! ZRTP wire codec.
//!
//! Serializes and parses the RFC 6189 packet format: the non-RTP marker,
//! sequence number, magic cookie and SSRC framing, the 4-byte-word
//! message bodies, and the trailing CRC-32. Per-message HMACs are *not*
//! verified here; their keys are revealed only by later messages, so the
//! protocol engine keeps the raw message images and checks them
//! retroactively.

pub mod error;
pub mod message;
pub mod packets;

pub use error::CodecError;
pub use message::{decode_packet, encode_packet, message_image, Message, PacketInfo};
