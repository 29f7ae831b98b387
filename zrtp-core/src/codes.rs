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

//! The severity/subcode vocabulary reported through the callback surface.
//!
//! The in-protocol error subcodes ([`ZrtpErrorCode`]) are the closed set
//! of RFC 6189 Section 5.9.1; the informational and severe codes follow
//! the GNU ZRTP convention. Inbound Error packets are reported with their
//! subcode negated to mark the remote origin.

/// Severity classes of the `send_info`/`negotiation_failed` callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    /// Progress and status reports.
    Info,
    /// Advisory conditions; the session continues.
    Warning,
    /// Fatal local conditions; the session ends without an Error packet.
    Severe,
    /// In-protocol errors carrying an RFC 6189 subcode.
    ZrtpError,
}

/// Informational codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum InfoCode {
    /// Peer Hello received and accepted.
    HelloReceived = 1,
    /// Commit prepared, DH keypair generated.
    CommitDhGenerated,
    /// Responder: peer Commit received and accepted.
    RespCommitReceived,
    /// Responder: DHPart1 prepared, DH keypair generated.
    Dh1DhGenerated,
    /// Initiator: peer DHPart1 received.
    InitDh1Received,
    /// Responder: peer DHPart2 received.
    RespDh2Received,
    /// Initiator: peer Confirm1 received.
    InitConf1Received,
    /// Responder: peer Confirm2 received.
    RespConf2Received,
    /// A retained secret matched; continuity of trust holds.
    RsMatchFound,
    /// SRTP is active in both directions.
    SecureStateOn,
    /// SRTP was switched off.
    SecureStateOff,
}

/// Advisory warning codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WarningCode {
    /// Peer offers AES-256 without a matching large key agreement.
    DhAesMismatch = 1,
    /// A GoClear request arrived.
    GoClearReceived,
    /// The negotiated DH group is weaker than the cipher.
    DhShort,
    /// No retained secret matched; SAS verification is required.
    NoRsMatch,
    /// A packet was dropped for CRC mismatch.
    CrcMismatch,
    /// SRTP authentication failed on an inbound packet.
    SrtpAuthError,
    /// SRTP replay protection dropped an inbound packet.
    SrtpReplayError,
    /// A cached rs1 existed but the peer did not offer it.
    NoExpectedRsMatch,
    /// An auxiliary secret was configured but did not match.
    NoExpectedAuxMatch,
}

/// Fatal local conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum SevereCode {
    /// Hello HMAC did not verify once H2 was revealed.
    HelloHmacFailed = 1,
    /// Commit HMAC or its hash-chain link did not verify.
    CommitHmacFailed,
    /// DHPart1 HMAC or its hash-chain link did not verify.
    Dh1HmacFailed,
    /// DHPart2 HMAC or its hash-chain link did not verify.
    Dh2HmacFailed,
    /// The host could not send a packet.
    CannotSend,
    /// Internal protocol error.
    ProtocolError,
    /// The host could not provide a timer.
    NoTimer,
    /// Too many retransmissions without an answer.
    TooMuchRetries,
}

/// The closed RFC 6189 Section 5.9.1 error subcode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ZrtpErrorCode {
    /// Malformed packet (CRC OK but contents unusable).
    MalformedPacket = 0x10,
    /// Critical software error.
    CriticalSwError = 0x20,
    /// Unsupported ZRTP version.
    UnsuppZrtpVersion = 0x30,
    /// Hello components mismatch.
    HelloCompMismatch = 0x40,
    /// Hash type not supported.
    UnsuppHashType = 0x51,
    /// Cipher type not supported.
    UnsuppCipherType = 0x52,
    /// Public key exchange not supported.
    UnsuppPkExchange = 0x53,
    /// SRTP auth tag not supported.
    UnsuppSrtpAuthTag = 0x54,
    /// SAS rendering scheme not supported.
    UnsuppSasScheme = 0x55,
    /// No shared secret available, DH mode required.
    NoSharedSecret = 0x56,
    /// DH error: bad public value (1, 0 or p-1).
    DhErrorWrongPv = 0x61,
    /// DH error: hvi does not match the hashed data.
    DhErrorWrongHvi = 0x62,
    /// Received relayed SAS from an untrusted MitM.
    SasUntrustedMitm = 0x63,
    /// Bad Confirm packet HMAC.
    ConfirmHmacWrong = 0x70,
    /// Nonce reuse.
    NonceReused = 0x80,
    /// Equal ZIDs in Hello.
    EqualZidHello = 0x90,
    /// SSRC collision.
    SsrcCollision = 0x91,
    /// Service unavailable.
    ServiceUnavailable = 0xA0,
    /// Protocol timeout error.
    ProtocolTimeout = 0xB0,
    /// GoClear received but not allowed.
    GoClearNotAllowed = 0x100,
}

impl ZrtpErrorCode {
    /// Maps a wire subcode back to the enum; unknown codes stay raw.
    pub fn from_wire(code: u32) -> Option<Self> {
        use ZrtpErrorCode::*;
        Some(match code {
            0x10 => MalformedPacket,
            0x20 => CriticalSwError,
            0x30 => UnsuppZrtpVersion,
            0x40 => HelloCompMismatch,
            0x51 => UnsuppHashType,
            0x52 => UnsuppCipherType,
            0x53 => UnsuppPkExchange,
            0x54 => UnsuppSrtpAuthTag,
            0x55 => UnsuppSasScheme,
            0x56 => NoSharedSecret,
            0x61 => DhErrorWrongPv,
            0x62 => DhErrorWrongHvi,
            0x63 => SasUntrustedMitm,
            0x70 => ConfirmHmacWrong,
            0x80 => NonceReused,
            0x90 => EqualZidHello,
            0x91 => SsrcCollision,
            0xA0 => ServiceUnavailable,
            0xB0 => ProtocolTimeout,
            0x100 => GoClearNotAllowed,
            _ => return None,
        })
    }
}

/// Enrollment progress reported to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentInfo {
    /// The peer asks to enroll as a trusted MitM.
    Request,
    /// The user declined the enrollment.
    Canceled,
    /// Enrollment failed for a technical reason.
    Failed,
    /// The trusted MitM key was stored.
    Ok,
}
