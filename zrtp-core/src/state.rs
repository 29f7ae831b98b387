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

/// The protocol states of RFC 6189 Section 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZrtpState {
    /// Before `start()`.
    Initial,
    /// Hello sent, discovering the peer.
    Detect,
    /// Peer Hello seen and acknowledged; our Hello not yet acked.
    AckDetected,
    /// Our Hello was acknowledged; peer Hello not yet seen.
    AckSent,
    /// Discovery complete, waiting for the peer's Commit.
    WaitCommit,
    /// Commit sent, expecting DHPart1 (or contention).
    CommitSent,
    /// Responder waiting for DHPart2.
    WaitDhPart2,
    /// Initiator waiting for Confirm1.
    WaitConfirm1,
    /// Responder waiting for Confirm2.
    WaitConfirm2,
    /// Initiator waiting for Conf2ACK.
    WaitConf2Ack,
    /// Keys agreed, SRTP active.
    Secure,
    /// Dropped back to clear media after GoClear.
    Clear,
    /// Error sent, waiting for ErrorACK.
    WaitErrorAck,
    /// Terminal state; all key material wiped.
    Stopped,
}

/// The endpoint's role once Commit contention is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sent the winning Commit; drives the DH exchange.
    Initiator,
    /// Answers the DH exchange.
    Responder,
}
