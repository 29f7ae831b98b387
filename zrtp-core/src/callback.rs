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

use crate::codes::{EnrollmentInfo, MessageSeverity};
use crate::registry::{AuthTagAlgorithm, CipherAlgorithm};
use crate::state::Role;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Which media direction an SRTP activation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Our outbound stream.
    ForSender,
    /// The peer's inbound stream.
    ForReceiver,
}

/// The key material handed to the SRTP layer once Confirm succeeds.
///
/// Wiped on drop; the host must import the keys during
/// `srtp_secrets_ready` and not retain the reference.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SrtpSecrets {
    /// Negotiated SRTP cipher.
    #[zeroize(skip)]
    pub cipher: CipherAlgorithm,
    /// Negotiated SRTP authentication tag.
    #[zeroize(skip)]
    pub auth_tag: AuthTagAlgorithm,
    /// Master key for the initiator-to-responder stream.
    pub key_i: Vec<u8>,
    /// Master salt for the initiator-to-responder stream.
    pub salt_i: Vec<u8>,
    /// Master key for the responder-to-initiator stream.
    pub key_r: Vec<u8>,
    /// Master salt for the responder-to-initiator stream.
    pub salt_r: Vec<u8>,
    /// Our role, telling the host which half is outbound.
    #[zeroize(skip)]
    pub role: Role,
}

/// The narrow outbound interface the host implements.
///
/// The engine holds no reference to the host; every entry point takes it
/// as a parameter, so the host owns the engine and not the other way
/// around. All methods are invoked on the session's dispatch thread.
pub trait ZrtpCallback {
    /// Sends one datagram, best effort. Returns false when the transport
    /// is gone.
    fn send_data(&mut self, data: &[u8]) -> bool;

    /// Arms the single session timer for `ms` milliseconds. Returns a
    /// negative value when no timer can be provided.
    fn activate_timer(&mut self, ms: u32) -> i32;

    /// Cancels the session timer.
    fn cancel_timer(&mut self) -> i32;

    /// Status reports: severity plus a code from [`crate::codes`].
    fn send_info(&mut self, severity: MessageSeverity, code: i32);

    /// The negotiation failed; the session is over.
    fn negotiation_failed(&mut self, severity: MessageSeverity, code: i32);

    /// Hands over SRTP keys for one direction. Returning false aborts
    /// the session.
    fn srtp_secrets_ready(&mut self, secrets: &SrtpSecrets, direction: Direction) -> bool;

    /// Tears down SRTP for one direction.
    fn srtp_secrets_off(&mut self, direction: Direction);

    /// Presents the SAS for user comparison, with the cached verified
    /// state.
    fn sas_present(&mut self, sas: &str, verified: bool);

    /// Asks the host to sign the SAS hash (optional).
    fn sign_sas(&mut self, _sas_hash: &[u8]) {}

    /// Asks the host to verify a peer's SAS signature (optional).
    fn check_sas_signature(&mut self, _sas_hash: &[u8]) -> bool {
        false
    }

    /// A trusted MitM asks to enroll; answer via
    /// [`crate::ZrtpEngine::accept_enrollment`].
    fn ask_enrollment(&mut self, _info: EnrollmentInfo) {}

    /// Reports the enrollment outcome.
    fn inform_enrollment(&mut self, _info: EnrollmentInfo) {}
}
