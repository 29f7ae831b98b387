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

//! The ZRTP protocol engine.
//!
//! One engine drives one media stream. All entry points take the host
//! callback as a parameter and run to completion on the session's
//! dispatch thread; the engine never owns the host and never blocks.

use crate::callback::{Direction, SrtpSecrets, ZrtpCallback};
use crate::codes::{EnrollmentInfo, InfoCode, MessageSeverity, SevereCode, WarningCode, ZrtpErrorCode};
use crate::config::ZrtpConfig;
use crate::registry::{select_profile, AlgorithmProfile, PubKeyAlgorithm, SasAlgorithm};
use crate::state::{Role, ZrtpState};
use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, Zeroizing};
use zrtp_cache::ZidCache;
use zrtp_crypto::backends::{create_cipher, create_hash, create_key_agreement, Sha256};
use zrtp_crypto::chain::verify_link;
use zrtp_crypto::kdf::{
    derive_multistream_s0, derive_preshared_s0, derive_s0, derive_session_keys, kdf_context,
    matched_secret, preshared_key, preshared_key_id, secret_id, total_hash, SessionKeys,
};
use subtle::ConstantTimeEq;
use zrtp_crypto::sas::{render_sas_base32, render_sas_words};
use zrtp_crypto::{Hash, HashChain, KeyAgreement};
use zrtp_wire::packets::confirm::{
    FLAG_ALLOW_CLEAR, FLAG_DISCLOSURE, FLAG_PBX_ENROLLMENT, FLAG_SAS_VERIFIED,
};
use zrtp_wire::packets::hello::{FLAG_MITM, FLAG_PASSIVE, FLAG_SIGNATURE};
use zrtp_wire::packets::*;
use zrtp_wire::{decode_packet, encode_packet, message_image, CodecError, Message, PacketInfo};

/// The only protocol version this engine speaks.
pub const ZRTP_VERSION: [u8; 4] = *b"1.10";

/// Retransmission profile T1: Hello, Commit, DHPart2.
const T1_BASE_MS: u32 = 50;
const T1_CAP_MS: u32 = 1200;
const T1_MAX_RETRIES: u32 = 20;

/// Retransmission profile T2: Confirm2, Error, GoClear, SASrelay.
const T2_BASE_MS: u32 = 150;
const T2_CAP_MS: u32 = 1200;
const T2_MAX_RETRIES: u32 = 10;

struct TimerState {
    current: u32,
    cap: u32,
    max_retries: u32,
    retries: u32,
}

enum TimerProfile {
    T1,
    T2,
}

/// The main protocol engine for a single stream.
pub struct ZrtpEngine {
    config: ZrtpConfig,
    cache: Box<dyn ZidCache>,
    state: ZrtpState,
    role: Option<Role>,
    zid: [u8; 12],
    seq: u16,

    /// Fixed SHA-256 for the hash chain, message HMACs and secret IDs.
    sha: Sha256,
    /// The negotiated hash, driving the key schedule.
    hash: Box<dyn Hash>,
    profile: AlgorithmProfile,
    dh: Option<Box<dyn KeyAgreement>>,
    own_public: Option<Vec<u8>>,
    chain: HashChain,

    /// ZRTPSess of the master stream when this engine runs MultiStream.
    multistream: Option<Zeroizing<Vec<u8>>>,

    own_hello_image: Vec<u8>,
    own_commit: Option<CommitPacket>,
    own_commit_image: Option<Vec<u8>>,
    own_dh1_image: Option<Vec<u8>>,
    own_dh2_image: Option<Vec<u8>>,
    own_confirm1_image: Option<Vec<u8>>,
    own_nonce: [u8; 16],

    peer_hello: Option<HelloPacket>,
    peer_hello_image: Option<Vec<u8>>,
    peer_commit: Option<CommitPacket>,
    peer_commit_image: Option<Vec<u8>>,
    peer_dh_image: Option<Vec<u8>>,
    peer_zid: Option<[u8; 12]>,
    peer_h3: Option<[u8; 32]>,
    peer_h2: Option<[u8; 32]>,
    peer_h1: Option<[u8; 32]>,
    hello_ack_received: bool,

    keys: Option<SessionKeys>,
    kdf_ctx: Option<Vec<u8>>,
    rs_matched: bool,
    sas_value: Option<String>,
    peer_expire_secs: Option<i64>,
    peer_allows_clear: bool,
    enrollment_pending: bool,
    relay_pending: bool,
    goclear_pending: bool,

    timer: Option<TimerState>,
    sent_message: Option<Vec<u8>>,
}

impl ZrtpEngine {
    /// Creates an engine for a primary (DH mode) stream.
    pub fn new(config: ZrtpConfig, cache: Box<dyn ZidCache>) -> Self {
        Self::build(config, cache, None)
    }

    /// Creates an engine for a secondary stream keyed from the master
    /// stream's session key (MultiStream mode).
    pub fn new_multistream(
        config: ZrtpConfig,
        cache: Box<dyn ZidCache>,
        master_session_key: &[u8],
    ) -> Self {
        Self::build(
            config,
            cache,
            Some(Zeroizing::new(master_session_key.to_vec())),
        )
    }

    fn build(
        config: ZrtpConfig,
        cache: Box<dyn ZidCache>,
        multistream: Option<Zeroizing<Vec<u8>>>,
    ) -> Self {
        let sha = Sha256;
        let chain = HashChain::generate(&sha);
        let zid = cache.own_zid();
        let mut own_nonce = [0u8; 16];
        OsRng.fill_bytes(&mut own_nonce);

        Self {
            config,
            cache,
            state: ZrtpState::Initial,
            role: None,
            zid,
            seq: 1,
            sha,
            hash: Box::new(Sha256),
            profile: AlgorithmProfile::mandatory(),
            dh: None,
            own_public: None,
            chain,
            multistream,
            own_hello_image: Vec::new(),
            own_commit: None,
            own_commit_image: None,
            own_dh1_image: None,
            own_dh2_image: None,
            own_confirm1_image: None,
            own_nonce,
            peer_hello: None,
            peer_hello_image: None,
            peer_commit: None,
            peer_commit_image: None,
            peer_dh_image: None,
            peer_zid: None,
            peer_h3: None,
            peer_h2: None,
            peer_h1: None,
            hello_ack_received: false,
            keys: None,
            kdf_ctx: None,
            rs_matched: false,
            sas_value: None,
            peer_expire_secs: None,
            peer_allows_clear: false,
            enrollment_pending: false,
            relay_pending: false,
            goclear_pending: false,
            timer: None,
            sent_message: None,
        }
    }

    pub fn state(&self) -> ZrtpState {
        self.state
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_secure(&self) -> bool {
        self.state == ZrtpState::Secure
    }

    /// The rendered SAS, available from the secure state on.
    pub fn sas(&self) -> Option<&str> {
        self.sas_value.as_deref()
    }

    /// ZRTPSess, for keying further streams of this association.
    pub fn session_key(&self) -> Option<&[u8]> {
        self.keys.as_ref().map(|k| k.zrtp_session.as_slice())
    }

    /// Starts the protocol: sends Hello and arms T1.
    pub fn start(&mut self, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::Initial {
            return;
        }
        let hello = self.build_hello();
        self.own_hello_image = hello.clone();
        self.send_with_timer(hello, TimerProfile::T1, host);
        self.state = ZrtpState::Detect;
    }

    /// Stops the session: cancels timers, sends Error if mid-negotiation,
    /// wipes key material.
    pub fn stop(&mut self, host: &mut dyn ZrtpCallback) {
        self.cancel_timer(host);
        match self.state {
            ZrtpState::Initial | ZrtpState::Stopped => {}
            ZrtpState::Secure | ZrtpState::Clear => {
                host.srtp_secrets_off(Direction::ForSender);
                host.srtp_secrets_off(Direction::ForReceiver);
                host.send_info(MessageSeverity::Info, InfoCode::SecureStateOff as i32);
            }
            _ => {
                let error = ErrorPacket::new(ZrtpErrorCode::ServiceUnavailable as u32);
                self.send_message(&error.to_bytes(), host);
            }
        }
        self.wipe();
        self.state = ZrtpState::Stopped;
    }

    /// Records the user's SAS comparison result in the cache.
    pub fn set_sas_verified(&mut self, verified: bool) {
        let Some(peer_zid) = self.peer_zid else {
            return;
        };
        let mut record = self.cache.get(&peer_zid);
        if verified {
            record.set_sas_verified();
        } else {
            record.reset_sas_verified();
        }
        if let Err(e) = self.cache.put(&record) {
            log::warn!("failed to persist SAS verification: {}", e);
        }
    }

    /// Answers a pending enrollment request. Acceptance derives and
    /// stores the trusted MitM key.
    pub fn accept_enrollment(&mut self, accepted: bool, host: &mut dyn ZrtpCallback) {
        if !self.enrollment_pending {
            host.inform_enrollment(EnrollmentInfo::Failed);
            return;
        }
        self.enrollment_pending = false;

        if !accepted {
            host.inform_enrollment(EnrollmentInfo::Canceled);
            return;
        }

        match self.store_mitm_key() {
            Ok(()) => host.inform_enrollment(EnrollmentInfo::Ok),
            Err(e) => {
                log::warn!("failed to persist MitM key: {}", e);
                host.inform_enrollment(EnrollmentInfo::Failed);
            }
        }
    }

    /// Derives KDF(ZRTPSess, "Trusted MitM key") and stores it in the
    /// peer's record. Both legs of an enrollment call derive the same
    /// value.
    fn store_mitm_key(&mut self) -> anyhow::Result<()> {
        let (Some(keys), Some(ctx), Some(peer_zid)) =
            (self.keys.as_ref(), self.kdf_ctx.as_ref(), self.peer_zid)
        else {
            anyhow::bail!("no active session keys");
        };

        let mut mitm = self
            .hash
            .kdf(&keys.zrtp_session, b"Trusted MitM key", ctx, 32);
        let mut key = [0u8; 32];
        key.copy_from_slice(&mitm);
        mitm.zeroize();

        let mut record = self.cache.get(&peer_zid);
        record.set_mitm_key(&key);
        key.zeroize();
        self.cache.put(&record)
    }

    /// Requests the transition to clear media. Only valid in the secure
    /// state when both sides negotiated the allow-clear flag.
    pub fn request_go_clear(&mut self, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::Secure || !self.config.allow_clear || !self.peer_allows_clear {
            log::warn!("GoClear requested but not negotiated");
            return;
        }
        let Some(mackey) = self.own_mackey() else {
            return;
        };

        let mut goclear = GoClearPacket::new();
        let mac = self.hash.hmac(&mackey, &GoClearPacket::MESSAGE_TYPE);
        goclear.clear_hmac.copy_from_slice(&mac[..8]);

        self.goclear_pending = true;
        self.send_with_timer(goclear.to_bytes(), TimerProfile::T2, host);
    }

    /// Relays the SAS hash of an upstream leg to this peer. Only a
    /// trusted MitM (PBX) may call this, after the stream is secure.
    pub fn send_sas_relay(&mut self, sas_hash: &[u8; 32], host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::Secure || !self.config.trusted_mitm {
            log::warn!("SASrelay requires a secure session on a trusted MitM");
            return;
        }
        let (Some(zrtpkey), Some(mackey)) = (self.own_zrtpkey(), self.own_mackey()) else {
            return;
        };

        let body = SasRelayBody {
            sig_len_words: 0,
            flags: 0,
            sas_alg: self.profile.sas.tag(),
            sas_hash: *sas_hash,
            signature: Vec::new(),
        };

        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        let Some(cipher) = create_cipher(&self.profile.cipher.tag()) else {
            return;
        };
        let encrypted = match cipher.encrypt(&zrtpkey, &iv, &body.to_bytes()) {
            Ok(e) => e,
            Err(e) => {
                log::error!("SASrelay encryption failed: {}", e);
                return;
            }
        };

        let mut relay = SasRelayPacket::new(iv, encrypted);
        let mac = self.hash.hmac(&mackey, &relay.encrypted);
        relay.hmac.copy_from_slice(&mac[..8]);

        self.relay_pending = true;
        self.send_with_timer(relay.to_bytes(), TimerProfile::T2, host);
    }

    /// Feeds one inbound datagram into the state machine.
    pub fn process_packet(&mut self, data: &[u8], host: &mut dyn ZrtpCallback) {
        if matches!(self.state, ZrtpState::Initial | ZrtpState::Stopped) {
            return;
        }

        let (info, message) = match decode_packet(data) {
            Ok(decoded) => decoded,
            Err(CodecError::CrcMismatch) => {
                // Line corruption: drop silently, never answer with Error.
                host.send_info(MessageSeverity::Warning, WarningCode::CrcMismatch as i32);
                return;
            }
            Err(CodecError::BadMagic) => {
                // Not ZRTP traffic at all.
                return;
            }
            Err(e) => {
                log::warn!("malformed ZRTP packet: {}", e);
                self.protocol_error(ZrtpErrorCode::MalformedPacket, host);
                return;
            }
        };

        let image = match message_image(data) {
            Ok(image) => image.to_vec(),
            Err(_) => return,
        };

        match message {
            Message::Hello(h) => self.on_hello(h, image, host),
            Message::HelloAck => self.on_hello_ack(host),
            Message::Commit(c) => self.on_commit(c, image, host),
            Message::DhPart1(p) => self.on_dh_part1(p, image, host),
            Message::DhPart2(p) => self.on_dh_part2(p, image, host),
            Message::Confirm1(c) => self.on_confirm1(c, host),
            Message::Confirm2(c) => self.on_confirm2(c, host),
            Message::Conf2Ack => self.on_conf2_ack(host),
            Message::Error(e) => self.on_error(e, host),
            Message::ErrorAck => self.on_error_ack(host),
            Message::GoClear(g) => self.on_go_clear(g, host),
            Message::ClearAck => self.on_clear_ack(host),
            Message::SasRelay(r) => self.on_sas_relay(r, host),
            Message::RelayAck => self.on_relay_ack(host),
            Message::Ping(p) => self.on_ping(p, info, host),
            Message::PingAck(_) => {}
        }
    }

    /// Timer expiry: retransmit or give up.
    pub fn process_timeout(&mut self, host: &mut dyn ZrtpCallback) {
        let Some(mut timer) = self.timer.take() else {
            return;
        };

        timer.retries += 1;
        if timer.retries > timer.max_retries {
            log::error!("retransmission retries exhausted in {:?}", self.state);
            host.send_info(MessageSeverity::Severe, SevereCode::TooMuchRetries as i32);
            host.negotiation_failed(MessageSeverity::Severe, SevereCode::TooMuchRetries as i32);
            self.wipe();
            self.state = ZrtpState::Stopped;
            return;
        }

        if let Some(message) = self.sent_message.clone() {
            self.send_message(&message, host);
        }

        timer.current = (timer.current * 2).min(timer.cap);
        host.activate_timer(timer.current);
        self.timer = Some(timer);
    }

    // --- discovery ---------------------------------------------------

    fn build_hello(&self) -> Vec<u8> {
        let mut flags = 0u8;
        if self.config.sas_sign_support {
            flags |= FLAG_SIGNATURE;
        }
        if self.config.trusted_mitm {
            flags |= FLAG_MITM;
        }
        if self.config.passive {
            flags |= FLAG_PASSIVE;
        }

        let hello = HelloPacket::new(
            ZRTP_VERSION,
            self.config.client_id,
            *self.chain.h3(),
            self.zid,
            flags,
            self.config.hashes.iter().map(|a| a.tag()).collect(),
            self.config.ciphers.iter().map(|a| a.tag()).collect(),
            self.config.auth_tags.iter().map(|a| a.tag()).collect(),
            self.config.pubkeys.iter().map(|a| a.tag()).collect(),
            self.config.sas_types.iter().map(|a| a.tag()).collect(),
        );

        // Hello HMAC is keyed by H2, revealed later in Commit.
        self.seal(hello.to_bytes(), self.chain.h2())
    }

    /// Patches the trailing 8-byte HMAC of a message image.
    fn seal(&self, mut image: Vec<u8>, key: &[u8]) -> Vec<u8> {
        let split = image.len() - 8;
        let mac = self.sha.hmac(key, &image[..split]);
        image[split..].copy_from_slice(&mac[..8]);
        image
    }

    /// Checks the trailing 8-byte HMAC of a stored message image.
    fn check_seal(&self, image: &[u8], key: &[u8]) -> bool {
        let split = image.len() - 8;
        let mac = self.sha.hmac(key, &image[..split]);
        mac[..8].ct_eq(&image[split..]).into()
    }

    fn on_hello(&mut self, hello: HelloPacket, image: Vec<u8>, host: &mut dyn ZrtpCallback) {
        if !matches!(
            self.state,
            ZrtpState::Detect | ZrtpState::AckSent | ZrtpState::AckDetected | ZrtpState::WaitCommit
        ) {
            return;
        }

        if self.peer_hello.is_none() {
            if hello.version != ZRTP_VERSION {
                log::warn!(
                    "peer offers unsupported version {:?}",
                    String::from_utf8_lossy(&hello.version)
                );
                self.protocol_error(ZrtpErrorCode::UnsuppZrtpVersion, host);
                return;
            }
            if hello.zid == self.zid {
                self.protocol_error(ZrtpErrorCode::EqualZidHello, host);
                return;
            }

            let (_, dh_aes_mismatch) = select_profile(&self.config, &hello);
            if dh_aes_mismatch {
                host.send_info(MessageSeverity::Warning, WarningCode::DhAesMismatch as i32);
            }

            self.peer_zid = Some(hello.zid);
            self.peer_h3 = Some(hello.hash_h3);
            self.peer_hello = Some(hello);
            self.peer_hello_image = Some(image);
            host.send_info(MessageSeverity::Info, InfoCode::HelloReceived as i32);
        }

        let ack = Message::HelloAck.to_bytes();
        self.send_message(&ack, host);

        match self.state {
            ZrtpState::Detect => self.state = ZrtpState::AckDetected,
            ZrtpState::AckSent => self.maybe_commit(host),
            _ => {}
        }
    }

    fn on_hello_ack(&mut self, host: &mut dyn ZrtpCallback) {
        match self.state {
            ZrtpState::Detect => {
                self.cancel_timer(host);
                self.hello_ack_received = true;
                self.state = ZrtpState::AckSent;
            }
            ZrtpState::AckDetected => {
                self.cancel_timer(host);
                self.hello_ack_received = true;
                self.maybe_commit(host);
            }
            _ => {}
        }
    }

    /// Both Hello directions are complete: commit or wait for the peer.
    fn maybe_commit(&mut self, host: &mut dyn ZrtpCallback) {
        if !self.hello_ack_received || self.peer_hello.is_none() {
            return;
        }
        if self.config.passive {
            if self
                .peer_hello
                .as_ref()
                .map(|h| h.is_passive())
                .unwrap_or(false)
            {
                // Two passive endpoints can never progress.
                host.negotiation_failed(
                    MessageSeverity::Severe,
                    SevereCode::ProtocolError as i32,
                );
                self.wipe();
                self.state = ZrtpState::Stopped;
                return;
            }
            self.state = ZrtpState::WaitCommit;
            return;
        }

        match self.prepare_commit(host) {
            Some(commit) => {
                self.role = Some(Role::Initiator);
                self.send_with_timer(commit, TimerProfile::T1, host);
                self.state = ZrtpState::CommitSent;
            }
            None => {
                // prepare_commit already reported the failure.
            }
        }
    }

    fn prepare_commit(&mut self, host: &mut dyn ZrtpCallback) -> Option<Vec<u8>> {
        let peer_hello = self.peer_hello.clone()?;
        let (profile, _) = select_profile(&self.config, &peer_hello);
        self.profile = profile;

        let Some(hash) = create_hash(&profile.hash.tag()) else {
            self.protocol_error(ZrtpErrorCode::UnsuppHashType, host);
            return None;
        };
        self.hash = hash;
        if create_cipher(&profile.cipher.tag()).is_none() {
            self.protocol_error(ZrtpErrorCode::UnsuppCipherType, host);
            return None;
        }

        let preshared_rs1 = if self.config.preshared {
            self.cached_rs1()
        } else {
            None
        };

        let params = if self.multistream.is_some() {
            self.profile.pubkey = PubKeyAlgorithm::Mult;
            CommitParams::MultiStream {
                nonce: self.own_nonce,
            }
        } else if let Some(rs1) = preshared_rs1 {
            let psk = Zeroizing::new(preshared_key(&*self.hash, &rs1));
            let key_id = preshared_key_id(&*self.hash, &psk);
            self.profile.pubkey = PubKeyAlgorithm::Prsh;
            CommitParams::PreShared {
                nonce: self.own_nonce,
                key_id,
            }
        } else {
            let Some(mut dh) = create_key_agreement(&profile.pubkey.tag()) else {
                self.protocol_error(ZrtpErrorCode::UnsuppPkExchange, host);
                return None;
            };
            let public = match dh.generate_keypair() {
                Ok(p) => p,
                Err(e) => {
                    log::error!("keypair generation failed: {}", e);
                    self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
                    return None;
                }
            };
            self.dh = Some(dh);
            self.own_public = Some(public.clone());
            host.send_info(MessageSeverity::Info, InfoCode::CommitDhGenerated as i32);

            // hvi commits to our DHPart2 before the peer sees it.
            let dh2 = self.prepare_dh_part(DhPartPacket::MESSAGE_TYPE_DH2, b"Initiator", public);
            let mut hvi_input = dh2.clone();
            hvi_input.extend_from_slice(self.peer_hello_image.as_ref()?);
            let digest = self.hash.digest(&hvi_input);
            let mut hvi = [0u8; 32];
            hvi.copy_from_slice(&digest[..32]);
            self.own_dh2_image = Some(dh2);

            CommitParams::Dh { hvi }
        };

        let commit = CommitPacket::new(
            *self.chain.h2(),
            self.zid,
            self.profile.hash.tag(),
            self.profile.cipher.tag(),
            self.profile.auth_tag.tag(),
            self.profile.pubkey.tag(),
            self.profile.sas.tag(),
            params,
        );

        // Commit HMAC is keyed by H1, revealed in DHPart2.
        let image = self.seal(commit.to_bytes(), self.chain.h1());
        self.own_commit = Some(commit);
        self.own_commit_image = Some(image.clone());
        Some(image)
    }

    fn cached_rs1(&mut self) -> Option<[u8; 32]> {
        let peer_zid = self.peer_zid?;
        let record = self.cache.get(&peer_zid);
        if record.is_rs1_valid() && record.is_rs1_not_expired() {
            Some(record.rs1)
        } else {
            None
        }
    }

    /// Builds a DHPart message image including its H0-keyed HMAC.
    fn prepare_dh_part(
        &mut self,
        message_type: [u8; 8],
        label: &[u8],
        public_value: Vec<u8>,
    ) -> Vec<u8> {
        let record = self
            .peer_zid
            .map(|zid| self.cache.get(&zid))
            .unwrap_or_else(|| zrtp_cache::ZidRecord::empty([0u8; 12]));

        let mut random_id = || {
            let mut id = [0u8; 8];
            OsRng.fill_bytes(&mut id);
            id
        };

        let rs1_id = if record.is_rs1_valid() && record.is_rs1_not_expired() {
            secret_id(&self.sha, &record.rs1, label)
        } else {
            random_id()
        };
        let rs2_id = if record.is_rs2_valid() && record.is_rs2_not_expired() {
            secret_id(&self.sha, &record.rs2, label)
        } else {
            random_id()
        };
        let aux_id = match &self.config.aux_secret {
            // The aux secret ID is keyed by the sender's own H3.
            Some(aux) => secret_id(&self.sha, aux, self.chain.h3()),
            None => random_id(),
        };
        let pbx_id = if record.is_mitm_key_available() {
            secret_id(&self.sha, &record.mitm_key, label)
        } else {
            random_id()
        };

        let packet = DhPartPacket::new(
            message_type,
            *self.chain.h1(),
            rs1_id,
            rs2_id,
            aux_id,
            pbx_id,
            public_value,
        );
        self.seal(packet.to_bytes(), self.chain.h0())
    }

    // --- commit handling ---------------------------------------------

    fn on_commit(&mut self, commit: CommitPacket, image: Vec<u8>, host: &mut dyn ZrtpCallback) {
        match self.state {
            ZrtpState::WaitCommit | ZrtpState::AckSent | ZrtpState::AckDetected => {
                self.respond_to_commit(commit, image, host);
            }
            ZrtpState::CommitSent => {
                // Contention: the numerically larger commitment wins.
                let we_win = match (&self.own_commit, &commit.params) {
                    (Some(own), peer) => Self::commit_wins(&own.params, peer),
                    (None, _) => false,
                };
                if we_win {
                    log::debug!("commit contention: we stay initiator");
                    return;
                }
                log::debug!("commit contention: switching to responder");
                self.cancel_timer(host);
                self.own_commit = None;
                self.own_commit_image = None;
                self.own_dh2_image = None;
                self.respond_to_commit(commit, image, host);
            }
            ZrtpState::WaitDhPart2 => {
                // Retransmitted Commit: our DHPart1 was lost.
                if let Some(dh1) = self.own_dh1_image.clone() {
                    self.send_message(&dh1, host);
                }
            }
            _ => {}
        }
    }

    fn commit_wins(own: &CommitParams, peer: &CommitParams) -> bool {
        match (own, peer) {
            (CommitParams::Dh { hvi: a }, CommitParams::Dh { hvi: b }) => a.as_slice() > b.as_slice(),
            (CommitParams::MultiStream { nonce: a }, CommitParams::MultiStream { nonce: b }) => {
                a.as_slice() > b.as_slice()
            }
            (CommitParams::PreShared { nonce: a, .. }, CommitParams::PreShared { nonce: b, .. }) => {
                a.as_slice() > b.as_slice()
            }
            // Mixed modes: the DH commit takes precedence.
            (CommitParams::Dh { .. }, _) => true,
            (_, CommitParams::Dh { .. }) => false,
            _ => true,
        }
    }

    fn respond_to_commit(
        &mut self,
        commit: CommitPacket,
        image: Vec<u8>,
        host: &mut dyn ZrtpCallback,
    ) {
        if Some(commit.zid) != self.peer_zid {
            log::warn!("Commit ZID does not match the Hello ZID");
            return;
        }

        let profile = match AlgorithmProfile::from_commit_tags(
            &commit.hash_alg,
            &commit.cipher_alg,
            &commit.auth_tag_alg,
            &commit.key_agreement_alg,
            &commit.sas_alg,
        ) {
            Ok(profile) => profile,
            Err(code) => {
                self.protocol_error(code, host);
                return;
            }
        };

        let Some(hash) = create_hash(&profile.hash.tag()) else {
            self.protocol_error(ZrtpErrorCode::UnsuppHashType, host);
            return;
        };
        if create_cipher(&profile.cipher.tag()).is_none() {
            self.protocol_error(ZrtpErrorCode::UnsuppCipherType, host);
            return;
        }

        // H2 continues the chain anchored by the Hello H3.
        let Some(peer_h3) = self.peer_h3 else {
            return;
        };
        if !verify_link(&self.sha, &commit.hash_h2, &peer_h3) {
            self.severe_failure(SevereCode::CommitHmacFailed, host);
            return;
        }
        // H2 also retroactively authenticates the Hello.
        if let Some(hello_image) = self.peer_hello_image.clone() {
            if !self.check_seal(&hello_image, &commit.hash_h2) {
                self.severe_failure(SevereCode::HelloHmacFailed, host);
                return;
            }
        }

        // A Commit implicitly acknowledges our Hello.
        self.cancel_timer(host);

        self.role = Some(Role::Responder);
        self.profile = profile;
        self.hash = hash;
        self.peer_h2 = Some(commit.hash_h2);
        self.peer_commit_image = Some(image.clone());
        host.send_info(MessageSeverity::Info, InfoCode::RespCommitReceived as i32);

        match commit.params.clone() {
            CommitParams::Dh { .. } => {
                self.peer_commit = Some(commit);
                let public = match (&self.dh, &self.own_public) {
                    (Some(_), Some(public)) => public.clone(),
                    _ => {
                        let Some(mut dh) = create_key_agreement(&self.profile.pubkey.tag()) else {
                            self.protocol_error(ZrtpErrorCode::UnsuppPkExchange, host);
                            return;
                        };
                        match dh.generate_keypair() {
                            Ok(public) => {
                                self.dh = Some(dh);
                                self.own_public = Some(public.clone());
                                host.send_info(
                                    MessageSeverity::Info,
                                    InfoCode::Dh1DhGenerated as i32,
                                );
                                public
                            }
                            Err(e) => {
                                log::error!("keypair generation failed: {}", e);
                                self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
                                return;
                            }
                        }
                    }
                };

                let dh1 = self.prepare_dh_part(DhPartPacket::MESSAGE_TYPE_DH1, b"Responder", public);
                self.own_dh1_image = Some(dh1.clone());
                self.send_message(&dh1, host);
                self.state = ZrtpState::WaitDhPart2;
            }
            CommitParams::MultiStream { nonce } => {
                if self.multistream.is_none() {
                    self.protocol_error(ZrtpErrorCode::NoSharedSecret, host);
                    return;
                }
                if nonce == self.own_nonce {
                    self.protocol_error(ZrtpErrorCode::NonceReused, host);
                    return;
                }
                self.peer_commit = Some(commit);
                if !self.derive_keyless_secrets(Role::Responder, host) {
                    return;
                }
                self.send_confirm1(host);
            }
            CommitParams::PreShared { nonce, key_id } => {
                if nonce == self.own_nonce {
                    self.protocol_error(ZrtpErrorCode::NonceReused, host);
                    return;
                }
                let Some(rs1) = self.cached_rs1() else {
                    self.protocol_error(ZrtpErrorCode::NoSharedSecret, host);
                    return;
                };
                let psk = Zeroizing::new(preshared_key(&*self.hash, &rs1));
                let expected = preshared_key_id(&*self.hash, &psk);
                if !bool::from(expected[..].ct_eq(&key_id[..])) {
                    self.protocol_error(ZrtpErrorCode::NoSharedSecret, host);
                    return;
                }
                self.peer_commit = Some(commit);
                if !self.derive_keyless_secrets(Role::Responder, host) {
                    return;
                }
                self.send_confirm1(host);
            }
        }
    }

    // --- DH exchange -------------------------------------------------

    fn on_dh_part1(&mut self, part: DhPartPacket, image: Vec<u8>, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::CommitSent {
            return;
        }
        if self.profile.pubkey.is_mode_marker() {
            return;
        }

        // H1 -> H2 -> H3 closes the chain back to the peer Hello.
        let h2_digest = self.sha.digest(&part.hash_h1);
        let mut peer_h2 = [0u8; 32];
        peer_h2.copy_from_slice(&h2_digest[..32]);
        let Some(peer_h3) = self.peer_h3 else {
            return;
        };
        if !verify_link(&self.sha, &peer_h2, &peer_h3) {
            self.severe_failure(SevereCode::Dh1HmacFailed, host);
            return;
        }
        if let Some(hello_image) = self.peer_hello_image.clone() {
            if !self.check_seal(&hello_image, &peer_h2) {
                self.severe_failure(SevereCode::HelloHmacFailed, host);
                return;
            }
        }

        self.cancel_timer(host);
        self.peer_h2 = Some(peer_h2);
        self.peer_h1 = Some(part.hash_h1);
        self.peer_dh_image = Some(image);
        host.send_info(MessageSeverity::Info, InfoCode::InitDh1Received as i32);

        let shared = match self.dh.as_mut() {
            Some(dh) => dh.compute_shared_secret(&part.public_value),
            None => {
                self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
                return;
            }
        };
        let dh_result = match shared {
            Ok(secret) => Zeroizing::new(secret),
            Err(e) => {
                log::warn!("DH computation rejected: {}", e);
                self.protocol_error(ZrtpErrorCode::DhErrorWrongPv, host);
                return;
            }
        };

        if !self.derive_dh_secrets(&dh_result, Role::Initiator, &part, host) {
            return;
        }

        let Some(dh2) = self.own_dh2_image.clone() else {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return;
        };
        self.send_with_timer(dh2, TimerProfile::T1, host);
        self.state = ZrtpState::WaitConfirm1;
    }

    fn on_dh_part2(&mut self, part: DhPartPacket, image: Vec<u8>, host: &mut dyn ZrtpCallback) {
        match self.state {
            ZrtpState::WaitDhPart2 => {}
            ZrtpState::WaitConfirm2 => {
                // Retransmitted DHPart2: our Confirm1 was lost.
                if let Some(conf1) = self.own_confirm1_image.clone() {
                    self.send_message(&conf1, host);
                }
                return;
            }
            _ => return,
        }

        // H1 -> H2 closes the chain back to the Commit.
        let Some(peer_h2) = self.peer_h2 else {
            return;
        };
        if !verify_link(&self.sha, &part.hash_h1, &peer_h2) {
            self.severe_failure(SevereCode::Dh2HmacFailed, host);
            return;
        }
        // H1 retroactively authenticates the Commit.
        if let Some(commit_image) = self.peer_commit_image.clone() {
            if !self.check_seal(&commit_image, &part.hash_h1) {
                self.severe_failure(SevereCode::CommitHmacFailed, host);
                return;
            }
        }

        // hvi binds this DHPart2 to the Commit we answered.
        if self.own_hello_image.is_empty() {
            return;
        }
        let mut hvi_input = image.clone();
        hvi_input.extend_from_slice(&self.own_hello_image);
        let hvi_digest = self.hash.digest(&hvi_input);
        let committed_hvi = match self.peer_commit.as_ref().map(|c| &c.params) {
            Some(CommitParams::Dh { hvi }) => *hvi,
            _ => return,
        };
        if !bool::from(hvi_digest[..32].ct_eq(&committed_hvi[..])) {
            self.protocol_error(ZrtpErrorCode::DhErrorWrongHvi, host);
            return;
        }

        self.peer_h1 = Some(part.hash_h1);
        self.peer_dh_image = Some(image);
        host.send_info(MessageSeverity::Info, InfoCode::RespDh2Received as i32);

        let shared = match self.dh.as_mut() {
            Some(dh) => dh.compute_shared_secret(&part.public_value),
            None => {
                self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
                return;
            }
        };
        let dh_result = match shared {
            Ok(secret) => Zeroizing::new(secret),
            Err(e) => {
                log::warn!("DH computation rejected: {}", e);
                self.protocol_error(ZrtpErrorCode::DhErrorWrongPv, host);
                return;
            }
        };

        if !self.derive_dh_secrets(&dh_result, Role::Responder, &part, host) {
            return;
        }
        self.send_confirm1(host);
    }

    // --- key schedule ------------------------------------------------

    /// Runs the DH-mode key schedule and installs the session keys.
    fn derive_dh_secrets(
        &mut self,
        dh_result: &[u8],
        role: Role,
        peer_part: &DhPartPacket,
        host: &mut dyn ZrtpCallback,
    ) -> bool {
        let Some(peer_zid) = self.peer_zid else {
            return false;
        };

        let (zid_i, zid_r) = match role {
            Role::Initiator => (self.zid, peer_zid),
            Role::Responder => (peer_zid, self.zid),
        };

        // total_hash = H(Hello-R || Commit || DHPart1 || DHPart2), with
        // ours and the peer's images slotted in by role.
        let (hello_r, commit, dh1, dh2) = match role {
            Role::Initiator => (
                self.peer_hello_image.clone(),
                self.own_commit_image.clone(),
                self.peer_dh_image.clone(),
                self.own_dh2_image.clone(),
            ),
            Role::Responder => (
                Some(self.own_hello_image.clone()),
                self.peer_commit_image.clone(),
                self.own_dh1_image.clone(),
                self.peer_dh_image.clone(),
            ),
        };
        let (Some(hello_r), Some(commit), Some(dh1), Some(dh2)) = (hello_r, commit, dh1, dh2)
        else {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return false;
        };

        let th = total_hash(
            &*self.hash,
            &[
                hello_r.as_slice(),
                commit.as_slice(),
                dh1.as_slice(),
                dh2.as_slice(),
            ],
        );
        let ctx = kdf_context(&zid_i, &zid_r, &th);

        let (s1, s2, s3) = self.match_retained(role, peer_part, host);
        self.rs_matched = s1.is_some();
        if self.rs_matched {
            host.send_info(MessageSeverity::Info, InfoCode::RsMatchFound as i32);
        } else {
            host.send_info(MessageSeverity::Warning, WarningCode::NoRsMatch as i32);
        }

        let mut s0 = derive_s0(
            &*self.hash,
            dh_result,
            &zid_i,
            &zid_r,
            &th,
            s1.as_ref().map(|s| &s[..]),
            s2.as_ref().map(|s| &s[..]),
            s3.as_ref().map(|s| &s[..]),
        );
        let keys = derive_session_keys(&*self.hash, &s0, &ctx, self.profile.cipher.key_len());
        s0.zeroize();

        self.keys = Some(keys);
        self.kdf_ctx = Some(ctx);
        true
    }

    /// Matches the peer's retained-secret IDs against the cache and
    /// returns the s1/s2/s3 contributions.
    fn match_retained(
        &mut self,
        role: Role,
        peer_part: &DhPartPacket,
        host: &mut dyn ZrtpCallback,
    ) -> (
        Option<Zeroizing<Vec<u8>>>,
        Option<Zeroizing<Vec<u8>>>,
        Option<Zeroizing<Vec<u8>>>,
    ) {
        let peer_label: &[u8] = match role {
            Role::Initiator => b"Responder",
            Role::Responder => b"Initiator",
        };
        let record = match self.peer_zid {
            Some(zid) => self.cache.get(&zid),
            None => return (None, None, None),
        };

        let rs1_usable = record.is_rs1_valid() && record.is_rs1_not_expired();
        let rs2_usable = record.is_rs2_valid() && record.is_rs2_not_expired();

        // Try both peer ID slots against both cached slots; the first
        // match fixes s1.
        let mut s1 = None;
        for peer_id in [&peer_part.rs1_id, &peer_part.rs2_id] {
            if s1.is_some() {
                break;
            }
            if rs1_usable
                && bool::from(peer_id[..].ct_eq(&secret_id(&self.sha, &record.rs1, peer_label)[..]))
            {
                s1 = Some(Zeroizing::new(matched_secret(&self.sha, &record.rs1)));
            } else if rs2_usable
                && bool::from(peer_id[..].ct_eq(&secret_id(&self.sha, &record.rs2, peer_label)[..]))
            {
                s1 = Some(Zeroizing::new(matched_secret(&self.sha, &record.rs2)));
            }
        }
        if s1.is_none() && rs1_usable {
            host.send_info(
                MessageSeverity::Warning,
                WarningCode::NoExpectedRsMatch as i32,
            );
        }

        let s2 = match (&self.config.aux_secret, self.peer_h3) {
            (Some(aux), Some(peer_h3)) => {
                let expected = secret_id(&self.sha, aux, &peer_h3);
                if bool::from(peer_part.aux_secret_id[..].ct_eq(&expected[..])) {
                    Some(Zeroizing::new(matched_secret(&self.sha, aux)))
                } else {
                    host.send_info(
                        MessageSeverity::Warning,
                        WarningCode::NoExpectedAuxMatch as i32,
                    );
                    None
                }
            }
            _ => None,
        };

        let s3 = if record.is_mitm_key_available() {
            let expected = secret_id(&self.sha, &record.mitm_key, peer_label);
            if bool::from(peer_part.pbx_secret_id[..].ct_eq(&expected[..])) {
                Some(Zeroizing::new(matched_secret(&self.sha, &record.mitm_key)))
            } else {
                None
            }
        } else {
            None
        };

        (s1, s2, s3)
    }

    /// Key schedule for the keyless modes (MultiStream, PreShared):
    /// total hash covers Hello-R and Commit only.
    fn derive_keyless_secrets(&mut self, role: Role, host: &mut dyn ZrtpCallback) -> bool {
        let Some(peer_zid) = self.peer_zid else {
            return false;
        };
        let (zid_i, zid_r) = match role {
            Role::Initiator => (self.zid, peer_zid),
            Role::Responder => (peer_zid, self.zid),
        };
        let (hello_r, commit) = match role {
            Role::Initiator => (self.peer_hello_image.clone(), self.own_commit_image.clone()),
            Role::Responder => (
                Some(self.own_hello_image.clone()),
                self.peer_commit_image.clone(),
            ),
        };
        let (Some(hello_r), Some(commit)) = (hello_r, commit) else {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return false;
        };

        let th = total_hash(&*self.hash, &[hello_r.as_slice(), commit.as_slice()]);
        let ctx = kdf_context(&zid_i, &zid_r, &th);

        let mut s0 = match self.profile.pubkey {
            PubKeyAlgorithm::Mult => {
                let Some(master) = self.multistream.as_ref() else {
                    self.protocol_error(ZrtpErrorCode::NoSharedSecret, host);
                    return false;
                };
                derive_multistream_s0(&*self.hash, master, &ctx)
            }
            PubKeyAlgorithm::Prsh => {
                let Some(rs1) = self.cached_rs1() else {
                    self.protocol_error(ZrtpErrorCode::NoSharedSecret, host);
                    return false;
                };
                let psk = Zeroizing::new(preshared_key(&*self.hash, &rs1));
                self.rs_matched = true;
                derive_preshared_s0(&*self.hash, &psk, &ctx)
            }
            _ => {
                self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
                return false;
            }
        };

        let keys = derive_session_keys(&*self.hash, &s0, &ctx, self.profile.cipher.key_len());
        s0.zeroize();

        self.keys = Some(keys);
        self.kdf_ctx = Some(ctx);
        true
    }

    // --- confirm exchange --------------------------------------------

    fn confirm_flags(&mut self) -> u8 {
        let mut flags = 0u8;
        if let Some(zid) = self.peer_zid {
            if self.cache.get(&zid).is_sas_verified() && !self.config.paranoid {
                flags |= FLAG_SAS_VERIFIED;
            }
        }
        if self.config.allow_clear {
            flags |= FLAG_ALLOW_CLEAR;
        }
        if self.config.disclosure {
            flags |= FLAG_DISCLOSURE;
        }
        if self.config.trusted_mitm && self.config.enrollment {
            flags |= FLAG_PBX_ENROLLMENT;
        }
        flags
    }

    fn expire_interval(&self) -> u32 {
        match self.config.rs_expire_secs {
            -1 => u32::MAX,
            secs if secs <= 0 => 0,
            secs => secs.min(u32::MAX as i64) as u32,
        }
    }

    /// The rs1 lifetime both sides agreed on: the minimum of the local
    /// setting and the interval the peer's Confirm carried, where `-1`
    /// (unbounded) loses against any finite value.
    fn negotiated_expire_secs(&self) -> i64 {
        let local = self.config.rs_expire_secs;
        match self.peer_expire_secs {
            None | Some(-1) => local,
            Some(peer) if local == -1 => peer,
            Some(peer) => local.min(peer),
        }
    }

    /// Builds a Confirm message image, encrypted and authenticated with
    /// the keys of the given sender role.
    fn build_confirm(&mut self, message_type: [u8; 8], sender: Role) -> Option<Vec<u8>> {
        let flags = self.confirm_flags();
        let expire_interval = self.expire_interval();
        let keys = self.keys.as_ref()?;
        let (zrtpkey, mackey) = match sender {
            Role::Initiator => (&keys.zrtpkey_i, &keys.mackey_i),
            Role::Responder => (&keys.zrtpkey_r, &keys.mackey_r),
        };

        let body = ConfirmBody {
            hash_h0: *self.chain.h0(),
            sig_len_words: 0,
            flags,
            expire_interval,
            signature: Vec::new(),
        };

        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);
        let cipher = create_cipher(&self.profile.cipher.tag())?;
        let encrypted = match cipher.encrypt(zrtpkey, &iv, &body.to_bytes()) {
            Ok(e) => e,
            Err(e) => {
                log::error!("Confirm encryption failed: {}", e);
                return None;
            }
        };

        let mut confirm = ConfirmPacket::new(message_type, iv, encrypted);
        let mac = self.hash.hmac(mackey, &confirm.encrypted);
        confirm.hmac.copy_from_slice(&mac[..8]);
        Some(confirm.to_bytes())
    }

    /// Verifies and decrypts an inbound Confirm from the given sender
    /// role.
    fn open_confirm(&self, confirm: &ConfirmPacket, sender: Role) -> Result<ConfirmBody, ZrtpErrorCode> {
        let keys = self.keys.as_ref().ok_or(ZrtpErrorCode::CriticalSwError)?;
        let (zrtpkey, mackey) = match sender {
            Role::Initiator => (&keys.zrtpkey_i, &keys.mackey_i),
            Role::Responder => (&keys.zrtpkey_r, &keys.mackey_r),
        };

        let mac = self.hash.hmac(mackey, &confirm.encrypted);
        if !bool::from(mac[..8].ct_eq(&confirm.hmac[..])) {
            return Err(ZrtpErrorCode::ConfirmHmacWrong);
        }

        let cipher =
            create_cipher(&self.profile.cipher.tag()).ok_or(ZrtpErrorCode::UnsuppCipherType)?;
        let plain = cipher
            .decrypt(zrtpkey, &confirm.iv, &confirm.encrypted)
            .map_err(|_| ZrtpErrorCode::CriticalSwError)?;

        match ConfirmBody::parse(&plain) {
            Ok((_, body)) => Ok(body),
            Err(_) => Err(ZrtpErrorCode::MalformedPacket),
        }
    }

    /// Walks the revealed H0 up the chain to the nearest element of the
    /// peer's chain we already hold: H1 after DHPart, H2 after Commit,
    /// H3 after Hello only (keyless responder side).
    fn verify_h0_chain(&self, h0: &[u8; 32]) -> bool {
        let mut current = *h0;
        for expected in [self.peer_h1, self.peer_h2, self.peer_h3] {
            if let Some(expected) = expected {
                return verify_link(&self.sha, &current, &expected);
            }
            let digest = self.sha.digest(&current);
            current.copy_from_slice(&digest[..32]);
        }
        false
    }

    fn send_confirm1(&mut self, host: &mut dyn ZrtpCallback) {
        match self.build_confirm(ConfirmPacket::MESSAGE_TYPE_CONF1, Role::Responder) {
            Some(conf1) => {
                self.own_confirm1_image = Some(conf1.clone());
                self.send_message(&conf1, host);
                self.state = ZrtpState::WaitConfirm2;
            }
            None => self.protocol_error(ZrtpErrorCode::CriticalSwError, host),
        }
    }

    fn on_confirm1(&mut self, confirm: ConfirmPacket, host: &mut dyn ZrtpCallback) {
        match self.state {
            ZrtpState::WaitConfirm1 => {}
            // Keyless modes: the responder answers our Commit with
            // Confirm1 directly.
            ZrtpState::CommitSent if self.profile.pubkey.is_mode_marker() => {
                if !self.derive_keyless_secrets(Role::Initiator, host) {
                    return;
                }
            }
            _ => return,
        }

        let body = match self.open_confirm(&confirm, Role::Responder) {
            Ok(body) => body,
            Err(code) => {
                self.protocol_error(code, host);
                return;
            }
        };

        if !self.verify_h0_chain(&body.hash_h0) {
            self.severe_failure(SevereCode::Dh1HmacFailed, host);
            return;
        }
        // H0 retroactively authenticates DHPart1.
        if let Some(dh1_image) = self.peer_dh_image.clone() {
            if !self.check_seal(&dh1_image, &body.hash_h0) {
                self.severe_failure(SevereCode::Dh1HmacFailed, host);
                return;
            }
        }

        self.process_peer_confirm_flags(&body, host);
        host.send_info(MessageSeverity::Info, InfoCode::InitConf1Received as i32);
        self.cancel_timer(host);

        let Some(conf2) = self.build_confirm(ConfirmPacket::MESSAGE_TYPE_CONF2, Role::Initiator)
        else {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return;
        };
        self.send_with_timer(conf2, TimerProfile::T2, host);

        if !self.activate_srtp(host) {
            return;
        }
        self.state = ZrtpState::WaitConf2Ack;
    }

    fn on_confirm2(&mut self, confirm: ConfirmPacket, host: &mut dyn ZrtpCallback) {
        match self.state {
            ZrtpState::WaitConfirm2 => {}
            ZrtpState::Secure => {
                // Retransmitted Confirm2: our Conf2ACK was lost.
                let ack = Message::Conf2Ack.to_bytes();
                self.send_message(&ack, host);
                return;
            }
            _ => return,
        }

        let body = match self.open_confirm(&confirm, Role::Initiator) {
            Ok(body) => body,
            Err(code) => {
                self.protocol_error(code, host);
                return;
            }
        };

        if !self.verify_h0_chain(&body.hash_h0) {
            self.severe_failure(SevereCode::Dh2HmacFailed, host);
            return;
        }
        // H0 retroactively authenticates DHPart2.
        if let Some(dh2_image) = self.peer_dh_image.clone() {
            if !self.check_seal(&dh2_image, &body.hash_h0) {
                self.severe_failure(SevereCode::Dh2HmacFailed, host);
                return;
            }
        }

        self.process_peer_confirm_flags(&body, host);
        host.send_info(MessageSeverity::Info, InfoCode::RespConf2Received as i32);

        let ack = Message::Conf2Ack.to_bytes();
        self.send_message(&ack, host);

        if !self.activate_srtp(host) {
            return;
        }
        self.finalize_secure(host);
    }

    fn on_conf2_ack(&mut self, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::WaitConf2Ack {
            return;
        }
        self.cancel_timer(host);
        self.finalize_secure(host);
    }

    fn process_peer_confirm_flags(&mut self, body: &ConfirmBody, host: &mut dyn ZrtpCallback) {
        self.peer_allows_clear = body.flags & FLAG_ALLOW_CLEAR != 0;

        // The peer's cache expiration joins ours at rs1 install time;
        // 0xffffffff means unbounded.
        self.peer_expire_secs = Some(match body.expire_interval {
            u32::MAX => -1,
            secs => secs as i64,
        });

        // A cleared V flag invalidates our cached verification state.
        if body.flags & FLAG_SAS_VERIFIED == 0 {
            if let Some(zid) = self.peer_zid {
                let mut record = self.cache.get(&zid);
                if record.is_sas_verified() {
                    record.reset_sas_verified();
                    let _ = self.cache.put(&record);
                }
            }
        }

        if body.flags & FLAG_PBX_ENROLLMENT != 0 {
            self.enrollment_pending = true;
            host.ask_enrollment(EnrollmentInfo::Request);
        }
    }

    fn activate_srtp(&mut self, host: &mut dyn ZrtpCallback) -> bool {
        let Some(keys) = self.keys.as_ref() else {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return false;
        };
        let Some(role) = self.role else {
            return false;
        };

        let secrets = SrtpSecrets {
            cipher: self.profile.cipher,
            auth_tag: self.profile.auth_tag,
            key_i: keys.srtpkey_i.clone(),
            salt_i: keys.srtpsalt_i.clone(),
            key_r: keys.srtpkey_r.clone(),
            salt_r: keys.srtpsalt_r.clone(),
            role,
        };

        if !host.srtp_secrets_ready(&secrets, Direction::ForSender)
            || !host.srtp_secrets_ready(&secrets, Direction::ForReceiver)
        {
            self.protocol_error(ZrtpErrorCode::CriticalSwError, host);
            return false;
        }
        true
    }

    /// Confirm exchange complete: persist the new rs1, render the SAS,
    /// report the secure state.
    fn finalize_secure(&mut self, host: &mut dyn ZrtpCallback) {
        let mut verified = false;

        if let (Some(peer_zid), Some(keys)) = (self.peer_zid, self.keys.as_ref()) {
            if self.multistream.is_none() {
                let mut new_rs1 = [0u8; 32];
                new_rs1.copy_from_slice(&keys.new_rs1);

                let mut record = self.cache.get(&peer_zid);
                record.set_new_rs1(&new_rs1, self.negotiated_expire_secs());
                new_rs1.zeroize();
                if let Err(e) = self.cache.put(&record) {
                    log::warn!("failed to persist retained secret: {}", e);
                }
                verified = record.is_sas_verified();
            } else {
                // MultiStream inherits the master stream's cache entry.
                verified = self.cache.get(&peer_zid).is_sas_verified();
            }
        }

        // The PBX keeps its half of the enrollment key it offered; the
        // phone stores its half only after the user accepts.
        if self.config.trusted_mitm && self.config.enrollment && self.multistream.is_none() {
            if let Err(e) = self.store_mitm_key() {
                log::warn!("failed to persist MitM key: {}", e);
            }
        }

        if let Some(keys) = self.keys.as_ref() {
            let sas = match self.profile.sas {
                SasAlgorithm::B32 | SasAlgorithm::B32E => render_sas_base32(&keys.sashash),
                SasAlgorithm::B256 | SasAlgorithm::B256E => render_sas_words(&keys.sashash),
            };
            if self.config.sas_sign_support {
                host.sign_sas(&keys.sashash);
            }
            let report_verified = verified && !self.config.paranoid && self.rs_matched;
            host.sas_present(&sas, report_verified);
            self.sas_value = Some(sas);
        }

        self.state = ZrtpState::Secure;
        host.send_info(MessageSeverity::Info, InfoCode::SecureStateOn as i32);
    }

    // --- secure-state messages ---------------------------------------

    fn peer_mackey(&self) -> Option<Vec<u8>> {
        let keys = self.keys.as_ref()?;
        match self.role? {
            Role::Initiator => Some(keys.mackey_r.clone()),
            Role::Responder => Some(keys.mackey_i.clone()),
        }
    }

    fn peer_zrtpkey(&self) -> Option<Vec<u8>> {
        let keys = self.keys.as_ref()?;
        match self.role? {
            Role::Initiator => Some(keys.zrtpkey_r.clone()),
            Role::Responder => Some(keys.zrtpkey_i.clone()),
        }
    }

    fn own_mackey(&self) -> Option<Vec<u8>> {
        let keys = self.keys.as_ref()?;
        match self.role? {
            Role::Initiator => Some(keys.mackey_i.clone()),
            Role::Responder => Some(keys.mackey_r.clone()),
        }
    }

    fn own_zrtpkey(&self) -> Option<Vec<u8>> {
        let keys = self.keys.as_ref()?;
        match self.role? {
            Role::Initiator => Some(keys.zrtpkey_i.clone()),
            Role::Responder => Some(keys.zrtpkey_r.clone()),
        }
    }

    fn on_go_clear(&mut self, goclear: GoClearPacket, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::Secure {
            return;
        }
        if !self.config.allow_clear {
            self.protocol_error(ZrtpErrorCode::GoClearNotAllowed, host);
            return;
        }
        let Some(mackey) = self.peer_mackey() else {
            return;
        };
        let mac = self.hash.hmac(&mackey, &GoClearPacket::MESSAGE_TYPE);
        if !bool::from(mac[..8].ct_eq(&goclear.clear_hmac[..])) {
            log::warn!("GoClear with bad HMAC dropped");
            return;
        }

        host.send_info(MessageSeverity::Warning, WarningCode::GoClearReceived as i32);
        let ack = Message::ClearAck.to_bytes();
        self.send_message(&ack, host);

        host.srtp_secrets_off(Direction::ForSender);
        host.srtp_secrets_off(Direction::ForReceiver);
        host.send_info(MessageSeverity::Info, InfoCode::SecureStateOff as i32);
        self.state = ZrtpState::Clear;
    }

    fn on_clear_ack(&mut self, host: &mut dyn ZrtpCallback) {
        if !self.goclear_pending || self.state != ZrtpState::Secure {
            return;
        }
        self.goclear_pending = false;
        self.cancel_timer(host);

        host.srtp_secrets_off(Direction::ForSender);
        host.srtp_secrets_off(Direction::ForReceiver);
        host.send_info(MessageSeverity::Info, InfoCode::SecureStateOff as i32);
        self.state = ZrtpState::Clear;
    }

    fn on_sas_relay(&mut self, relay: SasRelayPacket, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::Secure {
            return;
        }

        let enrolled = self
            .peer_zid
            .map(|zid| self.cache.get(&zid).is_mitm_key_available())
            .unwrap_or(false);
        if !enrolled {
            // Report the untrusted relay but keep the media running.
            host.send_info(
                MessageSeverity::ZrtpError,
                ZrtpErrorCode::SasUntrustedMitm as i32,
            );
            let error = ErrorPacket::new(ZrtpErrorCode::SasUntrustedMitm as u32);
            self.send_message(&error.to_bytes(), host);
            return;
        }

        let (Some(mackey), Some(zrtpkey)) = (self.peer_mackey(), self.peer_zrtpkey()) else {
            return;
        };
        let mac = self.hash.hmac(&mackey, &relay.encrypted);
        if !bool::from(mac[..8].ct_eq(&relay.hmac[..])) {
            log::warn!("SASrelay with bad HMAC dropped");
            return;
        }

        let Some(cipher) = create_cipher(&self.profile.cipher.tag()) else {
            return;
        };
        let Ok(plain) = cipher.decrypt(&zrtpkey, &relay.iv, &relay.encrypted) else {
            return;
        };
        let Ok((_, body)) = SasRelayBody::parse(&plain) else {
            return;
        };

        // The relayed SAS replaces the locally derived one, unverified.
        let sas = match SasAlgorithm::from_tag(&body.sas_alg) {
            Some(SasAlgorithm::B256) | Some(SasAlgorithm::B256E) => {
                render_sas_words(&body.sas_hash)
            }
            _ => render_sas_base32(&body.sas_hash),
        };
        host.sas_present(&sas, false);
        self.sas_value = Some(sas);

        let ack = Message::RelayAck.to_bytes();
        self.send_message(&ack, host);
    }

    fn on_relay_ack(&mut self, host: &mut dyn ZrtpCallback) {
        if self.relay_pending {
            self.relay_pending = false;
            self.cancel_timer(host);
        }
    }

    fn on_ping(&mut self, ping: PingPacket, info: PacketInfo, host: &mut dyn ZrtpCallback) {
        let digest = self.sha.digest(&self.zid);
        let mut sender_hash = [0u8; 8];
        sender_hash.copy_from_slice(&digest[..8]);

        let ack = PingAckPacket::new(ZRTP_VERSION, sender_hash, ping.endpoint_hash, info.ssrc);
        self.send_message(&ack.to_bytes(), host);
    }

    // --- error handling ----------------------------------------------

    fn on_error(&mut self, error: ErrorPacket, host: &mut dyn ZrtpCallback) {
        let ack = Message::ErrorAck.to_bytes();
        self.send_message(&ack, host);

        if matches!(self.state, ZrtpState::Secure | ZrtpState::Clear) {
            host.srtp_secrets_off(Direction::ForSender);
            host.srtp_secrets_off(Direction::ForReceiver);
        }

        // Inbound subcodes are reported negated.
        host.negotiation_failed(MessageSeverity::ZrtpError, -(error.error_code as i32));
        self.cancel_timer(host);
        self.wipe();
        self.state = ZrtpState::Stopped;
    }

    fn on_error_ack(&mut self, host: &mut dyn ZrtpCallback) {
        if self.state != ZrtpState::WaitErrorAck {
            return;
        }
        self.cancel_timer(host);
        self.wipe();
        self.state = ZrtpState::Stopped;
    }

    /// In-protocol fatal error: send Error with the subcode and await
    /// the acknowledgement.
    fn protocol_error(&mut self, code: ZrtpErrorCode, host: &mut dyn ZrtpCallback) {
        if matches!(self.state, ZrtpState::WaitErrorAck | ZrtpState::Stopped) {
            return;
        }
        host.send_info(MessageSeverity::ZrtpError, code as i32);
        host.negotiation_failed(MessageSeverity::ZrtpError, code as i32);

        let error = ErrorPacket::new(code as u32);
        self.wipe();
        self.send_with_timer(error.to_bytes(), TimerProfile::T2, host);
        self.state = ZrtpState::WaitErrorAck;
    }

    /// Local fatal condition (bad HMAC, chain break): report and stop
    /// without answering the attacker-controllable packet.
    fn severe_failure(&mut self, code: SevereCode, host: &mut dyn ZrtpCallback) {
        host.send_info(MessageSeverity::Severe, code as i32);
        host.negotiation_failed(MessageSeverity::Severe, code as i32);
        self.cancel_timer(host);
        self.wipe();
        self.state = ZrtpState::Stopped;
    }

    /// Drops all key material. [`SessionKeys`] and the chain wipe
    /// themselves on drop.
    fn wipe(&mut self) {
        self.keys = None;
        self.kdf_ctx = None;
        self.dh = None;
        self.own_public = None;
        self.multistream = None;
    }

    // --- transport helpers -------------------------------------------

    fn send_message(&mut self, message: &[u8], host: &mut dyn ZrtpCallback) -> bool {
        let packet = encode_packet(self.seq, self.config.ssrc, message);
        self.seq = self.seq.wrapping_add(1);
        if !host.send_data(&packet) {
            host.send_info(MessageSeverity::Severe, SevereCode::CannotSend as i32);
            return false;
        }
        true
    }

    fn send_with_timer(
        &mut self,
        message: Vec<u8>,
        profile: TimerProfile,
        host: &mut dyn ZrtpCallback,
    ) {
        self.send_message(&message, host);
        self.sent_message = Some(message);
        self.arm_timer(profile, host);
    }

    fn arm_timer(&mut self, profile: TimerProfile, host: &mut dyn ZrtpCallback) {
        if self.timer.is_some() {
            host.cancel_timer();
        }
        let (base, cap, max_retries) = match profile {
            TimerProfile::T1 => (T1_BASE_MS, T1_CAP_MS, T1_MAX_RETRIES),
            TimerProfile::T2 => (T2_BASE_MS, T2_CAP_MS, T2_MAX_RETRIES),
        };
        if host.activate_timer(base) < 0 {
            host.send_info(MessageSeverity::Severe, SevereCode::NoTimer as i32);
            self.timer = None;
            return;
        }
        self.timer = Some(TimerState {
            current: base,
            cap,
            max_retries,
            retries: 0,
        });
    }

    fn cancel_timer(&mut self, host: &mut dyn ZrtpCallback) {
        if self.timer.take().is_some() {
            host.cancel_timer();
        }
        self.sent_message = None;
    }
}
