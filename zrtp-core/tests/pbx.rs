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

mod common;

use common::{pump, TestHost};
use zrtp_core::{EnrollmentInfo, InfoCode, MessageSeverity, ZrtpConfig, ZrtpEngine, ZrtpState};

fn pbx_config() -> ZrtpConfig {
    let mut config = ZrtpConfig::default();
    config.trusted_mitm = true;
    config.enrollment = true;
    config
}

/// Enrollment flow: the PBX sets the E flag in Confirm, the phone asks
/// the user, acceptance stores the trusted MitM key.
#[test]
fn test_pbx_enrollment_and_sas_relay() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pbx = ZrtpEngine::new(
        pbx_config(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x0A; 12])),
    );
    let mut phone = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x0B; 12])),
    );
    let mut pbx_host = TestHost::new();
    let mut phone_host = TestHost::new();

    pbx.start(&mut pbx_host);
    phone.start(&mut phone_host);
    pump(&mut pbx, &mut pbx_host, &mut phone, &mut phone_host);

    assert_eq!(pbx.state(), ZrtpState::Secure);
    assert_eq!(phone.state(), ZrtpState::Secure);
    assert_eq!(phone_host.enrollment_requests, 1);

    phone.accept_enrollment(true, &mut phone_host);
    assert_eq!(phone_host.enrollment_results, vec![EnrollmentInfo::Ok]);

    // The enrolled PBX may now replace the SAS on a relayed leg.
    let relayed_hash = [0x5C; 32];
    pbx.send_sas_relay(&relayed_hash, &mut pbx_host);
    pump(&mut pbx, &mut pbx_host, &mut phone, &mut phone_host);

    let (sas, verified) = phone_host.sas.clone().expect("no relayed SAS presented");
    assert!(!verified);
    assert_eq!(sas, zrtp_crypto::sas::render_sas_base32(&relayed_hash));
    assert!(pbx_host.timer_balanced());
}

/// A SASrelay from a peer that never enrolled must be answered with the
/// untrusted-MitM error and must not replace the SAS.
#[test]
fn test_sas_relay_from_untrusted_mitm_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut pbx = ZrtpEngine::new(
        pbx_config(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x0A; 12])),
    );
    let mut phone = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x0B; 12])),
    );
    let mut pbx_host = TestHost::new();
    let mut phone_host = TestHost::new();

    pbx.start(&mut pbx_host);
    phone.start(&mut phone_host);
    pump(&mut pbx, &mut pbx_host, &mut phone, &mut phone_host);

    // The user never accepted the enrollment.
    let original_sas = phone_host.sas.clone().unwrap().0;

    pbx.send_sas_relay(&[0x5C; 32], &mut pbx_host);
    let relay_packet = pbx_host.sent.drain(..).last().unwrap();
    phone.process_packet(&relay_packet, &mut phone_host);

    assert_eq!(phone_host.sas.as_ref().unwrap().0, original_sas);
    assert!(phone_host.has_info(
        MessageSeverity::ZrtpError,
        zrtp_core::ZrtpErrorCode::SasUntrustedMitm as i32
    ));
    // The session itself stays up.
    assert_eq!(phone.state(), ZrtpState::Secure);
}

/// GoClear negotiated on both sides: the receiver confirms, both drop
/// their SRTP contexts.
#[test]
fn test_go_clear_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut config = ZrtpConfig::default();
    config.allow_clear = true;

    let mut alice = ZrtpEngine::new(
        config.clone(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x01; 12])),
    );
    let mut bob = ZrtpEngine::new(
        config,
        Box::new(zrtp_cache::MemoryCache::with_zid([0x02; 12])),
    );
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);
    pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);
    assert_eq!(alice.state(), ZrtpState::Secure);

    alice.request_go_clear(&mut alice_host);
    pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);

    assert_eq!(alice.state(), ZrtpState::Clear);
    assert_eq!(bob.state(), ZrtpState::Clear);
    assert_eq!(alice_host.srtp_off, 2);
    assert_eq!(bob_host.srtp_off, 2);
    assert!(bob_host.has_info(
        MessageSeverity::Warning,
        zrtp_core::WarningCode::GoClearReceived as i32
    ));
    assert!(alice_host.has_info(MessageSeverity::Info, InfoCode::SecureStateOff as i32));
}
