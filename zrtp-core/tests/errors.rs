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

use common::{fire_timer, TestHost};
use zrtp_core::{
    MessageSeverity, SevereCode, WarningCode, ZrtpConfig, ZrtpEngine, ZrtpErrorCode, ZrtpState,
};
use zrtp_wire::Message;

fn new_engine(zid: [u8; 12]) -> ZrtpEngine {
    ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::MemoryCache::with_zid(zid)),
    )
}

/// Rewrites a captured packet's message image and re-frames it with a
/// fresh CRC.
fn tamper(packet: &[u8], patch: impl FnOnce(&mut [u8])) -> Vec<u8> {
    let mut image = zrtp_wire::message_image(packet).unwrap().to_vec();
    patch(&mut image);
    zrtp_wire::encode_packet(0x7fff, 0xcafe, &image)
}

fn sent_error_code(host: &mut TestHost) -> Option<u32> {
    let packets: Vec<Vec<u8>> = host.sent.drain(..).collect();
    for packet in packets {
        if let Ok((_, Message::Error(error))) = zrtp_wire::decode_packet(&packet) {
            return Some(error.error_code);
        }
    }
    None
}

#[test]
fn test_version_downgrade_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x01; 12]);
    let mut bob = new_engine([0x02; 12]);
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);

    // Rewrite Bob's Hello to claim an unknown version.
    let bob_hello = bob_host.sent.pop_front().unwrap();
    let forged = tamper(&bob_hello, |image| {
        image[12..16].copy_from_slice(b"1.20");
    });

    alice.process_packet(&forged, &mut alice_host);

    assert_eq!(alice.state(), ZrtpState::WaitErrorAck);
    assert_eq!(
        sent_error_code(&mut alice_host),
        Some(ZrtpErrorCode::UnsuppZrtpVersion as u32)
    );
    assert!(alice_host
        .failures
        .iter()
        .any(|&(_, c)| c == ZrtpErrorCode::UnsuppZrtpVersion as i32));
}

#[test]
fn test_crc_corruption_dropped_silently() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x01; 12]);
    let mut bob = new_engine([0x02; 12]);
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);

    let mut bob_hello = bob_host.sent.pop_front().unwrap();
    let flip = bob_hello.len() / 2;
    bob_hello[flip] ^= 0x01;

    alice.process_packet(&bob_hello, &mut alice_host);

    // Dropped without an Error packet, state unchanged.
    assert_eq!(alice.state(), ZrtpState::Detect);
    assert!(alice_host.sent.iter().all(|p| {
        !matches!(zrtp_wire::decode_packet(p), Ok((_, Message::Error(_))))
    }));
    assert!(alice_host.has_info(MessageSeverity::Warning, WarningCode::CrcMismatch as i32));
}

#[test]
fn test_equal_zid_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x03; 12]);
    let mut mirror = new_engine([0x03; 12]);
    let mut alice_host = TestHost::new();
    let mut mirror_host = TestHost::new();

    alice.start(&mut alice_host);
    mirror.start(&mut mirror_host);

    let mirrored_hello = mirror_host.sent.pop_front().unwrap();
    alice.process_packet(&mirrored_hello, &mut alice_host);

    assert_eq!(alice.state(), ZrtpState::WaitErrorAck);
    assert_eq!(
        sent_error_code(&mut alice_host),
        Some(ZrtpErrorCode::EqualZidHello as u32)
    );
}

#[test]
fn test_tampered_commit_chain_terminates() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x01; 12]);
    let mut bob = new_engine([0x02; 12]);
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);

    // Discovery by hand, Alice ends up committing first.
    let alice_hello = alice_host.sent.pop_front().unwrap();
    let bob_hello = bob_host.sent.pop_front().unwrap();
    bob.process_packet(&alice_hello, &mut bob_host);
    let bob_ack = bob_host.sent.pop_front().unwrap();
    alice.process_packet(&bob_hello, &mut alice_host);
    let _alice_ack = alice_host.sent.pop_front().unwrap();
    alice.process_packet(&bob_ack, &mut alice_host);

    assert_eq!(alice.state(), ZrtpState::CommitSent);
    let alice_commit = alice_host.sent.pop_front().unwrap();

    // Flip a bit inside H2; the chain back to H3 must break.
    let forged = tamper(&alice_commit, |image| {
        image[12] ^= 0x80;
    });
    bob.process_packet(&forged, &mut bob_host);

    assert_eq!(bob.state(), ZrtpState::Stopped);
    assert!(bob_host.has_info(
        MessageSeverity::Severe,
        SevereCode::CommitHmacFailed as i32
    ));
}

#[test]
fn test_retry_exhaustion_raises_severe() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x01; 12]);
    let mut alice_host = TestHost::new();

    alice.start(&mut alice_host);
    assert_eq!(alice.state(), ZrtpState::Detect);

    // Nobody answers: 20 retries, then give up.
    for _ in 0..21 {
        fire_timer(&mut alice, &mut alice_host);
    }

    assert_eq!(alice.state(), ZrtpState::Stopped);
    assert!(alice_host.has_info(
        MessageSeverity::Severe,
        SevereCode::TooMuchRetries as i32
    ));
    assert!(alice_host.timer_balanced());
    // Hello went out once plus twenty retransmissions.
    assert_eq!(alice_host.sent.len(), 21);
}

#[test]
fn test_inbound_error_reported_negated() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = new_engine([0x01; 12]);
    let mut bob = new_engine([0x02; 12]);
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);

    // Bob rejects Alice's (forged-version) Hello and sends Error.
    let alice_hello = alice_host.sent.pop_front().unwrap();
    let forged = tamper(&alice_hello, |image| {
        image[12..16].copy_from_slice(b"9.99");
    });
    bob.process_packet(&forged, &mut bob_host);
    let error_packet = bob_host
        .sent
        .drain(..)
        .find(|p| matches!(zrtp_wire::decode_packet(p), Ok((_, Message::Error(_)))))
        .expect("no Error packet sent");

    alice.process_packet(&error_packet, &mut alice_host);

    assert_eq!(alice.state(), ZrtpState::Stopped);
    assert!(alice_host
        .failures
        .iter()
        .any(|&(_, c)| c == -(ZrtpErrorCode::UnsuppZrtpVersion as i32)));

    // Alice acknowledged the Error.
    assert!(alice_host
        .sent
        .iter()
        .any(|p| matches!(zrtp_wire::decode_packet(p), Ok((_, Message::ErrorAck)))));
}
