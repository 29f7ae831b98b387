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

use common::{pump, temp_path, TestHost};
use zrtp_cache::ZidCache;
use zrtp_core::{
    InfoCode, MessageSeverity, Role, WarningCode, ZrtpConfig, ZrtpEngine, ZrtpState,
};
use zrtp_wire::packets::CommitParams;
use zrtp_wire::Message;

#[test]
fn test_fresh_pair_dh_handshake() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut alice = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x01; 12])),
    );
    let mut bob = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::MemoryCache::with_zid([0x02; 12])),
    );
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);
    pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);

    assert_eq!(alice.state(), ZrtpState::Secure);
    assert_eq!(bob.state(), ZrtpState::Secure);

    // Contention leaves exactly one initiator.
    let roles = (alice.role().unwrap(), bob.role().unwrap());
    assert!(matches!(
        roles,
        (Role::Initiator, Role::Responder) | (Role::Responder, Role::Initiator)
    ));

    // Both render the same 4-character base32 SAS.
    let (alice_sas, _) = alice_host.sas.clone().expect("alice SAS missing");
    let (bob_sas, _) = bob_host.sas.clone().expect("bob SAS missing");
    assert_eq!(alice_sas, bob_sas);
    assert_eq!(alice_sas.len(), 4);
    println!("handshake secure, SAS: {}", alice_sas);

    // First contact: no retained secret on either side.
    for host in [&alice_host, &bob_host] {
        assert!(host.has_info(MessageSeverity::Warning, WarningCode::NoRsMatch as i32));
        assert!(host.has_info(MessageSeverity::Info, InfoCode::SecureStateOn as i32));
        assert_eq!(host.srtp_on, 2);
        assert!(host.failures.is_empty());
        assert!(host.timer_balanced());
    }

    // Both streams share the session key for MultiStream use.
    assert_eq!(alice.session_key().unwrap(), bob.session_key().unwrap());
}

#[test]
fn test_returning_pair_finds_retained_secret() {
    let _ = env_logger::builder().is_test(true).try_init();

    let alice_path = temp_path("alice-returning.zid");
    let bob_path = temp_path("bob-returning.zid");
    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);

    for round in 0..2 {
        let mut alice = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
        );
        let mut bob = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
        );
        let mut alice_host = TestHost::new();
        let mut bob_host = TestHost::new();

        alice.start(&mut alice_host);
        bob.start(&mut bob_host);
        pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);

        assert_eq!(alice.state(), ZrtpState::Secure);
        assert_eq!(bob.state(), ZrtpState::Secure);

        if round == 0 {
            assert!(alice_host.has_info(MessageSeverity::Warning, WarningCode::NoRsMatch as i32));
        } else {
            // The rs1 from round one must match now.
            for host in [&alice_host, &bob_host] {
                assert!(host.has_info(MessageSeverity::Info, InfoCode::RsMatchFound as i32));
                assert!(!host.has_info(MessageSeverity::Warning, WarningCode::NoRsMatch as i32));
            }
        }
    }

    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);
}

#[test]
fn test_preshared_second_call() {
    let _ = env_logger::builder().is_test(true).try_init();

    let alice_path = temp_path("alice-preshared.zid");
    let bob_path = temp_path("bob-preshared.zid");
    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);

    // First call in DH mode establishes rs1.
    {
        let mut alice = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
        );
        let mut bob = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
        );
        let mut alice_host = TestHost::new();
        let mut bob_host = TestHost::new();

        alice.start(&mut alice_host);
        bob.start(&mut bob_host);
        pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);
        assert_eq!(alice.state(), ZrtpState::Secure);
        assert_eq!(bob.state(), ZrtpState::Secure);
    }

    // Second call prefers the cached secret.
    let mut config = ZrtpConfig::default();
    config.preshared = true;

    let mut alice = ZrtpEngine::new(
        config.clone(),
        Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
    );
    let mut bob = ZrtpEngine::new(
        config,
        Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
    );
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);

    let mut saw_preshared_commit = false;
    for _ in 0..64 {
        let from_alice: Vec<Vec<u8>> = alice_host.sent.drain(..).collect();
        for packet in &from_alice {
            if let Ok((_, Message::Commit(commit))) = zrtp_wire::decode_packet(packet) {
                if matches!(commit.params, CommitParams::PreShared { .. }) {
                    saw_preshared_commit = true;
                }
            }
            bob.process_packet(packet, &mut bob_host);
        }
        let from_bob: Vec<Vec<u8>> = bob_host.sent.drain(..).collect();
        for packet in &from_bob {
            if let Ok((_, Message::Commit(commit))) = zrtp_wire::decode_packet(packet) {
                if matches!(commit.params, CommitParams::PreShared { .. }) {
                    saw_preshared_commit = true;
                }
            }
            alice.process_packet(packet, &mut alice_host);
        }
        if alice_host.sent.is_empty() && bob_host.sent.is_empty() {
            break;
        }
    }

    assert!(saw_preshared_commit, "no PreShared Commit on the wire");
    assert_eq!(alice.state(), ZrtpState::Secure);
    assert_eq!(bob.state(), ZrtpState::Secure);
    assert_eq!(
        alice_host.sas.as_ref().map(|s| &s.0),
        bob_host.sas.as_ref().map(|s| &s.0)
    );

    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);
}

#[test]
fn test_cache_expiry_negotiated_to_minimum() {
    let _ = env_logger::builder().is_test(true).try_init();

    let alice_path = temp_path("alice-expiry.zid");
    let bob_path = temp_path("bob-expiry.zid");
    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);

    // Creating the caches up front fixes the ZIDs for the lookups below.
    let alice_zid = zrtp_cache::FileCache::open(&alice_path).unwrap().own_zid();
    let bob_zid = zrtp_cache::FileCache::open(&bob_path).unwrap().own_zid();

    let mut short_config = ZrtpConfig::default();
    short_config.rs_expire_secs = 3600;
    let mut unbounded_config = ZrtpConfig::default();
    unbounded_config.rs_expire_secs = -1;

    {
        let mut alice = ZrtpEngine::new(
            short_config,
            Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
        );
        let mut bob = ZrtpEngine::new(
            unbounded_config,
            Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
        );
        let mut alice_host = TestHost::new();
        let mut bob_host = TestHost::new();

        alice.start(&mut alice_host);
        bob.start(&mut bob_host);
        pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);
        assert_eq!(alice.state(), ZrtpState::Secure);
        assert_eq!(bob.state(), ZrtpState::Secure);
    }

    // Both sides honour the shorter lifetime, including the unbounded
    // one that received 3600 from its peer.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;
    for (path, peer_zid) in [(&alice_path, bob_zid), (&bob_path, alice_zid)] {
        let mut cache = zrtp_cache::FileCache::open(path).unwrap();
        let record = cache.get(&peer_zid);
        assert!(record.is_rs1_valid());
        assert_ne!(record.rs1_valid_thru, -1);
        let remaining = record.rs1_valid_thru - now;
        assert!(
            remaining > 3500 && remaining <= 3600,
            "unexpected rs1 lifetime: {} seconds",
            remaining
        );
    }

    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);
}

#[test]
fn test_sas_verified_round_trip() {
    let _ = env_logger::builder().is_test(true).try_init();

    let alice_path = temp_path("alice-verified.zid");
    let bob_path = temp_path("bob-verified.zid");
    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);

    // First call: verify the SAS afterwards.
    {
        let mut alice = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
        );
        let mut bob = ZrtpEngine::new(
            ZrtpConfig::default(),
            Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
        );
        let mut alice_host = TestHost::new();
        let mut bob_host = TestHost::new();

        alice.start(&mut alice_host);
        bob.start(&mut bob_host);
        pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);

        assert_eq!(alice_host.sas.as_ref().unwrap().1, false);
        alice.set_sas_verified(true);
        bob.set_sas_verified(true);
    }

    // Second call reports the SAS as verified.
    let mut alice = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::FileCache::open(&alice_path).unwrap()),
    );
    let mut bob = ZrtpEngine::new(
        ZrtpConfig::default(),
        Box::new(zrtp_cache::FileCache::open(&bob_path).unwrap()),
    );
    let mut alice_host = TestHost::new();
    let mut bob_host = TestHost::new();

    alice.start(&mut alice_host);
    bob.start(&mut bob_host);
    pump(&mut alice, &mut alice_host, &mut bob, &mut bob_host);

    assert_eq!(alice.state(), ZrtpState::Secure);
    assert_eq!(alice_host.sas.as_ref().unwrap().1, true);
    assert_eq!(bob_host.sas.as_ref().unwrap().1, true);

    let _ = std::fs::remove_file(&alice_path);
    let _ = std::fs::remove_file(&bob_path);
}
