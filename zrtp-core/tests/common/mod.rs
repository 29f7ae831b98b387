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

#![allow(dead_code)]

use std::collections::VecDeque;
use zrtp_core::{Direction, MessageSeverity, SrtpSecrets, ZrtpCallback, ZrtpEngine};

/// A scripted host: queues outbound packets, records every callback.
pub struct TestHost {
    pub sent: VecDeque<Vec<u8>>,
    pub infos: Vec<(MessageSeverity, i32)>,
    pub failures: Vec<(MessageSeverity, i32)>,
    pub sas: Option<(String, bool)>,
    pub srtp_on: u32,
    pub srtp_off: u32,
    pub activations: u32,
    pub cancels: u32,
    pub expiries: u32,
    pub enrollment_requests: u32,
    pub enrollment_results: Vec<zrtp_core::EnrollmentInfo>,
}

impl TestHost {
    pub fn new() -> Self {
        Self {
            sent: VecDeque::new(),
            infos: Vec::new(),
            failures: Vec::new(),
            sas: None,
            srtp_on: 0,
            srtp_off: 0,
            activations: 0,
            cancels: 0,
            expiries: 0,
            enrollment_requests: 0,
            enrollment_results: Vec::new(),
        }
    }

    pub fn has_info(&self, severity: MessageSeverity, code: i32) -> bool {
        self.infos.iter().any(|&(s, c)| s == severity && c == code)
    }

    pub fn timer_balanced(&self) -> bool {
        self.activations == self.cancels + self.expiries
    }
}

impl ZrtpCallback for TestHost {
    fn send_data(&mut self, data: &[u8]) -> bool {
        self.sent.push_back(data.to_vec());
        true
    }

    fn activate_timer(&mut self, _ms: u32) -> i32 {
        self.activations += 1;
        0
    }

    fn cancel_timer(&mut self) -> i32 {
        self.cancels += 1;
        0
    }

    fn send_info(&mut self, severity: MessageSeverity, code: i32) {
        self.infos.push((severity, code));
    }

    fn negotiation_failed(&mut self, severity: MessageSeverity, code: i32) {
        self.failures.push((severity, code));
    }

    fn srtp_secrets_ready(&mut self, _secrets: &SrtpSecrets, _direction: Direction) -> bool {
        self.srtp_on += 1;
        true
    }

    fn srtp_secrets_off(&mut self, _direction: Direction) {
        self.srtp_off += 1;
    }

    fn sas_present(&mut self, sas: &str, verified: bool) {
        self.sas = Some((sas.to_string(), verified));
    }

    fn ask_enrollment(&mut self, _info: zrtp_core::EnrollmentInfo) {
        self.enrollment_requests += 1;
    }

    fn inform_enrollment(&mut self, info: zrtp_core::EnrollmentInfo) {
        self.enrollment_results.push(info);
    }
}

/// Delivers a timer expiry, keeping the activation/expiry accounting.
pub fn fire_timer(engine: &mut ZrtpEngine, host: &mut TestHost) {
    host.expiries += 1;
    engine.process_timeout(host);
}

/// Shuttles queued packets between two engines until both queues drain.
pub fn pump(
    alice: &mut ZrtpEngine,
    alice_host: &mut TestHost,
    bob: &mut ZrtpEngine,
    bob_host: &mut TestHost,
) {
    for _ in 0..64 {
        let from_alice: Vec<Vec<u8>> = alice_host.sent.drain(..).collect();
        for packet in &from_alice {
            bob.process_packet(packet, bob_host);
        }
        let from_bob: Vec<Vec<u8>> = bob_host.sent.drain(..).collect();
        for packet in &from_bob {
            alice.process_packet(packet, alice_host);
        }
        if alice_host.sent.is_empty() && bob_host.sent.is_empty() {
            return;
        }
    }
    panic!("packet exchange did not converge");
}

/// A scratch file path under the system temp directory.
pub fn temp_path(name: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("zrtp-core-test-{}-{}", std::process::id(), name));
    path
}
