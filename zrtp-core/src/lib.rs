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

//! The ZRTP protocol core.
//!
//! Drives the RFC 6189 key agreement across the Hello/Commit/DHPart/
//! Confirm exchange, negotiates algorithms, runs the key schedule and
//! maintains the retained-secret cache. The host integrates through the
//! [`ZrtpCallback`] trait: packets out, timers, SRTP activation and user
//! interaction all cross that one seam.

pub mod callback;
pub mod codes;
pub mod config;
pub mod engine;
pub mod registry;
pub mod state;

pub use callback::{Direction, SrtpSecrets, ZrtpCallback};
pub use codes::{
    EnrollmentInfo, InfoCode, MessageSeverity, SevereCode, WarningCode, ZrtpErrorCode,
};
pub use config::ZrtpConfig;
pub use engine::ZrtpEngine;
pub use registry::{
    AlgorithmProfile, AuthTagAlgorithm, CipherAlgorithm, HashAlgorithm, PubKeyAlgorithm,
    SasAlgorithm,
};
pub use state::{Role, ZrtpState};
