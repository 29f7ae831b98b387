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

//! ZRTP cryptographic primitives.
//!
//! This crate defines the narrow capability traits the protocol core
//! consumes (hashing, key agreement, symmetric encryption), concrete
//! backends built on `ring`, `x25519-dalek` and `aes`/`cfb-mode`, the
//! RFC 6189 key derivation pipeline, and SAS rendering.

pub mod traits;
pub mod backends;
pub mod chain;
pub mod kdf;
pub mod sas;

pub use chain::HashChain;
pub use kdf::*;
pub use traits::*;
