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

//! Concrete implementations of the capability traits.

pub mod sha;
pub mod x25519;
pub mod aes_cfb;

pub use aes_cfb::{AesCfb128, AesCfb256};
pub use sha::{Sha256, Sha384};
pub use x25519::X25519;

use crate::traits::{Cipher, Hash, KeyAgreement};

/// Creates the hash backend for a negotiation tag, if one is built in.
pub fn create_hash(tag: &[u8; 4]) -> Option<Box<dyn Hash>> {
    match tag {
        b"S256" => Some(Box::new(Sha256)),
        b"S384" => Some(Box::new(Sha384)),
        _ => None,
    }
}

/// Creates the cipher backend for a negotiation tag, if one is built in.
pub fn create_cipher(tag: &[u8; 4]) -> Option<Box<dyn Cipher>> {
    match tag {
        b"AES1" => Some(Box::new(AesCfb128)),
        b"AES3" => Some(Box::new(AesCfb256)),
        _ => None,
    }
}

/// Creates the key agreement backend for a negotiation tag, if one is
/// built in. `Mult` and `Prsh` are keyless modes and have no backend.
pub fn create_key_agreement(tag: &[u8; 4]) -> Option<Box<dyn KeyAgreement>> {
    match tag {
        b"E255" => Some(Box::new(X25519::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_backends() {
        assert!(create_hash(b"S256").is_some());
        assert!(create_hash(b"S384").is_some());
        assert!(create_hash(b"SK64").is_none());
        assert!(create_cipher(b"AES1").is_some());
        assert!(create_cipher(b"2FS1").is_none());
        assert!(create_key_agreement(b"E255").is_some());
        assert!(create_key_agreement(b"Mult").is_none());
    }
}
