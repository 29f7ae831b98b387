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

use crate::traits::Hash;
use ring::digest;
use ring::hmac;

/// SHA-256 implementation of the [`Hash`] trait using the `ring` crate.
///
/// This is the mandatory ZRTP hash (`S256`).
pub struct Sha256;

impl Hash for Sha256 {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        digest::digest(&digest::SHA256, data).as_ref().to_vec()
    }

    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let hmac_key = hmac::Key::new(hmac::HMAC_SHA256, key);
        hmac::sign(&hmac_key, data).as_ref().to_vec()
    }

    fn name(&self) -> &'static str {
        "S256"
    }

    fn output_len(&self) -> usize {
        32
    }
}

/// SHA-384 implementation of the [`Hash`] trait (`S384`).
pub struct Sha384;

impl Hash for Sha384 {
    fn digest(&self, data: &[u8]) -> Vec<u8> {
        digest::digest(&digest::SHA384, data).as_ref().to_vec()
    }

    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        let hmac_key = hmac::Key::new(hmac::HMAC_SHA384, key);
        hmac::sign(&hmac_key, data).as_ref().to_vec()
    }

    fn name(&self) -> &'static str {
        "S384"
    }

    fn output_len(&self) -> usize {
        48
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_len() {
        let sha = Sha256;
        assert_eq!(sha.digest(b"hello").len(), 32);
    }

    #[test]
    fn test_sha256_known_vector() {
        // SHA-256("abc")
        let sha = Sha256;
        let out = sha.digest(b"abc");
        assert_eq!(
            out[..4],
            [0xba, 0x78, 0x16, 0xbf],
        );
    }

    #[test]
    fn test_sha384_digest_len() {
        let sha = Sha384;
        assert_eq!(sha.digest(b"hello").len(), 48);
        assert_eq!(sha.output_len(), 48);
    }

    #[test]
    fn test_hmac_len() {
        let sha = Sha256;
        assert_eq!(sha.hmac(b"key", b"data").len(), 32);
    }

    #[test]
    fn test_kdf_truncation() {
        let sha = Sha256;
        let key = vec![0u8; 32];
        assert_eq!(sha.kdf(&key, b"label", b"context", 32).len(), 32);
        assert_eq!(sha.kdf(&key, b"label", b"context", 14).len(), 14);
    }

    #[test]
    fn test_kdf_label_separation() {
        let sha = Sha256;
        let key = vec![0x42u8; 32];
        let a = sha.kdf(&key, b"Initiator SRTP master key", b"ctx", 16);
        let b = sha.kdf(&key, b"Responder SRTP master key", b"ctx", 16);
        assert_ne!(a, b);
    }
}
