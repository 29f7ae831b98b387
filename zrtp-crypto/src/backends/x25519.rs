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

use crate::traits::KeyAgreement;
use anyhow::{anyhow, Result};
use rand_core::OsRng;
use x25519_dalek::{EphemeralSecret, PublicKey};

/// Curve25519 implementation of the [`KeyAgreement`] trait using the
/// `x25519-dalek` crate (`E255`).
///
/// The keypair is generated when the public value is first requested and
/// consumed by the shared secret computation; the private scalar never
/// leaves the dalek secret type.
#[derive(Default)]
pub struct X25519 {
    secret: Option<EphemeralSecret>,
}

impl KeyAgreement for X25519 {
    fn generate_keypair(&mut self) -> Result<Vec<u8>> {
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        self.secret = Some(secret);
        Ok(public.as_bytes().to_vec())
    }

    fn compute_shared_secret(&mut self, peer_public: &[u8]) -> Result<Vec<u8>> {
        let secret = self
            .secret
            .take()
            .ok_or_else(|| anyhow!("keypair not generated"))?;
        let peer_bytes: [u8; 32] = peer_public
            .try_into()
            .map_err(|_| anyhow!("invalid public value length"))?;
        let peer = PublicKey::from(peer_bytes);

        let shared = secret.diffie_hellman(&peer);
        // An all-zero output marks a low-order peer point.
        if !shared.was_contributory() {
            return Err(anyhow!("degenerate peer public value"));
        }
        Ok(shared.as_bytes().to_vec())
    }

    fn public_value_len(&self) -> usize {
        32
    }

    fn name(&self) -> &'static str {
        "E255"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agreement() {
        let mut alice = X25519::default();
        let mut bob = X25519::default();

        let alice_pub = alice.generate_keypair().unwrap();
        let bob_pub = bob.generate_keypair().unwrap();

        let s1 = alice.compute_shared_secret(&bob_pub).unwrap();
        let s2 = bob.compute_shared_secret(&alice_pub).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(s1.len(), 32);
    }

    #[test]
    fn test_degenerate_peer_rejected() {
        let mut alice = X25519::default();
        alice.generate_keypair().unwrap();
        assert!(alice.compute_shared_secret(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_missing_keypair() {
        let mut alice = X25519::default();
        assert!(alice.compute_shared_secret(&[9u8; 32]).is_err());
    }
}
