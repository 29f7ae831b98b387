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

use crate::traits::Hash;
use rand_core::{OsRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The four-element hash pre-image chain of RFC 6189 Section 9.
///
/// `H0` is random; `Hn = SHA-256(H(n-1))`. `H3` travels in Hello, `H2` in
/// Commit, `H1` in DHPart1/2 and `H0` inside the encrypted Confirm body.
/// Revealing an element lets the peer authenticate the earlier messages
/// keyed by it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HashChain {
    h: [[u8; 32]; 4],
}

impl HashChain {
    /// Generates a fresh chain from a random H0. The chain always uses
    /// SHA-256 regardless of the negotiated hash.
    pub fn generate(hash: &dyn Hash) -> Self {
        let mut h = [[0u8; 32]; 4];
        OsRng.fill_bytes(&mut h[0]);
        for i in 1..4 {
            let d = hash.digest(&h[i - 1]);
            h[i].copy_from_slice(&d[..32]);
        }
        Self { h }
    }

    pub fn h0(&self) -> &[u8; 32] {
        &self.h[0]
    }

    pub fn h1(&self) -> &[u8; 32] {
        &self.h[1]
    }

    pub fn h2(&self) -> &[u8; 32] {
        &self.h[2]
    }

    pub fn h3(&self) -> &[u8; 32] {
        &self.h[3]
    }
}

/// Checks one chain link: `SHA-256(revealed) == expected`.
pub fn verify_link(hash: &dyn Hash, revealed: &[u8; 32], expected: &[u8; 32]) -> bool {
    let d = hash.digest(revealed);
    d[..32].ct_eq(&expected[..]).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::Sha256;

    #[test]
    fn test_chain_links() {
        let hash = Sha256;
        let chain = HashChain::generate(&hash);

        assert!(verify_link(&hash, chain.h0(), chain.h1()));
        assert!(verify_link(&hash, chain.h1(), chain.h2()));
        assert!(verify_link(&hash, chain.h2(), chain.h3()));
        assert!(!verify_link(&hash, chain.h0(), chain.h2()));
    }

    #[test]
    fn test_chains_are_unique() {
        let hash = Sha256;
        let a = HashChain::generate(&hash);
        let b = HashChain::generate(&hash);
        assert_ne!(a.h0(), b.h0());
    }
}
