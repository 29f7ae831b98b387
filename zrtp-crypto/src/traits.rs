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

use anyhow::Result;

/// Trait for cryptographic hash functions used in ZRTP.
///
/// Negotiable implementations are SHA-256 (mandatory, `S256`) and SHA-384
/// (`S384`).
pub trait Hash {
    /// Computes the message digest of the given data.
    fn digest(&self, data: &[u8]) -> Vec<u8>;

    /// Computes the HMAC of the given data using the provided key.
    fn hmac(&self, key: &[u8], data: &[u8]) -> Vec<u8>;

    /// Key Derivation Function as defined in RFC 6189 Section 4.5.1:
    /// `KDF(KI, Label, Context, L) = HMAC(KI, i | Label | 0x00 | Context | L)`
    /// with a fixed counter `i = 1` and `L` in bits, truncated to `length`
    /// bytes. All ZRTP keys fit into a single HMAC block.
    fn kdf(&self, key: &[u8], label: &[u8], context: &[u8], length: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + label.len() + 1 + context.len() + 4);
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(label);
        data.push(0x00);
        data.extend_from_slice(context);
        data.extend_from_slice(&((length as u32) * 8).to_be_bytes());

        let mut out = self.hmac(key, &data);
        out.truncate(length);
        out
    }

    /// Returns the negotiation tag of the algorithm (e.g., `S256`).
    fn name(&self) -> &'static str;

    /// Returns the output length of the hash function in bytes.
    fn output_len(&self) -> usize;
}

/// Trait for the Diffie-Hellman style key agreements carried in the
/// DHPart1/DHPart2 public values.
///
/// The protocol core treats the agreement as an opaque capability: it asks
/// for a public value, hands over the peer's value and consumes the shared
/// secret. Finite-field groups (DH3k) and further curves plug in through
/// this trait.
pub trait KeyAgreement {
    /// Generates a new ephemeral keypair and returns the public value.
    fn generate_keypair(&mut self) -> Result<Vec<u8>>;

    /// Computes the shared secret from our private key and the peer's
    /// public value. Implementations must reject degenerate peer values
    /// (the RFC 6189 pvi/pvr range check).
    fn compute_shared_secret(&mut self, peer_public: &[u8]) -> Result<Vec<u8>>;

    /// Length in bytes of the public value on the wire.
    fn public_value_len(&self) -> usize;

    /// Returns the negotiation tag of the algorithm (e.g., `E255`).
    fn name(&self) -> &'static str;
}

/// Trait for the symmetric cipher protecting Confirm and SASrelay bodies.
///
/// ZRTP uses the negotiated block cipher in CFB mode, so plaintext of any
/// length round-trips without padding.
pub trait Cipher {
    /// Encrypts the plaintext using the given key and IV.
    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypts the ciphertext using the given key and IV.
    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Returns the required key length in bytes.
    fn key_len(&self) -> usize;

    /// Returns the required IV length in bytes.
    fn iv_len(&self) -> usize;
}
