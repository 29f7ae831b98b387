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

use crate::traits::Cipher;
use aes::{Aes128, Aes256};
use anyhow::{anyhow, Result};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};

type Aes128CfbEnc = cfb_mode::Encryptor<Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<Aes128>;
type Aes256CfbEnc = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDec = cfb_mode::Decryptor<Aes256>;

/// AES-128 in CFB mode, the mandatory Confirm cipher (`AES1`).
pub struct AesCfb128;

impl Cipher for AesCfb128 {
    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        if key.len() != 16 || iv.len() != 16 {
            return Err(anyhow!("invalid key or IV length for AES-128"));
        }
        let cipher =
            Aes128CfbEnc::new_from_slices(key, iv).map_err(|e| anyhow!("cipher error: {}", e))?;
        let mut buffer = plaintext.to_vec();
        cipher.encrypt(&mut buffer);
        Ok(buffer)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if key.len() != 16 || iv.len() != 16 {
            return Err(anyhow!("invalid key or IV length for AES-128"));
        }
        let cipher =
            Aes128CfbDec::new_from_slices(key, iv).map_err(|e| anyhow!("cipher error: {}", e))?;
        let mut buffer = ciphertext.to_vec();
        cipher.decrypt(&mut buffer);
        Ok(buffer)
    }

    fn key_len(&self) -> usize {
        16
    }

    fn iv_len(&self) -> usize {
        16
    }
}

/// AES-256 in CFB mode (`AES3`), required when `S384` is negotiated.
pub struct AesCfb256;

impl Cipher for AesCfb256 {
    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        if key.len() != 32 || iv.len() != 16 {
            return Err(anyhow!("invalid key or IV length for AES-256"));
        }
        let cipher =
            Aes256CfbEnc::new_from_slices(key, iv).map_err(|e| anyhow!("cipher error: {}", e))?;
        let mut buffer = plaintext.to_vec();
        cipher.encrypt(&mut buffer);
        Ok(buffer)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if key.len() != 32 || iv.len() != 16 {
            return Err(anyhow!("invalid key or IV length for AES-256"));
        }
        let cipher =
            Aes256CfbDec::new_from_slices(key, iv).map_err(|e| anyhow!("cipher error: {}", e))?;
        let mut buffer = ciphertext.to_vec();
        cipher.decrypt(&mut buffer);
        Ok(buffer)
    }

    fn key_len(&self) -> usize {
        32
    }

    fn iv_len(&self) -> usize {
        16
    }
}
