//! Key derivation: Argon2id passphrase → cipher key + MAC key

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::error::{CofferError, CofferResult};
use crate::{KEY_SIZE, SALT_SIZE};

/// Total Argon2id output: the cipher key followed by the MAC key.
const DERIVED_LEN: usize = KEY_SIZE * 2;

/// A 256-bit XChaCha20-Poly1305 key.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct CipherKey {
    bytes: [u8; KEY_SIZE],
}

impl CipherKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for CipherKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 256-bit key for the outer BLAKE2b-512 MAC. Zeroized on drop.
pub struct MacKey {
    bytes: [u8; KEY_SIZE],
}

impl MacKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for MacKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MacKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The two keys one derivation produces. Owned by a single encrypt or
/// decrypt operation for its lifetime.
#[derive(Debug)]
pub struct KeyMaterial {
    pub cipher: CipherKey,
    pub mac: MacKey,
}

/// Argon2id cost parameters.
///
/// The defaults are aggressive (4 passes over ~4 GiB) since this is at-rest
/// encryption: derivation happens once per file, not per request.
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Passes over memory (default: 4)
    pub time_cost: u32,
    /// Memory cost in KiB (default: 4 000 000 ≈ 4 GiB)
    pub memory_kib: u32,
    /// Lanes (default: 2 × logical CPUs, clamped to 1..=255)
    pub lanes: u8,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            time_cost: 4,
            memory_kib: 4_000_000,
            lanes: default_lanes(),
        }
    }
}

fn default_lanes() -> u8 {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 2).clamp(1, u8::MAX as usize) as u8
}

/// Derive the cipher and MAC keys from a passphrase and salt using Argon2id.
///
/// The keys come from non-overlapping halves of a single 64-byte Argon2id
/// output. Decryption must pass the parameters recorded in the file header,
/// not the current defaults, so old files stay readable when defaults move.
pub fn derive_keys(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> CofferResult<KeyMaterial> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.time_cost,
        params.lanes as u32,
        Some(DERIVED_LEN),
    )
    .map_err(|e| CofferError::Kdf(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut okm = [0u8; DERIVED_LEN];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut okm)
        .map_err(|e| CofferError::Kdf(format!("Argon2id failed: {e}")))?;

    let mut cipher = [0u8; KEY_SIZE];
    let mut mac = [0u8; KEY_SIZE];
    cipher.copy_from_slice(&okm[..KEY_SIZE]);
    mac.copy_from_slice(&okm[KEY_SIZE..]);
    okm.zeroize();

    Ok(KeyMaterial {
        cipher: CipherKey::from_bytes(cipher),
        mac: MacKey::from_bytes(mac),
    })
}
