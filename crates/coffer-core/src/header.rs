//! Fixed-layout file header codec
//!
//! ```text
//! offset  size  field
//! 0       32    salt
//! 32      4     argon_time        (u32 LE)
//! 36      4     argon_memory_kib  (u32 LE)
//! 40      1     argon_lanes
//! 41      64    tag (BLAKE2b-512 keyed MAC over the ciphertext region)
//! ```
//!
//! Fields are packed back-to-back, little-endian, with no alignment padding.
//! This encoding is canonical and never changes: the ciphertext region (and
//! the MAC's coverage) starts at exactly byte 105.

use std::io::{Read, Write};

use crate::{MAC_SIZE, SALT_SIZE};

/// Serialized header length in bytes.
pub const HEADER_LEN: usize = SALT_SIZE + 4 + 4 + 1 + MAC_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    /// Fresh uniform-random KDF salt, one per encryption.
    pub salt: [u8; SALT_SIZE],
    /// Argon2id pass count used to derive this file's keys.
    pub argon_time: u32,
    /// Argon2id memory cost in KiB.
    pub argon_memory_kib: u32,
    /// Argon2id parallelism.
    pub argon_lanes: u8,
    /// Keyed BLAKE2b-512 MAC over `[HEADER_LEN, EOF)`.
    pub tag: [u8; MAC_SIZE],
}

impl FileHeader {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..32].copy_from_slice(&self.salt);
        out[32..36].copy_from_slice(&self.argon_time.to_le_bytes());
        out[36..40].copy_from_slice(&self.argon_memory_kib.to_le_bytes());
        out[40] = self.argon_lanes;
        out[41..].copy_from_slice(&self.tag);
        out
    }

    pub fn decode(bytes: &[u8; HEADER_LEN]) -> Self {
        let mut salt = [0u8; SALT_SIZE];
        salt.copy_from_slice(&bytes[..32]);
        let mut time = [0u8; 4];
        time.copy_from_slice(&bytes[32..36]);
        let mut memory = [0u8; 4];
        memory.copy_from_slice(&bytes[36..40]);
        let mut tag = [0u8; MAC_SIZE];
        tag.copy_from_slice(&bytes[41..]);

        Self {
            salt,
            argon_time: u32::from_le_bytes(time),
            argon_memory_kib: u32::from_le_bytes(memory),
            argon_lanes: bytes[40],
            tag,
        }
    }

    /// Read and decode a header from the current position of `input`.
    pub fn read_from<R: Read>(input: &mut R) -> std::io::Result<Self> {
        let mut buf = [0u8; HEADER_LEN];
        input.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }

    pub fn write_to<W: Write>(&self, output: &mut W) -> std::io::Result<()> {
        output.write_all(&self.encode())
    }
}
