//! coffer-core: streaming authenticated file encryption
//!
//! Pipeline (encrypt):
//! ```text
//! passphrase ── Argon2id(salt, params) ──► 64 bytes ──► cipher key ‖ MAC key
//!
//! plaintext ──► 16 KiB chunks ──► XChaCha20-Poly1305 (fresh random nonce each)
//!           ──► framed chunk stream ──► tee { output file, BLAKE2b-512 keyed MAC }
//!           ──► tag written into the header ──► fsync ──► atomic rename
//! ```
//!
//! On-disk layout:
//! ```text
//! [105-byte header][chunk frame][chunk frame]...
//! header := salt[32] ‖ argon_time[u32 LE] ‖ argon_memory_kib[u32 LE]
//!           ‖ argon_lanes[u8] ‖ tag[64]
//! frame  := nonce[24] ‖ length[u64 LE] ‖ aead_ciphertext[length]
//! ```
//!
//! The header tag is a keyed BLAKE2b-512 MAC over every byte after the
//! header. Decryption authenticates the whole ciphertext region against it
//! before producing a single plaintext byte; the per-chunk Poly1305 tags
//! cannot catch whole-file tampering such as removal of trailing chunks.

pub mod error;
pub mod file;
pub mod frame;
pub mod header;
pub mod kdf;
pub mod mac;
pub mod stream;

pub use error::{CofferError, CofferResult};
pub use file::{decrypt_file, encrypt_file, encrypt_file_with};
pub use header::{FileHeader, HEADER_LEN};
pub use kdf::{derive_keys, CipherKey, KdfParams, KeyMaterial, MacKey};
pub use stream::{DecryptReader, EncryptWriter};

/// Size of the XChaCha20-Poly1305 cipher key and of the MAC key (256-bit each)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the KDF salt stored in the file header
pub const SALT_SIZE: usize = 32;

/// Size of the BLAKE2b-512 MAC tag stored in the file header
pub const MAC_SIZE: usize = 64;

/// Plaintext bytes per chunk.
///
/// Each chunk is one AEAD message, so it must be held in memory whole to be
/// sealed or opened. 16 KiB keeps that bound small, amortises the per-message
/// overhead, and fits data caches.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024;
