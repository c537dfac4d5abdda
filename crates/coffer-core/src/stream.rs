//! Streaming chunked encryption and decryption
//!
//! [`EncryptWriter`] splits incoming plaintext into chunks of at most
//! [`MAX_CHUNK_SIZE`] bytes, seals each with XChaCha20-Poly1305 under a
//! fresh random nonce, and writes the framed result to its sink.
//! [`DecryptReader`] inverts this one frame at a time.
//!
//! Chunk boundaries are part of the on-disk format: every `write` call
//! flushes a trailing (possibly partial) chunk, so consecutive calls never
//! share a chunk and byte-at-a-time writers would inflate the output.
//! Callers must hand over large slices; see `file::copy_chunked`.
//!
//! The per-chunk Poly1305 tags authenticate each frame in isolation only.
//! Whole-file integrity across frames is the outer header MAC's job.

use std::collections::HashSet;
use std::io::{self, Read, Write};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::frame;
use crate::kdf::CipherKey;
use crate::{MAX_CHUNK_SIZE, NONCE_SIZE};

/// An `io::Write` that encrypts everything written to it into framed chunks
/// on the underlying sink.
pub struct EncryptWriter<W: Write> {
    out: W,
    cipher: XChaCha20Poly1305,
    buf: Vec<u8>,
    used_nonces: HashSet<[u8; NONCE_SIZE]>,
    chunks_written: u64,
}

impl<W: Write> EncryptWriter<W> {
    pub fn new(key: &CipherKey, out: W) -> Self {
        Self {
            out,
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
            buf: Vec::with_capacity(MAX_CHUNK_SIZE),
            used_nonces: HashSet::new(),
            chunks_written: 0,
        }
    }

    /// Seal the buffered plaintext as one framed chunk and reset the buffer.
    fn write_chunk(&mut self) -> io::Result<()> {
        let nonce = self.fresh_nonce();
        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), self.buf.as_slice())
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "chunk encryption failed"))?;
        self.buf.clear();
        self.chunks_written += 1;
        frame::write_frame(&mut self.out, &nonce, &ciphertext)
    }

    /// Draw a fresh random nonce, tracked for the lifetime of this writer.
    ///
    /// A 192-bit collision cannot happen with a working RNG, so observing
    /// one means the RNG is broken; aborting beats reusing a nonce under
    /// the same key.
    fn fresh_nonce(&mut self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        assert!(
            self.used_nonces.insert(nonce),
            "nonce collision: system RNG is returning repeated values"
        );
        nonce
    }

    /// Flush any pending chunk and return the sink.
    ///
    /// An empty input still produces one (empty) chunk, so every ciphertext
    /// records at least one nonce.
    pub fn finish(mut self) -> io::Result<W> {
        if self.chunks_written == 0 || !self.buf.is_empty() {
            self.write_chunk()?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    /// Accepts all of `data`, sealing a full chunk each time
    /// [`MAX_CHUNK_SIZE`] bytes are buffered with more input remaining, and
    /// a final (possibly partial) chunk for the rest of this call.
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut rest = data;
        while !rest.is_empty() {
            let take = (MAX_CHUNK_SIZE - self.buf.len()).min(rest.len());
            self.buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.buf.len() == MAX_CHUNK_SIZE && !rest.is_empty() {
                self.write_chunk()?;
            }
        }
        self.write_chunk()?;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

enum ReaderState {
    Streaming,
    Done,
    Failed(io::ErrorKind, String),
}

/// An `io::Read` that decrypts framed chunks from the underlying source,
/// serving plaintext runs into the caller's buffer.
///
/// At most one decrypted chunk is resident at a time. Any frame error
/// (failed authentication, oversize length, EOF mid-frame) leaves the
/// reader permanently failed; there are no retries.
pub struct DecryptReader<R: Read> {
    input: R,
    cipher: XChaCha20Poly1305,
    chunk: Vec<u8>,
    pos: usize,
    state: ReaderState,
}

impl<R: Read> DecryptReader<R> {
    pub fn new(key: &CipherKey, input: R) -> Self {
        Self {
            input,
            cipher: XChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
            chunk: Vec::new(),
            pos: 0,
            state: ReaderState::Streaming,
        }
    }

    /// Fetch and open the next frame. `false` means clean end of stream.
    fn next_chunk(&mut self) -> io::Result<bool> {
        let Some((nonce, ciphertext)) = frame::read_frame(&mut self.input)? else {
            return Ok(false);
        };
        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "chunk authentication failed"))?;
        self.chunk = plaintext;
        self.pos = 0;
        Ok(true)
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        match &self.state {
            ReaderState::Failed(kind, msg) => return Err(io::Error::new(*kind, msg.clone())),
            ReaderState::Done => return Ok(0),
            ReaderState::Streaming => {}
        }
        if out.is_empty() {
            return Ok(0);
        }

        let mut filled = 0;
        while filled < out.len() {
            if self.pos == self.chunk.len() {
                match self.next_chunk() {
                    Ok(true) => {}
                    Ok(false) => {
                        self.state = ReaderState::Done;
                        break;
                    }
                    Err(e) => {
                        self.state = ReaderState::Failed(e.kind(), e.to_string());
                        if filled == 0 {
                            return Err(e);
                        }
                        // hand back what was already decrypted; the error is
                        // delivered on the next call
                        break;
                    }
                }
            }
            let n = (out.len() - filled).min(self.chunk.len() - self.pos);
            out[filled..filled + n].copy_from_slice(&self.chunk[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::LEN_FIELD_SIZE, KEY_SIZE, TAG_SIZE};

    fn test_key() -> CipherKey {
        CipherKey::from_bytes([7u8; KEY_SIZE])
    }

    fn encrypt_all(data: &[u8]) -> Vec<u8> {
        let mut writer = EncryptWriter::new(&test_key(), Vec::new());
        if !data.is_empty() {
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap()
    }

    fn decrypt_all(ciphertext: &[u8]) -> Vec<u8> {
        let mut reader = DecryptReader::new(&test_key(), ciphertext);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        out
    }

    /// Collect the plaintext length of every frame in `ciphertext`.
    fn frame_lengths(mut ciphertext: &[u8]) -> Vec<usize> {
        let mut lengths = Vec::new();
        while let Some((_, chunk)) = frame::read_frame(&mut ciphertext).unwrap() {
            lengths.push(chunk.len() - TAG_SIZE);
        }
        lengths
    }

    #[test]
    fn test_roundtrip_various_sizes() {
        let cases: Vec<Vec<u8>> = vec![
            b"this is a test".to_vec(),
            vec![0xC3; MAX_CHUNK_SIZE - 1],
            vec![0xC3; MAX_CHUNK_SIZE],
            vec![0xC3; MAX_CHUNK_SIZE + 1],
            vec![0xC3; MAX_CHUNK_SIZE * 10],
        ];
        for data in cases {
            assert_eq!(decrypt_all(&encrypt_all(&data)), data, "size {}", data.len());
        }
    }

    #[test]
    fn test_empty_input_records_one_nonce() {
        let ciphertext = encrypt_all(b"");
        // one frame holding zero plaintext bytes: nonce + length + tag
        assert_eq!(
            ciphertext.len(),
            NONCE_SIZE + LEN_FIELD_SIZE + TAG_SIZE
        );
        assert_eq!(frame_lengths(&ciphertext), vec![0]);
        assert_eq!(decrypt_all(&ciphertext), b"");
    }

    #[test]
    fn test_exact_chunk_is_single_frame() {
        let ciphertext = encrypt_all(&vec![1u8; MAX_CHUNK_SIZE]);
        assert_eq!(frame_lengths(&ciphertext), vec![MAX_CHUNK_SIZE]);
    }

    #[test]
    fn test_sub_chunk_is_single_frame() {
        let ciphertext = encrypt_all(&vec![1u8; MAX_CHUNK_SIZE - 1]);
        assert_eq!(frame_lengths(&ciphertext), vec![MAX_CHUNK_SIZE - 1]);
    }

    #[test]
    fn test_chunk_plus_one_splits_in_order() {
        let mut data = vec![2u8; MAX_CHUNK_SIZE + 1];
        *data.last_mut().unwrap() = 0xEE;

        let ciphertext = encrypt_all(&data);
        assert_eq!(frame_lengths(&ciphertext), vec![MAX_CHUNK_SIZE, 1]);
        assert_eq!(decrypt_all(&ciphertext), data);
    }

    #[test]
    fn test_consecutive_writes_never_share_a_chunk() {
        let mut writer = EncryptWriter::new(&test_key(), Vec::new());
        writer.write_all(&[1u8; 100]).unwrap();
        writer.write_all(&[2u8; 100]).unwrap();
        let ciphertext = writer.finish().unwrap();

        assert_eq!(frame_lengths(&ciphertext), vec![100, 100]);
    }

    #[test]
    fn test_no_nonce_reuse_across_chunks() {
        let ciphertext = encrypt_all(&vec![9u8; MAX_CHUNK_SIZE * 32]);
        let mut seen = HashSet::new();
        let mut cursor = ciphertext.as_slice();
        while let Some((nonce, _)) = frame::read_frame(&mut cursor).unwrap() {
            assert!(seen.insert(nonce), "nonce appears in two frames");
        }
        assert_eq!(seen.len(), 32);
    }

    #[test]
    fn test_ciphertext_differs_between_runs() {
        let data = vec![4u8; 1000];
        assert_ne!(encrypt_all(&data), encrypt_all(&data));
    }

    #[test]
    fn test_encryptor_buffer_stays_bounded() {
        let mut writer = EncryptWriter::new(&test_key(), Vec::new());
        for _ in 0..64 {
            writer.write_all(&[0u8; MAX_CHUNK_SIZE]).unwrap();
            assert!(writer.buf.len() <= MAX_CHUNK_SIZE);
        }
        assert!(writer.buf.capacity() <= MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_decryptor_holds_at_most_one_chunk() {
        let ciphertext = encrypt_all(&vec![5u8; MAX_CHUNK_SIZE * 8]);
        let mut reader = DecryptReader::new(&test_key(), ciphertext.as_slice());
        let mut buf = [0u8; 1000];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            assert!(reader.chunk.len() <= MAX_CHUNK_SIZE);
        }
    }

    #[test]
    fn test_tampered_chunk_fails() {
        let mut ciphertext = encrypt_all(b"some secret bytes");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;

        let mut reader = DecryptReader::new(&test_key(), ciphertext.as_slice());
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_truncation_mid_frame_fails() {
        let ciphertext = encrypt_all(&vec![6u8; 500]);
        let truncated = &ciphertext[..ciphertext.len() - 10];

        let mut reader = DecryptReader::new(&test_key(), truncated);
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_failed_reader_stays_failed() {
        let mut ciphertext = encrypt_all(b"abc");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 1;

        let mut reader = DecryptReader::new(&test_key(), ciphertext.as_slice());
        assert!(reader.read(&mut [0u8; 16]).is_err());
        assert!(reader.read(&mut [0u8; 16]).is_err());
    }

    #[test]
    fn test_wrong_key_fails() {
        let ciphertext = encrypt_all(b"under one key");
        let other = CipherKey::from_bytes([8u8; KEY_SIZE]);
        let mut reader = DecryptReader::new(&other, ciphertext.as_slice());
        assert!(reader.read_to_end(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_partial_reads_preserve_stream() {
        let data: Vec<u8> = (0..40_000u32).map(|i| (i % 251) as u8).collect();
        let ciphertext = encrypt_all(&data);

        let mut reader = DecryptReader::new(&test_key(), ciphertext.as_slice());
        let mut out = Vec::new();
        let mut buf = [0u8; 37]; // deliberately misaligned with chunk size
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data);
    }

    #[test]
    fn test_ciphertext_is_incompressible() {
        // all-zero plaintext still yields a ciphertext that a general
        // purpose compressor cannot shrink
        let ciphertext = encrypt_all(&vec![0u8; MAX_CHUNK_SIZE * 16]);
        let compressed = zstd::stream::encode_all(ciphertext.as_slice(), 19).unwrap();
        assert!(compressed.len() >= ciphertext.len());
    }
}
