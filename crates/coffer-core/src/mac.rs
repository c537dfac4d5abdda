//! Keyed-MAC and tee adapters over `io::Write`
//!
//! [`MacSink`] feeds every byte written to it into a keyed BLAKE2b-512.
//! [`TeeWriter`] duplicates writes into two sinks, so during encryption the
//! framed ciphertext reaches the output file and the MAC in a single pass.

use std::io::{self, Write};

use blake2::digest::Mac;
use blake2::Blake2bMac512;

use crate::kdf::MacKey;
use crate::MAC_SIZE;

/// An `io::Write` adapter around a keyed BLAKE2b-512 MAC.
pub struct MacSink {
    mac: Blake2bMac512,
}

impl MacSink {
    pub fn new(key: &MacKey) -> Self {
        // a 32-byte key is always within BLAKE2b's 64-byte key limit
        let mac = Blake2bMac512::new_from_slice(key.as_bytes()).expect("valid MAC key length");
        Self { mac }
    }

    /// Consume the sink and produce the 64-byte tag.
    pub fn finalize(self) -> [u8; MAC_SIZE] {
        let mut tag = [0u8; MAC_SIZE];
        tag.copy_from_slice(&self.mac.finalize().into_bytes());
        tag
    }

    /// Constant-time comparison against an expected tag.
    pub fn verify(self, expected: &[u8; MAC_SIZE]) -> bool {
        self.mac.verify_slice(expected).is_ok()
    }
}

impl Write for MacSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.mac.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writes every byte to both sinks, in order.
pub struct TeeWriter<A: Write, B: Write> {
    first: A,
    second: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.first.write_all(buf)?;
        self.second.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}
