//! Chunk frame codec
//!
//! One frame on disk: `nonce[24] ‖ length[u64 LE] ‖ aead_ciphertext[length]`,
//! where `length` covers the AEAD output including its 16-byte Poly1305 tag.
//! There is no per-frame magic or version; the file header is the only
//! framing metadata.

use std::io::{self, Read, Write};

use crate::{MAX_CHUNK_SIZE, NONCE_SIZE, TAG_SIZE};

/// Upper bound for a frame's `length` field: a full plaintext chunk plus the
/// Poly1305 tag.
pub const MAX_FRAME_LEN: usize = MAX_CHUNK_SIZE + TAG_SIZE;

/// Serialized size of the length prefix.
pub const LEN_FIELD_SIZE: usize = 8;

/// Emit one frame to `out`.
pub fn write_frame<W: Write>(
    out: &mut W,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> io::Result<()> {
    out.write_all(nonce)?;
    out.write_all(&(ciphertext.len() as u64).to_le_bytes())?;
    out.write_all(ciphertext)
}

/// Read one frame from `input`.
///
/// Returns `Ok(None)` on a clean end of stream, i.e. EOF before any nonce
/// byte. EOF inside a frame and length fields over [`MAX_FRAME_LEN`] are
/// `InvalidData` errors.
pub fn read_frame<R: Read>(input: &mut R) -> io::Result<Option<([u8; NONCE_SIZE], Vec<u8>)>> {
    let mut nonce = [0u8; NONCE_SIZE];
    let mut filled = 0;
    while filled < NONCE_SIZE {
        match input.read(&mut nonce[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(truncated()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    let mut len_bytes = [0u8; LEN_FIELD_SIZE];
    input.read_exact(&mut len_bytes).map_err(eof_as_truncated)?;
    let length = u64::from_le_bytes(len_bytes);
    if length > MAX_FRAME_LEN as u64 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("chunk length {length} exceeds the {MAX_FRAME_LEN}-byte maximum"),
        ));
    }

    let mut ciphertext = vec![0u8; length as usize];
    input.read_exact(&mut ciphertext).map_err(eof_as_truncated)?;
    Ok(Some((nonce, ciphertext)))
}

fn truncated() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        "ciphertext ends inside a chunk frame",
    )
}

fn eof_as_truncated(e: io::Error) -> io::Error {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        truncated()
    } else {
        e
    }
}
