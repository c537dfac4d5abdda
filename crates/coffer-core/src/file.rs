//! Whole-file encryption and decryption
//!
//! Both operations write to `<output>.temp` and rename over the final path
//! only after a successful sync, so `<output>` is either the complete
//! correct file or absent; the temp file is removed on every error path.
//!
//! Decryption reads the input twice. Pass 1 authenticates the entire
//! ciphertext region against the header's keyed BLAKE2b-512 tag; only then
//! does pass 2 seek back and decrypt. A per-chunk tag cannot tell a
//! truncated or reordered file from an intact one, so no plaintext is
//! written until the outer MAC has passed.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretString;

use crate::error::{CofferError, CofferResult};
use crate::header::FileHeader;
use crate::kdf::{derive_keys, KdfParams};
use crate::mac::{MacSink, TeeWriter};
use crate::stream::{DecryptReader, EncryptWriter};
use crate::{MAC_SIZE, MAX_CHUNK_SIZE, SALT_SIZE};

/// Removes the temp file on drop unless the rename committed first.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn temp_path(output: &Path) -> PathBuf {
    let mut os = output.as_os_str().to_os_string();
    os.push(".temp");
    PathBuf::from(os)
}

/// Copy `input` into `writer` in whole-chunk slices.
///
/// The encryptor seals a trailing chunk per `write` call, so the copy
/// buffer is filled completely before each write; every chunk but the last
/// then carries exactly [`MAX_CHUNK_SIZE`] plaintext bytes.
fn copy_chunked<R: Read, W: Write>(input: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut buf = vec![0u8; MAX_CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let mut filled = 0;
        while filled < buf.len() {
            match input.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..filled])?;
        total += filled as u64;
    }
}

/// Encrypt `input` to `output` using the default Argon2id parameters.
pub fn encrypt_file<R: Read + Seek>(
    passphrase: &SecretString,
    input: &mut R,
    output: &Path,
) -> CofferResult<()> {
    encrypt_file_with(passphrase, input, output, &KdfParams::default())
}

/// Encrypt `input` to `output` with explicit Argon2id parameters.
///
/// The parameters are recorded in the header, so the file stays decryptable
/// when defaults change.
pub fn encrypt_file_with<R: Read + Seek>(
    passphrase: &SecretString,
    input: &mut R,
    output: &Path,
    params: &KdfParams,
) -> CofferResult<()> {
    let tmp = temp_path(output);
    let mut guard = TempGuard::new(tmp.clone());
    let mut out = File::create(&tmp)?;

    input.seek(SeekFrom::Start(0))?;

    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);
    let keys = derive_keys(passphrase, &salt, params)?;

    // reserve the header region; the tag is rewritten once known
    let mut header = FileHeader {
        salt,
        argon_time: params.time_cost,
        argon_memory_kib: params.memory_kib,
        argon_lanes: params.lanes,
        tag: [0u8; MAC_SIZE],
    };
    header.write_to(&mut out)?;

    let mut writer = EncryptWriter::new(
        &keys.cipher,
        TeeWriter::new(&mut out, MacSink::new(&keys.mac)),
    );
    copy_chunked(input, &mut writer)?;
    let (_, mac) = writer.finish()?.into_parts();
    header.tag = mac.finalize();

    out.seek(SeekFrom::Start(0))?;
    header.write_to(&mut out)?;
    out.sync_all()?;
    drop(out);

    fs::rename(&tmp, output)?;
    guard.disarm();
    Ok(())
}

/// Decrypt `input` to `output`.
///
/// The whole ciphertext region is authenticated before any plaintext is
/// written. A wrong passphrase and a tampered file are indistinguishable:
/// both surface as [`CofferError::BadMac`].
pub fn decrypt_file<R: Read + Seek>(
    passphrase: &SecretString,
    input: &mut R,
    output: &Path,
) -> CofferResult<()> {
    let tmp = temp_path(output);
    let mut guard = TempGuard::new(tmp.clone());
    let mut out = File::create(&tmp)?;

    input.seek(SeekFrom::Start(0))?;
    let header = FileHeader::read_from(input).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            CofferError::Malformed("file too short to hold a header".into())
        }
        _ => CofferError::Io(e),
    })?;
    let ciphertext_offset = input.stream_position()?;

    let params = KdfParams {
        time_cost: header.argon_time,
        memory_kib: header.argon_memory_kib,
        lanes: header.argon_lanes,
    };
    let keys = derive_keys(passphrase, &header.salt, &params)?;

    // pass 1: authenticate every ciphertext byte before decrypting any
    let mut sink = MacSink::new(&keys.mac);
    io::copy(input, &mut sink)?;
    if !sink.verify(&header.tag) {
        return Err(CofferError::BadMac);
    }

    // pass 2: decrypt
    input.seek(SeekFrom::Start(ciphertext_offset))?;
    let mut reader = DecryptReader::new(&keys.cipher, input);
    io::copy(&mut reader, &mut out)?;
    out.sync_all()?;
    drop(out);

    fs::rename(&tmp, output)?;
    guard.disarm();
    Ok(())
}
