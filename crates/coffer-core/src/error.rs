use thiserror::Error;

pub type CofferResult<T> = Result<T, CofferError>;

#[derive(Debug, Error)]
pub enum CofferError {
    /// Wrong passphrase or tampered ciphertext; the two are
    /// indistinguishable from the outside.
    #[error("authentication failed")]
    BadMac,

    #[error("malformed ciphertext file: {0}")]
    Malformed(String),

    #[error("key derivation error: {0}")]
    Kdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
