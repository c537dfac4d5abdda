//! coffer: passphrase-based file-at-rest encryption
//!
//! Usage:
//!   coffer -o <output> <input>       encrypt <input> into <output>
//!   coffer -o <output> -d <input>    decrypt <input> into <output>
//!
//! The passphrase is read from the controlling terminal with echo disabled,
//! never from arguments or the environment. Encryption prompts twice and
//! requires both entries to match.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use secrecy::SecretString;
use tracing::info;
use zeroize::Zeroize;

use coffer_core::{decrypt_file, encrypt_file};

#[derive(Parser, Debug)]
#[command(
    name = "coffer",
    version,
    about = "Encrypt or decrypt a file with a passphrase"
)]
struct Cli {
    /// Destination path (written atomically via a sibling .temp file)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Decrypt instead of encrypt
    #[arg(short = 'd', long = "decrypt")]
    decrypt: bool,

    /// Print progress information to stderr
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Source file
    input: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let passphrase = read_passphrase(cli.decrypt)?;

    let mut input = File::open(&cli.input)
        .with_context(|| format!("could not open input file {}", cli.input.display()))?;

    if cli.decrypt {
        info!(input = %cli.input.display(), output = %cli.output.display(), "decrypting");
        decrypt_file(&passphrase, &mut input, &cli.output)
            .with_context(|| format!("could not decrypt {}", cli.input.display()))?;
    } else {
        info!(input = %cli.input.display(), output = %cli.output.display(), "encrypting");
        encrypt_file(&passphrase, &mut input, &cli.output)
            .with_context(|| format!("could not encrypt {}", cli.input.display()))?;
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prompt on the controlling terminal with local echo disabled.
fn read_passphrase(decrypt: bool) -> Result<SecretString> {
    let passphrase =
        rpassword::prompt_password("Passphrase: ").context("failed to read passphrase")?;
    if !decrypt {
        let mut confirm = rpassword::prompt_password("Confirm passphrase: ")
            .context("failed to read confirmation")?;
        let matches = confirm == passphrase;
        confirm.zeroize();
        if !matches {
            bail!("passphrases do not match");
        }
    }
    Ok(SecretString::from(passphrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_encrypt() {
        let cli = Cli::parse_from(["coffer", "-o", "notes.enc", "notes.txt"]);
        assert!(!cli.decrypt);
        assert_eq!(cli.output, PathBuf::from("notes.enc"));
        assert_eq!(cli.input, PathBuf::from("notes.txt"));
    }

    #[test]
    fn test_parse_decrypt() {
        let cli = Cli::parse_from(["coffer", "-o", "notes.txt", "-d", "notes.enc"]);
        assert!(cli.decrypt);
    }

    #[test]
    fn test_missing_output_is_an_error() {
        assert!(Cli::try_parse_from(["coffer", "notes.txt"]).is_err());
    }

    #[test]
    fn test_missing_input_is_an_error() {
        assert!(Cli::try_parse_from(["coffer", "-o", "notes.enc"]).is_err());
    }
}
