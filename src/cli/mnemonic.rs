use std::fs;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use strmatch::crypto::{EnclaveKey, Encoder};
use strmatch::profile::AlleleRange;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Env var holding an enclave mnemonic (testing only)
pub const MNEMONIC_ENV_VAR: &str = "STRMATCH_ENCLAVE_MNEMONIC";

/// Where the enclave mnemonic comes from, checked in order
#[derive(Debug, PartialEq, Eq)]
pub enum MnemonicSource {
    /// From --mnemonic-file /path/to/phrase
    File(String),
    /// From STRMATCH_ENCLAVE_MNEMONIC (fallback, warned as insecure)
    EnvVar,
    /// From stdin prompt (interactive, masked input)
    Stdin,
    /// Fresh random key for this run only
    Ephemeral,
}

/// Generate a BIP-39 enclave mnemonic (24 words, 256 bits entropy)
pub fn generate_mnemonic() -> Result<Zeroizing<String>, Box<dyn std::error::Error>> {
    use bip39::{Language, Mnemonic};
    use rand::RngCore;

    let mut entropy = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut entropy[..]);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy[..])
        .map_err(|e| format!("Failed to generate BIP-39 mnemonic: {}", e))?;

    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Determine mnemonic source from CLI arguments
///
/// 1. `--mnemonic-file` wins
/// 2. then STRMATCH_ENCLAVE_MNEMONIC
/// 3. then an ephemeral key when the command allows one
/// 4. otherwise prompt on stdin
pub fn determine_mnemonic_source(
    mnemonic_file: Option<String>,
    allow_ephemeral: bool,
) -> MnemonicSource {
    if let Some(file) = mnemonic_file {
        MnemonicSource::File(file)
    } else if std::env::var(MNEMONIC_ENV_VAR).is_ok() {
        MnemonicSource::EnvVar
    } else if allow_ephemeral {
        MnemonicSource::Ephemeral
    } else {
        MnemonicSource::Stdin
    }
}

/// Read an existing mnemonic. `Ephemeral` has no phrase and yields `None`.
pub fn read_mnemonic(
    source: &MnemonicSource,
) -> Result<Option<Zeroizing<String>>, Box<dyn std::error::Error>> {
    let phrase = match source {
        MnemonicSource::File(path) => {
            if !Path::new(path).exists() {
                return Err(format!("Mnemonic file not found: {}", path).into());
            }
            let contents = Zeroizing::new(
                fs::read_to_string(path)
                    .map_err(|e| format!("Failed to read mnemonic file: {}", e))?,
            );
            Zeroizing::new(contents.trim().to_string())
        }
        MnemonicSource::EnvVar => {
            warn!(
                "Using {} is insecure; prefer --mnemonic-file outside of testing",
                MNEMONIC_ENV_VAR
            );
            Zeroizing::new(
                std::env::var(MNEMONIC_ENV_VAR)
                    .map_err(|_| format!("{} env var not set", MNEMONIC_ENV_VAR))?,
            )
        }
        MnemonicSource::Stdin => Zeroizing::new(
            rpassword::prompt_password("Enter enclave mnemonic: ")
                .map_err(|e| format!("Failed to read mnemonic from stdin: {}", e))?,
        ),
        MnemonicSource::Ephemeral => return Ok(None),
    };

    if phrase.is_empty() {
        return Err("Mnemonic cannot be empty".into());
    }
    Ok(Some(phrase))
}

/// Build this enclave's encoder from the chosen source.
pub fn load_encoder(
    source: &MnemonicSource,
    range: AlleleRange,
) -> Result<Encoder, Box<dyn std::error::Error>> {
    let key = match read_mnemonic(source)? {
        Some(phrase) => EnclaveKey::from_mnemonic(&phrase)?,
        None => {
            info!("No enclave mnemonic supplied; using an ephemeral key");
            EnclaveKey::generate()?
        }
    };
    info!(enclave = %key.fingerprint(), "Enclave key ready");
    Ok(Encoder::new(key, range))
}

/// Display a generated mnemonic on stderr with warnings
pub fn display_generated_mnemonic(mnemonic: &str, saved_path: Option<&Path>) {
    eprintln!();
    eprintln!("═══════════════════════════════════════════════════════════════");
    eprintln!("  ENCLAVE MNEMONIC - SAVE THIS SECURELY");
    eprintln!("═══════════════════════════════════════════════════════════════");
    eprintln!();

    if let Some(path) = saved_path {
        eprintln!("  Saved to: {}", path.display());
    } else {
        eprintln!("  {}", mnemonic);
    }

    eprintln!();
    eprintln!("  Every party whose profiles must be comparable needs this exact");
    eprintln!("  phrase. Anyone holding it can test guesses against digests.");
    eprintln!("═══════════════════════════════════════════════════════════════");
    eprintln!();
}

/// Save mnemonic to file with 0600 permissions
pub fn save_mnemonic_to_file(mnemonic: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| format!("Failed to create mnemonic file: {}", e))?;

    writeln!(file, "{}", mnemonic).map_err(|e| format!("Failed to write mnemonic file: {}", e))?;

    Ok(())
}
