use super::mnemonic::{display_generated_mnemonic, generate_mnemonic, save_mnemonic_to_file};
use std::path::Path;
use strmatch::crypto::EnclaveKey;

/// Generate a fresh enclave mnemonic
///
/// The phrase goes to `--output` (mode 0600) or stderr. Only the non-secret
/// fingerprint is written to stdout.
pub fn execute(output: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let phrase = generate_mnemonic()?;
    let key = EnclaveKey::from_mnemonic(&phrase)?;

    match output.as_deref().map(Path::new) {
        Some(path) => {
            if path.exists() {
                return Err(format!("Refusing to overwrite '{}'", path.display()).into());
            }
            save_mnemonic_to_file(&phrase, path)?;
            display_generated_mnemonic(&phrase, Some(path));
        }
        None => display_generated_mnemonic(&phrase, None),
    }

    println!("{}", key.fingerprint());
    Ok(())
}
