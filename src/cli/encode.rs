use super::input::read_raw_profile;
use super::mnemonic::{determine_mnemonic_source, load_encoder};
use clap::ValueEnum;
use std::fs;
use strmatch::profile::AlleleRange;
use strmatch::serialization;
use tracing::info;

/// Encoded profile output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON, digests as hex
    Json,
    /// CBOR, digests as raw bytes (requires --output)
    Cbor,
}

/// Pseudonymize one plaintext profile under this enclave's key
///
/// An ephemeral key is refused here: its digests could never be compared.
pub fn execute(
    profile: String,
    mnemonic_file: Option<String>,
    format: OutputFormat,
    output: Option<String>,
    range: AlleleRange,
) -> Result<(), Box<dyn std::error::Error>> {
    if format == OutputFormat::Cbor && output.is_none() {
        return Err("CBOR output requires --output".into());
    }

    let raw = read_raw_profile(&profile)?;
    let source = determine_mnemonic_source(mnemonic_file, false);
    let mut encoder = load_encoder(&source, range)?;

    let encoded = encoder.encode_raw(&raw)?;
    encoder.dispose();
    info!(profile = %encoded.id(), loci = encoded.len(), enclave = %encoded.enclave(), "Encoded profile");

    let bytes = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_vec_pretty(&encoded)?;
            json.push(b'\n');
            json
        }
        OutputFormat::Cbor => serialization::to_cbor(&encoded)?,
    };

    match output {
        Some(path) => {
            fs::write(&path, bytes).map_err(|e| format!("Failed to write '{}': {}", path, e))?;
            eprintln!("Wrote {}", path);
        }
        None => print!("{}", String::from_utf8_lossy(&bytes)),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::mnemonic::{generate_mnemonic, save_mnemonic_to_file};
    use strmatch::crypto::EncodedProfile;
    use tempfile::TempDir;

    fn fixture(temp_dir: &TempDir) -> (String, String) {
        let profile = temp_dir.path().join("profile.json");
        fs::write(
            &profile,
            r#"{"id": "S-1", "markers": {"FGA": [20, 22], "vWA": [16, 17]}}"#,
        )
        .unwrap();

        let phrase = temp_dir.path().join("enclave.mnemonic");
        save_mnemonic_to_file(&generate_mnemonic().unwrap(), &phrase).unwrap();

        (
            profile.to_string_lossy().to_string(),
            phrase.to_string_lossy().to_string(),
        )
    }

    #[test]
    fn test_cbor_requires_output() {
        let temp_dir = TempDir::new().unwrap();
        let (profile, phrase) = fixture(&temp_dir);

        let result = execute(
            profile,
            Some(phrase),
            OutputFormat::Cbor,
            None,
            AlleleRange::default(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_encode_to_cbor_file() {
        let temp_dir = TempDir::new().unwrap();
        let (profile, phrase) = fixture(&temp_dir);
        let out = temp_dir.path().join("encoded.cbor");

        execute(
            profile,
            Some(phrase),
            OutputFormat::Cbor,
            Some(out.to_string_lossy().to_string()),
            AlleleRange::default(),
        )
        .unwrap();

        let encoded: EncodedProfile = serialization::from_cbor(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(encoded.id(), "S-1");
        assert_eq!(encoded.len(), 2);
    }

    #[test]
    fn test_out_of_range_allele_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (profile, phrase) = fixture(&temp_dir);
        let out = temp_dir.path().join("encoded.json");

        let result = execute(
            profile,
            Some(phrase),
            OutputFormat::Json,
            Some(out.to_string_lossy().to_string()),
            AlleleRange::new(1, 18).unwrap(),
        );
        assert!(result.is_err());
        assert!(!out.exists());
    }
}
