//! Profile file readers shared by the commands.

use std::fs;
use std::path::Path;
use strmatch::crypto::EncodedProfile;
use strmatch::matching::{CandidateError, CandidateFailure};
use strmatch::profile::RawProfile;
use strmatch::serialization;
use tracing::warn;

fn read_file(path: &str, what: &str) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        return Err(format!("{} file not found: {}", what, path).into());
    }
    Ok(fs::read(path).map_err(|e| format!("Failed to read {} file '{}': {}", what, path, e))?)
}

/// One plaintext profile as JSON: `{"id": "...", "markers": {"FGA": [20, 22]}}`
pub fn read_raw_profile(path: &str) -> Result<RawProfile, Box<dyn std::error::Error>> {
    let bytes = read_file(path, "Profile")?;
    Ok(serde_json::from_slice(&bytes)
        .map_err(|e| format!("Failed to parse profile '{}': {}", path, e))?)
}

/// A JSON array of plaintext profiles.
///
/// Records that do not have the profile shape are returned as per-candidate
/// errors, keyed by their `id` when one is present, else `#<index>`.
pub fn read_raw_profiles(
    path: &str,
) -> Result<(Vec<RawProfile>, Vec<CandidateError>), Box<dyn std::error::Error>> {
    let bytes = read_file(path, "Candidates")?;
    let records: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
        .map_err(|e| format!("Failed to parse candidates '{}': {}", path, e))?;

    let mut profiles = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (index, record) in records.into_iter().enumerate() {
        let candidate_id = record
            .get("id")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index));

        match serde_json::from_value::<RawProfile>(record) {
            Ok(profile) => profiles.push(profile),
            Err(e) => {
                warn!(candidate = %candidate_id, error = %e, "Malformed candidate record");
                rejected.push(CandidateError {
                    candidate_id,
                    error: CandidateFailure::Malformed(e.to_string()),
                });
            }
        }
    }

    Ok((profiles, rejected))
}

/// Encoded profiles as a CBOR array, or a single CBOR profile
pub fn read_encoded_profiles(
    path: &str,
) -> Result<Vec<EncodedProfile>, Box<dyn std::error::Error>> {
    let bytes = read_file(path, "Encoded candidates")?;

    // CBOR major type 4 is an array
    if bytes.first().is_some_and(|b| b >> 5 == 4) {
        let batch = serialization::from_cbor::<Vec<EncodedProfile>>(&bytes).map_err(|e| {
            format!("Failed to decode encoded candidate batch '{}': {}", path, e)
        })?;
        return Ok(batch);
    }

    let single: EncodedProfile = serialization::from_cbor(&bytes)
        .map_err(|e| format!("Failed to decode encoded candidate '{}': {}", path, e))?;
    Ok(vec![single])
}
