use super::config::StrmatchConfig;
use super::input::{read_encoded_profiles, read_raw_profile, read_raw_profiles};
use super::mnemonic::{determine_mnemonic_source, load_encoder};
use std::sync::Arc;
use std::time::Duration;
use strmatch::matching::{BatchMatcher, BatchOutcome, CancelHandle, ProfileInput};
use tracing::{info, warn};

/// Arguments for `strmatch match`
#[derive(Debug, Default)]
pub struct MatchArgs {
    pub query: String,
    pub candidates: Option<String>,
    pub encoded_candidates: Option<String>,
    pub threshold: Option<f64>,
    pub top_n: Option<usize>,
    pub breakdown: bool,
    pub timeout_ms: Option<u64>,
    pub mnemonic_file: Option<String>,
}

/// Score a query against a candidate set and print the outcome as JSON
pub async fn execute(
    args: MatchArgs,
    config: &StrmatchConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = run(args, config).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

/// Score a query against a candidate set.
///
/// Pre-encoded candidates need the enclave mnemonic they were encoded under;
/// with plaintext candidates only, a throwaway key is used when none is given.
/// Malformed plaintext records are reported in the outcome's errors and do
/// not stop the batch.
pub async fn run(
    args: MatchArgs,
    config: &StrmatchConfig,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    if args.candidates.is_none() && args.encoded_candidates.is_none() {
        return Err("Provide --candidates and/or --encoded-candidates".into());
    }

    let query = read_raw_profile(&args.query)?;

    let mut candidates: Vec<ProfileInput> = Vec::new();
    let mut rejected = Vec::new();
    if let Some(path) = &args.candidates {
        let (profiles, malformed) = read_raw_profiles(path)?;
        candidates.extend(profiles.into_iter().map(ProfileInput::from));
        rejected = malformed;
    }
    if let Some(path) = &args.encoded_candidates {
        candidates.extend(read_encoded_profiles(path)?.into_iter().map(ProfileInput::from));
    }
    info!(
        query = %query.id,
        candidates = candidates.len(),
        malformed = rejected.len(),
        "Loaded candidates"
    );

    let source = determine_mnemonic_source(args.mnemonic_file, args.encoded_candidates.is_none());
    let encoder = Arc::new(load_encoder(&source, config.profile)?);

    let mut batch_config = config.batch.clone();
    if args.top_n.is_some() {
        batch_config.top_n = args.top_n;
    }
    batch_config.include_breakdown |= args.breakdown;

    let matcher = BatchMatcher::new(encoder, config.thresholds, batch_config);

    let cancel = CancelHandle::new();
    if let Some(ms) = args.timeout_ms {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            warn!(timeout_ms = ms, "Match timed out; returning partial results");
            cancel.cancel();
        });
    }

    let mut outcome = matcher
        .match_batch_with_cancel(ProfileInput::from(query), candidates, args.threshold, &cancel)
        .await?;
    outcome.record_rejected(rejected);

    Ok(outcome)
}
