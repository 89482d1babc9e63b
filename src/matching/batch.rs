//! Batch matching of one query against many candidates
//!
//! Each candidate is encoded (unless it arrives pre-encoded), scored against
//! the encoded query and classified in its own blocking task. The only shared
//! state is the encoder, which is read-only and handed to workers by `Arc`.
//!
//! ## Ordering
//!
//! Results are collected first and sorted afterwards (score descending, then
//! candidate id ascending), so worker completion order never shows in the
//! output.
//!
//! ## Partial Failure
//!
//! A candidate that fails validation, fails to encode, or was encoded under a
//! different enclave key is reported in [`BatchOutcome::errors`]; the rest of
//! the batch still runs.
//!
//! ## Cancellation
//!
//! Once a [`CancelHandle`] is cancelled no further candidates are dispatched.
//! Tasks already running finish, and the partial result set is returned sorted
//! with `summary.cancelled` set.

use crate::crypto::{EncodeError, EncodedProfile, Encoder, KeyFingerprint};
use crate::matching::classifier::{validate_min_score, ThresholdError, Tier, TierThresholds};
use crate::matching::scorer::compare;
use crate::profile::{Locus, Profile, ProfileError, RawProfile};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, info, warn};

/// Fallback worker count when the host parallelism cannot be read
const FALLBACK_WORKERS: usize = 4;

/// Placeholder id for a task whose candidate was never recorded
const UNKNOWN_CANDIDATE: &str = "<unknown>";

/// A profile in any of the shapes the matcher accepts.
#[derive(Debug, Clone)]
pub enum ProfileInput {
    /// Unvalidated; checked against the encoder's allele range.
    Raw(RawProfile),
    Plain(Profile),
    /// Already encoded; must carry this matcher's enclave fingerprint.
    Encoded(EncodedProfile),
}

impl ProfileInput {
    pub fn id(&self) -> &str {
        match self {
            ProfileInput::Raw(raw) => &raw.id,
            ProfileInput::Plain(profile) => profile.id(),
            ProfileInput::Encoded(encoded) => encoded.id(),
        }
    }
}

impl From<RawProfile> for ProfileInput {
    fn from(raw: RawProfile) -> Self {
        ProfileInput::Raw(raw)
    }
}

impl From<Profile> for ProfileInput {
    fn from(profile: Profile) -> Self {
        ProfileInput::Plain(profile)
    }
}

impl From<EncodedProfile> for ProfileInput {
    fn from(encoded: EncodedProfile) -> Self {
        ProfileInput::Encoded(encoded)
    }
}

/// Why a single profile could not be scored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandidateFailure {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("encoded under enclave {found}, expected {expected}")]
    EnclaveMismatch {
        expected: KeyFingerprint,
        found: KeyFingerprint,
    },

    /// The record could not be read as a profile at all.
    #[error("malformed profile record: {0}")]
    Malformed(String),

    #[error("scoring task failed: {0}")]
    Worker(String),
}

impl CandidateFailure {
    /// Same failure with any plaintext allele value removed.
    pub fn redacted(&self) -> Self {
        match self {
            CandidateFailure::Profile(e) => CandidateFailure::Profile(e.clone().redacted()),
            CandidateFailure::Encode(EncodeError::Profile(e)) => {
                CandidateFailure::Encode(EncodeError::Profile(e.clone().redacted()))
            }
            other => other.clone(),
        }
    }
}

/// Per-candidate error recorded in a batch outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateError {
    pub candidate_id: String,
    #[serde(serialize_with = "serialize_display")]
    pub error: CandidateFailure,
}

impl CandidateError {
    pub fn redacted(&self) -> Self {
        Self {
            candidate_id: self.candidate_id.clone(),
            error: self.error.redacted(),
        }
    }
}

fn serialize_display<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Errors that abort a whole batch.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("query profile '{query_id}' rejected: {source}")]
    Query {
        query_id: String,
        #[source]
        source: CandidateFailure,
    },

    #[error(transparent)]
    Threshold(#[from] ThresholdError),
}

/// Score and tier for one candidate. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub query_id: String,
    pub candidate_id: String,
    pub score: f64,
    pub tier: Tier,
    pub compared_loci: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<BTreeMap<Locus, bool>>,
}

/// Batch tuning, loaded from the `[batch]` config section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BatchConfig {
    /// Concurrent scoring tasks; 0 uses the host's available parallelism
    pub max_workers: usize,

    /// Keep only the best N results after sorting
    pub top_n: Option<usize>,

    /// Attach the per-locus shared/not-shared breakdown to each result
    pub include_breakdown: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: 0,
            top_n: None,
            include_breakdown: false,
        }
    }
}

impl BatchConfig {
    fn worker_limit(&self) -> usize {
        if self.max_workers > 0 {
            return self.max_workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(FALLBACK_WORKERS)
    }
}

/// Counters describing one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub query_id: String,
    pub submitted: usize,
    pub scored: usize,
    pub failed: usize,
    /// Scored but below the caller's minimum score, or cut by `top_n`
    pub filtered: usize,
    pub top_score: Option<f64>,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<MatchResult>,
    pub errors: Vec<CandidateError>,
    pub summary: BatchSummary,
}

impl BatchOutcome {
    /// Fold in candidates rejected before they reached the matcher, such as
    /// records that failed to parse. They count as submitted and failed.
    pub fn record_rejected<I>(&mut self, rejected: I)
    where
        I: IntoIterator<Item = CandidateError>,
    {
        let before = self.errors.len();
        self.errors.extend(rejected);
        let added = self.errors.len() - before;

        self.summary.submitted += added;
        self.summary.failed += added;
        self.errors.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));
    }
}

/// Cooperative cancellation flag shared between a caller and a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Scores candidates against a query under one enclave's encoder.
#[derive(Debug, Clone)]
pub struct BatchMatcher {
    encoder: Arc<Encoder>,
    thresholds: TierThresholds,
    config: BatchConfig,
}

impl BatchMatcher {
    pub fn new(encoder: Arc<Encoder>, thresholds: TierThresholds, config: BatchConfig) -> Self {
        Self {
            encoder,
            thresholds,
            config,
        }
    }

    pub fn encoder(&self) -> &Arc<Encoder> {
        &self.encoder
    }

    pub fn thresholds(&self) -> &TierThresholds {
        &self.thresholds
    }

    /// Compare one candidate against a query on the current thread.
    pub fn match_one(
        &self,
        query: ProfileInput,
        candidate: ProfileInput,
    ) -> Result<MatchResult, CandidateFailure> {
        let query = prepare(&self.encoder, query)?;
        score_candidate(
            &self.encoder,
            &query,
            candidate,
            &self.thresholds,
            self.config.include_breakdown,
        )
    }

    /// Score every candidate against `query`.
    ///
    /// `min_score`, when set, only filters the output; tier boundaries are
    /// unchanged.
    pub async fn match_batch<I>(
        &self,
        query: ProfileInput,
        candidates: I,
        min_score: Option<f64>,
    ) -> Result<BatchOutcome, BatchError>
    where
        I: IntoIterator<Item = ProfileInput>,
    {
        self.match_batch_with_cancel(query, candidates, min_score, &CancelHandle::new())
            .await
    }

    /// [`match_batch`](Self::match_batch) that stops dispatching once `cancel`
    /// is triggered.
    pub async fn match_batch_with_cancel<I>(
        &self,
        query: ProfileInput,
        candidates: I,
        min_score: Option<f64>,
        cancel: &CancelHandle,
    ) -> Result<BatchOutcome, BatchError>
    where
        I: IntoIterator<Item = ProfileInput>,
    {
        let min_score = min_score.map(validate_min_score).transpose()?;

        let query_id = query.id().to_string();
        let query = prepare(&self.encoder, query).map_err(|source| BatchError::Query {
            query_id: query_id.clone(),
            source: source.redacted(),
        })?;
        let query = Arc::new(query);

        let worker_limit = self.config.worker_limit();
        debug!(query = %query_id, workers = worker_limit, "Starting batch");

        let mut pending = candidates.into_iter();
        let mut tasks = JoinSet::new();
        let mut submitted = 0;
        let mut exhausted = false;
        let mut cancelled = false;

        let mut in_flight: HashMap<task::Id, String> = HashMap::new();
        let mut scored = Vec::new();
        let mut errors = Vec::new();

        loop {
            while !exhausted && tasks.len() < worker_limit {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                let Some(candidate) = pending.next() else {
                    exhausted = true;
                    break;
                };
                submitted += 1;

                let encoder = Arc::clone(&self.encoder);
                let query = Arc::clone(&query);
                let thresholds = self.thresholds;
                let include_breakdown = self.config.include_breakdown;

                let candidate_id = candidate.id().to_string();
                let handle = tasks.spawn_blocking(move || {
                    score_candidate(&encoder, &query, candidate, &thresholds, include_breakdown)
                });
                in_flight.insert(handle.id(), candidate_id);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((task_id, Ok(result))) => {
                    in_flight.remove(&task_id);
                    debug!(
                        candidate = %result.candidate_id,
                        score = result.score,
                        tier = %result.tier,
                        "Scored candidate"
                    );
                    scored.push(result);
                }
                Ok((task_id, Err(failure))) => {
                    let candidate_id = take_candidate_id(&mut in_flight, task_id);
                    warn!(candidate = %candidate_id, error = %failure.redacted(), "Skipping candidate");
                    errors.push(CandidateError {
                        candidate_id,
                        error: failure,
                    });
                }
                Err(e) => {
                    let candidate_id = take_candidate_id(&mut in_flight, e.id());
                    error!(candidate = %candidate_id, error = %e, "Scoring task failed");
                    errors.push(CandidateError {
                        candidate_id,
                        error: CandidateFailure::Worker(e.to_string()),
                    });
                }
            }

            if cancelled && tasks.is_empty() {
                break;
            }
        }

        let outcome = self.aggregate(query_id, submitted, scored, errors, min_score, cancelled);
        info!(
            query = %outcome.summary.query_id,
            submitted = outcome.summary.submitted,
            matched = outcome.results.len(),
            failed = outcome.summary.failed,
            cancelled = outcome.summary.cancelled,
            "Batch complete"
        );

        Ok(outcome)
    }

    fn aggregate(
        &self,
        query_id: String,
        submitted: usize,
        mut results: Vec<MatchResult>,
        mut errors: Vec<CandidateError>,
        min_score: Option<f64>,
        cancelled: bool,
    ) -> BatchOutcome {
        let scored = results.len();
        let top_score = results.iter().map(|r| r.score).reduce(f64::max);

        if let Some(min_score) = min_score {
            results.retain(|r| r.score >= min_score);
        }

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });

        if let Some(top_n) = self.config.top_n {
            results.truncate(top_n);
        }

        errors.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

        BatchOutcome {
            summary: BatchSummary {
                query_id,
                submitted,
                scored,
                failed: errors.len(),
                filtered: scored - results.len(),
                top_score,
                cancelled,
            },
            results,
            errors,
        }
    }
}

/// Candidate id for a finished task, recorded when it was spawned.
fn take_candidate_id(in_flight: &mut HashMap<task::Id, String>, task_id: task::Id) -> String {
    in_flight
        .remove(&task_id)
        .unwrap_or_else(|| UNKNOWN_CANDIDATE.to_string())
}

/// Bring any input into this enclave's encoded form.
fn prepare(encoder: &Encoder, input: ProfileInput) -> Result<EncodedProfile, CandidateFailure> {
    match input {
        ProfileInput::Raw(raw) => Ok(encoder.encode_raw(&raw)?),
        ProfileInput::Plain(profile) => Ok(encoder.encode(&profile)?),
        ProfileInput::Encoded(encoded) => {
            let expected = encoder.fingerprint().ok_or(EncodeError::MissingKey)?;
            if encoded.enclave() != expected {
                return Err(CandidateFailure::EnclaveMismatch {
                    expected,
                    found: encoded.enclave(),
                });
            }
            Ok(encoded)
        }
    }
}

fn score_candidate(
    encoder: &Encoder,
    query: &EncodedProfile,
    candidate: ProfileInput,
    thresholds: &TierThresholds,
    include_breakdown: bool,
) -> Result<MatchResult, CandidateFailure> {
    let candidate = prepare(encoder, candidate)?;
    let comparison = compare(query, &candidate);

    Ok(MatchResult {
        query_id: query.id().to_string(),
        candidate_id: candidate.id().to_string(),
        score: comparison.score,
        tier: thresholds.classify(comparison.score),
        compared_loci: comparison.compared_loci(),
        breakdown: include_breakdown.then(|| comparison.breakdown()),
    })
}
