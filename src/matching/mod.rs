//! Matching: scoring, classification and batch ranking
//!
//! - `scorer`: Tanabe overlap over any [`Genotype`] (plaintext or encoded)
//! - `classifier`: score → [`Tier`] under configurable thresholds
//! - `batch`: concurrent one-query-many-candidates matching

pub mod batch;
pub mod classifier;
pub mod scorer;

#[cfg(test)]
mod proptests;

pub use batch::{
    BatchConfig, BatchError, BatchMatcher, BatchOutcome, BatchSummary, CancelHandle,
    CandidateError, CandidateFailure, MatchResult, ProfileInput,
};
pub use classifier::{classify, ThresholdError, Tier, TierThresholds};
pub use scorer::{compare, score, Comparison, Genotype, LocusComparison};
