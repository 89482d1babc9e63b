use super::input::read_raw_profile;
use serde::Serialize;
use std::collections::BTreeMap;
use strmatch::matching::{compare, Tier, TierThresholds};
use strmatch::profile::{AlleleRange, Locus, Profile};

#[derive(Debug, Serialize)]
struct ScoreReport<'a> {
    first: &'a str,
    second: &'a str,
    score: f64,
    tier: Tier,
    confidence: &'static str,
    compared_loci: usize,
    shared_alleles: usize,
    total_alleles: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<BTreeMap<Locus, bool>>,
}

/// Score two plaintext profiles locally and print the result as JSON
pub fn execute(
    first: String,
    second: String,
    breakdown: bool,
    range: AlleleRange,
    thresholds: TierThresholds,
) -> Result<(), Box<dyn std::error::Error>> {
    let a = Profile::from_raw(&read_raw_profile(&first)?, &range)?;
    let b = Profile::from_raw(&read_raw_profile(&second)?, &range)?;

    let comparison = compare(&a, &b);
    let tier = thresholds.classify(comparison.score);

    let report = ScoreReport {
        first: a.id(),
        second: b.id(),
        score: comparison.score,
        tier,
        confidence: tier.confidence(),
        compared_loci: comparison.compared_loci(),
        shared_alleles: comparison.shared_alleles,
        total_alleles: comparison.total_alleles,
        breakdown: breakdown.then(|| comparison.breakdown()),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_score_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.json");
        let second = temp_dir.path().join("b.json");
        fs::write(&first, r#"{"id": "A", "markers": {"FGA": [20, 22]}}"#).unwrap();
        fs::write(&second, r#"{"id": "B", "markers": {"FGA": [20, 23]}}"#).unwrap();

        let result = execute(
            first.to_string_lossy().to_string(),
            second.to_string_lossy().to_string(),
            true,
            AlleleRange::default(),
            TierThresholds::default(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_score_rejects_invalid_profile() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.json");
        fs::write(&first, r#"{"id": "A", "markers": {"NOPE": [20, 22]}}"#).unwrap();
        let path = first.to_string_lossy().to_string();

        let result = execute(
            path.clone(),
            path,
            false,
            AlleleRange::default(),
            TierThresholds::default(),
        );
        assert!(result.is_err());
    }
}
