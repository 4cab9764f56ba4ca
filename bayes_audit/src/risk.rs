//! Estimating the risk of a Bayesian audit for a hypothesized outcome.
//!
//! This is a calibration tool to choose sample sizes, not part of a live
//! audit: it builds a synthetic ballot universe with a known winner, draws many
//! samples from it, and measures how often the posterior would still give the
//! election to someone else.

use log::{debug, info, warn};

use crate::config::{AuditError, Tally};
use crate::nonsample::generate_nonsample_tally_with_prior;
use crate::rng::{create_generator, Seed};
use crate::workers;

/// Seed increment between two samples of the same universe.
pub const SAMPLE_SEED_STRIDE: u64 = 31_415;

/// Seed increment between two trials of the same sample.
pub const RISK_TRIAL_SEED_STRIDE: u64 = 6_723;

/// The hypothesized true outcome of the election.
#[derive(PartialEq, Debug, Clone)]
pub enum Hypothesis {
    /// Two candidates, the winner ahead by this many percentage points.
    Margin(f64),
    /// One vote share per candidate, in percent, summing to 100.
    VoteShares(Vec<f64>),
}

#[derive(PartialEq, Debug, Clone)]
pub struct RiskParams {
    pub trials_per_sample: u64,
    pub num_samples: u64,
    pub seed: Seed,
    pub prior_pseudocount: u64,
    pub num_threads: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            trials_per_sample: 1000,
            num_samples: 50,
            seed: Seed::from(1u64),
            prior_pseudocount: crate::nonsample::DEFAULT_PRIOR_PSEUDOCOUNT,
            num_threads: 1,
        }
    }
}

/// The number of ballots of each candidate in the synthetic universe.
///
/// Candidate 0 is the hypothesized winner and candidate 1 the runner-up. The
/// counts always sum to `total_num_votes`.
///
/// With vote shares, the votes lost to flooring all go to candidate 1, which
/// can put it ahead of candidate 0 in small universes (33.3/33.3/33.4 over 10
/// votes gives `[3, 4, 3]`). The risk is still measured against candidate 0.
pub fn ballot_counts(total_num_votes: u64, hypothesis: &Hypothesis) -> Result<Vec<u64>, AuditError> {
    match hypothesis {
        Hypothesis::Margin(margin) => {
            if !(margin.is_finite() && (-100.0..=100.0).contains(margin)) {
                return Err(AuditError::InvalidInput(format!(
                    "the margin must be between -100 and 100 percent, got {}",
                    margin
                )));
            }
            let winner = (total_num_votes as f64 * (1.0 + margin / 100.0) / 2.0).floor() as u64;
            let winner = winner.min(total_num_votes);
            Ok(vec![winner, total_num_votes - winner])
        }
        Hypothesis::VoteShares(shares) => {
            if shares.len() < 2 {
                return Err(AuditError::InvalidInput(
                    "vote shares need at least two candidates".to_string(),
                ));
            }
            if shares.iter().any(|s| !(s.is_finite() && *s >= 0.0)) {
                return Err(AuditError::InvalidInput(format!(
                    "vote shares must be non-negative: {:?}",
                    shares
                )));
            }
            let share_sum: f64 = shares.iter().sum();
            if (share_sum - 100.0).abs() > 1e-6 {
                return Err(AuditError::InvalidInput(format!(
                    "vote shares must sum to 100, got {}",
                    share_sum
                )));
            }
            let mut counts: Vec<u64> = shares
                .iter()
                .map(|s| (total_num_votes as f64 * s / 100.0).floor() as u64)
                .collect();
            counts.sort_unstable_by(|a, b| b.cmp(a));
            let assigned: u64 = counts.iter().sum();
            if assigned > total_num_votes {
                return Err(AuditError::InvalidInput(format!(
                    "vote shares {:?} assign {} votes out of {}",
                    shares, assigned, total_num_votes
                )));
            }
            // The rounding shortfall goes to the runner-up.
            counts[1] += total_num_votes - assigned;
            Ok(counts)
        }
    }
}

/// A flat, unshuffled list of ballots: `counts[0]` copies of label 0, then
/// `counts[1]` copies of label 1, and so on.
pub fn generate_ballots(counts: &[u64]) -> Vec<usize> {
    let mut ballots: Vec<usize> = Vec::with_capacity(counts.iter().sum::<u64>() as usize);
    for (label, &count) in counts.iter().enumerate() {
        ballots.extend(std::iter::repeat(label).take(count as usize));
    }
    ballots
}

/// Shuffles the ballots in a reproducible order given by the seed.
pub fn shuffle_ballots(ballots: &mut [usize], seed: &Seed) {
    let mut rng = create_generator(Some(seed));
    rng.shuffle(ballots);
}

/// The risk estimate for one sample: the fraction of trials in which some
/// other candidate catches up with candidate 0 once the unsampled ballots are
/// filled in.
fn sample_risk(
    universe: &[usize],
    num_candidates: usize,
    sample_size: u64,
    sample_seed: &Seed,
    params: &RiskParams,
) -> Result<f64, AuditError> {
    let mut ballots = universe.to_vec();
    shuffle_ballots(&mut ballots, sample_seed);

    let mut sample_tally = Tally::zeros(num_candidates);
    for &label in ballots[..sample_size as usize].iter() {
        sample_tally.0[label] += 1;
    }
    let total_num_votes = universe.len() as u64;

    let mut failures: u64 = 0;
    for trial in 1..=params.trials_per_sample {
        let seed_i = sample_seed.advanced(RISK_TRIAL_SEED_STRIDE, trial);
        let mut final_tally = generate_nonsample_tally_with_prior(
            &sample_tally,
            total_num_votes,
            &seed_i,
            params.prior_pseudocount,
        )?;
        final_tally += &sample_tally;
        let winner_votes = final_tally.0[0];
        if final_tally.0[1..].iter().any(|&v| v >= winner_votes) {
            failures += 1;
        }
    }
    let risk = failures as f64 / params.trials_per_sample as f64;
    debug!(
        "sample_risk: seed {} sample {:?}: risk {}",
        sample_seed, sample_tally, risk
    );
    Ok(risk)
}

/// Estimates the Bayesian risk of auditing `sample_size` ballots when the true
/// outcome is `hypothesis`.
///
/// Sample `k` (counting from 1) is drawn with seed `seed + k * 31415` from its
/// own copy of the universe, and its trial `j` (counting from 1) uses
/// `sample_seed + j * 6723`. The result is the mean risk over all samples.
pub fn estimate_risk(
    total_num_votes: u64,
    hypothesis: &Hypothesis,
    sample_size: u64,
    params: &RiskParams,
) -> Result<f64, AuditError> {
    if sample_size > total_num_votes {
        return Err(AuditError::InsufficientVotes {
            county: String::new(),
            sample_size,
            total_num_votes,
        });
    }
    if params.trials_per_sample == 0 || params.num_samples == 0 {
        return Err(AuditError::InvalidInput(
            "the number of samples and of trials per sample must be positive".to_string(),
        ));
    }
    let counts = ballot_counts(total_num_votes, hypothesis)?;
    if counts[1] > counts[0] {
        warn!(
            "estimate_risk: after rounding, candidate 1 has more ballots than candidate 0: {:?}",
            counts
        );
    }
    info!(
        "estimate_risk: ballots per candidate {:?}, sample size {}, {} samples x {} trials",
        counts, sample_size, params.num_samples, params.trials_per_sample
    );
    let universe = generate_ballots(&counts);

    let partial_risks = workers::run_partitioned(params.num_samples, params.num_threads, |r| {
        let mut risks: Vec<f64> = Vec::new();
        for k in r {
            let sample_seed = params.seed.advanced(SAMPLE_SEED_STRIDE, k + 1);
            risks.push(sample_risk(
                &universe,
                counts.len(),
                sample_size,
                &sample_seed,
                params,
            )?);
        }
        Ok(risks)
    })?;
    let risk_sum: f64 = partial_risks.iter().flatten().sum();
    let risk = risk_sum / params.num_samples as f64;
    info!("estimate_risk: estimated risk {}", risk);
    Ok(risk)
}
