/*!
Bayesian audit simulation engine for plurality elections.

Given the ballots sampled so far in each county, this crate estimates the
probability that each candidate would win a full hand recount. The unsampled
ballots of every county are filled in from a Dirichlet-multinomial posterior
(a flat prior of one vote per candidate plus the sample), many times over, and
the fraction of simulated worlds each candidate wins is reported.

The same machinery also powers:
- [`risk::estimate_risk`]: how often a Bayesian audit with a given sample size
  would fail to notice a wrong outcome, for a hypothesized true margin;
- [`allocate::allocate_additional_samples`]: how many extra ballots to draw in
  each county when escalating an audit.

All randomness is reproducible: the same [`Seed`] gives the same answer, for
any number of worker threads.

```
use bayes_audit::builder::Builder;
use bayes_audit::{estimate_win_probabilities, AuditParams};
# use bayes_audit::AuditError;

let contest = Builder::new(&["Alice".to_string(), "Bob".to_string()])?
    .county("1", 1000, &[30, 15])?
    .county("2", 2000, &[40, 50])?
    .build()?;
let params = AuditParams {
    num_trials: 200,
    ..AuditParams::default()
};
let res = estimate_win_probabilities(&contest, &params)?;
assert_eq!(res.win_counts.iter().sum::<u64>(), 200);
# Ok::<(), AuditError>(())
```
*/

pub mod allocate;
pub mod builder;
mod config;
pub mod manual;
mod nonsample;
pub mod risk;
mod rng;
mod workers;

use log::{debug, info};

pub use crate::config::*;
pub use crate::nonsample::{
    dirichlet_multinomial, generate_nonsample_tally, generate_nonsample_tally_with_prior,
    DEFAULT_PRIOR_PSEUDOCOUNT,
};
pub use crate::rng::{create_generator, AuditRng, Seed};

/// Seed increment between two consecutive trials.
///
/// Incrementing by one correlates the streams of consecutive trials with the
/// generator's own internal counter; a large odd stride does not.
pub const TRIAL_SEED_STRIDE: u64 = 314_159_265;

/// Seed increment between two counties of the same trial, only used with
/// [`SeedingMode::IndependentPerCounty`].
pub const COUNTY_SEED_STRIDE: u64 = 271_828_183;

/// The seed of trial `trial_index`: `base_seed + trial_index * 314159265`.
pub fn trial_seed(base_seed: &Seed, trial_index: u64) -> Seed {
    base_seed.advanced(TRIAL_SEED_STRIDE, trial_index)
}

fn county_seed(trial_seed: &Seed, county_index: usize, mode: SeedingMode) -> Seed {
    match mode {
        SeedingMode::SharedPerTrial => trial_seed.clone(),
        SeedingMode::IndependentPerCounty => {
            trial_seed.advanced(COUNTY_SEED_STRIDE, county_index as u64)
        }
    }
}

/// Runs one simulated world with the given seed.
///
/// Every county is completed with a nonsample tally, the final county tallies
/// are summed over the contest and the candidate with the most votes wins.
/// Ties go to the candidate listed first.
pub fn resolve_trial(contest: &Contest, seed: &Seed, params: &AuditParams) -> Result<Trial, AuditError> {
    let num_candidates = contest.num_candidates();
    let mut nonsample_tallies: Vec<Tally> = Vec::with_capacity(contest.counties().len());
    let mut final_tallies: Vec<Tally> = Vec::with_capacity(contest.counties().len());
    let mut contest_tally = Tally::zeros(num_candidates);

    for (idx, county) in contest.counties().iter().enumerate() {
        let cseed = county_seed(seed, idx, params.seeding_mode);
        let nonsample_tally =
            nonsample::county_nonsample_tally(county, &cseed, params.prior_pseudocount)?;
        let mut final_county_tally = county.sample_tally.clone();
        final_county_tally += &nonsample_tally;
        contest_tally += &final_county_tally;
        nonsample_tallies.push(nonsample_tally);
        final_tallies.push(final_county_tally);
    }

    let winner = contest_tally.leader().ok_or_else(|| {
        AuditError::ArithmeticDegenerate("no candidate in the contest tally".to_string())
    })?;
    debug!(
        "resolve_trial: seed {}: candidate {} wins with tally {:?}",
        seed, winner, contest_tally
    );
    Ok(Trial {
        seed: seed.clone(),
        nonsample_tallies,
        final_tallies,
        contest_tally,
        winner,
    })
}

/// The winner of a single simulated world, with all the counties drawn from
/// the same seed.
pub fn resolve_winner(contest: &Contest, seed: &Seed) -> Result<usize, AuditError> {
    resolve_trial(contest, seed, &AuditParams::default()).map(|t| t.winner)
}

fn count_wins(
    contest: &Contest,
    params: &AuditParams,
    trials: std::ops::Range<u64>,
) -> Result<Vec<u64>, AuditError> {
    let mut win_count = vec![0u64; contest.num_candidates()];
    for i in trials {
        let seed_i = trial_seed(&params.seed, i);
        let trial = resolve_trial(contest, &seed_i, params)?;
        win_count[trial.winner] += 1;
    }
    Ok(win_count)
}

/// Estimates the probability of each candidate winning a full recount.
///
/// Runs `params.num_trials` independent trials, trial `i` being seeded with
/// [`trial_seed`]`(params.seed, i)`. Any failing trial fails the whole
/// estimation.
pub fn estimate_win_probabilities(
    contest: &Contest,
    params: &AuditParams,
) -> Result<WinProbabilities, AuditError> {
    if params.num_trials == 0 {
        return Err(AuditError::InvalidInput(
            "the number of trials must be positive".to_string(),
        ));
    }
    info!(
        "estimate_win_probabilities: {} counties, {} candidates, {} trials, seed {}, mode {:?}",
        contest.counties().len(),
        contest.num_candidates(),
        params.num_trials,
        params.seed,
        params.seeding_mode
    );

    let partial_counts = workers::run_partitioned(params.num_trials, params.num_threads, |r| {
        count_wins(contest, params, r)
    })?;
    let mut win_counts = vec![0u64; contest.num_candidates()];
    for partial in partial_counts.iter() {
        for (total, c) in win_counts.iter_mut().zip(partial.iter()) {
            *total += c;
        }
    }

    let res = WinProbabilities {
        num_trials: params.num_trials,
        win_counts,
    };
    info!("estimate_win_probabilities: win counts {:?}", res.win_counts);
    Ok(res)
}
