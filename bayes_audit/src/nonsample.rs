use log::debug;

use crate::config::{AuditError, County, Tally};
use crate::rng::{create_generator, AuditRng, Seed};

/// The pseudocount of the flat prior: one extra vote per candidate.
pub const DEFAULT_PRIOR_PSEUDOCOUNT: u64 = 1;

/// Draws the votes of the unsampled ballots from the Dirichlet-multinomial
/// posterior.
///
/// Each candidate gets `count + pseudocount` as the shape of a unit-scale
/// Gamma draw. The normalized draws are the vote shares of a Multinomial over
/// the `total_num_votes - sum(sample_tally)` ballots not seen yet.
pub fn dirichlet_multinomial(
    sample_tally: &Tally,
    total_num_votes: u64,
    prior_pseudocount: u64,
    rng: &mut AuditRng,
) -> Result<Tally, AuditError> {
    let sample_size = sample_tally.checked_total().ok_or_else(|| {
        AuditError::InvalidInput(format!(
            "the sample counts {:?} add up to more than {}",
            sample_tally.counts(),
            u64::MAX
        ))
    })?;
    if sample_size > total_num_votes {
        return Err(AuditError::InsufficientVotes {
            county: String::new(),
            sample_size,
            total_num_votes,
        });
    }
    if sample_tally.is_empty() {
        return Err(AuditError::ArithmeticDegenerate(
            "cannot draw a nonsample tally without candidates".to_string(),
        ));
    }
    let nonsample_size = total_num_votes - sample_size;

    let mut gamma_sample: Vec<f64> = Vec::with_capacity(sample_tally.len());
    for count in sample_tally.counts() {
        let shape = count.checked_add(prior_pseudocount).ok_or_else(|| {
            AuditError::ArithmeticDegenerate(format!(
                "count {} plus pseudocount {} overflows",
                count, prior_pseudocount
            ))
        })?;
        gamma_sample.push(rng.gamma(shape as f64)?);
    }
    let gamma_sum: f64 = gamma_sample.iter().sum();
    if !(gamma_sum.is_finite() && gamma_sum > 0.0) {
        return Err(AuditError::ArithmeticDegenerate(format!(
            "gamma draws {:?} cannot be normalized",
            gamma_sample
        )));
    }
    let shares: Vec<f64> = gamma_sample.iter().map(|g| g / gamma_sum).collect();

    let counts = rng.multinomial(nonsample_size, &shares)?;
    Ok(Tally(counts))
}

/// Completes one partial tally with a fresh generator for `seed`.
pub fn generate_nonsample_tally(
    sample_tally: &Tally,
    total_num_votes: u64,
    seed: &Seed,
) -> Result<Tally, AuditError> {
    generate_nonsample_tally_with_prior(
        sample_tally,
        total_num_votes,
        seed,
        DEFAULT_PRIOR_PSEUDOCOUNT,
    )
}

pub fn generate_nonsample_tally_with_prior(
    sample_tally: &Tally,
    total_num_votes: u64,
    seed: &Seed,
    prior_pseudocount: u64,
) -> Result<Tally, AuditError> {
    let mut rng = create_generator(Some(seed));
    dirichlet_multinomial(sample_tally, total_num_votes, prior_pseudocount, &mut rng)
}

/// The nonsample tally of a county, with the county named in the errors.
pub(crate) fn county_nonsample_tally(
    county: &County,
    seed: &Seed,
    prior_pseudocount: u64,
) -> Result<Tally, AuditError> {
    let res = generate_nonsample_tally_with_prior(
        &county.sample_tally,
        county.total_num_votes,
        seed,
        prior_pseudocount,
    );
    debug!(
        "county_nonsample_tally: county {} seed {}: {:?}",
        county.name, seed, res
    );
    match res {
        Err(AuditError::InsufficientVotes {
            sample_size,
            total_num_votes,
            ..
        }) => Err(AuditError::InsufficientVotes {
            county: county.name.clone(),
            sample_size,
            total_num_votes,
        }),
        x => x,
    }
}
