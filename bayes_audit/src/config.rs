// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::ops::AddAssign;

use crate::rng::Seed;

/// Vote counts, one entry per candidate, in candidate order.
///
/// Depending on where it appears, a tally holds the votes seen in the audit
/// sample, the simulated votes of the unsampled ballots, or the final votes.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct Tally(pub Vec<u64>);

impl Tally {
    pub fn zeros(num_candidates: usize) -> Tally {
        Tally(vec![0; num_candidates])
    }

    /// The sum of the counts, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.0.iter().fold(0u64, |acc, &c| acc.saturating_add(c))
    }

    /// The sum of the counts, or `None` if it does not fit in a `u64`.
    pub fn checked_total(&self) -> Option<u64> {
        self.0.iter().try_fold(0u64, |acc, &c| acc.checked_add(c))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn counts(&self) -> &[u64] {
        &self.0
    }

    /// The index of the largest count. Ties go to the smallest index.
    pub fn leader(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (idx, &count) in self.0.iter().enumerate() {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((idx, count)),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

impl From<Vec<u64>> for Tally {
    fn from(counts: Vec<u64>) -> Self {
        Tally(counts)
    }
}

impl AddAssign<&Tally> for Tally {
    fn add_assign(&mut self, rhs: &Tally) {
        for (lhs, r) in self.0.iter_mut().zip(rhs.0.iter()) {
            *lhs += r;
        }
    }
}

/// A sampling jurisdiction: a county, a precinct, a state...
///
/// Invariant: the sample never has more votes than the county.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct County {
    pub name: String,
    pub total_num_votes: u64,
    pub sample_tally: Tally,
}

impl County {
    pub fn new(
        name: &str,
        total_num_votes: u64,
        sample_tally: Tally,
    ) -> Result<County, AuditError> {
        let sample_size = sample_tally.checked_total().ok_or_else(|| {
            AuditError::InvalidInput(format!(
                "county {}: the sample counts {:?} add up to more than {}",
                name,
                sample_tally.counts(),
                u64::MAX
            ))
        })?;
        if sample_size > total_num_votes {
            return Err(AuditError::InsufficientVotes {
                county: name.to_string(),
                sample_size,
                total_num_votes,
            });
        }
        Ok(County {
            name: name.to_string(),
            total_num_votes,
            sample_tally,
        })
    }

    /// The number of ballots that have not been looked at yet.
    pub fn nonsample_size(&self) -> u64 {
        self.total_num_votes.saturating_sub(self.sample_tally.total())
    }
}

/// A single contest audited across one or more counties.
///
/// The shape is validated once at construction: every county has one sample
/// count per candidate.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Contest {
    candidates: Vec<String>,
    counties: Vec<County>,
}

impl Contest {
    pub fn new(candidates: Vec<String>, counties: Vec<County>) -> Result<Contest, AuditError> {
        if candidates.is_empty() {
            return Err(AuditError::ArithmeticDegenerate(
                "a contest needs at least one candidate".to_string(),
            ));
        }
        if counties.is_empty() {
            return Err(AuditError::InvalidInput(
                "a contest needs at least one county".to_string(),
            ));
        }
        // Every final tally is bounded by the contest total, so it cannot
        // overflow once the total fits.
        counties
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(c.total_num_votes))
            .ok_or_else(|| {
                AuditError::InvalidInput(format!(
                    "the counties have more than {} votes in total",
                    u64::MAX
                ))
            })?;
        for county in counties.iter() {
            if county.sample_tally.len() != candidates.len() {
                return Err(AuditError::InvalidInput(format!(
                    "county {} has {} sample counts for {} candidates",
                    county.name,
                    county.sample_tally.len(),
                    candidates.len()
                )));
            }
        }
        Ok(Contest {
            candidates,
            counties,
        })
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn num_candidates(&self) -> usize {
        self.candidates.len()
    }

    pub fn counties(&self) -> &[County] {
        &self.counties
    }

    pub fn total_num_votes(&self) -> u64 {
        self.counties.iter().map(|c| c.total_num_votes).sum()
    }
}

// ******** Output data structures *********

/// One simulated world: every county completed with a nonsample tally.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Trial {
    pub seed: Seed,
    pub nonsample_tallies: Vec<Tally>,
    pub final_tallies: Vec<Tally>,
    pub contest_tally: Tally,
    pub winner: usize,
}

/// How often each candidate won across the simulated trials.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct WinProbabilities {
    pub num_trials: u64,
    /// One count per candidate, summing to `num_trials`.
    pub win_counts: Vec<u64>,
}

impl WinProbabilities {
    pub fn probability(&self, candidate: usize) -> f64 {
        match self.win_counts.get(candidate) {
            Some(&wins) if self.num_trials > 0 => wins as f64 / self.num_trials as f64,
            _ => 0.0,
        }
    }

    /// (candidate index, win probability) pairs in candidate order.
    pub fn to_pairs(&self) -> Vec<(usize, f64)> {
        (0..self.win_counts.len())
            .map(|idx| (idx, self.probability(idx)))
            .collect()
    }

    /// The same pairs, most likely winner first. Equal probabilities keep
    /// candidate order.
    pub fn sorted(&self) -> Vec<(usize, f64)> {
        let mut pairs = self.to_pairs();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs
    }
}

/// Errors that prevent an audit computation from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AuditError {
    /// Negative or otherwise malformed seed.
    InvalidSeed(String),
    /// The observed sample is larger than the declared number of votes.
    InsufficientVotes {
        county: String,
        sample_size: u64,
        total_num_votes: u64,
    },
    /// Mismatched shapes or out of range parameters.
    InvalidInput(String),
    /// Inputs for which the posterior draw is undefined.
    ArithmeticDegenerate(String),
}

impl Error for AuditError {}

impl Display for AuditError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditError::InvalidSeed(msg) => write!(f, "invalid seed: {}", msg),
            AuditError::InsufficientVotes {
                county,
                sample_size,
                total_num_votes,
            } => write!(
                f,
                "county {}: total_num_votes {} less than sample_size {}",
                county, total_num_votes, sample_size
            ),
            AuditError::InvalidInput(msg) => write!(f, "invalid input: {}", msg),
            AuditError::ArithmeticDegenerate(msg) => {
                write!(f, "degenerate posterior: {}", msg)
            }
        }
    }
}

// ********* Configuration **********

/// How the counties of one trial get their random streams.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SeedingMode {
    /// Every county of a trial is drawn with the trial seed itself.
    SharedPerTrial,
    /// County `k` is drawn with `trial_seed + k * COUNTY_SEED_STRIDE`.
    IndependentPerCounty,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AuditParams {
    pub seed: Seed,
    pub num_trials: u64,
    pub seeding_mode: SeedingMode,
    /// Extra votes given to every candidate before looking at the sample.
    pub prior_pseudocount: u64,
    /// Number of worker threads. The result does not depend on it.
    pub num_threads: usize,
}

impl Default for AuditParams {
    fn default() -> Self {
        AuditParams {
            seed: Seed::from(1u64),
            num_trials: 10_000,
            seeding_mode: SeedingMode::SharedPerTrial,
            prior_pseudocount: 1,
            num_threads: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_breaks_ties_on_smallest_index() {
        assert_eq!(Tally(vec![3, 7, 7, 1]).leader(), Some(1));
        assert_eq!(Tally(vec![0, 0]).leader(), Some(0));
        assert_eq!(Tally(vec![]).leader(), None);
    }

    #[test]
    fn county_rejects_oversized_sample() {
        let res = County::new("A", 10, Tally(vec![6, 5]));
        assert_eq!(
            res,
            Err(AuditError::InsufficientVotes {
                county: "A".to_string(),
                sample_size: 11,
                total_num_votes: 10
            })
        );
        let county = County::new("A", 11, Tally(vec![6, 5])).unwrap();
        assert_eq!(county.nonsample_size(), 0);
    }

    #[test]
    fn contest_checks_shape() {
        let a = County::new("A", 10, Tally(vec![1, 2])).unwrap();
        let b = County::new("B", 10, Tally(vec![1, 2, 3])).unwrap();
        let names = vec!["x".to_string(), "y".to_string()];
        assert!(matches!(
            Contest::new(names.clone(), vec![a.clone(), b]),
            Err(AuditError::InvalidInput(_))
        ));
        assert!(matches!(
            Contest::new(vec![], vec![]),
            Err(AuditError::ArithmeticDegenerate(_))
        ));
        let contest = Contest::new(names, vec![a.clone(), a]).unwrap();
        assert_eq!(contest.total_num_votes(), 20);
    }

    #[test]
    fn huge_counts_are_errors() {
        let tally = Tally(vec![u64::MAX, 2]);
        assert_eq!(tally.checked_total(), None);
        assert_eq!(tally.total(), u64::MAX);
        assert!(matches!(
            County::new("A", 10, tally),
            Err(AuditError::InvalidInput(_))
        ));

        let big = County::new("A", u64::MAX, Tally(vec![1, 2])).unwrap();
        let small = County::new("B", 1, Tally(vec![0, 1])).unwrap();
        let names = vec!["x".to_string(), "y".to_string()];
        assert!(matches!(
            Contest::new(names.clone(), vec![big.clone(), small]),
            Err(AuditError::InvalidInput(_))
        ));
        let contest = Contest::new(names, vec![big]).unwrap();
        assert_eq!(contest.total_num_votes(), u64::MAX);
    }

    #[test]
    fn sorted_probabilities() {
        let wp = WinProbabilities {
            num_trials: 10,
            win_counts: vec![2, 8, 0],
        };
        assert_eq!(wp.sorted(), vec![(1, 0.8), (0, 0.2), (2, 0.0)]);
        let total: f64 = wp.to_pairs().iter().map(|p| p.1).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
