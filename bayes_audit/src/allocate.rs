//! Choosing where the next ballots come from when an audit escalates.
//!
//! Every ballot not sampled yet, whatever its county, is equally likely to be
//! drawn next: the leftover ballots of all the counties are pooled, shuffled,
//! and the first ones taken. Larger counties get more ballots simply because
//! they have more of them in the pool.

use std::collections::HashSet;

use log::{debug, info};

use crate::config::AuditError;
use crate::rng::{create_generator, Seed};

/// The sampling progress of one county.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CountySampleStatus {
    pub name: String,
    pub total_votes: u64,
    pub current_sample_size: u64,
}

impl CountySampleStatus {
    pub fn leftover(&self) -> u64 {
        self.total_votes.saturating_sub(self.current_sample_size)
    }
}

/// Builds the statuses out of parallel lists, as read from a table.
pub fn county_statuses(
    names: &[String],
    total_votes: &[u64],
    current_sample_sizes: &[u64],
) -> Result<Vec<CountySampleStatus>, AuditError> {
    if names.len() != total_votes.len() || names.len() != current_sample_sizes.len() {
        return Err(AuditError::InvalidInput(format!(
            "{} county names for {} vote totals and {} sample sizes",
            names.len(),
            total_votes.len(),
            current_sample_sizes.len()
        )));
    }
    Ok(names
        .iter()
        .zip(total_votes.iter().zip(current_sample_sizes.iter()))
        .map(|(name, (&total, &sampled))| CountySampleStatus {
            name: name.clone(),
            total_votes: total,
            current_sample_size: sampled,
        })
        .collect())
}

/// Splits `additional_sample_size` new ballots among the counties.
///
/// The result lists every county, in input order, with the number of ballots
/// to draw there (possibly zero). It sums to `additional_sample_size`, or to
/// the number of leftover ballots if there are fewer.
pub fn allocate_additional_samples(
    counties: &[CountySampleStatus],
    additional_sample_size: u64,
    seed: &Seed,
) -> Result<Vec<(String, u64)>, AuditError> {
    let mut seen: HashSet<&str> = HashSet::new();
    for c in counties.iter() {
        if c.current_sample_size > c.total_votes {
            return Err(AuditError::InvalidInput(format!(
                "county {} has sampled {} ballots out of {}",
                c.name, c.current_sample_size, c.total_votes
            )));
        }
        if !seen.insert(c.name.as_str()) {
            return Err(AuditError::InvalidInput(format!(
                "county {} is listed twice",
                c.name
            )));
        }
    }

    let pool_size: u64 = counties.iter().map(|c| c.leftover()).sum();
    let mut pool: Vec<usize> = Vec::with_capacity(pool_size as usize);
    for (idx, c) in counties.iter().enumerate() {
        pool.extend(std::iter::repeat(idx).take(c.leftover() as usize));
    }
    info!(
        "allocate_additional_samples: {} leftover ballots in {} counties, drawing {}",
        pool_size,
        counties.len(),
        additional_sample_size
    );

    let mut rng = create_generator(Some(seed));
    rng.shuffle(&mut pool);

    let mut counts = vec![0u64; counties.len()];
    let num_drawn = additional_sample_size.min(pool_size) as usize;
    for &idx in pool[..num_drawn].iter() {
        counts[idx] += 1;
    }
    let res: Vec<(String, u64)> = counties
        .iter()
        .zip(counts)
        .map(|(c, n)| (c.name.clone(), n))
        .collect();
    debug!("allocate_additional_samples: {:?}", res);
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(name: &str, total: u64, sampled: u64) -> CountySampleStatus {
        CountySampleStatus {
            name: name.to_string(),
            total_votes: total,
            current_sample_size: sampled,
        }
    }

    #[test]
    fn allocation_respects_leftovers() {
        let counties = vec![status("A", 10, 6), status("B", 10, 8)];
        for s in 0..25u64 {
            let res = allocate_additional_samples(&counties, 4, &Seed::from(s)).unwrap();
            assert_eq!(res.len(), 2);
            assert_eq!(res[0].0, "A");
            assert_eq!(res[1].0, "B");
            assert_eq!(res[0].1 + res[1].1, 4);
            assert!(res[0].1 <= 4);
            assert!(res[1].1 <= 2);
        }
    }

    #[test]
    fn small_pool_is_drained() {
        let counties = vec![status("A", 10, 9), status("B", 5, 5), status("C", 3, 1)];
        let res = allocate_additional_samples(&counties, 100, &Seed::from(1u64)).unwrap();
        assert_eq!(
            res,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 0),
                ("C".to_string(), 2)
            ]
        );
    }

    #[test]
    fn allocation_is_reproducible() {
        let counties = vec![status("A", 1000, 10), status("B", 3000, 20), status("C", 50, 0)];
        let seed = Seed::from(20180419u64);
        let a = allocate_additional_samples(&counties, 200, &seed).unwrap();
        let b = allocate_additional_samples(&counties, 200, &seed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.iter().map(|p| p.1).sum::<u64>(), 200);
    }

    #[test]
    fn invalid_allocations() {
        let counties = vec![status("A", 10, 11)];
        assert!(matches!(
            allocate_additional_samples(&counties, 1, &Seed::from(1u64)),
            Err(AuditError::InvalidInput(_))
        ));
        let counties = vec![status("A", 10, 1), status("A", 10, 1)];
        assert!(matches!(
            allocate_additional_samples(&counties, 1, &Seed::from(1u64)),
            Err(AuditError::InvalidInput(_))
        ));
        assert!(matches!(
            county_statuses(&["A".to_string()], &[10, 20], &[1]),
            Err(AuditError::InvalidInput(_))
        ));
        let ok = county_statuses(&["A".to_string()], &[10], &[1]).unwrap();
        assert_eq!(ok, vec![status("A", 10, 1)]);
    }
}
