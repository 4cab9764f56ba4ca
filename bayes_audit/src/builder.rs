pub use crate::config::*;

/// A builder for assembling a contest county by county.
///
/// Shapes are checked as counties are added, so that a malformed input is
/// reported before any trial runs.
///
/// ```
/// pub use bayes_audit::builder::Builder;
/// # use bayes_audit::AuditError;
///
/// let contest = Builder::new(&["Alice".to_string(), "Bob".to_string()])?
///     .county("Suffolk", 1000, &[30, 15])?
///     .build()?;
/// assert_eq!(contest.num_candidates(), 2);
///
/// # Ok::<(), AuditError>(())
/// ```
pub struct Builder {
    pub(crate) _candidates: Vec<String>,
    pub(crate) _counties: Vec<County>,
}

impl Builder {
    pub fn new(candidates: &[String]) -> Result<Builder, AuditError> {
        if candidates.is_empty() {
            return Err(AuditError::ArithmeticDegenerate(
                "a contest needs at least one candidate".to_string(),
            ));
        }
        Ok(Builder {
            _candidates: candidates.to_vec(),
            _counties: Vec::new(),
        })
    }

    /// Candidates named `1`, `2`, ... when only the number of candidates is known.
    pub fn with_numbered_candidates(num_candidates: usize) -> Result<Builder, AuditError> {
        let names: Vec<String> = (1..=num_candidates).map(|i| i.to_string()).collect();
        Builder::new(&names)
    }

    /// Adds a county with its declared number of votes and its sample tally.
    pub fn county(
        mut self,
        name: &str,
        total_num_votes: u64,
        sample_tally: &[u64],
    ) -> Result<Builder, AuditError> {
        if sample_tally.len() != self._candidates.len() {
            return Err(AuditError::InvalidInput(format!(
                "county {} has {} sample counts for {} candidates",
                name,
                sample_tally.len(),
                self._candidates.len()
            )));
        }
        if self._counties.iter().any(|c| c.name == name) {
            return Err(AuditError::InvalidInput(format!(
                "county {} is listed twice",
                name
            )));
        }
        let county = County::new(name, total_num_votes, Tally(sample_tally.to_vec()))?;
        self._counties.push(county);
        Ok(self)
    }

    pub fn build(self) -> Result<Contest, AuditError> {
        Contest::new(self._candidates, self._counties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_counties() {
        let b = Builder::with_numbered_candidates(2).unwrap();
        assert!(matches!(
            b.county("x", 10, &[1, 2, 3]),
            Err(AuditError::InvalidInput(_))
        ));
        let b = Builder::with_numbered_candidates(2).unwrap();
        assert!(matches!(
            b.county("x", 10, &[8, 3]),
            Err(AuditError::InsufficientVotes { .. })
        ));
        let b = Builder::with_numbered_candidates(2)
            .unwrap()
            .county("x", 10, &[1, 1])
            .unwrap();
        assert!(matches!(
            b.county("x", 10, &[1, 1]),
            Err(AuditError::InvalidInput(_))
        ));
        assert!(matches!(
            Builder::with_numbered_candidates(0),
            Err(AuditError::ArithmeticDegenerate(_))
        ));
    }

    #[test]
    fn numbered_candidates() {
        let contest = Builder::with_numbered_candidates(3)
            .unwrap()
            .county("only", 100, &[1, 2, 3])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(contest.candidates(), &["1", "2", "3"]);
    }

    #[test]
    fn empty_builder_fails() {
        let b = Builder::with_numbered_candidates(2).unwrap();
        assert!(matches!(b.build(), Err(AuditError::InvalidInput(_))));
    }
}
