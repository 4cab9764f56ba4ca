use std::fs;

use bayes_audit::builder::Builder;
use bayes_audit::Contest;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::audit::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CountyConfig {
    pub name: String,
    #[serde(rename = "totalVotes")]
    pub total_votes: u64,
    #[serde(rename = "sampleTally")]
    pub sample_tally: Vec<u64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(rename = "contestName")]
    pub contest_name: Option<String>,
    pub candidates: Vec<String>,
    pub counties: Vec<CountyConfig>,
    // A string for the seeds that do not fit in 64 bits.
    #[serde(rename = "auditSeed")]
    _audit_seed: Option<JSValue>,
    #[serde(rename = "numTrials")]
    pub num_trials: Option<u64>,
    #[serde(rename = "independentCountySeeds")]
    pub independent_county_seeds: Option<bool>,
    #[serde(rename = "priorPseudocount")]
    pub prior_pseudocount: Option<u64>,
}

impl AuditConfig {
    /// The seed as decimal text, if one is given.
    pub fn audit_seed(&self) -> BpResult<Option<String>> {
        match &self._audit_seed {
            None | Some(JSValue::Null) => Ok(None),
            Some(JSValue::Number(n)) => n
                .as_u64()
                .map(|x| Some(x.to_string()))
                .context(ParsingJsonNumberSnafu {}),
            Some(JSValue::String(s)) => Ok(Some(s.clone())),
            Some(_) => None.context(ParsingJsonNumberSnafu {}),
        }
    }

    pub fn contest(&self) -> BpResult<Contest> {
        let mut builder = Builder::new(&self.candidates).context(AuditSnafu {})?;
        for c in self.counties.iter() {
            builder = builder
                .county(&c.name, c.total_votes, &c.sample_tally)
                .context(AuditSnafu {})?;
        }
        builder.build().context(AuditSnafu {})
    }
}

pub fn parse_config(contents: &str) -> BpResult<AuditConfig> {
    let config: AuditConfig = serde_json::from_str(contents).context(ParsingJsonSnafu {})?;
    debug!("parse_config: {:?}", config);
    Ok(config)
}

pub fn read_config(path: &str) -> BpResult<AuditConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_config(&contents)
}

/// A summary written by an earlier run.
pub fn read_summary(path: &str) -> BpResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "contestName": "Mayor",
        "candidates": ["Alice", "Bob"],
        "counties": [
            {"name": "1", "totalVotes": 1000, "sampleTally": [30, 15]},
            {"name": "2", "totalVotes": 2000, "sampleTally": [40, 50]}
        ],
        "auditSeed": "123456789012345678901234567890",
        "numTrials": 500
    }"#;

    #[test]
    fn reads_a_contest() {
        let config = parse_config(CONFIG).unwrap();
        assert_eq!(config.contest_name, Some("Mayor".to_string()));
        assert_eq!(config.num_trials, Some(500));
        assert_eq!(config.independent_county_seeds, None);
        assert_eq!(
            config.audit_seed().unwrap(),
            Some("123456789012345678901234567890".to_string())
        );
        let contest = config.contest().unwrap();
        assert_eq!(contest.total_num_votes(), 3000);
    }

    #[test]
    fn numeric_seeds() {
        let config = parse_config(
            r#"{"candidates": ["a"], "counties": [{"name": "x", "totalVotes": 1, "sampleTally": [1]}], "auditSeed": 42}"#,
        )
        .unwrap();
        assert_eq!(config.audit_seed().unwrap(), Some("42".to_string()));
        let config = parse_config(
            r#"{"candidates": ["a"], "counties": [], "auditSeed": 4.5}"#,
        )
        .unwrap();
        assert!(matches!(
            config.audit_seed(),
            Err(BpError::ParsingJsonNumber {})
        ));
        assert!(config.contest().is_err());
    }

    #[test]
    fn shape_errors_surface() {
        let config = parse_config(
            r#"{"candidates": ["a", "b"], "counties": [{"name": "x", "totalVotes": 10, "sampleTally": [1]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.contest(),
            Err(BpError::Audit {
                source: AuditError::InvalidInput(_)
            })
        ));
    }
}
