use log::{debug, info, warn};

use bayes_audit::allocate::allocate_additional_samples;
use bayes_audit::builder::Builder;
use bayes_audit::risk::{ballot_counts, estimate_risk, Hypothesis, RiskParams};
use bayes_audit::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::num::ParseIntError;

use serde::Serialize;
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{AllocateArgs, RiskArgs, WinProbsArgs};
use crate::audit::config_reader::*;
use crate::audit::io_common::simplify_file_name;

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

pub const TOOL_NAME: &str = "BPTOOL (version 0.8)";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BpError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("The workbook has no data"))]
    EmptyExcel {},
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error serializing the summary to JSON"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Expected a non-negative integer or a string of digits"))]
    ParsingJsonNumber {},
    #[snafu(display("Error opening file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Missing column {column:?}"))]
    MissingColumn { column: String },
    #[snafu(display("Line {lineno}: missing value for column {column:?}"))]
    LineTooShort { column: String, lineno: usize },
    #[snafu(display("Line {lineno}: column {column:?}: {value:?} is not a non-negative integer"))]
    ParsingCount {
        source: ParseIntError,
        value: String,
        column: String,
        lineno: usize,
    },
    #[snafu(display("{source}"))]
    Audit { source: AuditError },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BpResult<T> = Result<T, BpError>;

pub fn parse_seed(s: &str) -> BpResult<Seed> {
    s.trim().parse::<Seed>().context(AuditSnafu {})
}

/// The text table of the win probabilities, most likely winner first.
pub fn format_results(candidates: &[String], win_probs: &WinProbabilities) -> String {
    let mut lines: Vec<String> = vec![
        TOOL_NAME.to_string(),
        format!(
            "{:<24} \t {}",
            "Candidate name", "Estimated probability of winning a full recount"
        ),
    ];
    for (idx, p) in win_probs.sorted() {
        lines.push(format!(" {:<24} \t  {:6.2} %  ", candidates[idx], 100.0 * p));
    }
    lines.join("\n")
}

#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct SummaryConfig {
    pub contest: String,
    #[serde(rename = "auditSeed")]
    pub audit_seed: String,
    #[serde(rename = "numTrials")]
    pub num_trials: u64,
    #[serde(rename = "independentCountySeeds")]
    pub independent_county_seeds: bool,
    #[serde(rename = "priorPseudocount")]
    pub prior_pseudocount: u64,
}

fn build_summary_js(
    contest_name: &str,
    contest: &Contest,
    params: &AuditParams,
    win_probs: &WinProbabilities,
) -> JSValue {
    let c = SummaryConfig {
        contest: contest_name.to_string(),
        audit_seed: params.seed.to_string(),
        num_trials: params.num_trials,
        independent_county_seeds: params.seeding_mode == SeedingMode::IndependentPerCounty,
        prior_pseudocount: params.prior_pseudocount,
    };
    let results: Vec<JSValue> = contest
        .candidates()
        .iter()
        .zip(win_probs.win_counts.iter())
        .enumerate()
        .map(|(idx, (name, wins))| {
            json!({
                "candidate": name,
                "wins": wins,
                "winProbability": win_probs.probability(idx)
            })
        })
        .collect();
    json!({
        "config": c,
        "totalVotes": contest.total_num_votes(),
        "results": results })
}

fn write_output(out: &Option<String>, js: &JSValue) -> BpResult<()> {
    let pretty_js = serde_json::to_string_pretty(js).context(SerializingJsonSnafu {})?;
    match out.as_deref() {
        None | Some("") => {}
        Some("stdout") => println!("{}", pretty_js),
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

fn check_reference(reference_path: &str, js: &JSValue) -> BpResult<()> {
    let pretty_js_stats = serde_json::to_string_pretty(js).context(SerializingJsonSnafu {})?;
    let summary_ref = read_summary(reference_path)?;
    debug!("check_reference: reference summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(SerializingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference string");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("The summary matches the reference {:?}", reference_path);
    Ok(())
}

/// A contest with its name and the settings read along with it.
struct AuditInput {
    name: String,
    contest: Contest,
    config: Option<AuditConfig>,
}

fn read_audit_input(args: &WinProbsArgs) -> BpResult<AuditInput> {
    if let Some(config_path) = &args.config {
        let config = read_config(config_path)?;
        let contest = config.contest()?;
        let name = config
            .contest_name
            .clone()
            .unwrap_or_else(|| simplify_file_name(config_path));
        return Ok(AuditInput {
            name,
            contest,
            config: Some(config),
        });
    }
    if let Some(path) = &args.path_to_csv {
        let contest = match args.input_type.as_deref() {
            None | Some("csv") => io_csv::read_contest_csv(path)?,
            Some("xlsx") => io_xlsx::read_contest_xlsx(path, args.excel_worksheet_name.as_deref())?,
            Some(x) => whatever!("Input type not implemented {:?}", x),
        };
        return Ok(AuditInput {
            name: simplify_file_name(path),
            contest,
            config: None,
        });
    }
    match args.total_num_votes {
        Some(total) if !args.single_county_tally.is_empty() => {
            let contest = Builder::with_numbered_candidates(args.single_county_tally.len())
                .and_then(|b| b.county("1", total, &args.single_county_tally))
                .and_then(|b| b.build())
                .context(AuditSnafu {})?;
            Ok(AuditInput {
                name: "contest".to_string(),
                contest,
                config: None,
            })
        }
        _ => whatever!(
            "Either a total number of votes and a sample tally, --path-to-csv or --config must be given"
        ),
    }
}

fn audit_params(args: &WinProbsArgs, config: &Option<AuditConfig>) -> BpResult<AuditParams> {
    let defaults = AuditParams::default();
    let config_seed = match config {
        Some(c) => c.audit_seed()?,
        None => None,
    };
    let seed = match args.audit_seed.as_ref().or(config_seed.as_ref()) {
        Some(s) => parse_seed(s)?,
        None => defaults.seed.clone(),
    };
    let num_trials = args
        .num_trials
        .or_else(|| config.as_ref().and_then(|c| c.num_trials))
        .unwrap_or(defaults.num_trials);
    let independent = args.independent_county_seeds
        || config
            .as_ref()
            .and_then(|c| c.independent_county_seeds)
            .unwrap_or(false);
    let prior_pseudocount = config
        .as_ref()
        .and_then(|c| c.prior_pseudocount)
        .unwrap_or(defaults.prior_pseudocount);
    Ok(AuditParams {
        seed,
        num_trials,
        seeding_mode: if independent {
            SeedingMode::IndependentPerCounty
        } else {
            SeedingMode::SharedPerTrial
        },
        prior_pseudocount,
        num_threads: args.threads.max(1),
    })
}

pub fn run_win_probs(args: &WinProbsArgs) -> BpResult<()> {
    let input = read_audit_input(args)?;
    let params = audit_params(args, &input.config)?;
    info!(
        "run_win_probs: contest {:?}, {} counties, params: {:?}",
        input.name,
        input.contest.counties().len(),
        params
    );

    let win_probs = estimate_win_probabilities(&input.contest, &params).context(AuditSnafu {})?;
    println!("{}", format_results(input.contest.candidates(), &win_probs));

    let result_js = build_summary_js(&input.name, &input.contest, &params, &win_probs);
    write_output(&args.out, &result_js)?;

    // The reference summary, if provided for comparison
    if let Some(reference_path) = &args.reference {
        check_reference(reference_path, &result_js)?;
    }
    Ok(())
}

fn hypothesis(args: &RiskArgs) -> BpResult<Hypothesis> {
    match (args.margin, &args.vote_shares) {
        (Some(m), None) => Ok(Hypothesis::Margin(m)),
        (None, Some(shares)) => Ok(Hypothesis::VoteShares(shares.clone())),
        (Some(_), Some(_)) => whatever!("Only one of --margin and --vote-shares can be given"),
        (None, None) => whatever!("One of --margin or --vote-shares must be given"),
    }
}

fn risk_report(args: &RiskArgs, hypothesis: &Hypothesis, counts: &[u64], risk: f64) -> String {
    let outcome = match hypothesis {
        Hypothesis::Margin(m) => format!("a margin of {}%", m),
        Hypothesis::VoteShares(shares) => format!("vote shares of {:?}%", shares),
    };
    let mut report = format!(
        "The estimated Bayesian risk limit for a sample size of {} in an election \
        with {} votes, with {}, will be {:6.2}. \nThis was calculated by generating \
        {} different samples, of the same size, and running {} 'restore' operations \
        on each sample, to estimate its risk limit.",
        args.sample_size,
        args.total_num_votes,
        outcome,
        risk,
        args.num_samples,
        args.trials_per_sample
    );
    if counts.len() > 1 && counts[1] > counts[0] {
        report.push_str(&format!(
            "\nNote: after rounding the vote shares, the runner-up has {} ballots and the \
            hypothesized winner {}; the risk is measured against the hypothesized winner.",
            counts[1], counts[0]
        ));
    }
    report
}

pub fn run_risk(args: &RiskArgs) -> BpResult<()> {
    let hypothesis = hypothesis(args)?;
    let params = RiskParams {
        trials_per_sample: args.trials_per_sample,
        num_samples: args.num_samples,
        seed: parse_seed(&args.audit_seed)?,
        num_threads: args.threads.max(1),
        ..RiskParams::default()
    };
    let counts = ballot_counts(args.total_num_votes, &hypothesis).context(AuditSnafu {})?;
    let risk = estimate_risk(args.total_num_votes, &hypothesis, args.sample_size, &params)
        .context(AuditSnafu {})?;
    println!("{}", risk_report(args, &hypothesis, &counts, risk));
    Ok(())
}

fn format_allocation(allocation: &[(String, u64)]) -> String {
    let mut lines: Vec<String> = vec![format!("{:<24} \t {}", "County name", "Additional ballots")];
    for (name, count) in allocation.iter() {
        lines.push(format!(" {:<24} \t  {}", name, count));
    }
    lines.join("\n")
}

pub fn run_allocate(args: &AllocateArgs) -> BpResult<()> {
    let statuses = io_csv::read_sample_status_csv(&args.path_to_csv)?;
    let seed = parse_seed(&args.audit_seed)?;
    let allocation = allocate_additional_samples(&statuses, args.additional_sample_size, &seed)
        .context(AuditSnafu {})?;
    println!("{}", format_allocation(&allocation));

    let js: Vec<JSValue> = allocation
        .iter()
        .map(|(name, count)| json!({"county": name, "additionalSamples": count}))
        .collect();
    write_output(
        &args.out,
        &json!({"auditSeed": seed.to_string(), "allocation": js}),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn win_probs_args(total: u64, tally: &[u64]) -> WinProbsArgs {
        WinProbsArgs {
            total_num_votes: Some(total),
            single_county_tally: tally.to_vec(),
            path_to_csv: None,
            input_type: None,
            excel_worksheet_name: None,
            config: None,
            audit_seed: None,
            num_trials: Some(100),
            threads: 2,
            independent_county_seeds: false,
            out: None,
            reference: None,
        }
    }

    fn risk_args(margin: Option<f64>, vote_shares: Option<Vec<f64>>) -> RiskArgs {
        RiskArgs {
            total_num_votes: 1000,
            sample_size: 50,
            margin,
            vote_shares,
            trials_per_sample: 20,
            num_samples: 5,
            audit_seed: "1".to_string(),
            threads: 1,
        }
    }

    #[test]
    fn seeds_are_parsed() {
        assert_eq!(parse_seed(" 42 ").unwrap(), Seed::from(42u64));
        assert!(matches!(
            parse_seed("-3"),
            Err(BpError::Audit {
                source: AuditError::InvalidSeed(_)
            })
        ));
    }

    #[test]
    fn results_are_sorted() {
        let candidates = vec!["Alice".to_string(), "Bob".to_string()];
        let win_probs = WinProbabilities {
            num_trials: 4,
            win_counts: vec![1, 3],
        };
        let text = format_results(&candidates, &win_probs);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], TOOL_NAME);
        assert!(lines[2].contains("Bob"));
        assert!(lines[2].contains("75.00 %"));
        assert!(lines[3].contains("Alice"));
        assert!(lines[3].contains("25.00 %"));
    }

    #[test]
    fn single_county_input() {
        let args = win_probs_args(100, &[60, 40]);
        let input = read_audit_input(&args).unwrap();
        assert_eq!(input.contest.candidates(), &["1", "2"]);
        let params = audit_params(&args, &input.config).unwrap();
        assert_eq!(params.num_trials, 100);
        assert_eq!(params.seed, Seed::from(1u64));
        assert_eq!(params.seeding_mode, SeedingMode::SharedPerTrial);

        let win_probs = estimate_win_probabilities(&input.contest, &params).unwrap();
        // Fully sampled county: the sample leader always wins.
        assert_eq!(win_probs.win_counts, vec![100, 0]);
        let js = build_summary_js(&input.name, &input.contest, &params, &win_probs);
        assert_eq!(js["config"]["auditSeed"], json!("1"));
        assert_eq!(js["totalVotes"], json!(100));
        assert_eq!(js["results"][0]["wins"], json!(100));
        assert_eq!(js["results"][1]["candidate"], json!("2"));
    }

    #[test]
    fn missing_input_is_reported() {
        let mut args = win_probs_args(100, &[]);
        assert!(read_audit_input(&args).is_err());
        args.single_county_tally = vec![80, 30];
        assert!(matches!(
            read_audit_input(&args),
            Err(BpError::Audit {
                source: AuditError::InsufficientVotes { .. }
            })
        ));
        args.total_num_votes = Some(10);
        args.single_county_tally = vec![u64::MAX, 2];
        assert!(matches!(
            read_audit_input(&args),
            Err(BpError::Audit {
                source: AuditError::InvalidInput(_)
            })
        ));
    }

    #[test]
    fn risk_needs_exactly_one_hypothesis() {
        assert_eq!(
            hypothesis(&risk_args(Some(5.0), None)).unwrap(),
            Hypothesis::Margin(5.0)
        );
        assert!(hypothesis(&risk_args(None, None)).is_err());
        assert!(hypothesis(&risk_args(Some(5.0), Some(vec![50.0, 50.0]))).is_err());
        let args = risk_args(None, Some(vec![60.0, 40.0]));
        let report = risk_report(&args, &hypothesis(&args).unwrap(), &[600, 400], 0.25);
        assert!(report.contains("sample size of 50"));
        assert!(report.contains("0.25"));
        assert!(!report.contains("Note"));
    }

    #[test]
    fn rounding_that_favors_the_runner_up_is_reported() {
        let mut args = risk_args(None, Some(vec![33.3, 33.3, 33.4]));
        args.total_num_votes = 10;
        let hyp = hypothesis(&args).unwrap();
        let counts = ballot_counts(10, &hyp).unwrap();
        assert_eq!(counts, vec![3, 4, 3]);
        let report = risk_report(&args, &hyp, &counts, 0.5);
        assert!(report.contains("the runner-up has 4 ballots and the hypothesized winner 3"));
    }

    #[test]
    fn reference_summaries() {
        let js = json!({"results": [{"candidate": "1", "wins": 10}]});
        let dir = std::env::temp_dir();
        let same = dir.join(format!("bptool-ref-same-{}.json", std::process::id()));
        let broken = dir.join(format!("bptool-ref-broken-{}.json", std::process::id()));
        fs::write(&same, serde_json::to_string_pretty(&js).unwrap()).unwrap();
        fs::write(&broken, "{\"results\": [").unwrap();

        assert!(check_reference(same.to_str().unwrap(), &js).is_ok());
        assert!(matches!(
            check_reference(broken.to_str().unwrap(), &js),
            Err(BpError::ParsingJson { .. })
        ));
        assert!(matches!(
            check_reference(same.to_str().unwrap(), &json!({"results": []})),
            Err(BpError::Whatever { .. })
        ));
        let _ = fs::remove_file(&same);
        let _ = fs::remove_file(&broken);

        let err = BpError::SerializingJson {
            source: serde_json::from_str::<JSValue>("{").unwrap_err(),
        };
        assert_eq!(err.to_string(), "Error serializing the summary to JSON");
    }

    #[test]
    fn allocation_table() {
        let text = format_allocation(&[("A".to_string(), 2), ("B".to_string(), 0)]);
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap_or("").contains('A'));
    }
}
