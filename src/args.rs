use clap::{Parser, Subcommand};

/// Bayesian audit tool for a single plurality contest across one or more counties.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Estimates the probability that each candidate would win a full hand recount.
    WinProbs(WinProbsArgs),
    /// Estimates the Bayesian risk of a sample size for a hypothesized outcome.
    Risk(RiskArgs),
    /// Splits additional ballots to sample among counties when escalating an audit.
    Allocate(AllocateArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct WinProbsArgs {
    /// (optional, for single-county audits) The total number of votes (including the already
    /// audited ones) that were cast in the election.
    #[clap(value_parser)]
    pub total_num_votes: Option<u64>,

    /// (optional, for single-county audits) The sample tally given as space separated numbers,
    /// e.g. 5 30 25
    #[clap(value_parser)]
    pub single_county_tally: Vec<u64>,

    /// (file path) If the election spans multiple counties, the sample tallies should be given
    /// in a CSV file. In the header row, one of the column names must be Total Votes and another
    /// can be County Name. Other columns are the names of the candidates.
    #[clap(long, value_parser)]
    pub path_to_csv: Option<String>,

    /// (default csv) The type of the file given with --path-to-csv: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first worksheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path, optional) A JSON description of the contest and the audit settings.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (default 1) For reproducibility, the seed of the randomness in the audit. If the same seed
    /// is provided, the audit will return the same results. Arbitrarily large integers are accepted.
    #[clap(long, value_parser)]
    pub audit_seed: Option<String>,

    /// (default 10000) The number of simulated recounts used to estimate the probabilities.
    #[clap(long, value_parser)]
    pub num_trials: Option<u64>,

    /// (default 1) The number of threads running the trials. It does not change the result.
    #[clap(long, value_parser, default_value_t = 1)]
    pub threads: usize,

    /// If passed, every county of a trial gets its own seed instead of sharing the trial seed.
    #[clap(long, takes_value = false)]
    pub independent_county_seeds: bool,

    /// (file path, 'stdout' or empty) If specified, the summary of the audit will be written in
    /// JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing a summary in JSON format. If provided, bptool will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RiskArgs {
    /// The total number of votes cast in the election.
    #[clap(value_parser)]
    pub total_num_votes: u64,

    /// The sample size that we are estimating the Bayesian risk for.
    #[clap(value_parser)]
    pub sample_size: u64,

    /// The percentage margin between the winner and the runner-up in a two-candidate election.
    #[clap(long, value_parser, allow_hyphen_values = true)]
    pub margin: Option<f64>,

    /// (repeated, instead of --margin) The vote share of each candidate, in percent.
    #[clap(long, value_parser)]
    pub vote_shares: Option<Vec<f64>>,

    /// (default 1000) The number of trials to estimate the Bayesian risk for a single sample.
    #[clap(long, value_parser, default_value_t = 1000)]
    pub trials_per_sample: u64,

    /// (default 50) The number of samples used in estimating the risk for the sample size.
    #[clap(long, value_parser, default_value_t = 50)]
    pub num_samples: u64,

    /// (default 1) The seed of the randomness in the estimation.
    #[clap(long, value_parser, default_value = "1")]
    pub audit_seed: String,

    /// (default 1) The number of threads. It does not change the result.
    #[clap(long, value_parser, default_value_t = 1)]
    pub threads: usize,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AllocateArgs {
    /// (file path) CSV file with the columns County Name, Total Votes and Sampled.
    #[clap(long, value_parser)]
    pub path_to_csv: String,

    /// The number of additional ballots to sample across all the counties.
    #[clap(long, value_parser)]
    pub additional_sample_size: u64,

    /// (default 1) The seed of the randomness in the allocation.
    #[clap(long, value_parser, default_value = "1")]
    pub audit_seed: String,

    /// (file path, 'stdout' or empty) If specified, the allocation will be written in JSON format
    /// to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,
}
