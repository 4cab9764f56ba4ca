mod args;
mod audit;

use clap::Parser;
use log::{debug, warn, LevelFilter};
use snafu::ErrorCompat;

use crate::args::{Args, Command};
use crate::audit::BpResult;

fn run(args: &Args) -> BpResult<()> {
    match &args.command {
        Command::WinProbs(a) => audit::run_win_probs(a),
        Command::Risk(a) => audit::run_risk(a),
        Command::Allocate(a) => audit::run_allocate(a),
    }
}

fn main() {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();

    debug!("args: {:?}", args);

    if let Err(e) = run(&args) {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
