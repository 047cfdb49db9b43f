mod repl;
mod report;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser as ClapParser;
use env_logger::Builder;
use log::{LevelFilter, error, info};

use lox::{Lox, Reporter};

/// Exit code for scan, parse and resolution errors.
const EXIT_STATIC_ERROR: u8 = 65;
/// Exit code when the script cannot be read.
const EXIT_NO_INPUT: u8 = 66;
/// Exit code for runtime errors.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(ClapParser, Debug)]
#[command(name = "lox", version, about = "Lox language interpreter", long_about = None)]
struct Cli {
    /// Script to run. Starts the REPL when omitted.
    script: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG, when set, wins over the -v flags.
    Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    let mut lox = Lox::new();

    match cli.script {
        Some(path) => run_file(&mut lox, &path),
        None => match repl::run(&mut lox) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("REPL failed: {}", e);
                eprintln!("Could not run the REPL: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}

fn run_file(lox: &mut Lox, path: &Path) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            info!("reading {} failed: {}", path.display(), e);
            eprintln!("Could not read script '{}': {}", path.display(), e);
            return ExitCode::from(EXIT_NO_INPUT);
        }
    };

    info!("running {} ({} bytes)", path.display(), source.len());
    let reporter = lox.run(&source, io::stdout());
    print_diagnostics(&reporter, &source, &path.display().to_string());

    if reporter.had_error() {
        ExitCode::from(EXIT_STATIC_ERROR)
    } else if reporter.had_runtime_error() {
        ExitCode::from(EXIT_RUNTIME_ERROR)
    } else {
        ExitCode::SUCCESS
    }
}

fn print_diagnostics(reporter: &Reporter, source: &str, filename: &str) {
    if let Err(e) = report::report_all(reporter, source, Some(filename), io::stderr()) {
        error!("could not write diagnostics: {}", e);
    }
}
