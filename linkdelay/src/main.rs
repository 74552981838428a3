use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use linkdelay_rules::{
    parse_file,
    rtt::{self, Profile},
    RuleSet,
};

/// Inspect and generate delay rule files.
#[derive(clap::Parser, Debug)]
#[command(name = "linkdelay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Log more (repeat for trace output). `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print the rules of a rule file as a table.
    Show {
        /// Rule file to load.
        rules: PathBuf,
    },
    /// Print a rule file in canonical form.
    Render {
        /// Rule file to load.
        rules: PathBuf,
    },
    /// Generate TCP rules from measured round-trip times.
    Gen {
        /// File with `<ip> <port> <rtt-ms>` lines.
        rtt_file: PathBuf,
        /// Scaling applied to the measured RTTs.
        #[arg(long, default_value = "base", value_parser = parse_profile)]
        profile: Profile,
        /// Write the rules here instead of stdout.
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Rules(#[from] linkdelay_rules::Error),
    #[error("failed to write {target}: {source}")]
    Output { target: String, source: io::Error },
}

fn parse_profile(s: &str) -> Result<Profile, String> {
    s.parse()
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(%e, "linkdelay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Show { rules } => {
            let rules = parse_file(&rules)?;
            write_stdout(&rules.table().to_string())
        }
        Command::Render { rules } => {
            let rules = parse_file(&rules)?;
            write_stdout(&rules.to_string())
        }
        Command::Gen { rtt_file, profile, output } => {
            let records = rtt::read_rtt_file(&rtt_file)?;
            let rules = rtt::rules_from_rtts(&records, profile);
            debug!(records = records.len(), rules = rules.len(), ?profile, "generated rules");

            match output {
                Some(path) => write_file(&path, &rules),
                None => write_stdout(&rules.to_string()),
            }
        }
    }
}

fn write_stdout(text: &str) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|source| CliError::Output { target: "stdout".to_owned(), source })
}

fn write_file(path: &Path, rules: &RuleSet) -> Result<(), CliError> {
    let write = || -> io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "{rules}")?;
        out.flush()
    };

    write().map_err(|source| CliError::Output { target: path.display().to_string(), source })
}
