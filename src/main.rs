//! Command-line surface for BIBFRAME-to-MARC conversion and record diffing.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use bibmux::marcxml::{read_first_record_file, records_to_marcxml};
use bibmux::{diff_records, render, Converter, DiffLine, DiffOptions, Graph};

#[derive(Parser)]
#[command(name = "bibmux", version)]
#[command(about = "Convert framed BIBFRAME descriptions to MARC records and diff MARC records")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert a framed JSON-LD description file to MARCXML on stdout
    Convert {
        /// Framed/compacted JSON-LD source file
        source: PathBuf,

        /// Dump the framed and compacted JSON-LD to stderr
        #[arg(long)]
        dump_json: bool,

        /// Verbose, show additional informational messages
        #[arg(short, long)]
        verbose: bool,
    },
    /// Diff two MARCXML records field by field
    Diff {
        /// Left-hand MARCXML file
        file1: PathBuf,

        /// Right-hand MARCXML file
        file2: PathBuf,

        /// Ignore this MARC field (repeatable; numeric or zero-padded tag)
        #[arg(short, long = "ignore")]
        ignore: Vec<String>,

        /// Verbose, also report equal fields
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Exit code for I/O or parse failure, distinct from diff's "records differ".
const EXIT_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Convert { verbose, .. } | Command::Diff { verbose, .. } => *verbose,
    };
    init_tracing(verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("bibmux: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        },
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Command) -> anyhow::Result<ExitCode> {
    match command {
        Command::Convert {
            source,
            dump_json,
            verbose: _,
        } => convert(&source, dump_json),
        Command::Diff {
            file1,
            file2,
            ignore,
            verbose,
        } => diff(&file1, &file2, &ignore, verbose),
    }
}

fn convert(source: &Path, dump_json: bool) -> anyhow::Result<ExitCode> {
    let json = std::fs::read_to_string(source)
        .with_context(|| format!("reading {}", source.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&json).with_context(|| format!("parsing {}", source.display()))?;
    if dump_json {
        eprintln!(
            "Framed and compacted JSON-LD:\n{}",
            serde_json::to_string_pretty(&value)?
        );
    }

    let graph = Graph::from_json_value(&value)?;
    let outcome = Converter::default().map(&graph)?;
    for event in &outcome.events {
        tracing::info!("{event}");
    }
    print!("{}", records_to_marcxml(&outcome.records)?);
    Ok(ExitCode::SUCCESS)
}

fn diff(file1: &Path, file2: &Path, ignore: &[String], verbose: bool) -> anyhow::Result<ExitCode> {
    let mut options = DiffOptions::new().with_verbose(verbose);
    for tag in ignore {
        options = options.ignore_tag(tag)?;
    }

    // Both files must parse before any diff output is produced.
    let left = read_first_record_file(file1)?;
    let right = read_first_record_file(file2)?;

    let lines = diff_records(&left, &right, &options)?;
    let report = render(&lines);
    if !report.is_empty() {
        println!("{report}");
    }

    // Verbose runs report equal fields too, so the exit code keys off
    // actual differences, not report length.
    let differs = lines.iter().any(|l| !matches!(l, DiffLine::Equal { .. }));
    Ok(if differs {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    })
}
