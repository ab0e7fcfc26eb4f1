//
// cli.rs
// Dicom-Study-rs
//
// Defines the CLI surface with Clap and drives a study through read, output redirection, dump and tidy.
//
// Thales Matheus Mendonça Santos - November 2025

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tracing::Level;

use crate::dictionary::{self, FieldDictionary};
use crate::study::Study;

/// Command-line interface glue code: `dicom-study [options] <dicom_dir>`.
#[derive(Parser)]
#[command(name = "dicom-study")]
#[command(about = "Dump every DICOM instance of a study directory", long_about = None)]
#[command(disable_help_flag = true)]
pub struct Cli {
    /// Directory holding the study's DICOM files
    pub directory: Option<PathBuf>,
    /// Data dictionary reference: "std" or a JSON file of tag name overrides
    #[arg(short, long, default_value = dictionary::DEFAULT_SOURCE)]
    pub dictionary: String,
    /// Output filename (defaults to stdout); must not exist yet
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write the JSON study summary instead of the text dump
    #[arg(long)]
    pub json: bool,
    /// Fail if instances disagree on the Study Instance UID
    #[arg(long)]
    pub strict: bool,
    /// Log every file read and binary item extracted to stderr
    #[arg(short, long)]
    pub verbose: bool,
    /// Displays usage
    #[arg(short, long)]
    pub help: bool,
}

pub fn run() -> anyhow::Result<()> {
    let Some(cli) = parse_args(std::env::args_os()) else {
        std::process::exit(1);
    };
    init_logging(cli.verbose);
    execute(&cli)
}

/// Parse the command line, or print an error or the usage and return `None`.
///
/// Bad options, `-h` and a missing directory all end the same way: the caller exits with 1.
pub fn parse_args<I, T>(args: I) -> Option<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) if !cli.help && cli.directory.is_some() => Some(cli),
        Ok(_) => {
            let _ = Cli::command().print_help();
            None
        }
        Err(err) => {
            let _ = err.print();
            None
        }
    }
}

/// Read the study, check it when `--strict`, then write the dump or summary and tidy.
///
/// The output file is only created once the study has been read and checked.
pub fn execute(cli: &Cli) -> anyhow::Result<()> {
    let directory = cli.directory.as_deref().context("No study directory given")?;

    let dictionary = FieldDictionary::open(&cli.dictionary)
        .with_context(|| format!("Failed to open data dictionary {}", cli.dictionary))?;
    let mut study = Study::open(directory, Arc::new(dictionary))
        .with_context(|| format!("Failed to read study from {:?}", directory))?;

    if cli.strict {
        study.check_consistency()?;
    }
    study
        .set_output(cli.output.as_deref())
        .context("Failed to redirect output")?;
    if cli.json {
        study.write_summary().context("Failed to write study summary")?;
    } else {
        study.dump().context("Failed to dump study")?;
    }
    study.tidy().context("Failed to tidy study")?;

    Ok(())
}

fn init_logging(verbose: bool) {
    // Stdout carries the dump, so diagnostics go to stderr.
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}
