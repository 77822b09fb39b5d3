//! YMERGE command-line interface.
//!
//! This is the main entry point for the ymerge CLI tool. It uses clap for
//! argument parsing and folds every input document, left to right, into the
//! first one before writing the result.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::*;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, info};
use ymerge::logging::{init_logging, LogLevel};
use ymerge::{
    format_document, infer_output_format, parse_file, parse_stdin, write_output,
    AnchorConflictResolution, AohMergeOpt, ArrayMergeOpt, DocumentFormat, HashMergeOpt,
    MergeConfig, Merger, OutputError, OutputFormat, YamlPath, YmergeError,
};

/// YMERGE - Merge YAML and JSON documents
///
/// Every DOCUMENT is merged, in order, into the first one. Merge behavior for
/// Hashes, Arrays and Arrays-of-Hashes can be tuned globally or per YAML Path
/// through a configuration file.
#[derive(Parser)]
#[command(name = "ymerge")]
#[command(version)]
#[command(about = "Merge YAML and JSON documents", long_about = None)]
struct Cli {
    /// Configuration file (TOML) with [defaults], [rules] and [keys]
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// How to resolve anchor name conflicts
    #[arg(short = 'a', long, value_enum)]
    anchors: Option<AnchorsArg>,

    /// Default merge option for Hashes
    #[arg(short = 'H', long, value_enum)]
    hashes: Option<HashesArg>,

    /// Default merge option for Arrays
    #[arg(short = 'A', long, value_enum)]
    arrays: Option<ArraysArg>,

    /// Default merge option for Arrays-of-Hashes
    #[arg(short = 'O', long, value_enum)]
    aoh: Option<AohArg>,

    /// YAML Path in the first document at which later documents are merged
    #[arg(short = 'm', long, value_name = "YAML_PATH", default_value = "/")]
    mergeat: String,

    /// Write the result to a new file
    #[arg(short = 'o', long, value_name = "FILE", conflicts_with = "overwrite")]
    output: Option<PathBuf>,

    /// Write the result to a file, replacing it if it exists
    #[arg(short = 'w', long, value_name = "FILE")]
    overwrite: Option<PathBuf>,

    /// Copy the file named by --overwrite to FILE.bak before replacing it
    #[arg(short = 'b', long, requires = "overwrite")]
    backup: bool,

    /// Format of the output document; inputs are always detected
    #[arg(short = 'D', long, value_enum, default_value = "auto")]
    document_format: DocumentFormatArg,

    /// Do not read standard input implicitly when it is not a terminal
    #[arg(short = 'S', long)]
    nostdin: bool,

    /// Debug output
    #[arg(short, long, conflicts_with_all = ["verbose", "quiet"])]
    debug: bool,

    /// Verbose output (show progress)
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Documents to merge; use - for standard input
    #[arg(value_name = "DOCUMENT")]
    documents: Vec<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum AnchorsArg {
    Stop,
    Left,
    Right,
    Rename,
}

impl From<AnchorsArg> for AnchorConflictResolution {
    fn from(arg: AnchorsArg) -> Self {
        match arg {
            AnchorsArg::Stop => AnchorConflictResolution::Stop,
            AnchorsArg::Left => AnchorConflictResolution::Left,
            AnchorsArg::Right => AnchorConflictResolution::Right,
            AnchorsArg::Rename => AnchorConflictResolution::Rename,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum HashesArg {
    Stop,
    Left,
    Right,
    Deep,
}

impl From<HashesArg> for HashMergeOpt {
    fn from(arg: HashesArg) -> Self {
        match arg {
            HashesArg::Stop => HashMergeOpt::Stop,
            HashesArg::Left => HashMergeOpt::Left,
            HashesArg::Right => HashMergeOpt::Right,
            HashesArg::Deep => HashMergeOpt::Deep,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum ArraysArg {
    Stop,
    Left,
    Right,
    All,
    Unique,
}

impl From<ArraysArg> for ArrayMergeOpt {
    fn from(arg: ArraysArg) -> Self {
        match arg {
            ArraysArg::Stop => ArrayMergeOpt::Stop,
            ArraysArg::Left => ArrayMergeOpt::Left,
            ArraysArg::Right => ArrayMergeOpt::Right,
            ArraysArg::All => ArrayMergeOpt::All,
            ArraysArg::Unique => ArrayMergeOpt::Unique,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum AohArg {
    Stop,
    Left,
    Right,
    All,
    Unique,
    Deep,
}

impl From<AohArg> for AohMergeOpt {
    fn from(arg: AohArg) -> Self {
        match arg {
            AohArg::Stop => AohMergeOpt::Stop,
            AohArg::Left => AohMergeOpt::Left,
            AohArg::Right => AohMergeOpt::Right,
            AohArg::All => AohMergeOpt::All,
            AohArg::Unique => AohMergeOpt::Unique,
            AohArg::Deep => AohMergeOpt::Deep,
        }
    }
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum DocumentFormatArg {
    /// Follow the output file extension, else the first input
    Auto,
    Json,
    Yaml,
}

impl DocumentFormatArg {
    fn forced_output(self) -> Option<OutputFormat> {
        match self {
            DocumentFormatArg::Auto => None,
            DocumentFormatArg::Json => Some(OutputFormat::Json),
            DocumentFormatArg::Yaml => Some(OutputFormat::Yaml),
        }
    }
}

impl Cli {
    fn log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Debug
        } else if self.verbose {
            LogLevel::Verbose
        } else if self.quiet {
            LogLevel::Quiet
        } else {
            LogLevel::Normal
        }
    }

    fn destination(&self) -> Option<&Path> {
        self.output.as_deref().or(self.overwrite.as_deref())
    }

    /// Appends `-` when piped input is waiting and no DOCUMENT names it.
    fn add_implicit_stdin(&mut self, stdin_is_terminal: bool) {
        if self.nostdin || stdin_is_terminal || self.documents.iter().any(|d| d == "-") {
            return;
        }
        debug!("reading standard input as the last DOCUMENT");
        self.documents.push("-".to_string());
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = match err.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            process::exit(code);
        }
    };

    init_logging(cli.log_level());
    let mut cli = cli;
    cli.add_implicit_stdin(std::io::stdin().is_terminal());

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("{} {:#}", "Error:".red().bold(), err);
            let code = err
                .chain()
                .find_map(|cause| cause.downcast_ref::<YmergeError>())
                .map(YmergeError::exit_code)
                .unwrap_or(1);
            process::exit(code);
        }
    }
}

/// Rejects argument combinations clap cannot express.
fn validate(cli: &Cli) -> Result<(), YmergeError> {
    if cli.documents.is_empty() {
        return Err(YmergeError::usage("There must be at least one DOCUMENT"));
    }
    if cli.documents.iter().filter(|d| d.as_str() == "-").count() > 1 {
        return Err(YmergeError::usage(
            "Only one DOCUMENT may be the - pseudo-file",
        ));
    }
    if let Some(output) = &cli.output {
        if output.exists() {
            return Err(OutputError::FileExists {
                path: output.display().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<MergeConfig, YmergeError> {
    let config = match &cli.config {
        Some(path) => MergeConfig::from_file(path)?,
        None => MergeConfig::new(),
    };
    let mut config = config.with_mergeat(YamlPath::parse(&cli.mergeat)?);
    if let Some(anchors) = cli.anchors {
        config = config.with_anchors(anchors.into());
    }
    if let Some(hashes) = cli.hashes {
        config = config.with_hashes(hashes.into());
    }
    if let Some(arrays) = cli.arrays {
        config = config.with_arrays(arrays.into());
    }
    if let Some(aoh) = cli.aoh {
        config = config.with_aoh(aoh.into());
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<i32> {
    validate(&cli)?;
    let config = build_config(&cli).context("Failed to configure the merge")?;

    let mut merger: Option<Merger> = None;
    let mut first_format = DocumentFormat::Auto;

    for (index, source) in cli.documents.iter().enumerate() {
        info!(document = %source, "processing");

        let stream = if source == "-" {
            parse_stdin(DocumentFormat::Auto)
        } else {
            parse_file(Path::new(source), DocumentFormat::Auto)
        }
        .map_err(YmergeError::from)
        .with_context(|| format!("Failed to parse {}", source))?;

        if index == 0 {
            first_format = stream.format;
        }

        for document in stream.documents {
            match merger.as_mut() {
                None => merger = Some(Merger::new(document, config.clone())),
                Some(merger) => merger
                    .merge_with(document)
                    .map_err(YmergeError::from)
                    .with_context(|| format!("Failed to merge {}", source))?,
            }
        }
    }

    let Some(merger) = merger else {
        return Err(YmergeError::usage("There must be at least one DOCUMENT").into());
    };

    let destination = cli.destination();
    let format = infer_output_format(
        cli.document_format.forced_output(),
        destination,
        first_format,
    );
    let content = format_document(merger.document(), format)
        .map_err(YmergeError::from)
        .context("Failed to format the merged document")?;
    write_output(&content, destination, cli.overwrite.is_some(), cli.backup)
        .map_err(YmergeError::from)
        .context("Failed to write the merged document")?;

    Ok(0)
}
