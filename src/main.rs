use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use samequals::genomics::{open_input, open_output, Mode, ReferenceSet};
use samequals::{recode_stream, PipelineError, RecodeConfig, RunSummary};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Exit status when a record names a reference missing from the FASTA.
const EXIT_UNKNOWN_REFERENCE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "samequals",
    version,
    about = "Replace SAM read bases matching the reference with '=' (or restore them)",
    long_about = "Reads SAM text, rewrites the SEQ column of mapped reads against a FASTA \
                  reference and writes SAM text. All other fields pass through unchanged.\n\n\
                  Example: samtools view -h in.bam | samequals ref.fa add | samtools view -b - > out.bam"
)]
struct Cli {
    /// Reference genome FASTA.
    reference: PathBuf,

    /// Insert equals signs (`add`/`encode`) or restore bases (`remove`/`decode`).
    #[arg(value_enum, ignore_case = true, default_value_t = ModeArg::Add)]
    mode: ModeArg,

    /// SAM input (default: stdin).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// SAM output (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Load the reference through an htslib FASTA index.
    ///
    /// bgzip input is allowed and a missing `.fai` is built.
    #[arg(long)]
    indexed: bool,

    /// Reference overrun warnings to log individually.
    #[arg(long, default_value_t = samequals::pipeline::DEFAULT_WARNING_LOG_LIMIT)]
    max_warnings: usize,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    /// Replace reference-matching bases with '='.
    #[value(alias = "encode")]
    Add,
    /// Restore '=' positions from the reference.
    #[value(alias = "decode")]
    Remove,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Add => Mode::Encode,
            ModeArg::Remove => Mode::Decode,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            eprintln!("{summary}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let pipeline_err = err.downcast_ref::<PipelineError>();
            if let Some(line) = pipeline_err.and_then(PipelineError::offending_line) {
                let mut stderr = std::io::stderr().lock();
                let _ = stderr.write_all(line);
                if !line.ends_with(b"\n") {
                    let _ = stderr.write_all(b"\n");
                }
            }
            error!("{err:#}");
            if pipeline_err.is_some_and(PipelineError::is_unknown_reference) {
                ExitCode::from(EXIT_UNKNOWN_REFERENCE)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<RunSummary> {
    info!(path = %cli.reference.display(), "loading reference sequences");
    let references = if cli.indexed {
        ReferenceSet::from_faidx(&cli.reference)
    } else {
        ReferenceSet::from_fasta_path(&cli.reference)
    }
    .with_context(|| format!("failed to load reference from {}", cli.reference.display()))?;
    info!("sequences for {} references available", references.len());

    let reader = open_input(cli.input.as_deref()).context("failed to open SAM input")?;
    let writer = open_output(cli.output.as_deref()).context("failed to open SAM output")?;

    let config = RecodeConfig::new(cli.mode.into()).with_warning_log_limit(cli.max_warnings);
    let summary = recode_stream(&references, config, reader, writer)?;
    Ok(summary)
}
