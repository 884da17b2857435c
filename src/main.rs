use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use profile_stream::execution::TracingObserver;
use profile_stream::generate::{ProfileGenerator, SizeUnit, generate_file};
use profile_stream::logging::init_logging;
use profile_stream::{
    Aggregate, AnalysisConfig, AnalysisError, CancellationToken, RecordFormat, RunMode, RunReport,
    SinkKind, analyze,
};

/// Exit code for a run stopped by Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "profile-stream",
    version,
    about = "Streaming statistics over line-delimited profile records"
)]
struct Cli {
    /// Emit logs as JSON objects instead of text
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a file of random profiles
    Generate {
        /// Output file (truncated if it exists)
        path: PathBuf,

        /// Minimum file size, in `--unit`s
        #[arg(long, default_value_t = 10)]
        size: u64,

        #[arg(long, value_enum, default_value_t = UnitArg::Mb)]
        unit: UnitArg,

        #[arg(long, value_enum, default_value_t = FormatArg::Json)]
        format: FormatArg,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute every configured statistic over a file
    Analyze {
        /// Input file. Overrides `input` from `--config`.
        path: Option<PathBuf>,

        /// JSON config file; flags given here override its values
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Record format (inferred from the extension if omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        #[arg(long, value_enum)]
        sink: Option<SinkArg>,

        /// Directory for sink artifacts
        #[arg(long)]
        out: Option<PathBuf>,

        /// Emit a progress event every N records per pipeline
        #[arg(long)]
        progress_every: Option<u64>,

        /// Worker threads for concurrent mode
        #[arg(long)]
        threads: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    B,
    Kb,
    Mb,
    Gb,
}

impl From<UnitArg> for SizeUnit {
    fn from(u: UnitArg) -> Self {
        match u {
            UnitArg::B => SizeUnit::B,
            UnitArg::Kb => SizeUnit::KB,
            UnitArg::Mb => SizeUnit::MB,
            UnitArg::Gb => SizeUnit::GB,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Literal,
}

impl From<FormatArg> for RecordFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Json => RecordFormat::Json,
            FormatArg::Literal => RecordFormat::Literal,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Sequential,
    Concurrent,
}

impl From<ModeArg> for RunMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Sequential => RunMode::Sequential,
            ModeArg::Concurrent => RunMode::Concurrent,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SinkArg {
    Text,
    Json,
    None,
}

impl From<SinkArg> for SinkKind {
    fn from(s: SinkArg) -> Self {
        match s {
            SinkArg::Text => SinkKind::Text,
            SinkArg::Json => SinkKind::Json,
            SinkArg::None => SinkKind::None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::warn!("interrupt received, stopping pipelines");
        on_signal.cancel();
    }) {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }

    match cli.command {
        Command::Generate {
            path,
            size,
            unit,
            format,
            seed,
        } => run_generate(path, size, unit.into(), format.into(), seed, &cancel),
        Command::Analyze {
            path,
            config,
            mode,
            format,
            sink,
            out,
            progress_every,
            threads,
        } => {
            let mut cfg = match config {
                Some(file) => match AnalysisConfig::from_file(&file) {
                    Ok(cfg) => cfg,
                    Err(e) => return fail(&e),
                },
                None => AnalysisConfig::default(),
            };
            if path.is_some() {
                cfg.input = path;
            }
            if let Some(m) = mode {
                cfg.mode = m.into();
            }
            if let Some(f) = format {
                cfg.format = Some(f.into());
            }
            if let Some(s) = sink {
                cfg.sink = s.into();
            }
            if let Some(o) = out {
                cfg.output_dir = o;
            }
            if let Some(n) = progress_every {
                cfg.progress_every = n;
            }
            if threads.is_some() {
                cfg.threads = threads;
            }
            run_analyze(&cfg, cancel)
        }
    }
}

fn run_generate(
    path: PathBuf,
    size: u64,
    unit: SizeUnit,
    format: RecordFormat,
    seed: Option<u64>,
    cancel: &CancellationToken,
) -> ExitCode {
    let generator = match seed {
        Some(seed) => ProfileGenerator::seeded(seed),
        None => ProfileGenerator::new(),
    };
    let min_bytes = size.saturating_mul(unit.bytes());
    tracing::info!(path = %path.display(), min_bytes, ?format, "generating profiles");

    match generate_file(&path, min_bytes, format, generator, cancel) {
        Ok(stats) => {
            println!(
                "wrote {} records ({} bytes) to {}",
                stats.records,
                stats.bytes,
                path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_analyze(cfg: &AnalysisConfig, cancel: CancellationToken) -> ExitCode {
    let report = match analyze(cfg, Some(Arc::new(TracingObserver)), cancel) {
        Ok(report) => report,
        Err(e) => return fail(&e),
    };
    print_summary(&report);

    if report.was_interrupted() {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(report: &RunReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(aggregate) => {
                println!(
                    "{}: ok ({} records, {:.2?})",
                    outcome.statistic, outcome.records, outcome.elapsed
                );
                match aggregate {
                    Aggregate::UsernameLengths(avg) => {
                        for (category, value) in avg {
                            println!("  {category}: {value:.2}");
                        }
                    }
                    other => println!("  {} distinct values", other.len()),
                }
                if let Some(path) = &outcome.artifact {
                    println!("  written to {}", path.display());
                }
            }
            Err(e) => println!("{}: failed: {e}", outcome.statistic),
        }
    }
    println!("total: {:.2?}", report.elapsed);
}

fn fail(e: &AnalysisError) -> ExitCode {
    tracing::error!(error = %e, "run failed");
    eprintln!("error: {e}");
    if e.is_interrupted() {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::FAILURE
    }
}
