//! CAN Signal Decoder CLI Application
//!
//! Reads candump log lines from stdin and annotates every line whose CAN ID is
//! in the signal table with the requested decoded fields:
//! - Field selection by name (or all fields)
//! - Physical values or raw bits in hex
//! - Units and descriptions at higher verbosity
//! - Optional parallel decoding of the whole input

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use can_signal_decoder::{Decoder, DecoderConfig};
use rayon::prelude::*;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

mod config;
mod report;

use report::ReportOptions;

/// CAN Signal Decoder - annotate candump logs with decoded field values
#[derive(Parser, Debug)]
#[command(name = "can-signal")]
#[command(about = "Decode candump log lines from stdin using a JSON signal table", long_about = None)]
#[command(version)]
struct Args {
    /// JSON file of the signal definition table
    #[arg(value_name = "STBL")]
    stbl: Option<PathBuf>,

    /// Fields to show for each decoded line
    #[arg(value_name = "FIELD")]
    fields: Vec<String>,

    /// Show all fields of the message
    #[arg(short, long)]
    all: bool,

    /// Show raw bits in hex instead of physical values
    #[arg(short, long)]
    bits: bool,

    /// Process as CAN-FD format (deprecated: FD lines are detected automatically)
    #[arg(long, hide = true)]
    fd: bool,

    /// Report verbosity: -v adds unit and description, -vvv dumps each line as JSON
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Diagnostic log level (written to stderr)
    #[arg(long, value_enum, value_name = "LEVEL", default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// Suppress all log output except errors
    #[arg(short, long)]
    quiet: bool,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Decode with N worker threads (reads the whole input first)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Skip malformed signal table records instead of failing
    #[arg(long)]
    skip_malformed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// What happened to one input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineStatus {
    Passed,
    Decoded,
    Failed,
}

#[derive(Debug, Default)]
struct RunStats {
    lines: usize,
    decoded: usize,
    failed: usize,
}

impl RunStats {
    fn record(&mut self, status: LineStatus) {
        self.lines += 1;
        match status {
            LineStatus::Passed => {}
            LineStatus::Decoded => self.decoded += 1,
            LineStatus::Failed => self.failed += 1,
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(log_filter(args.log_level, args.quiet));

    log::info!("CAN Signal Decoder CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", can_signal_decoder::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };

    if args.fd {
        log::warn!("--fd is deprecated: CAN-FD lines are detected automatically");
    }

    let stbl = args
        .stbl
        .clone()
        .or_else(|| app_config.schema.file.clone())
        .context("No signal table given (pass STBL or set [schema] file in the config)")?;

    let mut decoder_config = app_config.decoder_config();
    if args.skip_malformed {
        decoder_config = decoder_config.with_skip_malformed_records(true);
    }

    let options = ReportOptions {
        all: args.all || app_config.output.all,
        bits: args.bits || app_config.output.bits,
        verbosity: args.verbose.max(app_config.output.verbosity),
        fields: if args.fields.is_empty() {
            app_config.output.fields.clone()
        } else {
            args.fields.clone()
        },
    };

    let jobs = args.jobs.unwrap_or(app_config.processing.jobs);

    let decoder = load_decoder(&stbl, decoder_config)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let stats = if jobs > 1 {
        parallel_mode(&decoder, stdin.lock(), &mut out, &options, jobs)?
    } else {
        streaming_mode(&decoder, stdin.lock(), &mut out, &options)?
    };
    out.flush()?;

    log::info!(
        "Processed {} lines: {} decoded, {} failed",
        stats.lines,
        stats.decoded,
        stats.failed
    );

    Ok(())
}

fn load_decoder(path: &Path, config: DecoderConfig) -> Result<Decoder> {
    let decoder = Decoder::from_schema_file(path, config)
        .with_context(|| format!("Failed to load signal table: {:?}", path))?;

    let stats = decoder.stats();
    log::info!(
        "Signal table: {} messages ({} with modes), {} fields",
        stats.num_schemas,
        stats.num_variant_schemas,
        stats.num_fields
    );

    Ok(decoder)
}

/// Decode and print one line at a time
fn streaming_mode<R: BufRead, W: Write>(
    decoder: &Decoder,
    input: R,
    out: &mut W,
    options: &ReportOptions,
) -> Result<RunStats> {
    let mut stats = RunStats::default();

    for line in input.lines() {
        let line = line.context("Failed to read input line")?;
        let (rendered, status) = process_line(decoder, &line, options)?;
        writeln!(out, "{}", rendered)?;
        stats.record(status);
    }

    Ok(stats)
}

/// Decode the whole input on a worker pool, printing in input order
fn parallel_mode<R: BufRead, W: Write>(
    decoder: &Decoder,
    input: R,
    out: &mut W,
    options: &ReportOptions,
    jobs: usize,
) -> Result<RunStats> {
    let lines = input
        .lines()
        .collect::<io::Result<Vec<String>>>()
        .context("Failed to read input")?;

    log::debug!("Decoding {} lines with {} threads", lines.len(), jobs);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build worker pool")?;

    let results: Vec<Result<(String, LineStatus)>> = pool.install(|| {
        lines
            .par_iter()
            .map(|line| process_line(decoder, line, options))
            .collect()
    });

    let mut stats = RunStats::default();
    for result in results {
        let (rendered, status) = result?;
        writeln!(out, "{}", rendered)?;
        stats.record(status);
    }

    Ok(stats)
}

/// Decode one line and render it; decode failures only affect this line
fn process_line(
    decoder: &Decoder,
    line: &str,
    options: &ReportOptions,
) -> Result<(String, LineStatus)> {
    match decoder.decode_line(line) {
        Ok(decoded) => {
            let status = if decoded.message.is_some() {
                LineStatus::Decoded
            } else {
                LineStatus::Passed
            };
            Ok((report::render_line(&decoded, options)?, status))
        }
        Err(e) => {
            log::warn!("Failed to decode {:?}: {}", line, e);
            Ok((line.to_string(), LineStatus::Failed))
        }
    }
}

/// Log filter for the requested level; `--quiet` wins
fn log_filter(level: LogLevel, quiet: bool) -> log::LevelFilter {
    if quiet {
        log::LevelFilter::Error
    } else {
        level.into()
    }
}

/// Initialize logging; independent of the report verbosity
fn init_logging(level: log::LevelFilter) {
    use env_logger::Builder;

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_signal_decoder::SchemaTable;

    const TABLE: &str = r#"[
        {"id": "1A0", "name": "Status", "values": [
            {"name": "Counter", "start": 0, "length": 8, "type": "raw",
             "unit": "", "desc": "rolling", "mode_signal": 0, "mode_dependent": ""},
            {"name": "Voltage", "start": 8, "length": 8, "type": "float",
             "resolution": 0.5, "minimum": 0, "unit": "V", "desc": "", "mode_signal": 0, "mode_dependent": ""}
        ]},
        {"id": "2B0", "name": "Drive", "values": [
            {"name": "Mode", "start": 0, "length": 4, "type": "raw",
             "unit": "", "desc": "", "mode_signal": 1, "mode_dependent": ""},
            {"name": "Speed", "start": 4, "length": 12, "type": "raw",
             "unit": "km/h", "desc": "", "mode_signal": 0, "mode_dependent": "0"}
        ]}
    ]"#;

    const INPUT: &str = "\
(1436509052.249713) vcan0 1A0#2A14
plain text
(1436509052.449847) vcan0 2B0#5000
(1436509052.650004) vcan0 7FF#00
(1436509052.850131) vcan0 2B0#0123
";

    fn decoder() -> Decoder {
        let config = DecoderConfig::new();
        let table = SchemaTable::from_json_str(TABLE, &config).unwrap();
        Decoder::new(table, config)
    }

    fn options() -> ReportOptions {
        ReportOptions {
            all: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_streaming_mode() {
        let mut out = Vec::new();
        let stats = streaming_mode(&decoder(), INPUT.as_bytes(), &mut out, &options()).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "(1436509052.249713) vcan0 1A0#2A14 : Counter=42, Voltage=10.0");
        assert_eq!(lines[1], "plain text");
        // Unknown mode: echoed unannotated
        assert_eq!(lines[2], "(1436509052.449847) vcan0 2B0#5000");
        assert_eq!(lines[3], "(1436509052.650004) vcan0 7FF#00");
        assert_eq!(lines[4], "(1436509052.850131) vcan0 2B0#0123 : Mode=0, Speed=291");

        assert_eq!(stats.lines, 5);
        assert_eq!(stats.decoded, 2);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_parallel_mode_preserves_order() {
        let decoder = decoder();

        let mut sequential = Vec::new();
        streaming_mode(&decoder, INPUT.as_bytes(), &mut sequential, &options()).unwrap();

        let mut parallel = Vec::new();
        let stats = parallel_mode(&decoder, INPUT.as_bytes(), &mut parallel, &options(), 4).unwrap();

        assert_eq!(sequential, parallel);
        assert_eq!(stats.lines, 5);
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["can-signal", "-a", "-b", "-vv", "signals.json", "Speed", "Mode"]);
        assert!(args.all);
        assert!(args.bits);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.stbl, Some(PathBuf::from("signals.json")));
        assert_eq!(args.fields, vec!["Speed", "Mode"]);
        assert_eq!(args.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_verbosity_does_not_raise_log_level() {
        let args = Args::parse_from(["can-signal", "-vvv", "signals.json"]);
        assert_eq!(args.verbose, 3);
        assert_eq!(log_filter(args.log_level, args.quiet), log::LevelFilter::Warn);

        let args = Args::parse_from(["can-signal", "--log-level", "debug", "signals.json"]);
        assert_eq!(args.verbose, 0);
        assert_eq!(log_filter(args.log_level, args.quiet), log::LevelFilter::Debug);

        let args = Args::parse_from(["can-signal", "-q", "--log-level", "trace", "signals.json"]);
        assert_eq!(log_filter(args.log_level, args.quiet), log::LevelFilter::Error);
    }
}
