use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use log::info;
use mvnlink_core::dispatch::{
    BoxedSink, ChannelRegistry, DiscardSink, FrameDispatcher, VariantRegistry,
};
use mvnlink_core::protocols::mxtp::{DatagramKind, DecodeOptions, layout};
use mvnlink_core::source::UdpSocketSource;
use mvnlink_core::{InputInfo, Report, ReplayOptions};

mod samples;

use samples::SampleFile;

#[derive(Parser, Debug)]
#[command(name = "mvnlink")]
#[command(version, long_version = long_version())]
#[command(
    about = "Decoder for MVN network streaming (MXTP) motion-capture datagrams.",
    long_about = None,
    after_help = "Examples:\n  mvnlink replay session.pcapng -o report.json\n  mvnlink replay session.pcapng --stdout --samples samples.jsonl\n  mvnlink listen --bind 0.0.0.0:9763 --frames 600 --stdout"
)]
struct Cli {
    /// Log decoding details to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a PCAP/PCAPNG capture through the decoder and write a JSON report.
    Replay {
        /// Path (or glob) to a .pcap or .pcapng file
        input: PathBuf,

        /// UDP destination port carrying MXTP traffic
        #[arg(long, default_value_t = layout::DEFAULT_PORT, conflicts_with = "any_port")]
        port: u16,

        /// Decode every UDP datagram regardless of port
        #[arg(long)]
        any_port: bool,

        #[command(flatten)]
        decode: DecodeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Decode live datagrams from a UDP socket.
    Listen {
        /// Local address to bind
        #[arg(long, default_value = "0.0.0.0:9763")]
        bind: SocketAddr,

        /// Stop after this many datagrams
        #[arg(long)]
        frames: Option<u64>,

        /// Stop when no datagram arrives within this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        #[command(flatten)]
        decode: DecodeArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the channel declarations as JSON.
    Channels {
        /// Only these datagram types (euler, quaternion, markers, linear, angular, tracker)
        #[arg(long, value_delimiter = ',', value_parser = parse_kind)]
        only: Vec<DatagramKind>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Wire position units per meter
    #[arg(long, default_value_t = layout::POSITION_SCALE, value_parser = parse_scale)]
    position_scale: f32,

    /// Only decode these datagram types (euler, quaternion, markers, linear, angular, tracker)
    #[arg(long, value_delimiter = ',', value_parser = parse_kind)]
    only: Vec<DatagramKind>,

    /// Write every pushed sample as a JSON line to this file
    #[arg(long)]
    samples: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output report path (JSON)
    #[arg(short = 'o', long)]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Compact JSON output (default)
    #[arg(long)]
    compact: bool,

    /// Suppress non-error output
    #[arg(long)]
    quiet: bool,

    /// Exit with a non-zero code if any frame was dropped
    #[arg(long)]
    strict: bool,

    /// List dropped-frame errors after decoding
    #[arg(long)]
    list_errors: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.command.quiet());

    let result = match cli.command {
        Commands::Replay {
            input,
            port,
            any_port,
            decode,
            output,
        } => cmd_replay(input, (!any_port).then_some(port), decode, output),
        Commands::Listen {
            bind,
            frames,
            timeout_ms,
            decode,
            output,
        } => cmd_listen(bind, frames, timeout_ms, decode, output),
        Commands::Channels { only, pretty } => cmd_channels(only, pretty),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

impl Commands {
    fn quiet(&self) -> bool {
        match self {
            Commands::Replay { output, .. } | Commands::Listen { output, .. } => output.quiet,
            Commands::Channels { .. } => false,
        }
    }
}

/// RUST_LOG replaces the default filter; `--verbose` overrides both.
fn init_logging(verbose: bool, quiet: bool) {
    let default_filter = if quiet { "error" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (commit ",
        env!("MVNLINK_BUILD_COMMIT"),
        ", built ",
        env!("MVNLINK_BUILD_DATE"),
        ")"
    )
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        // Keep the context chain, e.g. "replay failed: I/O error: ...".
        CliError::new(format!("{:#}", err), None)
    }
}

fn parse_kind(value: &str) -> Result<DatagramKind, String> {
    DatagramKind::from_label(value.trim()).ok_or_else(|| {
        let known: Vec<_> = DatagramKind::ALL.iter().map(|kind| kind.label()).collect();
        format!("unknown datagram type '{}' (expected one of: {})", value, known.join(", "))
    })
}

fn parse_scale(value: &str) -> Result<f32, String> {
    let scale: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !scale.is_finite() || scale <= 0.0 {
        return Err("position scale must be a positive number".to_string());
    }
    Ok(scale)
}

/// Decoder pieces built once per run from the shared flags.
struct Pipeline {
    dispatcher: FrameDispatcher,
    channels: ChannelRegistry,
    samples: Option<SampleFile>,
}

impl Pipeline {
    fn build(decode: &DecodeArgs) -> Result<Self, CliError> {
        let kinds = selected_kinds(&decode.only);
        let samples = decode
            .samples
            .as_deref()
            .map(|path| {
                SampleFile::create(path)
                    .with_context(|| format!("Failed to create samples file: {}", path.display()))
            })
            .transpose()?;
        let channels = ChannelRegistry::open(kinds.iter().copied(), |info| {
            Ok(match &samples {
                Some(file) => file.sink_for(info),
                None => Box::new(DiscardSink) as BoxedSink,
            })
        })
        .context("Failed to open output channels")?;
        let dispatcher = FrameDispatcher::new(
            VariantRegistry::from_kinds(kinds),
            DecodeOptions {
                position_scale: decode.position_scale,
            },
        );
        Ok(Self {
            dispatcher,
            channels,
            samples,
        })
    }

    fn finish(&self) -> Result<(), CliError> {
        if let Some(samples) = &self.samples {
            samples.flush().context("Failed to write samples file")?;
        }
        Ok(())
    }
}

fn selected_kinds(only: &[DatagramKind]) -> Vec<DatagramKind> {
    if only.is_empty() {
        DatagramKind::ALL.to_vec()
    } else {
        let mut kinds = only.to_vec();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

fn cmd_replay(
    input: PathBuf,
    port: Option<u16>,
    decode: DecodeArgs,
    output: OutputArgs,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    if !output.stdout && output.report.is_none() {
        return Err(CliError::new(
            "missing output path",
            Some("use -o/--report or --stdout".to_string()),
        ));
    }
    if let Some(report_path) = output.report.as_deref() {
        ensure_distinct_output(report_path, &input_abs, "report")?;
    }
    if let Some(samples_path) = decode.samples.as_deref() {
        ensure_distinct_output(samples_path, &input_abs, "samples")?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }

    let pipeline = Pipeline::build(&decode)?;
    let options = ReplayOptions {
        port,
        max_datagrams: None,
    };
    info!("replaying {} (port filter {:?})", resolved_input.display(), port);
    let rep = mvnlink_core::replay_pcap_file(
        &resolved_input,
        &pipeline.dispatcher,
        &pipeline.channels,
        &options,
    )
    .context("PCAP/PCAPNG replay failed")?;
    pipeline.finish()?;
    emit_report(&rep, &output)
}

fn cmd_listen(
    bind: SocketAddr,
    frames: Option<u64>,
    timeout_ms: Option<u64>,
    decode: DecodeArgs,
    output: OutputArgs,
) -> Result<(), CliError> {
    if timeout_ms == Some(0) {
        return Err(CliError::new(
            "--timeout-ms must be greater than zero",
            Some("omit it to wait indefinitely".to_string()),
        ));
    }
    let pipeline = Pipeline::build(&decode)?;
    let source = UdpSocketSource::bind(bind, timeout_ms.map(Duration::from_millis))
        .with_context(|| format!("Failed to bind UDP socket: {}", bind))?;
    if !output.quiet {
        eprintln!("listening on {}", bind);
    }
    let options = ReplayOptions {
        port: None,
        max_datagrams: frames,
    };
    let input = InputInfo {
        path: bind.to_string(),
        bytes: 0,
    };
    let rep = mvnlink_core::stream_datagrams(
        input,
        source,
        &pipeline.dispatcher,
        &pipeline.channels,
        &options,
    )
    .context("UDP listen failed")?;
    pipeline.finish()?;

    if output.report.is_none() && !output.stdout {
        if !output.quiet {
            let datagrams = rep
                .capture_summary
                .as_ref()
                .map(|summary| summary.datagrams_total)
                .unwrap_or(0);
            eprintln!("OK: {} datagrams in {} streams", datagrams, rep.streams.len());
        }
        if output.list_errors && !output.quiet {
            print_errors(&rep);
        }
        return check_strict(&rep, output.strict);
    }
    emit_report(&rep, &output)
}

fn cmd_channels(only: Vec<DatagramKind>, pretty: bool) -> Result<(), CliError> {
    let channels = ChannelRegistry::open(selected_kinds(&only), |_| {
        Ok(Box::new(DiscardSink) as BoxedSink)
    })
    .context("Failed to open channels")?;
    let infos: Vec<_> = channels.infos().collect();
    let json = if pretty {
        serde_json::to_string_pretty(&infos)
    } else {
        serde_json::to_string(&infos)
    }
    .context("JSON serialization failed")?;
    println!("{}", json);
    Ok(())
}

fn emit_report(rep: &Report, output: &OutputArgs) -> Result<(), CliError> {
    let json = serialize_report(rep, output.pretty, output.compact)?;

    if output.stdout {
        print!("{}", json);
        if output.list_errors && !output.quiet {
            print_errors(rep);
        }
        return check_strict(rep, output.strict);
    }

    let report = output.report.as_deref().ok_or_else(|| {
        CliError::new(
            "missing output path",
            Some("use -o/--report or --stdout".to_string()),
        )
    })?;
    if let Some(parent) = report.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }

    fs::write(report, json)
        .with_context(|| format!("Failed to write report: {}", report.display()))?;

    if output.list_errors && !output.quiet {
        print_errors(rep);
    }
    if !output.quiet {
        eprintln!("OK: report written -> {}", report.display());
    }
    check_strict(rep, output.strict)
}

fn check_strict(rep: &Report, strict: bool) -> Result<(), CliError> {
    if strict && !rep.errors.is_empty() {
        return Err(CliError::new(
            "dropped frames detected",
            Some("use --list-errors to inspect".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(rep: &Report, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn print_errors(rep: &Report) {
    eprintln!("Dropped frames:");
    if rep.errors.is_empty() {
        eprintln!("  none");
    }
    for error in &rep.errors {
        eprintln!("  {} ({}): {}", error.id, error.count, error.message);
        for example in &error.examples {
            eprintln!("    {}", example);
        }
    }
}

/// Refuse to overwrite the capture with an output file.
fn ensure_distinct_output(path: &Path, input_abs: &Path, what: &str) -> Result<(), CliError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent),
        _ => fs::canonicalize("."),
    };
    // Missing directories are created later and cannot hold the input.
    let Ok(dir) = dir else {
        return Ok(());
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid {} path: {}", what, path.display()))?;
    if dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!("{} path must differ from input: {}", what, path.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    match matches.len() {
        0 => Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        )),
        1 => Ok(matches.remove(0)),
        count => {
            let mut listed = matches
                .iter()
                .take(3)
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if count > 3 {
                listed.push_str(", ...");
            }
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}' ({} matches); matches: {}",
                    pattern, count, listed
                ),
                Some("pass a single capture file, or run once per file".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
