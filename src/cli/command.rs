use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};

#[derive(Debug, ClapParser)]
#[command(
    name       = env!("CARGO_PKG_NAME"),
    version    = env!("CARGO_PKG_VERSION"),
    author     = env!("CARGO_PKG_AUTHORS"),
    about      = "Tools for inspecting and decoding ETI ensemble streams",
    long_about = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Decode the FIC and MSC of the specified ETI stream.
    Analyse(AnalyseArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct AnalyseArgs {
    /// Input ETI stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Stop after this many frames.
    #[arg(short = 'n', long, value_name = "COUNT")]
    pub num_frames: Option<usize>,

    /// Show the FIC carousel occupancy of every frame.
    #[arg(long)]
    pub fic: bool,

    /// Show FIG repetition rates per second at the end of the run.
    #[arg(long, conflicts_with = "rates_frames")]
    pub rates: bool,

    /// Show FIG repetition rates in frames at the end of the run.
    #[arg(long)]
    pub rates_frames: bool,

    /// Decode the multiplexer software watermark.
    #[arg(long)]
    pub watermark: bool,

    /// Only show the listed FIGs, e.g. "0/1,1/0".
    #[arg(long, value_name = "TYPE/EXT", value_delimiter = ',', value_parser = parse_fig_filter)]
    pub filter: Vec<FigFilter>,

    /// Keep analysing when the ERR byte flags a corrupted frame.
    #[arg(long)]
    pub ignore_error: bool,

    /// Extract a DAB+ subchannel and write its access units to stream-N.msc.
    #[arg(long, value_name = "SUBCHID")]
    pub decode_stream: Option<u8>,

    /// Write a YAML statistics document at the end of the run.
    #[arg(long, value_name = "FILE")]
    pub statistics: Option<PathBuf>,

    /// Treat the input as a bare concatenation of 32 byte FIBs.
    #[arg(long)]
    pub fic_dump: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input ETI stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

/// One `TYPE/EXT` entry of the `--filter` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FigFilter {
    pub figtype: u8,
    pub ext: u8,
}

fn parse_fig_filter(s: &str) -> Result<FigFilter, String> {
    let (figtype, ext) = s
        .split_once('/')
        .ok_or_else(|| format!("expected TYPE/EXT, got \"{s}\""))?;

    Ok(FigFilter {
        figtype: figtype
            .parse()
            .map_err(|_| format!("invalid FIG type \"{figtype}\""))?,
        ext: ext
            .parse()
            .map_err(|_| format!("invalid FIG extension \"{ext}\""))?,
    })
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[test]
fn filter_parsing() {
    assert_eq!(
        parse_fig_filter("0/21"),
        Ok(FigFilter {
            figtype: 0,
            ext: 21
        })
    );
    assert!(parse_fig_filter("0-21").is_err());
    assert!(parse_fig_filter("x/1").is_err());
}
