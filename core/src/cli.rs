// Kommandolinje-argumenter for fitconvert (clap)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::filter::MessageKey;
use crate::source::CrcCheck;

#[derive(Debug, Parser, Clone)]
#[command(name = "fitconvert", version, about)]
pub struct CliArgs {
    /// Settings file (JSON). Missing file means defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print prometheus counters to stderr when done
    #[arg(long, global = true)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Project a frame dump to the JSON frame list
    Project(ProjectCommand),

    /// Project and reduce a frame dump to an activity document
    Activity(ActivityCommand),

    /// Reduce an already projected JSON frame list
    Reduce(ReduceCommand),
}

/// Options shared by commands that read a frame dump
#[derive(Debug, Args, Clone)]
pub struct DecodeArgs {
    /// Frame dump from the decoder (JSON lines)
    pub input: PathBuf,

    /// Message names or global numbers to keep, e.g. `-f session record 20`
    #[arg(short = 'f', long = "filter")]
    #[clap(num_args = 1..)]
    pub filter: Vec<MessageKey>,

    /// CRC mode: disabled, readonly or enforce
    #[arg(long = "crc")]
    pub crc_check: Option<CrcCheck>,

    /// Keep raw profile units (semicircles, m/s, m)
    #[arg(long)]
    pub raw_units: bool,
}

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Output file; stdout when omitted
    #[arg(short = 'o', long = "out")]
    pub out: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ProjectCommand {
    #[command(flatten)]
    pub decode: DecodeArgs,

    /// Also emit definition messages
    #[arg(long)]
    pub keep_definitions: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ActivityCommand {
    #[command(flatten)]
    pub decode: DecodeArgs,

    /// Activity identifier stamped on the summary and every record
    #[arg(long)]
    pub uuid: String,

    /// Producer tag; defaults to the configured converter
    #[arg(long)]
    pub converter: Option<String>,

    /// POST the document to the configured delivery URL
    #[arg(long)]
    pub deliver: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct ReduceCommand {
    /// Projected JSON frame list
    pub input: PathBuf,

    #[arg(long)]
    pub uuid: String,

    #[arg(long)]
    pub converter: Option<String>,

    #[command(flatten)]
    pub output: OutputArgs,
}
