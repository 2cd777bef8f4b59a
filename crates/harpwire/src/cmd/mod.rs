use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod dump;
pub mod encode;
pub mod registers;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the device register map.
    Registers(RegistersArgs),
    /// Build and print a validated command frame.
    Encode(EncodeArgs),
    /// Parse a raw frame log and print its contents in stream order.
    Dump(DumpArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Registers(args) => registers::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Dump(args) => dump::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FrameKind {
    Read,
    Write,
    Event,
}

#[derive(Args, Debug)]
pub struct RegistersArgs {
    /// Show only the register at this address.
    #[arg(long)]
    pub address: Option<u8>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Frame kind to build.
    #[arg(value_enum)]
    pub kind: FrameKind,
    /// Register address.
    pub address: u8,
    /// Payload values (required for write and event frames).
    pub values: Vec<i64>,
    /// Attach a device timestamp, in fractional seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timestamp: Option<f64>,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Raw frame log to parse.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
