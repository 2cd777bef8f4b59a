mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "harpwire", version, about = "Laser driver controller protocol CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registers_subcommand() {
        let cli = Cli::try_parse_from(["harpwire", "registers", "--address", "32"])
            .expect("registers args should parse");
        assert!(matches!(cli.command, Command::Registers(_)));
    }

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "harpwire",
            "encode",
            "write",
            "32",
            "1",
            "--format",
            "json",
        ])
        .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
    }

    #[test]
    fn parses_encode_with_timestamp() {
        let cli = Cli::try_parse_from([
            "harpwire",
            "encode",
            "event",
            "33",
            "1",
            "--timestamp",
            "12.5",
        ])
        .expect("event args should parse");
        match cli.command {
            Command::Encode(args) => assert_eq!(args.timestamp, Some(12.5)),
            other => panic!("expected encode, got {other:?}"),
        }
    }

    #[test]
    fn parses_dump_subcommand() {
        let cli = Cli::try_parse_from(["harpwire", "dump", "/tmp/capture.bin"])
            .expect("dump args should parse");
        assert!(matches!(cli.command, Command::Dump(_)));
    }

    #[test]
    fn rejects_unknown_frame_kind() {
        let err = Cli::try_parse_from(["harpwire", "encode", "poke", "32", "1"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
