mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;
use emuipc::session::Backend;

use crate::cmd::{Command, Target};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "emuipc", version, about = "Emulator memory and state over IPC")]
struct Cli {
    /// Emulator backend (pcsx2, rpcs3, duckstation).
    #[arg(long, value_parser = parse_backend, default_value = "pcsx2", global = true)]
    backend: Backend,

    /// Unix socket path, overriding the backend default.
    #[arg(long, env = "EMUIPC_SOCKET", value_name = "PATH", global = true)]
    socket: Option<PathBuf>,

    /// Loopback TCP port, overriding the backend default.
    #[arg(
        long,
        env = "EMUIPC_PORT",
        value_name = "PORT",
        conflicts_with = "socket",
        global = true
    )]
    port: Option<u16>,

    /// Socket read/write timeout (e.g. 5s, 500ms). Blocks forever if unset.
    #[arg(long, value_name = "DURATION", global = true)]
    timeout: Option<String>,

    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn parse_backend(name: &str) -> Result<Backend, String> {
    Backend::from_name(name).ok_or_else(|| {
        let known: Vec<_> = Backend::ALL.iter().map(|b| b.name.to_lowercase()).collect();
        format!("unknown backend '{name}' (expected one of: {})", known.join(", "))
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = Target::from_flags(cli.backend, cli.socket, cli.port, cli.timeout.as_deref())
        .and_then(|target| cmd::run(cli.command, &target, format));

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
    fn parses_read_subcommand() {
        let cli = Cli::try_parse_from([
            "emuipc", "--backend", "rpcs3", "read", "0x00347D34", "--width", "8",
        ])
        .expect("read args should parse");

        assert_eq!(cli.backend, Backend::RPCS3);
        match cli.command {
            Command::Read(args) => {
                assert_eq!(args.address, 0x0034_7D34);
                assert_eq!(args.width, 8);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = Cli::try_parse_from(["emuipc", "--backend", "dolphin", "info"])
            .expect_err("unknown backend should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn rejects_socket_and_port_together() {
        let err = Cli::try_parse_from([
            "emuipc", "--socket", "/tmp/x.sock", "--port", "28011", "info",
        ])
        .expect_err("conflicting endpoint args should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_write_with_decimal_value() {
        let cli = Cli::try_parse_from(["emuipc", "write", "4096", "255", "--width", "1"])
            .expect("write args should parse");
        match cli.command {
            Command::Write(args) => {
                assert_eq!(args.address, 4096);
                assert_eq!(args.value, 255);
                assert_eq!(args.width, 1);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_query_kinds() {
        let cli = Cli::try_parse_from(["emuipc", "query", "game-version"])
            .expect("query args should parse");
        assert!(matches!(cli.command, Command::Query(_)));
    }
}
