use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use emuipc::session::{Backend, Session, SessionConfig};
use emuipc::transport::{Endpoint, SocketTransport};
use tracing::debug;

use crate::exit::{CliError, CliResult};
use crate::output::OutputFormat;

pub mod backends;
pub mod memory;
pub mod query;
pub mod state;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one value from emulator memory.
    Read(ReadArgs),
    /// Write one value to emulator memory.
    Write(WriteArgs),
    /// Read consecutive values in a single batch.
    Peek(PeekArgs),
    /// Ask the emulator one question.
    Query(QueryArgs),
    /// Fetch all emulator and game metadata in one round trip.
    Info,
    /// Save the emulator state to a slot.
    SaveState(SlotArgs),
    /// Load the emulator state from a slot.
    LoadState(SlotArgs),
    /// List known backends and what they support.
    Backends,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, target: &Target, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => memory::read(args, target, format),
        Command::Write(args) => memory::write(args, target, format),
        Command::Peek(args) => memory::peek(args, target, format),
        Command::Query(args) => query::run(args, target, format),
        Command::Info => query::info(target, format),
        Command::SaveState(args) => state::save(args, target, format),
        Command::LoadState(args) => state::load(args, target, format),
        Command::Backends => backends::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// The emulator a command talks to.
#[derive(Debug)]
pub struct Target {
    pub backend: Backend,
    pub config: SessionConfig,
}

impl Target {
    pub fn from_flags(
        backend: Backend,
        socket: Option<PathBuf>,
        port: Option<u16>,
        timeout: Option<&str>,
    ) -> CliResult<Self> {
        let mut config = SessionConfig::for_backend(&backend);
        if let Some(path) = socket {
            config.transport.endpoint = Endpoint::Unix(path);
        } else if let Some(port) = port {
            config.transport.endpoint = Endpoint::loopback(port);
        }
        let timeout = timeout.map(parse_duration).transpose()?;
        config.transport.read_timeout = timeout;
        config.transport.write_timeout = timeout;
        Ok(Self { backend, config })
    }

    pub fn session(&self) -> Session<SocketTransport> {
        debug!(
            backend = self.backend.name,
            endpoint = %self.config.transport.endpoint,
            "opening session"
        );
        Session::with_config(self.backend, self.config.clone())
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Address to read (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_address)]
    pub address: u32,
    /// Value width in bytes.
    #[arg(long, short = 'w', default_value = "4")]
    pub width: usize,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Address to write (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_address)]
    pub address: u32,
    /// Value to write (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_value)]
    pub value: u64,
    /// Value width in bytes.
    #[arg(long, short = 'w', default_value = "4")]
    pub width: usize,
}

#[derive(Args, Debug)]
pub struct PeekArgs {
    /// First address to read (decimal or 0x-prefixed hex).
    #[arg(value_parser = parse_address)]
    pub address: u32,
    /// Number of values to read.
    #[arg(long, short = 'n', default_value = "16")]
    pub count: usize,
    /// Value width in bytes.
    #[arg(long, short = 'w', default_value = "1")]
    pub width: usize,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum QueryKind {
    Version,
    Status,
    Title,
    Id,
    Uuid,
    GameVersion,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// What to ask.
    pub kind: QueryKind,
}

#[derive(Args, Debug)]
pub struct SlotArgs {
    /// Save state slot.
    pub slot: u8,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_address(input: &str) -> Result<u32, String> {
    let value = parse_value(input)?;
    u32::try_from(value).map_err(|_| format!("address {input} does not fit in 32 bits"))
}

pub fn parse_value(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => input.replace('_', "").parse(),
    };
    parsed.map_err(|err| format!("invalid number '{input}': {err}"))
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_numbers() {
        assert_eq!(parse_address("0x00347D34").unwrap(), 0x0034_7D34);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert_eq!(parse_value("0xFFFF_FFFF_FFFF").unwrap(), 0xFFFF_FFFF_FFFF);
        assert!(parse_address("0x1_0000_0000").is_err());
        assert!(parse_value("-1").is_err());
        assert!(parse_value("0xZZ").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn flags_override_backend_endpoint() {
        let target = Target::from_flags(Backend::RPCS3, None, Some(9000), Some("1s")).unwrap();
        assert_eq!(target.config.transport.endpoint, Endpoint::loopback(9000));
        assert_eq!(
            target.config.transport.read_timeout,
            Some(Duration::from_secs(1))
        );

        let path = PathBuf::from("/tmp/custom.sock");
        let target = Target::from_flags(Backend::PCSX2, Some(path.clone()), None, None).unwrap();
        assert_eq!(target.config.transport.endpoint, Endpoint::Unix(path));
        assert_eq!(target.config.transport.read_timeout, None);

        let target = Target::from_flags(Backend::DUCKSTATION, None, None, None).unwrap();
        assert_eq!(
            target.config.transport.endpoint,
            Backend::DUCKSTATION.endpoint()
        );
    }
}
