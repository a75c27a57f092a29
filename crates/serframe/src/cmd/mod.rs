use clap::{Args, Subcommand};
use std::io::{ErrorKind, Read};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use serframe_frame::{Frame, FrameError, FrameReader};
use serframe_transport::{PortConfig, SerialStream};

use crate::config::{parse_hex_bytes, parse_u8};
use crate::exit::{frame_error, io_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod test;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a frame and print it.
    Encode(EncodeArgs),
    /// Run bytes through a receiver and print every accepted frame.
    Decode(DecodeArgs),
    /// Send a single frame on a serial port.
    Send(SendArgs),
    /// Listen on a serial port and print received frames.
    Listen(ListenArgs),
    /// Send a request and check the response against an expectation.
    Test(TestArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Test(args) => test::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial port selection shared by commands that open a device.
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Serial device or file path.
    #[arg(env = "SERFRAME_PORT")]
    pub port: PathBuf,
    /// Line speed in baud.
    #[arg(long, short = 'b', env = "SERFRAME_BAUD", default_value = "9600")]
    pub baud: u32,
}

/// Payload source; at most one may be given. No source means an empty payload.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Payload as a UTF-8 string.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Payload as hex bytes (e.g. "01 02 ff" or "0102ff").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(hex) = &self.hex {
            return parse_hex_bytes(hex)
                .map_err(|err| CliError::new(USAGE, format!("--hex: {err}")));
        }
        if let Some(path) = &self.file {
            return std::fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Source address.
    #[arg(long, short = 's', default_value = "0", value_parser = parse_u8)]
    pub source: u8,
    /// Target address.
    #[arg(long, short = 't', value_parser = parse_u8)]
    pub target: u8,
    /// Message type.
    #[arg(long = "type", short = 'm', value_parser = parse_u8)]
    pub msg_type: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Largest payload accepted.
    #[arg(long, default_value = "256")]
    pub max_payload: u16,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex bytes to decode. Reads --file or stdin when omitted.
    #[arg(conflicts_with = "file")]
    pub input: Option<String>,
    /// Read raw bytes from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Own address; frames for other targets are dropped.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub own: u8,
    /// Broadcast address.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub broadcast: u8,
    /// Largest payload accepted.
    #[arg(long, default_value = "256")]
    pub max_payload: u16,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Own address, used as the frame source.
    #[arg(long, short = 's', default_value = "0", value_parser = parse_u8)]
    pub source: u8,
    /// Target address.
    #[arg(long, short = 't', value_parser = parse_u8)]
    pub target: u8,
    /// Message type.
    #[arg(long = "type", short = 'm', value_parser = parse_u8)]
    pub msg_type: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
    /// Broadcast address accepted while waiting.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub broadcast: u8,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Own address; frames for other targets are dropped.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub own: u8,
    /// Broadcast address.
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub broadcast: u8,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Largest payload accepted.
    #[arg(long, default_value = "256")]
    pub max_payload: u16,
}

#[derive(Args, Debug)]
pub struct TestArgs {
    /// JSON tester configuration. Values in the file override flags.
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
    /// Serial device or file path.
    #[arg(long, short = 'p', env = "SERFRAME_PORT")]
    pub port: Option<PathBuf>,
    /// Line speed in baud.
    #[arg(long, short = 'b', env = "SERFRAME_BAUD", default_value = "9600")]
    pub baud: u32,
    /// Address the request is sent to.
    #[arg(long, short = 't', value_parser = parse_u8)]
    pub target: Option<u8>,
    /// This tester's own address.
    #[arg(long, short = 'a', value_parser = parse_u8)]
    pub my_address: Option<u8>,
    /// Request message type.
    #[arg(long = "type", short = 'm', value_parser = parse_u8)]
    pub msg_type: Option<u8>,
    /// Request payload as hex bytes.
    #[arg(long, default_value = "")]
    pub payload: String,
    /// Expected response message type.
    #[arg(long, short = 'e', value_parser = parse_u8)]
    pub response_type: Option<u8>,
    /// Expected response payload as hex bytes.
    #[arg(long, short = 'r', default_value = "")]
    pub response_payload: String,
    /// Time to wait for the response (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

impl PortArgs {
    pub fn open(&self, read_timeout: Option<Duration>) -> CliResult<SerialStream> {
        open_port(&self.port, self.baud, read_timeout)
    }
}

pub fn open_port(
    path: &std::path::Path,
    baud: u32,
    read_timeout: Option<Duration>,
) -> CliResult<SerialStream> {
    let config = PortConfig {
        baud_rate: baud,
        read_timeout,
    };
    SerialStream::open(path, &config).map_err(|err| transport_error("open failed", err))
}

/// Read frames until one arrives or `timeout` passes.
///
/// Returns `None` on timeout or end of input. The stream's own read timeout
/// bounds how far past `timeout` a blocked read can run.
pub fn wait_for_frame<R: Read>(
    reader: &mut FrameReader<R>,
    timeout: Duration,
) -> CliResult<Option<Frame>> {
    let start = Instant::now();
    loop {
        match reader.read_frame() {
            Ok(frame) => return Ok(Some(frame)),
            Err(FrameError::ConnectionClosed) => return Ok(None),
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                if start.elapsed() >= timeout {
                    return Ok(None);
                }
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        }
    }
}

/// Parse `5s`, `150ms` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
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
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}
