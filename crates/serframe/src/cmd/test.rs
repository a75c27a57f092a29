use std::fmt;
use std::time::{Duration, Instant};

use serframe_frame::{Frame, FrameConfig, FrameReader, FrameWriter};
use tracing::{info, warn};

use crate::cmd::{open_port, parse_duration, wait_for_frame, TestArgs};
use crate::config::{parse_hex_bytes, TestPlan, TesterConfigFile};
use crate::exit::{
    frame_error, transport_error, CliError, CliResult, DATA_INVALID, RESPONSE_MISMATCH, SUCCESS,
    USAGE,
};
use crate::output::{print_frame, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a matching response must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ExpectedResponse {
    msg_type: u8,
    source: u8,
    target: u8,
    payload: Vec<u8>,
}

#[derive(Debug, PartialEq, Eq)]
enum Mismatch {
    MessageType { expected: u8, actual: u8 },
    Source { expected: u8, actual: u8 },
    Target { expected: u8, actual: u8 },
    Payload { expected: Vec<u8>, actual: Vec<u8> },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::MessageType { expected, actual } => write!(
                f,
                "message type mismatch: expected 0x{expected:02X}, got 0x{actual:02X}"
            ),
            Mismatch::Source { expected, actual } => write!(
                f,
                "source address mismatch: expected 0x{expected:02X}, got 0x{actual:02X}"
            ),
            Mismatch::Target { expected, actual } => write!(
                f,
                "target address mismatch: expected 0x{expected:02X}, got 0x{actual:02X}"
            ),
            Mismatch::Payload { expected, actual } => write!(
                f,
                "payload mismatch: expected {expected:02X?}, got {actual:02X?}"
            ),
        }
    }
}

impl ExpectedResponse {
    fn check(&self, frame: &Frame) -> Result<(), Mismatch> {
        if frame.msg_type != self.msg_type {
            return Err(Mismatch::MessageType {
                expected: self.msg_type,
                actual: frame.msg_type,
            });
        }
        if frame.source != self.source {
            return Err(Mismatch::Source {
                expected: self.source,
                actual: frame.source,
            });
        }
        if frame.target != self.target {
            return Err(Mismatch::Target {
                expected: self.target,
                actual: frame.target,
            });
        }
        if frame.payload.as_ref() != self.payload.as_slice() {
            return Err(Mismatch::Payload {
                expected: self.payload.clone(),
                actual: frame.payload.to_vec(),
            });
        }
        Ok(())
    }
}

pub fn run(args: TestArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let plan = build_plan(&args)?;

    let port = require(plan.port.clone(), "port")?;
    let target = require(plan.target, "target address")?;
    let my_address = require(plan.my_address, "my address")?;
    let msg_type = require(plan.msg_type, "message type")?;
    let expected = ExpectedResponse {
        msg_type: require(plan.response_type, "response type")?,
        source: target,
        target: my_address,
        payload: plan.response_payload.clone(),
    };

    let read_timeout = Some(POLL_INTERVAL.min(timeout));
    let stream = open_port(&port, plan.baud, read_timeout)?;
    let config = FrameConfig {
        read_timeout,
        ..FrameConfig::default()
    };
    let reader_stream = stream
        .try_clone()
        .map_err(|err| transport_error("clone failed", err))?;

    let mut reader = FrameReader::with_config_serial(reader_stream, config)
        .map_err(|err| frame_error("receive setup failed", err))?;
    reader.set_own_address(my_address);
    reader.set_broadcast_address(my_address);

    let mut writer = FrameWriter::with_config(stream, config);
    writer.set_own_address(my_address);
    writer
        .send(target, msg_type, &plan.payload)
        .map_err(|err| frame_error("send failed", err))?;
    info!(
        target_address = target,
        msg_type,
        len = plan.payload.len(),
        "request sent"
    );

    let deadline = Instant::now() + timeout;
    let mut last_mismatch = None;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let Some(frame) = wait_for_frame(&mut reader, remaining)? else {
            break;
        };

        match expected.check(&frame) {
            Ok(()) => {
                info!("got expected response");
                print_frame(&frame, false, format);
                return Ok(SUCCESS);
            }
            Err(mismatch) => {
                warn!(%mismatch, "unexpected response");
                last_mismatch = Some(mismatch);
            }
        }
    }

    let message = match last_mismatch {
        Some(mismatch) => format!("response did not match: {mismatch}"),
        None => format!("no response within {}", args.timeout),
    };
    Err(CliError::new(RESPONSE_MISMATCH, message))
}

fn build_plan(args: &TestArgs) -> CliResult<TestPlan> {
    let mut plan = TestPlan {
        port: args.port.clone(),
        baud: args.baud,
        target: args.target,
        my_address: args.my_address,
        msg_type: args.msg_type,
        payload: parse_hex_bytes(&args.payload)
            .map_err(|err| CliError::new(USAGE, format!("--payload: {err}")))?,
        response_type: args.response_type,
        response_payload: parse_hex_bytes(&args.response_payload)
            .map_err(|err| CliError::new(USAGE, format!("--response-payload: {err}")))?,
    };

    if let Some(path) = &args.config {
        let file = TesterConfigFile::load(path)?;
        file.apply(&mut plan).map_err(|err| {
            CliError::new(DATA_INVALID, format!("invalid config {}: {err}", path.display()))
        })?;
    }

    Ok(plan)
}

fn require<T>(value: Option<T>, what: &str) -> CliResult<T> {
    value.ok_or_else(|| CliError::new(USAGE, format!("{what} is required (flag or config file)")))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn expected() -> ExpectedResponse {
        ExpectedResponse {
            msg_type: 0x21,
            source: 0x10,
            target: 0x01,
            payload: vec![0x00, 0x01],
        }
    }

    fn response(source: u8, target: u8, msg_type: u8, payload: &'static [u8]) -> Frame {
        Frame {
            source,
            target,
            msg_type,
            payload: Bytes::from_static(payload),
            crc: 0,
        }
    }

    #[test]
    fn matching_response_passes() {
        assert_eq!(expected().check(&response(0x10, 0x01, 0x21, &[0, 1])), Ok(()));
    }

    #[test]
    fn each_field_is_checked_in_order() {
        let exp = expected();
        assert!(matches!(
            exp.check(&response(0x99, 0x99, 0x22, &[])),
            Err(Mismatch::MessageType { expected: 0x21, actual: 0x22 })
        ));
        assert!(matches!(
            exp.check(&response(0x11, 0x01, 0x21, &[0, 1])),
            Err(Mismatch::Source { .. })
        ));
        assert!(matches!(
            exp.check(&response(0x10, 0x02, 0x21, &[0, 1])),
            Err(Mismatch::Target { .. })
        ));
        assert!(matches!(
            exp.check(&response(0x10, 0x01, 0x21, &[0])),
            Err(Mismatch::Payload { .. })
        ));
    }

    #[test]
    fn mismatch_messages_use_hex() {
        let text = Mismatch::Source {
            expected: 0x10,
            actual: 0xAB,
        }
        .to_string();
        assert_eq!(text, "source address mismatch: expected 0x10, got 0xAB");
    }

    #[test]
    fn missing_values_are_usage_errors() {
        let err = require::<u8>(None, "target address").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.contains("target address"));
    }
}
