use std::time::Duration;

use serframe_frame::{FrameConfig, FrameReader, FrameWriter};
use tracing::info;

use crate::cmd::{parse_duration, wait_for_frame, SendArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_frame, OutputFormat};

/// Read timeout used while waiting, so the deadline is checked regularly.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = args.payload.resolve()?;

    let read_timeout = args.wait.then_some(POLL_INTERVAL.min(wait_timeout));
    let stream = args.port.open(read_timeout)?;
    let config = FrameConfig {
        read_timeout,
        ..FrameConfig::default()
    };

    let reader_stream = if args.wait {
        Some(
            stream
                .try_clone()
                .map_err(|err| transport_error("clone failed", err))?,
        )
    } else {
        None
    };

    let mut writer = FrameWriter::with_config(stream, config);
    writer.set_own_address(args.source);
    writer
        .send(args.target, args.msg_type, &payload)
        .map_err(|err| frame_error("send failed", err))?;
    info!(
        target_address = args.target,
        msg_type = args.msg_type,
        len = payload.len(),
        "frame sent"
    );

    let Some(reader_stream) = reader_stream else {
        return Ok(SUCCESS);
    };

    let mut reader = FrameReader::with_config_serial(reader_stream, config)
        .map_err(|err| frame_error("receive setup failed", err))?;
    reader.set_own_address(args.source);
    reader.set_broadcast_address(args.broadcast);

    match wait_for_frame(&mut reader, wait_timeout)? {
        Some(frame) => {
            print_frame(&frame, frame.is_broadcast(reader.addresses()), format);
            Ok(SUCCESS)
        }
        None => Err(CliError::new(
            TIMEOUT,
            format!("no response within {}", args.wait_timeout),
        )),
    }
}
