use std::io::Read;

use serframe_frame::{AddressConfig, Frame, FrameConfig, FrameQueue, FrameReceiver, ReceiverStats};
use tracing::{debug, info};

use crate::cmd::DecodeArgs;
use crate::config::parse_hex_bytes;
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = read_input(&args)?;
    let addresses = AddressConfig::new(args.own, args.broadcast);
    let (frames, stats) = decode(&bytes, FrameConfig::with_max_payload(args.max_payload), &addresses);

    debug!(
        delivered = stats.delivered,
        crc_mismatch = stats.crc_mismatch,
        address_mismatch = stats.address_mismatch,
        preamble_mismatch = stats.preamble_mismatch,
        oversized_length = stats.oversized_length,
        "decode finished"
    );

    if frames.is_empty() {
        return Err(CliError::new(
            DATA_INVALID,
            format!("no frames accepted from {} bytes", bytes.len()),
        ));
    }

    for frame in &frames {
        print_frame(frame, frame.is_broadcast(&addresses), format);
    }
    info!(count = frames.len(), "decoded frames");

    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.input {
        return parse_hex_bytes(hex).map_err(|err| CliError::new(USAGE, format!("input: {err}")));
    }
    if let Some(path) = &args.file {
        return std::fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }

    let mut bytes = Vec::new();
    std::io::stdin()
        .read_to_end(&mut bytes)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(bytes)
}

fn decode(bytes: &[u8], config: FrameConfig, addresses: &AddressConfig) -> (Vec<Frame>, ReceiverStats) {
    let mut receiver = FrameReceiver::new(config);
    let mut queue = FrameQueue::new(config);
    receiver.feed(bytes, addresses, &mut queue);
    (queue.drain(), *receiver.stats())
}
