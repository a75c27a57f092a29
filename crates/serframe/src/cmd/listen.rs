use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serframe_frame::{FrameConfig, FrameError, FrameReader};
use tracing::{debug, info};

use crate::cmd::ListenArgs;
use crate::exit::{frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

/// Read timeout, so Ctrl-C is noticed while the line is idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let stream = args.port.open(Some(POLL_INTERVAL))?;
    let config = FrameConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..FrameConfig::with_max_payload(args.max_payload)
    };
    let mut reader = FrameReader::with_config_serial(stream, config)
        .map_err(|err| frame_error("listen setup failed", err))?;
    reader.set_own_address(args.own);
    reader.set_broadcast_address(args.broadcast);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                continue
            }
            Err(FrameError::ConnectionClosed) => {
                debug!("end of input");
                break;
            }
            Err(err) => return Err(frame_error("receive failed", err)),
        };

        print_frame(&frame, frame.is_broadcast(reader.addresses()), format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    let stats = reader.stats();
    info!(
        delivered = stats.delivered,
        crc_mismatch = stats.crc_mismatch,
        address_mismatch = stats.address_mismatch,
        "listen stopped"
    );
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
