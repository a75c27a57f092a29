use bytes::BytesMut;
use serframe_frame::{encode_frame, Frame, FrameConfig};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let config = FrameConfig::with_max_payload(args.max_payload);

    let wire = build(&config, &args, &payload)?;
    let frame = Frame::parse(&wire, &config).map_err(|err| frame_error("encode failed", err))?;
    print_encoded(&wire, &frame, format);

    Ok(SUCCESS)
}

fn build(config: &FrameConfig, args: &EncodeArgs, payload: &[u8]) -> CliResult<Vec<u8>> {
    let mut wire = BytesMut::new();
    encode_frame(
        config,
        args.source,
        args.target,
        args.msg_type,
        payload,
        &mut wire,
    )
    .map_err(|err| frame_error("encode failed", err))?;
    Ok(wire.to_vec())
}
