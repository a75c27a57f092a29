use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    let protocol = serframe_frame::protocol_version();
    if !args.extended {
        println!("serframe {} (protocol {protocol})", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: serframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("protocol: {protocol}");
    println!(
        "wire: preamble={}, max_payload={}, overhead={}",
        crate::output::to_spaced_hex(&serframe_frame::DEFAULT_PREAMBLE),
        serframe_frame::DEFAULT_MAX_PAYLOAD,
        serframe_frame::OVERHEAD
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("SERFRAME_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("features: async={}, cli=true", cfg!(feature = "async"));

    Ok(SUCCESS)
}
