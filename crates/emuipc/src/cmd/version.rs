use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("emuipc {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("EMUIPC_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "transport: {}",
        if cfg!(unix) { "unix socket" } else { "loopback tcp" }
    );
    println!(
        "batch_ceilings: message={} reply={} operations={}",
        emuipc::session::MAX_IPC_SIZE,
        emuipc::session::MAX_IPC_RETURN_SIZE,
        emuipc::session::MAX_BATCH_REPLY_COUNT,
    );

    Ok(SUCCESS)
}
