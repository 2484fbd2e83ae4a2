use serde::Serialize;
use tracing::info;

use crate::cmd::{SlotArgs, Target};
use crate::exit::{ipc_error, CliResult, SUCCESS};
use crate::output::{print_fields, OutputFormat};

#[derive(Serialize)]
struct StateOutput {
    backend: &'static str,
    action: &'static str,
    slot: u8,
}

pub fn save(args: SlotArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    target
        .session()
        .save_state(args.slot)
        .map_err(|err| ipc_error("save-state failed", err))?;
    info!(slot = args.slot, "state saved");
    report(target, "saved", args.slot, format)
}

pub fn load(args: SlotArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    target
        .session()
        .load_state(args.slot)
        .map_err(|err| ipc_error("load-state failed", err))?;
    info!(slot = args.slot, "state loaded");
    report(target, "loaded", args.slot, format)
}

fn report(target: &Target, action: &'static str, slot: u8, format: OutputFormat) -> CliResult<i32> {
    let out = StateOutput {
        backend: target.backend.name,
        action,
        slot,
    };
    print_fields(
        &out,
        &[("backend", out.backend.to_string()), (action, slot.to_string())],
        format,
    );
    Ok(SUCCESS)
}
