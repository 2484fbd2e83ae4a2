use emuipc::frame::{Command, Reply, WireValue, Width};
use emuipc::session::{Access, Backend};
use serde::Serialize;
use tracing::info;

use crate::cmd::{PeekArgs, ReadArgs, Target, WriteArgs};
use crate::exit::{ipc_error, CliError, CliResult, SUCCESS};
use crate::output::{print_fields, print_memory, MemoryCell, OutputFormat};

pub fn read(args: ReadArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let width = resolve_width(&target.backend, Access::Read, args.width)?;
    let session = target.session();
    let reply = session
        .execute(&Command::Read {
            width,
            address: args.address,
        })
        .map_err(|err| ipc_error("read failed", err))?;

    print_memory(&[MemoryCell::new(args.address, wire(reply)?)], format);
    Ok(SUCCESS)
}

#[derive(Serialize)]
struct WriteOutput {
    address: String,
    width: usize,
    value: u64,
    written: bool,
}

pub fn write(args: WriteArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let width = resolve_width(&target.backend, Access::Write, args.width)?;
    let value = WireValue::from_u64(width, args.value)
        .map_err(|err| CliError::usage(format!("value {} rejected: {err}", args.value)))?;

    let session = target.session();
    session
        .execute(&Command::Write {
            address: args.address,
            value,
        })
        .map_err(|err| ipc_error("write failed", err))?;
    info!(address = args.address, width = width.bytes(), "memory written");

    let out = WriteOutput {
        address: format!("{:#010x}", args.address),
        width: width.bytes(),
        value: args.value,
        written: true,
    };
    let fields = [
        ("address", out.address.clone()),
        ("width", out.width.to_string()),
        ("value", out.value.to_string()),
        ("written", out.written.to_string()),
    ];
    print_fields(&out, &fields, format);
    Ok(SUCCESS)
}

/// Read `count` consecutive values with one batch.
pub fn peek(args: PeekArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::usage("--count must be greater than zero"));
    }
    let width = resolve_width(&target.backend, Access::Read, args.width)?;
    let addresses = (0..args.count)
        .map(|i| {
            u32::try_from(i * width.bytes())
                .ok()
                .and_then(|offset| args.address.checked_add(offset))
                .ok_or_else(|| CliError::usage("peek range runs past the 32-bit address space"))
        })
        .collect::<CliResult<Vec<u32>>>()?;

    let session = target.session();
    let mut builder = session.initialize_batch();
    let mut indices = Vec::with_capacity(addresses.len());
    for &address in &addresses {
        let index = builder
            .push(Command::Read { width, address })
            .map_err(|err| ipc_error("peek batch rejected", err))?;
        indices.push(index);
    }
    let mut batch = builder
        .finalize()
        .map_err(|err| ipc_error("peek batch rejected", err))?;
    session
        .send_batch(&mut batch)
        .map_err(|err| ipc_error("peek failed", err))?;

    let cells = addresses
        .iter()
        .zip(indices)
        .map(|(&address, index)| {
            let reply = batch
                .get(index)
                .map_err(|err| ipc_error("peek reply unreadable", err))?;
            Ok(MemoryCell::new(address, wire(reply)?))
        })
        .collect::<CliResult<Vec<_>>>()?;
    print_memory(&cells, format);
    Ok(SUCCESS)
}

/// Check `bytes` against the backend before any connection is made.
fn resolve_width(backend: &Backend, access: Access, bytes: usize) -> CliResult<Width> {
    let opcode = backend
        .resolve_memory(access, bytes)
        .map_err(|err| ipc_error("unsupported access", err))?;
    opcode
        .width()
        .ok_or_else(|| CliError::usage(format!("{opcode} is not a memory access")))
}

fn wire(reply: Reply) -> CliResult<WireValue> {
    let shape = reply.shape().name();
    reply.wire_value().ok_or_else(|| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("expected an integer reply, got {shape}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::USAGE;

    #[test]
    fn wide_access_is_rejected_before_connecting() {
        let err = resolve_width(&Backend::PCSX2, Access::Read, 16).unwrap_err();
        assert_eq!(err.code, USAGE);
        assert_eq!(
            resolve_width(&Backend::RPCS3, Access::Write, 8).unwrap(),
            Width::W64
        );
    }

    #[test]
    fn non_integer_reply_is_internal() {
        assert!(wire(Reply::Text("x".into())).is_err());
        assert_eq!(wire(Reply::U8(3)).unwrap(), WireValue::U8(3));
    }
}
