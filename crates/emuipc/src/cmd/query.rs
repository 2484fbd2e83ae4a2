use emuipc::session::{Result as IpcResult, Session};
use emuipc::transport::SocketTransport;
use serde::Serialize;

use crate::cmd::{QueryArgs, QueryKind, Target};
use crate::exit::{ipc_error, CliResult, SUCCESS};
use crate::output::{print_fields, OutputFormat};

#[derive(Serialize)]
struct QueryOutput {
    backend: &'static str,
    query: &'static str,
    value: String,
}

pub fn run(args: QueryArgs, target: &Target, format: OutputFormat) -> CliResult<i32> {
    let session = target.session();
    let value = ask(&session, args.kind).map_err(|err| ipc_error("query failed", err))?;

    let out = QueryOutput {
        backend: target.backend.name,
        query: query_name(args.kind),
        value,
    };
    print_fields(&out, &[(out.query, out.value.clone())], format);
    Ok(SUCCESS)
}

fn ask(session: &Session<SocketTransport>, kind: QueryKind) -> IpcResult<String> {
    match kind {
        QueryKind::Version => session.version(),
        QueryKind::Status => session.status().map(|status| status.to_string()),
        QueryKind::Title => session.game_title(),
        QueryKind::Id => session.game_id(),
        QueryKind::Uuid => session.game_uuid(),
        QueryKind::GameVersion => session.game_version(),
    }
}

fn query_name(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Version => "version",
        QueryKind::Status => "status",
        QueryKind::Title => "title",
        QueryKind::Id => "id",
        QueryKind::Uuid => "uuid",
        QueryKind::GameVersion => "game_version",
    }
}

#[derive(Serialize)]
struct InfoOutput {
    backend: &'static str,
    endpoint: String,
    version: String,
    status: String,
    title: String,
    id: String,
    uuid: String,
    game_version: String,
}

/// Every metadata query, batched into one round trip.
pub fn info(target: &Target, format: OutputFormat) -> CliResult<i32> {
    let session = target.session();
    let out = fetch_info(&session, target).map_err(|err| ipc_error("info failed", err))?;

    let fields = [
        ("backend", out.backend.to_string()),
        ("endpoint", out.endpoint.clone()),
        ("version", out.version.clone()),
        ("status", out.status.clone()),
        ("title", out.title.clone()),
        ("id", out.id.clone()),
        ("uuid", out.uuid.clone()),
        ("game_version", out.game_version.clone()),
    ];
    print_fields(&out, &fields, format);
    Ok(SUCCESS)
}

fn fetch_info(session: &Session<SocketTransport>, target: &Target) -> IpcResult<InfoOutput> {
    let mut builder = session.initialize_batch();
    let version = builder.version()?;
    let status = builder.status()?;
    let title = builder.game_title()?;
    let id = builder.game_id()?;
    let uuid = builder.game_uuid()?;
    let game_version = builder.game_version()?;
    let mut batch = builder.finalize()?;
    session.send_batch(&mut batch)?;

    Ok(InfoOutput {
        backend: target.backend.name,
        endpoint: target.config.transport.endpoint.to_string(),
        version: batch.text(version)?,
        status: batch.status(status)?.to_string(),
        title: batch.text(title)?,
        id: batch.text(id)?,
        uuid: batch.text(uuid)?,
        game_version: batch.text(game_version)?,
    })
}
