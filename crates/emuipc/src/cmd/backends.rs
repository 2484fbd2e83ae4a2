use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use emuipc::session::{Backend, CapabilitySet};
use serde::Serialize;

use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct BackendOutput {
    name: &'static str,
    endpoint: String,
    memory: bool,
    queries: bool,
    save_states: bool,
    opcodes: Vec<&'static str>,
}

impl From<&Backend> for BackendOutput {
    fn from(backend: &Backend) -> Self {
        let caps = backend.capabilities;
        Self {
            name: backend.name,
            endpoint: backend.endpoint().to_string(),
            memory: covers(caps, CapabilitySet::MEMORY),
            queries: covers(caps, CapabilitySet::QUERIES),
            save_states: covers(caps, CapabilitySet::SAVE_STATES),
            opcodes: caps.iter().map(|opcode| opcode.name()).collect(),
        }
    }
}

fn covers(caps: CapabilitySet, group: CapabilitySet) -> bool {
    group.iter().all(|opcode| caps.contains(opcode))
}

pub fn run(format: OutputFormat) -> CliResult<i32> {
    let backends: Vec<BackendOutput> = Backend::ALL.iter().map(BackendOutput::from).collect();

    match format {
        OutputFormat::Json => print_json(&backends),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["BACKEND", "ENDPOINT", "MEMORY", "QUERIES", "SAVE STATES"]);
            for b in &backends {
                table.add_row(vec![
                    b.name.to_string(),
                    b.endpoint.clone(),
                    yes_no(b.memory).to_string(),
                    yes_no(b.queries).to_string(),
                    yes_no(b.save_states).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for b in &backends {
                println!("{} {} [{}]", b.name, b.endpoint, b.opcodes.join(", "));
            }
        }
    }
    Ok(SUCCESS)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
