use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use emuipc::frame::WireValue;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Bare values; memory is written as native-endian bytes.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One value read from or written to emulator memory.
#[derive(Serialize)]
pub struct MemoryCell {
    pub address: String,
    pub width: usize,
    pub value: u64,
    #[serde(skip)]
    pub wire: WireValue,
}

impl MemoryCell {
    pub fn new(address: u32, wire: WireValue) -> Self {
        Self {
            address: format!("{address:#010x}"),
            width: wire.width().bytes(),
            value: wire.as_u64(),
            wire,
        }
    }

    fn hex(&self) -> String {
        format!("{:#0w$x}", self.value, w = 2 + 2 * self.width)
    }
}

pub fn print_memory(cells: &[MemoryCell], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(cells),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "WIDTH", "HEX", "VALUE"]);
            for cell in cells {
                table.add_row(vec![
                    cell.address.clone(),
                    cell.width.to_string(),
                    cell.hex(),
                    cell.value.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for cell in cells {
                println!("{} = {} ({})", cell.address, cell.hex(), cell.value);
            }
        }
        OutputFormat::Raw => {
            let mut bytes = Vec::with_capacity(cells.iter().map(|c| c.width).sum());
            for cell in cells {
                cell.wire.put(&mut bytes);
            }
            print_raw(&bytes);
        }
    }
}

/// Print a flat record: JSON object, two-column table, or `key: value`
/// lines.
pub fn print_fields<T: Serialize>(record: &T, fields: &[(&str, String)], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(record),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (name, value) in fields {
                table.add_row(vec![name.to_string(), value.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
            for (name, value) in fields {
                println!("{name:<width$}  {value}");
            }
        }
        OutputFormat::Raw => {
            for (_, value) in fields {
                println!("{value}");
            }
        }
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_cell_formats_by_width() {
        let cell = MemoryCell::new(0x0034_7D34, WireValue::U16(0x00AB));
        assert_eq!(cell.address, "0x00347d34");
        assert_eq!(cell.hex(), "0x00ab");
        assert_eq!(cell.width, 2);

        let json = serde_json::to_string(&cell).unwrap();
        assert_eq!(json, r#"{"address":"0x00347d34","width":2,"value":171}"#);
    }
}
