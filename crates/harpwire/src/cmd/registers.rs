use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use harpwire_registers::{register_map, resolve, RegisterDescriptor, DEVICE_NAME, WHO_AM_I};
use serde::Serialize;

use crate::cmd::RegistersArgs;
use crate::exit::{register_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct RegisterOutput {
    address: u8,
    name: &'static str,
    payload_type: String,
    length: usize,
    access: String,
}

impl From<&RegisterDescriptor> for RegisterOutput {
    fn from(reg: &RegisterDescriptor) -> Self {
        Self {
            address: reg.address,
            name: reg.name,
            payload_type: reg.payload_type.to_string(),
            length: reg.len,
            access: reg.access.to_string(),
        }
    }
}

#[derive(Serialize)]
struct MapOutput {
    device: &'static str,
    who_am_i: u16,
    registers: Vec<RegisterOutput>,
}

pub fn run(args: RegistersArgs, format: OutputFormat) -> CliResult<i32> {
    let registers: Vec<RegisterOutput> = match args.address {
        Some(address) => {
            let reg = resolve(address).map_err(|err| register_error("lookup failed", err))?;
            vec![reg.into()]
        }
        None => register_map().iter().map(RegisterOutput::from).collect(),
    };

    match format {
        OutputFormat::Json => {
            let out = MapOutput {
                device: DEVICE_NAME,
                who_am_i: WHO_AM_I,
                registers,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDR", "NAME", "TYPE", "LENGTH", "ACCESS"]);
            for reg in &registers {
                table.add_row(vec![
                    reg.address.to_string(),
                    reg.name.to_string(),
                    reg.payload_type.clone(),
                    reg.length.to_string(),
                    reg.access.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{DEVICE_NAME} (who-am-i {WHO_AM_I})");
            for reg in &registers {
                println!(
                    "  {:>3}  {:<22} {:<8} x{} {}",
                    reg.address, reg.name, reg.payload_type, reg.length, reg.access
                );
            }
        }
        OutputFormat::Raw => {
            for reg in &registers {
                println!("{}\t{}", reg.address, reg.name);
            }
        }
    }
    Ok(SUCCESS)
}
