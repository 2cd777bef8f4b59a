use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use harpwire_frame::{Frame, Payload};
use harpwire_registers::resolve;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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

#[derive(Serialize)]
struct FrameOutput {
    message_type: String,
    address: u8,
    register: Option<&'static str>,
    payload_type: String,
    values: Vec<serde_json::Value>,
    timestamp: Option<f64>,
}

impl FrameOutput {
    fn from_frame(frame: &Frame) -> Self {
        Self {
            message_type: frame.message_type.to_string(),
            address: frame.address,
            register: resolve(frame.address).ok().map(|reg| reg.name),
            payload_type: frame.payload.payload_type().to_string(),
            values: json_values(&frame.payload),
            timestamp: frame.timestamp.map(|ts| ts.to_secs_f64()),
        }
    }
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let out = FrameOutput::from_frame(frame);
    match format {
        OutputFormat::Json => {
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
                .set_header(vec!["TYPE", "ADDR", "REGISTER", "PAYLOAD", "TIMESTAMP"])
                .add_row(vec![
                    out.message_type.clone(),
                    out.address.to_string(),
                    out.register.unwrap_or("-").to_string(),
                    format!("{} {}", out.payload_type, payload_preview(&frame.payload)),
                    out.timestamp
                        .map(|ts| format!("{ts:.6}s"))
                        .unwrap_or_else(|| "-".to_string()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let register = out.register.unwrap_or("?");
            let timestamp = out
                .timestamp
                .map(|ts| format!(" @ {ts:.6}s"))
                .unwrap_or_default();
            println!(
                "{} addr={} ({}) {}={}{}",
                out.message_type,
                out.address,
                register,
                out.payload_type,
                payload_preview(&frame.payload),
                timestamp
            );
        }
        OutputFormat::Raw => {
            println!("{}", payload_preview(&frame.payload));
        }
    }
}

/// Render payload elements as a compact bracket list.
pub fn payload_preview(payload: &Payload) -> String {
    let rendered: Vec<String> = match payload {
        Payload::U8(v) => v.iter().map(u8::to_string).collect(),
        Payload::S8(v) => v.iter().map(i8::to_string).collect(),
        Payload::U16(v) => v.iter().map(u16::to_string).collect(),
        Payload::S16(v) => v.iter().map(i16::to_string).collect(),
        Payload::U32(v) => v.iter().map(u32::to_string).collect(),
        Payload::S32(v) => v.iter().map(i32::to_string).collect(),
        Payload::U64(v) => v.iter().map(u64::to_string).collect(),
        Payload::S64(v) => v.iter().map(i64::to_string).collect(),
        Payload::F32(v) => v.iter().map(f32::to_string).collect(),
    };
    format!("[{}]", rendered.join(", "))
}

fn json_values(payload: &Payload) -> Vec<serde_json::Value> {
    match payload {
        Payload::U8(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::S8(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::U16(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::S16(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::U32(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::S32(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::U64(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::S64(v) => v.iter().map(|&x| x.into()).collect(),
        Payload::F32(v) => v.iter().map(|&x| x.into()).collect(),
    }
}

/// Render wire bytes as uppercase hex, space separated.
pub fn hex_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use harpwire_frame::{DeviceTimestamp, MessageType};

    use super::*;

    #[test]
    fn payload_preview_is_compact() {
        assert_eq!(payload_preview(&Payload::U8(vec![1, 2, 3])), "[1, 2, 3]");
        assert_eq!(payload_preview(&Payload::S16(vec![-5])), "[-5]");
    }

    #[test]
    fn hex_preview_is_uppercase() {
        assert_eq!(hex_preview(&[5, 1, 32, 0, 1, 1, 40]), "05 01 20 00 01 01 28");
    }

    #[test]
    fn frame_output_resolves_register_names() {
        let frame = Frame::with_timestamp(
            MessageType::Event,
            32,
            Payload::U8(vec![1]),
            DeviceTimestamp::new(2, 500_000),
        );
        let out = FrameOutput::from_frame(&frame);
        assert_eq!(out.register, Some("SpadSwitch"));
        assert_eq!(out.timestamp, Some(2.5));
        assert_eq!(out.values, vec![serde_json::json!(1)]);

        let unmapped = Frame::new(MessageType::Event, 200, Payload::U8(vec![1]));
        assert_eq!(FrameOutput::from_frame(&unmapped).register, None);
    }
}
