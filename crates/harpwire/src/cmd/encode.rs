use bytes::BytesMut;
use harpwire_frame::{encode_frame, DeviceTimestamp, Frame, MessageType, Payload};
use harpwire_registers::resolve;
use serde::Serialize;

use crate::cmd::{EncodeArgs, FrameKind};
use crate::exit::{frame_error, register_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{hex_preview, print_frame, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    bytes: String,
    length: usize,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args)?;

    let mut wire = BytesMut::new();
    encode_frame(&frame, &mut wire).map_err(|err| frame_error("encode failed", err))?;

    match format {
        OutputFormat::Json => {
            let out = EncodeOutput {
                bytes: hex_preview(&wire),
                length: wire.len(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            print_frame(&frame, format);
            println!("{}", hex_preview(&wire));
        }
        OutputFormat::Raw => {
            println!("{}", hex_preview(&wire));
        }
    }
    Ok(SUCCESS)
}

fn build_frame(args: &EncodeArgs) -> CliResult<Frame> {
    let descriptor =
        resolve(args.address).map_err(|err| register_error("unknown address", err))?;

    let frame = match args.kind {
        FrameKind::Read => {
            if !args.values.is_empty() {
                return Err(CliError::new(USAGE, "read frames take no payload values"));
            }
            descriptor
                .read_command()
                .map_err(|err| register_error("read rejected", err))?
        }
        FrameKind::Write => {
            let payload = parse_payload(args, descriptor.payload_type)?;
            descriptor
                .write_command(payload)
                .map_err(|err| register_error("write rejected", err))?
        }
        FrameKind::Event => {
            let payload = parse_payload(args, descriptor.payload_type)?;
            descriptor
                .check_payload(&payload)
                .map_err(|err| register_error("event rejected", err))?;
            Frame::new(MessageType::Event, args.address, payload)
        }
    };

    Ok(match args.timestamp {
        Some(seconds) => Frame::with_timestamp(
            frame.message_type,
            frame.address,
            frame.payload,
            DeviceTimestamp::from_secs_f64(seconds),
        ),
        None => frame,
    })
}

fn parse_payload(
    args: &EncodeArgs,
    payload_type: harpwire_frame::PayloadType,
) -> CliResult<Payload> {
    if args.values.is_empty() {
        return Err(CliError::new(USAGE, "payload values required"));
    }
    Payload::from_ints(payload_type, &args.values)
        .map_err(|err| frame_error("invalid payload value", err))
}
