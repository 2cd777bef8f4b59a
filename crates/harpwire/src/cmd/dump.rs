use bytes::BytesMut;
use harpwire_frame::{parse_step, FrameConfig, ParseStep};
use serde::Serialize;

use crate::cmd::DumpArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

#[derive(Serialize)]
struct FaultOutput {
    fault: String,
    address: Option<u8>,
}

#[derive(Serialize)]
struct SummaryOutput {
    frames: usize,
    faults: usize,
    trailing_bytes: usize,
}

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("cannot read {}", args.file.display()), err))?;
    let mut buf = BytesMut::from(bytes.as_slice());
    let config = FrameConfig::default();

    let mut frames = 0usize;
    let mut faults = 0usize;
    loop {
        match parse_step(&mut buf, &config) {
            ParseStep::Frame(frame) => {
                frames += 1;
                print_frame(&frame, format);
            }
            ParseStep::Fault(fault) => {
                faults += 1;
                print_fault(fault.address, &fault.error.to_string(), format);
            }
            ParseStep::NeedMore => break,
        }
    }

    let summary = SummaryOutput {
        frames,
        faults,
        trailing_bytes: buf.len(),
    };
    print_summary(&summary, format);

    if faults > 0 || summary.trailing_bytes > 0 {
        Ok(DATA_INVALID)
    } else {
        Ok(SUCCESS)
    }
}

fn print_fault(address: Option<u8>, message: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FaultOutput {
                fault: message.to_string(),
                address,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        _ => match address {
            Some(address) => println!("fault addr={address}: {message}"),
            None => println!("fault: {message}"),
        },
    }
}

fn print_summary(summary: &SummaryOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Raw => {}
        _ => {
            println!(
                "{} frame(s), {} fault(s), {} trailing byte(s)",
                summary.frames, summary.faults, summary.trailing_bytes
            );
        }
    }
}
