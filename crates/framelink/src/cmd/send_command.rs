use std::time::{SystemTime, UNIX_EPOCH};

use framelink_channel::{ChannelEndpoints, InputPusher};
use framelink_state::InputCommand;

use crate::cmd::SendCommandArgs;
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: SendCommandArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoints = ChannelEndpoints::in_dir(&args.socket_dir);
    let mut pusher = InputPusher::connect(&endpoints.input)
        .map_err(|err| channel_error("input connect failed", err))?;

    let command = InputCommand {
        sequence: 1,
        timestamp: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0),
        command_text: args.text.clone(),
        ..Default::default()
    };
    let bytes = pusher
        .push(&command)
        .map_err(|err| channel_error("command send failed", err))?;

    match format {
        OutputFormat::Json => println!(
            "{{\"sent\":true,\"bytes\":{bytes},\"command\":{}}}",
            serde_json::to_string(&args.text).unwrap_or_else(|_| "\"\"".to_string())
        ),
        _ => println!("sent {:?} ({bytes} bytes)", args.text),
    }
    Ok(SUCCESS)
}
