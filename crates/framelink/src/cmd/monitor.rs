use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framelink_channel::{ChannelEndpoints, FrameSubscriber};

use crate::cmd::MonitorArgs;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_snapshot, OutputFormat};

pub fn run(args: MonitorArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoints = ChannelEndpoints::in_dir(&args.socket_dir);
    let mut subscriber = FrameSubscriber::connect(&endpoints.gameplay)
        .map_err(|err| channel_error("gameplay connect failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        match subscriber.try_receive() {
            Ok(Some(snapshot)) => {
                print_snapshot(&snapshot, format);
                printed += 1;
                if let Some(count) = args.count {
                    if printed >= count {
                        return Ok(SUCCESS);
                    }
                }
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(5)),
            Err(err) => {
                // Publisher gone: drained what there was, report how much.
                if printed > 0 {
                    return Ok(SUCCESS);
                }
                return Err(channel_error("gameplay receive failed", err));
            }
        }
    }
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
