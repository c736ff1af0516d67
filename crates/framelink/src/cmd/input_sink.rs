use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use framelink_channel::{ChannelEndpoints, InputPuller};

use crate::cmd::InputSinkArgs;
use crate::exit::{channel_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_input, OutputFormat};

/// Stand-in for a backend's input end: binds the pull socket and prints
/// whatever arrives.
pub fn run(args: InputSinkArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoints = ChannelEndpoints::in_dir(&args.socket_dir);
    let mut puller = InputPuller::bind(&endpoints.input)
        .map_err(|err| channel_error("input bind failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let mut printed = 0u64;
    while running.load(Ordering::SeqCst) {
        match puller.try_take() {
            Ok(Some(input)) => {
                print_input(&input, format);
                printed += 1;
                if let Some(count) = args.count {
                    if printed >= count {
                        return Ok(SUCCESS);
                    }
                }
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(5)),
            Err(err) => return Err(channel_error("input receive failed", err)),
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
