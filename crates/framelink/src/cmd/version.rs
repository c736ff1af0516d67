use framelink_state::WIRE_VERSION;

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: VersionArgs, format: OutputFormat) -> CliResult<i32> {
    if matches!(format, OutputFormat::Json) {
        println!(
            "{{\"name\":\"framelink\",\"version\":\"{}\",\"wire_version\":{}}}",
            env!("CARGO_PKG_VERSION"),
            WIRE_VERSION
        );
        return Ok(SUCCESS);
    }

    if !args.extended {
        println!("framelink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: framelink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("wire_version: {WIRE_VERSION}");
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    Ok(SUCCESS)
}
