use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use framelink_channel::ChannelEndpoints;
use framelink_session::{Role, SessionConfig, TransportKind};
use framelink_shmem::RegionConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod backend;
pub mod input_sink;
pub mod monitor;
pub mod send_command;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a demo backend: broadcast synthetic world state, consume input.
    Backend(BackendArgs),
    /// Subscribe to the gameplay channel and print frame summaries.
    Monitor(MonitorArgs),
    /// Push one console command over the input channel.
    SendCommand(SendCommandArgs),
    /// Bind the input channel and print received commands.
    InputSink(InputSinkArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Backend(args) => backend::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::SendCommand(args) => send_command::run(args, format),
        Command::InputSink(args) => input_sink::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum TransportArg {
    Channel,
    SharedRegion,
}

impl From<TransportArg> for TransportKind {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Channel => TransportKind::Channel,
            TransportArg::SharedRegion => TransportKind::SharedRegion,
        }
    }
}

/// Transport selection shared by session-running subcommands.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Directory holding the channel socket files.
    #[arg(long, value_name = "DIR", default_value = "/tmp")]
    pub socket_dir: PathBuf,

    /// Transport carrying the traffic.
    #[arg(long, value_enum, default_value = "channel")]
    pub transport: TransportArg,

    /// Shared-memory region name (shared-region transport only).
    #[arg(long, default_value = framelink_shmem::DEFAULT_REGION_NAME)]
    pub region_name: String,
}

impl TransportArgs {
    pub fn endpoints(&self) -> ChannelEndpoints {
        ChannelEndpoints::in_dir(&self.socket_dir)
    }

    pub fn session_config(&self, role: Role) -> SessionConfig {
        SessionConfig::new(role)
            .with_transport(self.transport.into())
            .with_region(RegionConfig {
                name: self.region_name.clone(),
                ..RegionConfig::default()
            })
            .with_endpoints(self.endpoints())
    }
}

#[derive(Args, Debug)]
pub struct BackendArgs {
    #[command(flatten)]
    pub transport: TransportArgs,

    /// Frames to broadcast before exiting (0 = run until Ctrl-C).
    #[arg(long, default_value = "0")]
    pub frames: u64,

    /// Tick rate in frames per second.
    #[arg(long, default_value = "72")]
    pub tick_rate: u32,

    /// Synthetic entities per frame.
    #[arg(long, default_value = "32")]
    pub entities: usize,

    /// Serve resource requests from this directory.
    #[arg(long, value_name = "DIR")]
    pub resource_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Directory holding the channel socket files.
    #[arg(long, value_name = "DIR", default_value = "/tmp")]
    pub socket_dir: PathBuf,

    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct SendCommandArgs {
    /// Console command text to forward.
    pub text: String,

    /// Directory holding the channel socket files.
    #[arg(long, value_name = "DIR", default_value = "/tmp")]
    pub socket_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct InputSinkArgs {
    /// Directory holding the channel socket files.
    #[arg(long, value_name = "DIR", default_value = "/tmp")]
    pub socket_dir: PathBuf,

    /// Exit after printing N commands.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug, Default)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
