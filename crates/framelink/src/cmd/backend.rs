use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use framelink_session::{ResourceStore, Role, Session};
use framelink_state::{Entity, FrameSnapshot, PlayerState, Vec3};

use crate::cmd::BackendArgs;
use crate::exit::{session_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_stats, OutputFormat};

/// Serves resources from a directory; absent directory answers everything
/// negatively. Request names must stay inside the root.
struct DirStore {
    root: Option<PathBuf>,
}

impl ResourceStore for DirStore {
    fn fetch(&self, name: &str) -> Option<Vec<u8>> {
        let root = self.root.as_ref()?;
        if name.split('/').any(|part| part == "..") || name.starts_with('/') {
            return None;
        }
        std::fs::read(root.join(name)).ok()
    }
}

pub fn run(args: BackendArgs, format: OutputFormat) -> CliResult<i32> {
    if args.tick_rate == 0 {
        return Err(CliError::new(USAGE, "tick rate must be at least 1"));
    }

    let mut session = Session::new(args.transport.session_config(Role::Backend));
    session
        .initialize()
        .map_err(|err| session_error("backend init failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;

    let store = DirStore {
        root: args.resource_dir.clone(),
    };
    let tick = Duration::from_secs_f64(1.0 / args.tick_rate as f64);
    let started = Instant::now();
    let mut frame = 0u64;

    info!(
        tick_rate = args.tick_rate,
        entities = args.entities,
        "backend loop running"
    );

    while running.load(Ordering::SeqCst) {
        frame += 1;
        let snapshot = synthetic_snapshot(frame, started.elapsed().as_secs_f64(), args.entities);
        session.broadcast_world_state(&snapshot);

        if session.process_input_commands() {
            for text in session.drain_command_text() {
                info!(command = %text, "console command received");
            }
            if let Some(input) = session.take_current_input() {
                info!(
                    sequence = input.sequence,
                    impulse = input.impulse,
                    "input applied"
                );
            }
        }
        session.serve_resources(&store);

        if args.frames != 0 && frame >= args.frames {
            break;
        }
        std::thread::sleep(tick);
    }

    print_stats(session.stats(), format);
    session.shutdown();
    Ok(SUCCESS)
}

/// A ring of entities orbiting the origin; enough motion to be visibly a
/// live feed in the monitor.
fn synthetic_snapshot(frame: u64, elapsed: f64, entities: usize) -> FrameSnapshot {
    let entities = (0..entities)
        .map(|i| {
            let phase = elapsed + i as f64 * std::f64::consts::TAU / entities.max(1) as f64;
            Entity {
                origin: Vec3::new(
                    (phase.cos() * 256.0) as f32,
                    (phase.sin() * 256.0) as f32,
                    32.0,
                ),
                angles: Vec3::new(0.0, (phase.to_degrees() % 360.0) as f32, 0.0),
                model: i as u32,
                frame: (frame % 8) as u32,
                ..Default::default()
            }
        })
        .collect();

    FrameSnapshot {
        frame_number: frame as u32,
        timestamp: elapsed,
        player: PlayerState {
            origin: Vec3::new(0.0, 0.0, 64.0),
            health: 100.0,
            armor: 50.0,
            weapon: 1,
            ammo: 25,
            ..Default::default()
        },
        paused: false,
        in_game: true,
        map_name: "demo1".to_string(),
        entities,
        lights: Vec::new(),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
