use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use framelink_state::{FrameSnapshot, InputCommand};
use framelink_session::Stats;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
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
struct SnapshotOutput<'a> {
    frame: u32,
    timestamp: f64,
    map: &'a str,
    in_game: bool,
    paused: bool,
    health: f32,
    entities: usize,
    lights: usize,
}

pub fn print_snapshot(snapshot: &FrameSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SnapshotOutput {
                frame: snapshot.frame_number,
                timestamp: snapshot.timestamp,
                map: &snapshot.map_name,
                in_game: snapshot.in_game,
                paused: snapshot.paused,
                health: snapshot.player.health,
                entities: snapshot.entities.len(),
                lights: snapshot.lights.len(),
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
                .set_header(vec!["FRAME", "MAP", "HEALTH", "ENTITIES", "LIGHTS"])
                .add_row(vec![
                    snapshot.frame_number.to_string(),
                    snapshot.map_name.clone(),
                    format!("{:.0}", snapshot.player.health),
                    snapshot.entities.len().to_string(),
                    snapshot.lights.len().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} map={} health={:.0} entities={} lights={}{}",
                snapshot.frame_number,
                snapshot.map_name,
                snapshot.player.health,
                snapshot.entities.len(),
                snapshot.lights.len(),
                if snapshot.paused { " (paused)" } else { "" }
            );
        }
    }
}

#[derive(Serialize)]
struct InputOutput<'a> {
    sequence: u32,
    forward: f32,
    side: f32,
    buttons: u32,
    impulse: u8,
    command: &'a str,
}

pub fn print_input(input: &InputCommand, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = InputOutput {
                sequence: input.sequence,
                forward: input.forward_move,
                side: input.side_move,
                buttons: input.buttons.0,
                impulse: input.impulse,
                command: &input.command_text,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "seq={} forward={:.0} side={:.0} buttons={:#x} impulse={} command={:?}",
                input.sequence,
                input.forward_move,
                input.side_move,
                input.buttons.0,
                input.impulse,
                input.command_text
            );
        }
    }
}

#[derive(Serialize)]
struct StatsOutput {
    frames_sent: u64,
    total_entities: u64,
    bytes_sent: u64,
    total_time_s: f64,
    avg_frame_ms: f64,
    min_frame_ms: f64,
    max_frame_ms: f64,
    avg_entities: f64,
    entities_per_second: f64,
    bytes_per_second: f64,
}

pub fn print_stats(stats: &Stats, format: OutputFormat) {
    if stats.frames_sent == 0 {
        match format {
            OutputFormat::Json => println!("{{\"frames_sent\":0}}"),
            _ => println!("no frames sent"),
        }
        return;
    }

    match format {
        OutputFormat::Json => {
            let out = StatsOutput {
                frames_sent: stats.frames_sent,
                total_entities: stats.total_entities,
                bytes_sent: stats.bytes_sent,
                total_time_s: stats.total_time,
                avg_frame_ms: stats.avg_frame_time() * 1000.0,
                min_frame_ms: stats.min_frame_time * 1000.0,
                max_frame_ms: stats.max_frame_time * 1000.0,
                avg_entities: stats.avg_entities(),
                entities_per_second: stats.entities_per_second(),
                bytes_per_second: stats.bytes_per_second(),
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
                .set_header(vec!["METRIC", "VALUE"])
                .add_row(vec!["frames sent".to_string(), stats.frames_sent.to_string()])
                .add_row(vec![
                    "avg broadcast".to_string(),
                    format!("{:.3} ms", stats.avg_frame_time() * 1000.0),
                ])
                .add_row(vec![
                    "min / max".to_string(),
                    format!(
                        "{:.3} / {:.3} ms",
                        stats.min_frame_time * 1000.0,
                        stats.max_frame_time * 1000.0
                    ),
                ])
                .add_row(vec![
                    "avg entities".to_string(),
                    format!("{:.1}", stats.avg_entities()),
                ])
                .add_row(vec![
                    "throughput".to_string(),
                    format!(
                        "{:.0} entities/s, {:.0} bytes/s",
                        stats.entities_per_second(),
                        stats.bytes_per_second()
                    ),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frames={} avg={:.3}ms min={:.3}ms max={:.3}ms entities/frame={:.1} bytes/s={:.0}",
                stats.frames_sent,
                stats.avg_frame_time() * 1000.0,
                stats.min_frame_time * 1000.0,
                stats.max_frame_time * 1000.0,
                stats.avg_entities(),
                stats.bytes_per_second()
            );
        }
    }
}
