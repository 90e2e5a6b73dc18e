//! Pattern Dump - Console tool for inspecting saved patterns
//!
//! Prints the grid and the compiled timeline, decoding each event back from
//! the bytes that would be sent to the MIDI port.
//!
//! Usage: cargo run --bin pattern_dump -- [pattern.bbxp]
//! Without a path, the last pattern remembered in beatbox.yaml is used.

use anyhow::{bail, Context, Result};

use beatbox::config::BeatBoxConfig;
use beatbox::instrument::{track_for_key, INSTRUMENTS};
use beatbox::pattern::Pattern;
use beatbox::pattern_file;
use beatbox::timeline::{compile, Marker, TimedEvent};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            let config = BeatBoxConfig::load(BeatBoxConfig::default_path())?;
            match config.last_pattern {
                Some(path) => path,
                None => bail!("No pattern file given and none remembered in beatbox.yaml"),
            }
        }
    };

    let pattern =
        pattern_file::load(&path).with_context(|| format!("Failed to load pattern {}", path))?;

    println!("=== {} ===\n", path);
    print_grid(&pattern);
    println!();
    print_timeline(&pattern)?;
    Ok(())
}

fn print_grid(pattern: &Pattern) {
    println!("{:<16} {}", "", "1   2   3   4   ");
    for (steps, instrument) in pattern.tracks().zip(INSTRUMENTS.iter()) {
        let cells: String = steps.iter().map(|&on| if on { 'x' } else { '.' }).collect();
        println!("{:<16} {}", instrument.name, cells);
    }
    println!("\n{} active cells", pattern.active_count());
}

fn print_timeline(pattern: &Pattern) -> Result<()> {
    let timeline = compile(pattern, &INSTRUMENTS);

    println!("{:<6} {:<16} {:<12} {}", "TICK", "TYPE", "DATA (HEX)", "DETAILS");
    println!("{}", "-".repeat(60));

    for event in timeline.events() {
        let bytes = event.to_midi()?;
        let hex_str: String = bytes.iter().map(|b| format!("{:02X} ", b)).collect();
        let decoded = TimedEvent::from_midi(event.tick(), &bytes)?;
        let (msg_type, details) = describe(&decoded);
        println!(
            "{:<6} {:<16} {:<12} {}",
            decoded.tick(),
            msg_type,
            hex_str.trim(),
            details
        );
    }

    println!(
        "\n{} events, {} notes, loop length {} ticks",
        timeline.len(),
        timeline.notes().count(),
        timeline.length_ticks()
    );
    Ok(())
}

fn describe(event: &TimedEvent) -> (&'static str, String) {
    let name = |key: u8| {
        track_for_key(&INSTRUMENTS, key)
            .map(|track| INSTRUMENTS[track].name)
            .unwrap_or("?")
    };

    match *event {
        TimedEvent::NoteOn { key, velocity, .. } => {
            ("NOTE_ON", format!("{} ({}) Vel:{}", name(key), key, velocity))
        }
        TimedEvent::NoteOff { key, velocity, .. } => {
            ("NOTE_OFF", format!("{} ({}) Vel:{}", name(key), key, velocity))
        }
        TimedEvent::ControlMarker {
            marker: Marker::TrackBoundary,
            ..
        } => ("MARKER", "Track boundary".to_string()),
        TimedEvent::ControlMarker {
            marker: Marker::LoopEnd,
            ..
        } => ("MARKER", "Loop end".to_string()),
    }
}
