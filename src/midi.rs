//! MIDI protocol constants and the output port wrapper.
//!
//! Drum notes go out on the General MIDI percussion channel. The timeline
//! markers use messages that no GM drum kit turns into sound.

use midir::{MidiOutput, MidiOutputConnection};
use tracing::info;

use crate::error::{Error, Result};

/// Timeline resolution in ticks per quarter note. One tick is one step.
pub const PPQ: u32 = 4;

/// Nominal tempo the tempo factor is applied to.
pub const DEFAULT_BPM: f32 = 120.0;

/// GM percussion channel (channel 10, zero-based).
pub const DRUM_CHANNEL: u8 = 9;

/// Channel carrying the per-track boundary marker (channel 2, zero-based).
pub const MARKER_CHANNEL: u8 = 1;

/// Velocity of every note on and note off.
pub const NOTE_VELOCITY: u8 = 100;

/// Controller number of the per-track boundary marker.
pub const MARKER_CONTROLLER: u8 = 127;

/// Program number of the loop-end marker.
pub const LOOP_END_PROGRAM: u8 = 1;

/// Channel mode message: All Notes Off.
pub const ALL_NOTES_OFF: u8 = 123;

/// Port name fragment preferred when no device is configured.
pub const DEFAULT_PORT_HINT: &str = "IAC";

/// Destination for raw MIDI messages.
pub trait MidiSink: Send + 'static {
    /// Send one complete message.
    fn send(&mut self, message: &[u8]) -> Result<()>;

    /// Silence anything still sounding on `channel`.
    fn send_all_notes_off(&mut self, channel: u8) -> Result<()> {
        self.send(&[0xB0 | (channel & 0x0F), ALL_NOTES_OFF, 0])
    }
}

/// Wrapper for MIDI output connection.
pub struct MidiOut {
    connection: MidiOutputConnection,
    pub port_name: String,
}

impl std::fmt::Debug for MidiOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiOut")
            .field("port_name", &self.port_name)
            .finish_non_exhaustive()
    }
}

impl MidiOut {
    /// Open a MIDI output, preferring the first port whose name contains
    /// `port_hint` and falling back to the first port.
    pub fn new(client_name: &str, port_hint: &str) -> Result<Self> {
        let midi_out = MidiOutput::new(client_name)
            .map_err(|e| Error::BackendUnavailable(format!("Failed to create MIDI output: {}", e)))?;

        let ports = midi_out.ports();
        if ports.is_empty() {
            return Err(Error::BackendUnavailable(
                "No MIDI output ports found".to_string(),
            ));
        }

        let port_idx = ports
            .iter()
            .position(|p| {
                midi_out
                    .port_name(p)
                    .map(|n| n.contains(port_hint))
                    .unwrap_or(false)
            })
            .unwrap_or(0);

        let port = &ports[port_idx];
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_out.connect(port, client_name).map_err(|e| {
            Error::BackendUnavailable(format!("Failed to connect MIDI output: {}", e))
        })?;

        info!(port = %port_name, "MIDI output connected");
        Ok(Self {
            connection,
            port_name,
        })
    }
}

impl MidiSink for MidiOut {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| Error::Backend(format!("Failed to send MIDI: {}", e)))
    }
}

/// Length of one tick at `bpm` scaled by `factor`, in seconds.
///
/// Returns `None` when the product is not a positive finite tempo.
pub fn tick_seconds(bpm: f32, factor: f32) -> Option<f64> {
    let effective = f64::from(bpm) * f64::from(factor);
    if effective.is_finite() && effective > 0.0 {
        let secs = 60.0 / (effective * f64::from(PPQ));
        secs.is_finite().then_some(secs)
    } else {
        None
    }
}
