//! Transport state and tempo control.
//!
//! [`Transport`] owns the playback backend and tracks whether a loop is
//! running. Every start recompiles the timeline from the pattern it is given,
//! so playback always reflects the grid at the moment Start was pressed.

use std::fmt;

use tracing::info;

use crate::backend::PlaybackBackend;
use crate::error::Result;
use crate::instrument::{InstrumentTable, INSTRUMENTS};
use crate::pattern::Pattern;
use crate::timeline::compile;

/// Multiplier applied by one Tempo Up.
pub const TEMPO_UP: f32 = 1.03;

/// Multiplier applied by one Tempo Down.
pub const TEMPO_DOWN: f32 = 0.97;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "STOPPED"),
            TransportState::Playing => write!(f, "PLAYING"),
        }
    }
}

#[derive(Debug)]
pub struct Transport<B> {
    backend: B,
    instruments: InstrumentTable,
    state: TransportState,
}

impl<B: PlaybackBackend> Transport<B> {
    pub fn new(backend: B) -> Self {
        Self::with_instruments(backend, INSTRUMENTS)
    }

    pub fn with_instruments(backend: B, instruments: InstrumentTable) -> Self {
        Self {
            backend,
            instruments,
            state: TransportState::Stopped,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn instruments(&self) -> &InstrumentTable {
        &self.instruments
    }

    /// Compile `pattern` and (re)start looping it.
    ///
    /// A running loop is stopped first; the backend never holds more than one
    /// timeline.
    pub fn start(&mut self, pattern: &Pattern) -> Result<()> {
        let timeline = compile(pattern, &self.instruments);
        if self.is_playing() {
            self.backend.stop()?;
            self.state = TransportState::Stopped;
        }
        self.backend.install_timeline(timeline)?;
        self.backend.start()?;
        self.state = TransportState::Playing;
        info!(active_cells = pattern.active_count(), "Transport playing");
        Ok(())
    }

    /// Stop the loop. Does nothing when already stopped.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }
        self.backend.stop()?;
        self.state = TransportState::Stopped;
        info!("Transport stopped");
        Ok(())
    }

    pub fn tempo_factor(&self) -> f32 {
        self.backend.tempo_factor()
    }

    /// Speed up by 3%. Returns the new factor.
    pub fn increase_tempo(&mut self) -> f32 {
        self.scale_tempo(TEMPO_UP)
    }

    /// Slow down by 3%. Returns the new factor.
    pub fn decrease_tempo(&mut self) -> f32 {
        self.scale_tempo(TEMPO_DOWN)
    }

    fn scale_tempo(&mut self, by: f32) -> f32 {
        let factor = self.backend.tempo_factor() * by;
        self.backend.set_tempo_factor(factor);
        info!(factor, "Tempo changed");
        factor
    }
}
