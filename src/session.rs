//! The editing session: the grid being edited plus the transport playing it.
//!
//! Each front-end command maps to one method here. The session can exist
//! without a backend so patterns can still be edited, saved and loaded when
//! no MIDI port is available.

use std::path::Path;

use tracing::info;

use crate::backend::PlaybackBackend;
use crate::error::{Error, Result};
use crate::instrument::{InstrumentTable, INSTRUMENTS};
use crate::pattern::Pattern;
use crate::pattern_file;
use crate::transport::{Transport, TransportState};

#[derive(Debug)]
pub struct Session<B> {
    pattern: Pattern,
    transport: Option<Transport<B>>,
    /// Why the backend is missing, reported on every transport command.
    unavailable_reason: Option<String>,
}

impl<B: PlaybackBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            pattern: Pattern::new(),
            transport: Some(Transport::new(backend)),
            unavailable_reason: None,
        }
    }

    /// A session whose backend failed to open. Transport commands return
    /// [`Error::BackendUnavailable`] with `reason`.
    pub fn without_backend(reason: impl Into<String>) -> Self {
        Self {
            pattern: Pattern::new(),
            transport: None,
            unavailable_reason: Some(reason.into()),
        }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn instruments(&self) -> &InstrumentTable {
        self.transport
            .as_ref()
            .map_or(&INSTRUMENTS, |t| t.instruments())
    }

    pub fn transport(&self) -> Option<&Transport<B>> {
        self.transport.as_ref()
    }

    pub fn has_backend(&self) -> bool {
        self.transport.is_some()
    }

    pub fn state(&self) -> TransportState {
        self.transport
            .as_ref()
            .map_or(TransportState::Stopped, Transport::state)
    }

    /// Current tempo factor; 1.0 without a backend.
    pub fn tempo_factor(&self) -> f32 {
        self.transport.as_ref().map_or(1.0, Transport::tempo_factor)
    }

    fn transport_mut(&mut self) -> Result<&mut Transport<B>> {
        let reason = &self.unavailable_reason;
        self.transport.as_mut().ok_or_else(|| {
            Error::BackendUnavailable(
                reason
                    .clone()
                    .unwrap_or_else(|| "no playback backend".to_string()),
            )
        })
    }

    /// Flip one cell. Playback picks it up on the next start.
    pub fn toggle(&mut self, track: usize, beat: usize) -> Result<bool> {
        self.pattern.toggle(track, beat)
    }

    pub fn clear(&mut self) {
        self.pattern.clear();
    }

    pub fn start(&mut self) -> Result<()> {
        let pattern = self.pattern;
        self.transport_mut()?.start(&pattern)
    }

    pub fn stop(&mut self) -> Result<()> {
        self.transport_mut()?.stop()
    }

    pub fn tempo_up(&mut self) -> Result<f32> {
        Ok(self.transport_mut()?.increase_tempo())
    }

    pub fn tempo_down(&mut self) -> Result<f32> {
        Ok(self.transport_mut()?.decrease_tempo())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        pattern_file::save(path, &self.pattern)
    }

    /// Replace the grid from a file and restart playback with it.
    ///
    /// Without a backend the grid is loaded and playback is skipped.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.load_pattern(path)?;
        self.replay()
    }

    /// Replace the grid from a file without touching playback.
    ///
    /// The grid is only replaced once the whole file has decoded.
    pub fn load_pattern<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.pattern = pattern_file::load(path)?;
        Ok(())
    }

    /// Restart playback with the current grid, if there is a backend.
    pub fn replay(&mut self) -> Result<()> {
        match self.transport.as_mut() {
            Some(transport) => transport.start(&self.pattern),
            None => {
                info!("Pattern loaded without a playback backend");
                Ok(())
            }
        }
    }
}
