//! Playback backends.
//!
//! The transport only talks to the [`PlaybackBackend`] trait. [`MidiBackend`]
//! drives a hardware or virtual MIDI port; tests use a recording fake.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::timeline::Timeline;

#[cfg(test)]
pub(crate) mod fake;
pub mod midi;

pub use midi::MidiBackend;

/// Something that can loop a timeline and scale its playback rate.
///
/// Opening a backend is the job of the concrete type's constructor.
pub trait PlaybackBackend {
    /// Replace the loaded timeline.
    fn install_timeline(&mut self, timeline: Timeline) -> Result<()>;

    /// Loop the installed timeline continuously from its first tick.
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_playing(&self) -> bool;

    fn tempo_factor(&self) -> f32;

    /// Takes effect immediately when playing, otherwise on the next start.
    fn set_tempo_factor(&mut self, factor: f32);
}

/// Tempo multiplier shared with a playback thread.
///
/// Stored as the `f32` bit pattern so the timer thread can read it without
/// locking.
#[derive(Debug, Clone)]
pub struct TempoFactor(Arc<AtomicU32>);

impl TempoFactor {
    pub fn new(factor: f32) -> Self {
        Self(Arc::new(AtomicU32::new(factor.to_bits())))
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, factor: f32) {
        self.0.store(factor.to_bits(), Ordering::SeqCst);
    }
}

impl Default for TempoFactor {
    fn default() -> Self {
        Self::new(1.0)
    }
}
