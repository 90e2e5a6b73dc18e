//! Test double for [`PlaybackBackend`] that records each call.

use super::PlaybackBackend;
use crate::error::Result;
use crate::timeline::Timeline;

/// Backend calls as seen by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Install(usize),
    Start,
    Stop,
    SetTempo(f32),
}

/// In-memory backend that records every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub installed: Option<Timeline>,
    pub playing: bool,
    pub tempo: Option<f32>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls
            .iter()
            .filter(|c| std::mem::discriminant(*c) == std::mem::discriminant(call))
            .count()
    }
}

impl PlaybackBackend for RecordingBackend {
    fn install_timeline(&mut self, timeline: Timeline) -> Result<()> {
        self.calls.push(Call::Install(timeline.len()));
        self.installed = Some(timeline);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.calls.push(Call::Start);
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.calls.push(Call::Stop);
        self.playing = false;
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn tempo_factor(&self) -> f32 {
        self.tempo.unwrap_or(1.0)
    }

    fn set_tempo_factor(&mut self, factor: f32) {
        self.calls.push(Call::SetTempo(factor));
        self.tempo = Some(factor);
    }
}
