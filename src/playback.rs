//! Loop cursor for a compiled timeline.
//!
//! [`TimelinePlayer`] is driven by an absolute tick count and returns the raw
//! MIDI messages due at that tick, repeating the installed timeline until it
//! is stopped. It owns no thread and no port; the MIDI backend calls
//! [`TimelinePlayer::tick`] from its timer loop.

use crate::error::Result;
use crate::timeline::Timeline;

/// A single MIDI event to be played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopEvent {
    /// Position in ticks from the start of the loop
    pub tick: u64,
    /// Raw MIDI message bytes (status + data)
    pub message: Vec<u8>,
}

/// Plays one timeline in a continuous loop.
#[derive(Debug, Default)]
pub struct TimelinePlayer {
    /// Events sorted by tick
    events: Vec<LoopEvent>,
    /// Loop length in ticks
    length_ticks: u64,
    /// Which pass over the loop (0-indexed)
    current_iteration: u64,
    /// Index of next event to play in the current pass
    next_event_idx: usize,
    /// Whether playback is enabled
    pub playing: bool,
}

impl TimelinePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a timeline, replacing whatever was loaded before.
    ///
    /// The current timeline is kept if any event fails to encode.
    pub fn load(&mut self, timeline: &Timeline) -> Result<()> {
        self.events = timeline
            .events()
            .iter()
            .map(|e| {
                Ok(LoopEvent {
                    tick: u64::from(e.tick()),
                    message: e.to_midi()?,
                })
            })
            .collect::<Result<_>>()?;
        self.length_ticks = u64::from(timeline.length_ticks());
        self.reset();
        Ok(())
    }

    /// Start playback from the beginning.
    pub fn start(&mut self) {
        self.reset();
        self.playing = true;
    }

    /// Stop playback.
    pub fn stop(&mut self) {
        self.playing = false;
    }

    /// Rewind to the start of the loop.
    pub fn reset(&mut self) {
        self.current_iteration = 0;
        self.next_event_idx = 0;
    }

    pub fn length_ticks(&self) -> u64 {
        self.length_ticks
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Current pass over the loop, starting at 1.
    pub fn current_iteration(&self) -> u64 {
        self.current_iteration + 1
    }

    /// Called on each tick. Returns the messages that should be sent now.
    ///
    /// Events placed exactly on the loop boundary are returned on the tick
    /// that wraps, ahead of the first events of the next pass.
    pub fn tick(&mut self, tick_count: u64) -> Vec<Vec<u8>> {
        if !self.playing || self.events.is_empty() || self.length_ticks == 0 {
            return Vec::new();
        }

        let position_in_loop = tick_count % self.length_ticks;
        let iteration = tick_count / self.length_ticks;

        let mut messages = Vec::new();
        if iteration > self.current_iteration {
            // Whatever is left belongs to the boundary of the previous pass
            messages.extend(
                self.events[self.next_event_idx..]
                    .iter()
                    .map(|e| e.message.clone()),
            );
            self.current_iteration = iteration;
            self.next_event_idx = 0;
        }

        self.collect_events_at_position(position_in_loop, &mut messages);
        messages
    }

    fn collect_events_at_position(&mut self, position: u64, out: &mut Vec<Vec<u8>>) {
        while let Some(event) = self.events.get(self.next_event_idx) {
            if event.tick > position {
                break;
            }
            out.push(event.message.clone());
            self.next_event_idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::INSTRUMENTS;
    use crate::pattern::Pattern;
    use crate::timeline::compile;

    fn bass_on_one() -> Timeline {
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true).unwrap();
        compile(&pattern, &INSTRUMENTS)
    }

    fn playing(timeline: &Timeline) -> TimelinePlayer {
        let mut player = TimelinePlayer::new();
        player.load(timeline).unwrap();
        player.start();
        player
    }

    #[test]
    fn test_not_playing_returns_empty() {
        let mut player = TimelinePlayer::new();
        player.load(&bass_on_one()).unwrap();
        // Don't call start() - playing is false
        assert!(player.tick(0).is_empty());
    }

    #[test]
    fn test_no_timeline_returns_empty() {
        let mut player = TimelinePlayer::new();
        player.playing = true;
        assert!(player.tick(0).is_empty());
    }

    #[test]
    fn test_load_sets_length() {
        let player = playing(&bass_on_one());
        assert_eq!(player.length_ticks(), 16);
        assert_eq!(player.event_count(), 2 + 17);
    }

    #[test]
    fn test_emits_events_at_correct_time() {
        let mut player = playing(&bass_on_one());

        // Tick 0: note on
        assert_eq!(player.tick(0), vec![vec![0x99, 35, 100]]);

        // Tick 1: note off
        assert_eq!(player.tick(1), vec![vec![0x89, 35, 100]]);

        // Ticks 2-14: nothing
        for tick in 2..15 {
            assert!(player.tick(tick).is_empty(), "tick {}", tick);
        }

        // Tick 15: loop-end marker
        assert_eq!(player.tick(15), vec![vec![0xC9, 1]]);
    }

    #[test]
    fn test_boundary_events_flush_before_wrap() {
        let mut player = playing(&bass_on_one());
        for tick in 0..16 {
            player.tick(tick);
        }

        // Tick 16 wraps: 16 boundary markers, then the next pass's note on
        let events = player.tick(16);
        assert_eq!(events.len(), 17);
        assert!(events[..16].iter().all(|m| m == &vec![0xB1, 127, 0]));
        assert_eq!(events[16], vec![0x99, 35, 100]);
        assert_eq!(player.current_iteration(), 2);
    }

    #[test]
    fn test_loops_indefinitely() {
        let mut player = playing(&bass_on_one());
        let mut note_ons = 0;
        for tick in 0..(16 * 10) {
            note_ons += player
                .tick(tick)
                .iter()
                .filter(|m| m[0] == 0x99)
                .count();
        }
        assert_eq!(note_ons, 10);
    }

    #[test]
    fn test_last_step_note_off_on_boundary() {
        let mut pattern = Pattern::new();
        pattern.set(3, 15, true).unwrap();
        let mut player = playing(&compile(&pattern, &INSTRUMENTS));

        for tick in 0..15 {
            player.tick(tick);
        }
        let at_fifteen = player.tick(15);
        assert_eq!(at_fifteen[0], vec![0x99, 38, 100]);

        let at_wrap = player.tick(16);
        assert_eq!(at_wrap[0], vec![0x89, 38, 100]);
    }

    #[test]
    fn test_multiple_events_same_tick() {
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true).unwrap();
        pattern.set(1, 0, true).unwrap();
        pattern.set(3, 0, true).unwrap();
        let mut player = playing(&compile(&pattern, &INSTRUMENTS));

        let events = player.tick(0);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_load_replaces_timeline() {
        let mut player = playing(&bass_on_one());
        player.tick(0);

        let mut pattern = Pattern::new();
        pattern.set(1, 0, true).unwrap();
        player.load(&compile(&pattern, &INSTRUMENTS)).unwrap();
        player.start();

        assert_eq!(player.tick(0), vec![vec![0x99, 42, 100]]);
    }

    #[test]
    fn test_reset() {
        let mut player = playing(&bass_on_one());
        for tick in 0..20 {
            player.tick(tick);
        }

        player.reset();

        let events = player.tick(0);
        assert_eq!(events, vec![vec![0x99, 35, 100]]);
        assert_eq!(player.current_iteration(), 1);
    }

    #[test]
    fn test_stop_silences_tick() {
        let mut player = playing(&bass_on_one());
        player.stop();
        assert!(player.tick(0).is_empty());
    }
}
