//! Pattern-to-timeline compiler.
//!
//! A [`Timeline`] is one loop cycle of timed events. Every active cell becomes
//! a note on at its step and a note off one step later. Markers are appended
//! so the loop always spans the full bar, even when the last steps are
//! silent.

use midly::live::LiveEvent;
use midly::num::{u4, u7};
use midly::MidiMessage;
use tracing::debug;

use crate::error::{Error, Result};
use crate::instrument::InstrumentTable;
use crate::midi::{
    DRUM_CHANNEL, LOOP_END_PROGRAM, MARKER_CHANNEL, MARKER_CONTROLLER, NOTE_VELOCITY,
};
use crate::pattern::{Pattern, STEPS};

/// Tick of the per-track boundary marker (one past the last step).
pub const BOUNDARY_TICK: u32 = STEPS as u32;

/// Tick of the single loop-end marker (the last step).
pub const LOOP_END_TICK: u32 = STEPS as u32 - 1;

/// Number of markers in every compiled timeline: one per track plus one.
pub const MARKER_COUNT: usize = crate::pattern::TRACKS + 1;

/// Non-audible events that pin the timeline length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Emitted after each track, at the loop boundary.
    TrackBoundary,
    /// Emitted once after all tracks, on the last step.
    LoopEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    NoteOn { key: u8, velocity: u8, tick: u32 },
    NoteOff { key: u8, velocity: u8, tick: u32 },
    ControlMarker { marker: Marker, tick: u32 },
}

impl TimedEvent {
    pub fn tick(&self) -> u32 {
        match *self {
            TimedEvent::NoteOn { tick, .. }
            | TimedEvent::NoteOff { tick, .. }
            | TimedEvent::ControlMarker { tick, .. } => tick,
        }
    }

    pub fn is_note(&self) -> bool {
        !matches!(self, TimedEvent::ControlMarker { .. })
    }

    /// Tie-break order for events sharing a tick.
    fn rank(&self) -> u8 {
        match self {
            TimedEvent::NoteOn { .. } => 0,
            TimedEvent::NoteOff { .. } => 1,
            TimedEvent::ControlMarker { .. } => 2,
        }
    }

    /// Raw MIDI bytes for this event.
    pub fn to_midi(&self) -> Result<Vec<u8>> {
        let (channel, message) = match *self {
            TimedEvent::NoteOn { key, velocity, .. } => (
                DRUM_CHANNEL,
                MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            ),
            TimedEvent::NoteOff { key, velocity, .. } => (
                DRUM_CHANNEL,
                MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            ),
            TimedEvent::ControlMarker {
                marker: Marker::TrackBoundary,
                ..
            } => (
                MARKER_CHANNEL,
                MidiMessage::Controller {
                    controller: u7::new(MARKER_CONTROLLER),
                    value: u7::new(0),
                },
            ),
            TimedEvent::ControlMarker {
                marker: Marker::LoopEnd,
                ..
            } => (
                DRUM_CHANNEL,
                MidiMessage::ProgramChange {
                    program: u7::new(LOOP_END_PROGRAM),
                },
            ),
        };

        let mut bytes = Vec::with_capacity(3);
        LiveEvent::Midi {
            channel: u4::new(channel),
            message,
        }
        .write_std(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode raw bytes produced by [`TimedEvent::to_midi`].
    ///
    /// Markers decode as markers, never as notes. Any other message is
    /// rejected.
    pub fn from_midi(tick: u32, bytes: &[u8]) -> Result<Self> {
        let invalid = || Error::InvalidMidiMessage(bytes.to_vec());
        let LiveEvent::Midi { channel, message } = LiveEvent::parse(bytes).map_err(|_| invalid())?
        else {
            return Err(invalid());
        };

        let drums = channel == u4::new(DRUM_CHANNEL);
        let event = match message {
            MidiMessage::NoteOn { key, vel } if drums => TimedEvent::NoteOn {
                key: key.as_int(),
                velocity: vel.as_int(),
                tick,
            },
            MidiMessage::NoteOff { key, vel } if drums => TimedEvent::NoteOff {
                key: key.as_int(),
                velocity: vel.as_int(),
                tick,
            },
            MidiMessage::ProgramChange { program }
                if drums && program.as_int() == LOOP_END_PROGRAM =>
            {
                TimedEvent::ControlMarker {
                    marker: Marker::LoopEnd,
                    tick,
                }
            }
            MidiMessage::Controller { controller, .. }
                if channel == u4::new(MARKER_CHANNEL)
                    && controller.as_int() == MARKER_CONTROLLER =>
            {
                TimedEvent::ControlMarker {
                    marker: Marker::TrackBoundary,
                    tick,
                }
            }
            _ => return Err(invalid()),
        };
        Ok(event)
    }
}

/// One compiled loop cycle, ordered by tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timeline {
    events: Vec<TimedEvent>,
}

impl Timeline {
    pub fn events(&self) -> &[TimedEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<TimedEvent> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Loop length in ticks: the position of the last event.
    pub fn length_ticks(&self) -> u32 {
        self.events.iter().map(TimedEvent::tick).max().unwrap_or(0)
    }

    pub fn notes(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter().filter(|e| e.is_note())
    }

    pub fn markers(&self) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter().filter(|e| !e.is_note())
    }
}

/// Compile the grid into a timeline.
pub fn compile(pattern: &Pattern, instruments: &InstrumentTable) -> Timeline {
    let mut events = Vec::with_capacity(2 * pattern.active_count() + MARKER_COUNT);

    for (row, instrument) in pattern.tracks().zip(instruments.iter()) {
        let key = instrument.key;
        for (beat, &on) in row.iter().enumerate() {
            if !on {
                continue;
            }
            let tick = beat as u32;
            events.push(TimedEvent::NoteOn {
                key,
                velocity: NOTE_VELOCITY,
                tick,
            });
            events.push(TimedEvent::NoteOff {
                key,
                velocity: NOTE_VELOCITY,
                tick: tick + 1,
            });
        }
        events.push(TimedEvent::ControlMarker {
            marker: Marker::TrackBoundary,
            tick: BOUNDARY_TICK,
        });
    }

    events.push(TimedEvent::ControlMarker {
        marker: Marker::LoopEnd,
        tick: LOOP_END_TICK,
    });

    // Stable: equal (tick, rank) keeps emission order
    events.sort_by_key(|e| (e.tick(), e.rank()));

    debug!(
        events = events.len(),
        notes = events.len() - MARKER_COUNT,
        "Compiled timeline"
    );
    Timeline { events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::INSTRUMENTS;
    use crate::pattern::{CELL_COUNT, TRACKS};

    fn note_count(timeline: &Timeline) -> usize {
        timeline.notes().count()
    }

    #[test]
    fn test_empty_pattern_has_only_markers() {
        let timeline = compile(&Pattern::new(), &INSTRUMENTS);
        assert_eq!(timeline.len(), MARKER_COUNT);
        assert_eq!(note_count(&timeline), 0);
        assert_eq!(timeline.length_ticks(), 16);
        assert_eq!(timeline.events()[0].tick(), LOOP_END_TICK);
    }

    #[test]
    fn test_event_count_matches_active_cells() {
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true).unwrap();
        pattern.set(3, 4, true).unwrap();
        pattern.set(3, 12, true).unwrap();
        pattern.set(15, 15, true).unwrap();

        let timeline = compile(&pattern, &INSTRUMENTS);
        assert_eq!(note_count(&timeline), 2 * 4);
        assert_eq!(timeline.markers().count(), MARKER_COUNT);
    }

    #[test]
    fn test_full_pattern() {
        let pattern = Pattern::from_flags(&[true; CELL_COUNT]).unwrap();
        let timeline = compile(&pattern, &INSTRUMENTS);
        assert_eq!(timeline.len(), 2 * CELL_COUNT + MARKER_COUNT);
        assert_eq!(timeline.length_ticks(), 16);
    }

    #[test]
    fn test_single_bass_drum_hit() {
        let mut pattern = Pattern::new();
        pattern.toggle(0, 0).unwrap();

        let timeline = compile(&pattern, &INSTRUMENTS);
        let notes: Vec<_> = timeline.notes().copied().collect();
        assert_eq!(
            notes,
            vec![
                TimedEvent::NoteOn {
                    key: 35,
                    velocity: 100,
                    tick: 0
                },
                TimedEvent::NoteOff {
                    key: 35,
                    velocity: 100,
                    tick: 1
                },
            ]
        );
    }

    #[test]
    fn test_marker_layout() {
        let timeline = compile(&Pattern::new(), &INSTRUMENTS);
        let boundaries = timeline
            .markers()
            .filter(|e| {
                matches!(
                    e,
                    TimedEvent::ControlMarker {
                        marker: Marker::TrackBoundary,
                        tick: BOUNDARY_TICK
                    }
                )
            })
            .count();
        let loop_ends = timeline
            .markers()
            .filter(|e| {
                matches!(
                    e,
                    TimedEvent::ControlMarker {
                        marker: Marker::LoopEnd,
                        tick: LOOP_END_TICK
                    }
                )
            })
            .count();
        assert_eq!(boundaries, TRACKS);
        assert_eq!(loop_ends, 1);
    }

    #[test]
    fn test_events_sorted_with_tie_break() {
        let mut pattern = Pattern::new();
        // Beat 0 note off lands on tick 1 together with the beat 1 note on
        pattern.set(0, 0, true).unwrap();
        pattern.set(0, 1, true).unwrap();
        pattern.set(2, 15, true).unwrap();

        let timeline = compile(&pattern, &INSTRUMENTS);
        let events = timeline.events();
        for pair in events.windows(2) {
            assert!(pair[0].tick() <= pair[1].tick());
            if pair[0].tick() == pair[1].tick() {
                assert!(pair[0].rank() <= pair[1].rank(), "{:?}", pair);
            }
        }

        let at_one: Vec<_> = events.iter().filter(|e| e.tick() == 1).collect();
        assert!(matches!(at_one[0], TimedEvent::NoteOn { tick: 1, .. }));
        assert!(matches!(at_one[1], TimedEvent::NoteOff { tick: 1, .. }));

        // Beat 15 note on sorts ahead of the loop-end marker at tick 15
        let at_fifteen: Vec<_> = events.iter().filter(|e| e.tick() == 15).collect();
        assert!(matches!(at_fifteen[0], TimedEvent::NoteOn { key: 46, .. }));
        assert!(!at_fifteen[1].is_note());
    }

    #[test]
    fn test_recompile_reflects_edits() {
        let mut pattern = Pattern::new();
        pattern.set(4, 8, true).unwrap();
        let first = compile(&pattern, &INSTRUMENTS);

        pattern.set(4, 8, false).unwrap();
        let second = compile(&pattern, &INSTRUMENTS);

        assert_eq!(note_count(&first), 2);
        assert_eq!(note_count(&second), 0);
    }

    #[test]
    fn test_wire_bytes() {
        let on = TimedEvent::NoteOn {
            key: 35,
            velocity: 100,
            tick: 0,
        };
        let off = TimedEvent::NoteOff {
            key: 35,
            velocity: 100,
            tick: 1,
        };
        let boundary = TimedEvent::ControlMarker {
            marker: Marker::TrackBoundary,
            tick: 16,
        };
        let loop_end = TimedEvent::ControlMarker {
            marker: Marker::LoopEnd,
            tick: 15,
        };
        assert_eq!(on.to_midi().unwrap(), vec![0x99, 35, 100]);
        assert_eq!(off.to_midi().unwrap(), vec![0x89, 35, 100]);
        assert_eq!(boundary.to_midi().unwrap(), vec![0xB1, 127, 0]);
        assert_eq!(loop_end.to_midi().unwrap(), vec![0xC9, 1]);
    }

    #[test]
    fn test_markers_decode_as_markers() {
        let timeline = compile(&Pattern::new(), &INSTRUMENTS);
        for event in timeline.events() {
            let bytes = event.to_midi().unwrap();
            let decoded = TimedEvent::from_midi(event.tick(), &bytes).unwrap();
            assert_eq!(&decoded, event);
            assert!(!decoded.is_note());
        }
    }

    #[test]
    fn test_every_compiled_event_survives_the_wire() {
        let mut pattern = Pattern::new();
        pattern.set(0, 0, true).unwrap();
        pattern.set(7, 9, true).unwrap();
        pattern.set(15, 15, true).unwrap();

        let timeline = compile(&pattern, &INSTRUMENTS);
        for event in timeline.events() {
            let bytes = event.to_midi().unwrap();
            // Drum messages carry the percussion channel in the status byte
            let channel = bytes[0] & 0x0F;
            let expected = match event {
                TimedEvent::ControlMarker {
                    marker: Marker::TrackBoundary,
                    ..
                } => MARKER_CHANNEL,
                _ => DRUM_CHANNEL,
            };
            assert_eq!(channel, expected);
            assert_eq!(TimedEvent::from_midi(event.tick(), &bytes).unwrap(), *event);
        }
    }

    #[test]
    fn test_notes_decode_from_wire() {
        let bytes = [0x99, 63, 100];
        assert_eq!(
            TimedEvent::from_midi(7, &bytes).unwrap(),
            TimedEvent::NoteOn {
                key: 63,
                velocity: 100,
                tick: 7
            }
        );
    }

    #[test]
    fn test_from_midi_rejects_foreign_messages() {
        // Note on outside the drum channel
        assert!(TimedEvent::from_midi(0, &[0x90, 60, 100]).is_err());
        // Other controller on the marker channel
        assert!(TimedEvent::from_midi(0, &[0xB1, 7, 64]).is_err());
        // Clock tick
        assert!(TimedEvent::from_midi(0, &[0xF8]).is_err());
        assert!(matches!(
            TimedEvent::from_midi(0, &[]),
            Err(Error::InvalidMidiMessage(_))
        ));
    }
}
