//! The fixed drum kit: one General MIDI percussion key per grid row.

use crate::pattern::TRACKS;

/// A single drum row: the key sent on the percussion channel and the label
/// shown next to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub key: u8,
    pub name: &'static str,
}

pub type InstrumentTable = [Instrument; TRACKS];

const fn drum(key: u8, name: &'static str) -> Instrument {
    Instrument { key, name }
}

/// Row order matches the editor grid, top to bottom.
pub const INSTRUMENTS: InstrumentTable = [
    drum(35, "Bass Drum"),
    drum(42, "Closed Hi-Hat"),
    drum(46, "Open Hi-Hat"),
    drum(38, "Acoustic Snare"),
    drum(49, "Crash Cymbal"),
    drum(39, "Hand Clap"),
    drum(50, "High Tom"),
    drum(60, "Hi Bongo"),
    drum(70, "Maracas"),
    drum(72, "Whistle"),
    drum(64, "Low Conga"),
    drum(56, "Cowbell"),
    drum(58, "Vibraslap"),
    drum(47, "Low-mid Tom"),
    drum(67, "High Agogo"),
    drum(63, "Open Hi Conga"),
];

/// Look up the row playing a given key.
pub fn track_for_key(table: &InstrumentTable, key: u8) -> Option<usize> {
    table.iter().position(|i| i.key == key)
}
