//! Error types shared by the pattern store, compiler, file format and
//! playback backends.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The sound system could not be opened. Playback is unavailable.
    #[error("Playback backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A pattern blob did not have the expected shape. Nothing was loaded.
    #[error("Invalid pattern data: {0}")]
    InvalidPersistedData(String),

    #[error("Cell index out of range: track {track}, beat {beat}")]
    IndexOutOfRange { track: usize, beat: usize },

    /// Raw MIDI bytes that do not decode to a timeline event.
    #[error("Not a timeline event: {0:02X?}")]
    InvalidMidiMessage(Vec<u8>),

    /// A running backend failed (send error, poisoned lock).
    #[error("Playback backend error: {0}")]
    Backend(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
