//! BeatBox - a 16-step, 16-track drum-pattern sequencer.
//!
//! The grid ([`pattern::Pattern`]) is compiled into a one-bar loop of MIDI
//! events ([`timeline::compile`]) and handed to a playback backend
//! ([`backend::PlaybackBackend`]) that repeats it at an adjustable tempo.

pub mod backend;
pub mod config;
pub mod error;
pub mod instrument;
pub mod midi;
pub mod pattern;
pub mod pattern_file;
pub mod playback;
pub mod session;
pub mod timeline;
pub mod transport;

pub use error::{Error, Result};
