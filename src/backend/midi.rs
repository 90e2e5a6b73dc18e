//! MIDI output backend.
//!
//! Loops the installed timeline on a dedicated timer thread and sends each
//! event to a [`MidiSink`], normally a MIDI output port.
//!
//! # Thread Safety
//! The running flag and tempo factor are atomics; the loop cursor and the
//! sink sit behind mutexes shared with the timer thread. A poisoned mutex
//! surfaces as [`Error::Backend`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::{PlaybackBackend, TempoFactor};
use crate::error::{Error, Result};
use crate::midi::{self, MidiOut, MidiSink, DRUM_CHANNEL};
use crate::playback::TimelinePlayer;
use crate::timeline::Timeline;

/// Longest single sleep of the timer thread, so stop never waits long.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(5);

const CLIENT_NAME: &str = "beatbox-out";

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Backend("Playback state lock poisoned".to_string()))
}

/// Length of one tick, or `None` if the tempo is degenerate.
fn tick_duration(base_bpm: f32, factor: f32) -> Option<Duration> {
    midi::tick_seconds(base_bpm, factor).and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// When the tick after the one due at `deadline` should fire.
///
/// A deadline more than one step in the past is moved up to `now`, so ticks
/// missed during a stall are skipped instead of fired back to back.
fn next_deadline(deadline: Instant, now: Instant, step: Duration) -> Option<Instant> {
    let anchor = if now.saturating_duration_since(deadline) > step {
        now
    } else {
        deadline
    };
    anchor.checked_add(step)
}

/// Plays timelines through a MIDI sink.
pub struct MidiBackend<S: MidiSink = MidiOut> {
    output: Arc<Mutex<S>>,
    player: Arc<Mutex<TimelinePlayer>>,
    running: Arc<AtomicBool>,
    tempo: TempoFactor,
    base_bpm: f32,
    port_name: String,
    worker: Option<JoinHandle<()>>,
}

impl<S: MidiSink> std::fmt::Debug for MidiBackend<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiBackend")
            .field("port_name", &self.port_name)
            .field("base_bpm", &self.base_bpm)
            .field("tempo", &self.tempo.get())
            .field("playing", &self.is_playing())
            .finish_non_exhaustive()
    }
}

impl MidiBackend<MidiOut> {
    /// Open the output port whose name contains `port_hint`, or the first
    /// available port.
    pub fn open(port_hint: &str, base_bpm: f32) -> Result<Self> {
        let output = MidiOut::new(CLIENT_NAME, port_hint)?;
        let port_name = output.port_name.clone();
        Ok(Self::with_sink(output, port_name, base_bpm))
    }
}

impl<S: MidiSink> MidiBackend<S> {
    /// Play through an already open sink.
    pub fn with_sink(sink: S, port_name: impl Into<String>, base_bpm: f32) -> Self {
        Self {
            output: Arc::new(Mutex::new(sink)),
            player: Arc::new(Mutex::new(TimelinePlayer::new())),
            running: Arc::new(AtomicBool::new(false)),
            tempo: TempoFactor::default(),
            base_bpm,
            port_name: port_name.into(),
            worker: None,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn base_bpm(&self) -> f32 {
        self.base_bpm
    }

    /// Signal the timer thread and wait for it. Returns whether one was
    /// running.
    fn halt_worker(&mut self) -> Result<bool> {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.worker.take() else {
            return Ok(false);
        };
        handle
            .join()
            .map_err(|_| Error::Backend("Playback thread panicked".to_string()))?;
        lock(&self.player)?.stop();
        Ok(true)
    }
}

impl<S: MidiSink> PlaybackBackend for MidiBackend<S> {
    fn install_timeline(&mut self, timeline: Timeline) -> Result<()> {
        lock(&self.player)?.load(&timeline)
    }

    fn start(&mut self) -> Result<()> {
        self.halt_worker()?;
        lock(&self.player)?.start();
        self.running.store(true, Ordering::SeqCst);

        let worker = Worker {
            output: Arc::clone(&self.output),
            player: Arc::clone(&self.player),
            running: Arc::clone(&self.running),
            tempo: self.tempo.clone(),
            base_bpm: self.base_bpm,
        };
        let handle = thread::Builder::new()
            .name("beatbox-playback".to_string())
            .spawn(move || worker.run())
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                Error::Backend(format!("Failed to spawn playback thread: {}", e))
            })?;
        self.worker = Some(handle);

        info!(port = %self.port_name, tempo = self.tempo.get(), "Playback started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.halt_worker()? {
            lock(&self.output)?.send_all_notes_off(DRUM_CHANNEL)?;
            info!("Playback stopped");
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.worker.is_some() && self.running.load(Ordering::SeqCst)
    }

    fn tempo_factor(&self) -> f32 {
        self.tempo.get()
    }

    fn set_tempo_factor(&mut self, factor: f32) {
        self.tempo.set(factor);
    }
}

impl<S: MidiSink> Drop for MidiBackend<S> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(error = %e, "Failed to stop playback cleanly");
        }
    }
}

/// State moved onto the timer thread.
struct Worker<S> {
    output: Arc<Mutex<S>>,
    player: Arc<Mutex<TimelinePlayer>>,
    running: Arc<AtomicBool>,
    tempo: TempoFactor,
    base_bpm: f32,
}

impl<S: MidiSink> Worker<S> {
    fn run(self) {
        let mut tick_count: u64 = 0;
        let mut deadline = Instant::now();

        while self.running.load(Ordering::SeqCst) {
            if let Err(e) = self.play_tick(tick_count) {
                error!(error = %e, "Playback thread stopping");
                self.running.store(false, Ordering::SeqCst);
                return;
            }
            tick_count += 1;

            // Tempo is re-read every tick so changes apply while playing
            let next = loop {
                if !self.running.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(next) = tick_duration(self.base_bpm, self.tempo.get())
                    .and_then(|step| next_deadline(deadline, Instant::now(), step))
                {
                    break next;
                }
                thread::sleep(MAX_SLEEP_SLICE);
            };
            self.sleep_until(next);
            deadline = next;
        }
    }

    fn play_tick(&self, tick_count: u64) -> Result<()> {
        let messages = lock(&self.player)?.tick(tick_count);
        if messages.is_empty() {
            return Ok(());
        }

        let mut output = lock(&self.output)?;
        for message in &messages {
            if let Err(e) = output.send(message) {
                warn!(error = %e, tick = tick_count, "Dropped MIDI message");
            }
        }
        Ok(())
    }

    fn sleep_until(&self, deadline: Instant) {
        while self.running.load(Ordering::SeqCst) {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(MAX_SLEEP_SLICE));
        }
    }
}
