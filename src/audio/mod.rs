use colored::Colorize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// AUDIO ACTUATION BOUNDARY ----------------------------------------------------

/// Injected tone output capability. `play_tone` is fire-and-forget and must
/// return promptly; all timing discipline lives in the scheduler, the sink
/// is only responsible for producing sound without delay.
pub trait AudioSink: Send {
    fn play_tone(&mut self, frequency_hz: f64, duration: Duration);
}

/// Sink for the demo binary: prints one line per tone.
pub struct ConsoleSink;

impl AudioSink for ConsoleSink {
    fn play_tone(&mut self, frequency_hz: f64, duration: Duration) {
        println!(
            "{} {:.0} Hz for {} ms",
            "tone".yellow().bold(),
            frequency_hz,
            duration.as_millis()
        );
    }
}

/// Discards tones.
pub struct NullSink;

impl AudioSink for NullSink {
    fn play_tone(&mut self, _frequency_hz: f64, _duration: Duration) {}
}

#[derive(Debug, Clone, Copy)]
pub struct ToneEvent {
    pub at: Instant,
    pub frequency_hz: f64,
    pub duration: Duration,
}

/// Records every tone with its actual emission time. Used by tests to check
/// counts and timing without an audio device.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ToneEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ToneEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn tone_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl AudioSink for RecordingSink {
    fn play_tone(&mut self, frequency_hz: f64, duration: Duration) {
        self.events.lock().unwrap().push(ToneEvent {
            at: Instant::now(),
            frequency_hz,
            duration,
        });
    }
}
