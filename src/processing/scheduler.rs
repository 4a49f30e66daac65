use crate::audio::AudioSink;
use crate::processing::detectors::PeakEvent;
use crate::report::FireRecord;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

// TONE SCHEDULER COMPONENT ----------------------------------------------------

/// Tail of each wait that is spun rather than slept, to keep jitter inside
/// the millisecond budget on a coarse-timer OS.
const SPIN_WINDOW: Duration = Duration::from_micros(500);

pub struct ToneSchedulerConfig {
    /// R-to-tone offset, drawn from the trial's condition set.
    pub delay: Duration,
    /// Tones per trial; reaching it completes the trial.
    pub tone_count: usize,
    pub min_inter_tone_interval: Duration,
    pub tone_frequency_hz: f64,
    pub tone_duration: Duration,
}

/// Result of offering one accepted peak to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    Fired { late: bool },
    /// Tone quota already met. Expected steady-state, not an error.
    QuotaExhausted,
    /// Minimum inter-tone interval since the last fire has not elapsed.
    TooSoon,
    /// The trial was stopped while the tone was pending; it never sounded.
    Cancelled,
}

/// Mutable per-trial counters, owned by the scheduler and read through
/// [`SchedulerHandle`] from the session thread.
#[derive(Default)]
pub struct TrialCounters {
    pub peaks_seen: usize,
    pub tones_fired: usize,
    pub last_fire_at: Option<Instant>,
    pub records: Vec<FireRecord>,
}

struct SharedState {
    counters: Mutex<TrialCounters>,
    /// Parking spot for the deadline wait; `wakeup` is notified on cancel.
    park: Mutex<()>,
    wakeup: Condvar,
    cancelled: AtomicBool,
}

enum WaitOutcome {
    Reached,
    Cancelled,
}

/// Converts accepted peaks into precisely delayed tones.
///
/// The wait-then-fire happens on whatever context delivered the sample, so
/// tone timing is never queued behind UI work. `on_peak` takes `&mut self`
/// and the audio sink sits behind a mutex: one tone at a time, in peak
/// order, no overlap.
pub struct ToneScheduler {
    config: ToneSchedulerConfig,
    audio: Arc<Mutex<dyn AudioSink>>,
    shared: Arc<SharedState>,
    epoch: Instant,
}

impl ToneScheduler {
    pub fn new(config: ToneSchedulerConfig, audio: Arc<Mutex<dyn AudioSink>>, epoch: Instant) -> Self {
        Self {
            config,
            audio,
            shared: Arc::new(SharedState {
                counters: Mutex::new(TrialCounters::default()),
                park: Mutex::new(()),
                wakeup: Condvar::new(),
                cancelled: AtomicBool::new(false),
            }),
            epoch,
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn quota_met(&self) -> bool {
        self.shared.counters.lock().unwrap().tones_fired >= self.config.tone_count
    }

    /// Schedules and fires the tone for one accepted peak, blocking the
    /// caller until `detected_at + delay`. A deadline already in the past
    /// fires immediately with `late` set rather than silently absorbing the
    /// overrun.
    pub fn on_peak(&mut self, event: &PeakEvent) -> FireOutcome {
        if self.shared.cancelled.load(Ordering::SeqCst) {
            return FireOutcome::Cancelled;
        }

        {
            let mut counters = self.shared.counters.lock().unwrap();
            counters.peaks_seen += 1;
            if counters.tones_fired >= self.config.tone_count {
                return FireOutcome::QuotaExhausted;
            }
            if let Some(last_fire) = counters.last_fire_at {
                if event.detected_at.saturating_duration_since(last_fire)
                    < self.config.min_inter_tone_interval
                {
                    return FireOutcome::TooSoon;
                }
            }
        }

        let deadline = event.detected_at + self.config.delay;
        let late = Instant::now() > deadline;
        if !late {
            if let WaitOutcome::Cancelled = self.wait_until(deadline) {
                return FireOutcome::Cancelled;
            }
        }

        {
            let mut audio = self.audio.lock().unwrap();
            audio.play_tone(self.config.tone_frequency_hz, self.config.tone_duration);
        }
        let fired_at = Instant::now();

        let mut counters = self.shared.counters.lock().unwrap();
        counters.tones_fired += 1;
        counters.last_fire_at = Some(fired_at);
        counters.records.push(FireRecord {
            peak_at: event.detected_at.saturating_duration_since(self.epoch),
            fired_at: fired_at.saturating_duration_since(self.epoch),
            target_delay: self.config.delay,
            achieved_delay: fired_at.saturating_duration_since(event.detected_at),
            late,
        });

        FireOutcome::Fired { late }
    }

    /// Interruptible high-resolution wait: coarse condvar timeouts down to
    /// the spin window, then a spin to the deadline. Cancellation wakes the
    /// sleep and is re-checked inside the spin, so a stopped trial can never
    /// leak a ghost tone.
    fn wait_until(&self, deadline: Instant) -> WaitOutcome {
        let mut parked = self.shared.park.lock().unwrap();
        loop {
            if self.shared.cancelled.load(Ordering::SeqCst) {
                return WaitOutcome::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                return WaitOutcome::Reached;
            }
            let remaining = deadline - now;
            if remaining > SPIN_WINDOW {
                let (guard, _timed_out) = self
                    .shared
                    .wakeup
                    .wait_timeout(parked, remaining - SPIN_WINDOW)
                    .unwrap();
                parked = guard;
            } else {
                drop(parked);
                while Instant::now() < deadline {
                    if self.shared.cancelled.load(Ordering::Relaxed) {
                        return WaitOutcome::Cancelled;
                    }
                    std::hint::spin_loop();
                }
                return WaitOutcome::Reached;
            }
        }
    }
}

/// Cloneable view of the scheduler's shared state, held by the session while
/// the scheduler itself lives inside the sample callback.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<SharedState>,
}

impl SchedulerHandle {
    /// Stops any pending wait before its tone fires. Idempotent.
    pub fn cancel(&self) {
        // The park lock serializes the store against the waiter's
        // check-then-park, so the notification cannot land in the gap and
        // leave the waiter sleeping out its coarse timeout.
        let _parked = self.shared.park.lock().unwrap();
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    pub fn tones_fired(&self) -> usize {
        self.shared.counters.lock().unwrap().tones_fired
    }

    pub fn peaks_seen(&self) -> usize {
        self.shared.counters.lock().unwrap().peaks_seen
    }

    /// Drains the counters for the trial report.
    pub fn take_counters(&self) -> TrialCounters {
        std::mem::take(&mut *self.shared.counters.lock().unwrap())
    }
}
