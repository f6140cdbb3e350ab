use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::intervaltimer::IntervalTimer;

/// What an effect gets to see of the music on each tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatData {
    /// Position within the current beat, `0.0..1.0`.
    pub oscillator: f64,
    /// Set on exactly one tick per detected beat onset.
    pub beat_now: bool,
}

/// Latest-value handoff between a beat producer and the render loop.
///
/// Only the most recent oscillator value is kept. Onsets are latched until the
/// next read so a beat falling between two render ticks is not lost.
#[derive(Default)]
pub struct BeatHandoff {
    oscillator: AtomicU64,
    beat_pending: AtomicBool,
}

impl BeatHandoff {
    pub fn new() -> BeatHandoff {
        Default::default()
    }

    pub fn publish(&self, beat: BeatData) {
        self.oscillator
            .store(beat.oscillator.to_bits(), Ordering::Release);
        if beat.beat_now {
            self.beat_pending.store(true, Ordering::Release);
        }
    }

    pub fn latest(&self) -> BeatData {
        BeatData {
            oscillator: f64::from_bits(self.oscillator.load(Ordering::Acquire)),
            beat_now: self.beat_pending.swap(false, Ordering::AcqRel),
        }
    }
}

/// Fixed tempo beat source.
pub struct Metronome {
    beat_period: Duration,
    started: Instant,
    last_beat: Option<u64>,
}

impl Metronome {
    pub fn new(bpm: f32) -> Metronome {
        Metronome {
            beat_period: Duration::from_secs_f32(60.0 / bpm),
            started: Instant::now(),
            last_beat: None,
        }
    }

    pub fn sample_at(&mut self, elapsed: Duration) -> BeatData {
        let beats = elapsed.as_secs_f64() / self.beat_period.as_secs_f64();
        let index = beats.floor() as u64;
        let beat_now = self.last_beat != Some(index);
        self.last_beat = Some(index);

        BeatData {
            oscillator: beats.fract(),
            beat_now,
        }
    }

    pub fn sample(&mut self) -> BeatData {
        let elapsed = self.started.elapsed();
        self.sample_at(elapsed)
    }

    /// Publishes beats at `rate_hz` until `shutdown` is set.
    pub fn run(mut self, handoff: Arc<BeatHandoff>, rate_hz: f32, shutdown: Arc<AtomicBool>) {
        let mut timer = IntervalTimer::new(rate_hz, false);
        while !shutdown.load(Ordering::Relaxed) {
            handoff.publish(self.sample());
            timer.sleep_until_next_tick();
        }
    }
}
