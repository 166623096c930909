use std::thread;
use std::time::{Duration, Instant};

use crate::config::DEFAULT_FRAME_RATE;
use crate::media::FrameRate;

/// Holds presentation to a fixed frame interval.
///
/// Each call schedules the next frame one interval after the previous
/// deadline, so time spent decoding is absorbed instead of added. A pacer
/// that falls more than one interval behind starts over from `now` rather
/// than rushing to catch up.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn from_frame_rate(rate: Option<FrameRate>) -> Self {
        let interval = rate
            .map(|rate| rate.interval())
            .unwrap_or_else(|| Duration::from_secs_f64(1.0 / DEFAULT_FRAME_RATE));
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How long to wait at `now`, right after presenting a frame.
    pub fn delay(&mut self, now: Instant) -> Duration {
        let mut deadline = match self.deadline {
            Some(previous) => previous + self.interval,
            None => now + self.interval,
        };
        if deadline + self.interval < now {
            deadline = now;
        }
        self.deadline = Some(deadline);
        deadline.saturating_duration_since(now)
    }

    pub fn wait(&mut self) {
        let delay = self.delay(Instant::now());
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }
}
