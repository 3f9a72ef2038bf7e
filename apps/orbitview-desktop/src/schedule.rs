use std::time::{Duration, Instant};
use winit::event_loop::ControlFlow;

/// How the window drives `TestScene::draw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Schedule {
    /// One tick per presented frame, paced by vsync.
    Refresh,
    /// One tick per fixed interval derived from `--fps`.
    Interval,
}

/// Decides when the next tick is due. Missed interval ticks are skipped,
/// never queued.
#[derive(Debug)]
pub struct Ticker {
    schedule: Schedule,
    interval: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(schedule: Schedule, fps: u32, now: Instant) -> Self {
        Self {
            schedule,
            interval: Duration::from_nanos(1_000_000_000 / fps.max(1) as u64),
            next: now,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true when a tick should run at `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.schedule {
            Schedule::Refresh => true,
            Schedule::Interval => {
                if now < self.next {
                    return false;
                }
                let behind = now.duration_since(self.next).as_nanos();
                let skipped = (behind / self.interval.as_nanos().max(1)) as u32;
                self.next += self.interval * (skipped + 1);
                true
            }
        }
    }

    pub fn control_flow(&self) -> ControlFlow {
        match self.schedule {
            Schedule::Refresh => ControlFlow::Poll,
            Schedule::Interval => ControlFlow::WaitUntil(self.next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refresh_ticks_every_poll() {
        let now = Instant::now();
        let mut ticker = Ticker::new(Schedule::Refresh, 60, now);
        assert!(ticker.poll(now));
        assert!(ticker.poll(now));
        assert_eq!(ticker.control_flow(), ControlFlow::Poll);
    }

    #[test]
    fn interval_waits_for_deadline() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Schedule::Interval, 50, start);
        assert_eq!(ticker.interval(), Duration::from_millis(20));
        assert!(ticker.poll(start));
        assert!(!ticker.poll(start + Duration::from_millis(10)));
        assert!(ticker.poll(start + Duration::from_millis(20)));
        assert_eq!(
            ticker.control_flow(),
            ControlFlow::WaitUntil(start + Duration::from_millis(40))
        );
    }

    #[test]
    fn interval_skips_missed_ticks() {
        let start = Instant::now();
        let mut ticker = Ticker::new(Schedule::Interval, 50, start);
        assert!(ticker.poll(start + Duration::from_millis(95)));
        // one tick for the whole stall, next deadline after it
        assert!(!ticker.poll(start + Duration::from_millis(99)));
        assert!(ticker.poll(start + Duration::from_millis(100)));
    }
}
