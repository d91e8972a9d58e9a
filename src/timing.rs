use std::{
    cmp,
    time::{Duration, Instant},
};

use spin_sleep::SpinSleeper;

/// Wall-clock scheduler for the polling loop: a fast engine-poll cadence and
/// a slower cadence for status reporting.
pub struct Timing {
    pub tickrate: u64,
    pub statusrate: u64,
    last_tick: Instant,
    last_status: Instant,
    sleeper: SpinSleeper,
}

impl Timing {
    pub fn new(tickrate: u64, statusrate: u64) -> Self {
        let now = Instant::now();
        Self {
            tickrate,
            statusrate,
            last_tick: now,
            last_status: now,
            sleeper: SpinSleeper::default(),
        }
    }

    pub fn should_tick(&self) -> bool {
        self.calc_next_tick() == 0
    }
    pub fn should_report(&self) -> bool {
        self.calc_next_status() == 0
    }

    pub fn mark_tick(&mut self) {
        self.last_tick = Instant::now();
    }
    pub fn mark_report(&mut self) {
        self.last_status = Instant::now();
    }

    pub fn try_sleep(&self) {
        let sleep_for = self.calc_sleep_duration();
        if sleep_for > 0 {
            // accounts for platform dependent sleep resolution
            self.sleeper.sleep(Duration::from_millis(sleep_for));
        }
    }

    fn calc_next_tick(&self) -> u64 {
        calc_next_timeout(&self.last_tick, 1000 / self.tickrate)
    }

    fn calc_next_status(&self) -> u64 {
        calc_next_timeout(&self.last_status, 1000 / self.statusrate)
    }

    fn calc_sleep_duration(&self) -> u64 {
        cmp::min(self.calc_next_status(), self.calc_next_tick())
    }
}

#[inline]
fn calc_next_timeout(last: &Instant, timeout: u64) -> u64 {
    let elapsed = last.elapsed().as_millis() as u64;
    if timeout > elapsed {
        timeout - elapsed
    } else {
        0
    }
}
