/// Single-shot countdown timer, expressed as an absolute deadline against
/// a monotonic tick counter supplied by the caller.
///
/// The expiry check is non-resetting: once the deadline has passed it keeps
/// reporting expired on every call until the timer is re-armed. A default
/// (never armed) timeout reports expired.
#[derive(Clone, Copy, Debug, Default)]
pub struct Timeout {
    deadline: u64,
}

impl Timeout {
    pub fn new() -> Self {
        Self { deadline: 0 }
    }

    /// Schedules a one-shot deadline `duration` ticks past `now`.
    pub fn arm(&mut self, now: u64, duration: u64) {
        self.deadline = now + duration;
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.deadline
    }
}
