use crate::timeout::Timeout;

/// Bit-vector over the keypad channels. Bits 0..=14 are switches, bit 15 is
/// the LONG flag and never a physical channel.
pub type ChannelMask = u16;

pub const CHANNEL_COUNT: usize = 15;

// Internal latch marking that the current gesture has already produced a
// hold event. Event masks returned for holds carry this bit.
pub const LONG: ChannelMask = 0x8000;
pub const CHANNEL_BITS: ChannelMask = 0x7FFF;

/// Mask with only channel `index` set.
#[inline]
pub const fn channel(index: usize) -> ChannelMask {
    1 << index
}

/// Timing knobs, all denominated in polling ticks.
#[derive(Clone, Copy, Debug)]
pub struct KeypadConfig {
    /// Minimum sustained-press duration for a release to count as a click.
    pub debounce_ticks: u64,
    /// Press duration before the first hold event fires.
    pub longpress_ticks: u64,
    /// Cadence between subsequent hold events. 0 disables repeat.
    pub repeat_ticks: u64,
    /// Faster cadence once the boost threshold is exceeded.
    pub boost_ticks: u64,
    /// Repeat count after which the cadence switches to `boost_ticks`.
    /// 0 disables boost.
    pub boost_threshold: u8,
}

impl Default for KeypadConfig {
    fn default() -> Self {
        Self {
            debounce_ticks: 50,
            longpress_ticks: 1000,
            repeat_ticks: 1000,
            boost_ticks: 50,
            boost_threshold: 8,
        }
    }
}

/// Event classification state machine over per-cycle channel samples.
///
/// `read_cycle` must be called once per polling tick. A gesture spans from
/// the first channel closing until all channels are open again; channels
/// pressed at any point during a gesture accumulate into one latched mask.
/// Each gesture classifies as a click (released after the debounce window
/// but before the long-press deadline), a hold (long-press deadline reached,
/// optionally repeating), or nothing (released inside the debounce window,
/// i.e. contact bounce).
pub struct Keypad {
    config: KeypadConfig,
    ticks: u64,
    down: ChannelMask,
    event: ChannelMask,
    debounce: Timeout,
    long_press: Timeout,
    boost_count: u8,
}

impl Keypad {
    // Pub

    pub fn new(config: KeypadConfig) -> Self {
        Self {
            config,
            ticks: 0,
            down: 0,
            event: 0,
            debounce: Timeout::new(),
            long_press: Timeout::new(),
            boost_count: 0,
        }
    }

    /// Consumes one sample and advances the state machine by one tick.
    ///
    /// The sample must not carry the LONG bit; callers obtain it from
    /// `ChannelBank::serialize` or an equivalent 15-bit source.
    pub fn read_cycle(&mut self, sample: ChannelMask) {
        debug_assert!(sample & LONG == 0, "sample carries the reserved bit");

        self.ticks += 1;
        let now = self.ticks;

        // Channel bits live for one cycle only; the LONG latch survives.
        self.event &= LONG;

        if sample != 0 {
            if sample != self.down {
                // New channel combination: (re)start the gesture clocks.
                self.event &= !LONG;
                self.boost_count = 0;
                self.debounce.arm(now, self.config.debounce_ticks);
                self.long_press.arm(now, self.config.longpress_ticks);
            }

            self.down |= sample;

            // First hold fires at the long-press deadline; the LONG latch
            // blocks further firings unless repeat is enabled.
            if self.long_press.is_expired(now)
                && (self.event & LONG == 0 || self.config.repeat_ticks > 0)
            {
                self.event = self.down | LONG;
                let cadence = self.next_cadence();
                if cadence > 0 {
                    self.long_press.arm(now, cadence);
                }
            }
        } else {
            // The debounce deadline is absolute, armed at gesture start. A
            // glitch shorter than the window reaches this branch before the
            // deadline, so `down` gets zeroed and nothing ever fires.
            if self.debounce.is_expired(now) && self.event & LONG == 0 {
                self.event = self.down;
            }

            self.down = 0;
            self.event &= !LONG;
            self.boost_count = 0;

            self.long_press.arm(now, self.config.longpress_ticks);
            self.debounce.arm(now, self.config.debounce_ticks);
        }
    }

    /// Exactly the channels in `mask` are held and no event is pending.
    pub fn is_down(&self, mask: ChannelMask) -> bool {
        self.down == mask && self.event == 0
    }

    /// A click event for exactly `mask` fired this cycle. `mask` must not
    /// include the LONG bit.
    pub fn is_click(&self, mask: ChannelMask) -> bool {
        self.event == mask
    }

    /// A hold event for exactly `mask` fired this cycle.
    pub fn is_hold(&self, mask: ChannelMask) -> bool {
        self.event == mask | LONG
    }

    // Priv

    /// Picks the re-arm cadence after a hold firing. The first
    /// `boost_threshold` firings run on the repeat cadence, every one after
    /// that on the boost cadence; a zero result means repeat is disabled and
    /// the timer is left alone.
    #[inline]
    fn next_cadence(&mut self) -> u64 {
        if self.config.boost_threshold > 0 {
            if self.boost_count >= self.config.boost_threshold {
                return self.config.boost_ticks;
            }
            self.boost_count += 1;
        }
        self.config.repeat_ticks
    }
}

#[cfg(test)]
mod tests {
    use super::{channel, Keypad, KeypadConfig, CHANNEL_BITS, LONG};
    use proptest::prelude::*;

    const CH1: u16 = channel(1);
    const CH2: u16 = channel(2);

    fn test_config() -> KeypadConfig {
        KeypadConfig {
            debounce_ticks: 50,
            longpress_ticks: 1000,
            repeat_ticks: 1000,
            boost_ticks: 50,
            boost_threshold: 0,
        }
    }

    // Test helper
    fn run_cycles(keypad: &mut Keypad, sample: u16, cycles: u64) {
        for _ in 0..cycles {
            keypad.read_cycle(sample);
        }
    }

    #[test]
    fn glitch_suppressed_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 30);
        assert!(!keypad.is_click(CH1));

        for _ in 0..200 {
            keypad.read_cycle(0);
            assert!(!keypad.is_click(CH1));
            assert!(!keypad.is_hold(CH1));
        }
    }

    #[test]
    fn click_fires_on_release_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 200);
        assert!(!keypad.is_click(CH1));

        // Debounce deadline (tick 50) has long passed, so the click fires
        // on the first open-sample cycle.
        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1));
    }

    #[test]
    fn click_event_lasts_one_cycle_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 200);
        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1));

        keypad.read_cycle(0);
        assert!(!keypad.is_click(CH1));
        assert_eq!(keypad.event & CHANNEL_BITS, 0);
    }

    #[test]
    fn is_down_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 10);
        assert!(keypad.is_down(CH1));
        assert!(!keypad.is_down(CH2));

        // A pending click event suppresses is_down.
        run_cycles(&mut keypad, CH1, 190);
        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1));
        assert!(!keypad.is_down(0));

        keypad.read_cycle(0);
        assert!(keypad.is_down(0));
    }

    #[test]
    fn hold_fires_at_longpress_deadline_test() {
        let mut keypad = Keypad::new(test_config());

        // The deadline lands 1000 full ticks after the first press sample.
        run_cycles(&mut keypad, CH1, 1000);
        assert!(!keypad.is_hold(CH1));

        keypad.read_cycle(CH1);
        assert!(keypad.is_hold(CH1));
        assert!(!keypad.is_click(CH1));
    }

    #[test]
    fn hold_latch_survives_event_clear_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 1001);
        assert!(keypad.is_hold(CH1));

        // Channel bits clear next cycle, the LONG latch stays.
        keypad.read_cycle(CH1);
        assert!(!keypad.is_hold(CH1));
        assert_eq!(keypad.event, LONG);
    }

    #[test]
    fn hold_fires_once_when_repeat_disabled_test() {
        let mut keypad = Keypad::new(KeypadConfig {
            repeat_ticks: 0,
            ..test_config()
        });

        let mut hold_count = 0;
        for _ in 0..2500 {
            keypad.read_cycle(CH1);
            if keypad.is_hold(CH1) {
                hold_count += 1;
            }
        }
        assert_eq!(hold_count, 1);
    }

    #[test]
    fn no_click_after_hold_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 1100);
        keypad.read_cycle(0);
        assert!(!keypad.is_click(CH1));

        run_cycles(&mut keypad, 0, 100);
        assert!(!keypad.is_click(CH1));
    }

    #[test]
    fn repeat_cadence_test() {
        // debounce=50, longpress=1000, repeat=1000, boost disabled.
        let mut keypad = Keypad::new(test_config());

        let mut hold_ticks = Vec::new();
        for tick in 1u64..=2500 {
            keypad.read_cycle(CH1);
            if keypad.is_hold(CH1) {
                hold_ticks.push(tick);
            }
        }
        keypad.read_cycle(0);
        assert!(!keypad.is_hold(CH1));
        assert!(!keypad.is_click(CH1));

        // One hold per 1000 ticks of continuous press, none at release.
        assert_eq!(hold_ticks, vec![1001, 2001]);
    }

    #[test]
    fn boost_cadence_test() {
        // Repeat at 200 for the first 3 repeats, then boost at 50.
        let mut keypad = Keypad::new(KeypadConfig {
            longpress_ticks: 1000,
            repeat_ticks: 200,
            boost_ticks: 50,
            boost_threshold: 3,
            ..test_config()
        });

        let mut hold_ticks = Vec::new();
        for tick in 1u64..=2000 {
            keypad.read_cycle(CH1);
            if keypad.is_hold(CH1) {
                hold_ticks.push(tick);
            }
        }

        // First hold at the long-press deadline, three repeats at the base
        // cadence, boost cadence from there on.
        assert_eq!(&hold_ticks[..4], &[1001, 1201, 1401, 1601]);
        assert_eq!(hold_ticks[4], 1651);
        for pair in hold_ticks[4..].windows(2) {
            assert_eq!(pair[1] - pair[0], 50);
        }
    }

    #[test]
    fn boost_resets_between_gestures_test() {
        let mut keypad = Keypad::new(KeypadConfig {
            longpress_ticks: 100,
            repeat_ticks: 200,
            boost_ticks: 50,
            boost_threshold: 1,
            ..test_config()
        });

        // Drive the first gesture into boost, then release.
        run_cycles(&mut keypad, CH1, 600);
        run_cycles(&mut keypad, 0, 100);

        // The next gesture starts back on the repeat cadence.
        let mut hold_ticks = Vec::new();
        for tick in 1u64..=400 {
            keypad.read_cycle(CH1);
            if keypad.is_hold(CH1) {
                hold_ticks.push(tick);
            }
        }
        assert_eq!(&hold_ticks[..2], &[101, 301]);
    }

    #[test]
    fn rolling_chord_test() {
        let mut keypad = Keypad::new(test_config());

        // Press 1, roll 2 in while 1 is still held, release both.
        run_cycles(&mut keypad, CH1, 10);
        run_cycles(&mut keypad, CH1 | CH2, 100);
        assert!(keypad.is_down(CH1 | CH2));

        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1 | CH2));
        assert!(!keypad.is_click(CH1));
        assert!(!keypad.is_click(CH2));
    }

    #[test]
    fn partial_release_rearms_debounce_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1 | CH2, 100);

        // Dropping to a different combination restarts both clocks while
        // the accumulated mask stays latched.
        run_cycles(&mut keypad, CH1, 30);
        keypad.read_cycle(0);
        assert!(!keypad.is_click(CH1 | CH2));

        // Holding past the re-armed debounce window clicks the full chord.
        run_cycles(&mut keypad, CH1 | CH2, 100);
        run_cycles(&mut keypad, CH1, 60);
        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1 | CH2));
    }

    #[test]
    fn restart_after_hold_clears_latch_test() {
        let mut keypad = Keypad::new(test_config());

        run_cycles(&mut keypad, CH1, 1100);
        assert_eq!(keypad.event & LONG, LONG);

        // A combination change mid-gesture drops the latch, so the next
        // release classifies like a fresh gesture.
        run_cycles(&mut keypad, CH1 | CH2, 100);
        keypad.read_cycle(0);
        assert!(keypad.is_click(CH1 | CH2));
    }

    proptest! {
        #[test]
        fn press_duration_classification_proptest(press_ticks in 1u64..2500) {
            let mut keypad = Keypad::new(test_config());

            let mut clicks = 0;
            let mut holds = 0u64;
            for _ in 0..press_ticks {
                keypad.read_cycle(CH1);
                if keypad.is_hold(CH1) {
                    holds += 1;
                }
            }
            for _ in 0..100 {
                keypad.read_cycle(0);
                if keypad.is_click(CH1) {
                    clicks += 1;
                }
                prop_assert!(keypad.down == 0);
            }

            if press_ticks < 50 {
                // Bounce: suppressed entirely.
                prop_assert_eq!(clicks, 0);
                prop_assert_eq!(holds, 0);
            } else if press_ticks <= 1000 {
                prop_assert_eq!(clicks, 1);
                prop_assert_eq!(holds, 0);
            } else {
                prop_assert_eq!(clicks, 0);
                prop_assert_eq!(holds, 1 + (press_ticks - 1001) / 1000);
            }
        }
    }
}
