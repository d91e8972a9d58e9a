use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use log::{debug, info};
use winit::{
    event::{DeviceEvent, ElementState, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::ControlFlow,
};

use crate::{
    beeper::{Beeper, Tone},
    channels::ChannelBank,
    keypad::{channel, ChannelMask, Keypad, KeypadConfig, CHANNEL_COUNT},
    timing::Timing,
};

const TICK_RATE_MIN: u64 = 100;
const TICK_RATE_NORMAL: u64 = 250;
const TICK_RATE_FAST: u64 = 500;
const TICK_RATE_MAX: u64 = 1000;

// Engine polls per second. At the max rate one tick is one millisecond, so
// the default KeypadConfig durations read as milliseconds.
const DEFAULT_TICK_RATE: u64 = TICK_RATE_MAX;
// Held-channel reports per second
const STATUS_RATE: u64 = 4;

// Feedback tone lengths, in engine ticks.
const CLICK_FEEDBACK_TICKS: u64 = 80;
const HOLD_FEEDBACK_TICKS: u64 = 40;

// Demo chord: channels 0 and 1 together.
const CHORD_01: ChannelMask = channel(0) | channel(1);

/// Keypad event monitor: maps keyboard keys onto the 15 channels, polls the
/// engine at a fixed cadence and reports every classified event.
pub struct Monitor {
    keypad: Keypad,
    bank: ChannelBank,
    switches: Vec<Arc<AtomicBool>>,
    beeper: Beeper,
    timing: Timing,
    feedback_ticks: u64,
}

impl Monitor {
    pub fn new() -> Self {
        let mut bank = ChannelBank::new();
        let mut switches = Vec::with_capacity(CHANNEL_COUNT);
        for index in 0..CHANNEL_COUNT {
            let switch = Arc::new(AtomicBool::new(false));
            let state = switch.clone();
            bank.register(index, move || state.load(Ordering::Relaxed));
            switches.push(switch);
        }

        let mut beeper = Beeper::new();
        beeper.start_stream();

        Self {
            keypad: Keypad::new(KeypadConfig::default()),
            bank,
            switches,
            beeper,
            timing: Timing::new(DEFAULT_TICK_RATE, STATUS_RATE),
            feedback_ticks: 0,
        }
    }

    pub fn handle_window_event(&mut self, event: WindowEvent) -> Option<ControlFlow> {
        if let WindowEvent::CloseRequested = event {
            println!("The close button was pressed; stopping");
            self.beeper.stop_stream();
            return Some(ControlFlow::Exit);
        }

        None
    }

    pub fn handle_device_event(&mut self, event: DeviceEvent) -> Option<ControlFlow> {
        if let DeviceEvent::Key(KeyboardInput {
            state: element_state,
            virtual_keycode: Some(keycode),
            ..
        }) = event
        {
            match element_state {
                ElementState::Pressed => self.on_key_pressed(keycode),
                ElementState::Released => self.on_key_released(keycode),
            }
        }

        None
    }

    pub fn handle_update(&mut self) -> Option<ControlFlow> {
        if self.timing.should_tick() {
            let sample = self.bank.serialize();
            self.keypad.read_cycle(sample);
            self.scan_events();
            self.run_feedback();
            self.timing.mark_tick()
        }

        if self.timing.should_report() {
            self.report_held_channels();
            self.timing.mark_report()
        }

        self.timing.try_sleep();

        None
    }

    // Priv

    fn scan_events(&mut self) {
        for index in 0..CHANNEL_COUNT {
            if self.keypad.is_click(channel(index)) {
                info!("click: channel {}", index);
                self.start_feedback(Tone::Click, CLICK_FEEDBACK_TICKS);
            }
            if self.keypad.is_hold(channel(index)) {
                info!("hold: channel {}", index);
                self.start_feedback(Tone::Hold, HOLD_FEEDBACK_TICKS);
            }
        }

        // Chords only match on their exact combined mask.
        if self.keypad.is_click(CHORD_01) {
            info!("click: chord 0+1");
            self.start_feedback(Tone::Click, CLICK_FEEDBACK_TICKS);
        }
        if self.keypad.is_hold(CHORD_01) {
            info!("hold: chord 0+1");
            self.start_feedback(Tone::Hold, HOLD_FEEDBACK_TICKS);
        }
    }

    fn start_feedback(&mut self, tone: Tone, ticks: u64) {
        self.feedback_ticks = ticks;
        self.beeper.set_tone(Some(tone));
    }

    fn run_feedback(&mut self) {
        if self.feedback_ticks > 0 {
            self.feedback_ticks -= 1;
            if self.feedback_ticks == 0 {
                self.beeper.set_tone(None);
            }
        }
    }

    fn report_held_channels(&self) {
        for index in 0..CHANNEL_COUNT {
            if self.keypad.is_down(channel(index)) {
                debug!("held: channel {}", index);
            }
        }
        if self.keypad.is_down(CHORD_01) {
            debug!("held: chord 0+1");
        }
    }

    fn on_key_pressed(&mut self, keycode: VirtualKeyCode) {
        if let Some(index) = map_key(keycode) {
            self.switches[index].store(true, Ordering::Relaxed);
        } else {
            self.adjust_tickrate(keycode);
        }
    }

    fn on_key_released(&mut self, keycode: VirtualKeyCode) {
        if let Some(index) = map_key(keycode) {
            self.switches[index].store(false, Ordering::Relaxed);
        }
    }

    fn adjust_tickrate(&mut self, keycode: VirtualKeyCode) {
        match keycode {
            VirtualKeyCode::F1 => self.timing.tickrate = TICK_RATE_MIN,
            VirtualKeyCode::F2 => self.timing.tickrate = TICK_RATE_NORMAL,
            VirtualKeyCode::F3 => self.timing.tickrate = TICK_RATE_FAST,
            VirtualKeyCode::F4 => self.timing.tickrate = TICK_RATE_MAX,
            _ => (),
        }
    }
}

fn map_key(scancode: VirtualKeyCode) -> Option<usize> {
    match scancode {
        VirtualKeyCode::Key1 => Some(0),
        VirtualKeyCode::Key2 => Some(1),
        VirtualKeyCode::Key3 => Some(2),
        VirtualKeyCode::Key4 => Some(3),
        VirtualKeyCode::Key5 => Some(4),

        VirtualKeyCode::Q => Some(5),
        VirtualKeyCode::W => Some(6),
        VirtualKeyCode::E => Some(7),
        VirtualKeyCode::R => Some(8),
        VirtualKeyCode::T => Some(9),

        VirtualKeyCode::A => Some(10),
        VirtualKeyCode::S => Some(11),
        VirtualKeyCode::D => Some(12),
        VirtualKeyCode::F => Some(13),
        VirtualKeyCode::G => Some(14),

        _ => None,
    }
}
