use crate::keypad::{channel, ChannelMask, CHANNEL_COUNT};

/// Runtime registry of wired keypad channels.
///
/// Each registered channel owns a read callback resolving its electrical
/// state to "closed". `serialize` folds every closed channel into one
/// sample mask for `Keypad::read_cycle`.
pub struct ChannelBank {
    channels: Vec<Channel>,
}

struct Channel {
    bit: ChannelMask,
    read: Box<dyn Fn() -> bool>,
}

impl ChannelBank {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Wires channel `index` (0..=14) to a read callback.
    pub fn register<F>(&mut self, index: usize, read: F)
    where
        F: Fn() -> bool + 'static,
    {
        assert!(index < CHANNEL_COUNT, "channel index out of range: {}", index);
        self.channels.push(Channel {
            bit: channel(index),
            read: Box::new(read),
        });
    }

    /// Reads every wired channel into a sample mask.
    pub fn serialize(&self) -> ChannelMask {
        let mut result = 0;
        for ch in &self.channels {
            if (ch.read)() {
                result |= ch.bit;
            }
        }
        result
    }

    /// Which of the 15 channel bits are wired.
    pub fn enabled_mask(&self) -> ChannelMask {
        self.channels.iter().fold(0, |mask, ch| mask | ch.bit)
    }
}
