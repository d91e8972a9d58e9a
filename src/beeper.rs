use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Stream, StreamConfig,
};
use log::warn;

const TONE_SILENT: u8 = 0;

/// Audible event feedback: a distinct pitch per event class.
#[derive(Clone, Copy, PartialEq)]
pub enum Tone {
    Click,
    Hold,
}

impl Tone {
    fn id(self) -> u8 {
        match self {
            Tone::Click => 1,
            Tone::Hold => 2,
        }
    }

    fn frequency(id: u8) -> f32 {
        match id {
            1 => 880.0,
            _ => 440.0,
        }
    }
}

pub struct Beeper {
    stream: Option<Stream>,
    shared_tone_ptr: Arc<AtomicU8>,
    previous_tone: u8,
}

impl Beeper {
    pub fn new() -> Self {
        Self {
            stream: None,
            shared_tone_ptr: Arc::new(AtomicU8::new(TONE_SILENT)),
            previous_tone: TONE_SILENT,
        }
    }

    /// Opens the output stream. Stays silent (with a warning) when no
    /// usable audio output exists, so the monitor keeps working headless.
    pub fn start_stream(&mut self) {
        let host = cpal::default_host();
        let device = match host.default_output_device() {
            Some(device) => device,
            None => {
                warn!("no audio output device, event feedback disabled");
                return;
            }
        };
        let config = match device.default_output_config() {
            Ok(config) => config,
            Err(err) => {
                warn!("no usable output config, event feedback disabled: {}", err);
                return;
            }
        };
        let tone_ptr = self.shared_tone_ptr.clone();

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => make_stream::<f32>(tone_ptr, &device, &config.into()),
            cpal::SampleFormat::I16 => make_stream::<i16>(tone_ptr, &device, &config.into()),
            cpal::SampleFormat::U16 => make_stream::<u16>(tone_ptr, &device, &config.into()),
        };

        match stream {
            Ok(stream) => {
                if let Err(err) = stream.play() {
                    warn!("could not start audio stream: {}", err);
                    return;
                }
                self.stream = Some(stream)
            }
            Err(err) => warn!("could not build audio stream: {}", err),
        }
    }

    pub fn stop_stream(&mut self) {
        self.stream = None
    }

    pub fn set_tone(&mut self, tone: Option<Tone>) {
        let new_tone = tone.map_or(TONE_SILENT, Tone::id);
        if self.previous_tone != new_tone {
            self.previous_tone = new_tone;
            self.shared_tone_ptr.store(new_tone, Ordering::Relaxed);
        }
    }
}

fn make_stream<T>(
    shared_tone_ptr: Arc<AtomicU8>,
    device: &cpal::Device,
    config: &StreamConfig,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample,
{
    let sample_rate = config.sample_rate.0 as f32;
    let channels = config.channels as usize;

    let mut sample_clock = 0f32;
    let mut sinewave_value_fn = move |frequency: f32| {
        sample_clock = (sample_clock + 1.0) % sample_rate;
        (sample_clock * frequency * 2.0 * std::f32::consts::PI / sample_rate).sin()
    };

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let tone = shared_tone_ptr.load(Ordering::Relaxed);
            if tone != TONE_SILENT {
                let frequency = Tone::frequency(tone);
                write_data(data, channels, &mut || sinewave_value_fn(frequency))
            } else {
                write_data(data, channels, &mut || 0.0)
            }
        },
        |err| warn!("an error occurred on stream: {}", err),
    )
}

fn write_data<T>(output: &mut [T], channels: usize, next_sample: &mut dyn FnMut() -> f32)
where
    T: cpal::Sample,
{
    for frame in output.chunks_mut(channels) {
        let value: T = cpal::Sample::from::<f32>(&next_sample());
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }
}
