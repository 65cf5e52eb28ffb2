//! Procedural sound effects rendered straight into sample buffers.

use std::{f32::consts::TAU, sync::Arc, time::Duration};

use rand::Rng;

use super::AudioClip;

pub const SAMPLE_RATE: u32 = 44_100;
const NOISE_SECONDS: u32 = 4;

/// C major pentatonic, C4 through C5.
pub const AMBIENT_SCALE: [f32; 6] = [261.63, 293.66, 329.63, 392.00, 440.00, 523.25];
pub const AMBIENT_MASTER_GAIN: f32 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Buttons and selectors.
    Click,
    UploadClick,
    /// Hover tick.
    Pop,
    Shutter,
    /// Motor whirr, paper hiss and exit whoosh of an ejecting print.
    Print,
    Ding,
}

#[derive(Debug, Clone, Copy)]
enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

impl Waveform {
    fn sample(self, phase: f32) -> f32 {
        match self {
            Self::Sine => (phase * TAU).sin(),
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Curve {
    Step,
    Linear,
    Exponential,
}

/// Piecewise automation curve over clip time, in seconds.
#[derive(Debug, Clone)]
pub(crate) struct Param {
    events: Vec<(f32, f32, Curve)>,
}

impl Param {
    pub(crate) fn new(value: f32) -> Self {
        Self {
            events: vec![(0.0, value, Curve::Step)],
        }
    }

    pub(crate) fn set(mut self, value: f32, at: f32) -> Self {
        self.events.push((at, value, Curve::Step));
        self
    }

    pub(crate) fn linear(mut self, value: f32, at: f32) -> Self {
        self.events.push((at, value, Curve::Linear));
        self
    }

    pub(crate) fn exponential(mut self, value: f32, at: f32) -> Self {
        self.events.push((at, value, Curve::Exponential));
        self
    }

    pub(crate) fn value_at(&self, t: f32) -> f32 {
        let (mut prev_time, mut value, _) = self.events[0];

        for &(time, target, curve) in &self.events {
            if time <= t {
                prev_time = time;
                value = target;
                continue;
            }

            let span = time - prev_time;
            if span <= 0.0 {
                return value;
            }
            let progress = (t - prev_time) / span;
            return match curve {
                Curve::Step => value,
                Curve::Linear => value + (target - value) * progress,
                Curve::Exponential if value > 0.0 && target > 0.0 => {
                    value * (target / value).powf(progress)
                }
                Curve::Exponential => value,
            };
        }

        value
    }
}

#[derive(Debug, Clone, Copy)]
enum Filter {
    LowPass,
    HighPass,
}

/// One-pole filter whose cutoff may itself be automated.
fn apply_filter(samples: &mut [f32], filter: Filter, cutoff: &Param, offset: f32) {
    let mut low = 0.0f32;
    for (index, sample) in samples.iter_mut().enumerate() {
        let t = offset + index as f32 / SAMPLE_RATE as f32;
        let fc = cutoff.value_at(t).max(1.0);
        let alpha = 1.0 - (-TAU * fc / SAMPLE_RATE as f32).exp();
        low += alpha * (*sample - low);
        *sample = match filter {
            Filter::LowPass => low,
            Filter::HighPass => *sample - low,
        };
    }
}

#[derive(Debug, Clone)]
pub struct Synth {
    noise: Arc<[f32]>,
}

impl Synth {
    pub fn new(rng: &mut impl Rng) -> Self {
        let len = (SAMPLE_RATE * NOISE_SECONDS) as usize;
        let noise: Vec<f32> = (0..len).map(|_| rng.random_range(-1.0f32..1.0)).collect();
        Self {
            noise: noise.into(),
        }
    }

    pub fn render(&self, effect: SoundEffect) -> AudioClip {
        match effect {
            SoundEffect::Click => self.mechanical_click(1500.0, 0.15),
            SoundEffect::UploadClick => self.mechanical_click(1000.0, 0.2),
            SoundEffect::Pop => self.mechanical_click(2000.0, 0.03),
            SoundEffect::Shutter => self.shutter(),
            SoundEffect::Print => self.print(),
            SoundEffect::Ding => self.ding(),
        }
    }

    /// One soft sine note of the ambient loop.
    pub fn ambient_note(&self, frequency: f32, duration: Duration) -> AudioClip {
        let seconds = duration.as_secs_f32();
        let mut buffer = silence(seconds);
        let gain = Param::new(0.0)
            .linear(0.2 * AMBIENT_MASTER_GAIN, 0.5)
            .linear(0.0, seconds);
        tone(
            &mut buffer,
            0.0,
            seconds,
            Waveform::Sine,
            &Param::new(frequency),
            &gain,
        );
        clip(buffer)
    }

    fn mechanical_click(&self, frequency: f32, volume: f32) -> AudioClip {
        let mut buffer = silence(0.05);
        let pitch = Param::new(frequency).exponential(frequency * 0.4, 0.03);
        let gain = Param::new(volume).exponential(0.001, 0.04);
        tone(&mut buffer, 0.0, 0.05, Waveform::Triangle, &pitch, &gain);
        clip(buffer)
    }

    fn shutter(&self) -> AudioClip {
        let mut buffer = silence(0.15);

        let pitch = Param::new(800.0).exponential(300.0, 0.1);
        let gain = Param::new(0.25).exponential(0.01, 0.1);
        tone(&mut buffer, 0.0, 0.1, Waveform::Triangle, &pitch, &gain);

        let air_gain = Param::new(0.3).exponential(0.01, 0.1);
        self.noise_burst(
            &mut buffer,
            0.0,
            0.15,
            Filter::HighPass,
            &Param::new(1000.0),
            &air_gain,
        );

        clip(buffer)
    }

    fn print(&self) -> AudioClip {
        const MOTOR: f32 = 1.2;
        let exit_start = MOTOR - 0.2;
        let mut buffer = silence(exit_start + 0.5);

        let start_pitch = Param::new(600.0).exponential(100.0, 0.05);
        let start_gain = Param::new(0.2).exponential(0.01, 0.05);
        tone(&mut buffer, 0.0, 0.06, Waveform::Square, &start_pitch, &start_gain);

        let mut motor = silence(MOTOR);
        let motor_pitch = Param::new(120.0).linear(110.0, MOTOR);
        let motor_gain = Param::new(0.0)
            .linear(0.12, 0.1)
            .set(0.12, MOTOR - 0.1)
            .linear(0.0, MOTOR);
        tone(&mut motor, 0.0, MOTOR, Waveform::Sawtooth, &motor_pitch, &motor_gain);
        apply_filter(&mut motor, Filter::LowPass, &Param::new(400.0), 0.0);
        mix(&mut buffer, &motor, 0.0);

        let friction_gain = Param::new(0.0)
            .linear(0.08, 0.1)
            .set(0.08, MOTOR - 0.1)
            .linear(0.0, MOTOR);
        self.noise_burst(
            &mut buffer,
            0.0,
            MOTOR,
            Filter::HighPass,
            &Param::new(2500.0),
            &friction_gain,
        );

        let exit_cutoff = Param::new(800.0).linear(100.0, 0.4);
        let exit_gain = Param::new(0.0).linear(0.15, 0.1).linear(0.0, 0.4);
        self.noise_burst(
            &mut buffer,
            exit_start,
            0.5,
            Filter::LowPass,
            &exit_cutoff,
            &exit_gain,
        );

        clip(buffer)
    }

    fn ding(&self) -> AudioClip {
        let mut buffer = silence(2.0);
        let gain = Param::new(0.0).linear(0.3, 0.05).exponential(0.001, 2.0);
        tone(&mut buffer, 0.0, 2.0, Waveform::Sine, &Param::new(880.0), &gain);
        clip(buffer)
    }

    /// Filtered noise starting at `start` seconds; params run in burst-local time.
    fn noise_burst(
        &self,
        buffer: &mut [f32],
        start: f32,
        length: f32,
        filter: Filter,
        cutoff: &Param,
        gain: &Param,
    ) {
        let count = seconds_to_samples(length);
        let mut burst: Vec<f32> = self.noise.iter().copied().cycle().take(count).collect();
        apply_filter(&mut burst, filter, cutoff, 0.0);
        for (index, sample) in burst.iter_mut().enumerate() {
            *sample *= gain.value_at(index as f32 / SAMPLE_RATE as f32);
        }
        mix(buffer, &burst, start);
    }
}

fn seconds_to_samples(seconds: f32) -> usize {
    (seconds.max(0.0) * SAMPLE_RATE as f32).round() as usize
}

fn silence(seconds: f32) -> Vec<f32> {
    vec![0.0; seconds_to_samples(seconds)]
}

fn clip(buffer: Vec<f32>) -> AudioClip {
    AudioClip {
        sample_rate: SAMPLE_RATE,
        samples: buffer.into(),
    }
}

fn mix(buffer: &mut [f32], source: &[f32], start: f32) {
    let offset = seconds_to_samples(start);
    for (dst, src) in buffer.iter_mut().skip(offset).zip(source) {
        *dst += src;
    }
}

/// Oscillator from `start` to `stop` seconds; params run in clip time.
fn tone(
    buffer: &mut [f32],
    start: f32,
    stop: f32,
    waveform: Waveform,
    pitch: &Param,
    gain: &Param,
) {
    let from = seconds_to_samples(start);
    let to = seconds_to_samples(stop).min(buffer.len());
    let mut phase = 0.0f32;

    for (index, sample) in buffer.iter_mut().enumerate().take(to).skip(from) {
        let t = index as f32 / SAMPLE_RATE as f32;
        *sample += waveform.sample(phase) * gain.value_at(t);
        phase = (phase + pitch.value_at(t) / SAMPLE_RATE as f32).fract();
    }
}
