//! Render side of the mixing graph.
//!
//! `MasterBus` is a `rodio::Source` producing interleaved stereo. Every frame
//! it drains pending commands, renders each voice through its category mixer,
//! applies the master gain, soft-limits and feeds the analyser.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atomic_float::AtomicF32;
use crossbeam_channel::Receiver;
use rodio::Source;

use super::analyser::Analyser;
use super::voice::{Generator, Ramp, VoiceControl};

const ANALYSER_BLOCK: usize = 256;
const LIMIT_THRESHOLD: f32 = 0.8;

/// Master gain with a mute switch that keeps the stored volume.
#[derive(Debug)]
pub struct MasterGain {
    volume: AtomicF32,
    muted: AtomicBool,
}

impl MasterGain {
    pub fn new(volume: f32) -> Self {
        Self {
            volume: AtomicF32::new(volume.clamp(0.0, 1.0)),
            muted: AtomicBool::new(false),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Relaxed);
    }

    /// Gain actually applied to the mix.
    pub fn effective(&self) -> f32 {
        if self.is_muted() {
            0.0
        } else {
            self.volume()
        }
    }
}

/// Per-category gain every voice of that category passes through.
#[derive(Debug)]
pub struct MixerGain {
    gain: AtomicF32,
}

impl MixerGain {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: AtomicF32::new(gain.clamp(0.0, 1.0)),
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain.load(Ordering::Relaxed)
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.clamp(0.0, 1.0), Ordering::Relaxed);
    }
}

pub enum BusCommand {
    Attach(RenderVoice),
}

/// A voice as the render thread sees it.
pub struct RenderVoice {
    generator: Box<dyn Generator>,
    control: Arc<VoiceControl>,
    mixer: Arc<MixerGain>,
    ramp: Ramp,
}

impl RenderVoice {
    pub fn new(
        generator: Box<dyn Generator>,
        control: Arc<VoiceControl>,
        mixer: Arc<MixerGain>,
        fade_frames: u32,
    ) -> Self {
        Self {
            generator,
            control,
            mixer,
            ramp: Ramp::new(fade_frames),
        }
    }

    /// Render one frame; `None` once the voice should be dropped.
    fn render(&mut self, sample_rate: f32) -> Option<[f32; 2]> {
        let released = self.control.is_released();
        let target = if released { 0.0 } else { self.control.volume() };
        let gain = self.ramp.next(target);
        if released && gain <= 0.0 {
            return None;
        }
        let [l, r] = self.generator.frame(&self.control, sample_rate)?;
        let g = gain * self.mixer.gain();
        Some([l * g, r * g])
    }
}

pub struct MasterBus {
    sample_rate: u32,
    commands: Receiver<BusCommand>,
    voices: Vec<RenderVoice>,
    master: Arc<MasterGain>,
    analyser: Arc<Analyser>,
    block: Vec<f32>,
    pending_right: Option<f32>,
}

impl MasterBus {
    pub fn new(
        sample_rate: u32,
        commands: Receiver<BusCommand>,
        master: Arc<MasterGain>,
        analyser: Arc<Analyser>,
    ) -> Self {
        Self {
            sample_rate,
            commands,
            voices: Vec::new(),
            master,
            analyser,
            block: Vec::with_capacity(ANALYSER_BLOCK),
            pending_right: None,
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                BusCommand::Attach(voice) => self.voices.push(voice),
            }
        }
    }

    /// Render the next stereo frame of the full mix.
    pub fn next_frame(&mut self) -> [f32; 2] {
        self.drain_commands();

        let sr = self.sample_rate as f32;
        let mut mix = [0.0f32; 2];
        self.voices.retain_mut(|voice| match voice.render(sr) {
            Some([l, r]) => {
                mix[0] += l;
                mix[1] += r;
                true
            }
            None => {
                voice.control.mark_finished();
                false
            }
        });

        let master = self.master.effective();
        let out = [soft_limit(mix[0] * master), soft_limit(mix[1] * master)];

        self.block.push((out[0] + out[1]) * 0.5);
        if self.block.len() >= ANALYSER_BLOCK {
            self.analyser.push_block(&self.block);
            self.block.clear();
        }
        out
    }
}

impl Drop for MasterBus {
    fn drop(&mut self) {
        for voice in &self.voices {
            voice.control.mark_finished();
        }
    }
}

impl Iterator for MasterBus {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        // Interleaved stereo: queue the right sample behind the left one
        if let Some(right) = self.pending_right.take() {
            return Some(right);
        }
        let [left, right] = self.next_frame();
        self.pending_right = Some(right);
        Some(left)
    }
}

impl Source for MasterBus {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Linear below the threshold, compressed smoothly towards 1.0 above it.
fn soft_limit(x: f32) -> f32 {
    let a = x.abs();
    if a <= LIMIT_THRESHOLD {
        x
    } else {
        let headroom = 1.0 - LIMIT_THRESHOLD;
        let over = a - LIMIT_THRESHOLD;
        x.signum() * (LIMIT_THRESHOLD + headroom * (over / headroom).tanh())
    }
}
