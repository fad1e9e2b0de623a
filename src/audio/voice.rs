//! Voices: the generator that renders a sound and the control block shared
//! between the service thread and the render thread.

use std::f32::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;

/// Produces stereo frames for one voice. Runs on the render thread.
pub trait Generator: Send {
    /// Next `[left, right]` frame, or `None` once a one-shot has finished.
    fn frame(&mut self, control: &VoiceControl, sample_rate: f32) -> Option<[f32; 2]>;
}

/// Live parameters of a voice, written by the service and read per frame by
/// the render bus.
#[derive(Debug)]
pub struct VoiceControl {
    volume: AtomicF32,
    frequency: AtomicF32,
    released: AtomicBool,
    finished: AtomicBool,
}

impl VoiceControl {
    pub fn new(volume: f32, frequency: f32) -> Self {
        Self {
            volume: AtomicF32::new(volume.clamp(0.0, 1.0)),
            frequency: AtomicF32::new(frequency),
            released: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    /// Nominal frequency; each generator decides how to render it.
    pub fn frequency(&self) -> f32 {
        self.frequency.load(Ordering::Relaxed)
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.frequency.store(frequency, Ordering::Relaxed);
    }

    /// Ask the render bus to fade this voice out and drop it.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::Release);
    }

    /// True once the render bus has dropped the voice.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Service-side owner of a voice in the graph. Dropping it releases the voice,
/// so a handle that goes out of scope can never leave an orphan playing.
#[derive(Debug)]
pub struct ActiveVoice {
    control: Arc<VoiceControl>,
    detached: bool,
}

impl ActiveVoice {
    pub(crate) fn new(control: Arc<VoiceControl>) -> Self {
        Self {
            control,
            detached: false,
        }
    }

    /// Let a one-shot play to its end instead of releasing it on drop.
    pub fn detach(mut self) {
        self.detached = true;
    }

    pub fn control(&self) -> &Arc<VoiceControl> {
        &self.control
    }

    pub fn set_volume(&self, volume: f32) {
        self.control.set_volume(volume);
    }

    pub fn set_frequency(&self, frequency: f32) {
        self.control.set_frequency(frequency);
    }

    /// Release the voice; the render bus ramps it down and disconnects it.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for ActiveVoice {
    fn drop(&mut self) {
        if !self.detached {
            self.control.release();
        }
    }
}

/// Linear gain ramp used for click-free starts and stops.
#[derive(Debug, Clone)]
pub struct Ramp {
    current: f32,
    step: f32,
}

impl Ramp {
    /// Starts silent and moves at most `1 / frames` per frame.
    pub fn new(frames: u32) -> Self {
        Self {
            current: 0.0,
            step: if frames == 0 { 1.0 } else { 1.0 / frames as f32 },
        }
    }

    pub fn next(&mut self, target: f32) -> f32 {
        if self.current < target {
            self.current = (self.current + self.step).min(target);
        } else if self.current > target {
            self.current = (self.current - self.step).max(target);
        }
        self.current
    }

}

/// Phase accumulator in cycles, `[0, 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Phase(f32);

impl Phase {
    pub fn new(start: f32) -> Self {
        Self(start.rem_euclid(1.0))
    }

    /// Current sine value, then advance by `frequency / sample_rate`.
    pub fn sine(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let value = (self.0 * 2.0 * PI).sin();
        self.advance(frequency, sample_rate);
        value
    }

    pub fn advance(&mut self, frequency: f32, sample_rate: f32) {
        self.0 += frequency / sample_rate;
        if self.0 >= 1.0 || self.0 < 0.0 {
            self.0 = self.0.rem_euclid(1.0);
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

/// Equal-power pan law; `pan` runs from -1.0 (left) to 1.0 (right).
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let p = (pan.clamp(-1.0, 1.0) + 1.0) * 0.5;
    ((1.0 - p).sqrt(), p.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_active_voice_releases_it() {
        let control = Arc::new(VoiceControl::new(0.5, 7.83));
        let voice = ActiveVoice::new(control.clone());
        assert!(!control.is_released());
        voice.stop();
        assert!(control.is_released());
    }

    #[test]
    fn detached_voice_is_not_released() {
        let control = Arc::new(VoiceControl::new(0.5, 880.0));
        ActiveVoice::new(control.clone()).detach();
        assert!(!control.is_released());
    }

    #[test]
    fn ramp_reaches_target_in_given_frames() {
        let mut ramp = Ramp::new(4);
        let values: Vec<f32> = (0..5).map(|_| ramp.next(1.0)).collect();
        assert_eq!(values, vec![0.25, 0.5, 0.75, 1.0, 1.0]);
        assert_eq!(ramp.next(0.5), 0.75);
        assert_eq!(ramp.next(0.5), 0.5);
    }

    #[test]
    fn zero_frame_ramp_jumps() {
        let mut ramp = Ramp::new(0);
        assert_eq!(ramp.next(0.8), 0.8);
        assert_eq!(ramp.next(0.0), 0.0);
    }

    #[test]
    fn pan_law_is_equal_power() {
        let (l, r) = pan_gains(0.0);
        assert!((l * l + r * r - 1.0).abs() < 1e-6);
        assert_eq!(pan_gains(-1.0), (1.0, 0.0));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
    }

    #[test]
    fn phase_wraps() {
        let mut phase = Phase::new(0.0);
        for _ in 0..10 {
            phase.advance(0.3, 1.0);
        }
        assert!(phase.value() >= 0.0 && phase.value() < 1.0);
        assert!((phase.value() - 0.0).abs() < 1e-4 || (phase.value() - 1.0).abs() < 1e-4);
    }
}
