//! Analyser tapped between the master gain and the output.
//!
//! The render thread pushes blocks of the mono mix with `try_lock`, so a
//! reader holding the lock costs a dropped block, never an audio glitch.

use std::f32::consts::PI;
use std::sync::Mutex;

#[derive(Debug)]
struct Ring {
    samples: Vec<f32>,
    write: usize,
}

#[derive(Debug)]
pub struct Analyser {
    ring: Mutex<Ring>,
    sample_rate: f32,
}

impl Analyser {
    pub fn new(size: usize, sample_rate: u32) -> Self {
        Self {
            ring: Mutex::new(Ring {
                samples: vec![0.0; size.max(1)],
                write: 0,
            }),
            sample_rate: sample_rate as f32,
        }
    }

    pub fn size(&self) -> usize {
        self.ring.lock().map(|r| r.samples.len()).unwrap_or(0)
    }

    /// Called by the render bus. Skips the block if a reader holds the lock.
    pub(crate) fn push_block(&self, block: &[f32]) {
        if let Ok(mut ring) = self.ring.try_lock() {
            let len = ring.samples.len();
            for &sample in block {
                let w = ring.write;
                ring.samples[w] = sample;
                ring.write = (w + 1) % len;
            }
        }
    }

    /// Recent samples, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        match self.ring.lock() {
            Ok(ring) => {
                let (newer, older) = ring.samples.split_at(ring.write);
                older.iter().chain(newer.iter()).copied().collect()
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn rms(&self) -> f32 {
        let samples = self.snapshot();
        if samples.is_empty() {
            return 0.0;
        }
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    pub fn peak(&self) -> f32 {
        self.snapshot().iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }

    /// Normalised magnitude at each requested frequency (Goertzel), for
    /// meters and sound-reactive visuals.
    pub fn band_levels(&self, frequencies: &[f32]) -> Vec<f32> {
        let samples = self.snapshot();
        frequencies
            .iter()
            .map(|&f| goertzel(&samples, f, self.sample_rate))
            .collect()
    }
}

fn goertzel(samples: &[f32], frequency: f32, sample_rate: f32) -> f32 {
    if samples.is_empty() || frequency <= 0.0 || frequency >= sample_rate / 2.0 {
        return 0.0;
    }
    let omega = 2.0 * PI * frequency / sample_rate;
    let coeff = 2.0 * omega.cos();
    let (mut s1, mut s2) = (0.0f32, 0.0f32);
    for &x in samples {
        let s0 = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    let power = s1 * s1 + s2 * s2 - coeff * s1 * s2;
    2.0 * power.max(0.0).sqrt() / samples.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sr: f32, n: usize, amp: f32) -> Vec<f32> {
        (0..n).map(|i| (2.0 * PI * freq * i as f32 / sr).sin() * amp).collect()
    }

    #[test]
    fn silent_analyser_reads_zero() {
        let analyser = Analyser::new(256, 44_100);
        assert_eq!(analyser.rms(), 0.0);
        assert_eq!(analyser.peak(), 0.0);
    }

    #[test]
    fn ring_keeps_most_recent_samples_in_order() {
        let analyser = Analyser::new(4, 44_100);
        analyser.push_block(&[1.0, 2.0, 3.0]);
        analyser.push_block(&[4.0, 5.0]);
        assert_eq!(analyser.snapshot(), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(analyser.peak(), 5.0);
    }

    #[test]
    fn band_levels_pick_out_the_tone() {
        let analyser = Analyser::new(4410, 44_100);
        analyser.push_block(&sine(441.0, 44_100.0, 4410, 0.5));
        let levels = analyser.band_levels(&[441.0, 2000.0]);
        assert!((levels[0] - 0.5).abs() < 0.05, "tone level {}", levels[0]);
        assert!(levels[1] < 0.05, "off-band level {}", levels[1]);
        assert!((analyser.rms() - 0.5 / 2f32.sqrt()).abs() < 0.01);
    }
}
