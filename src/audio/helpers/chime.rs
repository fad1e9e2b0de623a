//! One-shot chimes through the `events` mixer.
//!
//! Chimes are fire-and-forget: they decay on their own and are never
//! registered, since registry entries only leave when someone stops them.

use crate::audio::service::SoundService;
use crate::audio::sound::Category;
use crate::audio::voice::{Generator, Phase, VoiceControl};

const CHIME_SECONDS: f32 = 1.2;

/// Frequency of a chime preset.
pub fn chime_frequency(key: &str) -> Option<f32> {
    match key {
        "ping" => Some(880.0),
        "alert" => Some(660.0),
        "reveal" => Some(1320.0),
        _ => None,
    }
}

/// Bell-ish tone: fundamental plus an inharmonic partial, exponential decay.
pub struct Chime {
    fundamental: Phase,
    partial: Phase,
    elapsed: u32,
    length: Option<u32>,
}

impl Chime {
    pub fn new() -> Self {
        Self {
            fundamental: Phase::default(),
            partial: Phase::default(),
            elapsed: 0,
            length: None,
        }
    }
}

impl Default for Chime {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for Chime {
    fn frame(&mut self, control: &VoiceControl, sample_rate: f32) -> Option<[f32; 2]> {
        let length = *self.length.get_or_insert((CHIME_SECONDS * sample_rate) as u32);
        if self.elapsed >= length {
            return None;
        }
        let t = self.elapsed as f32 / sample_rate;
        let f = control.frequency();
        let env = (-5.0 * t).exp();
        let sample = (self.fundamental.sine(f, sample_rate) * 0.7
            + self.partial.sine(f * 2.76, sample_rate) * 0.3 * (-3.0 * t).exp())
            * env;
        self.elapsed += 1;
        Some([sample, sample])
    }
}

impl SoundService {
    /// Fire a chime. Returns `false` for unknown presets or when audio is
    /// unavailable.
    pub fn play_chime(&self, key: &str, volume: f32) -> bool {
        let Some(frequency) = chime_frequency(key) else {
            log::warn!("unknown chime '{key}'");
            return false;
        };
        let Some(graph) = self.graph() else {
            return false;
        };
        match graph.connect(Category::Events, Box::new(Chime::new()), volume, frequency) {
            Some(voice) => {
                voice.detach();
                log::debug!("chime '{key}' at {frequency} Hz");
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioConfig;

    #[test]
    fn chime_ends_by_itself() {
        let control = VoiceControl::new(1.0, 880.0);
        let mut chime = Chime::new();
        let rendered = std::iter::from_fn(|| chime.frame(&control, 1000.0)).count();
        assert_eq!(rendered, 1200);
    }

    #[test]
    fn chime_plays_without_registering() {
        let mut config = AudioConfig::offline();
        config.fade_ms = 0;
        let service = SoundService::new(config);
        assert!(service.play_chime("ping", 0.8));
        assert!(service.get_all_active_sounds().is_empty());

        let frames = service.render_offline(200).unwrap();
        assert!(frames.iter().any(|f| f[0].abs() > 0.01));

        // long after the decay the events bus is silent again
        let tail = service.render_offline(60_000).unwrap();
        assert_eq!(tail[59_999], [0.0, 0.0]);
        assert!(!service.play_chime("gong", 0.8));
    }

    #[test]
    fn chime_without_audio_is_noop() {
        let service = SoundService::new(AudioConfig::disabled());
        assert!(!service.play_chime("ping", 1.0));
    }
}
