//! Schumann resonance drones (`core` category).
//!
//! The modes sit at 7.83 Hz and up, below hearing, so the drone renders the
//! nominal frequency shifted up by `schumann_octave_shift` octaves. The
//! registry and `update_sound` keep working in nominal Hz.

use std::collections::HashMap;

use lazy_static::lazy_static;

use super::source_or_default;
use crate::audio::service::SoundService;
use crate::audio::sound::{Category, SoundDescriptor, SoundId, SoundInfo, VoiceSpec};
use crate::audio::voice::{Generator, Phase, VoiceControl};

lazy_static! {
    static ref SCHUMANN_MODES: HashMap<&'static str, f32> = HashMap::from([
        ("schumann", 7.83),
        ("schumann-2", 14.3),
        ("schumann-3", 20.8),
        ("schumann-4", 27.3),
        ("schumann-5", 33.8),
    ]);
}

/// Nominal frequency of a Schumann preset.
pub fn schumann_frequency(key: &str) -> Option<f32> {
    SCHUMANN_MODES.get(key).copied()
}

/// Preset keys, lowest mode first.
pub fn schumann_keys() -> Vec<&'static str> {
    let mut keys: Vec<_> = SCHUMANN_MODES.iter().collect();
    keys.sort_by(|a, b| a.1.total_cmp(b.1));
    keys.into_iter().map(|(k, _)| *k).collect()
}

#[derive(Debug, Clone)]
pub struct SchumannParams {
    /// Overrides the preset's nominal frequency.
    pub frequency: Option<f32>,
    /// Amplitude modulation rate in Hz.
    pub rate: f32,
    /// Amplitude modulation depth, 0..1.
    pub depth: f32,
    pub volume: f32,
    pub source: String,
}

impl Default for SchumannParams {
    fn default() -> Self {
        Self {
            frequency: None,
            rate: 0.1,
            depth: 0.1,
            volume: 0.5,
            source: String::new(),
        }
    }
}

/// Sine drone with a soft second harmonic and slow amplitude breathing.
pub struct SchumannDrone {
    multiplier: f32,
    rate: f32,
    depth: f32,
    fundamental: Phase,
    overtone: Phase,
    lfo: Phase,
}

impl SchumannDrone {
    pub fn new(octave_shift: u32, rate: f32, depth: f32) -> Self {
        Self {
            multiplier: 2f32.powi(octave_shift as i32),
            rate: rate.max(0.0),
            depth: depth.clamp(0.0, 1.0),
            fundamental: Phase::default(),
            overtone: Phase::new(0.25),
            lfo: Phase::default(),
        }
    }
}

impl Generator for SchumannDrone {
    fn frame(&mut self, control: &VoiceControl, sample_rate: f32) -> Option<[f32; 2]> {
        let f = control.frequency() * self.multiplier;
        let tone = self.fundamental.sine(f, sample_rate) * 0.8
            + self.overtone.sine(f * 2.0, sample_rate) * 0.2;
        // breathes between (1 - depth) and 1
        let lfo = 0.5 - 0.5 * self.lfo.sine(self.rate, sample_rate);
        let sample = tone * (1.0 - self.depth * lfo);
        Some([sample, sample])
    }
}

impl SoundService {
    pub fn start_schumann(&self, key: &str, params: SchumannParams) -> Option<SoundId> {
        let Some(preset) = schumann_frequency(key) else {
            log::warn!("unknown schumann preset '{key}'");
            return None;
        };
        let frequency = params.frequency.unwrap_or(preset);
        let descriptor = SoundDescriptor::new(
            SoundInfo::new(key)
                .volume(params.volume)
                .source(source_or_default(&params.source))
                .meta("band", "ELF")
                .meta("rate", params.rate)
                .meta("depth", params.depth),
            VoiceSpec::Core { frequency },
        );
        let generator =
            SchumannDrone::new(self.config().schumann_octave_shift, params.rate, params.depth);
        self.start_voice(key, descriptor, Box::new(generator))
    }

    pub fn stop_schumann(&self, key: &str) -> bool {
        self.stop_voice(Category::Core, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sound::SoundPatch;
    use crate::audio::AudioConfig;

    #[test]
    fn keys_are_sorted_by_mode() {
        assert_eq!(schumann_keys()[0], "schumann");
        assert_eq!(schumann_keys().len(), 5);
        assert_eq!(schumann_frequency("schumann"), Some(7.83));
        assert_eq!(schumann_frequency("schumann-9"), None);
    }

    #[test]
    fn start_registers_nominal_frequency() {
        let service = SoundService::new(AudioConfig::offline());
        let id = service.start_schumann("schumann", SchumannParams::default()).unwrap();

        let sounds = service.get_all_active_sounds();
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].id, id);
        assert_eq!(sounds[0].category, Category::Core);
        assert_eq!(sounds[0].frequency, Some(7.83));
        assert_eq!(sounds[0].source, "strangewave");

        assert!(service.update_sound(id, &SoundPatch::frequency(8.0)));
        assert_eq!(service.get_all_active_sounds()[0].frequency, Some(8.0));

        assert!(service.stop_schumann("schumann"));
        assert!(service.get_all_active_sounds().is_empty());
        assert!(!service.stop_schumann("schumann"));
    }

    #[test]
    fn frequency_override_and_unknown_key() {
        let service = SoundService::new(AudioConfig::offline());
        let params = SchumannParams {
            frequency: Some(9.0),
            source: "globe".into(),
            ..Default::default()
        };
        service.start_schumann("schumann-2", params).unwrap();
        let handle = &service.sounds_by_source("globe")[0];
        assert_eq!(handle.frequency, Some(9.0));
        assert_eq!(handle.name, "schumann-2");

        assert!(service.start_schumann("schumann-99", SchumannParams::default()).is_none());
        assert_eq!(service.get_all_active_sounds().len(), 1);
    }

    #[test]
    fn drone_renders_shifted_tone() {
        let control = VoiceControl::new(1.0, 7.83);
        let mut drone = SchumannDrone::new(4, 0.1, 0.0);
        let frames: Vec<f32> = (0..44_100).map(|_| drone.frame(&control, 44_100.0).unwrap()[0]).collect();

        // 7.83 Hz * 16 = 125.28 Hz: about 125 upward zero crossings per second
        let crossings = frames.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((120..=131).contains(&crossings), "crossings {crossings}");
        assert!(frames.iter().all(|s| s.abs() <= 1.0));
    }
}
