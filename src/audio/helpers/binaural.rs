//! Binaural beat pairs (`binaural` category).
//!
//! Two oscillators, `carrier` Hz hard left and `carrier + beat` Hz hard
//! right. The registered frequency is the beat; patching it retunes the right
//! ear live.

use std::collections::HashMap;

use lazy_static::lazy_static;

use super::source_or_default;
use crate::audio::service::SoundService;
use crate::audio::sound::{Category, SoundDescriptor, SoundId, SoundInfo, VoiceSpec};
use crate::audio::voice::{pan_gains, Generator, Phase, VoiceControl};

lazy_static! {
    static ref BRAINWAVE_BANDS: HashMap<&'static str, f32> = HashMap::from([
        ("delta", 2.0),
        ("theta", 6.0),
        ("alpha", 10.0),
        ("beta", 20.0),
        ("gamma", 40.0),
    ]);
}

pub fn beat_frequency(key: &str) -> Option<f32> {
    BRAINWAVE_BANDS.get(key).copied()
}

/// Preset keys, slowest beat first.
pub fn binaural_keys() -> Vec<&'static str> {
    let mut keys: Vec<_> = BRAINWAVE_BANDS.iter().collect();
    keys.sort_by(|a, b| a.1.total_cmp(b.1));
    keys.into_iter().map(|(k, _)| *k).collect()
}

#[derive(Debug, Clone)]
pub struct BinauralParams {
    /// Left-ear frequency; defaults to `binaural_carrier` from the config.
    pub carrier: Option<f32>,
    /// Overrides the preset beat.
    pub beat: Option<f32>,
    pub volume: f32,
    pub source: String,
}

impl Default for BinauralParams {
    fn default() -> Self {
        Self {
            carrier: None,
            beat: None,
            volume: 0.5,
            source: String::new(),
        }
    }
}

pub struct BinauralPair {
    carrier: f32,
    left: Phase,
    right: Phase,
    left_pan: (f32, f32),
    right_pan: (f32, f32),
}

impl BinauralPair {
    pub fn new(carrier: f32) -> Self {
        Self {
            carrier,
            left: Phase::default(),
            right: Phase::default(),
            left_pan: pan_gains(-1.0),
            right_pan: pan_gains(1.0),
        }
    }
}

impl Generator for BinauralPair {
    fn frame(&mut self, control: &VoiceControl, sample_rate: f32) -> Option<[f32; 2]> {
        let beat = control.frequency();
        let l = self.left.sine(self.carrier, sample_rate);
        let r = self.right.sine(self.carrier + beat, sample_rate);
        Some([
            l * self.left_pan.0 + r * self.right_pan.0,
            l * self.left_pan.1 + r * self.right_pan.1,
        ])
    }
}

impl SoundService {
    pub fn start_binaural(&self, key: &str, params: BinauralParams) -> Option<SoundId> {
        let Some(preset) = beat_frequency(key) else {
            log::warn!("unknown binaural preset '{key}'");
            return None;
        };
        let beat = params.beat.unwrap_or(preset);
        let carrier = params.carrier.unwrap_or(self.config().binaural_carrier);
        let descriptor = SoundDescriptor::new(
            SoundInfo::new(key)
                .volume(params.volume)
                .source(source_or_default(&params.source))
                .meta("band", key),
            VoiceSpec::Binaural { carrier, beat },
        );
        self.start_voice(key, descriptor, Box::new(BinauralPair::new(carrier)))
    }

    pub fn stop_binaural(&self, key: &str) -> bool {
        self.stop_voice(Category::Binaural, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sound::SoundPatch;
    use crate::audio::{AudioConfig, PlaybackState};

    fn upward_crossings(samples: &[f32]) -> usize {
        samples.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    #[test]
    fn theta_and_alpha_are_distinct_entries() {
        let service = SoundService::new(AudioConfig::offline());
        let theta = service.start_binaural("theta", BinauralParams::default()).unwrap();
        let alpha = service.start_binaural("alpha", BinauralParams::default()).unwrap();
        assert_ne!(theta, alpha);

        let sounds = service.get_all_active_sounds();
        assert_eq!(sounds.len(), 2);
        assert!(sounds.iter().all(|h| h.category == Category::Binaural));

        assert!(service.stop_binaural("theta"));
        let left = service.get_all_active_sounds();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "alpha");
        assert_eq!(service.playback_state(Category::Binaural, "theta"), PlaybackState::Stopped);
        assert_eq!(service.playback_state(Category::Binaural, "alpha"), PlaybackState::Playing);
    }

    #[test]
    fn restarting_a_band_keeps_one_entry() {
        let service = SoundService::new(AudioConfig::offline());
        service.start_binaural("theta", BinauralParams::default());
        service.start_binaural(
            "theta",
            BinauralParams {
                beat: Some(5.5),
                ..Default::default()
            },
        );
        let sounds = service.sounds_by_category(Category::Binaural);
        assert_eq!(sounds.len(), 1);
        assert_eq!(sounds[0].frequency, Some(5.5));
    }

    #[test]
    fn carrier_is_recorded_in_metadata() {
        let service = SoundService::new(AudioConfig::offline());
        service.start_binaural(
            "gamma",
            BinauralParams {
                carrier: Some(180.0),
                ..Default::default()
            },
        );
        let handle = &service.get_all_active_sounds()[0];
        assert_eq!(handle.frequency, Some(40.0));
        assert_eq!(handle.metadata.get("carrier").map(String::as_str), Some("180"));
        assert_eq!(handle.metadata.get("band").map(String::as_str), Some("gamma"));
    }

    #[test]
    fn ears_are_separated_by_the_beat() {
        let control = VoiceControl::new(1.0, 10.0);
        let mut pair = BinauralPair::new(200.0);
        let frames: Vec<[f32; 2]> = (0..44_100).map(|_| pair.frame(&control, 44_100.0).unwrap()).collect();
        let left: Vec<f32> = frames.iter().map(|f| f[0]).collect();
        let right: Vec<f32> = frames.iter().map(|f| f[1]).collect();

        let (l, r) = (upward_crossings(&left), upward_crossings(&right));
        assert!((199..=201).contains(&l), "left {l}");
        assert!((209..=211).contains(&r), "right {r}");

        control.set_frequency(20.0);
        let right: Vec<f32> = (0..44_100).map(|_| pair.frame(&control, 44_100.0).unwrap()[1]).collect();
        let r = upward_crossings(&right);
        assert!((219..=221).contains(&r), "retuned right {r}");
    }

    #[test]
    fn beat_patch_reaches_the_voice() {
        let service = SoundService::new(AudioConfig::offline());
        let id = service.start_binaural("alpha", BinauralParams::default()).unwrap();
        assert!(service.update_sound(id, &SoundPatch::frequency(12.0)));
        assert_eq!(service.sounds_by_category(Category::Binaural)[0].frequency, Some(12.0));
    }
}
