//! Ambient loops (`ambient` category).
//!
//! Each preset renders a two-second buffer once from a fixed seed and loops it.
//! Noise textures are crossfaded across the loop point so the wrap is silent.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::sync::Arc;

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::source_or_default;
use crate::audio::service::SoundService;
use crate::audio::sound::{Category, SoundDescriptor, SoundId, SoundInfo, VoiceSpec};
use crate::audio::voice::{Generator, VoiceControl};

const LOOP_SECONDS: f32 = 2.0;
const CROSSFADE_SECONDS: f32 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Texture {
    /// 60 Hz mains hum with its odd harmonics over a faint hiss.
    Hum,
    /// Low-passed noise with a gust every loop.
    Wind,
    /// Sparse crackle.
    Static,
    /// Brown noise.
    Void,
}

#[derive(Copy, Clone, Debug)]
pub struct AmbientPreset {
    pub texture: Texture,
    /// Nominal frequency, `None` for non-tonal textures.
    pub frequency: Option<f32>,
    pub seed: u64,
}

lazy_static! {
    static ref AMBIENT_PRESETS: HashMap<&'static str, AmbientPreset> = HashMap::from([
        ("hum", AmbientPreset { texture: Texture::Hum, frequency: Some(60.0), seed: 60 }),
        ("wind", AmbientPreset { texture: Texture::Wind, frequency: None, seed: 7 }),
        ("static", AmbientPreset { texture: Texture::Static, frequency: None, seed: 23 }),
        ("void", AmbientPreset { texture: Texture::Void, frequency: None, seed: 0 }),
    ]);
}

pub fn ambient_preset(key: &str) -> Option<AmbientPreset> {
    AMBIENT_PRESETS.get(key).copied()
}

pub fn ambient_keys() -> Vec<&'static str> {
    let mut keys: Vec<&'static str> = AMBIENT_PRESETS.keys().copied().collect();
    keys.sort_unstable();
    keys
}

#[derive(Debug, Clone)]
pub struct AmbientParams {
    /// Playback rate; 1.0 plays the loop at its recorded pitch.
    pub rate: f32,
    pub volume: f32,
    pub source: String,
}

impl Default for AmbientParams {
    fn default() -> Self {
        Self {
            rate: 1.0,
            volume: 0.4,
            source: String::new(),
        }
    }
}

/// Render the loop buffer for `preset`, peak-normalised to 0.8.
pub fn render_loop(preset: &AmbientPreset, sample_rate: u32) -> Arc<[f32]> {
    let sr = sample_rate as f32;
    let len = (LOOP_SECONDS * sr) as usize;
    let xfade = (CROSSFADE_SECONDS * sr) as usize;
    let mut rng = StdRng::seed_from_u64(preset.seed);

    let mut buffer: Vec<f32> = match preset.texture {
        Texture::Hum => {
            // whole number of cycles per loop, so no crossfade needed
            (0..len)
                .map(|i| {
                    let t = i as f32 / sr;
                    let hum = (2.0 * PI * 60.0 * t).sin() * 0.7
                        + (2.0 * PI * 180.0 * t).sin() * 0.2
                        + (2.0 * PI * 300.0 * t).sin() * 0.08;
                    hum + rng.gen_range(-0.02..0.02)
                })
                .collect()
        }
        Texture::Wind => {
            let mut state = 0.0f32;
            (0..len + xfade)
                .map(|i| {
                    let t = i as f32 / sr;
                    let gust = 0.5 - 0.5 * (2.0 * PI * t / LOOP_SECONDS).cos();
                    let coeff = 0.01 + 0.04 * gust;
                    state += coeff * (rng.gen_range(-1.0..1.0) - state);
                    state * (0.4 + 0.6 * gust)
                })
                .collect()
        }
        Texture::Static => {
            let mut tail = 0.0f32;
            (0..len + xfade)
                .map(|_| {
                    if rng.gen_bool(0.0008) {
                        tail = rng.gen_range(-1.0..1.0);
                    }
                    tail *= 0.97;
                    tail + rng.gen_range(-0.03..0.03)
                })
                .collect()
        }
        Texture::Void => {
            let mut brown = 0.0f32;
            (0..len + xfade)
                .map(|_| {
                    brown = (brown + rng.gen_range(-1.0..1.0) * 0.02) * 0.998;
                    brown
                })
                .collect()
        }
    };

    if buffer.len() > len {
        crossfade_loop(&mut buffer, len);
    }
    normalise(&mut buffer, 0.8);
    buffer.into()
}

/// Blend the overhang past `len` into the head, then cut it off.
fn crossfade_loop(buffer: &mut Vec<f32>, len: usize) {
    let xfade = buffer.len() - len;
    for i in 0..xfade {
        let w = i as f32 / xfade as f32;
        buffer[i] = buffer[i] * w + buffer[len + i] * (1.0 - w);
    }
    buffer.truncate(len);
}

fn normalise(buffer: &mut [f32], peak: f32) {
    let max = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if max > 0.0 {
        let scale = peak / max;
        buffer.iter_mut().for_each(|s| *s *= scale);
    }
}

/// Loops a shared buffer. The right channel reads half a loop ahead.
///
/// A tonal loop follows the voice frequency: playback speeds up by
/// `frequency / nominal`, so retuning `hum` to 120 Hz plays it an octave up.
pub struct LoopPlayer {
    buffer: Arc<[f32]>,
    position: f64,
    rate: f64,
    nominal: Option<f32>,
}

impl LoopPlayer {
    pub fn new(buffer: Arc<[f32]>, rate: f32, nominal: Option<f32>) -> Self {
        Self {
            buffer,
            position: 0.0,
            rate: rate.max(0.0) as f64,
            nominal: nominal.filter(|f| *f > 0.0),
        }
    }

    fn speed(&self, control: &VoiceControl) -> f64 {
        match self.nominal {
            Some(nominal) => self.rate * (control.frequency().max(0.0) / nominal) as f64,
            None => self.rate,
        }
    }

    fn read(&self, position: f64) -> f32 {
        let len = self.buffer.len();
        let i = position.floor() as usize % len;
        let frac = (position - position.floor()) as f32;
        let a = self.buffer[i];
        let b = self.buffer[(i + 1) % len];
        a + (b - a) * frac
    }
}

impl Generator for LoopPlayer {
    fn frame(&mut self, control: &VoiceControl, _sample_rate: f32) -> Option<[f32; 2]> {
        let len = self.buffer.len();
        if len == 0 {
            return None;
        }
        let left = self.read(self.position);
        let right = self.read(self.position + (len / 2) as f64);
        self.position = (self.position + self.speed(control)) % len as f64;
        Some([left, right])
    }
}

impl SoundService {
    pub fn start_ambient(&self, key: &str, params: AmbientParams) -> Option<SoundId> {
        let Some(preset) = ambient_preset(key) else {
            log::warn!("unknown ambient preset '{key}'");
            return None;
        };
        let descriptor = SoundDescriptor::new(
            SoundInfo::new(key)
                .volume(params.volume)
                .source(source_or_default(&params.source))
                .meta("rate", params.rate),
            VoiceSpec::Ambient {
                frequency: preset.frequency,
            },
        );
        let sample_rate = self.graph()?.sample_rate();
        let buffer = render_loop(&preset, sample_rate);
        let player = LoopPlayer::new(buffer, params.rate, preset.frequency);
        self.start_voice(key, descriptor, Box::new(player))
    }

    pub fn stop_ambient(&self, key: &str) -> bool {
        self.stop_voice(Category::Ambient, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sound::{SoundKind, SoundPatch};
    use crate::audio::AudioConfig;

    #[test]
    fn loops_are_deterministic_and_normalised() {
        for key in ambient_keys() {
            let preset = ambient_preset(key).unwrap();
            let a = render_loop(&preset, 8000);
            let b = render_loop(&preset, 8000);
            assert_eq!(a, b, "{key} is not reproducible");
            assert_eq!(a.len(), 16_000);
            let peak = a.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!((peak - 0.8).abs() < 1e-4, "{key} peak {peak}");
        }
    }

    #[test]
    fn loop_wrap_is_continuous() {
        let preset = ambient_preset("void").unwrap();
        let buffer = render_loop(&preset, 8000);
        let jump = (buffer[buffer.len() - 1] - buffer[0]).abs();
        assert!(jump < 0.1, "jump at loop point {jump}");
    }

    #[test]
    fn player_wraps_and_offsets_right_channel() {
        let buffer: Arc<[f32]> = vec![0.0, 1.0, 2.0, 3.0].into();
        let mut player = LoopPlayer::new(buffer, 1.0, None);
        let control = VoiceControl::new(1.0, 0.0);
        let frames: Vec<[f32; 2]> = (0..5).map(|_| player.frame(&control, 1.0).unwrap()).collect();
        assert_eq!(frames[0], [0.0, 2.0]);
        assert_eq!(frames[1], [1.0, 3.0]);
        assert_eq!(frames[2], [2.0, 0.0]);
        assert_eq!(frames[4], [0.0, 2.0]);
    }

    #[test]
    fn half_rate_interpolates() {
        let buffer: Arc<[f32]> = vec![0.0, 1.0].into();
        let mut player = LoopPlayer::new(buffer, 0.5, None);
        let control = VoiceControl::new(1.0, 0.0);
        player.frame(&control, 1.0);
        assert_eq!(player.frame(&control, 1.0).unwrap()[0], 0.5);
    }

    #[test]
    fn tonal_loop_follows_voice_frequency() {
        let buffer: Arc<[f32]> = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0].into();
        let mut player = LoopPlayer::new(buffer.clone(), 1.0, Some(60.0));
        let control = VoiceControl::new(1.0, 120.0);
        let left: Vec<f32> = (0..3).map(|_| player.frame(&control, 1.0).unwrap()[0]).collect();
        assert_eq!(left, vec![0.0, 2.0, 4.0]);

        // noise loops ignore the frequency
        let mut noise = LoopPlayer::new(buffer, 1.0, None);
        noise.frame(&control, 1.0);
        assert_eq!(noise.frame(&control, 1.0).unwrap()[0], 1.0);
    }

    #[test]
    fn retuned_hum_is_heard_at_the_new_frequency() {
        let mut config = AudioConfig::offline();
        config.fade_ms = 0;
        config.analyser_size = 8820;
        let service = SoundService::new(config);
        let id = service.start_ambient("hum", AmbientParams::default()).unwrap();
        let analyser = service.analyser().unwrap();

        service.render_offline(22_050);
        let before = analyser.band_levels(&[60.0, 120.0]);
        assert!(before[0] > 4.0 * before[1], "before {before:?}");

        assert!(service.update_sound(id, &SoundPatch::frequency(120.0)));
        service.render_offline(22_050);
        let after = analyser.band_levels(&[60.0, 120.0]);
        assert!(after[1] > 4.0 * after[0], "after {after:?}");
        assert_eq!(service.get_all_active_sounds()[0].frequency, Some(120.0));
    }

    #[test]
    fn start_ambient_without_audio_renders_nothing() {
        let service = SoundService::new(AudioConfig::disabled());
        assert!(service.start_ambient("hum", AmbientParams::default()).is_none());
        assert!(service.get_all_active_sounds().is_empty());
    }

    #[test]
    fn start_ambient_registers_buffer_loop() {
        let service = SoundService::new(AudioConfig::offline());
        service.start_ambient("hum", AmbientParams::default()).unwrap();
        service.start_ambient("wind", AmbientParams::default()).unwrap();

        let sounds = service.sounds_by_category(Category::Ambient);
        assert_eq!(sounds.len(), 2);
        assert!(sounds.iter().all(|h| h.kind == SoundKind::BufferLoop));
        assert_eq!(sounds[0].frequency, Some(60.0));
        assert_eq!(sounds[1].frequency, None);

        assert!(service.stop_ambient("hum"));
        assert!(!service.stop_ambient("hum"));
        assert!(service.start_ambient("fog", AmbientParams::default()).is_none());
    }
}
