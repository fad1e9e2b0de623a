// Sound registry, event bus and the mixing graph behind them
pub mod sound;
pub mod events;
pub mod registry;
pub mod voice;
pub mod analyser;
pub mod bus;
pub mod graph;
pub mod service;
pub mod helpers;

use serde::Deserialize;

use crate::config::AudioBackend;

pub use sound::{
    Category, SoundDescriptor, SoundHandle, SoundId, SoundInfo, SoundKind, SoundPatch, VoiceSpec,
};
pub use events::{BusEvent, EventBus, Handler, SoundEvent, SoundEventKind};
pub use registry::SoundRegistry;
pub use voice::{ActiveVoice, Generator, VoiceControl};
pub use analyser::Analyser;
pub use graph::{AudioError, AudioGraph};
pub use service::{PlaybackState, SoundService};
pub use helpers::{
    ambient::AmbientParams, binaural::BinauralParams, schumann::SchumannParams,
};

/// Audio configuration, the `[audio]` table of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    pub backend: AudioBackend,
    /// Master gain applied after the category mixers (0.0 to 1.0).
    pub master_volume: f32,
    pub sample_rate: u32,
    /// Linear ramp applied when a voice starts or stops.
    pub fade_ms: u32,
    /// Number of mono samples kept by the analyser.
    pub analyser_size: usize,
    /// Octaves the Schumann drones are shifted up by before rendering.
    pub schumann_octave_shift: u32,
    /// Default carrier for binaural pairs, in Hz.
    pub binaural_carrier: f32,
    pub mixers: MixerVolumes,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: AudioBackend::Device,
            master_volume: 0.7,
            sample_rate: 44_100,
            fade_ms: 30,
            analyser_size: 2048,
            schumann_octave_shift: 4,
            binaural_carrier: 200.0,
            mixers: MixerVolumes::default(),
        }
    }
}

impl AudioConfig {
    /// Config for rendering without a device.
    pub fn offline() -> Self {
        Self {
            backend: AudioBackend::Offline,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            backend: AudioBackend::Disabled,
            ..Default::default()
        }
    }

    pub fn audio_available(&self) -> bool {
        self.enabled && self.backend != AudioBackend::Disabled
    }

    pub fn fade_frames(&self) -> u32 {
        (self.sample_rate as u64 * self.fade_ms as u64 / 1000) as u32
    }
}

/// Initial gain of each category mixer.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MixerVolumes {
    pub core: f32,
    pub ambient: f32,
    pub binaural: f32,
    pub events: f32,
}

impl Default for MixerVolumes {
    fn default() -> Self {
        Self {
            core: 1.0,
            ambient: 0.6,
            binaural: 0.8,
            events: 0.9,
        }
    }
}

impl MixerVolumes {
    pub fn get(&self, category: Category) -> f32 {
        match category {
            Category::Core => self.core,
            Category::Ambient => self.ambient,
            Category::Binaural => self.binaural,
            Category::Events => self.events,
        }
    }
}
