//! The sound service: one instance per application, shared as
//! `Rc<SoundService>` with every panel that plays or lists sounds.
//!
//! It owns the registry and, once `initialize` has run, the audio graph. When
//! no audio is available the registry keeps working and every playback call
//! becomes a no-op.

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use super::analyser::Analyser;
use super::events::{Handler, SoundEvent, SoundEventKind};
use super::graph::AudioGraph;
use super::registry::SoundRegistry;
use super::sound::{Category, SoundDescriptor, SoundHandle, SoundId, SoundPatch};
use super::voice::Generator;
use super::{AudioConfig, MixerVolumes};

/// Per-key playback state of a helper-managed sound.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Starting,
    Playing,
}

#[derive(Copy, Clone, Debug)]
enum Slot {
    Starting,
    Playing(SoundId),
}

/// Logical key → registry id for helper-started sounds. The voice itself is
/// owned by the registry entry.
#[derive(Default)]
struct VoiceBank {
    slots: RefCell<HashMap<(Category, String), Slot>>,
}

impl VoiceBank {
    fn get(&self, category: Category, key: &str) -> Option<Slot> {
        self.slots.borrow().get(&(category, key.to_string())).copied()
    }

    fn set(&self, category: Category, key: &str, slot: Slot) {
        self.slots.borrow_mut().insert((category, key.to_string()), slot);
    }

    fn take(&self, category: Category, key: &str) -> Option<Slot> {
        self.slots.borrow_mut().remove(&(category, key.to_string()))
    }

    fn clear(&self) {
        self.slots.borrow_mut().clear();
    }
}

pub struct SoundService {
    config: AudioConfig,
    graph: OnceCell<Option<AudioGraph>>,
    registry: SoundRegistry,
    voices: VoiceBank,
    master_volume: Cell<f32>,
    muted: Cell<bool>,
    mixer_volumes: Cell<MixerVolumes>,
}

impl SoundService {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            master_volume: Cell::new(config.master_volume.clamp(0.0, 1.0)),
            muted: Cell::new(false),
            mixer_volumes: Cell::new(config.mixers),
            config,
            graph: OnceCell::new(),
            registry: SoundRegistry::new(),
            voices: VoiceBank::default(),
        }
    }

    pub fn shared(config: AudioConfig) -> Rc<Self> {
        Rc::new(Self::new(config))
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Open the audio graph on first call. Later calls return the outcome of
    /// the first one; a failure is logged once and never retried.
    pub fn initialize(&self) -> bool {
        self.graph().is_some()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.graph.get(), Some(Some(_)))
    }

    pub(crate) fn graph(&self) -> Option<&AudioGraph> {
        self.graph
            .get_or_init(|| {
                let mut config = self.config.clone();
                config.master_volume = self.master_volume.get();
                config.mixers = self.mixer_volumes.get();
                match AudioGraph::open(&config) {
                    Ok(graph) => {
                        graph.master().set_muted(self.muted.get());
                        Some(graph)
                    }
                    Err(err) => {
                        log::warn!("audio unavailable, sounds will be silent: {err}");
                        None
                    }
                }
            })
            .as_ref()
    }

    // ---------- registry ----------

    pub fn registry(&self) -> &SoundRegistry {
        &self.registry
    }

    pub fn register_sound(&self, descriptor: SoundDescriptor) -> SoundId {
        self.registry.register_sound(descriptor)
    }

    pub fn update_sound(&self, id: SoundId, patch: &SoundPatch) -> bool {
        self.registry.update_sound(id, patch)
    }

    pub fn stop_sound(&self, id: SoundId) -> bool {
        self.registry.stop_sound(id)
    }

    pub fn stop_by_source(&self, source: &str) -> usize {
        self.registry.stop_by_source(source)
    }

    /// Global reset: stop every sound and forget all helper bookkeeping.
    pub fn stop_all(&self) -> usize {
        let stopped = self.registry.stop_all();
        self.voices.clear();
        if stopped > 0 {
            log::info!("stopped all {stopped} sounds");
        }
        stopped
    }

    pub fn get_all_active_sounds(&self) -> Vec<SoundHandle> {
        self.registry.get_all_active_sounds()
    }

    pub fn sounds_by_category(&self, category: Category) -> Vec<SoundHandle> {
        self.registry.sounds_by_category(category)
    }

    pub fn sounds_by_source(&self, source: &str) -> Vec<SoundHandle> {
        self.registry.sounds_by_source(source)
    }

    pub fn on(&self, kind: SoundEventKind, handler: Handler<SoundEvent>) {
        self.registry.events().on(kind, handler);
    }

    pub fn off(&self, kind: SoundEventKind, handler: &Handler<SoundEvent>) -> bool {
        self.registry.events().off(kind, handler)
    }

    // ---------- master controls ----------

    pub fn set_master_volume(&self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.master_volume.set(volume);
        if let Some(Some(graph)) = self.graph.get() {
            graph.master().set_volume(volume);
        }
        log::debug!("master volume {:.0}%", volume * 100.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume.get()
    }

    /// Flip mute and return the new state.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.muted.get();
        self.muted.set(muted);
        if let Some(Some(graph)) = self.graph.get() {
            graph.master().set_muted(muted);
        }
        log::info!("audio {}", if muted { "muted" } else { "unmuted" });
        muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted.get()
    }

    pub fn set_category_volume(&self, category: Category, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        let mut volumes = self.mixer_volumes.get();
        match category {
            Category::Core => volumes.core = volume,
            Category::Ambient => volumes.ambient = volume,
            Category::Binaural => volumes.binaural = volume,
            Category::Events => volumes.events = volume,
        }
        self.mixer_volumes.set(volumes);
        if let Some(Some(graph)) = self.graph.get() {
            graph.mixer(category).set_gain(volume);
        }
    }

    pub fn category_volume(&self, category: Category) -> f32 {
        self.mixer_volumes.get().get(category)
    }

    pub fn analyser(&self) -> Option<Arc<Analyser>> {
        self.graph.get()?.as_ref().map(AudioGraph::analyser)
    }

    /// Pull frames from an offline graph; `None` for device output or when
    /// audio is unavailable.
    pub fn render_offline(&self, frames: usize) -> Option<Vec<[f32; 2]>> {
        self.graph()?.render_offline(frames)
    }

    // ---------- helper plumbing ----------

    pub fn playback_state(&self, category: Category, key: &str) -> PlaybackState {
        match self.voices.get(category, key) {
            Some(Slot::Starting) => PlaybackState::Starting,
            Some(Slot::Playing(id)) if self.registry.contains(id) => PlaybackState::Playing,
            _ => PlaybackState::Stopped,
        }
    }

    /// Connect `generator` through the category mixer, register it and record
    /// it under `key`. A key that is already playing is restarted.
    pub(crate) fn start_voice(
        &self,
        key: &str,
        descriptor: SoundDescriptor,
        generator: Box<dyn Generator>,
    ) -> Option<SoundId> {
        let graph = self.graph()?;
        let category = descriptor.voice.category();

        if let Some(Slot::Playing(old)) = self.voices.take(category, key) {
            if self.registry.stop_sound(old) {
                log::info!("restarting {category} '{key}'");
            }
        }

        self.voices.set(category, key, Slot::Starting);
        let frequency = descriptor.voice.frequency().unwrap_or(0.0);
        let Some(voice) = graph.connect(category, generator, descriptor.info.volume, frequency)
        else {
            self.voices.take(category, key);
            return None;
        };
        let id = self.registry.register_voice(descriptor, voice);

        // A registered handler may have stopped or restarted the key.
        if !matches!(self.voices.get(category, key), Some(Slot::Starting)) {
            log::debug!("{category} '{key}' was stopped while starting");
            self.registry.stop_sound(id);
            return None;
        }
        self.voices.set(category, key, Slot::Playing(id));
        log::info!("started {category} '{key}' as {id}");
        Some(id)
    }

    /// Stop the sound under `key`. A key that is still starting is cancelled;
    /// `start_voice` stops the entry once registration returns.
    pub(crate) fn stop_voice(&self, category: Category, key: &str) -> bool {
        match self.voices.take(category, key) {
            Some(Slot::Playing(id)) => self.registry.stop_sound(id),
            Some(Slot::Starting) => true,
            None => {
                log::debug!("{category} '{key}' is not playing");
                false
            }
        }
    }
}
