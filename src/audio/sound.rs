//! Sound handles and the descriptors used to register them.

use std::collections::BTreeMap;
use std::fmt;

/// Registry identifier, unique for the lifetime of a `SoundRegistry`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundId(pub(crate) u64);

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "snd-{}", self.0)
    }
}

/// Mixer group a sound is routed through.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Core,
    Ambient,
    Binaural,
    Events,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Core,
        Category::Ambient,
        Category::Binaural,
        Category::Events,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Core => "core",
            Category::Ambient => "ambient",
            Category::Binaural => "binaural",
            Category::Events => "events",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Underlying generator kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SoundKind {
    Oscillator,
    BufferLoop,
    BinauralPair,
}

impl SoundKind {
    pub fn name(&self) -> &'static str {
        match self {
            SoundKind::Oscillator => "oscillator",
            SoundKind::BufferLoop => "buffer-loop",
            SoundKind::BinauralPair => "binaural-pair",
        }
    }
}

/// One active audio-producing unit as seen by consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundHandle {
    pub id: SoundId,
    pub name: String,
    pub category: Category,
    pub kind: SoundKind,
    /// Nominal frequency in Hz, `None` for non-tonal sources.
    pub frequency: Option<f32>,
    pub volume: f32,
    /// Which panel or module started the sound.
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

/// Fields shared by every descriptor variant.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundInfo {
    pub name: String,
    pub volume: f32,
    pub source: String,
    pub metadata: BTreeMap<String, String>,
}

impl SoundInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume: 1.0,
            source: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Category-specific part of a descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum VoiceSpec {
    Core { frequency: f32 },
    Ambient { frequency: Option<f32> },
    Binaural { carrier: f32, beat: f32 },
    Event { frequency: Option<f32> },
}

impl VoiceSpec {
    pub fn category(&self) -> Category {
        match self {
            VoiceSpec::Core { .. } => Category::Core,
            VoiceSpec::Ambient { .. } => Category::Ambient,
            VoiceSpec::Binaural { .. } => Category::Binaural,
            VoiceSpec::Event { .. } => Category::Events,
        }
    }

    pub fn kind(&self) -> SoundKind {
        match self {
            VoiceSpec::Core { .. } | VoiceSpec::Event { .. } => SoundKind::Oscillator,
            VoiceSpec::Ambient { .. } => SoundKind::BufferLoop,
            VoiceSpec::Binaural { .. } => SoundKind::BinauralPair,
        }
    }

    /// The binaural beat is the perceived frequency, so it is the nominal one.
    pub fn frequency(&self) -> Option<f32> {
        match *self {
            VoiceSpec::Core { frequency } => Some(frequency),
            VoiceSpec::Ambient { frequency } | VoiceSpec::Event { frequency } => frequency,
            VoiceSpec::Binaural { beat, .. } => Some(beat),
        }
    }
}

/// Registration input: a `SoundHandle` without its id.
#[derive(Clone, Debug, PartialEq)]
pub struct SoundDescriptor {
    pub info: SoundInfo,
    pub voice: VoiceSpec,
}

impl SoundDescriptor {
    pub fn new(info: SoundInfo, voice: VoiceSpec) -> Self {
        Self { info, voice }
    }

    pub fn core(name: impl Into<String>, frequency: f32) -> Self {
        Self::new(SoundInfo::new(name), VoiceSpec::Core { frequency })
    }

    pub fn ambient(name: impl Into<String>, frequency: Option<f32>) -> Self {
        Self::new(SoundInfo::new(name), VoiceSpec::Ambient { frequency })
    }

    pub fn binaural(name: impl Into<String>, carrier: f32, beat: f32) -> Self {
        Self::new(SoundInfo::new(name), VoiceSpec::Binaural { carrier, beat })
    }

    pub fn event(name: impl Into<String>, frequency: Option<f32>) -> Self {
        Self::new(SoundInfo::new(name), VoiceSpec::Event { frequency })
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.info.volume = volume;
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.info.source = source.into();
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.info.metadata.insert(key.into(), value.to_string());
        self
    }

    pub(crate) fn into_handle(self, id: SoundId) -> SoundHandle {
        let mut metadata = self.info.metadata;
        if let VoiceSpec::Binaural { carrier, .. } = self.voice {
            metadata
                .entry("carrier".to_string())
                .or_insert_with(|| format!("{carrier}"));
        }
        SoundHandle {
            id,
            name: self.info.name,
            category: self.voice.category(),
            kind: self.voice.kind(),
            frequency: self.voice.frequency(),
            volume: self.info.volume.clamp(0.0, 1.0),
            source: self.info.source,
            metadata,
        }
    }
}

/// Partial update merged into a stored handle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundPatch {
    pub name: Option<String>,
    pub frequency: Option<f32>,
    pub volume: Option<f32>,
    pub metadata: BTreeMap<String, String>,
}

impl SoundPatch {
    pub fn frequency(frequency: f32) -> Self {
        Self {
            frequency: Some(frequency),
            ..Default::default()
        }
    }

    pub fn volume(volume: f32) -> Self {
        Self {
            volume: Some(volume),
            ..Default::default()
        }
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }

    pub(crate) fn apply(&self, handle: &mut SoundHandle) {
        if let Some(name) = &self.name {
            handle.name = name.clone();
        }
        if let Some(frequency) = self.frequency {
            handle.frequency = Some(frequency);
        }
        if let Some(volume) = self.volume {
            handle.volume = volume.clamp(0.0, 1.0);
        }
        for (key, value) in &self.metadata {
            handle.metadata.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binaural_descriptor_uses_beat_as_nominal_frequency() {
        let handle = SoundDescriptor::binaural("theta", 200.0, 6.0).into_handle(SoundId(1));
        assert_eq!(handle.category, Category::Binaural);
        assert_eq!(handle.kind, SoundKind::BinauralPair);
        assert_eq!(handle.frequency, Some(6.0));
        assert_eq!(handle.metadata.get("carrier").map(String::as_str), Some("200"));
    }

    #[test]
    fn volume_is_clamped() {
        let handle = SoundDescriptor::core("schumann", 7.83)
            .volume(3.0)
            .into_handle(SoundId(1));
        assert_eq!(handle.volume, 1.0);

        let mut handle = handle;
        SoundPatch::volume(-0.5).apply(&mut handle);
        assert_eq!(handle.volume, 0.0);
    }

    #[test]
    fn patch_merges_metadata() {
        let mut handle = SoundDescriptor::ambient("hum", Some(60.0))
            .meta("color", "#44ff88")
            .into_handle(SoundId(3));
        SoundPatch::default()
            .meta("band", "ELF")
            .with_name("mains hum")
            .apply(&mut handle);
        assert_eq!(handle.name, "mains hum");
        assert_eq!(handle.metadata.len(), 2);
        assert_eq!(handle.frequency, Some(60.0));
    }
}
