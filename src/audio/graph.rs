//! Audio graph bootstrap: output, master gain, analyser and category mixers.
//!
//! Only this module creates the shared nodes. Everything else connects voices
//! to them or adjusts their gain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait};
use crossbeam_channel::{unbounded, Sender};
use rodio::{OutputStream, Sink};

use super::analyser::Analyser;
use super::bus::{BusCommand, MasterBus, MasterGain, MixerGain, RenderVoice};
use super::sound::Category;
use super::voice::{ActiveVoice, Generator, VoiceControl};
use super::{AudioConfig, MixerVolumes};
use crate::config::AudioBackend;

pub const MIN_SAMPLE_RATE: u32 = 8_000;
pub const MAX_SAMPLE_RATE: u32 = 192_000;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio is disabled by configuration")]
    Disabled,
    #[error("sample rate {0} Hz is outside 8000..=192000 Hz")]
    SampleRate(u32),
    #[error("no audio output device available")]
    NoOutputDevice,
    #[error("failed to open output stream: {0}")]
    Stream(#[from] rodio::StreamError),
    #[error("failed to create output sink: {0}")]
    Play(#[from] rodio::PlayError),
}

enum Output {
    Device {
        name: String,
        // Dropping the stream closes the device.
        _stream: OutputStream,
        _sink: Sink,
    },
    Offline(RefCell<MasterBus>),
}

pub struct AudioGraph {
    sample_rate: u32,
    fade_frames: u32,
    master: Arc<MasterGain>,
    analyser: Arc<Analyser>,
    mixers: RefCell<HashMap<Category, Arc<MixerGain>>>,
    mixer_defaults: MixerVolumes,
    commands: Sender<BusCommand>,
    output: Output,
}

impl AudioGraph {
    /// Build the graph for the configured backend.
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        if !config.audio_available() {
            return Err(AudioError::Disabled);
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate) {
            return Err(AudioError::SampleRate(config.sample_rate));
        }

        let master = Arc::new(MasterGain::new(config.master_volume));
        let analyser = Arc::new(Analyser::new(config.analyser_size, config.sample_rate));
        let (commands, receiver) = unbounded();
        let bus = MasterBus::new(config.sample_rate, receiver, master.clone(), analyser.clone());

        let output = match config.backend {
            AudioBackend::Offline => Output::Offline(RefCell::new(bus)),
            AudioBackend::Device => open_device(bus)?,
            AudioBackend::Disabled => return Err(AudioError::Disabled),
        };

        match &output {
            Output::Device { name, .. } => log::info!(
                "audio graph on '{name}' at {} Hz, master {:.0}%",
                config.sample_rate,
                master.volume() * 100.0
            ),
            Output::Offline(_) => log::info!("offline audio graph at {} Hz", config.sample_rate),
        }

        Ok(Self {
            sample_rate: config.sample_rate,
            fade_frames: config.fade_frames(),
            master,
            analyser,
            mixers: RefCell::new(HashMap::new()),
            mixer_defaults: config.mixers,
            commands,
            output,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn master(&self) -> &MasterGain {
        &self.master
    }

    pub fn analyser(&self) -> Arc<Analyser> {
        self.analyser.clone()
    }

    /// Mixer for `category`, created on first use.
    pub fn mixer(&self, category: Category) -> Arc<MixerGain> {
        self.mixers
            .borrow_mut()
            .entry(category)
            .or_insert_with(|| {
                log::debug!("creating {category} mixer");
                Arc::new(MixerGain::new(self.mixer_defaults.get(category)))
            })
            .clone()
    }

    pub fn mixer_count(&self) -> usize {
        self.mixers.borrow().len()
    }

    /// Route `generator` through the category mixer into the master gain and
    /// start it immediately.
    pub fn connect(
        &self,
        category: Category,
        generator: Box<dyn Generator>,
        volume: f32,
        frequency: f32,
    ) -> Option<ActiveVoice> {
        let control = Arc::new(VoiceControl::new(volume, frequency));
        let voice = RenderVoice::new(generator, control.clone(), self.mixer(category), self.fade_frames);
        if self.commands.send(BusCommand::Attach(voice)).is_err() {
            log::warn!("render bus is gone, dropping {category} voice");
            return None;
        }
        Some(ActiveVoice::new(control))
    }

    /// Pull `frames` stereo frames from an offline graph. `None` when the graph
    /// renders to a device.
    pub fn render_offline(&self, frames: usize) -> Option<Vec<[f32; 2]>> {
        match &self.output {
            Output::Offline(bus) => {
                let mut bus = bus.borrow_mut();
                Some((0..frames).map(|_| bus.next_frame()).collect())
            }
            Output::Device { .. } => None,
        }
    }
}

fn open_device(bus: MasterBus) -> Result<Output, AudioError> {
    let device = cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoOutputDevice)?;
    let name = device.name().unwrap_or_else(|_| "default".to_string());

    let (stream, handle) = OutputStream::try_from_device(&device)?;
    let sink = Sink::try_new(&handle)?;
    sink.append(bus);
    Ok(Output::Device {
        name,
        _stream: stream,
        _sink: sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tone(f32);

    impl Generator for Tone {
        fn frame(&mut self, _: &VoiceControl, _: f32) -> Option<[f32; 2]> {
            Some([self.0, self.0])
        }
    }

    #[test]
    fn disabled_config_does_not_open() {
        let err = AudioGraph::open(&AudioConfig::disabled()).err();
        assert!(matches!(err, Some(AudioError::Disabled)));
    }

    #[test]
    fn out_of_range_sample_rate_does_not_open() {
        let mut config = AudioConfig::offline();
        config.sample_rate = 0;
        let err = AudioGraph::open(&config).err();
        assert!(matches!(err, Some(AudioError::SampleRate(0))));

        config.sample_rate = MIN_SAMPLE_RATE;
        let graph = AudioGraph::open(&config).unwrap();
        assert_eq!(graph.sample_rate(), MIN_SAMPLE_RATE);
    }

    #[test]
    fn mixers_are_created_once_and_cached() {
        let graph = AudioGraph::open(&AudioConfig::offline()).unwrap();
        assert_eq!(graph.mixer_count(), 0);
        let a = graph.mixer(Category::Ambient);
        let b = graph.mixer(Category::Ambient);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(graph.mixer_count(), 1);
        assert!((a.gain() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn connected_voice_is_heard_offline() {
        let mut config = AudioConfig::offline();
        config.fade_ms = 0;
        config.master_volume = 1.0;
        let graph = AudioGraph::open(&config).unwrap();
        let voice = graph.connect(Category::Core, Box::new(Tone(0.5)), 1.0, 0.0).unwrap();

        let frames = graph.render_offline(2).unwrap();
        assert!((frames[1][0] - 0.5).abs() < 1e-6);

        let control = voice.control().clone();
        voice.stop();
        graph.render_offline(1);
        assert!(control.is_finished());
    }
}
