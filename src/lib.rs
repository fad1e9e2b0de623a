//! strangewave: sound registry and mixing service.
//!
//! Every sound that plays is registered with a [`SoundService`], which keeps
//! the list of active sounds, broadcasts lifecycle events and routes each
//! voice through a per-category mixer into one master gain.
//!
//! Output goes to the default device through `rodio`, or is pulled
//! synchronously with the `offline` backend.
//!
//! # Example
//! ```
//! use strangewave::{AudioConfig, SchumannParams, SoundService};
//!
//! let service = SoundService::new(AudioConfig::offline());
//! let id = service.start_schumann("schumann", SchumannParams::default()).unwrap();
//! assert_eq!(service.get_all_active_sounds()[0].id, id);
//! assert!(service.stop_sound(id));
//! ```

pub mod audio;
pub mod config;
pub mod panel;

// Main exports
pub use audio::{
    AmbientParams, AudioConfig, BinauralParams, Category, SchumannParams, SoundDescriptor,
    SoundEvent, SoundEventKind, SoundHandle, SoundId, SoundPatch, SoundService,
};
pub use config::{AudioBackend, Config};
