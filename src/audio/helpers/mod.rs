//! Preset-keyed playback helpers.
//!
//! Each helper adds `start_*`/`stop_*` methods to `SoundService`. A start
//! initializes audio if needed, builds the generator, routes it through its
//! category mixer and registers it under the preset key.

pub mod schumann;
pub mod binaural;
pub mod ambient;
pub mod chime;

/// Source tag used when the caller does not provide one.
pub const DEFAULT_SOURCE: &str = "strangewave";

fn source_or_default(source: &str) -> &str {
    if source.is_empty() {
        DEFAULT_SOURCE
    } else {
        source
    }
}
