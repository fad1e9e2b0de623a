//! Text control panel: what is currently playing, grouped by category.

use std::fmt::Write;

use crate::audio::{Category, SoundHandle};

/// Render handles grouped by category, categories in fixed order and sounds
/// in the order given.
pub fn render(sounds: &[SoundHandle]) -> String {
    if sounds.is_empty() {
        return "  (silence)\n".to_string();
    }

    let mut out = String::new();
    for category in Category::ALL {
        let group: Vec<&SoundHandle> = sounds.iter().filter(|h| h.category == category).collect();
        if group.is_empty() {
            continue;
        }
        let _ = writeln!(out, "[{category}]");
        for h in group {
            let freq = match h.frequency {
                Some(f) => format!("{f:.2} Hz"),
                None => "-".to_string(),
            };
            let _ = writeln!(
                out,
                "  {:<10} {:>10}  vol {:>3.0}%  {:<14} {}",
                h.name,
                freq,
                h.volume * 100.0,
                h.kind.name(),
                h.source,
            );
        }
    }
    out
}

/// One-line meter for the analyser's RMS level.
pub fn meter(level: f32, width: usize) -> String {
    let filled = ((level.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SoundDescriptor, SoundRegistry};

    #[test]
    fn empty_panel() {
        assert_eq!(render(&[]), "  (silence)\n");
    }

    #[test]
    fn groups_by_category_in_fixed_order() {
        let registry = SoundRegistry::new();
        registry.register_sound(SoundDescriptor::binaural("theta", 200.0, 6.0).source("globe"));
        registry.register_sound(SoundDescriptor::core("schumann", 7.83).volume(0.5));
        registry.register_sound(SoundDescriptor::ambient("wind", None));

        let text = render(&registry.get_all_active_sounds());
        let core = text.find("[core]").unwrap();
        let ambient = text.find("[ambient]").unwrap();
        let binaural = text.find("[binaural]").unwrap();
        assert!(core < ambient && ambient < binaural);
        assert!(text.contains("7.83 Hz"));
        assert!(text.contains("vol  50%"));
        assert!(text.contains("globe"));
        assert!(!text.contains("[events]"));
    }

    #[test]
    fn meter_clamps() {
        assert_eq!(meter(0.5, 4), "[##  ]");
        assert_eq!(meter(3.0, 4), "[####]");
        assert_eq!(meter(-1.0, 2), "[  ]");
    }
}
