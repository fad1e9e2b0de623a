//! strangewave demo player.
//!
//! ```bash
//! strangewave --schumann schumann,schumann-2 --binaural theta --seconds 10
//! strangewave --ambient hum,wind --offline
//! ```

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use strangewave::audio::helpers::{ambient, binaural, schumann};
use strangewave::panel;
use strangewave::{
    AmbientParams, AudioBackend, BinauralParams, Config, SchumannParams, SoundEvent,
    SoundEventKind, SoundService,
};

/// Bands reported at the end of a run, in rendered Hz.
const REPORT_BANDS: [(&str, f32); 5] = [
    ("hum", 60.0),
    ("schumann", 125.28),
    ("carrier", 200.0),
    ("ping", 880.0),
    ("reveal", 1320.0),
];

#[derive(Parser)]
#[command(name = "strangewave")]
#[command(author, version, about = "Schumann drones, binaural beats and ambient loops")]
struct Args {
    /// Config file (default: strangewave.toml in the cwd)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Schumann modes to start
    #[arg(long, value_delimiter = ',')]
    schumann: Vec<String>,

    /// Binaural bands to start (delta, theta, alpha, beta, gamma)
    #[arg(long, value_delimiter = ',')]
    binaural: Vec<String>,

    /// Ambient loops to start (hum, wind, static, void)
    #[arg(long, value_delimiter = ',')]
    ambient: Vec<String>,

    /// Chime played once everything has started
    #[arg(long)]
    chime: Option<String>,

    /// Master volume override, 0.0 to 1.0
    #[arg(long)]
    volume: Option<f32>,

    /// How long to play, at most one hour
    #[arg(long, short = 's', default_value = "5", value_parser = parse_seconds)]
    seconds: f32,

    /// Render without opening an output device
    #[arg(long)]
    offline: bool,

    /// List preset keys and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        println!("schumann: {}", schumann::schumann_keys().join(", "));
        println!("binaural: {}", binaural::binaural_keys().join(", "));
        println!("ambient:  {}", ambient::ambient_keys().join(", "));
        println!("chimes:   ping, alert, reveal");
        return;
    }

    let mut config = Config::load(args.config.as_deref());
    if args.offline {
        config.audio.backend = AudioBackend::Offline;
    }
    let sample_rate = config.audio.sample_rate;
    let service = SoundService::shared(config.audio);

    if !service.initialize() {
        log::warn!("running without audio output");
    }
    if let Some(volume) = args.volume {
        service.set_master_volume(volume);
    }

    subscribe_panel(&service);

    for key in &args.schumann {
        service.start_schumann(key, SchumannParams::default());
    }
    for key in &args.binaural {
        service.start_binaural(key, BinauralParams::default());
    }
    for key in &args.ambient {
        service.start_ambient(key, AmbientParams::default());
    }
    if let Some(key) = &args.chime {
        service.play_chime(key, 0.8);
    }

    let seconds = args.seconds;
    if args.offline {
        let frames = (seconds * sample_rate as f32) as usize;
        if service.render_offline(frames).is_some() {
            log::info!("rendered {frames} frames offline");
        }
    } else {
        thread::sleep(Duration::from_secs_f32(seconds));
    }

    report_levels(&service);
    let stopped = service.stop_all();
    log::info!("stopped {stopped} sounds");
}

const MAX_SECONDS: f32 = 3600.0;

fn parse_seconds(s: &str) -> Result<f32, String> {
    let seconds: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if seconds.is_finite() && (0.0..=MAX_SECONDS).contains(&seconds) {
        Ok(seconds)
    } else {
        Err(format!("expected 0 to {MAX_SECONDS} seconds"))
    }
}

/// Reprint the panel whenever the set of active sounds changes.
fn subscribe_panel(service: &Rc<SoundService>) {
    let weak = Rc::downgrade(service);
    let print = Rc::new(move |event: &SoundEvent| {
        let Some(service) = weak.upgrade() else {
            return;
        };
        println!("-- {} --", event.id());
        print!("{}", panel::render(&service.get_all_active_sounds()));
    });
    service.on(SoundEventKind::SoundRegistered, print.clone());
    service.on(SoundEventKind::SoundUnregistered, print);
}

fn report_levels(service: &SoundService) {
    let Some(analyser) = service.analyser() else {
        return;
    };
    let rms = analyser.rms();
    println!("rms  {:.3} {}", rms, panel::meter(rms, 32));
    println!("peak {:.3}", analyser.peak());

    let frequencies: Vec<f32> = REPORT_BANDS.iter().map(|(_, f)| *f).collect();
    for ((label, freq), level) in REPORT_BANDS.iter().zip(analyser.band_levels(&frequencies)) {
        println!("  {label:<9} {freq:>8.2} Hz  {level:.3} {}", panel::meter(level, 20));
    }
}
