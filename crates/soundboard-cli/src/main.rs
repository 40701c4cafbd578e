//! Libre Soundboard - headless player
//!
//! Plays WAV files through the soundboard core and, with `--keep-alive`,
//! stays running to replay a sound whenever the input has been silent for
//! the configured timeout.
//!
//! ## Usage
//!
//! ```text
//! soundboard [--config PATH] [--keep-alive FILE] [--list-outputs] [FILE...]
//! ```
//!
//! Set RUST_LOG=debug for verbose output.

mod cli;
mod wav;

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use soundboard_core::audio::{get_available_stereo_pairs, start_audio_system, AudioSystem};
use soundboard_core::config::{default_config_path, load_config, SoundboardConfig};

use cli::Cli;
use wav::{decode_wav, DecodedWav};

/// Voice id used for keep-alive playback (restarts instead of stacking)
const KEEP_ALIVE_ID: &str = "keep-alive";

/// Control-plane polling interval
const POLL_INTERVAL: Duration = Duration::from_millis(50);

fn main() -> Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Cli::parse();

    if args.list_outputs {
        for pair in get_available_stereo_pairs() {
            println!("{}\t{}\t{}", pair.label, pair.left, pair.right);
        }
        if !args.wants_playback() {
            return Ok(());
        }
    }

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let mut config: SoundboardConfig = load_config(&config_path);
    if args.keep_alive.is_none() {
        config.keep_alive.enabled = false;
    }

    // Decode everything before touching the audio server
    let clips = args
        .files
        .iter()
        .map(|path| decode_wav(path).map(|wav| (path.display().to_string(), wav)))
        .collect::<Result<Vec<_>>>()?;
    let keep_alive_clip = args.keep_alive.as_deref().map(decode_wav).transpose()?;

    log::info!("soundboard starting up (client '{}')", config.client_name);
    let mut system = start_audio_system(&config).context("Failed to start audio")?;

    for (id, clip) in &clips {
        play(&system, id, clip, None)?;
    }

    match keep_alive_clip {
        Some(clip) => run_keep_alive(&mut system, &config, &clip),
        None => {
            wait_until_finished(&system, clips.iter().map(|(id, _)| id.as_str()));
            Ok(())
        }
    }
}

fn play(system: &AudioSystem, id: &str, clip: &DecodedWav, gain: Option<f32>) -> Result<()> {
    let outcome = system
        .soundboard
        .play(clip.samples.clone(), clip.sample_rate, clip.channels, Some(id), gain)
        .with_context(|| format!("Failed to play {}", id))?;
    log::info!("{:?} {}", outcome, id);
    Ok(())
}

/// Block until every voice in `ids` has played to its end
fn wait_until_finished<'a>(system: &AudioSystem, ids: impl Iterator<Item = &'a str> + Clone) {
    loop {
        let done = ids.clone().all(|id| {
            let info = system.soundboard.playback_info(id);
            !info.found || info.current_frame >= info.total_frames
        });
        if done {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    // Let the last buffer reach the device
    std::thread::sleep(Duration::from_secs_f32(system.latency_ms / 1000.0) + POLL_INTERVAL);
    log::info!("Playback finished");
}

/// Replay `clip` on every keep-alive trigger, forever
fn run_keep_alive(
    system: &mut AudioSystem,
    config: &SoundboardConfig,
    clip: &DecodedWav,
) -> Result<()> {
    if system.keep_alive_events.is_none() {
        bail!("Keep-alive requested but the audio host has no input");
    }
    log::info!(
        "Keep-alive armed: replaying after {}s of silence",
        config.keep_alive.timeout_seconds
    );

    let gain = config.keep_alive.override_volume;
    loop {
        let latest = system
            .keep_alive_events
            .as_mut()
            .and_then(|events| events.drain_latest());

        if let Some(event) = latest {
            log::info!(
                "Keep-alive trigger #{} after {:.1}s of silence",
                event.sequence,
                event.silence.as_secs_f64()
            );
            play(system, KEEP_ALIVE_ID, clip, gain)?;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}
