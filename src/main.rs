pub(crate) mod beat;
pub(crate) mod config;
pub(crate) mod ddp;
pub(crate) mod devices;
pub(crate) mod ease;
pub(crate) mod effects;
pub(crate) mod error;
pub(crate) mod gradient;
pub(crate) mod intervaltimer;
pub(crate) mod osc;
pub(crate) mod pixels;
pub(crate) mod renderer;
pub(crate) mod resolver;
pub(crate) mod transmitter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use anyhow::Context;
use clap::Parser;

use crate::beat::{BeatHandoff, Metronome};
use crate::config::Config;
use crate::devices::ddp::DdpDevice;
use crate::devices::{Device, DeviceState};
use crate::effects::bar::BarEffect;
use crate::osc::OscReceiver;
use crate::renderer::Renderer;
use crate::resolver::DnsResolver;

/// Rate at which the metronome publishes beat positions.
const BEAT_RATE_HZ: f32 = 200.0;

#[derive(Parser)]
struct Cli {
    /// Configuration file
    #[arg(short, long, value_name = "FILE", default_value = "ddpbeat.toml")]
    config: std::path::PathBuf,

    /// Tempo override in beats per minute
    #[arg(short, long)]
    bpm: Option<f32>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    let mut config = Config::load(&args.config)?;
    if let Some(bpm) = args.bpm {
        config.beat.bpm = bpm;
        config.validate()?;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("Cannot install Ctrl-C handler")?;
    }

    let mut device = DdpDevice::new(config.device.clone(), Arc::new(DnsResolver))?;
    if device.wait_for_resolution() == DeviceState::Unresolved {
        log::warn!(
            "Starting without a destination for {}, will keep retrying",
            device.name()
        );
    }

    let effect = BarEffect::new(config.effect.clone(), device.pixel_count())?;
    let beat = Arc::new(BeatHandoff::new());
    let (control_tx, control_rx) = mpsc::channel();

    if let Some(listen_addr) = config.osc.listen_addr {
        let mut osc_receiver = OscReceiver::new(listen_addr, config.effect.clone(), control_tx)?;
        thread::Builder::new()
            .name("OSC".to_string())
            .spawn(move || osc_receiver.run())
            .context("Failed to create OSC thread")?;
    }

    let metronome = Metronome::new(config.beat.bpm);
    let metronome_handoff = Arc::clone(&beat);
    let metronome_shutdown = Arc::clone(&shutdown);
    let metronome_thread = thread::Builder::new()
        .name("Metronome".to_string())
        .spawn(move || metronome.run(metronome_handoff, BEAT_RATE_HZ, metronome_shutdown))
        .context("Failed to create metronome thread")?;

    log::info!(
        "Playing bar effect at {} bpm on {} ({} pixels, {} fps)",
        config.beat.bpm,
        config.device.ip_address,
        config.device.pixel_count,
        config.device.refresh_rate
    );

    let mut renderer = Renderer::new(
        Box::new(device),
        effect,
        beat,
        control_rx,
        config.device.refresh_rate,
    );
    let render_shutdown = Arc::clone(&shutdown);
    let render_thread = thread::Builder::new()
        .name(format!("Render {}", config.device.name))
        .spawn(move || renderer.run(render_shutdown))
        .context("Failed to create render thread")?;

    // The OSC thread blocks on its socket and ends with the process.
    if render_thread.join().is_err() {
        anyhow::bail!("Render thread panicked");
    }
    if metronome_thread.join().is_err() {
        anyhow::bail!("Metronome thread panicked");
    }

    Ok(())
}
