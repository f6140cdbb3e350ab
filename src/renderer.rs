use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::beat::BeatHandoff;
use crate::devices::{Device, DeviceState};
use crate::effects::LightingEffect;
use crate::intervaltimer::IntervalTimer;

const ACTIVATION_RETRY: Duration = Duration::from_secs(1);

/// Changes requested while the render loop is running.
#[derive(Clone, Debug, PartialEq)]
pub enum Control<C> {
    /// Replace the effect settings.
    Effect(C),
    /// Send to a different host name or address.
    DeviceHost(String),
}

/// Drives one effect into one device at the device's refresh rate.
pub struct Renderer<E: LightingEffect> {
    device: Box<dyn Device + Send>,
    effect: E,
    beat: Arc<BeatHandoff>,
    control: Receiver<Control<E::Config>>,
    refresh_rate: u32,
    last_activation: Option<Instant>,
}

impl<E: LightingEffect> Renderer<E> {
    pub fn new(
        device: Box<dyn Device + Send>,
        effect: E,
        beat: Arc<BeatHandoff>,
        control: Receiver<Control<E::Config>>,
        refresh_rate: u32,
    ) -> Renderer<E> {
        Renderer {
            device,
            effect,
            beat,
            control,
            refresh_rate,
            last_activation: None,
        }
    }

    pub fn run(&mut self, shutdown: Arc<AtomicBool>) {
        // Created here so it picks up the render thread's name.
        let mut timer = IntervalTimer::new(self.refresh_rate as f32, true);

        while !shutdown.load(Ordering::Relaxed) {
            self.tick();
            timer.sleep_until_next_tick();
        }

        log::info!("Stopping output to {}", self.device.name());
        self.device.deactivate();
    }

    fn tick(&mut self) {
        self.apply_control();
        self.ensure_active();

        let beat = self.beat.latest();
        let pixels = self.effect.step(&beat);
        self.device.flush(pixels);
    }

    fn apply_control(&mut self) {
        while let Ok(control) = self.control.try_recv() {
            match control {
                Control::Effect(config) => {
                    if let Err(err) = self.effect.config_updated(config) {
                        log::warn!("Keeping previous effect settings: {}", err);
                    }
                }
                Control::DeviceHost(host) => self.retarget_device(host),
            }
        }
    }

    fn retarget_device(&mut self, host: String) {
        let mut config = self.device.config().clone();
        config.ip_address = host;

        match self.device.update_config(config) {
            Ok(()) => {
                log::info!(
                    "Device {} now sends to {}",
                    self.device.name(),
                    self.device.config().ip_address
                );
                // Reactivate as soon as the new host is known.
                self.last_activation = None;
            }
            Err(err) => log::warn!("Keeping previous device settings: {}", err),
        }
    }

    /// Retries activation, at most once per `ACTIVATION_RETRY`.
    fn ensure_active(&mut self) {
        match self.device.state() {
            DeviceState::Active | DeviceState::Resolving => return,
            DeviceState::Created | DeviceState::Unresolved => {}
        }
        if let Some(last) = self.last_activation {
            if last.elapsed() < ACTIVATION_RETRY {
                return;
            }
        }

        self.last_activation = Some(Instant::now());
        self.device.activate();
    }
}
