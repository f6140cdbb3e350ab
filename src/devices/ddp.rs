use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::config::DeviceConfig;
use crate::ddp;
use crate::devices::{Device, DeviceState};
use crate::error::Error;
use crate::pixels::PixelBuffer;
use crate::resolver::Resolver;
use crate::transmitter::DdpTransmitter;

struct PendingResolution {
    generation: u64,
    started: Instant,
}

struct ResolutionResult {
    generation: u64,
    result: io::Result<IpAddr>,
}

/// DDP device support.
///
/// Resolution of the configured host runs on a background thread and reports
/// back over a channel. Every attempt is tagged with a generation number, and a
/// result is only applied if it belongs to the attempt the device is still
/// waiting for. Deactivating, reconfiguring or timing out forgets the pending
/// attempt, so late answers are dropped instead of reviving the device.
pub struct DdpDevice {
    config: DeviceConfig,
    resolver: Arc<dyn Resolver>,
    destination: Option<IpAddr>,
    transmitter: Option<DdpTransmitter>,
    generation: u64,
    pending: Option<PendingResolution>,
    /// Lookup thread of the latest attempt, with its generation.
    worker: Option<(u64, JoinHandle<()>)>,
    resolve_failed: bool,
    dropped_frames: u64,
    results_tx: Sender<ResolutionResult>,
    results_rx: Receiver<ResolutionResult>,
}

impl DdpDevice {
    pub fn new(config: DeviceConfig, resolver: Arc<dyn Resolver>) -> Result<DdpDevice, Error> {
        config.validate()?;

        let (results_tx, results_rx) = mpsc::channel();
        let mut device = DdpDevice {
            config,
            resolver,
            destination: None,
            transmitter: None,
            generation: 0,
            pending: None,
            worker: None,
            resolve_failed: false,
            dropped_frames: 0,
            results_tx,
            results_rx,
        };
        device.attempt_resolve_dest();
        Ok(device)
    }

    pub fn destination(&self) -> Option<SocketAddr> {
        self.destination
            .map(|ip| SocketAddr::new(ip, self.config.port))
    }

    /// Starts a resolution attempt unless one is already in flight.
    ///
    /// A lookup that was abandoned after timing out may still be blocked in
    /// the resolver. No new thread is started until it has returned.
    pub fn attempt_resolve_dest(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if let Some((generation, worker)) = &self.worker {
            if !worker.is_finished() {
                log::debug!(
                    "Device {}: lookup {} is still running, not starting another",
                    self.config.name,
                    generation
                );
                return;
            }
        }
        self.reap_worker();

        log::info!(
            "Attempting to resolve device {} address {} ...",
            self.config.name,
            self.config.ip_address
        );

        self.generation += 1;
        let generation = self.generation;
        let resolver = Arc::clone(&self.resolver);
        let host = self.config.ip_address.clone();
        let results_tx = self.results_tx.clone();

        let res = thread::Builder::new()
            .name(format!("resolve-{}", self.config.name))
            .spawn(move || {
                let result = resolver.resolve(&host);
                // The device may be gone already, nobody is listening then.
                let _ = results_tx.send(ResolutionResult { generation, result });
            });

        match res {
            Ok(worker) => {
                self.worker = Some((generation, worker));
                self.pending = Some(PendingResolution {
                    generation,
                    started: Instant::now(),
                });
            }
            Err(err) => {
                log::warn!(
                    "Device {}: cannot start resolver thread: {}",
                    self.config.name,
                    err
                );
                self.resolve_failed = true;
            }
        }
    }

    /// Applies finished resolutions and expires the pending one if it took too long.
    fn poll_resolution(&mut self) {
        while let Ok(msg) = self.results_rx.try_recv() {
            self.on_resolved_dest(msg);
        }

        if let Some(pending) = &self.pending {
            if pending.started.elapsed() >= self.config.resolve_timeout() {
                log::warn!(
                    "Device {}: resolving {} timed out after {:?}",
                    self.config.name,
                    self.config.ip_address,
                    self.config.resolve_timeout()
                );
                self.pending = None;
                self.resolve_failed = true;
            }
        }
    }

    fn reap_worker(&mut self) {
        if let Some((generation, worker)) = self.worker.take() {
            if worker.join().is_err() {
                log::error!(
                    "Device {}: lookup {} panicked",
                    self.config.name,
                    generation
                );
            }
        }
    }

    fn on_resolved_dest(&mut self, msg: ResolutionResult) {
        // The worker exits right after reporting.
        if matches!(&self.worker, Some((generation, _)) if *generation == msg.generation) {
            self.reap_worker();
        }

        match &self.pending {
            Some(pending) if pending.generation == msg.generation => {}
            _ => {
                log::debug!(
                    "Device {}: discarding stale resolution result (attempt {})",
                    self.config.name,
                    msg.generation
                );
                return;
            }
        }
        self.pending = None;

        match msg.result {
            Ok(ip) => {
                log::info!(
                    "Device {}: resolved {} to {}",
                    self.config.name,
                    self.config.ip_address,
                    ip
                );
                self.destination = Some(ip);
                self.resolve_failed = false;
            }
            Err(err) => {
                let err = Error::Resolution {
                    host: self.config.ip_address.clone(),
                    reason: err.to_string(),
                };
                log::warn!("Device {}: {}", self.config.name, err);
                self.resolve_failed = true;
            }
        }
    }

    /// Blocks until the pending resolution attempt succeeds, fails or times out.
    pub fn wait_for_resolution(&mut self) -> DeviceState {
        loop {
            self.poll_resolution();
            let remaining = match &self.pending {
                Some(pending) => self
                    .config
                    .resolve_timeout()
                    .saturating_sub(pending.started.elapsed()),
                None => break,
            };

            match self.results_rx.recv_timeout(remaining) {
                Ok(msg) => self.on_resolved_dest(msg),
                Err(RecvTimeoutError::Timeout) => {}
                // We hold a sender ourselves, so this cannot happen.
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.state()
    }
}

impl Device for DdpDevice {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn pixel_count(&self) -> usize {
        self.config.pixel_count
    }

    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Sending stops until the next activation. If the host changed, the
    /// cached destination is dropped and resolution starts over.
    fn update_config(&mut self, config: DeviceConfig) -> Result<(), Error> {
        config.validate()?;

        let host_changed = config.ip_address != self.config.ip_address;
        self.transmitter = None;
        self.config = config;

        if host_changed {
            self.pending = None;
            self.destination = None;
            self.resolve_failed = false;
            self.attempt_resolve_dest();
        }
        Ok(())
    }

    fn state(&mut self) -> DeviceState {
        self.poll_resolution();

        if self.transmitter.is_some() {
            DeviceState::Active
        } else if self.pending.is_some() {
            DeviceState::Resolving
        } else if self.destination.is_none() && self.resolve_failed {
            DeviceState::Unresolved
        } else {
            DeviceState::Created
        }
    }

    fn activate(&mut self) -> DeviceState {
        self.poll_resolution();
        if self.transmitter.is_some() {
            return DeviceState::Active;
        }

        let dest = match self.destination() {
            Some(dest) => dest,
            None => {
                log::error!(
                    "Cannot activate device {} - destination address {} is not resolved",
                    self.config.name,
                    self.config.ip_address
                );
                self.attempt_resolve_dest();
                return self.state();
            }
        };

        match DdpTransmitter::open(dest) {
            Ok(transmitter) => {
                log::info!("Device {}: sending to {}", self.config.name, dest);
                self.transmitter = Some(transmitter);
            }
            Err(err) => {
                log::error!("Device {}: cannot open socket: {}", self.config.name, err);
            }
        }
        self.state()
    }

    fn deactivate(&mut self) {
        if self.pending.take().is_some() {
            log::debug!(
                "Device {}: abandoning resolution in flight",
                self.config.name
            );
        }
        if self.transmitter.take().is_some() {
            log::info!("Device {}: deactivated", self.config.name);
        }
    }

    fn flush(&mut self, pixels: &PixelBuffer) {
        let dest = self.destination();
        let transmitter = match self.transmitter.as_mut() {
            Some(transmitter) => transmitter,
            None => return,
        };

        for packet in ddp::encode(pixels, self.config.max_datalen) {
            if let Err(err) = transmitter.send(&packet, dest) {
                self.dropped_frames += 1;
                log::warn!(
                    "Device {}: dropping frame ({} so far): {}",
                    self.config.name,
                    self.dropped_frames,
                    err
                );
                return;
            }
        }
    }
}
