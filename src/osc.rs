use std::net::{SocketAddr, UdpSocket};
use std::sync::mpsc::Sender;

use rosc::{decoder, OscMessage, OscPacket, OscType};

use crate::ease::EaseMethod;
use crate::effects::bar::{BarConfig, Mode};
use crate::error::Error;
use crate::renderer::Control;

/// Receives bar and device settings over OSC and forwards every accepted
/// change to the render loop. Bar changes are sent as a complete new configuration.
pub struct OscReceiver {
    sock: UdpSocket,
    config: BarConfig,
    updates: Sender<Control<BarConfig>>,
}

impl OscReceiver {
    pub fn new(
        listen_addr: SocketAddr,
        config: BarConfig,
        updates: Sender<Control<BarConfig>>,
    ) -> Result<Self, Error> {
        let sock = UdpSocket::bind(listen_addr).map_err(|err| {
            Error::Configuration(format!("cannot listen for OSC on {}: {}", listen_addr, err))
        })?;
        log::info!("Listening for OSC on {}", listen_addr);

        Ok(OscReceiver {
            sock,
            config,
            updates,
        })
    }

    pub fn run(&mut self) {
        let mut buf = [0u8; decoder::MTU];

        loop {
            match self.sock.recv_from(&mut buf) {
                Ok((size, addr)) => {
                    log::debug!("Received packet with size {} from: {}", size, addr);
                    match decoder::decode(&buf[..size]) {
                        Ok(packet) => {
                            if !self.handle_packet(packet) {
                                // Render loop is gone.
                                break;
                            }
                        }
                        Err(err) => log::warn!("Cannot decode OSC packet from {}: {:?}", addr, err),
                    }
                }
                Err(e) => {
                    log::error!("Error receiving from socket: {}", e);
                    break;
                }
            }
        }
    }

    /// Returns false once nobody listens for updates anymore.
    fn handle_packet(&mut self, packet: OscPacket) -> bool {
        match packet {
            OscPacket::Message(msg) => self.handle_message(&msg),
            OscPacket::Bundle(bundle) => bundle
                .content
                .into_iter()
                .all(|packet| self.handle_packet(packet)),
        }
    }

    fn handle_message(&mut self, msg: &OscMessage) -> bool {
        if msg.addr == "/device/ip_address" {
            return self.handle_device_host(msg);
        }

        let mut config = self.config.clone();
        let result = match msg.addr.as_str() {
            "/bar/mode" => self
                .handle_string_message(msg)
                .and_then(|s| s.parse::<Mode>())
                .map(|mode| config.mode = mode),
            "/bar/ease_method" => self
                .handle_string_message(msg)
                .and_then(|s| s.parse::<EaseMethod>())
                .map(|ease_method| config.ease_method = ease_method),
            "/bar/gradient" => self
                .handle_string_message(msg)
                .map(|name| config.gradient_name = name.to_string()),
            _ => {
                log::debug!("Ignoring OSC address: {} {:?}", msg.addr, msg.args);
                return true;
            }
        };

        if let Err(err) = result {
            log::warn!("{}", err);
            return true;
        }
        if let Err(err) = config.validate() {
            log::warn!("{}: {}", msg.addr, err);
            return true;
        }
        if config == self.config {
            return true;
        }

        log::info!(
            "Bar settings changed: mode {}, ease {}, gradient {}",
            config.mode,
            config.ease_method,
            config.gradient_name
        );
        self.config = config.clone();
        self.updates.send(Control::Effect(config)).is_ok()
    }

    fn handle_device_host(&self, msg: &OscMessage) -> bool {
        let host = match self.handle_string_message(msg) {
            Ok(host) => host.trim(),
            Err(err) => {
                log::warn!("{}", err);
                return true;
            }
        };
        if host.is_empty() {
            log::warn!("{} Empty host name", msg.addr);
            return true;
        }

        log::info!("Device address changed to {}", host);
        self.updates.send(Control::DeviceHost(host.to_string())).is_ok()
    }

    fn handle_string_message<'a>(&self, msg: &'a OscMessage) -> Result<&'a str, String> {
        match msg.args.first() {
            Some(OscType::String(value)) => Ok(value),
            Some(arg) => Err(format!(
                "{} Unexpected OSC parameter type: {:?}",
                msg.addr, arg
            )),
            None => Err(format!("{} Missing OSC parameter: string", msg.addr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use super::*;

    fn receiver() -> (OscReceiver, Receiver<Control<BarConfig>>) {
        let (tx, rx) = mpsc::channel();
        let osc = OscReceiver::new("127.0.0.1:0".parse().unwrap(), BarConfig::default(), tx)
            .unwrap();
        (osc, rx)
    }

    fn message(addr: &str, value: &str) -> OscPacket {
        OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args: vec![OscType::String(value.to_string())],
        })
    }

    #[test]
    fn forwards_accepted_changes() {
        let (mut osc, rx) = receiver();

        assert!(osc.handle_packet(message("/bar/mode", "bounce")));
        assert!(osc.handle_packet(message("/bar/ease_method", "linear")));
        assert!(osc.handle_packet(message("/bar/gradient", "Ocean")));

        let effect_update = |control: Control<BarConfig>| match control {
            Control::Effect(config) => config,
            other => panic!("expected an effect update, got {:?}", other),
        };
        assert_eq!(effect_update(rx.try_recv().unwrap()).mode, Mode::Bounce);
        assert_eq!(
            effect_update(rx.try_recv().unwrap()).ease_method,
            EaseMethod::Linear
        );
        let last = effect_update(rx.try_recv().unwrap());
        assert_eq!(last.gradient_name, "Ocean");
        assert_eq!(last.mode, Mode::Bounce);
    }

    #[test]
    fn forwards_device_host_changes() {
        let (mut osc, rx) = receiver();

        assert!(osc.handle_packet(message("/device/ip_address", " 10.0.0.9 ")));
        assert!(osc.handle_packet(message("/device/ip_address", "  ")));
        assert!(osc.handle_packet(OscPacket::Message(OscMessage {
            addr: "/device/ip_address".to_string(),
            args: vec![OscType::Int(10)],
        })));

        assert_eq!(
            rx.try_recv().unwrap(),
            Control::DeviceHost("10.0.0.9".to_string())
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn ignores_invalid_and_unchanged_values() {
        let (mut osc, rx) = receiver();

        assert!(osc.handle_packet(message("/bar/mode", "zigzag")));
        assert!(osc.handle_packet(message("/bar/gradient", "Plaid")));
        assert!(osc.handle_packet(message("/bar/mode", "wipe")));
        assert!(osc.handle_packet(OscPacket::Message(OscMessage {
            addr: "/bar/mode".to_string(),
            args: vec![OscType::Float(1.0)],
        })));
        assert!(osc.handle_packet(message("/main/static", "")));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn stops_when_render_loop_is_gone() {
        let (mut osc, rx) = receiver();
        drop(rx);
        assert!(!osc.handle_packet(message("/bar/mode", "in-out")));
    }
}
