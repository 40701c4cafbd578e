//! Native JACK audio backend for Linux
//!
//! Provides direct JACK integration with full port-level routing control.
//! This backend is used on Linux when the `jack-backend` feature is enabled.
//!
//! # Ports
//!
//! - `out_l`, `out_r`: stereo mix output
//! - `keepalive_in`: mono input scanned by the keep-alive monitor (optional)
//!
//! # Lifecycle
//!
//! ```text
//! open()  ──► ports registered, client inactive
//!   │
//! register_process_callback()
//!   │   activate ─► restore saved connections ─► auto-connect unrouted ports
//!   ▼
//! running ──drop──► save connections ─► deactivate
//! ```

use std::path::{Path, PathBuf};

use jack::{AudioIn, AudioOut, Client, ClientOptions, Control, Port, PortFlags, ProcessScope};

use super::backend::{AudioHost, ProcessCallback, StereoPair};
use super::connections::{load_connections, save_connections, PortConnections};
use super::error::{AudioError, AudioResult};

/// JACK port names
const OUT_LEFT: &str = "out_l";
const OUT_RIGHT: &str = "out_r";
const KEEPALIVE_IN: &str = "keepalive_in";

/// Ports registered on the inactive client
struct JackPorts {
    out_left: Port<AudioOut>,
    out_right: Port<AudioOut>,
    keepalive_in: Option<Port<AudioIn>>,
}

/// JACK process handler
///
/// Owns the soundboard callback exclusively - no mutex needed.
struct JackProcessor {
    out_left: Port<AudioOut>,
    out_right: Port<AudioOut>,
    keepalive_in: Option<Port<AudioIn>>,
    callback: Box<dyn ProcessCallback>,
}

impl jack::ProcessHandler for JackProcessor {
    fn process(&mut self, _client: &Client, ps: &ProcessScope) -> Control {
        let left = self.out_left.as_mut_slice(ps);
        let right = self.out_right.as_mut_slice(ps);
        let input = self.keepalive_in.as_ref().map(|port| port.as_slice(ps));

        let mut outputs = [left, right];
        self.callback.process(&mut outputs, input);

        Control::Continue
    }
}

/// JACK notification handler
struct JackNotifications;

impl jack::NotificationHandler for JackNotifications {
    fn sample_rate(&mut self, _client: &Client, srate: jack::Frames) -> Control {
        log::info!("JACK sample rate changed to: {}", srate);
        Control::Continue
    }

    fn xrun(&mut self, _client: &Client) -> Control {
        log::warn!("JACK xrun detected");
        Control::Continue
    }
}

/// JACK client hosting the soundboard callback
///
/// Drop this to disconnect from JACK; connections are saved first when a
/// connections file is set.
pub struct JackHost {
    /// Client and ports until the callback is registered
    pending: Option<(Client, JackPorts)>,
    /// The async client (keeps JACK running)
    active: Option<jack::AsyncClient<JackNotifications, JackProcessor>>,
    /// Actual client name (JACK may rename on clashes)
    client_name: String,
    sample_rate: u32,
    buffer_size: u32,
    has_input: bool,
    connections_file: Option<PathBuf>,
    auto_connect_outputs: bool,
    auto_connect_input: bool,
}

impl JackHost {
    /// Create the client and register its ports (not yet activated)
    pub fn open(client_name: &str, with_input: bool) -> AudioResult<Self> {
        // JACK may rename if another client has the same name
        let (client, _status) = Client::new(client_name, ClientOptions::NO_START_SERVER)
            .map_err(|e| AudioError::ClientError(format!("Failed to create JACK client: {}", e)))?;
        let actual_client_name = client.name().to_string();

        let sample_rate = client.sample_rate() as u32;
        let buffer_size = client.buffer_size();

        log::info!(
            "JACK client '{}' created (sample rate: {}Hz, buffer: {} frames, latency: {:.1}ms)",
            actual_client_name,
            sample_rate,
            buffer_size,
            (buffer_size as f32 / sample_rate as f32) * 1000.0
        );

        let out_left = register(&client, OUT_LEFT, AudioOut::default())?;
        let out_right = register(&client, OUT_RIGHT, AudioOut::default())?;
        let keepalive_in = if with_input {
            Some(register(&client, KEEPALIVE_IN, AudioIn::default())?)
        } else {
            None
        };

        Ok(Self {
            pending: Some((
                client,
                JackPorts {
                    out_left,
                    out_right,
                    keepalive_in,
                },
            )),
            active: None,
            client_name: actual_client_name,
            sample_rate,
            buffer_size,
            has_input: with_input,
            connections_file: None,
            auto_connect_outputs: true,
            auto_connect_input: with_input,
        })
    }

    /// Restore connections from `path` on activation and save them on drop
    pub fn set_connections_file(&mut self, path: Option<PathBuf>) {
        self.connections_file = path;
    }

    /// Connect ports left unrouted after restore to the first system ports
    pub fn set_auto_connect(&mut self, outputs: bool, input: bool) {
        self.auto_connect_outputs = outputs;
        self.auto_connect_input = input;
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    fn full_name(&self, port: &str) -> String {
        format!("{}:{}", self.client_name, port)
    }

    fn own_ports(&self) -> Vec<String> {
        let mut ports = vec![self.full_name(OUT_LEFT), self.full_name(OUT_RIGHT)];
        if self.has_input {
            ports.push(self.full_name(KEEPALIVE_IN));
        }
        ports
    }

    /// Reconnect ports from the saved file; connection errors are ignored
    fn restore_connections(&self, client: &Client, path: &Path) {
        let entries = match load_connections(path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not read saved JACK connections: {:#}", e);
                return;
            }
        };

        let own = self.own_ports();
        let mut restored = 0;
        for entry in entries.iter().filter(|e| own.contains(&e.port)) {
            for target in &entry.targets {
                // Output ports are the source; for our input the target feeds us
                let result = if entry.port.ends_with(KEEPALIVE_IN) {
                    client.connect_ports_by_name(target, &entry.port)
                } else {
                    client.connect_ports_by_name(&entry.port, target)
                };
                match result {
                    Ok(()) => restored += 1,
                    Err(e) => log::debug!("Could not restore {} -> {}: {}", entry.port, target, e),
                }
            }
        }
        log::info!("Restored {} JACK connection(s) from {:?}", restored, path);
    }

    /// Current routing of our own ports
    fn current_connections(&self, client: &Client) -> Vec<PortConnections> {
        self.own_ports()
            .into_iter()
            .filter_map(|name| {
                let port = client.port_by_name(&name)?;
                let targets = port.get_connections();
                Some(PortConnections::new(name, targets))
            })
            .collect()
    }

    fn is_connected(client: &Client, port_name: &str) -> bool {
        client
            .port_by_name(port_name)
            .map(|p| !p.get_connections().is_empty())
            .unwrap_or(false)
    }

    /// Connect unrouted outputs to the first playback pair and the unrouted
    /// input to the first capture port
    fn auto_connect(&self, client: &Client) {
        let left = self.full_name(OUT_LEFT);
        let right = self.full_name(OUT_RIGHT);

        if self.auto_connect_outputs
            && !Self::is_connected(client, &left)
            && !Self::is_connected(client, &right)
        {
            match stereo_pairs(client).first() {
                Some(pair) => {
                    if let Err(e) = client.connect_ports_by_name(&left, &pair.left) {
                        log::warn!("Could not connect left output: {}", e);
                    }
                    if let Err(e) = client.connect_ports_by_name(&right, &pair.right) {
                        log::warn!("Could not connect right output: {}", e);
                    }
                    log::info!("Connected outputs to {} and {}", pair.left, pair.right);
                }
                None => log::warn!("No JACK playback ports found for connection"),
            }
        }

        let input = self.full_name(KEEPALIVE_IN);
        if self.has_input && self.auto_connect_input && !Self::is_connected(client, &input) {
            let captures = client.ports(
                Some(".*:capture_.*"),
                None,
                PortFlags::IS_OUTPUT | PortFlags::IS_PHYSICAL,
            );
            match captures.first() {
                Some(capture) => match client.connect_ports_by_name(capture, &input) {
                    Ok(()) => log::info!("Connected keep-alive input to {}", capture),
                    Err(e) => log::warn!("Could not connect keep-alive input: {}", e),
                },
                None => log::warn!("No JACK capture ports found for keep-alive input"),
            }
        }
    }
}

fn register<PS: jack::PortSpec>(client: &Client, name: &str, spec: PS) -> AudioResult<Port<PS>> {
    client
        .register_port(name, spec)
        .map_err(|e| AudioError::PortRegistration {
            port: name.to_string(),
            reason: e.to_string(),
        })
}

impl AudioHost for JackHost {
    fn operating_sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn output_ports(&self) -> Vec<String> {
        vec![self.full_name(OUT_LEFT), self.full_name(OUT_RIGHT)]
    }

    fn input_port(&self) -> Option<String> {
        self.has_input.then(|| self.full_name(KEEPALIVE_IN))
    }

    fn register_process_callback(
        &mut self,
        callback: Box<dyn ProcessCallback>,
    ) -> AudioResult<()> {
        let (client, ports) = self
            .pending
            .take()
            .ok_or(AudioError::CallbackAlreadyRegistered)?;

        let processor = JackProcessor {
            out_left: ports.out_left,
            out_right: ports.out_right,
            keepalive_in: ports.keepalive_in,
            callback,
        };

        let async_client = client
            .activate_async(JackNotifications, processor)
            .map_err(|e| {
                AudioError::ClientError(format!("Failed to activate JACK client: {}", e))
            })?;

        log::info!("JACK client activated");

        if let Some(path) = &self.connections_file {
            self.restore_connections(async_client.as_client(), path);
        }
        self.auto_connect(async_client.as_client());

        self.active = Some(async_client);
        Ok(())
    }
}

impl Drop for JackHost {
    fn drop(&mut self) {
        let (Some(active), Some(path)) = (&self.active, &self.connections_file) else {
            return;
        };
        let entries = self.current_connections(active.as_client());
        if let Err(e) = save_connections(path, &entries) {
            log::warn!("Could not save JACK connections: {:#}", e);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Port Enumeration
// ═══════════════════════════════════════════════════════════════════════════════

/// Group playback ports into stereo pairs
///
/// Supports both traditional JACK naming (playback_1, playback_2) and
/// PipeWire surround naming (playback_FL, playback_FR, playback_RL, playback_RR).
fn stereo_pairs(client: &Client) -> Vec<StereoPair> {
    let ports = client.ports(Some(".*:playback_.*"), None, PortFlags::IS_INPUT);
    group_stereo_pairs(ports)
}

fn group_stereo_pairs(ports: Vec<String>) -> Vec<StereoPair> {
    // Group ports by device (everything before the last colon)
    let mut devices: std::collections::BTreeMap<String, Vec<String>> =
        std::collections::BTreeMap::new();
    for port in ports {
        if let Some(colon_pos) = port.rfind(':') {
            let device = port[..colon_pos].to_string();
            devices.entry(device).or_default().push(port);
        }
    }

    let mut pairs = Vec::new();

    for (device_name, mut device_ports) in devices {
        device_ports.sort();

        let find = |suffix: &str| device_ports.iter().find(|p| p.ends_with(suffix)).cloned();
        let short_name = device_name.split(' ').next().unwrap_or(&device_name);

        if let (Some(fl), Some(fr)) = (find("_FL"), find("_FR")) {
            pairs.push(StereoPair {
                label: format!("{} Front", short_name),
                left: fl,
                right: fr,
            });
            if let (Some(rl), Some(rr)) = (find("_RL"), find("_RR")) {
                pairs.push(StereoPair {
                    label: format!("{} Rear", short_name),
                    left: rl,
                    right: rr,
                });
            }
        } else {
            // Traditional JACK numbered naming
            device_ports
                .chunks(2)
                .enumerate()
                .filter(|(_, chunk)| chunk.len() == 2)
                .for_each(|(i, chunk)| {
                    pairs.push(StereoPair {
                        label: format!("{} {}-{}", short_name, i * 2 + 1, i * 2 + 2),
                        left: chunk[0].clone(),
                        right: chunk[1].clone(),
                    });
                });
        }
    }

    // "system" first: it is the usual hardware device
    pairs.sort_by(|a, b| {
        let a_sys = a.left.starts_with("system:");
        let b_sys = b.left.starts_with("system:");
        b_sys.cmp(&a_sys).then_with(|| a.label.cmp(&b.label))
    });
    pairs
}

/// Get available JACK stereo output pairs
///
/// Uses a temporary client, so this works without a running soundboard.
pub fn get_available_stereo_pairs() -> Vec<StereoPair> {
    let (client, _) = match Client::new("soundboard_port_query", ClientOptions::NO_START_SERVER) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("Could not connect to JACK to enumerate ports: {}", e);
            return vec![];
        }
    };
    let pairs = stereo_pairs(&client);
    log::debug!("Found {} JACK stereo pairs", pairs.len());
    pairs
}
