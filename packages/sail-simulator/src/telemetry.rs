//! telemetry.rs — Snapshot envelope and UDP JSON transmitter
//!
//! Consumers only ever see [`SimSnapshot`] copies, never the live boat.
//! Snapshots go to the `--telemetry-addr` target; send errors are logged
//! and never stop the simulation.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use serde::Serialize;
use tracing::{debug, warn};

use crate::boat_sim::BoatSnapshot;
use crate::controller::{Controller, ControllerStatus};

/// One tick's worth of state, as sent to the web UI and over UDP.
#[derive(Debug, Clone, Serialize)]
pub struct SimSnapshot {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tick: u64,
    pub paused: bool,
    pub speed: f64,
    pub boat: BoatSnapshot,
    pub controller: ControllerStatus,
}

impl SimSnapshot {
    pub fn capture(controller: &Controller, tick: u64, paused: bool, speed: f64) -> Self {
        let (boat, controller) = controller.snapshot();
        Self { kind: "telemetry", tick, paused, speed, boat, controller }
    }
}

/// Fire-and-forget JSON datagrams to one UDP target.
pub struct TelemetrySender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl TelemetrySender {
    /// Resolves `target` once; an unresolvable address is an error here
    /// rather than a warning on every tick.
    pub fn new(target: &str) -> Result<Self, std::io::Error> {
        let target = target.to_socket_addrs()?.next().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, format!("no address for {target}"))
        })?;
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr { self.target }

    pub fn send_snapshot(&self, snapshot: &SimSnapshot) {
        let bytes = match serde_json::to_vec(snapshot) {
            Ok(b) => b,
            Err(e) => {
                warn!("UDP: serialize failed: {e}");
                return;
            }
        };
        match self.socket.send_to(&bytes, self.target) {
            Ok(_) => debug!(
                "UDP → {} tick={} x={:.2}m y={:.2}m",
                self.target, snapshot.tick, snapshot.boat.x_m, snapshot.boat.y_m
            ),
            Err(e) => warn!("UDP: send to {} failed: {e}", self.target),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::SimulatorConfig;
    use crate::diagnostics::RecordingSink;

    fn controller() -> Controller {
        let dir = env!("CARGO_MANIFEST_DIR");
        let cfg = SimulatorConfig::from_path(format!("{dir}/config.toml")).unwrap();
        cfg.build_controller(RecordingSink::new()).unwrap()
    }

    #[test]
    fn snapshot_serializes_with_type_tag() {
        let snap = SimSnapshot::capture(&controller(), 3, false, 1.0);
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["type"], "telemetry");
        assert_eq!(v["tick"], 3);
        assert!(v["boat"]["heading_deg"].is_number());
        assert!(v["controller"]["waypoint_count"].is_number());
    }

    #[test]
    fn sends_json_over_udp() {
        let rx = UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let tx = TelemetrySender::new(&rx.local_addr().unwrap().to_string()).unwrap();
        assert_eq!(tx.target(), rx.local_addr().unwrap());

        tx.send_snapshot(&SimSnapshot::capture(&controller(), 1, false, 1.0));

        let mut buf = vec![0u8; 65_536];
        let n = rx.recv(&mut buf).unwrap();
        let v: serde_json::Value = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(v["tick"], 1);
        assert_eq!(v["controller"]["algorithm"]["path"]["name"], "layline");
    }

    #[test]
    fn unparseable_target_fails_at_construction() {
        assert!(TelemetrySender::new("not an address").is_err());
    }
}
