//! main.rs — Sailing simulator entry point
//!
//! Runs two concurrent pieces:
//!   1. Sim loop: steps controller + boat at update_rate_hz, applies the
//!      active wind scenario, broadcasts telemetry (WebSocket + optional UDP)
//!   2. WebSocket server: control UI on ctrl_port (pause/resume, speed,
//!      scenario presets, wind override) plus /health
//!
//! `--headless` skips the server and runs a fixed number of ticks as fast as
//! possible, printing the final snapshot as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use clap::Parser;
use tokio::sync::{broadcast, RwLock};
use tokio::time::interval;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use sail_simulator::scenarios::{self, ScenarioConfig, WindModel};
use sail_simulator::{tracing_sink, Controller, SimError, SimSnapshot, SimulatorConfig, TelemetrySender};
use sail_types::Angle;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sail-sim", about = "2D sailing simulator with autonomous navigation")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
    /// Run without the control server, as fast as possible
    #[arg(long)]
    headless: bool,
    /// Number of ticks to run in headless mode
    #[arg(long, default_value = "1000")]
    ticks: u64,
    /// Simulation speed multiplier (1.0 = real-time); overrides the config
    #[arg(long)]
    speed: Option<f64>,
    /// UDP target for JSON telemetry; overrides the config
    #[arg(long)]
    telemetry_addr: Option<String>,
    /// Control panel WebSocket port; overrides the config
    #[arg(long)]
    ctrl_port: Option<u16>,
    /// Wind scenario preset (steady, gusty, shifty, tidal, storm)
    #[arg(long)]
    scenario: Option<String>,
}

// ── Shared state ──────────────────────────────────────────────────────────────

struct SimState {
    controller: Controller,
    wind: WindModel,
    paused: bool,
    tick: u64,
    speed: f64,
    /// Simulated seconds per tick at 1×
    dt: f64,
    /// Last telemetry JSON, sent to clients on connect
    last_telemetry: Option<String>,
}

type SharedState = Arc<RwLock<SimState>>;

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sail_simulator=info,sail_sim=info".into()),
        )
        .init();

    let args = Args::parse();
    let cfg = load_config(&args.config)?;

    let scenario = match args.scenario.as_deref() {
        Some(name) => match scenarios::preset(name) {
            Some(sc) => sc,
            None => bail!("unknown scenario preset '{name}'"),
        },
        None => cfg.scenario.clone(),
    };

    let controller = cfg.build_controller(tracing_sink()).context("building boat and controller")?;
    let wind = WindModel::new(cfg.wind_from(), cfg.wind.speed_mps, scenario);

    info!(
        "🛥  Sail simulator starting: {} foils, wind {:.1} m/s from {:.0}°, {:?} scenarios",
        controller.boat().foils().len(),
        cfg.wind.speed_mps,
        cfg.wind.from_deg,
        wind.scenario().active
    );

    let mut state = SimState {
        controller,
        wind,
        paused: false,
        tick: 0,
        speed: args.speed.unwrap_or(cfg.simulation.speed),
        dt: cfg.simulation.dt,
        last_telemetry: None,
    };

    let telemetry_addr = args.telemetry_addr.or_else(|| cfg.simulation.telemetry_addr.clone());
    let transmitter = match telemetry_addr {
        Some(addr) => Some(Arc::new(
            TelemetrySender::new(&addr)
                .with_context(|| format!("binding UDP telemetry socket for {addr}"))?,
        )),
        None => None,
    };

    if args.headless {
        return run_headless(&mut state, args.ticks, transmitter.as_deref());
    }

    let shared: SharedState = Arc::new(RwLock::new(state));

    // Broadcast channel for telemetry (web UI)
    let (telem_tx, _) = broadcast::channel::<String>(64);
    let telem_tx = Arc::new(telem_tx);

    let shared_loop = shared.clone();
    let telem_tx_loop = telem_tx.clone();
    let update_rate = cfg.simulation.update_rate_hz;
    tokio::spawn(async move {
        sim_loop(shared_loop, transmitter, telem_tx_loop, update_rate).await;
    });

    let ctrl_addr = format!("0.0.0.0:{}", args.ctrl_port.unwrap_or(cfg.simulation.ctrl_port));
    info!("🖥  Control panel WebSocket at ws://{ctrl_addr}/ws");

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "sail-sim ok" }))
        .with_state((shared.clone(), telem_tx.clone()))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let listener = tokio::net::TcpListener::bind(&ctrl_addr)
        .await
        .with_context(|| format!("binding control server on {ctrl_addr}"))?;
    axum::serve(listener, app).await.context("control server stopped")?;
    Ok(())
}

/// Config file if it exists, otherwise the bundled default.
fn load_config(path: &Path) -> Result<SimulatorConfig> {
    if path.exists() {
        return SimulatorConfig::from_path(path).with_context(|| format!("loading {}", path.display()));
    }
    warn!("{} not found, using bundled config", path.display());
    let mut cfg = SimulatorConfig::from_toml_str(include_str!("../config.toml")).context("bundled config.toml")?;
    cfg.base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    Ok(cfg)
}

// ── Stepping ──────────────────────────────────────────────────────────────────

/// One tick: scenario wind, controller + physics, with one half-step retry
/// on a physics error. A second failure pauses the sim.
fn advance(s: &mut SimState) {
    let dt = s.dt * s.speed;
    let ambient = s.wind.advance(dt);
    let boat = s.controller.boat_mut();
    boat.set_wind(ambient.wind);
    if let Some(current) = ambient.current {
        boat.set_current(current);
    }

    let result = if s.controller.state().mode.is_some() {
        s.controller.step(dt)
    } else {
        // no course: let the boat drift with the last commands
        s.controller.boat_mut().step(dt)
    };

    match result {
        Ok(()) => {}
        Err(SimError::Physics(e)) => {
            warn!("Physics error, retrying with dt/2: {e}");
            if let Err(e) = s.controller.boat_mut().step(dt / 2.0) {
                error!("Physics error on retry, pausing: {e}");
                s.paused = true;
            }
        }
        // reported through the diagnostic sink, and the boat still moved
        Err(SimError::Pathfinding(_)) => {}
        Err(e) => {
            error!("Sim step failed, pausing: {e}");
            s.paused = true;
        }
    }
    s.tick += 1;
}

fn run_headless(s: &mut SimState, ticks: u64, tx: Option<&TelemetrySender>) -> Result<()> {
    info!("⚓ Headless run: {ticks} ticks of {:.3}s", s.dt * s.speed);
    for _ in 0..ticks {
        advance(s);
        if let Some(tx) = tx {
            tx.send_snapshot(&SimSnapshot::capture(&s.controller, s.tick, s.paused, s.speed));
        }
        if s.paused {
            warn!("Stopped early at tick {}", s.tick);
            break;
        }
        if s.controller.state().course_complete {
            info!("🏁 Course complete at tick {}", s.tick);
            break;
        }
    }
    let snapshot = SimSnapshot::capture(&s.controller, s.tick, s.paused, s.speed);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

// ── Sim loop ──────────────────────────────────────────────────────────────────

async fn sim_loop(
    state: SharedState,
    tx: Option<Arc<TelemetrySender>>,
    telem: Arc<broadcast::Sender<String>>,
    update_rate_hz: f64,
) {
    let tick_ms = (1000.0 / update_rate_hz.max(0.1)) as u64;
    let mut ticker = interval(Duration::from_millis(tick_ms.max(1)));

    info!("⚓ Sim loop running at {update_rate_hz} Hz ({tick_ms}ms tick)");

    loop {
        ticker.tick().await;

        let (snapshot, telemetry_json) = {
            let mut s = state.write().await;
            if s.paused {
                continue;
            }
            advance(&mut s);

            let snapshot = SimSnapshot::capture(&s.controller, s.tick, s.paused, s.speed);
            let json = match serde_json::to_string(&snapshot) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Telemetry serialize failed: {e}");
                    continue;
                }
            };
            s.last_telemetry = Some(json.clone());
            (snapshot, json)
        };

        if let Some(tx) = &tx {
            tx.send_snapshot(&snapshot);
        }

        // Broadcast to web UI
        let _ = telem.send(telemetry_json);

        if snapshot.tick % 100 == 0 {
            info!(
                "⏱ t={:.1}s | tick={} | wp={}/{} | speed={:.2} m/s | heading={:.0}°",
                snapshot.boat.time_s,
                snapshot.tick,
                snapshot.controller.waypoint_index,
                snapshot.controller.waypoint_count,
                snapshot.boat.speed_mps,
                snapshot.boat.heading_deg
            );
        }
    }
}

// ── WebSocket control handler ─────────────────────────────────────────────────

async fn ws_handler(
    ws: WebSocketUpgrade,
    State((state, telem_tx)): State<(SharedState, Arc<broadcast::Sender<String>>)>,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state, telem_tx))
}

async fn handle_ws(mut socket: WebSocket, state: SharedState, telem_tx: Arc<broadcast::Sender<String>>) {
    let mut telem_rx = telem_tx.subscribe();

    // Send current state immediately on connect
    let last = state.read().await.last_telemetry.clone();
    if let Some(telem) = last {
        let _ = socket.send(Message::Text(telem)).await;
    }

    let scenario_json = {
        let s = state.read().await;
        serde_json::to_value(s.wind.scenario()).unwrap_or_default()
    };
    let _ = socket
        .send(Message::Text(serde_json::json!({"type": "scenario", "data": scenario_json}).to_string()))
        .await;

    loop {
        tokio::select! {
            // Relay telemetry to client
            Ok(msg) = telem_rx.recv() => {
                if socket.send(Message::Text(msg)).await.is_err() { break; }
            }
            // Handle commands from web UI
            Some(Ok(Message::Text(cmd))) = socket.recv() => {
                handle_command(&state, &cmd).await;
            }
            else => break,
        }
    }
}

/// Handle commands from the web control panel.
/// Commands are JSON: { "cmd": "...", "args": {...} }
async fn handle_command(state: &SharedState, raw: &str) {
    let v: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!("Unparseable control message: {e}");
            return;
        }
    };
    let cmd = v["cmd"].as_str().unwrap_or("");
    match cmd {
        "pause" => {
            state.write().await.paused = true;
            info!("⏸ Sim paused");
        }
        "resume" => {
            state.write().await.paused = false;
            info!("▶ Sim resumed");
        }
        "set_speed" => {
            if let Some(sp) = v["args"]["speed"].as_f64() {
                let sp = sp.clamp(0.1, 20.0);
                state.write().await.speed = sp;
                info!("⚡ Sim speed set to {sp}×");
            }
        }
        "set_wind" => {
            let mut s = state.write().await;
            let (from, speed) = s.wind.base();
            let from = v["args"]["from_deg"].as_f64().map_or(from, Angle::calc);
            let speed = v["args"]["speed_mps"].as_f64().unwrap_or(speed);
            s.wind.set_base(from, speed);
            info!("🌬 Wind set to {speed:.1} m/s from {:.0}°", from.degrees());
        }
        "set_scenario" => match serde_json::from_value::<ScenarioConfig>(v["args"].clone()) {
            Ok(sc) => {
                state.write().await.wind.set_scenario(sc);
                info!("🎭 Scenario updated");
            }
            Err(e) => warn!("Bad scenario: {e}"),
        },
        "preset" => {
            let name = v["args"]["name"].as_str().unwrap_or("");
            match scenarios::preset(name) {
                Some(sc) => {
                    state.write().await.wind.set_scenario(sc);
                    info!("🎭 Preset '{name}' loaded");
                }
                None => warn!("Unknown preset: {name}"),
            }
        }
        _ => warn!("Unknown control command: {cmd}"),
    }
}
