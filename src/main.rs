//! mirage
//!
//! Guest-side seamless-window agent: watches the X session and streams
//! window deltas to the host over a unix socket.

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mirage::config::Config;
use mirage::host::tracker::HostTracker;
use mirage::host::transport::{socket_path, UnixTransport};
use mirage::mirror::queue::EventQueue;
use mirage::mirror::MirrorEngine;
use mirage::xserver::live::LiveWindowSystem;
use mirage::xserver::WindowSystem;

fn main() -> Result<()> {
    // Loaded before the subscriber exists; its own log lines are dropped,
    // so the outcome is repeated below.
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting mirage (config at {:?})", Config::config_path()?);

    let mut ws = LiveWindowSystem::open()?;
    let mut engine = MirrorEngine::new(config.engine_options());
    engine.set_screens(ws.screen_rects()?);

    let mut tracker = HostTracker::new();
    let socket = config
        .transport
        .socket
        .clone()
        .unwrap_or_else(socket_path);
    let mut transport = UnixTransport::new(&socket);
    let flush_interval = Duration::from_millis(config.transport.flush_interval_ms.max(10));

    let mut queue = EventQueue::new();
    engine.initial_scan(&mut ws, &mut tracker)?;
    info!(
        "initial scan complete, {} windows tracked",
        engine.window_count()
    );
    if let Err(err) = tracker.flush(&mut transport) {
        warn!("initial flush failed: {err:#}");
    }

    let mut last_flush = Instant::now();
    loop {
        if let Some(event) = ws.poll_event(flush_interval)? {
            queue.push(event);
            // Pick up everything else already pending so the queue can
            // compress around destroys before we process anything.
            while let Some(event) = ws.poll_event(Duration::ZERO)? {
                queue.push(event);
            }
            engine.drain(&mut ws, &mut tracker, &mut queue);
        }

        if tracker.pending() > 0 && last_flush.elapsed() >= flush_interval {
            if let Err(err) = tracker.flush(&mut transport) {
                warn!("update flush failed: {err:#}");
            }
            last_flush = Instant::now();
        }
    }
}
