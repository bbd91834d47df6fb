// ================================
// src/main.rs - headless frame driver
// ================================
use anyhow::{Context, Result};
use rover_sim::{Session, SimConfig};
use std::{env, time::Duration};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// `rover_sim [config.toml] [seed]`
fn load_config() -> Result<SimConfig> {
    let mut args = env::args().skip(1);

    let mut config = match args.next() {
        Some(path) => {
            SimConfig::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => SimConfig::from_env().context("loading config")?,
    };

    if let Some(seed) = args.next() {
        config.seed = seed
            .parse()
            .with_context(|| format!("seed must be an unsigned integer, got {seed:?}"))?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rover_sim=info")),
        )
        .init();

    let config = load_config()?;
    info!(seed = config.seed, "rover simulation starting");

    let mut session = Session::new(config.clone()).context("building session")?;

    let period = Duration::from_secs_f64(1.0 / config.run.tick_hz);
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f64();
                last = now;

                let report = session.tick(dt);
                if config.run.log_every > 0 && report.tick % config.run.log_every == 0 {
                    info!(
                        tick = report.tick,
                        x = report.state.x,
                        y = report.state.y,
                        heading = report.state.heading,
                        mode = ?report.mode,
                        forward = report.forward_clearance,
                        degraded = report.degraded,
                        "telemetry"
                    );
                }
                if config.run.max_ticks.is_some_and(|max| report.tick >= max) {
                    info!(ticks = report.tick, "tick limit reached");
                    break;
                }
            }
            res = &mut shutdown => {
                res.context("waiting for ctrl-c")?;
                info!(ticks = session.ticks(), "interrupted, shutting down");
                break;
            }
        }
    }

    Ok(())
}
