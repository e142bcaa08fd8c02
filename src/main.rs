//! 🧠 STPF decision service
//!
//! Reads one JSON request per line on stdin and writes one JSON response per
//! line on stdout. Logs go to stderr via env_logger (`RUST_LOG`, falling back
//! to `STPF_LOG_LEVEL`).

use anyhow::{Context, Result};
use log::{error, info};
use std::io::{self, BufRead, Write};
use stpf_engine::{EngineConfig, Engine, Request, Response};

fn main() -> Result<()> {
    // Load configuration
    let config = EngineConfig::from_env().context("Failed to load configuration")?;

    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.log_level.as_str()))
        .init();

    config.validate().context("Invalid configuration")?;
    info!("✅ Configuration: Loaded");
    print_banner(&config);

    let engine = Engine::with_memory_store(config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut handled: u64 = 0;

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read request from stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match Request::parse(&line) {
            Ok(request) => engine.handle(request),
            Err(e) => {
                error!("❌ Malformed request: {}", e);
                Response::Error((&e).into())
            }
        };

        serde_json::to_writer(&mut out, &response).context("Failed to encode response")?;
        writeln!(out).context("Failed to write response")?;
        out.flush().context("Failed to flush stdout")?;
        handled += 1;
    }

    info!("👋 stdin closed after {} requests", handled);
    Ok(())
}

fn print_banner(config: &EngineConfig) {
    info!("╔════════════════════════════════════════════╗");
    info!("║          🧠 STPF DECISION ENGINE 🧠         ║");
    info!("╚════════════════════════════════════════════╝");
    info!("   Kill threshold: {:.1}", config.scoring.kill_threshold);
    info!("   GO ≥ {} | consider ≥ {}", config.scoring.go_threshold, config.scoring.consider_threshold);
    info!("   Kelly multiplier: {:.2}", config.kelly.kelly_multiplier);
    info!(
        "   Monte Carlo: {} trials, noise {:.2}",
        config.simulation.default_trials, config.simulation.default_noise_std
    );
}
