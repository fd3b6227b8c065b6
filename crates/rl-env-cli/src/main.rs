//! rl-env environment host
//!
//! Builds one environment by kind, connects it to the simulator and serves
//! the agent protocol on stdin/stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use hector_quad::{QuadOverrides, SensingMode};
use rl_env_core::EnvKind;
use rl_env_server::{EnvOptions, EnvRegistry, HostOptions, RlEnvServer};
use sim_bridge::{BridgeConfig, SimEndpoint};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the rl-env binary
#[derive(Parser, Debug)]
#[command(name = "rl-env", version, about = "Simulated-robot RL environment host")]
struct Cli {
    /// Environment kind
    #[arg(long, default_value = "hectorquad")]
    env: EnvKind,

    /// Seed for the random source
    #[arg(long)]
    seed: Option<u64>,

    /// Build the stochastic version of the domain (default)
    #[arg(long, overrides_with = "deterministic")]
    stochastic: bool,

    /// Build the deterministic version of the domain
    #[arg(long, overrides_with = "stochastic")]
    deterministic: bool,

    /// Steps of action delay (delayed-action domains only)
    #[arg(long, default_value_t = 0)]
    delay: u32,

    /// Verbose logging (debug level unless RUST_LOG is set)
    #[arg(long)]
    prints: bool,

    /// Simulator endpoint: host:port or unix:/path
    #[arg(long, default_value = "127.0.0.1:11347")]
    sim: SimEndpoint,

    /// Sensing strategy: ground-truth or stepping (default: per environment)
    #[arg(long)]
    sensing: Option<SensingMode>,

    /// JSON file with configuration overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Attach a SHA-256 of every observation to state messages
    #[arg(long)]
    hash_states: bool,

    /// Seconds to wait for the simulator to accept the connection
    #[arg(long, default_value_t = 30)]
    connect_timeout: u64,
}

impl Cli {
    fn stochastic(&self) -> bool {
        !self.deterministic
    }

    /// Action delay to warn about, if set for a domain that has none
    fn ignored_delay(&self) -> Option<u32> {
        (self.delay > 0).then_some(self.delay)
    }
}

fn init_logging(prints: bool) {
    let default = if prints { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_overrides(cli: &Cli) -> Result<QuadOverrides> {
    let config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?;
            Some(value)
        }
        None => None,
    };
    Ok(QuadOverrides {
        config,
        sensing: cli.sensing,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.prints);

    info!(
        "rl-env starting: env={}, sim={}, stochastic={}",
        cli.env,
        cli.sim,
        cli.stochastic()
    );

    if let Some(delay) = cli.ignored_delay() {
        warn!(
            "--delay {} ignored: {} applies actions without delay",
            delay, cli.env
        );
    }

    let bridge = BridgeConfig {
        endpoint: cli.sim.clone(),
        connect_timeout: Duration::from_secs(cli.connect_timeout),
        ..BridgeConfig::default()
    };

    let mut registry = EnvRegistry::new();
    hector_quad::register_all(&mut registry, bridge, load_overrides(&cli)?)?;

    let options = EnvOptions {
        seed: cli.seed,
        stochastic: cli.stochastic(),
    };
    let environment = registry.create(cli.env, options).await?;

    let server = RlEnvServer::new(
        environment,
        HostOptions {
            stochastic: cli.stochastic(),
            hash_states: cli.hash_states,
        },
    );
    server.run_stdio().await?;

    info!("rl-env finished");
    Ok(())
}
