use anyhow::{bail, Context, Result};
use clap::{Arg, Command};
use nullspace_client::Client;
use nullspace_randotron::{Config, Monitor, Orchestrator, TournamentContext};
use std::{str::FromStr, time::Duration};
use tracing::{info, warn, Level};

fn main() -> Result<()> {
    // Parse arguments
    let matches = Command::new("randotron")
        .about("Run a fleet of bots that play nullspace casino games.")
        .arg(Arg::new("config").long("config").required(true))
        .get_matches();

    // Load from config file
    let Some(config_file) = matches.get_one::<String>("config") else {
        bail!("missing --config");
    };
    let config_file = std::fs::read_to_string(config_file)
        .with_context(|| format!("could not read config file {config_file}"))?;
    let config: Config =
        serde_yaml::from_str(&config_file).context("could not parse config file")?;
    config.validate()?;

    // Setup logging
    let level = Level::from_str(&config.log_level).context("invalid log level")?;
    tracing_subscriber::fmt().with_max_level(level).init();

    // Initialize runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .enable_all()
        .build()
        .context("failed to build runtime")?;
    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    if !config.fleet.enabled {
        info!("fleet disabled, exiting");
        return Ok(());
    }
    info!(
        base_url = config.base_url,
        population_size = config.fleet.population_size,
        interval_ms = config.fleet.interval_ms,
        tournament = ?config.tournament_id,
        "starting randotron"
    );

    let client = Client::new(&config.base_url)?;
    let (orchestrator, monitor) = Orchestrator::new(client, config.fleet.clone(), config.seed()?);
    let orchestrator = orchestrator.with_creation_delay(config.creation_delay());

    let tournament = config.tournament_id.map(|id| TournamentContext { id });
    let prepared = orchestrator
        .prepare(config.fleet.population_size, tournament)
        .await;
    if prepared == 0 {
        bail!("no agents could be prepared");
    }
    orchestrator.start_playing();

    let reporting = tokio::spawn(report(
        monitor.clone(),
        Duration::from_secs(config.status_interval_secs),
    ));
    match config.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => info!(secs, "run finished"),
                _ = tokio::signal::ctrl_c() => info!("interrupted"),
            }
        }
        None => {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(?err, "failed to listen for ctrl-c");
            }
            info!("interrupted");
        }
    }

    orchestrator.stop();
    orchestrator.join().await;
    reporting.abort();

    let status = monitor.snapshot();
    info!(
        total_submitted = status.total_submitted,
        "stopped randotron"
    );
    Ok(())
}

/// Log the fleet status every `interval`.
async fn report(monitor: Monitor, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    let mut last = 0;
    loop {
        ticker.tick().await;
        let status = monitor.snapshot();
        info!(
            running = status.is_running,
            active_agents = status.active_agents,
            total_submitted = status.total_submitted,
            since_last = status.total_submitted.saturating_sub(last),
            "fleet status"
        );
        last = status.total_submitted;
    }
}
