//! pogo - headless game client
//!
//! Logs in, keeps a session polling and reports the world state, with every
//! remote exchange served from a recorded exchange log.

mod config;

use anyhow::{bail, Context, Result};
use config::{ClientConfig, DEFAULT_CONFIG_PATH};
use pogo_client::{FileCredentialStore, LocationFeed, SessionManager, SessionOptions};
use pogo_core::AuthProvider;
use pogo_net::{
    Blake3Sealer, RecordingTransport, ReplayTransport, RpcClient, RpcTransport, SignedPosition,
};
use std::{env, path::PathBuf, sync::Arc};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliOptions::parse(env::args().skip(1));
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = ClientConfig::read(&config_path);

    // RUST_LOG wins over the configured filter.
    let log_filter = loaded
        .as_ref()
        .map(|cfg| cfg.log_filter.clone())
        .unwrap_or_else(|_| ClientConfig::default().log_filter);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_filter)),
        )
        .init();

    info!("Starting pogo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = match loaded {
        Ok(config) => config,
        Err(err) => {
            if config::is_missing_default(&config_path, &err) {
                warn!(
                    "Client config not found at {}. Using defaults",
                    config_path.display()
                );
            } else {
                warn!("{err:#}. Using defaults");
            }
            ClientConfig::default()
        }
    };
    cli.apply(&mut config);

    let replay_path = match config.replay_path.clone() {
        Some(path) => path,
        None => bail!("No exchange log to serve the session from; pass --replay <path>"),
    };
    let replay = ReplayTransport::load(&replay_path)?;
    let transport: Arc<dyn RpcTransport> = match &cli.record {
        Some(path) => {
            info!(path = %path.display(), "Recording exchanges");
            Arc::new(RecordingTransport::create(replay, path)?)
        }
        None => Arc::new(replay),
    };

    let credentials = Arc::new(
        FileCredentialStore::open(&config.credentials_path).with_context(|| {
            format!(
                "Failed to open credential store {}",
                config.credentials_path.display()
            )
        })?,
    );

    let client = RpcClient::new(
        transport,
        Arc::new(config.device.clone()),
        Arc::new(Blake3Sealer),
    );
    let position = config.position;
    client
        .set_position(SignedPosition {
            latitude: position.latitude,
            longitude: position.longitude,
            altitude: position.altitude,
            accuracy: position.accuracy,
        })
        .await;

    let options = SessionOptions {
        cache_path: config.cache_path.clone(),
        poll_interval: config.poll_interval(),
    };
    let feed = LocationFeed::new(position.geoposition());
    let mut session = SessionManager::new(client, credentials, feed, options);

    let logged_in = match (&config.account.username, &config.account.password) {
        (Some(username), Some(password)) => {
            session
                .login(config.account.provider, username, password)
                .await?
        }
        (Some(_), None) => bail!("A username was given without a password"),
        _ => session.initialize_session().await?,
    };
    if !logged_in {
        bail!("Login failed: the auth provider issued no token");
    }

    session.start_data_update().await?;
    if let Some(profile) = session.update_profile().await? {
        info!(username = %profile.username, "Profile loaded");
    }
    if session.update_player_stats(true).await?.is_some() {
        info!("Level-up rewards collected");
    }
    session.toggle_update_timer(true).await?;

    let mut failures = 0u64;
    let shutdown = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Failed to listen for interrupt");
            std::future::pending::<()>().await;
        }
    };
    let ticks = session
        .run(shutdown, config.max_ticks, |_| failures += 1)
        .await;

    let map = session.map();
    let inventory = session.inventory();
    info!(
        ticks,
        failures,
        catchable = map.catchable().len(),
        pokestops = map.pokestops().len(),
        pokemons = inventory.pokemons().len(),
        eggs = inventory.eggs().len(),
        level = session.player_stats().map(|s| s.level),
        "Session finished"
    );
    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    replay: Option<PathBuf>,
    record: Option<PathBuf>,
    max_ticks: Option<u64>,
    username: Option<String>,
    password: Option<String>,
    provider: Option<AuthProvider>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        error!("--config requires a file path");
                    }
                }
                "--replay" => {
                    if let Some(path) = args.next() {
                        opts.replay = Some(PathBuf::from(path));
                    } else {
                        error!("--replay requires a file path");
                    }
                }
                "--record" => {
                    if let Some(path) = args.next() {
                        opts.record = Some(PathBuf::from(path));
                    } else {
                        error!("--record requires a file path");
                    }
                }
                "--max-ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.max_ticks = Some(value),
                            Err(err) => {
                                error!(%err, value = %raw, "--max-ticks must be an integer");
                            }
                        }
                    } else {
                        error!("--max-ticks requires an integer");
                    }
                }
                "--username" => opts.username = args.next(),
                "--password" => opts.password = args.next(),
                "--provider" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<AuthProvider>() {
                            Ok(provider) => opts.provider = Some(provider),
                            Err(err) => error!(%err, "--provider must be ptc or google"),
                        }
                    } else {
                        error!("--provider requires ptc or google");
                    }
                }
                other => warn!(arg = other, "Ignoring unknown argument"),
            }
        }

        opts
    }

    /// Command-line values override the config file.
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(path) = &self.replay {
            config.replay_path = Some(path.clone());
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = Some(max_ticks);
        }
        if let Some(username) = &self.username {
            config.account.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.account.password = Some(password.clone());
        }
        if let Some(provider) = self.provider {
            config.account.provider = provider;
        }
    }
}
