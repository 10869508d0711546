//! roundsync
//!
//! Joins the current round on the configured server and logs every round
//! snapshot, result and error until Ctrl-C.
//!
//! Usage:
//!   roundsync                                      # anonymous, localhost
//!   ROUNDSYNC__AUTH__TOKEN=... roundsync           # as a player
//!   ROUNDSYNC__LOGGING__JSON=true roundsync        # JSON log lines

use std::sync::Arc;
use tracing::{info, warn};

use roundsync::adapters::credentials::InMemoryCredentialStore;
use roundsync::adapters::http::HttpGameApi;
use roundsync::adapters::websocket::TungsteniteConnector;
use roundsync::application::{LeaderboardService, SessionClient, StatsService};
use roundsync::config::{AppConfig, LoggingConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging);

    let credentials = Arc::new(InMemoryCredentialStore::from_credential(
        config.auth.credential(),
    ));
    let api = Arc::new(HttpGameApi::new(
        config.api.http_config(),
        credentials.clone(),
    )?);

    let stats = Arc::new(StatsService::new(api.clone()));
    stats.model().subscribe(|state| {
        if let Some(stats) = &state.data {
            info!(
                username = %stats.username,
                wins = stats.wins,
                games_played = stats.games_played,
                win_rate = stats.win_rate_percent(),
                "stats updated"
            );
        }
    });

    let client = SessionClient::new(
        config.connection.client_config(),
        Arc::new(TungsteniteConnector::default()),
    )?
    .with_stats_refresh(stats.clone());

    client.on_connection_change(|state| info!(state = %state, "connection"));
    client.on_change(|snapshot| match snapshot {
        Some(round) => info!(
            round_id = %round.round_id,
            active = round.is_active,
            players = round.player_count,
            time_remaining = round.time_remaining,
            "round"
        ),
        None => info!("round view cleared"),
    });
    client.on_outcome(|outcome| {
        info!(
            round_id = ?outcome.round_id,
            winning_number = outcome.winning_number,
            winners = ?outcome.winners,
            "round result"
        )
    });
    client.on_error(|error| warn!(error = %error, "session error"));

    info!(endpoint = %config.connection.ws_url, "joining");
    client.join_with_provider(credentials.as_ref());

    let leaderboard = LeaderboardService::new(api.clone());
    leaderboard.load().await;
    let board = leaderboard.model().state();
    match (board.data, board.error) {
        (Some(entries), _) => {
            for entry in entries {
                info!(rank = entry.rank, username = %entry.username, wins = entry.wins, "leaderboard");
            }
        }
        (None, Some(error)) => warn!(%error, "leaderboard unavailable"),
        (None, None) => {}
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    client.leave();

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let builder = tracing_subscriber::fmt().with_env_filter(logging.env_filter());
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
