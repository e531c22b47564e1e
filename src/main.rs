//! billing-reconciler binary.
//!
//! ```text
//! billing-reconciler            # serve the webhook endpoint
//! billing-reconciler replay [N] # replay up to N pending dead letters
//! ```

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use billing_reconciler::application::{ReplayFailedStepsCommand, DEFAULT_REPLAY_LIMIT};
use billing_reconciler::bootstrap::{self, Application};
use billing_reconciler::config::AppConfig;

enum Command {
    Serve,
    Replay { limit: u32 },
}

fn parse_command(mut args: impl Iterator<Item = String>) -> Result<Command, String> {
    match args.next().as_deref() {
        None | Some("serve") => Ok(Command::Serve),
        Some("replay") => {
            let limit = match args.next() {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| format!("replay limit must be a positive integer, got {raw}"))?,
                None => DEFAULT_REPLAY_LIMIT,
            };
            Ok(Command::Replay { limit })
        }
        Some(other) => Err(format!("unknown command {other}; expected serve or replay [limit]")),
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

async fn serve(app: Application, config: &AppConfig) -> Result<(), String> {
    let addr = config.server.socket_addr().map_err(|e| e.to_string())?;
    let router = app
        .router()
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "Listening for webhook deliveries");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("server error: {e}"))
}

async fn replay(app: Application, limit: u32) -> Result<(), String> {
    let handler = app
        .replay_handler()
        .ok_or("payment provider is not configured; nothing can be replayed")?;
    let summary = handler
        .handle(ReplayFailedStepsCommand { limit })
        .await
        .map_err(|e| format!("replay failed: {e}"))?;

    println!(
        "attempted={} resolved={} still_failing={}",
        summary.attempted, summary.resolved, summary.still_failing
    );
    Ok(())
}

async fn run(command: Command) -> Result<(), String> {
    let config = AppConfig::load().map_err(|e| e.to_string())?;
    config.validate().map_err(|e| format!("invalid configuration: {e}"))?;
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting billing-reconciler"
    );

    let app = bootstrap::build(&config).await.map_err(|e| e.to_string())?;

    match command {
        Command::Serve => serve(app, &config).await,
        Command::Replay { limit } => replay(app, limit).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let command = match parse_command(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::from(2);
        }
    };

    match run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            tracing::error!(error = %message, "billing-reconciler exited with an error");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
