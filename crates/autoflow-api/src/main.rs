//! autoflow CLI and REST API entry point.
//!
//! Binary name: `autoflow`
//!
//! Parses CLI arguments, initializes tracing, the database, and services,
//! then dispatches to the command handler or starts the server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use autoflow_observe::tracing_setup::{init_tracing, shutdown_tracing, TracingOptions};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need tracing or app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "autoflow", &mut std::io::stdout());
        return Ok(());
    }

    let serving = matches!(cli.command, Commands::Serve { .. });
    let default_filter = if serving && cli.verbose == 0 && !cli.quiet {
        "info"
    } else {
        TracingOptions::filter_for_verbosity(cli.verbose, cli.quiet)
    };
    init_tracing(TracingOptions {
        otel: std::env::var("AUTOFLOW_OTEL").is_ok_and(|v| v == "1" || v == "true"),
        json: cli.json && serving,
        default_filter: default_filter.to_string(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let state = AppState::init(cli.config.as_deref()).await?;

    let result = match cli.command {
        Commands::Workflow { action } => {
            cli::workflow::handle_workflow_command(action, &state, cli.json).await
        }
        Commands::Reconcile => cli::scheduler::reconcile(&state, cli.json).await,
        Commands::Serve { port, host } => serve(state, host, port).await,
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

/// Start the scheduler, serve the API, and stop both on shutdown.
async fn serve(state: AppState, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| state.config.server.host.clone());
    let port = port.unwrap_or(state.config.server.port);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    state.scheduler.start().await?;
    let pending = state.scheduler.pending_jobs().await.len();

    println!(
        "  {} autoflow API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {} scheduled workflow(s) pending", pending);
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let scheduler = state.scheduler.clone();
    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await?;
    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    tracing::info!("shutdown signal received");
}
