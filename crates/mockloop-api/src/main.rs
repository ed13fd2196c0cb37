//! Mockloop CLI and REST API entry point.
//!
//! Binary name: `mockloop`
//!
//! Parses CLI arguments, initializes the database and interview engine, then
//! dispatches to the appropriate command handler or starts the REST API server.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use mockloop_types::interview::{StartInterviewRequest, TurnInput};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity; RUST_LOG wins when set.
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,mockloop=debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "mockloop", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = run(&state, cli).await;

    // Queued cache refreshes must land before the process exits so the next
    // invocation can resume from them.
    state.interview_service.flush_cache().await;

    result
}

async fn run(state: &AppState, cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Start {
            user,
            position,
            name,
            resume,
            resume_file,
            provider,
        } => {
            let resume = match (resume, resume_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path).await?,
                (None, None) => anyhow::bail!("either --resume or --resume-file is required"),
            };
            let request = StartInterviewRequest {
                user_id: user,
                position,
                provider,
                interview_name: name,
                resume,
            };
            cli::interview::start_interview(state, request, cli.json).await?;
        }

        Commands::Answer { id, text, question } => {
            let input = TurnInput {
                answer: text,
                question_id: question,
            };
            cli::interview::answer(state, id, input, cli.json).await?;
        }

        Commands::End { id } => {
            cli::interview::end_interview(state, id, cli.json).await?;
        }

        Commands::List { user } => {
            cli::interview::list_interviews(state, user, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::interview::show_interview(state, id, cli.json).await?;
        }

        Commands::Questions { id } => {
            cli::interview::show_questions(state, id, cli.json).await?;
        }

        Commands::Serve { port, host } => {
            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;

            println!(
                "  {} Mockloop API listening on {}",
                console::style("⚡").bold(),
                console::style(format!("http://{addr}")).cyan()
            );
            println!(
                "  {}",
                console::style(format!("Data directory: {}", state.data_dir.display())).dim()
            );
            println!("  {}", console::style("Press Ctrl+C to stop").dim());

            let router = http::router::build_router(state.clone());

            axum::serve(listener, router)
                .with_graceful_shutdown(shutdown_signal())
                .await?;

            println!("\n  Server stopped.");
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
