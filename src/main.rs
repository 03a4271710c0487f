use clap::{Parser, Subcommand};
use postboard_client::{
    Client,
    config::{AppConfig, Env},
    models::{LoginData, RegisterData},
    navigation::{GateDecision, Route, gate_for},
};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Postboard session tool: inspect and manage the stored session.
#[derive(Parser)]
#[command(name = "postboard", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the restored session.
    Whoami,
    /// Log in and persist the session.
    Login { username: String, password: String },
    /// Create an account, then log in with it.
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Evaluate the navigation gate for a client path, e.g. `/admin`.
    Check { path: String },
}

/// main
///
/// Initializes configuration, logging and the client (which rehydrates the
/// stored session), then runs one command.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 1. Configuration & Environment Loading
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "postboard_client=debug,reqwest=info".into());

    // 3. Logging format follows the environment: pretty locally, JSON in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::debug!(api = %config.api_base_url, "client starting in {:?} mode", config.env);

    // 4. Client assembly (session restored here)
    let client = match Client::from_config(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "failed to build client");
            return ExitCode::FAILURE;
        }
    };

    // 5. Command dispatch
    let outcome = match cli.command {
        Command::Whoami => {
            match client.session.current_user() {
                Some(user) => tracing::info!(username = %user.username, role = ?user.role, "authenticated"),
                None => tracing::info!("anonymous"),
            }
            Ok(())
        }
        Command::Login { username, password } => client
            .session
            .login(LoginData::new(username, password))
            .await
            .map(|_| ()),
        Command::Register {
            username,
            email,
            password,
        } => client
            .session
            .register(RegisterData::new(username, email, password))
            .await
            .map(|_| ()),
        Command::Logout => {
            client.session.logout();
            Ok(())
        }
        Command::Check { path } => {
            let route = Route::from_path(&path);
            let decision = gate_for(&route).evaluate(&client.session.snapshot());
            match decision {
                GateDecision::Render => tracing::info!(route = %route.path(), "access granted"),
                GateDecision::Redirect(redirect) => {
                    tracing::info!(route = %route.path(), to = %redirect.to.path(), "access denied, redirecting")
                }
                GateDecision::Wait => tracing::info!("session still initializing"),
            }
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}
