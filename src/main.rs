use anyhow::{Context, Result};
use convergence::{
    api::routes::create_app,
    cli::{output::Output, Cli, Commands},
    sweep::Sweeper,
    utils::toml_config::{ConvergenceConfig, LogFormat},
    AppState,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = match load_config(&cli, &output) {
        Ok(config) => config,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    match &cli.command {
        Some(Commands::Config { validate }) => {
            show_config(&output, &cli, &config, *validate);
            Ok(())
        }
        Some(Commands::Serve) | None => {
            output.banner();
            output.print_startup_summary(&config);
            serve(config, cli.verbose).await
        }
    }
}

fn load_config(cli: &Cli, output: &Output) -> Result<ConvergenceConfig> {
    let path = cli.config_path();
    if cli.uses_default_config() && !path.exists() {
        output.info(&format!("No {} found, using defaults", path.display()));
    }

    let mut config = cli
        .read_config()
        .with_context(|| format!("Failed to load {}", path.display()))?;
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(config)
}

fn show_config(output: &Output, cli: &Cli, config: &ConvergenceConfig, validate: bool) {
    let path = cli.config_path();
    if validate {
        output.success(&format!("{} is valid", path.display()));
        output.kv("bind", &config.bind_address());
        return;
    }

    output.header("Configuration");
    if !path.exists() {
        output.warning("Config file not found, showing defaults");
    }
    match config.to_toml() {
        Ok(rendered) => println!("\n{}", rendered),
        Err(e) => output.error(&format!("Failed to render configuration: {}", e)),
    }
    output.hint("HOST and PORT in the environment override the file");
}

fn init_tracing(config: &ConvergenceConfig, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .context("Invalid log filter")?;

    let registry = tracing_subscriber::registry().with(filter);
    match config.server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
    .context("Failed to initialize tracing")
}

async fn serve(config: ConvergenceConfig, verbose: bool) -> Result<()> {
    init_tracing(&config, verbose)?;

    let state = AppState::new(config);
    let config = state.config.clone();

    if config.sweep.enabled {
        let sweeper = Arc::new(Sweeper::new(
            state.coordinator.clone(),
            config.sweep.clone(),
        ));
        sweeper.spawn();
        info!(
            interval_secs = config.sweep.interval_secs,
            "Sweeper started"
        );
    }

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Convergence listening on {}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
