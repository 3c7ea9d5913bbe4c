use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "dray", about = "dray — shopper presence & geo-clustering gateway")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the presence gateway.
    Gateway {
        /// Override the configured bind address.
        #[arg(long)]
        bind: Option<String>,
        /// Override the configured port.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration.
    Show,
    /// Print the config directory in use.
    Path,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "dray starting");

    match cli.command {
        Commands::Gateway { bind, port } => {
            let mut config = dray_config::discover_and_load();
            if let Some(bind) = bind {
                config.gateway.bind = bind;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }
            dray_gateway::server::start_gateway(config).await
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = dray_config::discover_and_load();
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            },
            ConfigAction::Path => {
                match dray_config::config_dir() {
                    Some(dir) => println!("{}", dir.display()),
                    None => println!("(no config directory resolved)"),
                }
                Ok(())
            },
        },
    }
}
