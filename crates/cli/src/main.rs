use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rc_cli::cli::{commands, Cli, Command, ConfigCommand};
use rc_domain::config::ObservabilityConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Config(ConfigCommand::Validate) => {
            let (config, config_path) = rc_cli::cli::load_config()?;
            let valid = rc_cli::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Config(ConfigCommand::Show) => {
            let (config, _config_path) = rc_cli::cli::load_config()?;
            rc_cli::cli::config::show(&config)
        }
        Command::Version => {
            println!("recurra {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let (config, _) = rc_cli::cli::load_config()?;
            init_cli_tracing(&config.observability);
            rc_cli::cli::config::check(&config)?;
            commands::run(command, &config, cli.json)
        }
    }
}

/// Initialize stderr-only tracing so stdout stays clean for command output.
///
/// `RUST_LOG` wins over the configured `log_filter`.
fn init_cli_tracing(obs: &ObservabilityConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&obs.log_filter));

    if obs.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
