//! Process bootstrap: parses the CLI, loads configuration, wires up the
//! AMQP transport, and runs the session engine to completion.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pi_core::SystemClock;
use pi_server::transport::amqp::AmqpTransport;
use pi_server::{Config, SessionEngine};
use tracing::{error, info};

/// PI -- stateful AMQP session manifest aggregator.
#[derive(Debug, Parser)]
struct Cli {
    /// Path to the YAML configuration document.
    #[arg(long, default_value = "config.yml")]
    config: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %cli.config, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let uri = format!(
        "amqp://{}:{}@{}:5672/%2f",
        config.rabbitmq_user, config.rabbitmq_password, config.rabbitmq_host
    );
    let transport = match AmqpTransport::connect(&uri).await {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "failed to connect to RabbitMQ");
            return ExitCode::FAILURE;
        }
    };

    let clock = Arc::new(SystemClock);
    let mut engine = SessionEngine::new(transport, clock, config);

    let result = tokio::select! {
        result = engine.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt, shutting down");
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "engine exited with an error");
            ExitCode::FAILURE
        }
    }
}
