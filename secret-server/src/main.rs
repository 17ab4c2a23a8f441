//! Prints the fields of a secret.
//!
//! ```text
//! tss <secret-id | secret-path> [--reveal]
//! ```
//!
//! Connection settings are read from the environment (see
//! [`secret_server::config`]).

use anyhow::Context;
use secret_server::{SecretServer, SecretServerConfig, SecretServerError, ServerSecret};
use secret_server_common::{TracingConfig, init_tracing};
use std::process::ExitCode;
use tracing::info;

const MASK: &str = "********";

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing(&TracingConfig::default().with_service_name("tss"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let reveal = args.iter().any(|a| a == "--reveal");
    let Some(target) = args.iter().find(|a| !a.starts_with("--")) else {
        eprintln!("usage: tss <secret-id | secret-path> [--reveal]");
        return Ok(ExitCode::from(2));
    };

    let config = SecretServerConfig::from_env().context("Failed to load configuration")?;
    let secret_server = SecretServer::from_config(&config).context("Failed to create client")?;
    info!(api_url = secret_server.api_url(), "Connecting");

    let result = match target.parse::<i64>() {
        Ok(id) => secret_server.get_secret(id, true).await,
        Err(_) => secret_server.get_secret_by_path(target, true).await,
    };

    match result.and_then(|json| ServerSecret::from_json(&json)) {
        Ok(secret) => {
            print_secret(&secret, reveal);
            Ok(ExitCode::SUCCESS)
        }
        Err(SecretServerError::Client { message, .. }) => {
            eprintln!("{message}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => match err.response() {
            Some(response) => {
                eprintln!("{}", response.text());
                Ok(ExitCode::FAILURE)
            }
            None => Err(err.into()),
        },
    }
}

fn print_secret(secret: &ServerSecret, reveal: bool) {
    println!("name: {}", secret.name);
    println!("template: {}", secret.secret_template_name);
    for (slug, field) in &secret.fields {
        let value = if field.is_password() && !reveal {
            MASK
        } else {
            field.value.as_str()
        };
        println!("{slug}: {value}");
    }
}
