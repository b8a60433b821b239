//! Dirauth - LDAP authenticator
//!
//! Operational front end for the LDAP authenticator: validate a
//! configuration, or run a single authentication attempt against a live
//! directory.

use clap::{Parser, Subcommand};
use dirauth_core::{Authenticator, LdapConfig};
use dirauth_ldap::LdapAuthenticator;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirauth")]
#[command(author = "Dirauth Team")]
#[command(version = dirauth_core::VERSION)]
#[command(about = "LDAP bind-and-search authenticator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// LDAP server URL
    #[arg(long, env = "DIRAUTH_LDAP_URL")]
    url: Option<String>,

    /// System (service) bind DN
    #[arg(long, env = "DIRAUTH_SYSTEM_DN")]
    system_dn: Option<String>,

    /// System (service) bind password
    #[arg(long, env = "DIRAUTH_SYSTEM_PASSWORD")]
    system_password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRAUTH_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate a principal and print the resolved DN
    Check {
        /// Principal to authenticate (e.g. a mail address)
        principal: String,

        /// Credential; prefer the environment variable over the flag so
        /// the secret stays out of the process list
        #[arg(long, env = "DIRAUTH_CREDENTIAL")]
        credential: String,
    },

    /// Validate the configuration and exit
    ValidateConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &cli.config {
        LdapConfig::from_file(config_path)?
    } else {
        LdapConfig::from_env()
    };

    // Override with CLI args
    if let Some(url) = cli.url {
        config.url = url;
    }
    if let Some(dn) = cli.system_dn {
        config.system_dn = dn;
    }
    if let Some(password) = cli.system_password {
        config.system_password = password;
    }

    match cli.command {
        Commands::ValidateConfig => {
            config.validate()?;
            info!(url = %config.url, "configuration is valid");
            println!("ok");
        }
        Commands::Check {
            principal,
            credential,
        } => {
            let authenticator = LdapAuthenticator::new(&config)?;
            match authenticator.authenticate(&principal, &credential).await {
                Some(user_dn) => println!("{user_dn}"),
                None => {
                    eprintln!("authentication failed");
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
