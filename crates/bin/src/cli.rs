//! CLI argument definitions for the Ulpan binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Ulpan API server
#[derive(Parser, Debug)]
#[command(name = "ulpan")]
#[command(about = "Ulpan: language-learning state and vendor API server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Ulpan API server
    Serve(ServeArgs),
    /// Check health of a running Ulpan server
    Health(HealthArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "ULPAN_PORT")]
    pub port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "ULPAN_HOST")]
    pub host: String,

    /// Data directory for the JSON-persisted document store
    #[arg(short = 'D', long, env = "ULPAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Application origin used for checkout success/cancel redirects
    #[arg(long, default_value = "http://localhost:3000", env = "ULPAN_DOMAIN")]
    pub domain: Url,

    /// Payment vendor API secret key
    #[arg(long, env = "ULPAN_PAYMENT_SECRET_KEY", hide_env_values = true)]
    pub payment_secret_key: String,

    /// Payment webhook endpoint secret
    #[arg(long, env = "ULPAN_PAYMENT_WEBHOOK_SECRET", hide_env_values = true)]
    pub payment_webhook_secret: String,

    /// Speech vendor API key
    #[arg(long, env = "ULPAN_SPEECH_API_KEY", hide_env_values = true)]
    pub speech_api_key: String,

    /// Translation vendor API key
    #[arg(long, env = "ULPAN_TRANSLATE_API_KEY", hide_env_values = true)]
    pub translate_api_key: String,

    /// Payment vendor API origin
    #[arg(
        long,
        default_value = "https://api.stripe.com",
        env = "ULPAN_PAYMENT_API_BASE"
    )]
    pub payment_api_base: Url,

    /// Speech vendor API origin
    #[arg(
        long,
        default_value = "https://api.elevenlabs.io",
        env = "ULPAN_SPEECH_API_BASE"
    )]
    pub speech_api_base: Url,

    /// Translation vendor API origin
    #[arg(
        long,
        default_value = "https://api.openai.com",
        env = "ULPAN_TRANSLATE_API_BASE"
    )]
    pub translate_api_base: Url,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the server to check
    #[arg(long, default_value = "http://127.0.0.1:3000", env = "ULPAN_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}
