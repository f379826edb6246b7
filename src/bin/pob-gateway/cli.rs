//! Command-line interface definition.

use clap::{Parser, Subcommand};
use pob_gateway::config::GatewayConfig;
use std::path::PathBuf;

/// Verification and randomness gateway for the Proof of Becoming app.
#[derive(Parser, Debug)]
#[command(name = "pob-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Entropy endpoint URL.
    #[arg(long, env = "POB_ENTROPY_URL")]
    pub entropy_url: Option<String>,

    /// Vision classifier API key.
    #[arg(long, env = "POB_CLASSIFIER_API_KEY")]
    pub classifier_api_key: Option<String>,

    /// Content store API URL.
    #[arg(long, env = "POB_STORAGE_API_URL")]
    pub storage_api_url: Option<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Gateway operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a random seed.
    Seed {
        /// Seed size in bytes.
        #[arg(long, default_value_t = 32, value_parser = clap::value_parser!(u64).range(16..=128))]
        size: u64,
    },

    /// Verify a proof submission.
    Verify {
        /// Goal identifier.
        #[arg(long)]
        goal_id: String,

        /// Reflection text.
        #[arg(long)]
        reflection: String,

        /// Path to the proof image.
        #[arg(long)]
        image: PathBuf,

        /// Path to an optional second image.
        #[arg(long)]
        second_image: Option<PathBuf>,
    },

    /// Pin a file's contents to the content store.
    Pin {
        /// File to pin (already encrypted by the caller).
        file: PathBuf,
    },

    /// Retrieve pinned content by identifier.
    Get {
        /// Content identifier.
        cid: String,

        /// Write the bytes to this file instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    /// Build the gateway configuration from file and CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file is specified but cannot be loaded.
    pub fn gateway_config(&self) -> color_eyre::Result<GatewayConfig> {
        // Start from the named file, the default location, or defaults
        let mut config = if let Some(ref path) = self.config {
            GatewayConfig::from_file(path)?
        } else {
            let default_path = pob_gateway::config::default_config_path();
            if default_path.exists() {
                GatewayConfig::from_file(&default_path)?
            } else {
                GatewayConfig::default()
            }
        };

        // Override with CLI arguments
        if let Some(ref url) = self.entropy_url {
            config.entropy.endpoint.clone_from(url);
        }
        if let Some(ref key) = self.classifier_api_key {
            config.classifier.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.storage_api_url {
            config.storage.api_url.clone_from(url);
        }
        config.log_level.clone_from(&self.log_level);

        Ok(config)
    }
}
