//! pob-gateway CLI entry point.

mod cli;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clap::Parser;
use cli::{Cli, Command};
use color_eyre::eyre::eyre;
use pob_gateway::verify::VerificationRequest;
use pob_gateway::Gateway;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    info!("pob-gateway v{}", env!("CARGO_PKG_VERSION"));

    // Build configuration and gateway
    let config = cli.gateway_config()?;
    let gateway = Gateway::new(config)?;

    match cli.command {
        Command::Seed { size } => {
            let seed = gateway.generate_seed(usize::try_from(size)?).await;
            println!("{}", serde_json::to_string_pretty(&seed)?);
        }

        Command::Verify {
            goal_id,
            reflection,
            image,
            second_image,
        } => {
            let request = VerificationRequest {
                goal_id,
                reflection,
                image_data_url: image_data_url(&image)?,
                second_image_data_url: second_image
                    .as_deref()
                    .map(image_data_url)
                    .transpose()?,
            };
            let result = gateway.verify(&request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Pin { file } => {
            let bytes = std::fs::read(&file)?;
            let receipt = gateway.pin(&BASE64.encode(bytes)).await?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }

        Command::Get { cid, output } => {
            let bytes = gateway.retrieve(&cid).await?;
            if let Some(path) = output {
                std::fs::write(&path, &bytes)?;
                info!("wrote {} bytes to {}", bytes.len(), path.display());
            } else {
                println!("{}", BASE64.encode(&bytes));
            }
        }
    }

    Ok(())
}

/// Read an image file into a base64 data URL.
fn image_data_url(path: &Path) -> color_eyre::Result<String> {
    let subtype = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("png") => "png",
        Some("jpg") => "jpg",
        Some("jpeg") => "jpeg",
        Some("gif") => "gif",
        Some("webp") => "webp",
        _ => {
            return Err(eyre!(
                "unsupported image type: {} (expected png/jpeg/gif/webp)",
                path.display()
            ))
        }
    };

    let bytes = std::fs::read(path)?;
    Ok(format!(
        "data:image/{subtype};base64,{}",
        BASE64.encode(bytes)
    ))
}
