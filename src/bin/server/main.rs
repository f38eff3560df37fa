//! Medicine-box label extraction server and CLI.
//!
//! # Usage
//!
//! ## CLI mode
//! ```bash
//! medbox-ocr-server extract --front front.jpg --back back.jpg
//! medbox-ocr-server extract --front "https://example.com/box.jpg" --output json
//! ```
//!
//! ## Server mode
//! ```bash
//! medbox-ocr-server serve --port 8080
//! ```

mod cli;
mod config;
mod fetch;
mod server;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "medbox-ocr-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Drug-label extraction via CLI or HTTP server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process one front (and optionally back) image via CLI
    Extract {
        /// Front image: local path or URL
        #[arg(long)]
        front: String,

        /// Back image: local path or URL
        #[arg(long)]
        back: Option<String>,

        /// Tesseract data directory
        #[arg(long = "tessdata-dir", env = "MEDBOX_TESSDATA")]
        tessdata_dir: Option<PathBuf>,

        /// Fail startup when a language pack is missing
        #[arg(long)]
        strict_languages: bool,

        /// Output format (json, pretty)
        #[arg(long, default_value = "pretty")]
        output: String,
    },
    /// Start the HTTP server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0", env = "MEDBOX_HOST")]
        host: String,

        /// Port to listen on
        #[arg(long, short, default_value = "8080", env = "MEDBOX_PORT")]
        port: u16,

        /// Tesseract data directory
        #[arg(long = "tessdata-dir", env = "MEDBOX_TESSDATA")]
        tessdata_dir: Option<PathBuf>,

        /// Fail startup when a language pack is missing
        #[arg(long)]
        strict_languages: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    medbox_ocr::utils::init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            front,
            back,
            tessdata_dir,
            strict_languages,
            output,
        } => {
            let engines = config::EngineConfig {
                tessdata_dir,
                strict_languages,
            };
            cli::run_extract(&front, back.as_deref(), &engines, &output).await?;
        }
        Commands::Serve {
            host,
            port,
            tessdata_dir,
            strict_languages,
        } => {
            let config = config::ServerConfig {
                engines: config::EngineConfig {
                    tessdata_dir,
                    strict_languages,
                },
                host,
                port,
            };

            info!("Starting server on {}:{}", config.host, config.port);
            server::run_server(config).await?;
        }
    }

    Ok(())
}
