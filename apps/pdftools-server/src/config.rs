//! Command-line and environment configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::Level;

/// Command-line arguments for the PDF tools server
#[derive(Parser, Debug, Clone)]
#[command(name = "pdftools-server")]
#[command(about = "PDF tools web service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Directory holding `uploads/` and `outputs/`
    #[arg(long, env = "DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Directory with the front-end page
    #[arg(long, env = "STATIC_DIR", default_value = "static")]
    pub static_dir: PathBuf,

    /// Maximum request body size in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "50")]
    pub max_upload_mb: u64,

    /// Age after which the sweeper deletes a temp file
    #[arg(long, env = "MAX_FILE_AGE_SECS", default_value = "3600")]
    pub max_file_age_secs: u64,

    /// Seconds between sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "600")]
    pub sweep_interval_secs: u64,

    /// poppler `pdftoppm` binary
    #[arg(long, env = "PDFTOPPM", default_value = "pdftoppm")]
    pub pdftoppm: PathBuf,

    /// Tesseract binary
    #[arg(long, env = "TESSERACT", default_value = "tesseract")]
    pub tesseract: PathBuf,

    /// Runtime environment; `production` turns off debug logging
    #[arg(long = "env", env = "APP_ENV", default_value = "development")]
    pub app_env: String,
}

/// Validated settings handed to the rest of the server.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_mb: u64,
    pub max_file_age: Duration,
    pub sweep_interval: Duration,
    pub pdftoppm: PathBuf,
    pub tesseract: PathBuf,
    pub production: bool,
}

impl ServiceConfig {
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

        if args.max_upload_mb == 0 {
            anyhow::bail!("MAX_UPLOAD_MB must be at least 1");
        }
        if args.sweep_interval_secs == 0 {
            anyhow::bail!("Sweep interval must be at least one second");
        }

        Ok(Self {
            addr,
            data_dir: args.data_dir,
            static_dir: args.static_dir,
            max_upload_mb: args.max_upload_mb,
            max_file_age: Duration::from_secs(args.max_file_age_secs),
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
            pdftoppm: args.pdftoppm,
            tesseract: args.tesseract,
            production: args.app_env.eq_ignore_ascii_case("production"),
        })
    }

    pub fn log_level(&self) -> Level {
        if self.production {
            Level::INFO
        } else {
            Level::DEBUG
        }
    }
}
