//! IOU network CLI.
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use iou_app::{IouApp, IouConfig};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Subcommand)]
enum Command {
    /// Starts the configured nodes and serves the HTTP API
    Run,
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// The level of logging to use for the server
    #[clap(long, global = true, default_value = tracing::Level::INFO.as_str())]
    log_level: tracing::Level,

    /// Do not write a log file next to the console output
    #[clap(long, global = true)]
    no_log_file: bool,
}

impl Cli {
    fn init_logging(&self) -> Result<Option<WorkerGuard>> {
        let filter =
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // axum logs rejections from built-in extractors with the `axum::rejection`
                // target, at `TRACE` level. `axum::rejection=trace` enables showing those events
                format!(
                    "iou_cli={level},iou_app={level},iou_server={level},iou_flows={level},iou_store={level},iou_predicate={level},axum::rejection=trace",
                    level = self.log_level
                )
                .into()
            });

        let (file_layer, guard) = match self.log_dir() {
            Some(dir) => {
                let appender = tracing_appender::rolling::daily(dir, "iou.log");
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer);
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        // also installs the `log` to `tracing` bridge
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .with(file_layer)
            .try_init()
            .context("failed to install the tracing subscriber")?;

        Ok(guard)
    }

    fn log_dir(&self) -> Option<std::path::PathBuf> {
        if self.no_log_file {
            return None;
        }
        ProjectDirs::from("org", "iou", "iou").map(|dirs| dirs.data_local_dir().join("logs"))
    }

    pub async fn execute(&self) -> Result<()> {
        let _guard = self.init_logging()?;

        info!("started with {:?}", self);

        match &self.command {
            Command::Run => Ok(IouApp::new(IouConfig::new()?).run().await?),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup human panic
    human_panic::setup_panic!();

    Cli::parse().execute().await
}
