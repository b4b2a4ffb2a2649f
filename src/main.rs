mod capture;
mod device;
mod error;
mod ops;
mod output;
mod temp;
mod web;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capture::FormatPolicy;
use device::{Backend, DeviceSpec};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch the web front end
    App {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 7860)]
        port: u16,
    },
    /// List attached capture devices
    Cameras {
        /// Backend to enumerate (CAP_ANY, CAP_V4L2, CAP_MSMF, ...)
        #[arg(long, default_value = "CAP_ANY")]
        backend: String,
    },
    /// Capture a single still image
    Image {
        /// Output file (.jpg or .png)
        output: PathBuf,

        /// Device spec: index[,backend[,width,height[,fps]]]
        #[arg(default_value = "")]
        device: String,

        /// Fail instead of falling back when the device cannot honor the
        /// requested format
        #[arg(long)]
        strict_format: bool,
    },
    /// Record a video clip
    Video {
        /// Output file (.mp4 or .avi)
        output: PathBuf,

        /// Device spec: index[,backend[,width,height[,fps]]]
        #[arg(default_value = "")]
        device: String,

        /// Recording length in seconds
        #[arg(long, default_value_t = 15.0)]
        duration: f64,

        /// Fail instead of falling back when the device cannot honor the
        /// requested format
        #[arg(long)]
        strict_format: bool,
    },
}

fn policy(strict: bool) -> FormatPolicy {
    if strict {
        FormatPolicy::Strict
    } else {
        FormatPolicy::Fallback
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::App { host, port } => web::serve(&host, port).await,
        Command::Cameras { backend } => {
            let backend: Backend = backend.parse()?;
            let entries = tokio::task::spawn_blocking(move || capture::list_cameras(backend))
                .await
                .context("Camera scan task failed")??;
            if entries.is_empty() {
                println!("No cameras found");
            }
            for entry in entries {
                println!("{}: {} ({})", entry.index, entry.name, entry.description);
            }
            Ok(())
        }
        Command::Image {
            output,
            device,
            strict_format,
        } => {
            let spec = DeviceSpec::parse(&device)?;
            let policy = policy(strict_format);
            tokio::task::spawn_blocking(move || ops::capture_image(&spec, &output, policy))
                .await
                .context("Capture task failed")?
                .context("Image capture failed")?;
            Ok(())
        }
        Command::Video {
            output,
            device,
            duration,
            strict_format,
        } => {
            anyhow::ensure!(
                duration.is_finite() && duration > 0.0,
                "duration must be positive"
            );
            let spec = DeviceSpec::parse(&device)?;
            let policy = policy(strict_format);

            // Ctrl-C raises the stop flag; the recording loop drains and the
            // writer/session close sequence still runs.
            let stop = Arc::new(AtomicBool::new(false));
            let flag = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("Interrupt received, finishing recording");
                    flag.store(true, Ordering::Relaxed);
                }
            });

            let duration = Duration::from_secs_f64(duration);
            tokio::task::spawn_blocking(move || {
                ops::capture_video(&spec, &output, duration, policy, &stop)
            })
            .await
            .context("Capture task failed")?
            .context("Video capture failed")?;
            Ok(())
        }
    }
}
