use anyhow::Context;
use clap::Parser;
use skyslot_engine::clock::SystemClock;
use skyslot_engine::config::{ConfigLoader, Secrets, SkyslotConfig, parse_utc_offset};
use skyslot_engine::navigator::QuietSettings;
use skyslot_engine::pipeline::{
    DocumentTarget, EXIT_CONFIG, EXIT_WATCHDOG, Pipeline, RunReport, Services, exit_code,
};
use skyslot_engine::renderer::LaunchOptions;
use skyslot_engine::watchdog::Watchdog;
use skyslot_h::HeadlessRenderer;
use skyslot_r::{CloudinaryStore, NotionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "skyslot",
    version,
    about = "Capture forecast panels and publish them into a Notion page"
)]
struct Args {
    /// Config file (defaults to ./skyslot.yaml, then ~/.skyslot/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Launch browser in visible mode (not headless)
    #[arg(long)]
    visible: bool,

    /// Directory for captured PNGs
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Capture and publish only; leave the document untouched
    #[arg(long)]
    skip_sync: bool,

    /// Pretend the local hour is H when deciding on the daily archive record
    #[arg(long, value_name = "H", value_parser = clap::value_parser!(u32).range(0..24))]
    hour: Option<u32>,
}

/// Everything a run needs that can fail before the browser starts.
struct Setup {
    config: SkyslotConfig,
    secrets: Secrets,
    clock: SystemClock,
}

async fn setup(args: &Args) -> anyhow::Result<Setup> {
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)
            .await
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ConfigLoader::load_default()
            .await
            .context("Failed to load config")?,
    };
    let secrets = Secrets::from_env().context("Missing credentials")?;
    let offset = config
        .archive
        .utc_offset
        .as_deref()
        .map(parse_utc_offset)
        .transpose()?;

    Ok(Setup {
        config,
        secrets,
        clock: SystemClock::new(offset),
    })
}

fn log_report(report: &RunReport) {
    info!(
        "Captured {}, published {}, updated {}/{} slot(s)",
        report.captured,
        report.published(),
        report.slots_updated,
        report.slots_discovered
    );
    if !report.skipped_targets.is_empty() {
        info!("Skipped: {}", report.skipped_targets.join(", "));
    }
    if report.slots_failed > 0 {
        info!("{} slot update(s) failed", report.slots_failed);
    }
    if report.recorded {
        info!("Daily archive record created");
    }
}

#[tokio::main]
async fn main() {
    let process_start = tokio::time::Instant::now();

    // Logs go to stderr; stdout stays free for callers that pipe the run.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let Setup {
        config,
        secrets,
        clock,
    } = match setup(&args).await {
        Ok(setup) => setup,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    let watchdog = Watchdog::since(
        process_start,
        Duration::from_millis(config.watchdog.deadline_ms),
    );
    let hard_kill = Watchdog::arm_hard_kill(
        watchdog.remaining() + Duration::from_millis(config.watchdog.grace_ms),
        EXIT_WATCHDOG,
    );

    let quiet = QuietSettings {
        max_inflight: config.page.idle_max_inflight,
        window: Duration::from_millis(config.page.idle_window_ms),
    };
    let services = Services {
        renderer: Arc::new(HeadlessRenderer::new(
            quiet,
            Duration::from_millis(config.page.navigation_timeout_ms),
        )),
        artifacts: Arc::new(
            CloudinaryStore::new(secrets.cloudinary.clone())
                .with_signature_algorithm(config.publish.signature_algorithm),
        ),
        documents: Arc::new(
            NotionStore::new(secrets.notion_token.clone()).with_properties(
                config.archive.title_property.clone(),
                config.archive.date_property.clone(),
            ),
        ),
        clock: Arc::new(clock),
    };
    let target = DocumentTarget {
        root_block_id: secrets.root_block_id.clone(),
        archive_database_id: secrets.archive_database_id.clone(),
    };
    let launch_options = LaunchOptions {
        visible: args.visible,
        executable: secrets.chrome_bin.as_ref().map(PathBuf::from),
        user_data_dir: secrets.user_data_dir.as_ref().map(PathBuf::from),
    };

    let mut pipeline = Pipeline::new(&config, services, target)
        .with_launch_options(launch_options)
        .with_watchdog(watchdog)
        .with_hour_override(args.hour)
        .skip_sync(args.skip_sync);
    if let Some(dir) = args.out_dir {
        pipeline = pipeline.with_output_dir(dir);
    }

    info!("Capturing {}", config.page.url);
    let result = pipeline.run().await;
    hard_kill.disarm();

    match &result {
        Ok(report) => log_report(report),
        Err(e) => error!("Run failed: {}", e),
    }
    std::process::exit(exit_code(&result));
}
