//! One capture-and-sync run, start to finish.
//!
//! launch -> navigate -> (locate -> capture -> publish) per target ->
//! discover -> plan -> apply -> daily archive record. The render session is
//! closed on every path, including watchdog expiry.

use crate::accumulation::AccumulationTrigger;
use crate::capture::CaptureEngine;
use crate::clock::Clock;
use crate::config::{PublishFailurePolicy, SkyslotConfig};
use crate::locator::RegionLocator;
use crate::navigator::Navigator;
use crate::publisher::ArtifactPublisher;
use crate::renderer::{LaunchOptions, PageRenderer, RenderError, RenderSession};
use crate::stores::{ArtifactStore, DocumentStore, StoreError};
use crate::syncer::{self, DocumentSyncer};
use crate::watchdog::{Watchdog, WatchdogExpired};
use chrono::{DateTime, Timelike, Utc};
use skyslot_common::model::{Artifact, CaptureTarget, PairingMode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_WATCHDOG: i32 = 3;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to launch renderer: {0}")]
    Launch(#[source] RenderError),

    #[error("Navigation failed: {0}")]
    Navigation(#[source] RenderError),

    #[error("Publishing '{target}' failed: {source}")]
    Publish {
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("Slot discovery failed: {0}")]
    Discovery(#[source] StoreError),

    #[error("Archive record failed: {0}")]
    Archive(#[source] StoreError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogExpired),
}

impl PipelineError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Watchdog(_) => EXIT_WATCHDOG,
            _ => EXIT_FAILURE,
        }
    }
}

pub fn exit_code(result: &Result<RunReport, PipelineError>) -> i32 {
    match result {
        Ok(_) => EXIT_OK,
        Err(e) => e.exit_code(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub captured: usize,
    pub artifacts: Vec<Artifact>,
    pub skipped_targets: Vec<String>,
    pub slots_discovered: usize,
    pub slots_updated: usize,
    pub slots_failed: usize,
    pub pairing: Option<PairingMode>,
    pub recorded: bool,
}

impl RunReport {
    pub fn published(&self) -> usize {
        self.artifacts.len()
    }
}

/// External collaborators of a run.
pub struct Services {
    pub renderer: Arc<dyn PageRenderer>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub clock: Arc<dyn Clock>,
}

/// Where in the document store results land.
#[derive(Debug, Clone)]
pub struct DocumentTarget {
    pub root_block_id: String,
    pub archive_database_id: Option<String>,
}

pub struct Pipeline {
    url: String,
    targets: Vec<CaptureTarget>,
    output_dir: PathBuf,
    root_block_id: String,
    on_publish_failure: PublishFailurePolicy,
    skip_sync: bool,
    hour_override: Option<u32>,
    launch_options: LaunchOptions,
    navigator: Navigator,
    locator: RegionLocator,
    capture: CaptureEngine,
    publisher: ArtifactPublisher,
    syncer: DocumentSyncer,
    archive: AccumulationTrigger,
    renderer: Arc<dyn PageRenderer>,
    clock: Arc<dyn Clock>,
    watchdog: Watchdog,
}

impl Pipeline {
    pub fn new(config: &SkyslotConfig, services: Services, target: DocumentTarget) -> Self {
        let page = &config.page;
        Self {
            url: page.url.clone(),
            targets: config.capture.targets.clone(),
            output_dir: config.capture.output_dir.clone(),
            root_block_id: target.root_block_id,
            on_publish_failure: config.publish.on_failure,
            skip_sync: false,
            hour_override: None,
            launch_options: LaunchOptions::default(),
            navigator: Navigator::new(
                page.wait_policy,
                Duration::from_millis(page.navigation_timeout_ms),
                (page.viewport_width, page.viewport_height),
            ),
            locator: RegionLocator::new(Duration::from_millis(config.capture.selector_timeout_ms)),
            capture: CaptureEngine::new(Duration::from_millis(config.capture.settle_delay_ms)),
            publisher: ArtifactPublisher::new(services.artifacts, config.publish.folder.clone()),
            syncer: DocumentSyncer::new(
                services.documents.clone(),
                config.sync.max_depth,
                config.sync.cache_bust,
            ),
            archive: AccumulationTrigger::new(
                services.documents,
                target.archive_database_id,
                config.archive.trigger_hour,
            ),
            renderer: services.renderer,
            clock: services.clock,
            watchdog: Watchdog::start(Duration::from_millis(config.watchdog.deadline_ms)),
        }
    }

    pub fn with_launch_options(mut self, options: LaunchOptions) -> Self {
        self.launch_options = options;
        self
    }

    /// Share a countdown started earlier, e.g. at process start.
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Use `hour` instead of the clock's hour for the daily trigger.
    pub fn with_hour_override(mut self, hour: Option<u32>) -> Self {
        self.hour_override = hour;
        self
    }

    pub fn skip_sync(mut self, skip: bool) -> Self {
        self.skip_sync = skip;
        self
    }

    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let started_at = self.clock.now_utc();

        let mut session = self
            .watchdog
            .guard(self.renderer.launch(&self.launch_options))
            .await?
            .map_err(PipelineError::Launch)?;

        let outcome = match self
            .watchdog
            .guard(self.run_with_session(session.as_mut(), started_at))
            .await
        {
            Ok(outcome) => outcome,
            Err(expired) => {
                error!("{}, abandoning run", expired);
                Err(expired.into())
            }
        };

        if let Err(e) = session.close().await {
            warn!("Failed to close render session: {}", e);
        }

        outcome
    }

    async fn run_with_session(
        &self,
        session: &mut dyn RenderSession,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, PipelineError> {
        let local = self.clock.now_local();

        self.navigator
            .load(session, &self.url)
            .await
            .map_err(PipelineError::Navigation)?;

        let mut report = RunReport::default();
        for target in &self.targets {
            if let Some(artifact) = self.process_target(session, target, &mut report).await? {
                report.artifacts.push(artifact);
            }
        }
        info!(
            "Published {} of {} target(s)",
            report.published(),
            self.targets.len()
        );

        let synced = if self.skip_sync {
            info!("Sync skipped");
            Ok(())
        } else {
            let run_stamp = started_at.format("%Y%m%d%H%M%S").to_string();
            self.sync(&run_stamp, &mut report).await
        };

        let hour = self.hour_override.unwrap_or(local.hour());
        let archived = match self
            .archive
            .maybe_record(&report.artifacts, local.date_naive(), hour)
            .await
        {
            Ok(recorded) => {
                report.recorded = recorded;
                Ok(())
            }
            Err(e) => Err(PipelineError::Archive(e)),
        };

        synced?;
        archived?;
        Ok(report)
    }

    /// Locate, capture, and publish one target. `Ok(None)` means the target
    /// was skipped.
    async fn process_target(
        &self,
        session: &mut dyn RenderSession,
        target: &CaptureTarget,
        report: &mut RunReport,
    ) -> Result<Option<Artifact>, PipelineError> {
        let Some(region) = self.locator.resolve(session, target).await else {
            report.skipped_targets.push(target.name.clone());
            return Ok(None);
        };

        let captured_at = self.clock.now_utc();
        let capture = match self
            .capture
            .capture(session, &region, &self.output_dir, captured_at)
            .await
        {
            Ok(capture) => capture,
            Err(e) => {
                warn!("[{}] capture failed, skipping: {}", target.name, e);
                report.skipped_targets.push(target.name.clone());
                return Ok(None);
            }
        };
        report.captured += 1;

        match self.publisher.publish(&capture).await {
            Ok(artifact) => Ok(Some(artifact)),
            Err(e) => match self.on_publish_failure {
                PublishFailurePolicy::SkipTarget => {
                    warn!("[{}] publish failed, skipping: {}", target.name, e);
                    report.skipped_targets.push(target.name.clone());
                    Ok(None)
                }
                PublishFailurePolicy::AbortRun => Err(PipelineError::Publish {
                    target: target.name.clone(),
                    source: e,
                }),
            },
        }
    }

    async fn sync(&self, run_stamp: &str, report: &mut RunReport) -> Result<(), PipelineError> {
        let slots = self
            .syncer
            .discover_slots(&self.root_block_id)
            .await
            .map_err(PipelineError::Discovery)?;
        report.slots_discovered = slots.len();

        let plan = syncer::plan(&report.artifacts, &slots);
        info!(
            "Sync plan: {} pair(s), {:?} pairing",
            plan.len(),
            plan.mode
        );
        report.pairing = Some(plan.mode);

        let outcome = self.syncer.apply(&plan, run_stamp).await;
        report.slots_updated = outcome.updated;
        report.slots_failed = outcome.failed;
        Ok(())
    }
}
