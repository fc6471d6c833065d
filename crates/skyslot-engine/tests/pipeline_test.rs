mod common;

use common::{
    FakeArtifactStore, FakeDocumentStore, FakePage, FakeRenderer, NavigationBehavior,
    ORIGINAL_URL, container, image, paragraph,
};
use skyslot_engine::common::model::{CaptureTarget, PairingMode, Rect, WaitPolicy};
use skyslot_engine::config::{PublishFailurePolicy, SkyslotConfig};
use skyslot_engine::pipeline::{
    DocumentTarget, EXIT_OK, EXIT_WATCHDOG, Pipeline, PipelineError, Services, exit_code,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const ROOT: &str = "root-page";
const DB: &str = "archive-db";

fn config(output_dir: &Path) -> SkyslotConfig {
    let mut config = SkyslotConfig::default();
    config.page.url = "https://weather.test/forecast".into();
    config.capture.output_dir = output_dir.to_path_buf();
    config.capture.settle_delay_ms = 0;
    config.capture.selector_timeout_ms = 1000;
    config.capture.targets = vec![
        CaptureTarget::new("today", &["#today-2025", "#today"]),
        CaptureTarget::new("tomorrow", &["#tomorrow"]),
        CaptureTarget::new("10-day", &["#week-2025", "#week"]),
    ];
    config
}

fn full_page() -> FakePage {
    FakePage::default()
        .with_element("#today", Rect::new(0.0, 200.0, 640.0, 300.0))
        .with_element("#tomorrow", Rect::new(0.0, 520.0, 640.0, 300.0))
        .with_element("#week", Rect::new(0.0, 900.0, 640.0, 480.0))
}

/// Slots at depths [0, 1, 1].
fn document() -> FakeDocumentStore {
    FakeDocumentStore::new()
        .with_children(
            ROOT,
            vec![image("slot-a"), paragraph("caption"), container("columns")],
        )
        .with_children("columns", vec![image("slot-b"), image("slot-c")])
}

struct Harness {
    renderer: FakeRenderer,
    artifacts: Arc<FakeArtifactStore>,
    documents: Arc<FakeDocumentStore>,
    out: TempDir,
}

impl Harness {
    fn new(page: FakePage) -> Self {
        Self::with_stores(page, FakeArtifactStore::default(), document())
    }

    fn with_stores(page: FakePage, artifacts: FakeArtifactStore, docs: FakeDocumentStore) -> Self {
        common::init_tracing();
        Self {
            renderer: FakeRenderer::new(page),
            artifacts: Arc::new(artifacts),
            documents: Arc::new(docs),
            out: TempDir::new().unwrap(),
        }
    }

    fn pipeline(&self, hour: u32) -> Pipeline {
        self.pipeline_with(config(self.out.path()), hour)
    }

    fn pipeline_with(&self, config: SkyslotConfig, hour: u32) -> Pipeline {
        Pipeline::new(
            &config,
            Services {
                renderer: Arc::new(self.renderer.clone()),
                artifacts: self.artifacts.clone(),
                documents: self.documents.clone(),
                clock: Arc::new(common::fixed_clock(hour)),
            },
            DocumentTarget {
                root_block_id: ROOT.into(),
                archive_database_id: Some(DB.into()),
            },
        )
    }

    fn slot_url(&self, id: &str) -> String {
        self.documents.image_url(id).unwrap()
    }
}

#[tokio::test]
async fn test_three_regions_fill_three_nested_slots() {
    let h = Harness::new(full_page());

    let result = h.pipeline(9).run().await;
    assert_eq!(exit_code(&result), EXIT_OK);
    let report = result.unwrap();

    assert_eq!(report.captured, 3);
    assert_eq!(report.published(), 3);
    assert_eq!(report.slots_discovered, 3);
    assert_eq!(report.slots_updated, 3);
    assert_eq!(report.pairing, Some(PairingMode::Positional));
    assert!(report.skipped_targets.is_empty());

    let urls: Vec<_> = report.artifacts.iter().map(|a| a.url.clone()).collect();
    assert_eq!(urls.len(), 3);
    assert!(urls[0] != urls[1] && urls[1] != urls[2] && urls[0] != urls[2]);

    // 09:15 JST is 00:15 UTC.
    assert_eq!(
        h.slot_url("slot-a"),
        "https://cdn.test/image/upload/today_20261019T001500000Z.png?v=20261019001500"
    );
    assert!(h.slot_url("slot-b").contains("/tomorrow_"));
    assert!(h.slot_url("slot-c").contains("/10-day_"));

    let state = h.renderer.state();
    assert!(state.closed);
    assert_eq!(state.viewport, Some((1000, 1200)));
    assert_eq!(
        state.navigated,
        vec![(
            "https://weather.test/forecast".to_string(),
            WaitPolicy::NetworkQuiet
        )]
    );
    assert_eq!(state.screenshots.len(), 3);
    for (path, _) in &state.screenshots {
        assert!(path.starts_with(h.out.path()));
        assert!(path.exists());
    }
    assert_eq!(state.screenshots[2].1, Rect::new(0.0, 900.0, 640.0, 480.0));
}

#[tokio::test]
async fn test_missing_region_leaves_last_slot_untouched() {
    let page = FakePage::default()
        .with_element("#today", Rect::new(0.0, 200.0, 640.0, 300.0))
        .with_element("#tomorrow", Rect::new(0.0, 520.0, 640.0, 300.0))
        .with_failing("#week-2025");
    let h = Harness::new(page);

    let report = h.pipeline(9).run().await.unwrap();

    assert_eq!(report.published(), 2);
    assert_eq!(report.skipped_targets, vec!["10-day"]);
    assert_eq!(report.slots_updated, 2);
    assert!(h.slot_url("slot-a").contains("/today_"));
    assert!(h.slot_url("slot-b").contains("/tomorrow_"));
    assert_eq!(h.slot_url("slot-c"), ORIGINAL_URL);
    assert!(h.renderer.state().closed);
}

#[tokio::test]
async fn test_navigation_timeout_aborts_and_closes_session() {
    let h = Harness::new(full_page().with_navigation(NavigationBehavior::Fail(60000)));

    let result = h.pipeline(0).run().await;

    assert!(matches!(result, Err(PipelineError::Navigation(_))));
    assert_ne!(exit_code(&result), EXIT_OK);
    assert!(h.artifacts.public_ids().is_empty());
    for slot in ["slot-a", "slot-b", "slot-c"] {
        assert_eq!(h.slot_url(slot), ORIGINAL_URL);
    }
    assert_eq!(h.documents.record_count(), 0);

    let state = h.renderer.state();
    assert!(state.closed);
    assert!(state.queried.is_empty());
}

#[tokio::test]
async fn test_midnight_run_creates_one_archive_record() {
    let h = Harness::new(full_page());

    let report = h.pipeline(0).run().await.unwrap();

    assert!(report.recorded);
    let records = h.documents.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, DB);
    assert_eq!(records[0].1.date.to_string(), "2026-10-19");
    assert_eq!(records[0].1.image_url, report.artifacts[0].url);
}

#[tokio::test]
async fn test_other_hours_create_no_archive_record() {
    for hour in [1, 7, 12, 23] {
        let h = Harness::new(full_page());
        let report = h.pipeline(hour).run().await.unwrap();
        assert!(!report.recorded);
        assert_eq!(h.documents.record_count(), 0);
    }
}

#[tokio::test]
async fn test_hour_override_triggers_archive() {
    let h = Harness::new(full_page());
    let report = h
        .pipeline(14)
        .with_hour_override(Some(0))
        .run()
        .await
        .unwrap();
    assert!(report.recorded);
}

#[tokio::test]
async fn test_publish_failure_skips_only_that_target() {
    let h = Harness::with_stores(
        full_page(),
        FakeArtifactStore::failing(&["tomorrow"]),
        document(),
    );

    let result = h.pipeline(9).run().await;
    assert_eq!(exit_code(&result), EXIT_OK);
    let report = result.unwrap();

    assert_eq!(report.captured, 3);
    assert_eq!(report.published(), 2);
    assert_eq!(report.skipped_targets, vec!["tomorrow"]);
    // Positional pairing shifts the 10-day image up one slot.
    assert!(h.slot_url("slot-a").contains("/today_"));
    assert!(h.slot_url("slot-b").contains("/10-day_"));
    assert_eq!(h.slot_url("slot-c"), ORIGINAL_URL);
}

#[tokio::test]
async fn test_publish_failure_can_abort_run() {
    let h = Harness::with_stores(
        full_page(),
        FakeArtifactStore::failing(&["tomorrow"]),
        document(),
    );
    let mut config = config(h.out.path());
    config.publish.on_failure = PublishFailurePolicy::AbortRun;

    let result = h.pipeline_with(config, 0).run().await;

    match &result {
        Err(PipelineError::Publish { target, .. }) => assert_eq!(target, "tomorrow"),
        other => panic!("expected publish error, got {:?}", other),
    }
    assert_eq!(h.slot_url("slot-a"), ORIGINAL_URL);
    assert_eq!(h.documents.record_count(), 0);
    assert!(h.renderer.state().closed);
}

#[tokio::test]
async fn test_keyed_slots_survive_skipped_region() {
    let docs = FakeDocumentStore::new()
        .with_children(
            ROOT,
            vec![
                common::keyed_image("slot-a", "slot:today"),
                common::keyed_image("slot-b", "slot:tomorrow"),
                common::keyed_image("slot-c", "slot:10-day"),
            ],
        );
    let page = FakePage::default()
        .with_element("#today", Rect::new(0.0, 200.0, 640.0, 300.0))
        .with_element("#week", Rect::new(0.0, 900.0, 640.0, 480.0));
    let h = Harness::with_stores(page, FakeArtifactStore::default(), docs);

    let report = h.pipeline(9).run().await.unwrap();

    assert_eq!(report.pairing, Some(PairingMode::Keyed));
    assert!(h.slot_url("slot-a").contains("/today_"));
    assert_eq!(h.slot_url("slot-b"), ORIGINAL_URL);
    assert!(h.slot_url("slot-c").contains("/10-day_"));
}

#[tokio::test]
async fn test_zero_size_region_is_skipped() {
    let page = full_page().with_element("#tomorrow", Rect::new(0.0, 520.0, 640.0, 0.0));
    let h = Harness::new(page);

    let report = h.pipeline(9).run().await.unwrap();

    assert_eq!(report.captured, 2);
    assert_eq!(report.skipped_targets, vec!["tomorrow"]);
    assert_eq!(h.renderer.state().screenshots.len(), 2);
}

#[tokio::test]
async fn test_discovery_failure_is_fatal_but_archive_still_runs() {
    let mut docs = document();
    docs.failing_lists.insert(ROOT.into());
    let h = Harness::with_stores(full_page(), FakeArtifactStore::default(), docs);

    let result = h.pipeline(0).run().await;

    assert!(matches!(result, Err(PipelineError::Discovery(_))));
    assert_eq!(h.artifacts.public_ids().len(), 3);
    assert_eq!(h.documents.record_count(), 1);
    assert!(h.renderer.state().closed);
}

#[tokio::test]
async fn test_skip_sync_leaves_document_alone() {
    let h = Harness::new(full_page());
    let report = h.pipeline(9).skip_sync(true).run().await.unwrap();

    assert_eq!(report.published(), 3);
    assert_eq!(report.slots_discovered, 0);
    assert!(h.documents.list_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_runs_at_different_times_publish_distinct_ids() {
    let h = Harness::new(full_page());
    let first = h.pipeline(9).run().await.unwrap();
    let second = h.pipeline(10).run().await.unwrap();
    assert_eq!(first.published(), 3);
    assert_eq!(second.published(), 3);
    assert_eq!(second.slots_updated, 3);

    let ids = h.artifacts.public_ids();
    assert_eq!(ids.len(), 6);
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), 6);

    let state = h.renderer.state();
    assert_eq!(state.launched, 2);
    assert_eq!(state.closes, 2);
    assert_eq!(state.navigated.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_expiry_closes_session() {
    let h = Harness::new(full_page().with_navigation(NavigationBehavior::Hang));
    let mut config = config(h.out.path());
    config.watchdog.deadline_ms = 5_000;

    let result = h.pipeline_with(config, 0).run().await;

    assert!(matches!(result, Err(PipelineError::Watchdog(_))));
    assert_eq!(exit_code(&result), EXIT_WATCHDOG);
    assert!(h.artifacts.public_ids().is_empty());
    assert!(h.renderer.state().closed);
}
