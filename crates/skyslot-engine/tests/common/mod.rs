#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
use skyslot_engine::clock::FixedClock;
use skyslot_engine::common::model::{
    ArchiveRecord, BlockKind, BlockSummary, ElementHandle, Rect, WaitPolicy,
};
use skyslot_engine::renderer::{LaunchOptions, PageRenderer, RenderError, RenderSession};
use skyslot_engine::stores::{
    ArtifactStore, DocumentStore, StoreError, UploadOptions, UploadedAsset,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub enum NavigationBehavior {
    #[default]
    Succeed,
    Fail(u64),
    Hang,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub navigation: NavigationBehavior,
    /// selector -> bounding box; `None` is a detached element.
    pub elements: HashMap<String, Option<Rect>>,
    pub failing: HashSet<String>,
    pub hanging: HashSet<String>,
}

impl FakePage {
    pub fn with_element(mut self, selector: &str, rect: Rect) -> Self {
        self.elements.insert(selector.to_string(), Some(rect));
        self
    }

    pub fn with_detached(mut self, selector: &str) -> Self {
        self.elements.insert(selector.to_string(), None);
        self
    }

    pub fn with_failing(mut self, selector: &str) -> Self {
        self.failing.insert(selector.to_string());
        self
    }

    pub fn with_hanging(mut self, selector: &str) -> Self {
        self.hanging.insert(selector.to_string());
        self
    }

    pub fn with_navigation(mut self, navigation: NavigationBehavior) -> Self {
        self.navigation = navigation;
        self
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    pub launched: usize,
    /// Whether the most recent session was closed.
    pub closed: bool,
    pub closes: usize,
    pub viewport: Option<(u32, u32)>,
    pub navigated: Vec<(String, WaitPolicy)>,
    pub queried: Vec<String>,
    pub scrolled: Vec<String>,
    pub screenshots: Vec<(PathBuf, Rect)>,
}

#[derive(Clone, Default)]
pub struct FakeRenderer {
    pub page: FakePage,
    pub state: Arc<Mutex<SessionState>>,
}

impl FakeRenderer {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            state: Arc::default(),
        }
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn RenderSession>, RenderError> {
        {
            let mut state = self.state.lock().unwrap();
            state.launched += 1;
            state.closed = false;
        }
        Ok(Box::new(FakeSession {
            page: self.page.clone(),
            state: self.state.clone(),
            handles: Vec::new(),
            closed: false,
        }))
    }
}

pub struct FakeSession {
    page: FakePage,
    state: Arc<Mutex<SessionState>>,
    handles: Vec<String>,
    closed: bool,
}

impl FakeSession {
    pub fn new(page: FakePage) -> (Self, Arc<Mutex<SessionState>>) {
        let state = Arc::new(Mutex::new(SessionState::default()));
        (
            Self {
                page,
                state: state.clone(),
                handles: Vec::new(),
                closed: false,
            },
            state,
        )
    }

    fn selector_for(&self, element: ElementHandle) -> Result<&str, RenderError> {
        self.handles
            .get(element.0 as usize)
            .map(String::as_str)
            .ok_or(RenderError::StaleElement(element.0))
    }

    fn ensure_open(&self) -> Result<(), RenderError> {
        if self.closed {
            return Err(RenderError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.state.lock().unwrap().viewport = Some((width, height));
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        policy: WaitPolicy,
        _timeout: Duration,
    ) -> Result<(), RenderError> {
        self.ensure_open()?;
        self.state
            .lock()
            .unwrap()
            .navigated
            .push((url.to_string(), policy));
        match self.page.navigation {
            NavigationBehavior::Succeed => Ok(()),
            NavigationBehavior::Fail(ms) => Err(RenderError::NavigationTimeout(ms)),
            NavigationBehavior::Hang => std::future::pending().await,
        }
    }

    async fn query_selector(
        &mut self,
        selector: &str,
    ) -> Result<Option<ElementHandle>, RenderError> {
        self.ensure_open()?;
        self.state.lock().unwrap().queried.push(selector.to_string());

        if self.page.hanging.contains(selector) {
            return std::future::pending().await;
        }
        if self.page.failing.contains(selector) {
            return Err(RenderError::Query {
                selector: selector.to_string(),
                reason: "Node is detached from document".into(),
            });
        }
        if !self.page.elements.contains_key(selector) {
            return Ok(None);
        }

        self.handles.push(selector.to_string());
        Ok(Some(ElementHandle((self.handles.len() - 1) as u64)))
    }

    async fn bounding_box(&mut self, element: ElementHandle) -> Result<Option<Rect>, RenderError> {
        let selector = self.selector_for(element)?;
        Ok(self.page.elements.get(selector).copied().flatten())
    }

    async fn scroll_into_view(&mut self, element: ElementHandle) -> Result<(), RenderError> {
        let selector = self.selector_for(element)?.to_string();
        self.state.lock().unwrap().scrolled.push(selector);
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, clip: Rect) -> Result<(), RenderError> {
        self.ensure_open()?;
        tokio::fs::write(path, b"\x89PNG fake").await?;
        self.state
            .lock()
            .unwrap()
            .screenshots
            .push((path.to_path_buf(), clip));
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        if !self.closed {
            self.closed = true;
            let mut state = self.state.lock().unwrap();
            state.closed = true;
            state.closes += 1;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

// ---------------------------------------------------------------------------
// Artifact store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeArtifactStore {
    pub uploads: Mutex<Vec<(PathBuf, UploadOptions)>>,
    /// Uploads whose public id starts with one of these fail.
    pub failing_prefixes: Vec<String>,
}

impl FakeArtifactStore {
    pub fn failing(prefixes: &[&str]) -> Self {
        Self {
            uploads: Mutex::default(),
            failing_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    pub fn public_ids(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|(_, o)| o.public_id.clone())
            .collect()
    }
}

#[async_trait]
impl ArtifactStore for FakeArtifactStore {
    async fn upload(
        &self,
        local_path: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedAsset, StoreError> {
        if self
            .failing_prefixes
            .iter()
            .any(|p| options.public_id.starts_with(p.as_str()))
        {
            return Err(StoreError::Rejected {
                status: 500,
                message: "upload failed".into(),
            });
        }
        self.uploads
            .lock()
            .unwrap()
            .push((local_path.to_path_buf(), options.clone()));
        Ok(UploadedAsset {
            url: format!("https://cdn.test/image/upload/{}.png", options.public_id),
        })
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

pub const ORIGINAL_URL: &str = "https://cdn.test/original.png";

#[derive(Default)]
pub struct FakeDocumentStore {
    pub children: HashMap<String, Vec<BlockSummary>>,
    pub images: Mutex<HashMap<String, String>>,
    pub records: Mutex<Vec<(String, ArchiveRecord)>>,
    pub list_calls: Mutex<Vec<String>>,
    pub failing_lists: HashSet<String>,
    pub failing_updates: HashSet<String>,
}

impl FakeDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `blocks` under `parent`; every image starts at `ORIGINAL_URL`.
    pub fn with_children(mut self, parent: &str, blocks: Vec<BlockSummary>) -> Self {
        {
            let mut images = self.images.lock().unwrap();
            for block in &blocks {
                if block.kind == BlockKind::Image {
                    images.insert(block.id.clone(), ORIGINAL_URL.to_string());
                }
            }
        }
        self.children.insert(parent.to_string(), blocks);
        self
    }

    pub fn with_record(self, database_id: &str, date: NaiveDate) -> Self {
        self.records.lock().unwrap().push((
            database_id.to_string(),
            ArchiveRecord {
                title: date.to_string(),
                date,
                image_url: ORIGINAL_URL.into(),
            },
        ));
        self
    }

    pub fn image_url(&self, block_id: &str) -> Option<String> {
        self.images.lock().unwrap().get(block_id).cloned()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStore for FakeDocumentStore {
    async fn list_children(&self, block_id: &str) -> Result<Vec<BlockSummary>, StoreError> {
        self.list_calls.lock().unwrap().push(block_id.to_string());
        if self.failing_lists.contains(block_id) {
            return Err(StoreError::Rejected {
                status: 502,
                message: "bad gateway".into(),
            });
        }
        Ok(self.children.get(block_id).cloned().unwrap_or_default())
    }

    async fn update_image_block(&self, block_id: &str, url: &str) -> Result<(), StoreError> {
        if self.failing_updates.contains(block_id) {
            return Err(StoreError::Rejected {
                status: 409,
                message: "conflict".into(),
            });
        }
        self.images
            .lock()
            .unwrap()
            .insert(block_id.to_string(), url.to_string());
        Ok(())
    }

    async fn create_page(
        &self,
        database_id: &str,
        record: &ArchiveRecord,
    ) -> Result<String, StoreError> {
        let mut records = self.records.lock().unwrap();
        records.push((database_id.to_string(), record.clone()));
        Ok(format!("page-{}", records.len()))
    }

    async fn find_record(
        &self,
        database_id: &str,
        date: NaiveDate,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .position(|(db, r)| db == database_id && r.date == date)
            .map(|i| format!("page-{}", i + 1)))
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn image(id: &str) -> BlockSummary {
    BlockSummary {
        id: id.to_string(),
        kind: BlockKind::Image,
        has_children: false,
        caption: None,
    }
}

pub fn keyed_image(id: &str, caption: &str) -> BlockSummary {
    BlockSummary {
        caption: Some(caption.to_string()),
        ..image(id)
    }
}

pub fn paragraph(id: &str) -> BlockSummary {
    BlockSummary {
        id: id.to_string(),
        kind: BlockKind::Other("paragraph".into()),
        has_children: false,
        caption: None,
    }
}

pub fn container(id: &str) -> BlockSummary {
    BlockSummary {
        id: id.to_string(),
        kind: BlockKind::Other("column_list".into()),
        has_children: true,
        caption: None,
    }
}

/// 2026-10-19 at `hour`:15 in JST.
pub fn jst(hour: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(9 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, hour, 15, 0)
        .unwrap()
}

pub fn fixed_clock(hour: u32) -> FixedClock {
    FixedClock::new(jst(hour))
}
