use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Axis-aligned rectangle in CSS pixels, document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Explicit clip rectangle for a capture target.
///
/// When `relative_to_element` is set, `x`/`y` are replaced by the measured
/// top-left corner of the resolved element at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub relative_to_element: bool,
}

/// One logical region of the page to capture ("today", "tomorrow", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureTarget {
    pub name: String,
    /// Tried in order; the first one that resolves wins.
    pub selectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<ClipSpec>,
}

impl CaptureTarget {
    pub fn new(name: impl Into<String>, selectors: &[&str]) -> Self {
        Self {
            name: name.into(),
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            clip: None,
        }
    }

    pub fn with_clip(mut self, clip: ClipSpec) -> Self {
        self.clip = Some(clip);
        self
    }
}

/// Opaque handle to an element inside one render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// A target bound to a live element. Never outlives the session it came from.
#[derive(Debug, Clone)]
pub struct ResolvedRegion {
    pub target: CaptureTarget,
    pub element: ElementHandle,
    /// Selector candidate that produced the element.
    pub selector: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResult {
    pub name: String,
    pub local_path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub source: CaptureResult,
    pub remote_id: String,
    pub url: String,
}

impl Artifact {
    pub fn name(&self) -> &str {
        &self.source.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Image,
    Other(String),
}

impl BlockKind {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "image" => BlockKind::Image,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

/// One child entry as reported by the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSummary {
    pub id: String,
    pub kind: BlockKind,
    pub has_children: bool,
    pub caption: Option<String>,
}

/// A pre-existing image placeholder in the target document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSlot {
    pub block_id: String,
    pub depth: usize,
    pub container_id: String,
    /// Logical target name from a `slot:<name>` caption, if any.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingMode {
    Positional,
    Keyed,
}

#[derive(Debug, Clone)]
pub struct SyncPlan {
    pub mode: PairingMode,
    pub pairs: Vec<(Artifact, DocumentSlot)>,
}

impl SyncPlan {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Daily entry appended to the archive database.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub title: String,
    pub date: NaiveDate,
    pub image_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    DomReady,
    #[default]
    NetworkQuiet,
}
